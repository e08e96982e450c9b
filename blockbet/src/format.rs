// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Display helpers for the presentation layer.

use alloy_primitives::Address;
use linera_sdk::linera_base_types::Amount;

const ATTOS_PER_DISPLAY_UNIT: u128 = 100_000_000_000_000; // 10^14, the fourth decimal
const DISPLAY_UNITS_PER_TOKEN: u128 = 10_000;

/// `0x1234...abcd`
pub fn format_address(address: &Address) -> String {
    let full = address.to_string();
    format!("{}...{}", &full[..6], &full[full.len() - 4..])
}

/// First eight characters of a transaction hash, e.g. `0xabcdef...`.
pub fn format_tx_hash(hash: &str) -> String {
    match hash.get(..8) {
        Some(prefix) => format!("{prefix}..."),
        None => hash.to_string(),
    }
}

/// Amount with exactly four decimals, rounded half up.
pub fn format_amount(amount: Amount) -> String {
    let attos = u128::from(amount);
    let units = attos.saturating_add(ATTOS_PER_DISPLAY_UNIT / 2) / ATTOS_PER_DISPLAY_UNIT;
    format!(
        "{}.{:04}",
        units / DISPLAY_UNITS_PER_TOKEN,
        units % DISPLAY_UNITS_PER_TOKEN
    )
}

/// `50.0%`
pub fn format_percentage(percentage: f64) -> String {
    format!("{percentage:.1}%")
}

/// Time left until `end_time`, both in Unix seconds. A zero `end_time` means no deadline.
pub fn format_time_remaining(end_time: u64, now: u64) -> String {
    if end_time == 0 {
        return "No deadline".to_string();
    }
    if end_time <= now {
        return "Expired".to_string();
    }
    let remaining = end_time - now;
    let hours = remaining / 3600;
    let minutes = (remaining % 3600) / 60;
    if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}
