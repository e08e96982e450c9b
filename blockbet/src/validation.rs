// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Local input checks, run before any request reaches the wallet.

use std::{
    collections::HashSet,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use alloy_primitives::Address;
use blockbet_abi::{is_zero_address, MAX_OPTIONS, MIN_OPTIONS};
use linera_sdk::linera_base_types::Amount;

use crate::error::BlockBetError;

pub const MAX_QUESTION_LENGTH: usize = 200;
pub const MAX_OPTION_LENGTH: usize = 50;
pub const AMOUNT_DECIMALS: usize = 18;

/// Returns the trimmed question.
pub fn validate_question(question: &str) -> Result<String, BlockBetError> {
    let question = question.trim();
    if question.is_empty() {
        return Err(BlockBetError::validation("question", "enter a question"));
    }
    if question.chars().count() > MAX_QUESTION_LENGTH {
        return Err(BlockBetError::validation(
            "question",
            format!("must be at most {MAX_QUESTION_LENGTH} characters"),
        ));
    }
    Ok(question.to_string())
}

/// Returns the trimmed option labels, in order.
pub fn validate_options<S: AsRef<str>>(options: &[S]) -> Result<Vec<String>, BlockBetError> {
    if options.len() < MIN_OPTIONS || options.len() > MAX_OPTIONS {
        return Err(BlockBetError::validation(
            "options",
            format!("a round needs between {MIN_OPTIONS} and {MAX_OPTIONS} options"),
        ));
    }
    let mut seen = HashSet::new();
    let mut labels = Vec::with_capacity(options.len());
    for (index, option) in options.iter().enumerate() {
        let label = option.as_ref().trim();
        if label.is_empty() {
            return Err(BlockBetError::validation(
                "options",
                format!("option {} is empty", index + 1),
            ));
        }
        if label.chars().count() > MAX_OPTION_LENGTH {
            return Err(BlockBetError::validation(
                "options",
                format!("option {} exceeds {MAX_OPTION_LENGTH} characters", index + 1),
            ));
        }
        if !seen.insert(label.to_lowercase()) {
            return Err(BlockBetError::validation(
                "options",
                format!("option `{label}` is listed twice"),
            ));
        }
        labels.push(label.to_string());
    }
    Ok(labels)
}

/// Parses a decimal native-currency amount and checks it against the minimum bet.
pub fn parse_bet_amount(input: &str, min_bet: Amount) -> Result<Amount, BlockBetError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(BlockBetError::validation("amount", "enter an amount"));
    }
    let (whole, fraction) = input.split_once('.').unwrap_or((input, ""));
    let digits_only = |part: &str| part.chars().all(|c| c.is_ascii_digit());
    if (whole.is_empty() && fraction.is_empty()) || !digits_only(whole) || !digits_only(fraction) {
        return Err(BlockBetError::validation(
            "amount",
            format!("`{input}` is not a decimal number"),
        ));
    }
    if fraction.len() > AMOUNT_DECIMALS {
        return Err(BlockBetError::validation(
            "amount",
            format!("at most {AMOUNT_DECIMALS} decimals are supported"),
        ));
    }
    let normalized = format!(
        "{}.{}",
        if whole.is_empty() { "0" } else { whole },
        if fraction.is_empty() { "0" } else { fraction }
    );
    let amount: Amount = normalized
        .parse()
        .map_err(|_| BlockBetError::validation("amount", format!("`{input}` is too large")))?;
    if amount == Amount::ZERO {
        return Err(BlockBetError::validation("amount", "must be greater than zero"));
    }
    if amount < min_bet {
        return Err(BlockBetError::validation(
            "amount",
            format!("the minimum bet is {min_bet}"),
        ));
    }
    Ok(amount)
}

pub fn validate_option_index(option: u32, option_count: usize) -> Result<(), BlockBetError> {
    if (option as usize) < option_count {
        Ok(())
    } else {
        Err(BlockBetError::validation(
            "option",
            format!("option {option} does not exist; this round has {option_count} options"),
        ))
    }
}

pub fn parse_address(field: &'static str, input: &str) -> Result<Address, BlockBetError> {
    let input = input.trim();
    if input.len() != 42 || !input.starts_with("0x") {
        return Err(BlockBetError::validation(
            field,
            "expected a 0x-prefixed 20-byte hex address",
        ));
    }
    input
        .parse()
        .map_err(|e| BlockBetError::validation(field, format!("{e}")))
}

pub fn validate_treasury(input: &str) -> Result<Address, BlockBetError> {
    let treasury = parse_address("treasury", input)?;
    if is_zero_address(&treasury) {
        return Err(BlockBetError::validation(
            "treasury",
            "the zero address cannot hold fees",
        ));
    }
    Ok(treasury)
}

/// Start and end of a round, in Unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundSchedule {
    pub start_time: u64,
    pub end_time: u64,
}

impl RoundSchedule {
    pub fn new(start_time: u64, end_time: u64) -> Result<Self, BlockBetError> {
        if end_time <= start_time {
            return Err(BlockBetError::validation(
                "endTime",
                "the round must end after it starts",
            ));
        }
        Ok(RoundSchedule {
            start_time,
            end_time,
        })
    }

    pub fn starting_at(now: u64, duration: Duration) -> Result<Self, BlockBetError> {
        Self::new(now, now.saturating_add(duration.as_secs()))
    }
}

/// Current Unix time in seconds.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_question_is_trimmed_and_bounded() {
        assert_eq!(validate_question("  Will it rain?  ").unwrap(), "Will it rain?");
        assert_matches!(
            validate_question("   "),
            Err(BlockBetError::ValidationFailed { field: "question", .. })
        );
        assert!(validate_question(&"q".repeat(201)).is_err());
    }

    #[test]
    fn test_single_option_is_rejected() {
        assert_matches!(
            validate_options(&["Yes"]),
            Err(BlockBetError::ValidationFailed { field: "options", .. })
        );
    }

    #[test]
    fn test_options_are_checked() {
        assert_eq!(validate_options(&[" Yes ", "No"]).unwrap(), vec!["Yes", "No"]);
        assert!(validate_options(&["Yes", " yes"]).is_err());
        assert!(validate_options(&["Yes", ""]).is_err());
        assert!(validate_options(&["Yes", "n".repeat(51).as_str()]).is_err());
        let eleven: Vec<String> = (0..11).map(|i| format!("Option {i}")).collect();
        assert!(validate_options(&eleven[..]).is_err());
    }

    #[test]
    fn test_bet_amount_parsing() {
        let min_bet = Amount::from_attos(10_000_000_000_000_000);
        assert_eq!(parse_bet_amount("1.5", min_bet).unwrap(), Amount::from_attos(1_500_000_000_000_000_000));
        assert_eq!(parse_bet_amount(".5", min_bet).unwrap(), Amount::from_attos(500_000_000_000_000_000));
        assert_eq!(
            parse_bet_amount("0.123456789012345678", min_bet).unwrap(),
            Amount::from_attos(123_456_789_012_345_678)
        );
        for bad in ["", "abc", "-1", "1.2.3", "1e5", ".", "0.1234567890123456789"] {
            assert_matches!(
                parse_bet_amount(bad, min_bet),
                Err(BlockBetError::ValidationFailed { field: "amount", .. }),
                "{bad}"
            );
        }
        assert!(parse_bet_amount("0", min_bet).is_err());
        assert!(parse_bet_amount("0.001", min_bet).is_err());
    }

    #[test]
    fn test_option_index() {
        assert!(validate_option_index(1, 2).is_ok());
        assert!(validate_option_index(2, 2).is_err());
    }

    #[test]
    fn test_treasury_address() {
        assert!(validate_treasury("0x1234567890123456789012345678901234567890").is_ok());
        assert!(validate_treasury("0x0000000000000000000000000000000000000000").is_err());
        assert!(validate_treasury("1234567890123456789012345678901234567890").is_err());
        assert!(validate_treasury("0x1234").is_err());
    }

    #[test]
    fn test_schedule_must_end_after_start() {
        assert!(RoundSchedule::new(100, 100).is_err());
        let schedule = RoundSchedule::starting_at(100, Duration::from_secs(86_400)).unwrap();
        assert_eq!(schedule.end_time, 86_500);
    }
}
