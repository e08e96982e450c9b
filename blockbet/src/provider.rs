// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! The EIP-1193 surface of the injected wallet.

use alloy_primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// The user dismissed or declined the wallet prompt.
pub const USER_REJECTED_CODE: i64 = 4001;
/// The wallet does not know the requested chain.
pub const UNRECOGNIZED_CHAIN_CODE: i64 = 4902;
/// Execution reverted; `data` carries the revert payload.
pub const EXECUTION_REVERTED_CODE: i64 = 3;

/// Error object returned by `request`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("{message} (code {code})")]
pub struct ProviderRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ProviderRpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        ProviderRpcError {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn user_rejected() -> Self {
        Self::new(USER_REJECTED_CODE, "User rejected the request.")
    }

    pub fn reverted(data: Vec<u8>) -> Self {
        ProviderRpcError {
            code: EXECUTION_REVERTED_CODE,
            message: "execution reverted".to_string(),
            data: Some(Value::String(Bytes::from(data).to_string())),
        }
    }

    pub fn is_user_rejection(&self) -> bool {
        self.code == USER_REJECTED_CODE
    }

    /// Revert payload, when the wallet attached one. Some wallets nest it as `{ data: "0x.." }`.
    pub fn revert_data(&self) -> Option<Bytes> {
        match self.data.as_ref()? {
            Value::String(hex) => hex.parse().ok(),
            Value::Object(map) => map.get("data")?.as_str()?.parse().ok(),
            _ => None,
        }
    }

    pub fn is_revert(&self) -> bool {
        self.code == EXECUTION_REVERTED_CODE
            || self.revert_data().is_some()
            || self.message.contains("revert")
    }
}

/// Notifications pushed by the wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    AccountsChanged(Vec<Address>),
    ChainChanged(u64),
    Disconnected,
}

/// An injected wallet provider (`window.ethereum` or equivalent).
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Sends one JSON-RPC request. User prompts may suspend for as long as the user takes.
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderRpcError>;

    /// Stream of account and chain notifications.
    fn subscribe(&self) -> BoxStream<'static, ProviderEvent>;
}

/// Parses a hex quantity such as `"0xa1f6"`.
pub fn parse_quantity(value: &Value) -> Option<U256> {
    serde_json::from_value(value.clone()).ok()
}

pub fn parse_chain_id(value: &Value) -> Option<u64> {
    u64::try_from(parse_quantity(value)?).ok()
}
