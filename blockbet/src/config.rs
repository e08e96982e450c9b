// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Deploy-time parameters: contract address and chain identity.

use std::time::Duration;

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

pub const MONAD_TESTNET_CHAIN_ID: u64 = 41454;
pub const MONAD_MAINNET_CHAIN_ID: u64 = 41455;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting `{0}`")]
    Missing(&'static str),
    #[error("invalid value for `{key}`: {message}")]
    Invalid { key: &'static str, message: String },
    #[error("malformed parameters: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// Chain metadata, in the shape `wallet_addEthereumChain` needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainParameters {
    pub chain_id: u64,
    pub chain_name: String,
    pub rpc_urls: Vec<String>,
    pub native_currency: NativeCurrency,
    pub block_explorer_urls: Vec<String>,
}

impl ChainParameters {
    pub fn monad_testnet() -> Self {
        ChainParameters {
            chain_id: MONAD_TESTNET_CHAIN_ID,
            chain_name: "Monad Testnet".to_string(),
            rpc_urls: vec!["https://testnet-rpc.monad.xyz".to_string()],
            native_currency: NativeCurrency {
                name: "ETH".to_string(),
                symbol: "ETH".to_string(),
                decimals: 18,
            },
            block_explorer_urls: vec!["https://testnet-explorer.monad.xyz".to_string()],
        }
    }

    pub fn monad_mainnet() -> Self {
        ChainParameters {
            chain_id: MONAD_MAINNET_CHAIN_ID,
            chain_name: "Monad Mainnet".to_string(),
            rpc_urls: vec!["https://rpc.monad.xyz".to_string()],
            block_explorer_urls: vec!["https://explorer.monad.xyz".to_string()],
            ..Self::monad_testnet()
        }
    }

    /// Looks up a named preset (`testnet` or `mainnet`).
    pub fn preset(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "testnet" | "monad-testnet" => Some(Self::monad_testnet()),
            "mainnet" | "monad-mainnet" => Some(Self::monad_mainnet()),
            _ => None,
        }
    }

    pub fn hex_chain_id(&self) -> String {
        format!("{:#x}", self.chain_id)
    }

    /// Params for `wallet_switchEthereumChain`.
    pub fn switch_request(&self) -> Value {
        json!([{ "chainId": self.hex_chain_id() }])
    }

    /// Params for `wallet_addEthereumChain`; the chain id goes over the wire in hex.
    pub fn add_request(&self) -> Value {
        json!([{
            "chainId": self.hex_chain_id(),
            "chainName": self.chain_name,
            "rpcUrls": self.rpc_urls,
            "nativeCurrency": self.native_currency,
            "blockExplorerUrls": self.block_explorer_urls,
        }])
    }

    pub fn transaction_url(&self, tx_hash: &str) -> Option<String> {
        let explorer = self.block_explorer_urls.first()?;
        Some(format!("{}/tx/{}", explorer.trim_end_matches('/'), tx_hash))
    }
}

impl Default for ChainParameters {
    fn default() -> Self {
        Self::monad_testnet()
    }
}

fn default_poll_interval_ms() -> u64 {
    15_000
}

fn default_confirmation_poll_ms() -> u64 {
    2_000
}

fn default_gas_buffer_percent() -> u64 {
    20
}

fn default_round_duration_secs() -> u64 {
    86_400
}

/// Parameters supplied at deploy time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockBetParameters {
    pub contract_address: Address,
    #[serde(default)]
    pub chain: ChainParameters,
    /// Cosmetic only: decides whether admin controls are shown, never whether they work.
    #[serde(default)]
    pub admin_hint: Option<Address>,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_confirmation_poll_ms")]
    pub confirmation_poll_ms: u64,
    #[serde(default = "default_gas_buffer_percent")]
    pub gas_buffer_percent: u64,
    #[serde(default = "default_round_duration_secs")]
    pub round_duration_secs: u64,
}

impl BlockBetParameters {
    pub fn new(contract_address: Address) -> Self {
        BlockBetParameters {
            contract_address,
            chain: ChainParameters::default(),
            admin_hint: None,
            poll_interval_ms: default_poll_interval_ms(),
            confirmation_poll_ms: default_confirmation_poll_ms(),
            gas_buffer_percent: default_gas_buffer_percent(),
            round_duration_secs: default_round_duration_secs(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads `BLOCKBET_*` variables from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let contract_address = lookup("BLOCKBET_CONTRACT_ADDRESS")
            .ok_or(ConfigError::Missing("BLOCKBET_CONTRACT_ADDRESS"))?;
        let contract_address =
            parse_address("BLOCKBET_CONTRACT_ADDRESS", &contract_address)?;
        let mut parameters = Self::new(contract_address);

        if let Some(network) = lookup("BLOCKBET_NETWORK") {
            parameters.chain =
                ChainParameters::preset(&network).ok_or_else(|| ConfigError::Invalid {
                    key: "BLOCKBET_NETWORK",
                    message: format!("unknown network `{network}`"),
                })?;
        }
        if let Some(chain_id) = lookup("BLOCKBET_CHAIN_ID") {
            parameters.chain.chain_id = parse_number("BLOCKBET_CHAIN_ID", &chain_id)?;
        }
        if let Some(name) = lookup("BLOCKBET_CHAIN_NAME") {
            parameters.chain.chain_name = name;
        }
        if let Some(rpc_url) = lookup("BLOCKBET_RPC_URL") {
            parameters.chain.rpc_urls = vec![rpc_url];
        }
        if let Some(explorer_url) = lookup("BLOCKBET_EXPLORER_URL") {
            parameters.chain.block_explorer_urls = vec![explorer_url];
        }
        if let Some(admin) = lookup("BLOCKBET_ADMIN_HINT") {
            parameters.admin_hint = Some(parse_address("BLOCKBET_ADMIN_HINT", &admin)?);
        }
        if let Some(interval) = lookup("BLOCKBET_POLL_INTERVAL_MS") {
            parameters.poll_interval_ms = parse_number("BLOCKBET_POLL_INTERVAL_MS", &interval)?;
        }
        if let Some(buffer) = lookup("BLOCKBET_GAS_BUFFER_PERCENT") {
            parameters.gas_buffer_percent = parse_number("BLOCKBET_GAS_BUFFER_PERCENT", &buffer)?;
        }
        Ok(parameters)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn confirmation_poll_interval(&self) -> Duration {
        Duration::from_millis(self.confirmation_poll_ms)
    }
}

fn parse_address(key: &'static str, value: &str) -> Result<Address, ConfigError> {
    value.trim().parse().map_err(|e| ConfigError::Invalid {
        key,
        message: format!("{e}"),
    })
}

fn parse_number(key: &'static str, value: &str) -> Result<u64, ConfigError> {
    value.trim().parse().map_err(|e| ConfigError::Invalid {
        key,
        message: format!("{e}"),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use assert_matches::assert_matches;

    const ADDRESS: &str = "0x1234567890123456789012345678901234567890";

    #[test]
    fn test_json_defaults() {
        let parameters =
            BlockBetParameters::from_json(&format!(r#"{{ "contract_address": "{ADDRESS}" }}"#))
                .unwrap();
        assert_eq!(parameters.chain.chain_id, MONAD_TESTNET_CHAIN_ID);
        assert_eq!(parameters.poll_interval(), Duration::from_secs(15));
        assert_eq!(parameters.gas_buffer_percent, 20);
        assert_eq!(parameters.admin_hint, None);
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("BLOCKBET_CONTRACT_ADDRESS", ADDRESS),
            ("BLOCKBET_NETWORK", "mainnet"),
            ("BLOCKBET_RPC_URL", "http://localhost:8545"),
            ("BLOCKBET_POLL_INTERVAL_MS", "5000"),
        ]
        .into_iter()
        .collect();
        let parameters =
            BlockBetParameters::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();
        assert_eq!(parameters.chain.chain_id, MONAD_MAINNET_CHAIN_ID);
        assert_eq!(parameters.chain.rpc_urls, vec!["http://localhost:8545"]);
        assert_eq!(parameters.poll_interval_ms, 5000);
    }

    #[test]
    fn test_contract_address_is_required() {
        let result = BlockBetParameters::from_lookup(|_| None);
        assert_matches!(result, Err(ConfigError::Missing("BLOCKBET_CONTRACT_ADDRESS")));
    }

    #[test]
    fn test_bad_address_is_rejected() {
        let result = BlockBetParameters::from_lookup(|key| {
            (key == "BLOCKBET_CONTRACT_ADDRESS").then(|| "0x1234".to_string())
        });
        assert_matches!(result, Err(ConfigError::Invalid { key: "BLOCKBET_CONTRACT_ADDRESS", .. }));
    }

    #[test]
    fn test_add_chain_request_uses_hex_id() {
        let request = ChainParameters::monad_testnet().add_request();
        assert_eq!(request[0]["chainId"], "0xa1f6");
        assert_eq!(request[0]["nativeCurrency"]["decimals"], 18);
        assert_eq!(request[0]["blockExplorerUrls"][0], "https://testnet-explorer.monad.xyz");
    }
}
