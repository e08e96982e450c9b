// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

/*! Client for the BlockBet prediction-market contract on Monad.

Connects an injected wallet, reads rounds from the contract, submits bets and admin
actions, and exposes the whole flow through a GraphQL schema. */

pub mod actions;
pub mod app;
pub mod config;
pub mod contract;
pub mod error;
pub mod format;
pub mod notifications;
pub mod provider;
pub mod service;
pub mod state;
pub mod validation;
pub mod wallet;

#[cfg(any(test, feature = "test"))]
pub mod test_utils;

pub use app::BlockBetApp;
pub use blockbet_abi as abi;
pub use config::{BlockBetParameters, ChainParameters};
pub use error::BlockBetError;
pub use provider::{ProviderEvent, ProviderRpcError, WalletProvider};
pub use service::{build_schema, BlockBetSchema};
