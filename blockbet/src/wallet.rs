// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Wallet connection, network enforcement and session lifecycle.

use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use alloy_primitives::Address;
use blockbet_abi::amount_from_wei;
use futures::stream::BoxStream;
use linera_sdk::linera_base_types::Amount;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::{
    config::ChainParameters,
    contract::{BlockBetContract, TransactionSettings},
    error::BlockBetError,
    provider::{
        parse_chain_id, parse_quantity, ProviderEvent, ProviderRpcError, WalletProvider,
        UNRECOGNIZED_CHAIN_CODE,
    },
};

/// A connected account on the configured chain. Clones share liveness: once the session
/// ends, every clone refuses to sign.
#[derive(Clone)]
pub struct Session {
    account: Address,
    chain_id: u64,
    provider: Arc<dyn WalletProvider>,
    live: Arc<AtomicBool>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("account", &self.account)
            .field("chain_id", &self.chain_id)
            .field("live", &self.is_live())
            .finish()
    }
}

impl Session {
    pub(crate) fn new(account: Address, chain_id: u64, provider: Arc<dyn WalletProvider>) -> Self {
        Session {
            account,
            chain_id,
            provider,
            live: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn account(&self) -> Address {
        self.account
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn provider(&self) -> &Arc<dyn WalletProvider> {
        &self.provider
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    pub fn ensure_live(&self) -> Result<(), BlockBetError> {
        if self.is_live() {
            Ok(())
        } else {
            Err(BlockBetError::SessionExpired)
        }
    }

    pub(crate) fn end(&self) {
        self.live.store(false, Ordering::SeqCst);
    }
}

/// What a wallet notification did to the session.
#[derive(Debug, Clone)]
pub enum SessionChange {
    Unchanged,
    /// A new session replaced the previous one (account switch or chain change).
    Replaced(Session),
    Ended,
}

#[derive(Default)]
struct WalletState {
    session: Option<Session>,
    balance: Amount,
}

/// Adapter over the injected provider. Holds at most one live session.
pub struct Wallet {
    provider: Option<Arc<dyn WalletProvider>>,
    chain: ChainParameters,
    state: RwLock<WalletState>,
}

impl Wallet {
    pub fn new(provider: Option<Arc<dyn WalletProvider>>, chain: ChainParameters) -> Self {
        Wallet {
            provider,
            chain,
            state: RwLock::new(WalletState::default()),
        }
    }

    pub fn chain(&self) -> &ChainParameters {
        &self.chain
    }

    pub fn provider(&self) -> Result<Arc<dyn WalletProvider>, BlockBetError> {
        self.provider.clone().ok_or(BlockBetError::ProviderMissing)
    }

    /// Prompts for account access and brings the wallet onto the configured chain.
    pub async fn connect(&self) -> Result<Session, BlockBetError> {
        let provider = self.provider()?;
        let accounts = provider
            .request("eth_requestAccounts", json!([]))
            .await
            .map_err(prompt_error)?;
        let account = first_account(&accounts)?.ok_or(BlockBetError::UserRejected)?;
        self.establish(provider, account).await
    }

    /// Re-establishes a session without prompting, when the wallet already granted access.
    pub async fn restore(&self) -> Result<Option<Session>, BlockBetError> {
        let provider = self.provider()?;
        let accounts = provider
            .request("eth_accounts", json!([]))
            .await
            .map_err(prompt_error)?;
        match first_account(&accounts)? {
            Some(account) => Ok(Some(self.establish(provider, account).await?)),
            None => Ok(None),
        }
    }

    pub async fn disconnect(&self) {
        let mut state = self.state.write().await;
        if let Some(session) = state.session.take() {
            session.end();
            info!(account = %session.account(), "wallet disconnected");
        }
        state.balance = Amount::ZERO;
    }

    pub async fn session(&self) -> Option<Session> {
        self.state.read().await.session.clone()
    }

    pub async fn account(&self) -> Option<Address> {
        self.state.read().await.session.as_ref().map(Session::account)
    }

    /// Last fetched balance of the connected account.
    pub async fn balance(&self) -> Amount {
        self.state.read().await.balance
    }

    pub async fn refresh_balance(&self) -> Result<Amount, BlockBetError> {
        let Some(session) = self.session().await else {
            return Ok(Amount::ZERO);
        };
        let balance = fetch_balance(session.provider().as_ref(), session.account()).await?;
        let mut state = self.state.write().await;
        if state.session.as_ref().map(Session::account) == Some(session.account()) {
            state.balance = balance;
        }
        Ok(balance)
    }

    /// Wallet notifications, as a stream.
    pub fn events(&self) -> Result<BoxStream<'static, ProviderEvent>, BlockBetError> {
        Ok(self.provider()?.subscribe())
    }

    /// Applies a wallet notification. Any change of account or chain ends the current
    /// session before anything else happens.
    pub async fn handle_event(&self, event: ProviderEvent) -> Result<SessionChange, BlockBetError> {
        let Some(current) = self.session().await else {
            debug!(?event, "ignoring wallet event without a session");
            return Ok(SessionChange::Unchanged);
        };
        match event {
            ProviderEvent::Disconnected => {
                self.disconnect().await;
                Ok(SessionChange::Ended)
            }
            ProviderEvent::AccountsChanged(accounts) => match accounts.first() {
                None => {
                    self.disconnect().await;
                    Ok(SessionChange::Ended)
                }
                Some(account) if *account == current.account() => Ok(SessionChange::Unchanged),
                Some(account) => {
                    info!(from = %current.account(), to = %account, "wallet account switched");
                    current.end();
                    let session = self.reestablish(current.provider().clone(), *account).await?;
                    Ok(SessionChange::Replaced(session))
                }
            },
            ProviderEvent::ChainChanged(chain_id) => {
                if chain_id == current.chain_id() {
                    return Ok(SessionChange::Unchanged);
                }
                info!(from = current.chain_id(), to = chain_id, "wallet chain changed");
                current.end();
                let session = self
                    .reestablish(current.provider().clone(), current.account())
                    .await?;
                Ok(SessionChange::Replaced(session))
            }
        }
    }

    /// Contract handle bound to the current session, if any.
    pub async fn contract(
        &self,
        address: Address,
        settings: TransactionSettings,
    ) -> Result<BlockBetContract, BlockBetError> {
        let provider = self.provider()?;
        Ok(BlockBetContract::new(provider, address, self.session().await, settings))
    }

    async fn reestablish(
        &self,
        provider: Arc<dyn WalletProvider>,
        account: Address,
    ) -> Result<Session, BlockBetError> {
        match self.establish(provider, account).await {
            Ok(session) => Ok(session),
            Err(error) => {
                warn!(%error, "could not re-establish wallet session");
                self.disconnect().await;
                Err(error)
            }
        }
    }

    async fn establish(
        &self,
        provider: Arc<dyn WalletProvider>,
        account: Address,
    ) -> Result<Session, BlockBetError> {
        let chain_id = self.ensure_chain(provider.as_ref()).await?;
        let balance = fetch_balance(provider.as_ref(), account).await?;
        let session = Session::new(account, chain_id, provider);

        let mut state = self.state.write().await;
        if let Some(previous) = state.session.replace(session.clone()) {
            previous.end();
        }
        state.balance = balance;
        info!(%account, chain_id, "wallet connected");
        Ok(session)
    }

    async fn ensure_chain(&self, provider: &dyn WalletProvider) -> Result<u64, BlockBetError> {
        let target = self.chain.chain_id;
        let current = current_chain_id(provider).await?;
        if current == target {
            return Ok(current);
        }

        info!(current, target, "requesting network switch");
        match provider
            .request("wallet_switchEthereumChain", self.chain.switch_request())
            .await
        {
            Ok(_) => {}
            Err(error) if error.code == UNRECOGNIZED_CHAIN_CODE => {
                info!(target, chain_name = %self.chain.chain_name, "adding network to wallet");
                provider
                    .request("wallet_addEthereumChain", self.chain.add_request())
                    .await
                    .map_err(prompt_error)?;
                provider
                    .request("wallet_switchEthereumChain", self.chain.switch_request())
                    .await
                    .map_err(prompt_error)?;
            }
            Err(error) => return Err(prompt_error(error)),
        }

        let switched = current_chain_id(provider).await?;
        if switched != target {
            return Err(BlockBetError::NetworkError(format!(
                "wallet is on chain {switched}, expected {target}"
            )));
        }
        Ok(switched)
    }
}

fn prompt_error(error: ProviderRpcError) -> BlockBetError {
    if error.is_user_rejection() {
        BlockBetError::UserRejected
    } else {
        BlockBetError::NetworkError(error.to_string())
    }
}

fn first_account(accounts: &Value) -> Result<Option<Address>, BlockBetError> {
    let accounts: Vec<Address> = serde_json::from_value(accounts.clone())
        .map_err(|e| BlockBetError::NetworkError(format!("malformed account list: {e}")))?;
    Ok(accounts.into_iter().next())
}

async fn current_chain_id(provider: &dyn WalletProvider) -> Result<u64, BlockBetError> {
    let chain_id = provider
        .request("eth_chainId", json!([]))
        .await
        .map_err(|e| BlockBetError::NetworkError(e.to_string()))?;
    parse_chain_id(&chain_id)
        .ok_or_else(|| BlockBetError::NetworkError(format!("malformed chain id {chain_id}")))
}

async fn fetch_balance(provider: &dyn WalletProvider, account: Address) -> Result<Amount, BlockBetError> {
    let balance = provider
        .request("eth_getBalance", json!([account, "latest"]))
        .await
        .map_err(|e| BlockBetError::NetworkError(e.to_string()))?;
    let balance = parse_quantity(&balance)
        .ok_or_else(|| BlockBetError::NetworkError(format!("malformed balance {balance}")))?;
    amount_from_wei("balance", balance).map_err(|e| BlockBetError::NetworkError(e.to_string()))
}
