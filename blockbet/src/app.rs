// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Wires the wallet, the contract binding, the view model and the dispatchers together.

use std::{sync::Arc, time::Duration};

use async_graphql::SimpleObject;
use futures::StreamExt;
use linera_sdk::linera_base_types::Amount;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::{
    actions::ActionDispatcher,
    config::BlockBetParameters,
    contract::{BlockBetContract, TransactionSettings},
    error::BlockBetError,
    format::{format_address, format_amount},
    notifications::NotificationCenter,
    provider::{ProviderEvent, WalletProvider},
    state::{PollingHandle, RoundViewModel},
    wallet::{SessionChange, Wallet},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, SimpleObject)]
pub struct AccountView {
    pub address: String,
    pub short_address: String,
    pub chain_id: u64,
    pub balance: Amount,
    /// Balance with four decimals.
    pub display_balance: String,
}

/// Whether admin controls should be shown. Never used to gate a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, SimpleObject)]
pub struct AdminStatus {
    pub owner: String,
    /// The connected account is the contract owner.
    pub is_owner: bool,
    /// The connected account equals the configured admin hint.
    pub matches_hint: bool,
    pub show_admin_controls: bool,
}

/// The client application: one wallet, one contract, one selected round.
pub struct BlockBetApp {
    parameters: BlockBetParameters,
    wallet: Arc<Wallet>,
    view: Arc<RoundViewModel>,
    actions: ActionDispatcher,
    notifications: Arc<NotificationCenter>,
}

impl BlockBetApp {
    pub fn new(parameters: BlockBetParameters, provider: Option<Arc<dyn WalletProvider>>) -> Self {
        let settings = transaction_settings(&parameters);
        let view = match &provider {
            Some(provider) => RoundViewModel::new(BlockBetContract::new(
                provider.clone(),
                parameters.contract_address,
                None,
                settings,
            )),
            None => RoundViewModel::without_provider(),
        };
        let view = Arc::new(view);
        let wallet = Arc::new(Wallet::new(provider, parameters.chain.clone()));
        let notifications = Arc::new(NotificationCenter::default());
        let actions = ActionDispatcher::new(
            wallet.clone(),
            view.clone(),
            notifications.clone(),
            Duration::from_secs(parameters.round_duration_secs),
        );
        BlockBetApp {
            parameters,
            wallet,
            view,
            actions,
            notifications,
        }
    }

    pub fn parameters(&self) -> &BlockBetParameters {
        &self.parameters
    }

    pub fn wallet(&self) -> &Arc<Wallet> {
        &self.wallet
    }

    pub fn view(&self) -> &Arc<RoundViewModel> {
        &self.view
    }

    pub fn actions(&self) -> &ActionDispatcher {
        &self.actions
    }

    pub fn notifications(&self) -> &Arc<NotificationCenter> {
        &self.notifications
    }

    pub async fn connect(&self) -> Result<AccountView, BlockBetError> {
        let result = async {
            self.wallet.connect().await?;
            self.rebind().await?;
            self.account()
                .await
                .ok_or(BlockBetError::SessionExpired)
        }
        .await;
        if let Err(error) = &result {
            self.notifications.push_error(error).await;
        }
        result
    }

    /// Silent reconnect for a wallet that already authorized this site.
    pub async fn restore(&self) -> Result<Option<AccountView>, BlockBetError> {
        if self.wallet.restore().await?.is_none() {
            return Ok(None);
        }
        self.rebind().await?;
        Ok(self.account().await)
    }

    pub async fn disconnect(&self) -> Result<(), BlockBetError> {
        self.wallet.disconnect().await;
        self.rebind().await
    }

    pub async fn account(&self) -> Option<AccountView> {
        let session = self.wallet.session().await?;
        let balance = self.wallet.balance().await;
        Some(AccountView {
            address: session.account().to_string(),
            short_address: format_address(&session.account()),
            chain_id: session.chain_id(),
            balance,
            display_balance: format_amount(balance),
        })
    }

    /// `owner()` is the source of truth; the configured hint is cosmetic.
    pub async fn admin_status(&self) -> Result<AdminStatus, BlockBetError> {
        let owner = self.view.contract().await?.owner().await?;
        let account = self.wallet.account().await;
        let is_owner = account == Some(owner);
        let matches_hint = account.is_some() && account == self.parameters.admin_hint;
        Ok(AdminStatus {
            owner: owner.to_string(),
            is_owner,
            matches_hint,
            show_admin_controls: is_owner || matches_hint,
        })
    }

    /// Applies a wallet notification and rebinds the view to the resulting session.
    pub async fn handle_wallet_event(&self, event: ProviderEvent) -> Result<SessionChange, BlockBetError> {
        let change = self.wallet.handle_event(event).await;
        // Rebinding even on failure drops a session that can no longer sign.
        self.rebind().await?;
        match &change {
            Ok(SessionChange::Unchanged) => {}
            Ok(_) => {
                if let Err(error) = self.view.refresh().await {
                    warn!(%error, "refresh after session change failed");
                }
            }
            Err(error) => {
                self.notifications.push_error(error).await;
            }
        }
        change
    }

    /// Forwards wallet notifications to [`Self::handle_wallet_event`] until dropped.
    pub fn spawn_event_listener(self: &Arc<Self>) -> Result<EventListener, BlockBetError> {
        let mut events = self.wallet.events()?;
        let app = self.clone();
        let task = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                debug!(?event, "wallet event");
                if let Err(error) = app.handle_wallet_event(event).await {
                    warn!(%error, "wallet event handling failed");
                }
            }
        });
        Ok(EventListener { task })
    }

    pub fn spawn_polling(&self) -> PollingHandle {
        self.view.spawn_polling(self.parameters.poll_interval())
    }

    async fn rebind(&self) -> Result<(), BlockBetError> {
        let contract = self
            .wallet
            .contract(self.parameters.contract_address, transaction_settings(&self.parameters))
            .await?;
        self.view.set_contract(contract).await;
        Ok(())
    }
}

fn transaction_settings(parameters: &BlockBetParameters) -> TransactionSettings {
    TransactionSettings {
        confirmation_poll_interval: parameters.confirmation_poll_interval(),
        gas_buffer_percent: parameters.gas_buffer_percent,
    }
}

/// Wallet notification listener; aborted when dropped.
pub struct EventListener {
    task: JoinHandle<()>,
}

impl Drop for EventListener {
    fn drop(&mut self) {
        self.task.abort();
    }
}
