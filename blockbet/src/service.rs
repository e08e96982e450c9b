// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! GraphQL surface over [`BlockBetApp`]. Every resolver delegates; none decides anything.

use std::sync::Arc;

use async_graphql::{EmptySubscription, Error, Object, Result, Schema};
use linera_sdk::linera_base_types::Amount;

use crate::{
    actions::{ActionKey, ActionReceipt},
    app::{AccountView, AdminStatus, BlockBetApp},
    error::BlockBetError,
    notifications::Notification,
    state::{fetch_snapshot, BetHistoryEntry, BetQuote, RoundSnapshot},
    validation::{parse_bet_amount, unix_now, RoundSchedule},
};

pub type BlockBetSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

pub fn build_schema(app: Arc<BlockBetApp>) -> BlockBetSchema {
    Schema::build(
        QueryRoot { app: app.clone() },
        MutationRoot { app },
        EmptySubscription,
    )
    .finish()
}

fn graphql_error(error: BlockBetError) -> Error {
    Error::new(error.user_message())
}

pub struct QueryRoot {
    app: Arc<BlockBetApp>,
}

#[Object]
impl QueryRoot {
    /// The connected account, if any
    async fn account(&self) -> Option<AccountView> {
        self.app.account().await
    }

    /// Native balance of the connected account
    async fn balance(&self) -> Amount {
        self.app.wallet().balance().await
    }

    /// Whether to show admin controls. The contract still checks every admin call.
    async fn admin_status(&self) -> Result<AdminStatus> {
        self.app.admin_status().await.map_err(graphql_error)
    }

    async fn rounds_count(&self) -> Result<u64> {
        self.app.view().rounds_count().await.map_err(graphql_error)
    }

    /// The selected round, as of the last refresh
    async fn current_round(&self) -> Option<RoundSnapshot> {
        self.app.view().latest()
    }

    /// Reads a round without selecting it. Deleted and unknown rounds are null.
    async fn round(&self, id: u64) -> Result<Option<RoundSnapshot>> {
        let contract = self.app.view().contract().await.map_err(graphql_error)?;
        match fetch_snapshot(&contract, id).await {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(BlockBetError::RoundUnavailable { .. }) => Ok(None),
            Err(error) => Err(graphql_error(error)),
        }
    }

    /// Estimated payout of a stake if `option` wins, assuming no further bets
    async fn bet_quote(
        &self,
        round_id: u64,
        option: u32,
        amount: String,
    ) -> Result<Option<BetQuote>> {
        let stake = parse_bet_amount(&amount, Amount::ZERO).map_err(graphql_error)?;
        let snapshot = match self.app.view().latest() {
            Some(snapshot) if snapshot.round_id == round_id => snapshot,
            _ => {
                let contract = self.app.view().contract().await.map_err(graphql_error)?;
                fetch_snapshot(&contract, round_id)
                    .await
                    .map_err(graphql_error)?
            }
        };
        Ok(snapshot.quote(option, stake))
    }

    /// Bets of the connected account, newest first
    async fn bet_history(&self) -> Result<Vec<BetHistoryEntry>> {
        let Some(account) = self.app.wallet().account().await else {
            return Ok(Vec::new());
        };
        self.app
            .view()
            .bet_history(account)
            .await
            .map_err(graphql_error)
    }

    async fn notifications(&self) -> Vec<Notification> {
        self.app.notifications().list().await
    }

    /// Actions awaiting confirmation; their controls stay disabled
    async fn pending_actions(&self) -> Vec<ActionKey> {
        self.app.actions().pending_actions()
    }
}

pub struct MutationRoot {
    app: Arc<BlockBetApp>,
}

#[Object]
impl MutationRoot {
    async fn connect_wallet(&self) -> Result<AccountView> {
        self.app.connect().await.map_err(graphql_error)
    }

    async fn disconnect_wallet(&self) -> Result<bool> {
        self.app.disconnect().await.map_err(graphql_error)?;
        Ok(true)
    }

    /// Selects a round and loads it
    async fn select_round(&self, id: u64) -> Result<RoundSnapshot> {
        self.app.view().load_round(id).await.map_err(graphql_error)
    }

    /// Re-reads the selected round, moving to the newest one if a round was added
    async fn refresh(&self) -> Result<Option<RoundSnapshot>> {
        self.app.view().refresh().await.map_err(graphql_error)
    }

    async fn place_bet(&self, round_id: u64, option: u32, amount: String) -> Result<ActionReceipt> {
        self.app
            .actions()
            .place_bet(round_id, option, &amount)
            .await
            .map_err(graphql_error)
    }

    /// Creates a round. Without a start time it starts now; without an end time it runs
    /// for the configured duration.
    async fn create_round(
        &self,
        question: String,
        options: Vec<String>,
        start_time: Option<u64>,
        end_time: Option<u64>,
    ) -> Result<ActionReceipt> {
        let duration = self.app.parameters().round_duration_secs;
        let schedule = match (start_time, end_time) {
            (None, None) => None,
            (start_time, end_time) => {
                let start_time = start_time.unwrap_or_else(unix_now);
                let end_time = end_time.unwrap_or(start_time.saturating_add(duration));
                Some(RoundSchedule {
                    start_time,
                    end_time,
                })
            }
        };
        self.app
            .actions()
            .create_round(&question, &options, schedule)
            .await
            .map_err(graphql_error)
    }

    /// Resolves a round. Irreversible: refused unless `acknowledge_irreversible` is set.
    async fn resolve_round(
        &self,
        round_id: u64,
        correct_option: u32,
        acknowledge_irreversible: bool,
    ) -> Result<ActionReceipt> {
        let plan = self
            .app
            .actions()
            .prepare_resolve(round_id, correct_option)
            .await
            .map_err(graphql_error)?;
        if !acknowledge_irreversible {
            return Err(Error::new(plan.warning()));
        }
        self.app
            .actions()
            .resolve_round(&plan)
            .await
            .map_err(graphql_error)
    }

    async fn claim_winnings(&self, round_id: u64) -> Result<ActionReceipt> {
        self.app
            .actions()
            .claim_winnings(round_id)
            .await
            .map_err(graphql_error)
    }

    async fn delete_round(&self, round_id: u64) -> Result<ActionReceipt> {
        self.app
            .actions()
            .delete_round(round_id)
            .await
            .map_err(graphql_error)
    }

    async fn delete_all_rounds(&self) -> Result<ActionReceipt> {
        self.app
            .actions()
            .delete_all_rounds()
            .await
            .map_err(graphql_error)
    }

    async fn set_min_bet(&self, amount: String) -> Result<ActionReceipt> {
        self.app
            .actions()
            .set_min_bet(&amount)
            .await
            .map_err(graphql_error)
    }

    async fn set_treasury(&self, treasury: String) -> Result<ActionReceipt> {
        self.app
            .actions()
            .set_treasury(&treasury)
            .await
            .map_err(graphql_error)
    }

    async fn withdraw_fees(&self) -> Result<ActionReceipt> {
        self.app.actions().withdraw_fees().await.map_err(graphql_error)
    }

    async fn dismiss_notification(&self, id: u64) -> bool {
        self.app.notifications().dismiss(id).await
    }
}
