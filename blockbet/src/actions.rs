// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! User-triggered operations. Each validates locally, submits through the contract
//! binding and reports `Pending`, then `Success` or `Failure`.

use std::{
    collections::HashSet,
    future::Future,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use async_graphql::SimpleObject;
use blockbet_abi::RoundStatus;
use linera_sdk::linera_base_types::Amount;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::{
    config::ChainParameters,
    contract::{BlockBetContract, PendingTransaction},
    error::BlockBetError,
    notifications::{NotificationCenter, NotificationKind},
    state::RoundViewModel,
    validation::{
        parse_bet_amount, unix_now, validate_option_index, validate_options, validate_question,
        validate_treasury, RoundSchedule,
    },
    wallet::Wallet,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, async_graphql::Enum)]
pub enum ActionKind {
    PlaceBet,
    CreateRound,
    ResolveRound,
    ClaimWinnings,
    DeleteRound,
    DeleteAllRounds,
    SetMinBet,
    SetTreasury,
    WithdrawFees,
}

impl ActionKind {
    fn success_title(&self) -> &'static str {
        match self {
            ActionKind::PlaceBet => "Bet placed",
            ActionKind::CreateRound => "Round created",
            ActionKind::ResolveRound => "Round resolved",
            ActionKind::ClaimWinnings => "Winnings claimed",
            ActionKind::DeleteRound => "Round deleted",
            ActionKind::DeleteAllRounds => "All rounds deleted",
            ActionKind::SetMinBet => "Minimum bet updated",
            ActionKind::SetTreasury => "Treasury updated",
            ActionKind::WithdrawFees => "Fees withdrawn",
        }
    }
}

/// Identifies an action for the "disabled while pending" rule.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, SimpleObject)]
pub struct ActionKey {
    pub kind: ActionKind,
    pub round_id: Option<u64>,
}

impl ActionKey {
    pub fn global(kind: ActionKind) -> Self {
        ActionKey {
            kind,
            round_id: None,
        }
    }

    pub fn round(kind: ActionKind, round_id: u64) -> Self {
        ActionKey {
            kind,
            round_id: Some(round_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionPhase {
    Pending,
    Success { transaction_hash: String },
    Failure { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionEvent {
    pub key: ActionKey,
    pub phase: ActionPhase,
}

/// A confirmed action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, SimpleObject)]
pub struct ActionReceipt {
    pub transaction_hash: String,
    pub block_number: u64,
    pub explorer_url: Option<String>,
}

/// Resolving is irreversible; the plan carries the warning the user must acknowledge.
/// Only [`ActionDispatcher::prepare_resolve`] builds one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvePlan {
    round_id: u64,
    correct_option: u32,
    option_label: String,
    warning: String,
}

impl ResolvePlan {
    pub fn round_id(&self) -> u64 {
        self.round_id
    }

    pub fn correct_option(&self) -> u32 {
        self.correct_option
    }

    pub fn option_label(&self) -> &str {
        &self.option_label
    }

    pub fn warning(&self) -> &str {
        &self.warning
    }
}

struct PendingGuard<'a> {
    pending: &'a Mutex<HashSet<ActionKey>>,
    key: ActionKey,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

pub struct ActionDispatcher {
    wallet: Arc<Wallet>,
    view: Arc<RoundViewModel>,
    notifications: Arc<NotificationCenter>,
    chain: ChainParameters,
    round_duration: Duration,
    pending: Mutex<HashSet<ActionKey>>,
    events: broadcast::Sender<ActionEvent>,
}

impl ActionDispatcher {
    pub fn new(
        wallet: Arc<Wallet>,
        view: Arc<RoundViewModel>,
        notifications: Arc<NotificationCenter>,
        round_duration: Duration,
    ) -> Self {
        let (events, _) = broadcast::channel(64);
        ActionDispatcher {
            chain: wallet.chain().clone(),
            wallet,
            view,
            notifications,
            round_duration,
            pending: Mutex::new(HashSet::new()),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ActionEvent> {
        self.events.subscribe()
    }

    pub fn is_pending(&self, key: &ActionKey) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(key)
    }

    pub fn pending_actions(&self) -> Vec<ActionKey> {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .copied()
            .collect()
    }

    pub async fn place_bet(
        &self,
        round_id: u64,
        option: u32,
        amount: &str,
    ) -> Result<ActionReceipt, BlockBetError> {
        let key = ActionKey::round(ActionKind::PlaceBet, round_id);
        self.dispatch(key, |contract| async move {
            if contract.account().is_none() {
                return Err(BlockBetError::validation(
                    "account",
                    "connect a wallet to place a bet",
                ));
            }
            let option_count = match self.cached_round(round_id) {
                Some(snapshot) => {
                    if snapshot.status != RoundStatus::Active {
                        return Err(BlockBetError::validation(
                            "round",
                            "this round is not accepting bets",
                        ));
                    }
                    snapshot.options.len()
                }
                None => contract.options(round_id).await?.len(),
            };
            validate_option_index(option, option_count)?;
            let min_bet = contract.min_bet().await?;
            let amount = parse_bet_amount(amount, min_bet)?;
            contract.place_bet(round_id, option, amount).await
        })
        .await
    }

    /// Starts the round now when no schedule is given.
    pub async fn create_round(
        &self,
        question: &str,
        options: &[String],
        schedule: Option<RoundSchedule>,
    ) -> Result<ActionReceipt, BlockBetError> {
        let key = ActionKey::global(ActionKind::CreateRound);
        self.dispatch(key, |contract| async move {
            let question = validate_question(question)?;
            let options = validate_options(options)?;
            let schedule = match schedule {
                Some(schedule) => RoundSchedule::new(schedule.start_time, schedule.end_time)?,
                None => RoundSchedule::starting_at(unix_now(), self.round_duration)?,
            };
            contract
                .create_round(&question, &options, schedule.start_time, schedule.end_time)
                .await
        })
        .await
    }

    /// Checks a resolution and returns the plan to confirm. Nothing is submitted.
    pub async fn prepare_resolve(
        &self,
        round_id: u64,
        correct_option: u32,
    ) -> Result<ResolvePlan, BlockBetError> {
        let result = async {
            let contract = self.view.contract().await?;
            let (info, options) =
                futures::try_join!(contract.round_info(round_id), contract.options(round_id))?;
            if info.deleted {
                return Err(BlockBetError::RoundUnavailable { round_id });
            }
            if info.resolved {
                return Err(BlockBetError::validation(
                    "round",
                    "this round has already been resolved",
                ));
            }
            validate_option_index(correct_option, options.len())?;
            let option_label = options[correct_option as usize].clone();
            Ok(ResolvePlan {
                round_id,
                correct_option,
                warning: format!(
                    "Resolving round {round_id} with \"{option_label}\" is irreversible. \
                     Claims unlock immediately and the result cannot be changed."
                ),
                option_label,
            })
        }
        .await;
        if let Err(error) = &result {
            self.notifications.push_error(error).await;
        }
        result
    }

    pub async fn resolve_round(&self, plan: &ResolvePlan) -> Result<ActionReceipt, BlockBetError> {
        let key = ActionKey::round(ActionKind::ResolveRound, plan.round_id);
        let (round_id, correct_option) = (plan.round_id, plan.correct_option);
        self.dispatch(key, |contract| async move {
            // The round may have changed since the plan was prepared.
            let options = contract.options(round_id).await?;
            validate_option_index(correct_option, options.len())?;
            contract.resolve_round(round_id, correct_option).await
        })
        .await
    }

    pub async fn claim_winnings(&self, round_id: u64) -> Result<ActionReceipt, BlockBetError> {
        let key = ActionKey::round(ActionKind::ClaimWinnings, round_id);
        self.dispatch(key, |contract| async move {
            let account = contract.account().ok_or_else(|| {
                BlockBetError::validation("account", "connect a wallet to claim winnings")
            })?;
            let (info, bet) = futures::try_join!(
                contract.round_info(round_id),
                contract.user_bet(round_id, account)
            )?;
            let reason = if !bet.exists {
                Some("you have no bet in this round")
            } else if bet.claimed {
                Some("these winnings were already claimed")
            } else if !info.resolved {
                Some("this round is not resolved yet")
            } else if !bet.is_claimable(info.correct_option) {
                Some("this bet did not win")
            } else {
                None
            };
            if let Some(reason) = reason {
                return Err(BlockBetError::validation("claim", reason));
            }
            contract.claim_winnings(round_id).await
        })
        .await
    }

    pub async fn delete_round(&self, round_id: u64) -> Result<ActionReceipt, BlockBetError> {
        let key = ActionKey::round(ActionKind::DeleteRound, round_id);
        self.dispatch(key, |contract| async move { contract.delete_round(round_id).await })
            .await
    }

    pub async fn delete_all_rounds(&self) -> Result<ActionReceipt, BlockBetError> {
        let key = ActionKey::global(ActionKind::DeleteAllRounds);
        self.dispatch(key, |contract| async move { contract.delete_all_rounds().await })
            .await
    }

    pub async fn set_min_bet(&self, amount: &str) -> Result<ActionReceipt, BlockBetError> {
        let key = ActionKey::global(ActionKind::SetMinBet);
        self.dispatch(key, |contract| async move {
            let amount = parse_bet_amount(amount, Amount::ZERO)?;
            contract.set_min_bet(amount).await
        })
        .await
    }

    pub async fn set_treasury(&self, treasury: &str) -> Result<ActionReceipt, BlockBetError> {
        let key = ActionKey::global(ActionKind::SetTreasury);
        self.dispatch(key, |contract| async move {
            let treasury = validate_treasury(treasury)?;
            contract.set_treasury(treasury).await
        })
        .await
    }

    pub async fn withdraw_fees(&self) -> Result<ActionReceipt, BlockBetError> {
        let key = ActionKey::global(ActionKind::WithdrawFees);
        self.dispatch(key, |contract| async move { contract.withdraw_fees().await })
            .await
    }

    fn cached_round(&self, round_id: u64) -> Option<crate::state::RoundSnapshot> {
        self.view
            .latest()
            .filter(|snapshot| snapshot.round_id == round_id)
    }

    fn begin(&self, key: ActionKey) -> Result<PendingGuard<'_>, BlockBetError> {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if !pending.insert(key) {
            return Err(BlockBetError::validation(
                "action",
                "this action is already pending",
            ));
        }
        Ok(PendingGuard {
            pending: &self.pending,
            key,
        })
    }

    fn emit(&self, key: ActionKey, phase: ActionPhase) {
        // No subscribers is fine.
        let _ = self.events.send(ActionEvent { key, phase });
    }

    async fn dispatch<F, Fut>(&self, key: ActionKey, submit: F) -> Result<ActionReceipt, BlockBetError>
    where
        F: FnOnce(BlockBetContract) -> Fut,
        Fut: Future<Output = Result<PendingTransaction, BlockBetError>>,
    {
        let guard = match self.begin(key) {
            Ok(guard) => guard,
            Err(error) => {
                self.notifications.push_error(&error).await;
                return Err(error);
            }
        };
        self.emit(key, ActionPhase::Pending);

        let result = match self.view.contract().await {
            Ok(contract) => match submit(contract).await {
                Ok(pending) => pending.confirmed().await,
                Err(error) => Err(error),
            },
            Err(error) => Err(error),
        };
        drop(guard);

        match result {
            Ok(outcome) => {
                let transaction_hash = outcome.hash.to_string();
                info!(?key, tx_hash = %transaction_hash, block_number = outcome.block_number, "action succeeded");
                self.emit(
                    key,
                    ActionPhase::Success {
                        transaction_hash: transaction_hash.clone(),
                    },
                );
                self.notifications
                    .push(
                        NotificationKind::Success,
                        key.kind.success_title(),
                        format!("Confirmed in block {}", outcome.block_number),
                        Some(transaction_hash.clone()),
                    )
                    .await;
                self.after_success(key).await;
                Ok(ActionReceipt {
                    explorer_url: self.chain.transaction_url(&transaction_hash),
                    transaction_hash,
                    block_number: outcome.block_number,
                })
            }
            Err(error) => {
                warn!(?key, %error, "action failed");
                self.emit(
                    key,
                    ActionPhase::Failure {
                        message: error.user_message(),
                    },
                );
                self.notifications.push_error(&error).await;
                Err(error)
            }
        }
    }

    async fn after_success(&self, key: ActionKey) {
        let refreshed = match (key.kind, key.round_id) {
            (ActionKind::CreateRound | ActionKind::DeleteRound | ActionKind::DeleteAllRounds, _) => {
                self.view.load_latest().await.map(|_| ())
            }
            (_, Some(round_id)) => self.view.load_round(round_id).await.map(|_| ()),
            (_, None) => Ok(()),
        };
        if let Err(error) = refreshed {
            warn!(?key, %error, "view refresh after action failed");
        }
        if let Err(error) = self.wallet.refresh_balance().await {
            warn!(%error, "balance refresh after action failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::Address;

    use super::*;
    use crate::{
        contract::TransactionSettings,
        provider::WalletProvider,
        test_utils::{MockWalletProvider, ALICE, BOB, CONTRACT, OWNER},
    };
    use assert_matches::assert_matches;

    async fn dispatcher(mock: &Arc<MockWalletProvider>, account: Option<Address>) -> ActionDispatcher {
        let wallet = Arc::new(Wallet::new(
            Some(mock.clone() as Arc<dyn WalletProvider>),
            ChainParameters::monad_testnet(),
        ));
        if let Some(account) = account {
            mock.update(|chain| chain.accounts = vec![account]);
            wallet.connect().await.unwrap();
        }
        let contract = wallet
            .contract(CONTRACT, TransactionSettings::default())
            .await
            .unwrap();
        let view = Arc::new(RoundViewModel::new(contract));
        ActionDispatcher::new(
            wallet,
            view,
            Arc::new(NotificationCenter::default()),
            Duration::from_secs(86_400),
        )
    }

    #[tokio::test]
    async fn test_bet_without_account_sends_nothing() {
        let mock = MockWalletProvider::with_round("Q?", &["Yes", "No"]);
        let dispatcher = dispatcher(&mock, None).await;
        let mut events = dispatcher.subscribe();

        let result = dispatcher.place_bet(0, 0, "1").await;
        assert_matches!(result, Err(BlockBetError::ValidationFailed { field: "account", .. }));
        assert_eq!(mock.count_requests("eth_call"), 0);
        assert_eq!(mock.count_requests("eth_sendTransaction"), 0);

        assert_eq!(events.recv().await.unwrap().phase, ActionPhase::Pending);
        assert_matches!(events.recv().await.unwrap().phase, ActionPhase::Failure { .. });
        let notifications = dispatcher.notifications.list().await;
        assert_eq!(notifications[0].title, "Invalid input");
        assert!(dispatcher.pending_actions().is_empty());
    }

    #[tokio::test]
    async fn test_single_option_round_is_rejected_locally() {
        let mock = MockWalletProvider::new();
        let dispatcher = dispatcher(&mock, Some(OWNER)).await;
        let sent_before = mock.count_requests("eth_estimateGas");

        let result = dispatcher
            .create_round("Will it rain?", &["Yes".to_string()], None)
            .await;
        assert_matches!(result, Err(BlockBetError::ValidationFailed { field: "options", .. }));
        assert_eq!(mock.count_requests("eth_estimateGas"), sent_before);
        assert_eq!(mock.count_requests("eth_sendTransaction"), 0);
    }

    #[tokio::test]
    async fn test_losing_bet_cannot_be_claimed() {
        let mock = MockWalletProvider::with_round("Q?", &["Yes", "No"]);
        mock.bet(0, ALICE, 0, Amount::from_tokens(1));
        mock.resolve(0, 1);
        let dispatcher = dispatcher(&mock, Some(ALICE)).await;

        let result = dispatcher.claim_winnings(0).await;
        assert_matches!(
            result,
            Err(BlockBetError::ValidationFailed { field: "claim", message }) if message == "this bet did not win"
        );
        assert_eq!(mock.count_requests("eth_estimateGas"), 0);
        assert_eq!(mock.count_requests("eth_sendTransaction"), 0);
    }

    #[tokio::test]
    async fn test_place_bet_refreshes_view() {
        let mock = MockWalletProvider::with_round("Q?", &["Yes", "No"]);
        let dispatcher = dispatcher(&mock, Some(ALICE)).await;
        let mut events = dispatcher.subscribe();

        let receipt = dispatcher.place_bet(0, 1, "2.5").await.unwrap();
        assert!(receipt
            .explorer_url
            .as_deref()
            .is_some_and(|url| url.ends_with(&receipt.transaction_hash)));

        assert_eq!(events.recv().await.unwrap().phase, ActionPhase::Pending);
        assert_eq!(
            events.recv().await.unwrap().phase,
            ActionPhase::Success {
                transaction_hash: receipt.transaction_hash.clone()
            }
        );

        let snapshot = dispatcher.view.latest().unwrap();
        let bet = snapshot.user_bet.unwrap();
        assert_eq!(bet.amount, "2.5".parse().unwrap());
        assert_eq!(snapshot.options[1].percentage, 100.0);
        assert_eq!(dispatcher.wallet.balance().await, "97.5".parse().unwrap());
    }

    #[tokio::test]
    async fn test_bet_below_minimum_is_rejected() {
        let mock = MockWalletProvider::with_round("Q?", &["Yes", "No"]);
        let dispatcher = dispatcher(&mock, Some(ALICE)).await;
        let result = dispatcher.place_bet(0, 0, "0.001").await;
        assert_matches!(result, Err(BlockBetError::ValidationFailed { field: "amount", .. }));
        let result = dispatcher.place_bet(0, 2, "1").await;
        assert_matches!(result, Err(BlockBetError::ValidationFailed { field: "option", .. }));
        assert_eq!(mock.count_requests("eth_sendTransaction"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_action_is_disabled_while_pending() {
        let mock = MockWalletProvider::with_round("Q?", &["Yes", "No"]);
        mock.update(|chain| chain.receipt_delay = 2);
        let dispatcher = dispatcher(&mock, Some(ALICE)).await;

        let (first, second) = tokio::join!(
            dispatcher.place_bet(0, 0, "1"),
            dispatcher.place_bet(0, 0, "1")
        );
        assert!(first.is_ok());
        assert_matches!(second, Err(BlockBetError::ValidationFailed { field: "action", .. }));
        assert_eq!(mock.count_requests("eth_sendTransaction"), 1);
        assert!(!dispatcher.is_pending(&ActionKey::round(ActionKind::PlaceBet, 0)));
    }

    #[tokio::test]
    async fn test_admin_round_lifecycle() {
        let mock = MockWalletProvider::new();
        let dispatcher = dispatcher(&mock, Some(OWNER)).await;

        let options = vec!["Yes".to_string(), "No".to_string()];
        let schedule = RoundSchedule::new(1_699_999_000, 1_700_100_000).unwrap();
        dispatcher
            .create_round("Will it rain?", &options, Some(schedule))
            .await
            .unwrap();
        let snapshot = dispatcher.view.latest().unwrap();
        assert_eq!(snapshot.round_id, 0);
        assert_eq!(snapshot.question, "Will it rain?");

        assert_matches!(
            dispatcher.prepare_resolve(0, 2).await,
            Err(BlockBetError::ValidationFailed { field: "option", .. })
        );
        let plan = dispatcher.prepare_resolve(0, 1).await.unwrap();
        assert_eq!(plan.option_label(), "No");
        assert!(plan.warning().contains("irreversible"));
        dispatcher.resolve_round(&plan).await.unwrap();
        assert_eq!(dispatcher.view.latest().unwrap().status, RoundStatus::Resolved);

        assert_matches!(
            dispatcher.prepare_resolve(0, 1).await,
            Err(BlockBetError::ValidationFailed { field: "round", .. })
        );
    }

    #[tokio::test]
    async fn test_resolve_rechecks_option_bounds() {
        let mock = MockWalletProvider::with_round("Q?", &["Yes", "No"]);
        let dispatcher = dispatcher(&mock, Some(OWNER)).await;
        let plan = ResolvePlan {
            round_id: 0,
            correct_option: 7,
            option_label: "Maybe".to_string(),
            warning: String::new(),
        };

        let result = dispatcher.resolve_round(&plan).await;
        assert_matches!(result, Err(BlockBetError::ValidationFailed { field: "option", .. }));
        assert_eq!(mock.count_requests("eth_estimateGas"), 0);
        assert_eq!(mock.count_requests("eth_sendTransaction"), 0);
        assert!(dispatcher.pending_actions().is_empty());
    }

    #[tokio::test]
    async fn test_mined_revert_is_reported() {
        let mock = MockWalletProvider::new();
        mock.update(|chain| chain.revert_on_inclusion = true);
        let dispatcher = dispatcher(&mock, Some(OWNER)).await;
        let mut events = dispatcher.subscribe();

        let result = dispatcher.withdraw_fees().await;
        assert_matches!(
            result,
            Err(BlockBetError::RevertedByContract {
                reason: blockbet_abi::ContractRevert::Unrecognized(message)
            }) if message.starts_with("withdrawFees")
        );
        assert_eq!(mock.count_requests("eth_sendTransaction"), 1);
        assert!(dispatcher.pending_actions().is_empty());

        assert_eq!(events.recv().await.unwrap().phase, ActionPhase::Pending);
        assert_matches!(events.recv().await.unwrap().phase, ActionPhase::Failure { .. });
        assert_eq!(dispatcher.notifications.list().await[0].title, "Rejected by contract");
    }

    #[tokio::test]
    async fn test_contract_authorization_is_authoritative() {
        let mock = MockWalletProvider::with_round("Q?", &["Yes", "No"]);
        let dispatcher = dispatcher(&mock, Some(BOB)).await;

        let result = dispatcher.delete_round(0).await;
        assert_matches!(
            result,
            Err(BlockBetError::RevertedByContract { reason: blockbet_abi::ContractRevert::Unauthorized })
        );
        assert_eq!(dispatcher.notifications.list().await[0].title, "Rejected by contract");
    }

    #[tokio::test]
    async fn test_winner_claims_once() {
        let mock = MockWalletProvider::with_round("Q?", &["Yes", "No"]);
        mock.bet(0, BOB, 1, Amount::from_tokens(1));
        let dispatcher = dispatcher(&mock, Some(ALICE)).await;
        dispatcher.place_bet(0, 0, "1").await.unwrap();
        mock.resolve(0, 0);

        dispatcher.claim_winnings(0).await.unwrap();
        assert_eq!(dispatcher.wallet.balance().await, Amount::from_tokens(101));
        assert_matches!(
            dispatcher.claim_winnings(0).await,
            Err(BlockBetError::ValidationFailed { field: "claim", .. })
        );
    }

    #[tokio::test]
    async fn test_owner_settings() {
        let mock = MockWalletProvider::new();
        let dispatcher = dispatcher(&mock, Some(OWNER)).await;

        assert_matches!(
            dispatcher.set_treasury("0x0000000000000000000000000000000000000000").await,
            Err(BlockBetError::ValidationFailed { field: "treasury", .. })
        );
        dispatcher
            .set_treasury("0x1234567890123456789012345678901234567890")
            .await
            .unwrap();
        dispatcher.set_min_bet("0.5").await.unwrap();
        dispatcher.withdraw_fees().await.unwrap();

        let contract = dispatcher.view.contract().await.unwrap();
        assert_eq!(contract.min_bet().await.unwrap(), "0.5".parse().unwrap());
        assert_eq!(
            contract.treasury().await.unwrap().to_string().to_lowercase(),
            "0x1234567890123456789012345678901234567890"
        );
    }
}
