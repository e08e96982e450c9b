// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Read-only projection of on-chain rounds.

use std::{collections::BTreeSet, sync::Arc, time::Duration};

use alloy_primitives::Address;
use async_graphql::SimpleObject;
use blockbet_abi::{BetRecord, RoundStatus, UserBet};
use futures::future::try_join_all;
use linera_sdk::linera_base_types::Amount;
use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};
use serde::{Deserialize, Serialize};
use tokio::{
    sync::{watch, RwLock},
    task::JoinHandle,
    time::MissedTickBehavior,
};
use tracing::{debug, info, warn};

use crate::{contract::BlockBetContract, error::BlockBetError};

const BASIS_POINTS: u64 = 10_000;

/// One option of a round, with its share of the pot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, SimpleObject)]
pub struct OptionView {
    pub index: u32,
    pub label: String,
    pub total: Amount,
    /// Percent of the pot, to two decimals. Zero when the pot is empty.
    pub percentage: f64,
}

/// Immutable snapshot of one round, assembled from a single batch of reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, SimpleObject)]
pub struct RoundSnapshot {
    pub round_id: u64,
    pub question: String,
    pub options: Vec<OptionView>,
    pub start_time: u64,
    pub end_time: u64,
    pub status: RoundStatus,
    pub correct_option: Option<u32>,
    pub total_pot: Amount,
    pub bettor_count: u64,
    /// The connected account's bet, if it placed one.
    pub user_bet: Option<UserBet>,
    pub claimable: bool,
}

impl RoundSnapshot {
    pub fn accepts_bets(&self, now: u64) -> bool {
        self.status == RoundStatus::Active && now >= self.start_time && now < self.end_time
    }

    pub fn option(&self, index: u32) -> Option<&OptionView> {
        self.options.get(index as usize)
    }

    pub fn quote(&self, option: u32, stake: Amount) -> Option<BetQuote> {
        let option = self.option(option)?;
        Some(quote_bet(stake, option.total, self.total_pot))
    }
}

/// Estimated return of a stake if its option wins, assuming no further bets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, SimpleObject)]
pub struct BetQuote {
    pub stake: Amount,
    pub potential_payout: Amount,
    pub multiplier: f64,
    /// Share of the pot the option would hold after the stake, in percent.
    pub implied_chance: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, async_graphql::Enum)]
pub enum BetOutcome {
    Pending,     // Round not resolved yet
    Won,         // Bet option is the correct option
    Lost,        // Another option won
    Unavailable, // Round deleted
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, SimpleObject)]
pub struct BetHistoryEntry {
    pub record: BetRecord,
    pub question: Option<String>,
    pub outcome: BetOutcome,
    pub claimed: bool,
}

fn to_big(amount: Amount) -> BigUint {
    BigUint::from(u128::from(amount))
}

/// `part / whole` in basis points, rounded half up. Zero when `whole` is zero.
fn basis_points(part: &BigUint, whole: &BigUint) -> u64 {
    if whole.is_zero() {
        return 0;
    }
    let doubled = part * BigUint::from(2 * BASIS_POINTS) + whole;
    (doubled / (whole * BigUint::from(2u8))).to_u64().unwrap_or(u64::MAX)
}

/// Percent of the pot held by `part`, to two decimals. Display only.
pub fn share_percentage(part: Amount, pot: Amount) -> f64 {
    basis_points(&to_big(part), &to_big(pot)) as f64 / 100.0
}

/// Payout if the option wins: `stake * (pot + stake) / (option_total + stake)`.
pub fn quote_bet(stake: Amount, option_total: Amount, total_pot: Amount) -> BetQuote {
    let stake_big = to_big(stake);
    let pool_after = to_big(option_total) + &stake_big;
    let pot_after = to_big(total_pot) + &stake_big;
    if pool_after.is_zero() {
        return BetQuote {
            stake,
            potential_payout: Amount::ZERO,
            multiplier: 0.0,
            implied_chance: 0.0,
        };
    }

    let payout = &stake_big * &pot_after / &pool_after;
    let multiplier = basis_points(&payout, &stake_big) as f64 / BASIS_POINTS as f64;
    let implied_chance = basis_points(&pool_after, &pot_after) as f64 / 100.0;
    BetQuote {
        stake,
        potential_payout: Amount::from_attos(payout.to_u128().unwrap_or(u128::MAX)),
        multiplier,
        implied_chance,
    }
}

/// Issues every read a round needs and assembles one snapshot.
pub async fn fetch_snapshot(
    contract: &BlockBetContract,
    round_id: u64,
) -> Result<RoundSnapshot, BlockBetError> {
    let account = contract.account();
    let user_bet = async {
        match account {
            Some(account) => contract.user_bet(round_id, account).await.map(Some),
            None => Ok(None),
        }
    };
    let (info, stats, labels, user_bet) = futures::try_join!(
        contract.round_info(round_id),
        contract.round_stats(round_id),
        contract.options(round_id),
        user_bet,
    )?;
    if info.deleted {
        return Err(BlockBetError::RoundUnavailable { round_id });
    }
    if let Some(correct) = info.correct_option {
        if correct as usize >= labels.len() {
            return Err(BlockBetError::ReadFailed {
                method: "getRoundInfo(uint256)",
                reason: format!(
                    "resolved option {correct} is outside the round's {} options",
                    labels.len()
                ),
            });
        }
    }

    let option_count = u32::try_from(labels.len()).unwrap_or(u32::MAX);
    let totals =
        try_join_all((0..option_count).map(|option| contract.option_total(round_id, option)))
            .await?;
    let options = labels
        .into_iter()
        .zip(totals)
        .zip(0..)
        .map(|((label, total), index)| OptionView {
            index,
            label,
            total,
            percentage: share_percentage(total, stats.total_pot),
        })
        .collect();

    let user_bet = user_bet.filter(|bet| bet.exists);
    let claimable = user_bet
        .as_ref()
        .is_some_and(|bet| bet.is_claimable(info.correct_option));
    Ok(RoundSnapshot {
        round_id,
        status: info.status(),
        question: info.question,
        options,
        start_time: info.start_time,
        end_time: info.end_time,
        correct_option: info.correct_option,
        total_pot: stats.total_pot,
        bettor_count: stats.bettor_count,
        user_bet,
        claimable,
    })
}

/// Owns the currently selected round and its latest snapshot. Holds nothing else.
pub struct RoundViewModel {
    contract: RwLock<Option<BlockBetContract>>,
    selected: RwLock<Option<u64>>,
    rounds_seen: RwLock<Option<u64>>,
    snapshot: watch::Sender<Option<RoundSnapshot>>,
}

impl RoundViewModel {
    pub fn new(contract: BlockBetContract) -> Self {
        Self::with_contract(Some(contract))
    }

    /// A view model with no wallet provider; every read fails with `ProviderMissing`.
    pub fn without_provider() -> Self {
        Self::with_contract(None)
    }

    fn with_contract(contract: Option<BlockBetContract>) -> Self {
        let (snapshot, _) = watch::channel(None);
        RoundViewModel {
            contract: RwLock::new(contract),
            selected: RwLock::new(None),
            rounds_seen: RwLock::new(None),
            snapshot,
        }
    }

    /// Rebinds the reads to `contract`, which signs for the current session if there is one.
    pub async fn set_contract(&self, contract: BlockBetContract) {
        *self.contract.write().await = Some(contract);
    }

    pub async fn contract(&self) -> Result<BlockBetContract, BlockBetError> {
        self.contract
            .read()
            .await
            .clone()
            .ok_or(BlockBetError::ProviderMissing)
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<RoundSnapshot>> {
        self.snapshot.subscribe()
    }

    pub fn latest(&self) -> Option<RoundSnapshot> {
        self.snapshot.borrow().clone()
    }

    pub async fn selected_round(&self) -> Option<u64> {
        *self.selected.read().await
    }

    pub async fn rounds_count(&self) -> Result<u64, BlockBetError> {
        self.contract().await?.rounds_count().await
    }

    /// Selects `round_id` and publishes its snapshot. A deleted or missing round clears it.
    pub async fn load_round(&self, round_id: u64) -> Result<RoundSnapshot, BlockBetError> {
        let contract = self.contract().await?;
        *self.selected.write().await = Some(round_id);
        let result = fetch_snapshot(&contract, round_id).await;
        // Another round may have been selected while this one was loading.
        let still_selected = *self.selected.read().await == Some(round_id);
        match result {
            Ok(snapshot) => {
                if still_selected {
                    debug!(round_id, pot = %snapshot.total_pot, "round loaded");
                    self.snapshot.send_replace(Some(snapshot.clone()));
                } else {
                    debug!(round_id, "round deselected while loading");
                }
                Ok(snapshot)
            }
            Err(error @ BlockBetError::RoundUnavailable { .. }) => {
                if still_selected {
                    self.snapshot.send_replace(None);
                }
                Err(error)
            }
            Err(error) => Err(error),
        }
    }

    /// Selects the newest round.
    pub async fn load_latest(&self) -> Result<Option<RoundSnapshot>, BlockBetError> {
        let count = self.rounds_count().await?;
        *self.rounds_seen.write().await = Some(count);
        match count.checked_sub(1) {
            Some(round_id) => self.load_round(round_id).await.map(Some),
            None => {
                self.snapshot.send_replace(None);
                Ok(None)
            }
        }
    }

    /// Reloads the selected round, moving to the newest round when one appeared.
    pub async fn refresh(&self) -> Result<Option<RoundSnapshot>, BlockBetError> {
        let count = self.rounds_count().await?;
        let previous = self.rounds_seen.write().await.replace(count);
        let selected = self.selected_round().await;
        let target = match (selected, previous) {
            (Some(_), Some(previous)) if count > previous => {
                info!(round_id = count - 1, "new round detected");
                Some(count - 1)
            }
            (Some(round_id), _) => Some(round_id),
            (None, _) => count.checked_sub(1),
        };
        match target {
            Some(round_id) => self.load_round(round_id).await.map(Some),
            None => {
                self.snapshot.send_replace(None);
                Ok(None)
            }
        }
    }

    /// Refreshes every `period` until the handle is dropped.
    pub fn spawn_polling(self: &Arc<Self>, period: Duration) -> PollingHandle {
        let model = self.clone();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(error) = model.refresh().await {
                    warn!(%error, "round refresh failed");
                }
            }
        });
        PollingHandle { task }
    }

    /// The account's bets, newest first, with the outcome of each round.
    pub async fn bet_history(&self, account: Address) -> Result<Vec<BetHistoryEntry>, BlockBetError> {
        let contract = self.contract().await?;
        let records = contract.bet_history(account).await?;
        let round_ids: BTreeSet<u64> = records.iter().map(|record| record.round_id).collect();
        let rounds = try_join_all(round_ids.into_iter().map(|round_id| {
            let contract = &contract;
            async move {
                let info = match contract.round_info(round_id).await {
                    Ok(info) if !info.deleted => info,
                    Ok(_) | Err(BlockBetError::RoundUnavailable { .. }) => return Ok((round_id, None)),
                    Err(error) => return Err(error),
                };
                let bet = contract.user_bet(round_id, account).await?;
                Ok((round_id, Some((info, bet))))
            }
        }))
        .await?;

        Ok(records
            .into_iter()
            .map(|record| {
                let round = rounds
                    .iter()
                    .find(|(round_id, _)| *round_id == record.round_id)
                    .and_then(|(_, round)| round.as_ref());
                match round {
                    None => BetHistoryEntry {
                        record,
                        question: None,
                        outcome: BetOutcome::Unavailable,
                        claimed: false,
                    },
                    Some((info, bet)) => {
                        let outcome = match info.correct_option {
                            None => BetOutcome::Pending,
                            Some(correct) if correct == record.option => BetOutcome::Won,
                            Some(_) => BetOutcome::Lost,
                        };
                        BetHistoryEntry {
                            question: Some(info.question.clone()),
                            outcome,
                            claimed: bet.claimed,
                            record,
                        }
                    }
                }
            })
            .collect())
    }
}

/// Background refresh task; aborted when dropped.
pub struct PollingHandle {
    task: JoinHandle<()>,
}

impl PollingHandle {
    pub fn stop(self) {}
}

impl Drop for PollingHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        contract::TransactionSettings,
        format::format_percentage,
        test_utils::{MockWalletProvider, ALICE, BOB, CONTRACT},
        wallet::Session,
    };
    use assert_matches::assert_matches;

    fn view_model(mock: &Arc<MockWalletProvider>, account: Option<Address>) -> Arc<RoundViewModel> {
        let session = account.map(|account| Session::new(account, mock.chain_id(), mock.clone()));
        let contract =
            BlockBetContract::new(mock.clone(), CONTRACT, session, TransactionSettings::default());
        Arc::new(RoundViewModel::new(contract))
    }

    #[test]
    fn test_percentage_of_empty_pot_is_zero() {
        assert_eq!(share_percentage(Amount::ZERO, Amount::ZERO), 0.0);
        assert_eq!(share_percentage(Amount::from_tokens(1), Amount::ZERO), 0.0);
        assert_eq!(share_percentage(Amount::from_tokens(1), Amount::from_tokens(3)), 33.33);
    }

    #[test]
    fn test_quote_includes_own_stake() {
        let quote = quote_bet(Amount::from_tokens(1), Amount::from_tokens(1), Amount::from_tokens(2));
        assert_eq!(quote.potential_payout, "1.5".parse().unwrap());
        assert_eq!(quote.multiplier, 1.5);
        assert_eq!(quote.implied_chance, 66.67);

        let first = quote_bet(Amount::from_tokens(1), Amount::ZERO, Amount::ZERO);
        assert_eq!(first.potential_payout, Amount::from_tokens(1));
        assert_eq!(first.implied_chance, 100.0);
    }

    #[tokio::test]
    async fn test_even_pot_shows_fifty_percent() {
        let mock = MockWalletProvider::with_round("Will it rain tomorrow?", &["Yes", "No"]);
        mock.bet(0, ALICE, 0, Amount::from_tokens(1));
        mock.bet(0, BOB, 1, Amount::from_tokens(1));

        let snapshot = view_model(&mock, Some(ALICE)).load_round(0).await.unwrap();
        assert_eq!(snapshot.total_pot, Amount::from_tokens(2));
        assert_eq!(snapshot.bettor_count, 2);
        for option in &snapshot.options {
            assert_eq!(format_percentage(option.percentage), "50.0%");
        }
        assert_eq!(snapshot.user_bet.as_ref().map(|bet| bet.option), Some(0));
        assert!(!snapshot.claimable);
    }

    #[tokio::test]
    async fn test_empty_pot_has_zero_percentages() {
        let mock = MockWalletProvider::with_round("Q?", &["A", "B", "C"]);
        let snapshot = view_model(&mock, None).load_round(0).await.unwrap();
        assert!(snapshot.options.iter().all(|option| option.percentage == 0.0));
        assert_eq!(snapshot.user_bet, None);
        assert_eq!(mock.count_requests("eth_call"), 6);
    }

    #[tokio::test]
    async fn test_repeated_reads_are_identical() {
        let mock = MockWalletProvider::with_round("Q?", &["A", "B"]);
        mock.bet(0, ALICE, 1, Amount::from_tokens(3));
        let model = view_model(&mock, Some(ALICE));
        let first = model.load_round(0).await.unwrap();
        let second = model.load_round(0).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_deleted_round_is_unavailable() {
        let mock = MockWalletProvider::with_round("Q?", &["A", "B"]);
        let model = view_model(&mock, None);
        model.load_round(0).await.unwrap();
        mock.update(|chain| chain.rounds[0].deleted = true);

        assert_matches!(
            model.load_round(0).await,
            Err(BlockBetError::RoundUnavailable { round_id: 0 })
        );
        assert_eq!(model.latest(), None);
        assert_matches!(
            model.load_round(9).await,
            Err(BlockBetError::RoundUnavailable { round_id: 9 })
        );
    }

    #[tokio::test]
    async fn test_resolved_round_with_bad_option_is_rejected() {
        let mock = MockWalletProvider::with_round("Q?", &["A", "B"]);
        mock.resolve(0, 5);
        assert_matches!(
            view_model(&mock, None).load_round(0).await,
            Err(BlockBetError::ReadFailed { .. })
        );
    }

    #[tokio::test]
    async fn test_winning_bet_is_claimable() {
        let mock = MockWalletProvider::with_round("Q?", &["A", "B"]);
        mock.bet(0, ALICE, 1, Amount::from_tokens(1));
        mock.resolve(0, 1);
        let snapshot = view_model(&mock, Some(ALICE)).load_round(0).await.unwrap();
        assert_eq!(snapshot.status, RoundStatus::Resolved);
        assert_eq!(snapshot.correct_option, Some(1));
        assert!(snapshot.claimable);
    }

    #[tokio::test]
    async fn test_refresh_selects_newest_round() {
        let mock = MockWalletProvider::with_round("First?", &["A", "B"]);
        mock.add_round("Second?", &["A", "B"]);
        let model = view_model(&mock, None);

        let snapshot = model.refresh().await.unwrap().unwrap();
        assert_eq!(snapshot.round_id, 1);

        model.load_round(0).await.unwrap();
        assert_eq!(model.refresh().await.unwrap().unwrap().round_id, 0);

        mock.add_round("Third?", &["A", "B"]);
        assert_eq!(model.refresh().await.unwrap().unwrap().round_id, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_load_does_not_override_newer_selection() {
        let mock = MockWalletProvider::with_round("First?", &["A", "B"]);
        mock.add_round("Second?", &["A", "B"]);
        let model = view_model(&mock, None);
        mock.update(|chain| chain.read_delay = Some(Duration::from_secs(5)));

        let (slow, fast) = tokio::join!(model.load_round(0), async {
            mock.update(|chain| chain.read_delay = None);
            model.load_round(1).await
        });
        assert_eq!(slow.unwrap().round_id, 0);
        assert_eq!(fast.unwrap().round_id, 1);
        assert_eq!(model.selected_round().await, Some(1));
        assert_eq!(model.latest().map(|snapshot| snapshot.round_id), Some(1));
    }

    #[tokio::test]
    async fn test_reads_without_provider() {
        let model = RoundViewModel::without_provider();
        assert_matches!(model.load_round(0).await, Err(BlockBetError::ProviderMissing));
    }

    #[tokio::test]
    async fn test_refresh_without_rounds() {
        let mock = MockWalletProvider::new();
        assert_eq!(view_model(&mock, None).refresh().await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_polling_publishes_new_rounds() {
        let mock = MockWalletProvider::with_round("First?", &["A", "B"]);
        let model = view_model(&mock, None);
        let mut receiver = model.subscribe();
        let handle = model.spawn_polling(Duration::from_secs(15));

        receiver.changed().await.unwrap();
        assert_eq!(receiver.borrow_and_update().as_ref().map(|s| s.round_id), Some(0));

        mock.add_round("Second?", &["A", "B"]);
        receiver.changed().await.unwrap();
        assert_eq!(receiver.borrow_and_update().as_ref().map(|s| s.round_id), Some(1));

        handle.stop();
        let calls = mock.count_requests("eth_call");
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(mock.count_requests("eth_call"), calls);
    }

    #[tokio::test]
    async fn test_bet_history_outcomes() {
        let mock = MockWalletProvider::with_round("First?", &["A", "B"]);
        mock.add_round("Second?", &["A", "B"]);
        mock.add_round("Third?", &["A", "B"]);
        let model = view_model(&mock, Some(ALICE));
        let contract = model.contract().await.unwrap();
        contract.place_bet(0, 0, Amount::from_tokens(1)).await.unwrap();
        contract.place_bet(1, 0, Amount::from_tokens(1)).await.unwrap();
        contract.place_bet(2, 1, Amount::from_tokens(1)).await.unwrap();
        mock.resolve(0, 0);
        mock.resolve(1, 1);

        let history = model.bet_history(ALICE).await.unwrap();
        let outcomes: Vec<_> = history.iter().map(|entry| (entry.record.round_id, entry.outcome)).collect();
        assert_eq!(
            outcomes,
            vec![(2, BetOutcome::Pending), (1, BetOutcome::Lost), (0, BetOutcome::Won)]
        );
        assert_eq!(history[2].question.as_deref(), Some("First?"));
    }
}
