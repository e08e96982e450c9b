// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Typed binding of the deployed contract. Raw tuples are decoded into records here and
//! never leave this module.

use std::{fmt, sync::Arc, time::Duration};

use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::{SolCall, SolEvent};
use blockbet_abi::{
    amount_from_wei, narrow_u64, wei_from_amount, BetRecord, ContractRevert, IBlockBet,
    RoundInfo, RoundStats, UserBet,
};
use linera_sdk::linera_base_types::Amount;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::{
    error::BlockBetError,
    provider::{parse_quantity, ProviderRpcError, WalletProvider},
    wallet::Session,
};

/// How mutating calls are submitted and awaited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionSettings {
    pub confirmation_poll_interval: Duration,
    pub gas_buffer_percent: u64,
}

impl Default for TransactionSettings {
    fn default() -> Self {
        TransactionSettings {
            confirmation_poll_interval: Duration::from_secs(2),
            gas_buffer_percent: 20,
        }
    }
}

/// A failed view call, before it is mapped into the taxonomy.
#[derive(Debug)]
struct ReadError {
    method: &'static str,
    revert: Option<ContractRevert>,
    reason: String,
}

impl ReadError {
    fn new(method: &'static str, reason: impl ToString) -> Self {
        ReadError {
            method,
            revert: None,
            reason: reason.to_string(),
        }
    }

    fn from_provider(method: &'static str, error: ProviderRpcError) -> Self {
        let revert = error
            .revert_data()
            .map(|data| ContractRevert::decode(&data));
        let reason = match &revert {
            Some(revert) => revert.to_string(),
            None => error.to_string(),
        };
        ReadError {
            method,
            revert,
            reason,
        }
    }

    /// Reads on a round that does not exist surface as `RoundUnavailable`.
    fn for_round(self, round_id: u64) -> BlockBetError {
        if self.revert == Some(ContractRevert::RoundNotFound) {
            BlockBetError::RoundUnavailable { round_id }
        } else {
            self.into()
        }
    }
}

impl From<ReadError> for BlockBetError {
    fn from(error: ReadError) -> Self {
        BlockBetError::ReadFailed {
            method: error.method,
            reason: error.reason,
        }
    }
}

fn send_error(error: ProviderRpcError) -> BlockBetError {
    if error.is_user_rejection() {
        return BlockBetError::TransactionRejected;
    }
    if let Some(data) = error.revert_data() {
        return BlockBetError::RevertedByContract {
            reason: ContractRevert::decode(&data),
        };
    }
    if error.is_revert() {
        return BlockBetError::RevertedByContract {
            reason: ContractRevert::Unrecognized(error.message),
        };
    }
    BlockBetError::NetworkError(error.to_string())
}

/// Handle on the deployed contract for one provider and, optionally, one signing session.
#[derive(Clone)]
pub struct BlockBetContract {
    provider: Arc<dyn WalletProvider>,
    address: Address,
    session: Option<Session>,
    settings: TransactionSettings,
}

impl fmt::Debug for BlockBetContract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockBetContract")
            .field("address", &self.address)
            .field("session", &self.session)
            .field("settings", &self.settings)
            .finish()
    }
}

impl BlockBetContract {
    pub fn new(
        provider: Arc<dyn WalletProvider>,
        address: Address,
        session: Option<Session>,
        settings: TransactionSettings,
    ) -> Self {
        BlockBetContract {
            provider,
            address,
            session,
            settings,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// The connected account, if any.
    pub fn account(&self) -> Option<Address> {
        self.session.as_ref().map(Session::account)
    }

    async fn call<C: SolCall>(&self, call: C) -> Result<C::Return, ReadError> {
        let mut request = json!({
            "to": self.address,
            "data": Bytes::from(call.abi_encode()),
        });
        if let Some(account) = self.account() {
            request["from"] = json!(account);
        }
        debug!(method = C::SIGNATURE, "eth_call");
        let output = self
            .provider
            .request("eth_call", json!([request, "latest"]))
            .await
            .map_err(|e| ReadError::from_provider(C::SIGNATURE, e))?;
        let output: Bytes = serde_json::from_value(output)
            .map_err(|e| ReadError::new(C::SIGNATURE, format!("malformed call result: {e}")))?;
        C::abi_decode_returns(&output).map_err(|e| ReadError::new(C::SIGNATURE, e))
    }

    pub async fn round_info(&self, round_id: u64) -> Result<RoundInfo, BlockBetError> {
        let call = IBlockBet::getRoundInfoCall {
            roundId: U256::from(round_id),
        };
        let raw = self.call(call).await.map_err(|e| e.for_round(round_id))?;
        RoundInfo::decode(round_id, raw).map_err(|e| read_failed(IBlockBet::getRoundInfoCall::SIGNATURE, e))
    }

    pub async fn options(&self, round_id: u64) -> Result<Vec<String>, BlockBetError> {
        let call = IBlockBet::getOptionsCall {
            roundId: U256::from(round_id),
        };
        self.call(call).await.map_err(|e| e.for_round(round_id))
    }

    pub async fn option_total(&self, round_id: u64, option: u32) -> Result<Amount, BlockBetError> {
        let call = IBlockBet::getOptionTotalsCall {
            roundId: U256::from(round_id),
            option: U256::from(option),
        };
        let total = self.call(call).await.map_err(|e| e.for_round(round_id))?;
        amount_from_wei("optionTotal", total)
            .map_err(|e| read_failed(IBlockBet::getOptionTotalsCall::SIGNATURE, e))
    }

    pub async fn round_stats(&self, round_id: u64) -> Result<RoundStats, BlockBetError> {
        let call = IBlockBet::getRoundStatsCall {
            roundId: U256::from(round_id),
        };
        let raw = self.call(call).await.map_err(|e| e.for_round(round_id))?;
        RoundStats::decode(raw).map_err(|e| read_failed(IBlockBet::getRoundStatsCall::SIGNATURE, e))
    }

    pub async fn user_bet(&self, round_id: u64, account: Address) -> Result<UserBet, BlockBetError> {
        let call = IBlockBet::getUserBetCall {
            roundId: U256::from(round_id),
            user: account,
        };
        let raw = self.call(call).await.map_err(|e| e.for_round(round_id))?;
        UserBet::decode(raw).map_err(|e| read_failed(IBlockBet::getUserBetCall::SIGNATURE, e))
    }

    pub async fn rounds_count(&self) -> Result<u64, BlockBetError> {
        let count = self.call(IBlockBet::roundsCountCall {}).await?;
        narrow_u64("roundsCount", count)
            .map_err(|e| read_failed(IBlockBet::roundsCountCall::SIGNATURE, e))
    }

    pub async fn owner(&self) -> Result<Address, BlockBetError> {
        Ok(self.call(IBlockBet::ownerCall {}).await?)
    }

    pub async fn treasury(&self) -> Result<Address, BlockBetError> {
        Ok(self.call(IBlockBet::treasuryCall {}).await?)
    }

    pub async fn min_bet(&self) -> Result<Amount, BlockBetError> {
        let min_bet = self.call(IBlockBet::minBetCall {}).await?;
        amount_from_wei("minBet", min_bet).map_err(|e| read_failed(IBlockBet::minBetCall::SIGNATURE, e))
    }

    /// `BetPlaced` logs of `bettor`, newest first.
    pub async fn bet_history(&self, bettor: Address) -> Result<Vec<BetRecord>, BlockBetError> {
        let method = "BetPlaced";
        let filter = json!({
            "address": self.address,
            "fromBlock": "0x0",
            "toBlock": "latest",
            "topics": [IBlockBet::BetPlaced::SIGNATURE_HASH, Value::Null, bettor.into_word()],
        });
        let logs = self
            .provider
            .request("eth_getLogs", json!([filter]))
            .await
            .map_err(|e| BlockBetError::from(ReadError::from_provider(method, e)))?;
        let logs: Vec<RpcLog> = serde_json::from_value(logs)
            .map_err(|e| read_failed(method, format!("malformed logs: {e}")))?;

        let mut records = logs
            .into_iter()
            .map(|log| {
                let event = IBlockBet::BetPlaced::decode_raw_log(log.topics.iter().copied(), &log.data)
                    .map_err(|e| read_failed(method, e))?;
                let block_number = u64::try_from(log.block_number)
                    .map_err(|_| read_failed(method, "block number out of range"))?;
                BetRecord::decode(event, log.transaction_hash, block_number)
                    .map_err(|e| read_failed(method, e))
            })
            .collect::<Result<Vec<_>, _>>()?;
        records.sort_by(|a, b| b.block_number.cmp(&a.block_number));
        Ok(records)
    }

    pub async fn place_bet(
        &self,
        round_id: u64,
        option: u32,
        value: Amount,
    ) -> Result<PendingTransaction, BlockBetError> {
        let call = IBlockBet::placeBetCall {
            roundId: U256::from(round_id),
            option: U256::from(option),
        };
        self.send(call, wei_from_amount(value)).await
    }

    pub async fn create_round(
        &self,
        question: &str,
        options: &[String],
        start_time: u64,
        end_time: u64,
    ) -> Result<PendingTransaction, BlockBetError> {
        let call = IBlockBet::createRoundCall {
            question: question.to_string(),
            options: options.to_vec(),
            startTime: U256::from(start_time),
            endTime: U256::from(end_time),
        };
        self.send(call, U256::ZERO).await
    }

    pub async fn resolve_round(
        &self,
        round_id: u64,
        correct_option: u32,
    ) -> Result<PendingTransaction, BlockBetError> {
        let call = IBlockBet::resolveRoundCall {
            roundId: U256::from(round_id),
            correctOption: U256::from(correct_option),
        };
        self.send(call, U256::ZERO).await
    }

    pub async fn claim_winnings(&self, round_id: u64) -> Result<PendingTransaction, BlockBetError> {
        let call = IBlockBet::claimWinningsCall {
            roundId: U256::from(round_id),
        };
        self.send(call, U256::ZERO).await
    }

    pub async fn delete_round(&self, round_id: u64) -> Result<PendingTransaction, BlockBetError> {
        let call = IBlockBet::deleteRoundCall {
            roundId: U256::from(round_id),
        };
        self.send(call, U256::ZERO).await
    }

    pub async fn delete_all_rounds(&self) -> Result<PendingTransaction, BlockBetError> {
        self.send(IBlockBet::deleteAllRoundsCall {}, U256::ZERO).await
    }

    pub async fn set_min_bet(&self, amount: Amount) -> Result<PendingTransaction, BlockBetError> {
        let call = IBlockBet::setMinBetCall {
            amount: wei_from_amount(amount),
        };
        self.send(call, U256::ZERO).await
    }

    pub async fn set_treasury(&self, treasury: Address) -> Result<PendingTransaction, BlockBetError> {
        let call = IBlockBet::setTreasuryCall {
            newTreasury: treasury,
        };
        self.send(call, U256::ZERO).await
    }

    pub async fn withdraw_fees(&self) -> Result<PendingTransaction, BlockBetError> {
        self.send(IBlockBet::withdrawFeesCall {}, U256::ZERO).await
    }

    /// Estimates, signs and submits one transaction. Never retried: a second submission
    /// is always a new user action.
    async fn send<C: SolCall>(&self, call: C, value: U256) -> Result<PendingTransaction, BlockBetError> {
        let session = self
            .session
            .as_ref()
            .ok_or_else(|| BlockBetError::validation("account", "connect a wallet first"))?;
        session.ensure_live()?;
        let provider = session.provider().clone();

        let mut transaction = json!({
            "from": session.account(),
            "to": self.address,
            "data": Bytes::from(call.abi_encode()),
        });
        if !value.is_zero() {
            transaction["value"] = json!(value);
        }

        let estimate = provider
            .request("eth_estimateGas", json!([transaction.clone()]))
            .await
            .map_err(|e| {
                warn!(method = C::SIGNATURE, error = %e, "gas estimation failed");
                send_error(e)
            })?;
        let estimate = parse_quantity(&estimate)
            .ok_or_else(|| BlockBetError::NetworkError("malformed gas estimate".to_string()))?;
        let gas = estimate + estimate * U256::from(self.settings.gas_buffer_percent) / U256::from(100u64);
        transaction["gas"] = json!(gas);

        // A chain change may have ended the session while the estimate was in flight.
        session.ensure_live()?;
        let hash = provider
            .request("eth_sendTransaction", json!([transaction]))
            .await
            .map_err(send_error)?;
        let hash: B256 = serde_json::from_value(hash)
            .map_err(|e| BlockBetError::NetworkError(format!("malformed transaction hash: {e}")))?;
        info!(method = C::SIGNATURE, %hash, account = %session.account(), "transaction submitted");

        Ok(PendingTransaction {
            hash,
            method: C::SIGNATURE,
            provider,
            poll_interval: self.settings.confirmation_poll_interval,
        })
    }
}

fn read_failed(method: &'static str, reason: impl ToString) -> BlockBetError {
    BlockBetError::ReadFailed {
        method,
        reason: reason.to_string(),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcLog {
    topics: Vec<B256>,
    data: Bytes,
    transaction_hash: B256,
    block_number: U256,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcReceipt {
    block_number: Option<U256>,
    status: Option<U256>,
    gas_used: Option<U256>,
}

/// Result of a confirmed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionOutcome {
    pub hash: B256,
    pub block_number: u64,
    pub gas_used: U256,
}

/// A submitted transaction awaiting confirmation.
pub struct PendingTransaction {
    hash: B256,
    method: &'static str,
    provider: Arc<dyn WalletProvider>,
    poll_interval: Duration,
}

impl fmt::Debug for PendingTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingTransaction")
            .field("hash", &self.hash)
            .field("method", &self.method)
            .finish()
    }
}

impl PendingTransaction {
    pub fn hash(&self) -> B256 {
        self.hash
    }

    /// Waits for the receipt. There is no client-side timeout; the chain decides.
    pub async fn confirmed(self) -> Result<TransactionOutcome, BlockBetError> {
        loop {
            let receipt = self
                .provider
                .request("eth_getTransactionReceipt", json!([self.hash]))
                .await
                .map_err(|e| BlockBetError::NetworkError(format!("waiting for {}: {e}", self.hash)))?;
            if receipt.is_null() {
                tokio::time::sleep(self.poll_interval).await;
                continue;
            }

            let receipt: RpcReceipt = serde_json::from_value(receipt)
                .map_err(|e| BlockBetError::NetworkError(format!("malformed receipt: {e}")))?;
            let block_number = receipt
                .block_number
                .and_then(|number| u64::try_from(number).ok())
                .unwrap_or_default();
            if receipt.status == Some(U256::ZERO) {
                warn!(method = self.method, hash = %self.hash, block_number, "transaction reverted");
                return Err(BlockBetError::RevertedByContract {
                    reason: ContractRevert::Unrecognized(format!(
                        "{} reverted in block {block_number}",
                        self.method
                    )),
                });
            }
            info!(method = self.method, hash = %self.hash, block_number, "transaction confirmed");
            return Ok(TransactionOutcome {
                hash: self.hash,
                block_number,
                gas_used: receipt.gas_used.unwrap_or_default(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::test_utils::{MockWalletProvider, ALICE, CONTRACT, OWNER};
    use assert_matches::assert_matches;

    fn reader(mock: &Arc<MockWalletProvider>) -> BlockBetContract {
        BlockBetContract::new(mock.clone(), CONTRACT, None, TransactionSettings::default())
    }

    fn signer(mock: &Arc<MockWalletProvider>, account: Address) -> BlockBetContract {
        let session = Session::new(account, mock.chain_id(), mock.clone());
        BlockBetContract::new(mock.clone(), CONTRACT, Some(session), TransactionSettings::default())
    }

    #[tokio::test]
    async fn test_views_decode_into_records() {
        let mock = MockWalletProvider::with_round("Will it rain tomorrow?", &["Yes", "No"]);
        mock.bet(0, ALICE, 1, Amount::from_tokens(2));
        let contract = reader(&mock);

        assert_eq!(contract.rounds_count().await.unwrap(), 1);
        assert_eq!(contract.owner().await.unwrap(), OWNER);
        let info = contract.round_info(0).await.unwrap();
        assert_eq!(info.question, "Will it rain tomorrow?");
        assert!(info.active);
        assert_eq!(contract.options(0).await.unwrap(), vec!["Yes", "No"]);
        assert_eq!(contract.option_total(0, 1).await.unwrap(), Amount::from_tokens(2));
        let stats = contract.round_stats(0).await.unwrap();
        assert_eq!(stats.total_pot, Amount::from_tokens(2));
        assert_eq!(stats.bettor_count, 1);
        let bet = contract.user_bet(0, ALICE).await.unwrap();
        assert_eq!(bet.option, 1);
        assert!(bet.exists);
    }

    #[tokio::test]
    async fn test_missing_round_is_unavailable() {
        let mock = MockWalletProvider::new();
        let result = reader(&mock).round_info(7).await;
        assert_matches!(result, Err(BlockBetError::RoundUnavailable { round_id: 7 }));
    }

    #[tokio::test]
    async fn test_read_failure_is_not_retried() {
        let mock = MockWalletProvider::with_round("Q?", &["A", "B"]);
        mock.update(|chain| chain.fail_reads = true);
        let result = reader(&mock).rounds_count().await;
        assert_matches!(result, Err(BlockBetError::ReadFailed { method: "roundsCount()", .. }));
        assert_eq!(mock.count_requests("eth_call"), 1);
    }

    #[tokio::test]
    async fn test_bet_round_trips_exact_amount() {
        let mock = MockWalletProvider::with_round("Q?", &["A", "B"]);
        let contract = signer(&mock, ALICE);
        let amount: Amount = "0.123456789012345678".parse().unwrap();

        let pending = contract.place_bet(0, 1, amount).await.unwrap();
        let outcome = pending.confirmed().await.unwrap();
        assert!(outcome.block_number > 0);

        let bet = contract.user_bet(0, ALICE).await.unwrap();
        assert_eq!(bet.amount, amount);
    }

    #[tokio::test]
    async fn test_gas_estimate_is_buffered() {
        let mock = MockWalletProvider::with_round("Q?", &["A", "B"]);
        signer(&mock, ALICE)
            .place_bet(0, 0, Amount::from_tokens(1))
            .await
            .unwrap();
        let sent = mock.last_transaction().unwrap();
        let gas = parse_quantity(&sent["gas"]).unwrap();
        assert_eq!(gas, U256::from(crate::test_utils::GAS_ESTIMATE * 120 / 100));
    }

    #[tokio::test]
    async fn test_contract_revert_is_decoded_before_signing() {
        let mock = MockWalletProvider::with_round("Q?", &["A", "B"]);
        let result = signer(&mock, ALICE).resolve_round(0, 0).await;
        assert_matches!(
            result,
            Err(BlockBetError::RevertedByContract { reason: ContractRevert::Unauthorized })
        );
        assert_eq!(mock.count_requests("eth_sendTransaction"), 0);
    }

    #[tokio::test]
    async fn test_declined_signature() {
        let mock = MockWalletProvider::with_round("Q?", &["A", "B"]);
        mock.update(|chain| chain.reject_signing = true);
        let result = signer(&mock, ALICE).place_bet(0, 0, Amount::from_tokens(1)).await;
        assert_matches!(result, Err(BlockBetError::TransactionRejected));
    }

    #[tokio::test]
    async fn test_ended_session_cannot_sign() {
        let mock = MockWalletProvider::with_round("Q?", &["A", "B"]);
        let session = Session::new(ALICE, mock.chain_id(), mock.clone());
        let contract =
            BlockBetContract::new(mock.clone(), CONTRACT, Some(session.clone()), TransactionSettings::default());
        session.end();
        let result = contract.place_bet(0, 0, Amount::from_tokens(1)).await;
        assert_matches!(result, Err(BlockBetError::SessionExpired));
        assert_eq!(mock.count_requests("eth_estimateGas"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_confirmation_waits_for_receipt() {
        let mock = MockWalletProvider::with_round("Q?", &["A", "B"]);
        mock.update(|chain| chain.receipt_delay = 3);
        let pending = signer(&mock, ALICE)
            .place_bet(0, 0, Amount::from_tokens(1))
            .await
            .unwrap();
        let hash = pending.hash();
        let outcome = pending.confirmed().await.unwrap();
        assert_eq!(outcome.hash, hash);
        assert_eq!(mock.count_requests("eth_getTransactionReceipt"), 4);
    }

    #[tokio::test]
    async fn test_bet_history_newest_first() {
        let mock = MockWalletProvider::with_round("Q?", &["A", "B"]);
        mock.add_round("Second?", &["X", "Y", "Z"]);
        let contract = signer(&mock, ALICE);
        contract.place_bet(0, 1, Amount::from_tokens(1)).await.unwrap();
        contract.place_bet(1, 2, Amount::from_tokens(3)).await.unwrap();

        let history = contract.bet_history(ALICE).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].round_id, 1);
        assert_eq!(history[0].option, 2);
        assert_eq!(history[0].amount, Amount::from_tokens(3));
        assert_eq!(history[1].round_id, 0);
    }
}
