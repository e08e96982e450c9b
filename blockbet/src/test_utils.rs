// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! In-memory wallet and contract simulator used by the tests.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use alloy_primitives::{address, Address, Bytes, B256, U256};
use alloy_sol_types::{SolEvent, SolInterface, SolValue};
use async_trait::async_trait;
use blockbet_abi::{wei_from_amount, ContractRevert, IBlockBet, IBlockBetCalls};
use futures::{
    stream::{self, BoxStream},
    StreamExt,
};
use linera_sdk::linera_base_types::Amount;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio::sync::broadcast;

use crate::{
    config::{MONAD_MAINNET_CHAIN_ID, MONAD_TESTNET_CHAIN_ID},
    provider::{ProviderEvent, ProviderRpcError, WalletProvider, UNRECOGNIZED_CHAIN_CODE},
};

pub const ALICE: Address = address!("00000000000000000000000000000000000a11ce");
pub const BOB: Address = address!("0000000000000000000000000000000000000b0b");
pub const OWNER: Address = address!("00000000000000000000000000000000000000aa");
pub const TREASURY: Address = address!("00000000000000000000000000000000000000ee");
pub const CONTRACT: Address = address!("00000000000000000000000000000000000000cc");
pub const GAS_ESTIMATE: u64 = 100_000;
pub const GENESIS_TIME: u64 = 1_700_000_000;

#[derive(Debug, Clone, Default)]
pub struct MockBet {
    pub option: u32,
    pub amount: U256,
    pub claimed: bool,
}

#[derive(Debug, Clone)]
pub struct MockRound {
    pub question: String,
    pub options: Vec<String>,
    pub start_time: u64,
    pub end_time: u64,
    pub active: bool,
    pub resolved: bool,
    pub deleted: bool,
    pub correct_option: u32,
    pub totals: Vec<U256>,
    pub bets: HashMap<Address, MockBet>,
}

impl MockRound {
    fn pot(&self) -> U256 {
        self.totals.iter().fold(U256::ZERO, |pot, total| pot + *total)
    }
}

#[derive(Debug, Clone)]
struct MockReceipt {
    receipt: Value,
    polls_remaining: u32,
}

/// Simulated wallet and chain state.
#[derive(Debug, Clone)]
pub struct MockChain {
    pub rounds: Vec<MockRound>,
    pub owner: Address,
    pub treasury: Address,
    pub min_bet: U256,
    pub fees: U256,
    pub now: u64,
    pub block_number: u64,
    pub accounts: Vec<Address>,
    pub authorized: bool,
    pub wallet_chain_id: u64,
    pub known_chains: Vec<u64>,
    pub balances: HashMap<Address, U256>,
    pub reject_connect: bool,
    pub reject_switch: bool,
    pub reject_signing: bool,
    pub fail_reads: bool,
    pub fail_balance: bool,
    /// Mined transactions fail with status 0.
    pub revert_on_inclusion: bool,
    /// Number of receipt polls answered with `null` before the receipt appears.
    pub receipt_delay: u32,
    /// Latency of every `eth_call`.
    pub read_delay: Option<Duration>,
    receipts: HashMap<B256, MockReceipt>,
    logs: Vec<Value>,
    requests: Vec<(String, Value)>,
    transactions: Vec<Value>,
}

impl Default for MockChain {
    fn default() -> Self {
        MockChain {
            rounds: Vec::new(),
            owner: OWNER,
            treasury: TREASURY,
            min_bet: wei_from_amount(Amount::from_attos(10_000_000_000_000_000)),
            fees: U256::ZERO,
            now: GENESIS_TIME,
            block_number: 1,
            accounts: vec![ALICE],
            authorized: false,
            wallet_chain_id: MONAD_TESTNET_CHAIN_ID,
            known_chains: vec![1, MONAD_TESTNET_CHAIN_ID, MONAD_MAINNET_CHAIN_ID],
            balances: HashMap::new(),
            reject_connect: false,
            reject_switch: false,
            reject_signing: false,
            fail_reads: false,
            fail_balance: false,
            revert_on_inclusion: false,
            receipt_delay: 0,
            read_delay: None,
            receipts: HashMap::new(),
            logs: Vec::new(),
            requests: Vec::new(),
            transactions: Vec::new(),
        }
    }
}

impl MockChain {
    fn round(&self, round_id: U256) -> Result<&MockRound, ContractRevert> {
        usize::try_from(round_id)
            .ok()
            .and_then(|index| self.rounds.get(index))
            .ok_or(ContractRevert::RoundNotFound)
    }

    fn round_mut(&mut self, round_id: U256) -> Result<&mut MockRound, ContractRevert> {
        usize::try_from(round_id)
            .ok()
            .and_then(|index| self.rounds.get_mut(index))
            .ok_or(ContractRevert::RoundNotFound)
    }

    fn balance_mut(&mut self, account: Address) -> &mut U256 {
        self.balances
            .entry(account)
            .or_insert_with(|| wei_from_amount(Amount::from_tokens(100)))
    }

    fn only_owner(&self, sender: Address) -> Result<(), ContractRevert> {
        if sender == self.owner {
            Ok(())
        } else {
            Err(ContractRevert::Unauthorized)
        }
    }

    /// Executes calldata the way the deployed contract would.
    fn execute(&mut self, sender: Address, value: U256, data: &[u8]) -> Result<Vec<u8>, ContractRevert> {
        let call = IBlockBetCalls::abi_decode(data)
            .map_err(|e| ContractRevert::Unrecognized(format!("bad calldata: {e}")))?;
        let output = match call {
            IBlockBetCalls::getRoundInfo(call) => {
                let round = self.round(call.roundId)?;
                (
                    round.question.clone(),
                    U256::from(round.start_time),
                    U256::from(round.end_time),
                    round.active,
                    round.resolved,
                    round.deleted,
                    U256::from(round.correct_option),
                )
                    .abi_encode_params()
            }
            IBlockBetCalls::getOptions(call) => (self.round(call.roundId)?.options.clone(),).abi_encode_params(),
            IBlockBetCalls::getOptionTotals(call) => {
                let round = self.round(call.roundId)?;
                let total = usize::try_from(call.option)
                    .ok()
                    .and_then(|option| round.totals.get(option))
                    .ok_or(ContractRevert::InvalidOption)?;
                (*total,).abi_encode_params()
            }
            IBlockBetCalls::getRoundStats(call) => {
                let round = self.round(call.roundId)?;
                (round.pot(), U256::from(round.bets.len())).abi_encode_params()
            }
            IBlockBetCalls::getUserBet(call) => {
                let round = self.round(call.roundId)?;
                let bet = round.bets.get(&call.user);
                let MockBet { option, amount, claimed } = bet.cloned().unwrap_or_default();
                (U256::from(option), amount, bet.is_some(), claimed).abi_encode_params()
            }
            IBlockBetCalls::roundsCount(_) => (U256::from(self.rounds.len()),).abi_encode_params(),
            IBlockBetCalls::owner(_) => (self.owner,).abi_encode_params(),
            IBlockBetCalls::treasury(_) => (self.treasury,).abi_encode_params(),
            IBlockBetCalls::minBet(_) => (self.min_bet,).abi_encode_params(),
            IBlockBetCalls::placeBet(call) => {
                let (now, min_bet) = (self.now, self.min_bet);
                let round = self.round_mut(call.roundId)?;
                if round.deleted {
                    return Err(ContractRevert::RoundNotFound);
                }
                if !round.active || round.resolved || now > round.end_time {
                    return Err(ContractRevert::NotActive);
                }
                if now < round.start_time {
                    return Err(ContractRevert::NotStarted);
                }
                let option = u32::try_from(call.option).map_err(|_| ContractRevert::InvalidOption)?;
                if option as usize >= round.options.len() {
                    return Err(ContractRevert::InvalidOption);
                }
                if value.is_zero() || value < min_bet || round.bets.contains_key(&sender) {
                    return Err(ContractRevert::InvalidParams);
                }
                round.totals[option as usize] += value;
                round.bets.insert(sender, MockBet { option, amount: value, claimed: false });
                *self.balance_mut(sender) -= value;
                let event = IBlockBet::BetPlaced {
                    roundId: call.roundId,
                    bettor: sender,
                    option: call.option,
                    amount: value,
                };
                self.pending_log(event.encode_log_data());
                Vec::new()
            }
            IBlockBetCalls::createRound(call) => {
                self.only_owner(sender)?;
                let count = call.options.len();
                if call.question.trim().is_empty()
                    || !(blockbet_abi::MIN_OPTIONS..=blockbet_abi::MAX_OPTIONS).contains(&count)
                    || call.endTime <= call.startTime
                {
                    return Err(ContractRevert::InvalidParams);
                }
                let round_id = self.rounds.len();
                self.rounds.push(MockRound {
                    question: call.question,
                    options: call.options,
                    start_time: u64::try_from(call.startTime).map_err(|_| ContractRevert::InvalidParams)?,
                    end_time: u64::try_from(call.endTime).map_err(|_| ContractRevert::InvalidParams)?,
                    active: true,
                    resolved: false,
                    deleted: false,
                    correct_option: 0,
                    totals: vec![U256::ZERO; count],
                    bets: HashMap::new(),
                });
                (U256::from(round_id),).abi_encode_params()
            }
            IBlockBetCalls::resolveRound(call) => {
                self.only_owner(sender)?;
                let round = self.round_mut(call.roundId)?;
                if round.resolved || round.deleted {
                    return Err(ContractRevert::AlreadyFinalized);
                }
                let option = u32::try_from(call.correctOption).map_err(|_| ContractRevert::InvalidOption)?;
                if option as usize >= round.options.len() {
                    return Err(ContractRevert::InvalidOption);
                }
                round.resolved = true;
                round.active = false;
                round.correct_option = option;
                Vec::new()
            }
            IBlockBetCalls::claimWinnings(call) => {
                let round = self.round_mut(call.roundId)?;
                if !round.resolved {
                    return Err(ContractRevert::NotActive);
                }
                let correct = round.correct_option;
                let pot = round.pot();
                let winners = round.totals[correct as usize];
                let bet = round
                    .bets
                    .get_mut(&sender)
                    .filter(|bet| bet.option == correct && !bet.claimed)
                    .ok_or(ContractRevert::NoClaim)?;
                bet.claimed = true;
                let payout = bet.amount * pot / winners;
                *self.balance_mut(sender) += payout;
                Vec::new()
            }
            IBlockBetCalls::deleteRound(call) => {
                self.only_owner(sender)?;
                let round = self.round_mut(call.roundId)?;
                round.deleted = true;
                round.active = false;
                Vec::new()
            }
            IBlockBetCalls::deleteAllRounds(_) => {
                self.only_owner(sender)?;
                for round in &mut self.rounds {
                    round.deleted = true;
                    round.active = false;
                }
                Vec::new()
            }
            IBlockBetCalls::setMinBet(call) => {
                self.only_owner(sender)?;
                self.min_bet = call.amount;
                Vec::new()
            }
            IBlockBetCalls::setTreasury(call) => {
                self.only_owner(sender)?;
                if call.newTreasury == Address::ZERO {
                    return Err(ContractRevert::InvalidParams);
                }
                self.treasury = call.newTreasury;
                Vec::new()
            }
            IBlockBetCalls::withdrawFees(_) => {
                self.only_owner(sender)?;
                self.fees = U256::ZERO;
                Vec::new()
            }
        };
        Ok(output)
    }

    fn pending_log(&mut self, log: alloy_primitives::LogData) {
        self.logs.push(json!({
            "topics": log.topics(),
            "data": log.data,
            "blockNumber": U256::from(self.block_number),
            "transactionHash": Value::Null,
        }));
    }

    fn send_transaction(&mut self, transaction: &Value) -> Result<Value, ProviderRpcError> {
        let sender: Address = field(transaction, "from").ok_or_else(invalid_params)?;
        let value: U256 = field(transaction, "value").unwrap_or_default();
        let data: Bytes = field(transaction, "data").unwrap_or_default();
        self.transactions.push(transaction.clone());

        let nonce = self.transactions.len() as u64;
        let hash = B256::left_padding_from(&nonce.to_be_bytes());
        self.block_number += 1;

        let status = if self.revert_on_inclusion {
            0u64
        } else {
            let logs_before = self.logs.len();
            match self.execute(sender, value, &data) {
                Ok(_) => {
                    for log in &mut self.logs[logs_before..] {
                        log["transactionHash"] = json!(hash);
                        log["blockNumber"] = json!(U256::from(self.block_number));
                    }
                    1
                }
                Err(_) => {
                    self.logs.truncate(logs_before);
                    0
                }
            }
        };
        self.receipts.insert(
            hash,
            MockReceipt {
                receipt: json!({
                    "transactionHash": hash,
                    "blockNumber": U256::from(self.block_number),
                    "status": U256::from(status),
                    "gasUsed": U256::from(GAS_ESTIMATE / 2),
                }),
                polls_remaining: self.receipt_delay,
            },
        );
        Ok(json!(hash))
    }
}

fn field<T: DeserializeOwned>(value: &Value, key: &str) -> Option<T> {
    serde_json::from_value(value.get(key)?.clone()).ok()
}

fn invalid_params() -> ProviderRpcError {
    ProviderRpcError::new(-32602, "invalid params")
}

fn revert(reason: ContractRevert) -> ProviderRpcError {
    ProviderRpcError::reverted(reason.encode().unwrap_or_default())
}

/// A wallet provider backed by [`MockChain`].
pub struct MockWalletProvider {
    chain: Mutex<MockChain>,
    events: broadcast::Sender<ProviderEvent>,
}

impl MockWalletProvider {
    pub fn new() -> Arc<Self> {
        let (events, _) = broadcast::channel(16);
        Arc::new(MockWalletProvider {
            chain: Mutex::new(MockChain::default()),
            events,
        })
    }

    pub fn with_round(question: &str, options: &[&str]) -> Arc<Self> {
        let mock = Self::new();
        mock.add_round(question, options);
        mock
    }

    /// Adds an active round that started a minute ago and ends in an hour.
    pub fn add_round(&self, question: &str, options: &[&str]) -> u64 {
        self.update(|chain| {
            chain.rounds.push(MockRound {
                question: question.to_string(),
                options: options.iter().map(|option| option.to_string()).collect(),
                start_time: chain.now - 60,
                end_time: chain.now + 3600,
                active: true,
                resolved: false,
                deleted: false,
                correct_option: 0,
                totals: vec![U256::ZERO; options.len()],
                bets: HashMap::new(),
            });
            chain.rounds.len() as u64 - 1
        })
    }

    /// Records a bet directly in the contract state.
    pub fn bet(&self, round_id: u64, bettor: Address, option: u32, amount: Amount) {
        self.update(|chain| {
            let round = &mut chain.rounds[round_id as usize];
            let amount = wei_from_amount(amount);
            round.totals[option as usize] += amount;
            round.bets.insert(bettor, MockBet { option, amount, claimed: false });
        })
    }

    pub fn resolve(&self, round_id: u64, correct_option: u32) {
        self.update(|chain| {
            let round = &mut chain.rounds[round_id as usize];
            round.resolved = true;
            round.active = false;
            round.correct_option = correct_option;
        })
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut MockChain) -> R) -> R {
        f(&mut self.chain.lock().unwrap())
    }

    pub fn chain_id(&self) -> u64 {
        MONAD_TESTNET_CHAIN_ID
    }

    pub fn count_requests(&self, method: &str) -> usize {
        self.update(|chain| chain.requests.iter().filter(|(m, _)| m == method).count())
    }

    pub fn last_transaction(&self) -> Option<Value> {
        self.update(|chain| chain.transactions.last().cloned())
    }

    pub fn emit(&self, event: ProviderEvent) {
        let _ = self.events.send(event);
    }
}

#[async_trait]
impl WalletProvider for MockWalletProvider {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderRpcError> {
        if method == "eth_call" {
            if let Some(delay) = self.update(|chain| chain.read_delay) {
                tokio::time::sleep(delay).await;
            }
        }
        let mut chain = self.chain.lock().unwrap();
        chain.requests.push((method.to_string(), params.clone()));
        match method {
            "eth_requestAccounts" => {
                if chain.reject_connect {
                    return Err(ProviderRpcError::user_rejected());
                }
                chain.authorized = true;
                Ok(json!(chain.accounts))
            }
            "eth_accounts" => Ok(if chain.authorized {
                json!(chain.accounts)
            } else {
                json!([])
            }),
            "eth_chainId" => Ok(json!(format!("{:#x}", chain.wallet_chain_id))),
            "wallet_switchEthereumChain" => {
                if chain.reject_switch {
                    return Err(ProviderRpcError::user_rejected());
                }
                let chain_id: U256 = field(&params[0], "chainId").ok_or_else(invalid_params)?;
                let chain_id = u64::try_from(chain_id).map_err(|_| invalid_params())?;
                if !chain.known_chains.contains(&chain_id) {
                    return Err(ProviderRpcError::new(UNRECOGNIZED_CHAIN_CODE, "Unrecognized chain ID"));
                }
                chain.wallet_chain_id = chain_id;
                Ok(Value::Null)
            }
            "wallet_addEthereumChain" => {
                let chain_id: U256 = field(&params[0], "chainId").ok_or_else(invalid_params)?;
                let chain_id = u64::try_from(chain_id).map_err(|_| invalid_params())?;
                chain.known_chains.push(chain_id);
                Ok(Value::Null)
            }
            "eth_getBalance" => {
                if chain.fail_balance {
                    return Err(ProviderRpcError::new(-32603, "upstream unavailable"));
                }
                let account: Address =
                    serde_json::from_value(params[0].clone()).map_err(|_| invalid_params())?;
                Ok(json!(*chain.balance_mut(account)))
            }
            "eth_call" => {
                if chain.fail_reads {
                    return Err(ProviderRpcError::new(-32603, "upstream unavailable"));
                }
                let sender: Address = field(&params[0], "from").unwrap_or_default();
                let data: Bytes = field(&params[0], "data").ok_or_else(invalid_params)?;
                // Views never change state; run against a scratch copy regardless.
                let mut scratch = chain.clone();
                scratch
                    .execute(sender, U256::ZERO, &data)
                    .map(|output| json!(Bytes::from(output)))
                    .map_err(revert)
            }
            "eth_estimateGas" => {
                let sender: Address = field(&params[0], "from").ok_or_else(invalid_params)?;
                let value: U256 = field(&params[0], "value").unwrap_or_default();
                let data: Bytes = field(&params[0], "data").ok_or_else(invalid_params)?;
                let mut scratch = chain.clone();
                scratch
                    .execute(sender, value, &data)
                    .map(|_| json!(U256::from(GAS_ESTIMATE)))
                    .map_err(revert)
            }
            "eth_sendTransaction" => {
                if chain.reject_signing {
                    return Err(ProviderRpcError::user_rejected());
                }
                chain.send_transaction(&params[0])
            }
            "eth_getTransactionReceipt" => {
                let hash: B256 = serde_json::from_value(params[0].clone()).map_err(|_| invalid_params())?;
                let Some(pending) = chain.receipts.get_mut(&hash) else {
                    return Ok(Value::Null);
                };
                if pending.polls_remaining > 0 {
                    pending.polls_remaining -= 1;
                    return Ok(Value::Null);
                }
                Ok(pending.receipt.clone())
            }
            "eth_getLogs" => {
                let topics: Vec<Option<B256>> = field(&params[0], "topics").unwrap_or_default();
                let logs = chain
                    .logs
                    .iter()
                    .filter(|log| {
                        let log_topics: Vec<B256> = field(log, "topics").unwrap_or_default();
                        topics.iter().enumerate().all(|(index, topic)| match topic {
                            Some(topic) => log_topics.get(index) == Some(topic),
                            None => true,
                        })
                    })
                    .cloned()
                    .collect::<Vec<_>>();
                Ok(Value::Array(logs))
            }
            _ => Err(ProviderRpcError::new(-32601, format!("method {method} not supported"))),
        }
    }

    fn subscribe(&self) -> BoxStream<'static, ProviderEvent> {
        stream::unfold(self.events.subscribe(), |mut receiver| async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => return Some((event, receiver)),
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        })
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bet_placed_topic_matches_event_signature() {
        assert_eq!(
            IBlockBet::BetPlaced::SIGNATURE,
            "BetPlaced(uint256,address,uint256,uint256)"
        );
    }
}
