// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

/*! ABI of the deployed BlockBet prediction-market contract */

use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::{sol, SolError, SolInterface};
use async_graphql::SimpleObject;
use linera_sdk::linera_base_types::Amount;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use self::IBlockBet::{IBlockBetCalls, IBlockBetErrors, IBlockBetEvents};

/// Smallest number of options a round can carry.
pub const MIN_OPTIONS: usize = 2;
/// Largest number of options a round can carry.
pub const MAX_OPTIONS: usize = 10;

sol! {
    /// Interface of the deployed contract. Selectors and argument encodings must match
    /// the deployment bit for bit.
    #[derive(Debug, PartialEq, Eq)]
    interface IBlockBet {
        error AlreadyFinalized();
        error InvalidOption();
        error InvalidParams();
        error NoClaim();
        error NotActive();
        error NotStarted();
        error RoundNotFound();
        error TransferFailed();
        error Unauthorized();

        event RoundCreated(uint256 indexed roundId, string question);
        event BetPlaced(uint256 indexed roundId, address indexed bettor, uint256 option, uint256 amount);
        event RoundResolved(uint256 indexed roundId, uint256 correctOption);
        event WinningsClaimed(uint256 indexed roundId, address indexed winner, uint256 amount);
        event RoundDeleted(uint256 indexed roundId);

        // Views
        function getRoundInfo(uint256 roundId) external view returns (
            string question,
            uint256 startTime,
            uint256 endTime,
            bool active,
            bool resolved,
            bool deleted,
            uint256 correctOption
        );
        function getOptions(uint256 roundId) external view returns (string[]);
        function getOptionTotals(uint256 roundId, uint256 option) external view returns (uint256);
        function getRoundStats(uint256 roundId) external view returns (uint256 totalPot, uint256 bettorCount);
        function getUserBet(uint256 roundId, address user) external view returns (
            uint256 option,
            uint256 amount,
            bool exists,
            bool claimed
        );
        function roundsCount() external view returns (uint256);
        function owner() external view returns (address);
        function treasury() external view returns (address);
        function minBet() external view returns (uint256);

        // Transactions
        function placeBet(uint256 roundId, uint256 option) external payable;
        function createRound(string question, string[] options, uint256 startTime, uint256 endTime) external returns (uint256);
        function resolveRound(uint256 roundId, uint256 correctOption) external;
        function claimWinnings(uint256 roundId) external;
        function deleteRound(uint256 roundId) external;
        function deleteAllRounds() external;
        function setMinBet(uint256 amount) external;
        function setTreasury(address newTreasury) external;
        function withdrawFees() external;
    }
}

/// A value returned by the contract does not fit the typed record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AbiError {
    #[error("field `{field}` is out of range: {value}")]
    OutOfRange { field: &'static str, value: String },
}

/// Structured revert reasons of the deployed contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum ContractRevert {
    #[error("this round has already been finalized")]
    AlreadyFinalized,
    #[error("invalid betting option selected")]
    InvalidOption,
    #[error("invalid parameters")]
    InvalidParams,
    #[error("nothing to claim for this round")]
    NoClaim,
    #[error("this betting round is not active")]
    NotActive,
    #[error("this betting round has not started yet")]
    NotStarted,
    #[error("round not found")]
    RoundNotFound,
    #[error("transfer of funds failed")]
    TransferFailed,
    #[error("you are not authorized to perform this action")]
    Unauthorized,
    #[error("{0}")]
    Unrecognized(String),
}

impl ContractRevert {
    /// Decodes ABI-encoded revert data (selector followed by arguments).
    pub fn decode(data: &[u8]) -> Self {
        match IBlockBetErrors::abi_decode(data) {
            Ok(IBlockBetErrors::AlreadyFinalized(_)) => ContractRevert::AlreadyFinalized,
            Ok(IBlockBetErrors::InvalidOption(_)) => ContractRevert::InvalidOption,
            Ok(IBlockBetErrors::InvalidParams(_)) => ContractRevert::InvalidParams,
            Ok(IBlockBetErrors::NoClaim(_)) => ContractRevert::NoClaim,
            Ok(IBlockBetErrors::NotActive(_)) => ContractRevert::NotActive,
            Ok(IBlockBetErrors::NotStarted(_)) => ContractRevert::NotStarted,
            Ok(IBlockBetErrors::RoundNotFound(_)) => ContractRevert::RoundNotFound,
            Ok(IBlockBetErrors::TransferFailed(_)) => ContractRevert::TransferFailed,
            Ok(IBlockBetErrors::Unauthorized(_)) => ContractRevert::Unauthorized,
            Err(_) => ContractRevert::Unrecognized(format!(
                "unrecognized revert data {}",
                Bytes::copy_from_slice(data)
            )),
        }
    }

    /// Encodes the revert the way the contract emits it. `Unrecognized` has no encoding.
    pub fn encode(&self) -> Option<Vec<u8>> {
        let data = match self {
            ContractRevert::AlreadyFinalized => IBlockBet::AlreadyFinalized {}.abi_encode(),
            ContractRevert::InvalidOption => IBlockBet::InvalidOption {}.abi_encode(),
            ContractRevert::InvalidParams => IBlockBet::InvalidParams {}.abi_encode(),
            ContractRevert::NoClaim => IBlockBet::NoClaim {}.abi_encode(),
            ContractRevert::NotActive => IBlockBet::NotActive {}.abi_encode(),
            ContractRevert::NotStarted => IBlockBet::NotStarted {}.abi_encode(),
            ContractRevert::RoundNotFound => IBlockBet::RoundNotFound {}.abi_encode(),
            ContractRevert::TransferFailed => IBlockBet::TransferFailed {}.abi_encode(),
            ContractRevert::Unauthorized => IBlockBet::Unauthorized {}.abi_encode(),
            ContractRevert::Unrecognized(_) => return None,
        };
        Some(data)
    }
}

/// Status of a prediction round, derived from the contract's flags.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, async_graphql::Enum)]
pub enum RoundStatus {
    Active,   // Accepting bets
    Closed,   // Not accepting bets, awaiting resolution
    Resolved, // Correct option announced, claims unlocked
}

/// Round attributes as returned by `getRoundInfo`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, SimpleObject)]
pub struct RoundInfo {
    pub round_id: u64,
    pub question: String,
    pub start_time: u64,
    pub end_time: u64,
    pub active: bool,
    pub resolved: bool,
    pub deleted: bool,
    /// Only present once the round is resolved.
    pub correct_option: Option<u32>,
}

impl RoundInfo {
    pub fn decode(round_id: u64, raw: IBlockBet::getRoundInfoReturn) -> Result<Self, AbiError> {
        let correct_option = if raw.resolved {
            Some(narrow_u32("correctOption", raw.correctOption)?)
        } else {
            None
        };
        Ok(RoundInfo {
            round_id,
            question: raw.question,
            start_time: narrow_u64("startTime", raw.startTime)?,
            end_time: narrow_u64("endTime", raw.endTime)?,
            active: raw.active,
            resolved: raw.resolved,
            deleted: raw.deleted,
            correct_option,
        })
    }

    pub fn status(&self) -> RoundStatus {
        if self.resolved {
            RoundStatus::Resolved
        } else if self.active {
            RoundStatus::Active
        } else {
            RoundStatus::Closed
        }
    }
}

/// Aggregates returned by `getRoundStats`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, SimpleObject)]
pub struct RoundStats {
    pub total_pot: Amount,
    pub bettor_count: u64,
}

impl RoundStats {
    pub fn decode(raw: IBlockBet::getRoundStatsReturn) -> Result<Self, AbiError> {
        Ok(RoundStats {
            total_pot: amount_from_wei("totalPot", raw.totalPot)?,
            bettor_count: narrow_u64("bettorCount", raw.bettorCount)?,
        })
    }
}

/// A user's bet in a round, as returned by `getUserBet`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, SimpleObject)]
pub struct UserBet {
    pub option: u32,
    pub amount: Amount,
    pub exists: bool,
    pub claimed: bool,
}

impl UserBet {
    pub fn decode(raw: IBlockBet::getUserBetReturn) -> Result<Self, AbiError> {
        Ok(UserBet {
            option: narrow_u32("option", raw.option)?,
            amount: amount_from_wei("amount", raw.amount)?,
            exists: raw.exists,
            claimed: raw.claimed,
        })
    }

    /// Whether this bet can be claimed in a round resolved with `correct_option`.
    pub fn is_claimable(&self, correct_option: Option<u32>) -> bool {
        self.exists && !self.claimed && correct_option == Some(self.option)
    }
}

/// A bet decoded from a `BetPlaced` log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, SimpleObject)]
pub struct BetRecord {
    pub round_id: u64,
    pub option: u32,
    pub amount: Amount,
    pub transaction_hash: String,
    pub block_number: u64,
}

impl BetRecord {
    pub fn decode(
        event: IBlockBet::BetPlaced,
        transaction_hash: B256,
        block_number: u64,
    ) -> Result<Self, AbiError> {
        Ok(BetRecord {
            round_id: narrow_u64("roundId", event.roundId)?,
            option: narrow_u32("option", event.option)?,
            amount: amount_from_wei("amount", event.amount)?,
            transaction_hash: transaction_hash.to_string(),
            block_number,
        })
    }
}

/// Converts a wei quantity into an 18-decimal `Amount`.
pub fn amount_from_wei(field: &'static str, value: U256) -> Result<Amount, AbiError> {
    u128::try_from(value)
        .map(Amount::from_attos)
        .map_err(|_| AbiError::OutOfRange {
            field,
            value: value.to_string(),
        })
}

/// Converts an `Amount` into the wei quantity the contract expects. Lossless.
pub fn wei_from_amount(amount: Amount) -> U256 {
    U256::from(u128::from(amount))
}

pub fn narrow_u64(field: &'static str, value: U256) -> Result<u64, AbiError> {
    u64::try_from(value).map_err(|_| AbiError::OutOfRange {
        field,
        value: value.to_string(),
    })
}

pub fn narrow_u32(field: &'static str, value: U256) -> Result<u32, AbiError> {
    u32::try_from(value).map_err(|_| AbiError::OutOfRange {
        field,
        value: value.to_string(),
    })
}

/// The zero address is never a valid treasury or account.
pub fn is_zero_address(address: &Address) -> bool {
    *address == Address::ZERO
}
