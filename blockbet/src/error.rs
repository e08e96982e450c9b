// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use blockbet_abi::ContractRevert;
use thiserror::Error;

/// Every failure the client surfaces. Provider and contract failures are converted into
/// this shape at the binding boundary; raw provider errors never travel past it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlockBetError {
    #[error("no wallet provider is available")]
    ProviderMissing,
    #[error("the wallet request was declined")]
    UserRejected,
    #[error("network error: {0}")]
    NetworkError(String),
    #[error("reading `{method}` failed: {reason}")]
    ReadFailed { method: &'static str, reason: String },
    #[error("the transaction was not signed")]
    TransactionRejected,
    #[error("the contract rejected the transaction: {reason}")]
    RevertedByContract { reason: ContractRevert },
    #[error("round {round_id} is unavailable")]
    RoundUnavailable { round_id: u64 },
    #[error("invalid {field}: {message}")]
    ValidationFailed { field: &'static str, message: String },
    #[error("the wallet session ended; reconnect before sending transactions")]
    SessionExpired,
}

impl BlockBetError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        BlockBetError::ValidationFailed {
            field,
            message: message.into(),
        }
    }

    /// Plain-language name of the taxonomy category, for notifications.
    pub fn category(&self) -> &'static str {
        match self {
            BlockBetError::ProviderMissing => "Wallet not found",
            BlockBetError::UserRejected => "Request declined",
            BlockBetError::NetworkError(_) => "Network problem",
            BlockBetError::ReadFailed { .. } => "Could not read contract",
            BlockBetError::TransactionRejected => "Transaction not signed",
            BlockBetError::RevertedByContract { .. } => "Rejected by contract",
            BlockBetError::RoundUnavailable { .. } => "Round unavailable",
            BlockBetError::ValidationFailed { .. } => "Invalid input",
            BlockBetError::SessionExpired => "Wallet session ended",
        }
    }

    /// Category and detail combined, e.g. `Invalid input: invalid amount: ...`.
    pub fn user_message(&self) -> String {
        format!("{}: {}", self.category(), self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_names_category() {
        let error = BlockBetError::RevertedByContract {
            reason: ContractRevert::NotActive,
        };
        assert_eq!(
            error.user_message(),
            "Rejected by contract: the contract rejected the transaction: this betting round is not active"
        );
    }

    #[test]
    fn test_validation_helper() {
        let error = BlockBetError::validation("options", "at least 2 options are required");
        assert_eq!(error.category(), "Invalid input");
        assert_eq!(error.to_string(), "invalid options: at least 2 options are required");
    }
}
