//! Withdrawal request types.
//!
//! A withdrawal moves through a strict forward-only state machine:
//!
//! ```text
//! pending --(admin approves)--> processing --(payout executes)--> completed
//! pending --(admin rejects)--> rejected
//! pending --(user cancels)--> cancelled
//! ```

use serde::{Deserialize, Serialize};

use crate::ParseEnumError;

/// Payout rail for a withdrawal. The actual transfer happens outside the
/// ledger; this only records where the money went.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    BankTransfer,
    Paypal,
    MobileMoney,
}

impl PaymentMethod {
    /// Stable string form used in the database.
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::Paypal => "paypal",
            PaymentMethod::MobileMoney => "mobile_money",
        }
    }

    /// Parse the database string form.
    pub fn parse(s: &str) -> Result<Self, ParseEnumError> {
        match s {
            "bank_transfer" => Ok(PaymentMethod::BankTransfer),
            "paypal" => Ok(PaymentMethod::Paypal),
            "mobile_money" => Ok(PaymentMethod::MobileMoney),
            other => Err(ParseEnumError {
                kind: "payment method",
                value: other.to_string(),
            }),
        }
    }
}

/// Lifecycle status of a withdrawal request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WithdrawalStatus {
    Pending,
    Processing,
    Completed,
    Rejected,
    Cancelled,
}

impl WithdrawalStatus {
    /// Stable string form used in the database.
    pub fn as_str(self) -> &'static str {
        match self {
            WithdrawalStatus::Pending => "pending",
            WithdrawalStatus::Processing => "processing",
            WithdrawalStatus::Completed => "completed",
            WithdrawalStatus::Rejected => "rejected",
            WithdrawalStatus::Cancelled => "cancelled",
        }
    }

    /// Parse the database string form.
    pub fn parse(s: &str) -> Result<Self, ParseEnumError> {
        match s {
            "pending" => Ok(WithdrawalStatus::Pending),
            "processing" => Ok(WithdrawalStatus::Processing),
            "completed" => Ok(WithdrawalStatus::Completed),
            "rejected" => Ok(WithdrawalStatus::Rejected),
            "cancelled" => Ok(WithdrawalStatus::Cancelled),
            other => Err(ParseEnumError {
                kind: "withdrawal status",
                value: other.to_string(),
            }),
        }
    }

    /// Whether no further transition is possible from this status.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            WithdrawalStatus::Completed | WithdrawalStatus::Rejected | WithdrawalStatus::Cancelled
        )
    }

    /// Whether the state machine permits moving to `next`.
    pub fn can_advance_to(self, next: WithdrawalStatus) -> bool {
        matches!(
            (self, next),
            (WithdrawalStatus::Pending, WithdrawalStatus::Processing)
                | (WithdrawalStatus::Pending, WithdrawalStatus::Rejected)
                | (WithdrawalStatus::Pending, WithdrawalStatus::Cancelled)
                | (WithdrawalStatus::Processing, WithdrawalStatus::Completed)
        )
    }
}
