//! # mentora-ledger
//!
//! The earnings-ledger service layer: impression recording, revenue split
//! resolution, the append-only earnings ledger, derived wallet snapshots,
//! and the withdrawal state machine.
//!
//! Every compound operation runs inside a single immediate SQLite
//! transaction, so an impression's dual earning credit, a withdrawal's
//! balance check, and a completion's earning flip are each all-or-nothing
//! and serialized against concurrent writers. The earnings ledger is the
//! sole source of truth; wallet rows are derived caches rewritten by
//! [`wallet::recompute`].
//!
//! ## Modules
//!
//! - [`splits`] - revenue share configuration (write boundary + resolver)
//! - [`impressions`] - ad view recording and earning fan-out
//! - [`earnings`] - ledger credits and status transitions
//! - [`wallet`] - derived balance snapshots
//! - [`withdrawals`] - payout request state machine

pub mod earnings;
pub mod impressions;
pub mod splits;
pub mod wallet;
pub mod withdrawals;

use mentora_db::DbError;
use mentora_revenue::RevenueError;

/// Error types for ledger operations. All recoverable and caller-facing;
/// the failing operation rolls back entirely.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Unknown user/course/lecture/row reference.
    #[error("not found: {0}")]
    NotFound(String),

    /// Ambiguous or conflicting revenue share configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Withdrawal exceeds the available balance.
    #[error("insufficient funds: requested {requested_micros}, available {available_micros}")]
    InsufficientFunds {
        requested_micros: i64,
        available_micros: i64,
    },

    /// Attempted state-machine move from a terminal or non-adjacent state.
    #[error("invalid transition: {from} -> {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },

    /// Malformed input (negative amounts, bad percentages, ...).
    #[error("validation error: {0}")]
    Validation(String),

    /// Underlying database failure.
    #[error("database error: {0}")]
    Db(DbError),
}

impl From<DbError> for LedgerError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound(what) => LedgerError::NotFound(what),
            other => LedgerError::Db(other),
        }
    }
}

impl From<RevenueError> for LedgerError {
    fn from(err: RevenueError) -> Self {
        LedgerError::Validation(err.to_string())
    }
}

impl From<rusqlite::Error> for LedgerError {
    fn from(err: rusqlite::Error) -> Self {
        LedgerError::Db(DbError::Sqlite(err))
    }
}

/// Convenience result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_not_found_maps_to_not_found() {
        let err = LedgerError::from(DbError::NotFound("course 7".into()));
        assert!(matches!(err, LedgerError::NotFound(_)));
    }

    #[test]
    fn test_revenue_error_maps_to_validation() {
        let err = LedgerError::from(RevenueError::InvalidSplitTotal { total: 105 });
        assert!(matches!(err, LedgerError::Validation(_)));
    }
}
