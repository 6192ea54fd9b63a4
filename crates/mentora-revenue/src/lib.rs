//! # mentora-revenue
//!
//! Pure revenue-split arithmetic for ad impressions.
//!
//! Impression revenue is divided among three parties:
//!
//! - **Student** (the watcher): default 90%
//! - **Instructor** (the course creator): default 10%
//! - **Platform**: default 0%, and it absorbs any rounding remainder
//!
//! The split percentages must always sum to 100. The platform share is
//! never materialized as a ledger entry; it is implicitly retained.
//!
//! ## Modules
//!
//! - [`splits`] - split validation and distribution

pub mod splits;

/// Error types for revenue arithmetic.
#[derive(Debug, thiserror::Error)]
pub enum RevenueError {
    /// Split percentages do not sum to 100.
    #[error("split percentages must sum to 100, got {total}")]
    InvalidSplitTotal {
        /// The actual total.
        total: u16,
    },

    /// Arithmetic overflow.
    #[error("arithmetic overflow in revenue calculation")]
    Overflow,

    /// Amount is negative.
    #[error("revenue amount must be non-negative, got {amount}")]
    NegativeAmount {
        /// The offending amount in micro-credits.
        amount: i64,
    },
}

/// Convenience result type for revenue arithmetic.
pub type Result<T> = std::result::Result<T, RevenueError>;
