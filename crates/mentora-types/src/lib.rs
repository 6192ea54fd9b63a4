//! # mentora-types
//!
//! Shared domain types for the Mentora earnings ledger.
//! Ids are SQLite rowids; money is integer micro-credits; timestamps are
//! Unix epoch seconds supplied by callers.

pub mod earning;
pub mod impression;
pub mod withdrawal;

/// Common id aliases. All ids are database rowids.
pub type UserId = i64;
pub type CourseId = i64;
pub type LectureId = i64;
pub type ImpressionId = i64;
pub type SplitId = i64;
pub type EarningId = i64;
pub type WithdrawalId = i64;

/// Micro-credits per credit (1 credit = 1,000,000 micro-credits).
pub const MICROS_PER_CREDIT: i64 = 1_000_000;

/// Ad views per CPM unit: `revenue = cpm / 1000` for a single impression.
pub const IMPRESSIONS_PER_CPM: i64 = 1000;

/// Error for parsing a stored enum discriminant back from the database.
#[derive(Debug, thiserror::Error)]
#[error("unknown {kind} value: {value}")]
pub struct ParseEnumError {
    /// Which enum failed to parse.
    pub kind: &'static str,
    /// The offending stored value.
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_micro_credit_scale() {
        assert_eq!(MICROS_PER_CREDIT, 1_000_000);
        // 10.00 credits
        assert_eq!(10 * MICROS_PER_CREDIT, 10_000_000);
    }
}
