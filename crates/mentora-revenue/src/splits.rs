//! Split validation and distribution.
//!
//! [`distribute`] computes floor shares for the student and the instructor
//! and hands the remainder to the platform, so the three shares always sum
//! exactly to the input amount and the two materialized ledger entries
//! never exceed `amount * (student_pct + instructor_pct) / 100`.

use serde::{Deserialize, Serialize};

use crate::{Result, RevenueError};

/// Default student (watcher) revenue share percentage.
pub const DEFAULT_STUDENT_PCT: u8 = 90;

/// Default instructor revenue share percentage.
pub const DEFAULT_INSTRUCTOR_PCT: u8 = 10;

/// Default platform revenue share percentage.
pub const DEFAULT_PLATFORM_PCT: u8 = 0;

/// Revenue split percentages for one course (or the platform default).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitPercentages {
    /// Student (watcher) share percentage.
    pub student_pct: u8,
    /// Instructor share percentage.
    pub instructor_pct: u8,
    /// Platform share percentage.
    pub platform_pct: u8,
}

/// Default revenue split: student=90, instructor=10, platform=0.
pub const DEFAULT_SPLIT: SplitPercentages = SplitPercentages {
    student_pct: DEFAULT_STUDENT_PCT,
    instructor_pct: DEFAULT_INSTRUCTOR_PCT,
    platform_pct: DEFAULT_PLATFORM_PCT,
};

/// The three shares of one impression's revenue, in micro-credits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SplitAmounts {
    pub student_micros: i64,
    pub instructor_micros: i64,
    pub platform_micros: i64,
}

/// Validate a revenue split configuration.
///
/// # Errors
///
/// - [`RevenueError::InvalidSplitTotal`] if percentages do not sum to 100
pub fn validate_split(split: &SplitPercentages) -> Result<()> {
    let total =
        split.student_pct as u16 + split.instructor_pct as u16 + split.platform_pct as u16;
    if total != 100 {
        return Err(RevenueError::InvalidSplitTotal { total });
    }
    Ok(())
}

/// Distribute an impression's revenue according to the split.
///
/// Student and instructor get floor shares; the platform absorbs the
/// rounding remainder (its share is never credited to a wallet anyway).
///
/// # Errors
///
/// - [`RevenueError::NegativeAmount`] if the amount is negative
/// - [`RevenueError::InvalidSplitTotal`] if the split is invalid
/// - [`RevenueError::Overflow`] on arithmetic overflow
pub fn distribute(amount_micros: i64, split: &SplitPercentages) -> Result<SplitAmounts> {
    if amount_micros < 0 {
        return Err(RevenueError::NegativeAmount {
            amount: amount_micros,
        });
    }
    validate_split(split)?;

    let student_micros = amount_micros
        .checked_mul(split.student_pct as i64)
        .ok_or(RevenueError::Overflow)?
        / 100;

    let instructor_micros = amount_micros
        .checked_mul(split.instructor_pct as i64)
        .ok_or(RevenueError::Overflow)?
        / 100;

    // Platform keeps the remainder; shares always sum to the input.
    let platform_micros = amount_micros - student_micros - instructor_micros;

    tracing::trace!(
        amount = amount_micros,
        student = student_micros,
        instructor = instructor_micros,
        platform = platform_micros,
        "distributed impression revenue"
    );

    Ok(SplitAmounts {
        student_micros,
        instructor_micros,
        platform_micros,
    })
}

/// Revenue estimate for a single impression from its CPM rate.
///
/// CPM prices one thousand views, so one view is worth `cpm / 1000`.
pub fn revenue_from_cpm(cpm_micros: i64) -> Result<i64> {
    if cpm_micros < 0 {
        return Err(RevenueError::NegativeAmount { amount: cpm_micros });
    }
    Ok(cpm_micros / mentora_types::IMPRESSIONS_PER_CPM)
}

/// Watch-time earning for a given rate and duration, rounded down to
/// whole minutes.
pub fn watch_earnings(per_minute_micros: i64, watch_secs: u32) -> Result<i64> {
    if per_minute_micros < 0 {
        return Err(RevenueError::NegativeAmount {
            amount: per_minute_micros,
        });
    }
    let minutes = i64::from(watch_secs / 60);
    per_minute_micros
        .checked_mul(minutes)
        .ok_or(RevenueError::Overflow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mentora_types::MICROS_PER_CREDIT;

    #[test]
    fn test_default_split_valid() {
        validate_split(&DEFAULT_SPLIT).expect("default split should be valid");
        assert_eq!(DEFAULT_SPLIT.student_pct, 90);
        assert_eq!(DEFAULT_SPLIT.instructor_pct, 10);
        assert_eq!(DEFAULT_SPLIT.platform_pct, 0);
    }

    #[test]
    fn test_validate_split_invalid_total() {
        // 95 + 10 + 0 = 105
        let split = SplitPercentages {
            student_pct: 95,
            instructor_pct: 10,
            platform_pct: 0,
        };
        match validate_split(&split) {
            Err(RevenueError::InvalidSplitTotal { total }) => assert_eq!(total, 105),
            other => panic!("expected InvalidSplitTotal, got {other:?}"),
        }
    }

    #[test]
    fn test_distribute_ten_credits_default() {
        let amount = 10 * MICROS_PER_CREDIT;
        let shares = distribute(amount, &DEFAULT_SPLIT).expect("distribute");
        assert_eq!(shares.student_micros, 9 * MICROS_PER_CREDIT);
        assert_eq!(shares.instructor_micros, MICROS_PER_CREDIT);
        assert_eq!(shares.platform_micros, 0);
        assert_eq!(
            shares.student_micros + shares.instructor_micros + shares.platform_micros,
            amount
        );
    }

    #[test]
    fn test_distribute_rounding_remainder_to_platform() {
        let split = SplitPercentages {
            student_pct: 33,
            instructor_pct: 33,
            platform_pct: 34,
        };
        let shares = distribute(100, &split).expect("distribute");
        assert_eq!(shares.student_micros, 33);
        assert_eq!(shares.instructor_micros, 33);
        assert_eq!(shares.platform_micros, 34);

        // An amount that doesn't divide evenly.
        let shares = distribute(7, &split).expect("distribute");
        assert_eq!(
            shares.student_micros + shares.instructor_micros + shares.platform_micros,
            7,
            "must sum to total"
        );
    }

    #[test]
    fn test_distribute_zero_amount() {
        let shares = distribute(0, &DEFAULT_SPLIT).expect("distribute zero");
        assert_eq!(shares.student_micros, 0);
        assert_eq!(shares.instructor_micros, 0);
        assert_eq!(shares.platform_micros, 0);
    }

    #[test]
    fn test_distribute_negative_amount_rejected() {
        assert!(distribute(-1, &DEFAULT_SPLIT).is_err());
    }

    #[test]
    fn test_materialized_shares_bound() {
        // The two credited shares never exceed amount * (s + i) / 100.
        let split = SplitPercentages {
            student_pct: 70,
            instructor_pct: 20,
            platform_pct: 10,
        };
        for amount in [1i64, 33, 999, 12_345_678] {
            let shares = distribute(amount, &split).expect("distribute");
            assert!(shares.student_micros + shares.instructor_micros <= amount * 90 / 100);
        }
    }

    #[test]
    fn test_revenue_from_cpm() {
        // CPM of 2.50 credits -> 0.0025 credits per view.
        assert_eq!(
            revenue_from_cpm(2_500_000).expect("cpm"),
            2_500,
        );
        assert_eq!(revenue_from_cpm(0).expect("cpm"), 0);
        assert!(revenue_from_cpm(-1).is_err());
    }

    #[test]
    fn test_watch_earnings_whole_minutes() {
        // 0.01 credits per minute, 150 seconds -> 2 whole minutes.
        assert_eq!(watch_earnings(10_000, 150).expect("watch"), 20_000);
        assert_eq!(watch_earnings(10_000, 59).expect("watch"), 0);
        assert!(watch_earnings(-5, 60).is_err());
    }
}
