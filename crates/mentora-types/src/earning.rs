//! Earning ledger entry types.
//!
//! An earning is an append-only credit to a user. Its amount, kind, and
//! owner never change after creation; only the status advances, and only
//! along the forward-only graph enforced by [`EarningStatus::can_advance_to`].

use serde::{Deserialize, Serialize};

use crate::ParseEnumError;

/// Why a user was credited.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EarningKind {
    /// A student watched an ad during playback.
    StudentWatch,
    /// The instructor's share of an ad shown on their course.
    InstructorCourse,
    /// Bonus for referring a new user.
    ReferralBonus,
    /// One-time bonus for completing a course.
    CompletionBonus,
}

impl EarningKind {
    /// Stable string form used in the database.
    pub fn as_str(self) -> &'static str {
        match self {
            EarningKind::StudentWatch => "student_watch",
            EarningKind::InstructorCourse => "instructor_course",
            EarningKind::ReferralBonus => "referral_bonus",
            EarningKind::CompletionBonus => "completion_bonus",
        }
    }

    /// Parse the database string form.
    pub fn parse(s: &str) -> Result<Self, ParseEnumError> {
        match s {
            "student_watch" => Ok(EarningKind::StudentWatch),
            "instructor_course" => Ok(EarningKind::InstructorCourse),
            "referral_bonus" => Ok(EarningKind::ReferralBonus),
            "completion_bonus" => Ok(EarningKind::CompletionBonus),
            other => Err(ParseEnumError {
                kind: "earning kind",
                value: other.to_string(),
            }),
        }
    }
}

/// Lifecycle status of an earning.
///
/// Allowed moves: `pending → approved → paid`, plus `rejected` from
/// `pending` or `approved`. `paid` and `rejected` are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EarningStatus {
    Pending,
    Approved,
    Paid,
    Rejected,
}

impl EarningStatus {
    /// Stable string form used in the database.
    pub fn as_str(self) -> &'static str {
        match self {
            EarningStatus::Pending => "pending",
            EarningStatus::Approved => "approved",
            EarningStatus::Paid => "paid",
            EarningStatus::Rejected => "rejected",
        }
    }

    /// Parse the database string form.
    pub fn parse(s: &str) -> Result<Self, ParseEnumError> {
        match s {
            "pending" => Ok(EarningStatus::Pending),
            "approved" => Ok(EarningStatus::Approved),
            "paid" => Ok(EarningStatus::Paid),
            "rejected" => Ok(EarningStatus::Rejected),
            other => Err(ParseEnumError {
                kind: "earning status",
                value: other.to_string(),
            }),
        }
    }

    /// Whether no further transition is possible from this status.
    pub fn is_terminal(self) -> bool {
        matches!(self, EarningStatus::Paid | EarningStatus::Rejected)
    }

    /// Whether the forward-only graph permits moving to `next`.
    pub fn can_advance_to(self, next: EarningStatus) -> bool {
        matches!(
            (self, next),
            (EarningStatus::Pending, EarningStatus::Approved)
                | (EarningStatus::Approved, EarningStatus::Paid)
                | (EarningStatus::Pending, EarningStatus::Rejected)
                | (EarningStatus::Approved, EarningStatus::Rejected)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trip() {
        for kind in [
            EarningKind::StudentWatch,
            EarningKind::InstructorCourse,
            EarningKind::ReferralBonus,
            EarningKind::CompletionBonus,
        ] {
            assert_eq!(EarningKind::parse(kind.as_str()).expect("parse"), kind);
        }
        assert!(EarningKind::parse("tips").is_err());
    }

    #[test]
    fn test_status_forward_only() {
        use EarningStatus::*;
        assert!(Pending.can_advance_to(Approved));
        assert!(Approved.can_advance_to(Paid));
        assert!(Pending.can_advance_to(Rejected));
        assert!(Approved.can_advance_to(Rejected));

        // No backward or skipping moves.
        assert!(!Pending.can_advance_to(Paid));
        assert!(!Approved.can_advance_to(Pending));
        assert!(!Paid.can_advance_to(Approved));
        assert!(!Rejected.can_advance_to(Pending));
        assert!(!Paid.can_advance_to(Rejected));
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!EarningStatus::Pending.is_terminal());
        assert!(!EarningStatus::Approved.is_terminal());
        assert!(EarningStatus::Paid.is_terminal());
        assert!(EarningStatus::Rejected.is_terminal());
    }
}
