//! Impression recording and earning fan-out.
//!
//! Recording an impression is one atomic unit: the impression row, both
//! beneficiary earnings, their impression links, and both wallet
//! recomputes commit together or not at all. The fan-out runs at most
//! once per impression, guarded by the credited marker on the row.

use rusqlite::{Connection, TransactionBehavior};
use serde::{Deserialize, Serialize};

use mentora_db::queries::earnings as db_earnings;
use mentora_db::queries::earnings::NewEarningRow;
use mentora_db::queries::impressions as db_impressions;
use mentora_db::queries::impressions::NewImpressionRow;
use mentora_db::queries::refs;
use mentora_revenue::splits as revenue;
use mentora_revenue::RevenueError;
use mentora_types::earning::{EarningKind, EarningStatus};
use mentora_types::impression::{AdPlatform, ClientMeta};
use mentora_types::{CourseId, EarningId, ImpressionId, LectureId, UserId};

use crate::{splits, wallet, LedgerError, Result};

/// An ad view reported by the playback tracker.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewImpression {
    pub user_id: UserId,
    pub course_id: CourseId,
    pub lecture_id: Option<LectureId>,
    pub platform: AdPlatform,
    pub cpm_micros: i64,
    /// Caller-supplied revenue estimate; `cpm / 1000` when absent.
    pub estimated_revenue_micros: Option<i64>,
    pub view_secs: u32,
    pub client: ClientMeta,
}

/// One earning created by the fan-out.
#[derive(Clone, Debug, Serialize)]
pub struct CreditedEarning {
    pub earning_id: EarningId,
    pub user_id: UserId,
    pub kind: EarningKind,
    pub amount_micros: i64,
}

/// Outcome of recording an impression.
#[derive(Debug, Serialize)]
pub struct RecordedImpression {
    pub impression_id: ImpressionId,
    pub revenue_micros: i64,
    pub is_valid: bool,
    /// The beneficiary earnings, empty when the impression was invalid
    /// or below the minimum watch time.
    pub earnings: Vec<CreditedEarning>,
}

/// Record an ad impression and, when it qualifies, credit both
/// beneficiaries and recompute their wallets. The student's credit is
/// their split share plus the effective config's watch-time earnings
/// (`earnings_per_minute` per whole watched minute).
///
/// # Errors
///
/// - [`LedgerError::NotFound`] for unknown user/course/lecture references
/// - [`LedgerError::Validation`] for negative amounts or a lecture that
///   belongs to a different course
pub fn record_impression(
    conn: &mut Connection,
    imp: &NewImpression,
    now: u64,
) -> Result<RecordedImpression> {
    if imp.cpm_micros < 0 {
        return Err(LedgerError::Validation(format!(
            "cpm rate must be non-negative, got {}",
            imp.cpm_micros
        )));
    }
    if matches!(imp.estimated_revenue_micros, Some(r) if r < 0) {
        return Err(LedgerError::Validation(
            "estimated revenue must be non-negative".to_string(),
        ));
    }

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    if !refs::user_exists(&tx, imp.user_id)? {
        return Err(LedgerError::NotFound(format!("user {}", imp.user_id)));
    }
    let instructor_id = refs::course_instructor(&tx, imp.course_id)?;
    if let Some(lecture_id) = imp.lecture_id {
        let owner = refs::lecture_course(&tx, lecture_id)?;
        if owner != imp.course_id {
            return Err(LedgerError::Validation(format!(
                "lecture {lecture_id} belongs to course {owner}, not {}",
                imp.course_id
            )));
        }
    }

    let revenue_micros = match imp.estimated_revenue_micros {
        Some(estimate) => estimate,
        None => revenue::revenue_from_cpm(imp.cpm_micros)?,
    };
    let is_valid = !imp.client.looks_like_bot();

    let impression_id = db_impressions::insert(
        &tx,
        &NewImpressionRow {
            user_id: imp.user_id,
            course_id: imp.course_id,
            lecture_id: imp.lecture_id,
            platform: imp.platform,
            cpm_micros: imp.cpm_micros,
            revenue_micros,
            view_secs: imp.view_secs,
            is_valid,
            ip_address: imp.client.ip_address.as_deref(),
            user_agent: imp.client.user_agent.as_deref(),
            viewed_at: now,
        },
    )?;

    // The fan-out decision is made exactly once, here.
    let freshly_credited = db_impressions::mark_credited(&tx, impression_id)?;
    let config = splits::effective_split_in(&tx, imp.course_id, now)?;
    let qualifies = is_valid && imp.view_secs >= config.min_watch_secs;

    let mut earnings = Vec::new();
    if freshly_credited && qualifies {
        let shares = revenue::distribute(revenue_micros, &splits::percentages(&config))?;
        // The config's per-minute rate rides on top of the student's ad
        // share, whole watched minutes only.
        let watch_micros =
            revenue::watch_earnings(config.earnings_per_minute_micros, imp.view_secs)?;
        let student_micros = shares
            .student_micros
            .checked_add(watch_micros)
            .ok_or(RevenueError::Overflow)?;

        for (beneficiary, kind, amount) in [
            (imp.user_id, EarningKind::StudentWatch, student_micros),
            (
                instructor_id,
                EarningKind::InstructorCourse,
                shares.instructor_micros,
            ),
        ] {
            // Ad-driven earnings are auto-approved on creation.
            let earning_id = db_earnings::insert(
                &tx,
                &NewEarningRow {
                    user_id: beneficiary,
                    course_id: imp.course_id,
                    kind,
                    amount_micros: amount,
                    status: EarningStatus::Approved,
                    earned_at: now,
                    approved_at: Some(now),
                },
            )?;
            db_earnings::link_impression(&tx, earning_id, impression_id)?;
            earnings.push(CreditedEarning {
                earning_id,
                user_id: beneficiary,
                kind,
                amount_micros: amount,
            });
        }

        wallet::recompute(&tx, imp.user_id, now)?;
        if instructor_id != imp.user_id {
            wallet::recompute(&tx, instructor_id, now)?;
        }
    } else {
        // Still keep the watcher's impression counters current.
        wallet::recompute(&tx, imp.user_id, now)?;
    }

    tx.commit()?;

    tracing::info!(
        impression_id,
        user = imp.user_id,
        course = imp.course_id,
        revenue = revenue_micros,
        valid = is_valid,
        credited = !earnings.is_empty(),
        "impression recorded"
    );

    Ok(RecordedImpression {
        impression_id,
        revenue_micros,
        is_valid,
        earnings,
    })
}

/// Moderation flip of an impression's validity flag.
///
/// Flipping to invalid does not retract earnings already credited; it
/// only stops the impression counting toward wallet counters. The
/// watcher's wallet is recomputed to refresh those counters.
pub fn set_impression_validity(
    conn: &mut Connection,
    impression_id: ImpressionId,
    is_valid: bool,
    now: u64,
) -> Result<()> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let row = db_impressions::get(&tx, impression_id)?;
    db_impressions::set_valid(&tx, impression_id, is_valid)?;
    wallet::recompute(&tx, row.user_id, now)?;
    tx.commit()?;

    tracing::info!(impression_id, is_valid, "impression validity updated");
    Ok(())
}
