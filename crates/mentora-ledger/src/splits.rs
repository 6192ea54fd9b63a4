//! Revenue share configuration: the single write boundary and the
//! effective-config resolver.
//!
//! All writes go through [`create_split_config`], which enforces the
//! sum-to-100 invariant, the single-default invariant, and the
//! one-override-per-course invariant before any row exists. The resolver
//! guarantees exactly one applicable config per course.

use rusqlite::{Connection, TransactionBehavior};
use serde::{Deserialize, Serialize};

use mentora_db::queries::{refs, splits as db_splits};
use mentora_db::queries::splits::{NewSplitRow, SplitRow};
use mentora_revenue::splits::{validate_split, SplitPercentages, DEFAULT_SPLIT};
use mentora_types::CourseId;

use crate::{LedgerError, Result};

/// Parameters for a new revenue share configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewSplitConfig {
    /// Course override, or `None` for the platform-wide default row.
    pub course_id: Option<CourseId>,
    pub percentages: SplitPercentages,
    /// Impressions shorter than this produce no earnings.
    pub min_watch_secs: u32,
    pub earnings_per_minute_micros: i64,
    pub completion_bonus_micros: i64,
}

/// The split percentages stored in a config row.
pub fn percentages(row: &SplitRow) -> SplitPercentages {
    SplitPercentages {
        student_pct: row.student_pct,
        instructor_pct: row.instructor_pct,
        platform_pct: row.platform_pct,
    }
}

/// Create a revenue share configuration.
///
/// # Errors
///
/// - [`LedgerError::Validation`] if percentages do not sum to 100 or any
///   money field is negative
/// - [`LedgerError::NotFound`] if the override references an unknown course
/// - [`LedgerError::Configuration`] if a default row already exists or the
///   course already has an override
pub fn create_split_config(
    conn: &mut Connection,
    config: &NewSplitConfig,
    now: u64,
) -> Result<SplitRow> {
    validate_split(&config.percentages)?;
    if config.earnings_per_minute_micros < 0 || config.completion_bonus_micros < 0 {
        return Err(LedgerError::Validation(
            "earnings rate and completion bonus must be non-negative".to_string(),
        ));
    }

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    match config.course_id {
        Some(course_id) => {
            // Validate the reference and the one-override invariant.
            refs::course_instructor(&tx, course_id)?;
            if db_splits::find_for_course(&tx, course_id)?.is_some() {
                return Err(LedgerError::Configuration(format!(
                    "course {course_id} already has a split override"
                )));
            }
        }
        None => {
            if !db_splits::find_defaults(&tx)?.is_empty() {
                return Err(LedgerError::Configuration(
                    "a default split configuration already exists".to_string(),
                ));
            }
        }
    }

    let split_id = db_splits::insert(
        &tx,
        &NewSplitRow {
            course_id: config.course_id,
            student_pct: config.percentages.student_pct,
            instructor_pct: config.percentages.instructor_pct,
            platform_pct: config.percentages.platform_pct,
            is_default: config.course_id.is_none(),
            min_watch_secs: config.min_watch_secs,
            earnings_per_minute_micros: config.earnings_per_minute_micros,
            completion_bonus_micros: config.completion_bonus_micros,
            created_at: now,
        },
    )?;
    tx.commit()?;

    tracing::info!(
        split_id,
        course = ?config.course_id,
        student = config.percentages.student_pct,
        instructor = config.percentages.instructor_pct,
        platform = config.percentages.platform_pct,
        "revenue split configuration created"
    );

    Ok(SplitRow {
        split_id,
        course_id: config.course_id,
        student_pct: config.percentages.student_pct,
        instructor_pct: config.percentages.instructor_pct,
        platform_pct: config.percentages.platform_pct,
        is_default: config.course_id.is_none(),
        min_watch_secs: config.min_watch_secs,
        earnings_per_minute_micros: config.earnings_per_minute_micros,
        completion_bonus_micros: config.completion_bonus_micros,
    })
}

/// The effective split for a course: its override if present, else the
/// default row, else a freshly created 90/10/0 default.
pub fn effective_split(conn: &mut Connection, course_id: CourseId, now: u64) -> Result<SplitRow> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let row = effective_split_in(&tx, course_id, now)?;
    tx.commit()?;
    Ok(row)
}

/// Transaction-local resolver, used by operations that already hold one.
pub(crate) fn effective_split_in(
    conn: &Connection,
    course_id: CourseId,
    now: u64,
) -> Result<SplitRow> {
    if let Some(row) = db_splits::find_for_course(conn, course_id)? {
        return Ok(row);
    }

    let mut defaults = db_splits::find_defaults(conn)?;
    match defaults.len() {
        1 => Ok(defaults.remove(0)),
        0 => {
            // First lookup on a fresh deployment: materialize the default.
            let split_id = db_splits::insert(
                conn,
                &NewSplitRow {
                    course_id: None,
                    student_pct: DEFAULT_SPLIT.student_pct,
                    instructor_pct: DEFAULT_SPLIT.instructor_pct,
                    platform_pct: DEFAULT_SPLIT.platform_pct,
                    is_default: true,
                    min_watch_secs: 0,
                    earnings_per_minute_micros: 0,
                    completion_bonus_micros: 0,
                    created_at: now,
                },
            )?;
            tracing::info!(split_id, "created default 90/10/0 split configuration");
            Ok(SplitRow {
                split_id,
                course_id: None,
                student_pct: DEFAULT_SPLIT.student_pct,
                instructor_pct: DEFAULT_SPLIT.instructor_pct,
                platform_pct: DEFAULT_SPLIT.platform_pct,
                is_default: true,
                min_watch_secs: 0,
                earnings_per_minute_micros: 0,
                completion_bonus_micros: 0,
            })
        }
        n => Err(LedgerError::Configuration(format!(
            "{n} default split configurations found, expected one"
        ))),
    }
}
