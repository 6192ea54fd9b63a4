//! Earning ledger operations: admin status transitions and bonus credits.
//!
//! Entries are append-only. Amounts, kinds, and owners never change;
//! only statuses advance, and only along the forward-only graph owned by
//! [`EarningStatus`]. Every transition recomputes the owner's wallet in
//! the same transaction.

use rusqlite::{Connection, TransactionBehavior};

use mentora_db::queries::earnings as db_earnings;
use mentora_db::queries::earnings::NewEarningRow;
use mentora_db::queries::refs;
use mentora_types::earning::{EarningKind, EarningStatus};
use mentora_types::{CourseId, EarningId, UserId};

use crate::{splits, wallet, LedgerError, Result};

/// Advance an earning to a new status.
fn advance(conn: &mut Connection, earning_id: EarningId, to: EarningStatus, now: u64) -> Result<()> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let row = db_earnings::get(&tx, earning_id)?;
    if !row.status.can_advance_to(to) {
        return Err(LedgerError::InvalidTransition {
            from: row.status.as_str(),
            to: to.as_str(),
        });
    }
    db_earnings::update_status(&tx, earning_id, row.status, to, now)?;
    wallet::recompute(&tx, row.user_id, now)?;
    tx.commit()?;

    tracing::info!(
        earning_id,
        user = row.user_id,
        from = row.status.as_str(),
        to = to.as_str(),
        "earning status advanced"
    );
    Ok(())
}

/// Approve a pending earning (admin review of bonus/referral credits).
pub fn approve_earning(conn: &mut Connection, earning_id: EarningId, now: u64) -> Result<()> {
    advance(conn, earning_id, EarningStatus::Approved, now)
}

/// Reject a pending or approved earning.
pub fn reject_earning(conn: &mut Connection, earning_id: EarningId, now: u64) -> Result<()> {
    advance(conn, earning_id, EarningStatus::Rejected, now)
}

/// Award the one-time completion bonus for a (user, course) pair.
///
/// Idempotent: called again for the same pair (the enrollment subsystem
/// may fire the completion signal twice) it returns `Ok(None)` and
/// writes nothing. The bonus amount comes from the effective split
/// config and starts `pending` for manual review.
pub fn award_completion_bonus(
    conn: &mut Connection,
    user_id: UserId,
    course_id: CourseId,
    now: u64,
) -> Result<Option<EarningId>> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    if !refs::user_exists(&tx, user_id)? {
        return Err(LedgerError::NotFound(format!("user {user_id}")));
    }
    refs::course_instructor(&tx, course_id)?;

    if db_earnings::completion_bonus_exists(&tx, user_id, course_id)? {
        return Ok(None);
    }

    let config = splits::effective_split_in(&tx, course_id, now)?;
    let earning_id = db_earnings::insert(
        &tx,
        &NewEarningRow {
            user_id,
            course_id,
            kind: EarningKind::CompletionBonus,
            amount_micros: config.completion_bonus_micros,
            status: EarningStatus::Pending,
            earned_at: now,
            approved_at: None,
        },
    )?;
    wallet::recompute(&tx, user_id, now)?;
    tx.commit()?;

    tracing::info!(
        earning_id,
        user = user_id,
        course = course_id,
        amount = config.completion_bonus_micros,
        "completion bonus awarded"
    );
    Ok(Some(earning_id))
}

/// Credit a referral bonus. Starts `pending` for manual review.
pub fn credit_referral_bonus(
    conn: &mut Connection,
    user_id: UserId,
    course_id: CourseId,
    amount_micros: i64,
    now: u64,
) -> Result<EarningId> {
    if amount_micros < 0 {
        return Err(LedgerError::Validation(format!(
            "referral bonus must be non-negative, got {amount_micros}"
        )));
    }

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    if !refs::user_exists(&tx, user_id)? {
        return Err(LedgerError::NotFound(format!("user {user_id}")));
    }
    refs::course_instructor(&tx, course_id)?;

    let earning_id = db_earnings::insert(
        &tx,
        &NewEarningRow {
            user_id,
            course_id,
            kind: EarningKind::ReferralBonus,
            amount_micros,
            status: EarningStatus::Pending,
            earned_at: now,
            approved_at: None,
        },
    )?;
    wallet::recompute(&tx, user_id, now)?;
    tx.commit()?;

    tracing::info!(earning_id, user = user_id, amount = amount_micros, "referral bonus credited");
    Ok(earning_id)
}
