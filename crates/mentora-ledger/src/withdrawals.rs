//! Withdrawal processing.
//!
//! ```text
//! pending --(admin approves)--> processing --(payout executes)--> completed
//! pending --(admin rejects)--> rejected
//! pending --(user cancels)--> cancelled
//! ```
//!
//! The request path re-derives the wallet inside its own transaction, so
//! the balance it checks is never stale: two concurrent requests against
//! the same balance serialize on the immediate transaction and the
//! second sees the first one's effect.

use rusqlite::{Connection, TransactionBehavior};

use mentora_db::queries::earnings as db_earnings;
use mentora_db::queries::earnings::NewEarningRow;
use mentora_db::queries::refs;
use mentora_db::queries::withdrawals as db_withdrawals;
use mentora_db::queries::withdrawals::{NewWithdrawalRow, WithdrawalRow};
use mentora_types::earning::EarningStatus;
use mentora_types::withdrawal::{PaymentMethod, WithdrawalStatus};
use mentora_types::{UserId, WithdrawalId};

use crate::{wallet, LedgerError, Result};

/// Request a withdrawal of `amount_micros` against the available balance.
///
/// `net = amount - fee` is computed here and never recomputed.
///
/// # Errors
///
/// - [`LedgerError::InsufficientFunds`] if the freshly recomputed
///   available balance cannot cover the amount; no row is created
/// - [`LedgerError::Validation`] for non-positive amounts or a fee
///   exceeding the amount
pub fn request_withdrawal(
    conn: &mut Connection,
    user_id: UserId,
    amount_micros: i64,
    fee_micros: i64,
    method: PaymentMethod,
    now: u64,
) -> Result<WithdrawalId> {
    if amount_micros <= 0 {
        return Err(LedgerError::Validation(format!(
            "withdrawal amount must be positive, got {amount_micros}"
        )));
    }
    if fee_micros < 0 || fee_micros > amount_micros {
        return Err(LedgerError::Validation(format!(
            "processing fee {fee_micros} must be between 0 and the amount"
        )));
    }

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    // Fresh balance, same transaction as the insert: no stale check.
    let snapshot = wallet::recompute(&tx, user_id, now)?;
    if snapshot.available_micros < amount_micros {
        return Err(LedgerError::InsufficientFunds {
            requested_micros: amount_micros,
            available_micros: snapshot.available_micros,
        });
    }

    let withdrawal_id = db_withdrawals::insert(
        &tx,
        &NewWithdrawalRow {
            user_id,
            amount_micros,
            fee_micros,
            net_micros: amount_micros - fee_micros,
            payment_method: method,
            requested_at: now,
        },
    )?;
    tx.commit()?;

    tracing::info!(
        withdrawal_id,
        user = user_id,
        amount = amount_micros,
        fee = fee_micros,
        "withdrawal requested"
    );
    Ok(withdrawal_id)
}

/// Shared transition guard.
fn checked_transition(row: &WithdrawalRow, to: WithdrawalStatus) -> Result<()> {
    if !row.status.can_advance_to(to) {
        return Err(LedgerError::InvalidTransition {
            from: row.status.as_str(),
            to: to.as_str(),
        });
    }
    Ok(())
}

/// Admin approval: `pending -> processing`.
pub fn approve_withdrawal(
    conn: &mut Connection,
    withdrawal_id: WithdrawalId,
    admin_id: UserId,
    now: u64,
) -> Result<()> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    if !refs::user_exists(&tx, admin_id)? {
        return Err(LedgerError::NotFound(format!("user {admin_id}")));
    }
    let row = db_withdrawals::get(&tx, withdrawal_id)?;
    checked_transition(&row, WithdrawalStatus::Processing)?;
    db_withdrawals::update_status(
        &tx,
        withdrawal_id,
        row.status,
        WithdrawalStatus::Processing,
        now,
        Some(admin_id),
    )?;
    tx.commit()?;

    tracing::info!(withdrawal_id, admin = admin_id, "withdrawal approved for processing");
    Ok(())
}

/// Admin rejection: `pending -> rejected`.
pub fn reject_withdrawal(
    conn: &mut Connection,
    withdrawal_id: WithdrawalId,
    admin_id: UserId,
    now: u64,
) -> Result<()> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    if !refs::user_exists(&tx, admin_id)? {
        return Err(LedgerError::NotFound(format!("user {admin_id}")));
    }
    let row = db_withdrawals::get(&tx, withdrawal_id)?;
    checked_transition(&row, WithdrawalStatus::Rejected)?;
    db_withdrawals::update_status(
        &tx,
        withdrawal_id,
        row.status,
        WithdrawalStatus::Rejected,
        now,
        Some(admin_id),
    )?;
    tx.commit()?;

    tracing::info!(withdrawal_id, admin = admin_id, "withdrawal rejected");
    Ok(())
}

/// Requester cancellation: `pending -> cancelled`.
pub fn cancel_withdrawal(
    conn: &mut Connection,
    withdrawal_id: WithdrawalId,
    user_id: UserId,
    now: u64,
) -> Result<()> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let row = db_withdrawals::get(&tx, withdrawal_id)?;
    if row.user_id != user_id {
        return Err(LedgerError::Validation(format!(
            "withdrawal {withdrawal_id} does not belong to user {user_id}"
        )));
    }
    checked_transition(&row, WithdrawalStatus::Cancelled)?;
    db_withdrawals::update_status(
        &tx,
        withdrawal_id,
        row.status,
        WithdrawalStatus::Cancelled,
        now,
        None,
    )?;
    tx.commit()?;

    tracing::info!(withdrawal_id, user = user_id, "withdrawal cancelled");
    Ok(())
}

/// Payout completion: `processing -> completed`.
///
/// Flips the user's approved earnings to `paid` oldest-first until the
/// withdrawal amount is covered, links them to this withdrawal, and
/// recomputes the wallet. The boundary entry is flipped whole; any
/// overshoot is appended back as a fresh approved entry ("change"), so
/// exactly the requested amount leaves the available balance. One
/// transaction; the payout rail itself is outside the ledger.
pub fn complete_withdrawal(
    conn: &mut Connection,
    withdrawal_id: WithdrawalId,
    now: u64,
) -> Result<()> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let row = db_withdrawals::get(&tx, withdrawal_id)?;
    checked_transition(&row, WithdrawalStatus::Completed)?;

    let mut covered: i64 = 0;
    let mut flipped = 0u32;
    let mut boundary = None;
    for (earning_id, amount) in db_earnings::approved_for_user(&tx, row.user_id)? {
        if covered >= row.amount_micros {
            break;
        }
        db_earnings::mark_paid(&tx, earning_id, withdrawal_id, now)?;
        covered += amount;
        flipped += 1;
        boundary = Some(earning_id);
    }
    if covered < row.amount_micros {
        // Earnings were rejected between request and completion.
        return Err(LedgerError::InsufficientFunds {
            requested_micros: row.amount_micros,
            available_micros: covered,
        });
    }

    if covered > row.amount_micros {
        if let Some(boundary_id) = boundary {
            let src = db_earnings::get(&tx, boundary_id)?;
            let change = covered - row.amount_micros;
            // Keeps the source entry's age so the change stays at the
            // front of the oldest-first queue.
            let change_id = db_earnings::insert(
                &tx,
                &NewEarningRow {
                    user_id: row.user_id,
                    course_id: src.course_id,
                    kind: src.kind,
                    amount_micros: change,
                    status: EarningStatus::Approved,
                    earned_at: src.earned_at,
                    approved_at: Some(now),
                },
            )?;
            tracing::debug!(
                withdrawal_id,
                change_id,
                change,
                "boundary overshoot returned as approved earning"
            );
        }
    }

    db_withdrawals::update_status(
        &tx,
        withdrawal_id,
        row.status,
        WithdrawalStatus::Completed,
        now,
        None,
    )?;
    wallet::recompute(&tx, row.user_id, now)?;
    tx.commit()?;

    tracing::info!(
        withdrawal_id,
        user = row.user_id,
        amount = row.amount_micros,
        earnings_flipped = flipped,
        "withdrawal completed"
    );
    Ok(())
}
