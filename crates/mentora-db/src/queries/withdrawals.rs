//! Withdrawal query functions.

use rusqlite::{Connection, OptionalExtension};

use mentora_types::withdrawal::{PaymentMethod, WithdrawalStatus};
use mentora_types::{UserId, WithdrawalId};

use crate::{DbError, Result};

/// Field values for a new withdrawal row.
#[derive(Debug)]
pub struct NewWithdrawalRow {
    pub user_id: UserId,
    pub amount_micros: i64,
    pub fee_micros: i64,
    /// `amount - fee`, fixed at creation and never recomputed.
    pub net_micros: i64,
    pub payment_method: PaymentMethod,
    pub requested_at: u64,
}

/// A stored withdrawal row.
#[derive(Debug)]
pub struct WithdrawalRow {
    pub withdrawal_id: WithdrawalId,
    pub user_id: UserId,
    pub amount_micros: i64,
    pub fee_micros: i64,
    pub net_micros: i64,
    pub payment_method: PaymentMethod,
    pub status: WithdrawalStatus,
    pub requested_at: u64,
    pub processed_at: Option<u64>,
    pub completed_at: Option<u64>,
    pub processed_by: Option<UserId>,
}

/// Insert a pending withdrawal. Returns the new withdrawal id.
pub fn insert(conn: &Connection, row: &NewWithdrawalRow) -> Result<WithdrawalId> {
    conn.execute(
        "INSERT INTO withdrawals
             (user_id, amount_micros, fee_micros, net_micros, payment_method,
              status, requested_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            row.user_id,
            row.amount_micros,
            row.fee_micros,
            row.net_micros,
            row.payment_method.as_str(),
            WithdrawalStatus::Pending.as_str(),
            row.requested_at as i64,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Fetch a withdrawal by id.
pub fn get(conn: &Connection, withdrawal_id: WithdrawalId) -> Result<WithdrawalRow> {
    conn.query_row(
        "SELECT withdrawal_id, user_id, amount_micros, fee_micros, net_micros,
                payment_method, status, requested_at, processed_at, completed_at,
                processed_by
         FROM withdrawals WHERE withdrawal_id = ?1",
        [withdrawal_id],
        |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
                row.get::<_, i64>(7)?,
                row.get::<_, Option<i64>>(8)?,
                row.get::<_, Option<i64>>(9)?,
                row.get::<_, Option<i64>>(10)?,
            ))
        },
    )
    .optional()?
    .ok_or_else(|| DbError::NotFound(format!("withdrawal {withdrawal_id}")))
    .and_then(|raw| {
        Ok(WithdrawalRow {
            withdrawal_id: raw.0,
            user_id: raw.1,
            amount_micros: raw.2,
            fee_micros: raw.3,
            net_micros: raw.4,
            payment_method: PaymentMethod::parse(&raw.5)?,
            status: WithdrawalStatus::parse(&raw.6)?,
            requested_at: raw.7 as u64,
            processed_at: raw.8.map(|t| t as u64),
            completed_at: raw.9.map(|t| t as u64),
            processed_by: raw.10,
        })
    })
}

/// Write a new status, guarded on the expected current status so a lost
/// race surfaces as `Constraint` instead of a silent overwrite.
pub fn update_status(
    conn: &Connection,
    withdrawal_id: WithdrawalId,
    from: WithdrawalStatus,
    to: WithdrawalStatus,
    at: u64,
    processed_by: Option<UserId>,
) -> Result<()> {
    let updated = match to {
        WithdrawalStatus::Completed => conn.execute(
            "UPDATE withdrawals SET status = ?1, completed_at = ?2
             WHERE withdrawal_id = ?3 AND status = ?4",
            rusqlite::params![to.as_str(), at as i64, withdrawal_id, from.as_str()],
        )?,
        // Cancellation is a user action; the admin audit columns stay NULL.
        WithdrawalStatus::Cancelled => conn.execute(
            "UPDATE withdrawals SET status = ?1
             WHERE withdrawal_id = ?2 AND status = ?3",
            rusqlite::params![to.as_str(), withdrawal_id, from.as_str()],
        )?,
        _ => conn.execute(
            "UPDATE withdrawals SET status = ?1, processed_at = ?2, processed_by = ?3
             WHERE withdrawal_id = ?4 AND status = ?5",
            rusqlite::params![
                to.as_str(),
                at as i64,
                processed_by,
                withdrawal_id,
                from.as_str(),
            ],
        )?,
    };
    if updated == 0 {
        return Err(DbError::Constraint(format!(
            "withdrawal {withdrawal_id} is no longer {}",
            from.as_str()
        )));
    }
    Ok(())
}

/// Total amount of a user's completed withdrawals.
pub fn completed_amount_for_user(conn: &Connection, user_id: UserId) -> Result<i64> {
    let sum: i64 = conn.query_row(
        "SELECT COALESCE(SUM(amount_micros), 0) FROM withdrawals
         WHERE user_id = ?1 AND status = ?2",
        rusqlite::params![user_id, WithdrawalStatus::Completed.as_str()],
        |row| row.get(0),
    )?;
    Ok(sum)
}
