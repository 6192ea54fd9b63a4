//! Wallet snapshot query functions.
//!
//! The wallet row is a derived cache over the earnings ledger. Only the
//! aggregator writes it; nothing else may.

use rusqlite::{Connection, OptionalExtension};

use mentora_types::UserId;

use crate::{DbError, Result};

/// A stored wallet snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WalletRow {
    pub user_id: UserId,
    pub available_micros: i64,
    pub pending_micros: i64,
    pub withdrawn_micros: i64,
    pub total_micros: i64,
    pub impression_count: u64,
    pub watch_secs: u64,
    pub updated_at: u64,
}

/// Overwrite (or create) the wallet snapshot for a user.
pub fn upsert(conn: &Connection, row: &WalletRow) -> Result<()> {
    conn.execute(
        "INSERT INTO user_wallets
             (user_id, available_micros, pending_micros, withdrawn_micros,
              total_micros, impression_count, watch_secs, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(user_id) DO UPDATE SET
             available_micros = excluded.available_micros,
             pending_micros = excluded.pending_micros,
             withdrawn_micros = excluded.withdrawn_micros,
             total_micros = excluded.total_micros,
             impression_count = excluded.impression_count,
             watch_secs = excluded.watch_secs,
             updated_at = excluded.updated_at",
        rusqlite::params![
            row.user_id,
            row.available_micros,
            row.pending_micros,
            row.withdrawn_micros,
            row.total_micros,
            row.impression_count as i64,
            row.watch_secs as i64,
            row.updated_at as i64,
        ],
    )?;
    Ok(())
}

/// Fetch the wallet snapshot for a user.
pub fn get(conn: &Connection, user_id: UserId) -> Result<WalletRow> {
    conn.query_row(
        "SELECT user_id, available_micros, pending_micros, withdrawn_micros,
                total_micros, impression_count, watch_secs, updated_at
         FROM user_wallets WHERE user_id = ?1",
        [user_id],
        |row| {
            Ok(WalletRow {
                user_id: row.get(0)?,
                available_micros: row.get(1)?,
                pending_micros: row.get(2)?,
                withdrawn_micros: row.get(3)?,
                total_micros: row.get(4)?,
                impression_count: row.get::<_, i64>(5)? as u64,
                watch_secs: row.get::<_, i64>(6)? as u64,
                updated_at: row.get::<_, i64>(7)? as u64,
            })
        },
    )
    .optional()?
    .ok_or_else(|| DbError::NotFound(format!("wallet for user {user_id}")))
}
