//! Wallet aggregation.
//!
//! The wallet row is never the source of truth: it is rebuilt by full
//! replay of the user's earnings and completed withdrawals, grouped
//! strictly by current status. Every ledger mutation recomputes the
//! affected wallet inside the same transaction.

use rusqlite::{Connection, TransactionBehavior};

use mentora_db::queries::{impressions as db_impressions, refs, wallets as db_wallets};
use mentora_db::queries::earnings as db_earnings;
use mentora_db::queries::withdrawals as db_withdrawals;
use mentora_db::queries::wallets::WalletRow;
use mentora_db::DbError;
use mentora_types::earning::EarningStatus;
use mentora_types::UserId;

use crate::{LedgerError, Result};

/// Rebuild the wallet snapshot for a user from the ledger.
///
/// available = Σ approved earnings, pending = Σ pending earnings,
/// withdrawn = Σ amounts of completed withdrawals,
/// total = available + pending + withdrawn. Rejected earnings never
/// count, and paid earnings are represented by the withdrawal that
/// consumed them. Idempotent: recomputing twice without intervening
/// ledger writes yields identical values.
pub fn recompute(conn: &Connection, user_id: UserId, now: u64) -> Result<WalletRow> {
    if !refs::user_exists(conn, user_id)? {
        return Err(LedgerError::NotFound(format!("user {user_id}")));
    }

    let available = db_earnings::sum_by_status(conn, user_id, EarningStatus::Approved)?;
    let pending = db_earnings::sum_by_status(conn, user_id, EarningStatus::Pending)?;
    let withdrawn = db_withdrawals::completed_amount_for_user(conn, user_id)?;
    let total = available
        .checked_add(pending)
        .and_then(|t| t.checked_add(withdrawn))
        .ok_or_else(|| {
            LedgerError::Db(DbError::Constraint(format!(
                "wallet total overflow for user {user_id}"
            )))
        })?;

    let (impression_count, watch_secs) = db_impressions::valid_stats_for_user(conn, user_id)?;

    let row = WalletRow {
        user_id,
        available_micros: available,
        pending_micros: pending,
        withdrawn_micros: withdrawn,
        total_micros: total,
        impression_count,
        watch_secs,
        updated_at: now,
    };
    db_wallets::upsert(conn, &row)?;

    tracing::debug!(
        user_id,
        available,
        pending,
        withdrawn,
        total,
        "wallet recomputed"
    );

    Ok(row)
}

/// Standalone recompute in its own transaction, for callers reacting to
/// out-of-band changes (e.g. a moderation pass over impressions).
pub fn recompute_now(conn: &mut Connection, user_id: UserId, now: u64) -> Result<WalletRow> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let row = recompute(&tx, user_id, now)?;
    tx.commit()?;
    Ok(row)
}

/// The current wallet snapshot, or `NotFound` if it was never computed.
pub fn get(conn: &Connection, user_id: UserId) -> Result<WalletRow> {
    Ok(db_wallets::get(conn, user_id)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mentora_db::queries::earnings::NewEarningRow;
    use mentora_db::queries::withdrawals::NewWithdrawalRow;
    use mentora_types::earning::EarningKind;
    use mentora_types::withdrawal::{PaymentMethod, WithdrawalStatus};
    use mentora_types::CourseId;

    fn test_db() -> (Connection, UserId, CourseId) {
        let conn = mentora_db::open_memory().expect("open test db");
        let instructor = refs::insert_user(&conn, "ada", "instructor", 1000).expect("user");
        let student = refs::insert_user(&conn, "bob", "student", 1000).expect("user");
        let course = refs::insert_course(&conn, "Rust 101", instructor, 1000).expect("course");
        (conn, student, course)
    }

    fn credit(conn: &Connection, user: UserId, course: CourseId, amount: i64, status: EarningStatus) {
        db_earnings::insert(
            conn,
            &NewEarningRow {
                user_id: user,
                course_id: course,
                kind: EarningKind::StudentWatch,
                amount_micros: amount,
                status,
                earned_at: 2000,
                approved_at: None,
            },
        )
        .expect("insert earning");
    }

    #[test]
    fn test_empty_wallet() {
        let (conn, user, _) = test_db();
        let wallet = recompute(&conn, user, 2000).expect("recompute");
        assert_eq!(wallet.available_micros, 0);
        assert_eq!(wallet.pending_micros, 0);
        assert_eq!(wallet.withdrawn_micros, 0);
        assert_eq!(wallet.total_micros, 0);
    }

    fn complete_withdrawal_row(conn: &Connection, user: UserId, amount: i64) {
        let wid = db_withdrawals::insert(
            conn,
            &NewWithdrawalRow {
                user_id: user,
                amount_micros: amount,
                fee_micros: 0,
                net_micros: amount,
                payment_method: PaymentMethod::Paypal,
                requested_at: 2500,
            },
        )
        .expect("withdrawal");
        db_withdrawals::update_status(
            conn,
            wid,
            WithdrawalStatus::Pending,
            WithdrawalStatus::Processing,
            2600,
            None,
        )
        .expect("process");
        db_withdrawals::update_status(
            conn,
            wid,
            WithdrawalStatus::Processing,
            WithdrawalStatus::Completed,
            2700,
            None,
        )
        .expect("complete");
    }

    #[test]
    fn test_partition_invariant() {
        let (conn, user, course) = test_db();
        credit(&conn, user, course, 9_000_000, EarningStatus::Approved);
        credit(&conn, user, course, 1_000_000, EarningStatus::Approved);
        credit(&conn, user, course, 500_000, EarningStatus::Pending);
        credit(&conn, user, course, 750_000, EarningStatus::Rejected);
        // A 2.00 payout: the earning it consumed is paid, the withdrawal
        // completed.
        credit(&conn, user, course, 2_000_000, EarningStatus::Paid);
        complete_withdrawal_row(&conn, user, 2_000_000);

        let wallet = recompute(&conn, user, 3000).expect("recompute");
        assert_eq!(wallet.available_micros, 10_000_000);
        assert_eq!(wallet.pending_micros, 500_000);
        assert_eq!(wallet.withdrawn_micros, 2_000_000);
        assert_eq!(
            wallet.available_micros + wallet.pending_micros + wallet.withdrawn_micros,
            wallet.total_micros,
            "rejected earnings must not count toward any balance"
        );
    }

    #[test]
    fn test_recompute_idempotent() {
        let (conn, user, course) = test_db();
        credit(&conn, user, course, 1_234_567, EarningStatus::Approved);
        credit(&conn, user, course, 89_012, EarningStatus::Pending);

        let first = recompute(&conn, user, 3000).expect("first");
        let second = recompute(&conn, user, 3000).expect("second");
        assert_eq!(first, second);
    }

    #[test]
    fn test_unknown_user() {
        let (conn, _, _) = test_db();
        assert!(matches!(
            recompute(&conn, 999, 2000),
            Err(LedgerError::NotFound(_))
        ));
    }
}
