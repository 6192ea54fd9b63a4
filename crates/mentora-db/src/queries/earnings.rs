//! Earnings ledger query functions.
//!
//! Rows are append-only: amount, kind, and owner are never updated.
//! Status changes go through the service layer, which enforces the
//! forward-only transition graph before calling [`update_status`].

use rusqlite::{Connection, OptionalExtension};

use mentora_types::earning::{EarningKind, EarningStatus};
use mentora_types::{CourseId, EarningId, ImpressionId, UserId, WithdrawalId};

use crate::{DbError, Result};

/// Field values for a new earning row.
#[derive(Debug)]
pub struct NewEarningRow {
    pub user_id: UserId,
    pub course_id: CourseId,
    pub kind: EarningKind,
    pub amount_micros: i64,
    pub status: EarningStatus,
    pub earned_at: u64,
    /// Set when the row is created already approved (ad earnings).
    pub approved_at: Option<u64>,
}

/// A stored earning row.
#[derive(Debug)]
pub struct EarningRow {
    pub earning_id: EarningId,
    pub user_id: UserId,
    pub course_id: CourseId,
    pub kind: EarningKind,
    pub amount_micros: i64,
    pub status: EarningStatus,
    pub withdrawal_id: Option<WithdrawalId>,
    pub earned_at: u64,
}

/// Append an earning. Returns the new earning id.
pub fn insert(conn: &Connection, row: &NewEarningRow) -> Result<EarningId> {
    conn.execute(
        "INSERT INTO earnings
             (user_id, course_id, kind, amount_micros, status, earned_at, approved_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            row.user_id,
            row.course_id,
            row.kind.as_str(),
            row.amount_micros,
            row.status.as_str(),
            row.earned_at as i64,
            row.approved_at.map(|t| t as i64),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Fetch an earning by id.
pub fn get(conn: &Connection, earning_id: EarningId) -> Result<EarningRow> {
    conn.query_row(
        "SELECT earning_id, user_id, course_id, kind, amount_micros, status,
                withdrawal_id, earned_at
         FROM earnings WHERE earning_id = ?1",
        [earning_id],
        |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, Option<i64>>(6)?,
                row.get::<_, i64>(7)?,
            ))
        },
    )
    .optional()?
    .ok_or_else(|| DbError::NotFound(format!("earning {earning_id}")))
    .and_then(|raw| {
        Ok(EarningRow {
            earning_id: raw.0,
            user_id: raw.1,
            course_id: raw.2,
            kind: EarningKind::parse(&raw.3)?,
            amount_micros: raw.4,
            status: EarningStatus::parse(&raw.5)?,
            withdrawal_id: raw.6,
            earned_at: raw.7 as u64,
        })
    })
}

/// Write a new status (and the matching timestamp column).
///
/// The caller has already verified the transition is legal; the
/// `AND status = ?` guard makes a lost race surface as `Constraint`
/// instead of a silent overwrite.
pub fn update_status(
    conn: &Connection,
    earning_id: EarningId,
    from: EarningStatus,
    to: EarningStatus,
    at: u64,
) -> Result<()> {
    let timestamp_col = match to {
        EarningStatus::Approved => "approved_at",
        EarningStatus::Paid => "paid_at",
        EarningStatus::Pending | EarningStatus::Rejected => "earned_at",
    };
    let sql = if to == EarningStatus::Rejected {
        "UPDATE earnings SET status = ?1 WHERE earning_id = ?2 AND status = ?3".to_string()
    } else {
        format!(
            "UPDATE earnings SET status = ?1, {timestamp_col} = ?4
             WHERE earning_id = ?2 AND status = ?3"
        )
    };
    let updated = if to == EarningStatus::Rejected {
        conn.execute(
            &sql,
            rusqlite::params![to.as_str(), earning_id, from.as_str()],
        )?
    } else {
        conn.execute(
            &sql,
            rusqlite::params![to.as_str(), earning_id, from.as_str(), at as i64],
        )?
    };
    if updated == 0 {
        return Err(DbError::Constraint(format!(
            "earning {earning_id} is no longer {}",
            from.as_str()
        )));
    }
    Ok(())
}

/// Sum of a user's earnings in a given status.
pub fn sum_by_status(conn: &Connection, user_id: UserId, status: EarningStatus) -> Result<i64> {
    let sum: i64 = conn.query_row(
        "SELECT COALESCE(SUM(amount_micros), 0) FROM earnings
         WHERE user_id = ?1 AND status = ?2",
        rusqlite::params![user_id, status.as_str()],
        |row| row.get(0),
    )?;
    Ok(sum)
}

/// Whether a completion bonus already exists for this (user, course) pair.
pub fn completion_bonus_exists(
    conn: &Connection,
    user_id: UserId,
    course_id: CourseId,
) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM earnings
             WHERE user_id = ?1 AND course_id = ?2 AND kind = ?3 LIMIT 1",
            rusqlite::params![user_id, course_id, EarningKind::CompletionBonus.as_str()],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Record that an impression contributed to an earning.
pub fn link_impression(
    conn: &Connection,
    earning_id: EarningId,
    impression_id: ImpressionId,
) -> Result<()> {
    conn.execute(
        "INSERT INTO earning_impressions (earning_id, impression_id) VALUES (?1, ?2)",
        rusqlite::params![earning_id, impression_id],
    )?;
    Ok(())
}

/// A user's approved, unpaid earnings, oldest first.
pub fn approved_for_user(conn: &Connection, user_id: UserId) -> Result<Vec<(EarningId, i64)>> {
    let mut stmt = conn.prepare(
        "SELECT earning_id, amount_micros FROM earnings
         WHERE user_id = ?1 AND status = ?2
         ORDER BY earned_at ASC, earning_id ASC",
    )?;
    let rows = stmt
        .query_map(
            rusqlite::params![user_id, EarningStatus::Approved.as_str()],
            |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Flip an approved earning to paid and link it to a withdrawal.
pub fn mark_paid(
    conn: &Connection,
    earning_id: EarningId,
    withdrawal_id: WithdrawalId,
    paid_at: u64,
) -> Result<()> {
    let updated = conn.execute(
        "UPDATE earnings SET status = ?1, withdrawal_id = ?2, paid_at = ?3
         WHERE earning_id = ?4 AND status = ?5",
        rusqlite::params![
            EarningStatus::Paid.as_str(),
            withdrawal_id,
            paid_at as i64,
            earning_id,
            EarningStatus::Approved.as_str(),
        ],
    )?;
    if updated == 0 {
        return Err(DbError::Constraint(format!(
            "earning {earning_id} is not approved"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::refs;

    fn test_db() -> (Connection, UserId, CourseId) {
        let conn = crate::open_memory().expect("open test db");
        let instructor = refs::insert_user(&conn, "ada", "instructor", 1000).expect("user");
        let student = refs::insert_user(&conn, "bob", "student", 1000).expect("user");
        let course = refs::insert_course(&conn, "Rust 101", instructor, 1000).expect("course");
        (conn, student, course)
    }

    fn credit(
        conn: &Connection,
        user: UserId,
        course: CourseId,
        amount: i64,
        status: EarningStatus,
    ) -> EarningId {
        insert(
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
        .expect("insert earning")
    }

    #[test]
    fn test_insert_and_sum() {
        let (conn, user, course) = test_db();
        credit(&conn, user, course, 9_000_000, EarningStatus::Approved);
        credit(&conn, user, course, 1_000_000, EarningStatus::Approved);
        credit(&conn, user, course, 500_000, EarningStatus::Pending);

        assert_eq!(
            sum_by_status(&conn, user, EarningStatus::Approved).expect("sum"),
            10_000_000
        );
        assert_eq!(
            sum_by_status(&conn, user, EarningStatus::Pending).expect("sum"),
            500_000
        );
        assert_eq!(sum_by_status(&conn, user, EarningStatus::Paid).expect("sum"), 0);
    }

    #[test]
    fn test_update_status_guarded() {
        let (conn, user, course) = test_db();
        let id = credit(&conn, user, course, 100, EarningStatus::Pending);

        update_status(&conn, id, EarningStatus::Pending, EarningStatus::Approved, 3000)
            .expect("approve");
        let row = get(&conn, id).expect("get");
        assert_eq!(row.status, EarningStatus::Approved);

        // Stale 'from' no longer matches.
        assert!(matches!(
            update_status(&conn, id, EarningStatus::Pending, EarningStatus::Approved, 3000),
            Err(DbError::Constraint(_))
        ));
    }

    #[test]
    fn test_completion_bonus_existence() {
        let (conn, user, course) = test_db();
        assert!(!completion_bonus_exists(&conn, user, course).expect("check"));

        insert(
            &conn,
            &NewEarningRow {
                user_id: user,
                course_id: course,
                kind: EarningKind::CompletionBonus,
                amount_micros: 500_000,
                status: EarningStatus::Pending,
                earned_at: 2000,
                approved_at: None,
            },
        )
        .expect("insert");
        assert!(completion_bonus_exists(&conn, user, course).expect("check"));
    }

    #[test]
    fn test_approved_oldest_first_and_mark_paid() {
        let (conn, user, course) = test_db();
        let a = credit(&conn, user, course, 100, EarningStatus::Approved);
        let b = credit(&conn, user, course, 200, EarningStatus::Approved);

        let approved = approved_for_user(&conn, user).expect("list");
        assert_eq!(approved, vec![(a, 100), (b, 200)]);

        // A withdrawal row to link against.
        conn.execute(
            "INSERT INTO withdrawals
                 (user_id, amount_micros, fee_micros, net_micros, payment_method,
                  status, requested_at)
             VALUES (?1, 100, 0, 100, 'paypal', 'processing', 3000)",
            [user],
        )
        .expect("withdrawal");
        let wid = conn.last_insert_rowid();

        mark_paid(&conn, a, wid, 4000).expect("pay");
        assert!(mark_paid(&conn, a, wid, 4000).is_err(), "already paid");

        let row = get(&conn, a).expect("get");
        assert_eq!(row.status, EarningStatus::Paid);
        assert_eq!(row.withdrawal_id, Some(wid));
    }
}
