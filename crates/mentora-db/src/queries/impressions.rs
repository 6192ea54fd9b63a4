//! Ad impression query functions.

use rusqlite::{Connection, OptionalExtension};

use mentora_types::impression::AdPlatform;
use mentora_types::{CourseId, ImpressionId, LectureId, UserId};

use crate::{DbError, Result};

/// Field values for a new impression row.
#[derive(Debug)]
pub struct NewImpressionRow<'a> {
    pub user_id: UserId,
    pub course_id: CourseId,
    pub lecture_id: Option<LectureId>,
    pub platform: AdPlatform,
    pub cpm_micros: i64,
    pub revenue_micros: i64,
    pub view_secs: u32,
    pub is_valid: bool,
    pub ip_address: Option<&'a str>,
    pub user_agent: Option<&'a str>,
    pub viewed_at: u64,
}

/// A stored impression row.
#[derive(Debug)]
pub struct ImpressionRow {
    pub impression_id: ImpressionId,
    pub user_id: UserId,
    pub course_id: CourseId,
    pub lecture_id: Option<LectureId>,
    pub platform: AdPlatform,
    pub cpm_micros: i64,
    pub revenue_micros: i64,
    pub view_secs: u32,
    pub is_valid: bool,
    pub credited: bool,
    pub viewed_at: u64,
}

/// Insert an impression. Returns the new impression id.
pub fn insert(conn: &Connection, row: &NewImpressionRow<'_>) -> Result<ImpressionId> {
    conn.execute(
        "INSERT INTO ad_impressions
             (user_id, course_id, lecture_id, platform, cpm_micros, revenue_micros,
              view_secs, is_valid, ip_address, user_agent, viewed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        rusqlite::params![
            row.user_id,
            row.course_id,
            row.lecture_id,
            row.platform.as_str(),
            row.cpm_micros,
            row.revenue_micros,
            row.view_secs,
            row.is_valid,
            row.ip_address,
            row.user_agent,
            row.viewed_at as i64,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Fetch an impression by id.
pub fn get(conn: &Connection, impression_id: ImpressionId) -> Result<ImpressionRow> {
    conn.query_row(
        "SELECT impression_id, user_id, course_id, lecture_id, platform, cpm_micros,
                revenue_micros, view_secs, is_valid, credited, viewed_at
         FROM ad_impressions WHERE impression_id = ?1",
        [impression_id],
        |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, Option<i64>>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, i64>(5)?,
                row.get::<_, i64>(6)?,
                row.get::<_, i64>(7)?,
                row.get::<_, bool>(8)?,
                row.get::<_, bool>(9)?,
                row.get::<_, i64>(10)?,
            ))
        },
    )
    .optional()?
    .ok_or_else(|| DbError::NotFound(format!("impression {impression_id}")))
    .and_then(|raw| {
        Ok(ImpressionRow {
            impression_id: raw.0,
            user_id: raw.1,
            course_id: raw.2,
            lecture_id: raw.3,
            platform: AdPlatform::parse(&raw.4)?,
            cpm_micros: raw.5,
            revenue_micros: raw.6,
            view_secs: raw.7 as u32,
            is_valid: raw.8,
            credited: raw.9,
            viewed_at: raw.10 as u64,
        })
    })
}

/// Moderation flip of the validity flag. The only mutable field besides
/// the credited marker.
pub fn set_valid(conn: &Connection, impression_id: ImpressionId, is_valid: bool) -> Result<()> {
    let updated = conn.execute(
        "UPDATE ad_impressions SET is_valid = ?1 WHERE impression_id = ?2",
        rusqlite::params![is_valid, impression_id],
    )?;
    if updated == 0 {
        return Err(DbError::NotFound(format!("impression {impression_id}")));
    }
    Ok(())
}

/// Mark an impression as credited, exactly once.
///
/// Returns `false` if the impression was already credited (the guarded
/// UPDATE matched no row), so the earning fan-out can never run twice.
pub fn mark_credited(conn: &Connection, impression_id: ImpressionId) -> Result<bool> {
    let updated = conn.execute(
        "UPDATE ad_impressions SET credited = 1
         WHERE impression_id = ?1 AND credited = 0",
        [impression_id],
    )?;
    Ok(updated == 1)
}

/// Count and total watch seconds of a user's currently-valid impressions.
pub fn valid_stats_for_user(conn: &Connection, user_id: UserId) -> Result<(u64, u64)> {
    conn.query_row(
        "SELECT COUNT(*), COALESCE(SUM(view_secs), 0)
         FROM ad_impressions WHERE user_id = ?1 AND is_valid = 1",
        [user_id],
        |row| Ok((row.get::<_, i64>(0)? as u64, row.get::<_, i64>(1)? as u64)),
    )
    .map_err(DbError::Sqlite)
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

    fn sample_row<'a>(user: UserId, course: CourseId) -> NewImpressionRow<'a> {
        NewImpressionRow {
            user_id: user,
            course_id: course,
            lecture_id: None,
            platform: AdPlatform::Admob,
            cpm_micros: 2_500_000,
            revenue_micros: 2_500,
            view_secs: 45,
            is_valid: true,
            ip_address: Some("10.0.0.1"),
            user_agent: Some("Mozilla/5.0"),
            viewed_at: 1_700_000_000,
        }
    }

    #[test]
    fn test_insert_and_get() {
        let (conn, user, course) = test_db();
        let id = insert(&conn, &sample_row(user, course)).expect("insert");

        let row = get(&conn, id).expect("get");
        assert_eq!(row.user_id, user);
        assert_eq!(row.platform, AdPlatform::Admob);
        assert_eq!(row.revenue_micros, 2_500);
        assert!(row.is_valid);
        assert!(!row.credited);
    }

    #[test]
    fn test_mark_credited_once() {
        let (conn, user, course) = test_db();
        let id = insert(&conn, &sample_row(user, course)).expect("insert");

        assert!(mark_credited(&conn, id).expect("first"));
        assert!(!mark_credited(&conn, id).expect("second"), "must not credit twice");
    }

    #[test]
    fn test_valid_stats() {
        let (conn, user, course) = test_db();
        let a = insert(&conn, &sample_row(user, course)).expect("insert");
        let _b = insert(&conn, &sample_row(user, course)).expect("insert");

        let (count, secs) = valid_stats_for_user(&conn, user).expect("stats");
        assert_eq!(count, 2);
        assert_eq!(secs, 90);

        set_valid(&conn, a, false).expect("flag");
        let (count, secs) = valid_stats_for_user(&conn, user).expect("stats");
        assert_eq!(count, 1);
        assert_eq!(secs, 45);
    }

    #[test]
    fn test_get_unknown_not_found() {
        let (conn, _, _) = test_db();
        assert!(matches!(get(&conn, 404), Err(DbError::NotFound(_))));
    }
}
