//! Revenue share configuration query functions.
//!
//! Validation of the percentage sum happens at the service-layer write
//! boundary; the schema CHECK and the partial unique index on
//! `is_default` back it up against raw writes.

use rusqlite::{Connection, OptionalExtension};

use mentora_types::{CourseId, SplitId};

use crate::Result;

/// Field values for a new split config row.
#[derive(Debug)]
pub struct NewSplitRow {
    /// Course override, or `None` for the platform default row.
    pub course_id: Option<CourseId>,
    pub student_pct: u8,
    pub instructor_pct: u8,
    pub platform_pct: u8,
    pub is_default: bool,
    pub min_watch_secs: u32,
    pub earnings_per_minute_micros: i64,
    pub completion_bonus_micros: i64,
    pub created_at: u64,
}

/// A stored split config row.
#[derive(Clone, Debug)]
pub struct SplitRow {
    pub split_id: SplitId,
    pub course_id: Option<CourseId>,
    pub student_pct: u8,
    pub instructor_pct: u8,
    pub platform_pct: u8,
    pub is_default: bool,
    pub min_watch_secs: u32,
    pub earnings_per_minute_micros: i64,
    pub completion_bonus_micros: i64,
}

const SELECT_COLS: &str = "split_id, course_id, student_pct, instructor_pct, platform_pct,
                           is_default, min_watch_secs, earnings_per_minute_micros,
                           completion_bonus_micros";

fn row_from(row: &rusqlite::Row<'_>) -> rusqlite::Result<SplitRow> {
    Ok(SplitRow {
        split_id: row.get(0)?,
        course_id: row.get(1)?,
        student_pct: row.get::<_, i64>(2)? as u8,
        instructor_pct: row.get::<_, i64>(3)? as u8,
        platform_pct: row.get::<_, i64>(4)? as u8,
        is_default: row.get(5)?,
        min_watch_secs: row.get::<_, i64>(6)? as u32,
        earnings_per_minute_micros: row.get(7)?,
        completion_bonus_micros: row.get(8)?,
    })
}

/// Insert a split config row. Returns the new split id.
pub fn insert(conn: &Connection, row: &NewSplitRow) -> Result<SplitId> {
    conn.execute(
        "INSERT INTO revenue_splits
             (course_id, student_pct, instructor_pct, platform_pct, is_default,
              min_watch_secs, earnings_per_minute_micros, completion_bonus_micros, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        rusqlite::params![
            row.course_id,
            row.student_pct,
            row.instructor_pct,
            row.platform_pct,
            row.is_default,
            row.min_watch_secs,
            row.earnings_per_minute_micros,
            row.completion_bonus_micros,
            row.created_at as i64,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// The override config for a course, if one exists.
pub fn find_for_course(conn: &Connection, course_id: CourseId) -> Result<Option<SplitRow>> {
    let found = conn
        .query_row(
            &format!("SELECT {SELECT_COLS} FROM revenue_splits WHERE course_id = ?1"),
            [course_id],
            row_from,
        )
        .optional()?;
    Ok(found)
}

/// All default-flagged rows. The partial unique index keeps this at one,
/// but the resolver double-checks rather than trusting the schema.
pub fn find_defaults(conn: &Connection) -> Result<Vec<SplitRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SELECT_COLS} FROM revenue_splits WHERE is_default = 1"
    ))?;
    let rows = stmt
        .query_map([], row_from)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::refs;

    fn test_db() -> Connection {
        crate::open_memory().expect("open test db")
    }

    fn default_row() -> NewSplitRow {
        NewSplitRow {
            course_id: None,
            student_pct: 90,
            instructor_pct: 10,
            platform_pct: 0,
            is_default: true,
            min_watch_secs: 30,
            earnings_per_minute_micros: 0,
            completion_bonus_micros: 500_000,
            created_at: 1000,
        }
    }

    #[test]
    fn test_insert_and_find_default() {
        let conn = test_db();
        insert(&conn, &default_row()).expect("insert");

        let defaults = find_defaults(&conn).expect("find");
        assert_eq!(defaults.len(), 1);
        assert_eq!(defaults[0].student_pct, 90);
        assert_eq!(defaults[0].completion_bonus_micros, 500_000);
    }

    #[test]
    fn test_course_override_unique() {
        let conn = test_db();
        let instructor = refs::insert_user(&conn, "ada", "instructor", 1000).expect("user");
        let course = refs::insert_course(&conn, "Rust 101", instructor, 1000).expect("course");

        let mut row = default_row();
        row.course_id = Some(course);
        row.is_default = false;
        insert(&conn, &row).expect("first override");
        assert!(insert(&conn, &row).is_err(), "second override must fail");

        let found = find_for_course(&conn, course).expect("find").expect("some");
        assert_eq!(found.course_id, Some(course));
    }

    #[test]
    fn test_no_config_found() {
        let conn = test_db();
        assert!(find_defaults(&conn).expect("find").is_empty());
        assert!(find_for_course(&conn, 1).expect("find").is_none());
    }
}
