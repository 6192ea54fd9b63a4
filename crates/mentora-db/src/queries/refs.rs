//! Reference-table query functions (users, courses, lectures).
//!
//! These tables belong to the out-of-scope account and catalog
//! subsystems; the ledger only reads them to validate references.

use rusqlite::{Connection, OptionalExtension};

use mentora_types::{CourseId, LectureId, UserId};

use crate::{DbError, Result};

/// Insert a user row. Returns the new user id.
pub fn insert_user(conn: &Connection, username: &str, role: &str, created_at: u64) -> Result<UserId> {
    conn.execute(
        "INSERT INTO users (username, role, created_at) VALUES (?1, ?2, ?3)",
        rusqlite::params![username, role, created_at as i64],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Insert a course row. Returns the new course id.
pub fn insert_course(
    conn: &Connection,
    title: &str,
    instructor_id: UserId,
    created_at: u64,
) -> Result<CourseId> {
    conn.execute(
        "INSERT INTO courses (title, instructor_id, created_at) VALUES (?1, ?2, ?3)",
        rusqlite::params![title, instructor_id, created_at as i64],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Insert a lecture row. Returns the new lecture id.
pub fn insert_lecture(
    conn: &Connection,
    course_id: CourseId,
    title: &str,
    position: u32,
) -> Result<LectureId> {
    conn.execute(
        "INSERT INTO lectures (course_id, title, position) VALUES (?1, ?2, ?3)",
        rusqlite::params![course_id, title, position],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Whether a user exists.
pub fn user_exists(conn: &Connection, user_id: UserId) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM users WHERE user_id = ?1",
            [user_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

/// The instructor of a course, or `NotFound` for an unknown course.
pub fn course_instructor(conn: &Connection, course_id: CourseId) -> Result<UserId> {
    conn.query_row(
        "SELECT instructor_id FROM courses WHERE course_id = ?1",
        [course_id],
        |row| row.get(0),
    )
    .optional()?
    .ok_or_else(|| DbError::NotFound(format!("course {course_id}")))
}

/// The course a lecture belongs to, or `NotFound` for an unknown lecture.
pub fn lecture_course(conn: &Connection, lecture_id: LectureId) -> Result<CourseId> {
    conn.query_row(
        "SELECT course_id FROM lectures WHERE lecture_id = ?1",
        [lecture_id],
        |row| row.get(0),
    )
    .optional()?
    .ok_or_else(|| DbError::NotFound(format!("lecture {lecture_id}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Connection {
        crate::open_memory().expect("open test db")
    }

    #[test]
    fn test_insert_and_lookup() {
        let conn = test_db();
        let instructor = insert_user(&conn, "ada", "instructor", 1000).expect("user");
        let course = insert_course(&conn, "Rust 101", instructor, 1000).expect("course");
        let lecture = insert_lecture(&conn, course, "Ownership", 1).expect("lecture");

        assert!(user_exists(&conn, instructor).expect("exists"));
        assert!(!user_exists(&conn, 9999).expect("exists"));
        assert_eq!(course_instructor(&conn, course).expect("instructor"), instructor);
        assert_eq!(lecture_course(&conn, lecture).expect("course"), course);
    }

    #[test]
    fn test_unknown_course_not_found() {
        let conn = test_db();
        assert!(matches!(
            course_instructor(&conn, 42),
            Err(DbError::NotFound(_))
        ));
    }
}
