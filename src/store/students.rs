use rusqlite::{Connection, OptionalExtension, Row};

use super::{new_id, now_timestamp, write_error};
use crate::error::ApiError;
use crate::model::{NewStudent, Student, StudentStatus};

pub const DUPLICATE_ROLL_NO: &str = "Roll number must be unique within the same class";
pub const NOT_FOUND: &str = "Student not found";

const COLUMNS: &str =
    "id, first_name, last_name, class, roll_no, status, is_deleted, created_at, updated_at";

fn from_row(row: &Row<'_>) -> rusqlite::Result<Student> {
    Ok(Student {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        class: row.get(3)?,
        roll_no: row.get(4)?,
        status: row.get(5)?,
        is_deleted: row.get::<_, i64>(6)? != 0,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

pub fn create(conn: &Connection, input: &NewStudent) -> Result<Student, ApiError> {
    let id = new_id();
    let now = now_timestamp();
    conn.execute(
        "INSERT INTO students(
           id, first_name, last_name, class, roll_no, status, is_deleted, created_at, updated_at
         ) VALUES(?, ?, ?, ?, ?, ?, 0, ?, ?)",
        (
            &id,
            &input.first_name,
            &input.last_name,
            &input.class,
            input.roll_no,
            StudentStatus::Pending,
            &now,
            &now,
        ),
    )
    .map_err(|e| write_error(e, DUPLICATE_ROLL_NO))?;
    get(conn, &id)
}

/// Active students, newest first.
pub fn list(conn: &Connection, status: Option<StudentStatus>) -> Result<Vec<Student>, ApiError> {
    let sql = format!(
        "SELECT {COLUMNS}
         FROM students
         WHERE is_deleted = 0 AND (?1 IS NULL OR status = ?1)
         ORDER BY created_at DESC, rowid DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let students = stmt
        .query_map([status], from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(students)
}

/// Looks up a student by id, including soft-deleted ones.
pub fn find(conn: &Connection, id: &str) -> Result<Option<Student>, ApiError> {
    let sql = format!("SELECT {COLUMNS} FROM students WHERE id = ?");
    Ok(conn.query_row(&sql, [id], from_row).optional()?)
}

pub fn get(conn: &Connection, id: &str) -> Result<Student, ApiError> {
    find(conn, id)?.ok_or_else(|| ApiError::NotFound(NOT_FOUND.to_string()))
}

pub fn update(conn: &Connection, id: &str, input: &NewStudent) -> Result<Student, ApiError> {
    let changed = conn
        .execute(
            "UPDATE students
             SET first_name = ?, last_name = ?, class = ?, roll_no = ?, updated_at = ?
             WHERE id = ? AND is_deleted = 0",
            (
                &input.first_name,
                &input.last_name,
                &input.class,
                input.roll_no,
                now_timestamp(),
                id,
            ),
        )
        .map_err(|e| write_error(e, DUPLICATE_ROLL_NO))?;
    if changed == 0 {
        return Err(ApiError::NotFound(NOT_FOUND.to_string()));
    }
    get(conn, id)
}

/// Soft delete. Marks referencing the student are left untouched.
pub fn delete(conn: &Connection, id: &str) -> Result<Student, ApiError> {
    let changed = conn.execute(
        "UPDATE students SET is_deleted = 1, updated_at = ? WHERE id = ? AND is_deleted = 0",
        (now_timestamp(), id),
    )?;
    if changed == 0 {
        return Err(ApiError::NotFound(NOT_FOUND.to_string()));
    }
    get(conn, id)
}

pub fn set_status(conn: &Connection, id: &str, status: StudentStatus) -> Result<(), ApiError> {
    let changed = conn.execute(
        "UPDATE students SET status = ?, updated_at = ? WHERE id = ?",
        (status, now_timestamp(), id),
    )?;
    if changed == 0 {
        return Err(ApiError::NotFound(NOT_FOUND.to_string()));
    }
    Ok(())
}
