use rusqlite::{Connection, OptionalExtension, Row};

use super::{new_id, now_timestamp, write_error};
use crate::error::ApiError;
use crate::model::{NewSubject, Subject};

pub const DUPLICATE_ON_CREATE: &str = "Subject name must be unique";
pub const DUPLICATE_ON_UPDATE: &str = "Subject name must be unique within the same class";
pub const NOT_FOUND: &str = "Subject not found";

const COLUMNS: &str = "id, name, class, is_deleted, created_at, updated_at";

fn from_row(row: &Row<'_>) -> rusqlite::Result<Subject> {
    Ok(Subject {
        id: row.get(0)?,
        name: row.get(1)?,
        class: row.get(2)?,
        is_deleted: row.get::<_, i64>(3)? != 0,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

pub fn create(conn: &Connection, input: &NewSubject) -> Result<Subject, ApiError> {
    let id = new_id();
    let now = now_timestamp();
    conn.execute(
        "INSERT INTO subjects(id, name, class, is_deleted, created_at, updated_at)
         VALUES(?, ?, ?, 0, ?, ?)",
        (&id, &input.name, &input.class, &now, &now),
    )
    .map_err(|e| write_error(e, DUPLICATE_ON_CREATE))?;
    get(conn, &id)
}

/// Active subjects, newest first.
pub fn list(conn: &Connection) -> Result<Vec<Subject>, ApiError> {
    let sql = format!(
        "SELECT {COLUMNS}
         FROM subjects
         WHERE is_deleted = 0
         ORDER BY created_at DESC, rowid DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let subjects = stmt.query_map([], from_row)?.collect::<Result<Vec<_>, _>>()?;
    Ok(subjects)
}

pub fn find(conn: &Connection, id: &str) -> Result<Option<Subject>, ApiError> {
    let sql = format!("SELECT {COLUMNS} FROM subjects WHERE id = ?");
    Ok(conn.query_row(&sql, [id], from_row).optional()?)
}

pub fn get(conn: &Connection, id: &str) -> Result<Subject, ApiError> {
    find(conn, id)?.ok_or_else(|| ApiError::NotFound(NOT_FOUND.to_string()))
}

pub fn update(conn: &Connection, id: &str, input: &NewSubject) -> Result<Subject, ApiError> {
    let changed = conn
        .execute(
            "UPDATE subjects SET name = ?, class = ?, updated_at = ?
             WHERE id = ? AND is_deleted = 0",
            (&input.name, &input.class, now_timestamp(), id),
        )
        .map_err(|e| write_error(e, DUPLICATE_ON_UPDATE))?;
    if changed == 0 {
        return Err(ApiError::NotFound(NOT_FOUND.to_string()));
    }
    get(conn, id)
}

/// Soft delete: the subject drops out of listings and frees its
/// (class, name) pair, but stays readable by id.
pub fn delete(conn: &Connection, id: &str) -> Result<Subject, ApiError> {
    let changed = conn.execute(
        "UPDATE subjects SET is_deleted = 1, updated_at = ? WHERE id = ? AND is_deleted = 0",
        (now_timestamp(), id),
    )?;
    if changed == 0 {
        return Err(ApiError::NotFound(NOT_FOUND.to_string()));
    }
    get(conn, id)
}
