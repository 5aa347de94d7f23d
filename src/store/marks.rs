use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;

use super::{new_id, now_timestamp, students, subjects};
use crate::error::ApiError;
use crate::model::{MarkBatch, MarkRow, StudentStatus};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOutcome {
    pub inserted: usize,
    pub updated: usize,
}

/// Records a batch of marks for one student and flips the student to `done`.
///
/// All writes share one transaction; any failure leaves both the marks and the
/// student's status as they were. A subject the student already has a mark
/// for is overwritten rather than duplicated.
pub fn record_batch(conn: &Connection, batch: &MarkBatch) -> Result<BatchOutcome, ApiError> {
    let tx = conn.unchecked_transaction()?;

    let student = match students::find(&tx, &batch.student_id)? {
        Some(s) if !s.is_deleted => s,
        _ => return Err(ApiError::NotFound(students::NOT_FOUND.to_string())),
    };
    if student.class != batch.class {
        return Err(ApiError::Validation(format!(
            "Class '{}' does not match the student's class '{}'",
            batch.class, student.class
        )));
    }

    let now = now_timestamp();
    let mut outcome = BatchOutcome::default();
    for entry in &batch.marks {
        let subject = match subjects::find(&tx, &entry.subject_id)? {
            Some(s) if !s.is_deleted => s,
            _ => {
                return Err(ApiError::Validation(format!(
                    "Subject not found: {}",
                    entry.subject_id
                )))
            }
        };
        if subject.class != student.class {
            return Err(ApiError::Validation(format!(
                "Subject '{}' does not belong to class '{}'",
                subject.name, student.class
            )));
        }

        let existing: Option<String> = tx
            .query_row(
                "SELECT id FROM marks WHERE student_id = ? AND subject_id = ?",
                (&student.id, &subject.id),
                |r| r.get(0),
            )
            .optional()?;
        match existing {
            Some(mark_id) => {
                tx.execute(
                    "UPDATE marks SET mark = ?, updated_at = ? WHERE id = ?",
                    (entry.mark, &now, &mark_id),
                )?;
                outcome.updated += 1;
            }
            None => {
                tx.execute(
                    "INSERT INTO marks(id, student_id, subject_id, mark, created_at, updated_at)
                     VALUES(?, ?, ?, ?, ?, ?)",
                    (new_id(), &student.id, &subject.id, entry.mark, &now, &now),
                )?;
                outcome.inserted += 1;
            }
        }
    }

    students::set_status(&tx, &student.id, StudentStatus::Done)?;
    tx.commit()?;
    Ok(outcome)
}

/// Every mark joined with its student and subject, newest first.
///
/// Soft-deleted students and subjects are still joined: deleting either one
/// never hides or removes marks already recorded against it.
pub fn list_rows(conn: &Connection) -> Result<Vec<MarkRow>, ApiError> {
    let mut stmt = conn.prepare(
        "SELECT
           m.id,
           m.student_id,
           m.subject_id,
           s.first_name,
           s.last_name,
           s.class,
           s.roll_no,
           sub.name,
           sub.class,
           m.mark,
           m.created_at
         FROM marks m
         JOIN students s ON s.id = m.student_id
         JOIN subjects sub ON sub.id = m.subject_id
         ORDER BY m.created_at DESC, m.rowid DESC",
    )?;
    let rows = stmt
        .query_map([], |row| {
            let first_name: String = row.get(3)?;
            let last_name: String = row.get(4)?;
            Ok(MarkRow {
                id: row.get(0)?,
                student_id: row.get(1)?,
                subject_id: row.get(2)?,
                student_name: format!("{} {}", first_name, last_name),
                student_class: row.get(5)?,
                roll_no: row.get(6)?,
                subject_name: row.get(7)?,
                subject_class: row.get(8)?,
                mark: row.get(9)?,
                created_at: row.get(10)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
