use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StudentStatus {
    Pending,
    Done,
}

impl StudentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StudentStatus::Pending => "pending",
            StudentStatus::Done => "done",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(StudentStatus::Pending),
            "done" => Some(StudentStatus::Done),
            _ => None,
        }
    }
}

impl ToSql for StudentStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for StudentStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let s = value.as_str()?;
        StudentStatus::parse(s)
            .ok_or_else(|| FromSqlError::Other(format!("unknown student status: {s}").into()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub class: String,
    pub roll_no: i64,
    pub status: StudentStatus,
    pub is_deleted: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: String,
    pub name: String,
    pub class: String,
    pub is_deleted: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// A mark joined with the student and subject it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkRow {
    pub id: String,
    pub student_id: String,
    pub subject_id: String,
    pub student_name: String,
    pub student_class: String,
    pub roll_no: i64,
    pub subject_name: String,
    pub subject_class: String,
    pub mark: Option<f64>,
    pub created_at: String,
}

// ── Request bodies ──────────────────────────────────────────────────
//
// Every field is optional so a missing value surfaces as a field message
// instead of a generic deserialization failure.

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentInput {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub class: Option<String>,
    pub roll_no: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewStudent {
    pub first_name: String,
    pub last_name: String,
    pub class: String,
    pub roll_no: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubjectInput {
    pub name: Option<String>,
    pub class: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewSubject {
    pub name: String,
    pub class: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkEntryInput {
    pub subject_id: Option<String>,
    pub mark: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkBatchInput {
    pub student_id: Option<String>,
    pub class: Option<String>,
    pub marks: Option<Vec<MarkEntryInput>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkEntry {
    pub subject_id: String,
    pub mark: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkBatch {
    pub student_id: String,
    pub class: String,
    pub marks: Vec<MarkEntry>,
}

pub const MARK_MIN: f64 = 0.0;
pub const MARK_MAX: f64 = 100.0;

fn required_text(v: Option<&str>) -> Option<String> {
    v.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

fn finish<T>(errors: Vec<String>, value: impl FnOnce() -> T) -> Result<T, ApiError> {
    if errors.is_empty() {
        Ok(value())
    } else {
        Err(ApiError::Validation(errors.join(", ")))
    }
}

impl StudentInput {
    /// Class labels are stored trimmed and lowercased, like subject classes.
    pub fn validate(&self) -> Result<NewStudent, ApiError> {
        let mut errors = Vec::new();

        let first_name = required_text(self.first_name.as_deref());
        if first_name.is_none() {
            errors.push("First name is required".to_string());
        }
        let last_name = required_text(self.last_name.as_deref());
        if last_name.is_none() {
            errors.push("Last name is required".to_string());
        }
        let class = required_text(self.class.as_deref()).map(|s| s.to_lowercase());
        if class.is_none() {
            errors.push("Class is required".to_string());
        }

        let roll_no = match &self.roll_no {
            None | Some(serde_json::Value::Null) => {
                errors.push("Roll number is required".to_string());
                None
            }
            Some(serde_json::Value::Number(n)) => match n.as_i64() {
                Some(v) if v > 0 => Some(v),
                _ => {
                    errors.push("Roll number must be a positive integer".to_string());
                    None
                }
            },
            Some(_) => {
                errors.push("Roll number must be a number".to_string());
                None
            }
        };

        finish(errors, || NewStudent {
            first_name: first_name.unwrap_or_default(),
            last_name: last_name.unwrap_or_default(),
            class: class.unwrap_or_default(),
            roll_no: roll_no.unwrap_or_default(),
        })
    }
}

impl SubjectInput {
    /// Subjects are stored trimmed and lowercased.
    pub fn validate(&self) -> Result<NewSubject, ApiError> {
        let mut errors = Vec::new();

        let name = required_text(self.name.as_deref()).map(|s| s.to_lowercase());
        if name.is_none() {
            errors.push("Subject name is required".to_string());
        }
        let class = required_text(self.class.as_deref()).map(|s| s.to_lowercase());
        if class.is_none() {
            errors.push("Class is required".to_string());
        }

        finish(errors, || NewSubject {
            name: name.unwrap_or_default(),
            class: class.unwrap_or_default(),
        })
    }
}

impl MarkBatchInput {
    pub fn validate(&self) -> Result<MarkBatch, ApiError> {
        let mut errors = Vec::new();

        let student_id = required_text(self.student_id.as_deref());
        if student_id.is_none() {
            errors.push("Student is required".to_string());
        }
        let class = required_text(self.class.as_deref()).map(|s| s.to_lowercase());
        if class.is_none() {
            errors.push("Class is required".to_string());
        }

        let inputs = self.marks.as_deref().unwrap_or_default();
        if inputs.is_empty() {
            errors.push("At least one subject mark is required".to_string());
        }

        let mut marks = Vec::with_capacity(inputs.len());
        for (i, entry) in inputs.iter().enumerate() {
            let subject_id = required_text(entry.subject_id.as_deref());
            match &subject_id {
                None => errors.push(format!("marks[{i}]: Subject is required")),
                Some(id) if marks.iter().any(|m: &MarkEntry| &m.subject_id == id) => {
                    errors.push(format!("marks[{i}]: Subject is listed more than once"));
                }
                Some(_) => {}
            }

            let mark = match entry.mark.as_ref().and_then(|v| v.as_f64()) {
                None => {
                    errors.push(format!("marks[{i}]: Marks must be a number"));
                    None
                }
                Some(v) if v < MARK_MIN => {
                    errors.push(format!("marks[{i}]: Marks cannot be less than 0"));
                    None
                }
                Some(v) if v > MARK_MAX => {
                    errors.push(format!("marks[{i}]: Marks cannot be more than 100"));
                    None
                }
                Some(v) => Some(v),
            };

            if let (Some(subject_id), Some(mark)) = (subject_id, mark) {
                marks.push(MarkEntry { subject_id, mark });
            }
        }

        finish(errors, || MarkBatch {
            student_id: student_id.unwrap_or_default(),
            class: class.unwrap_or_default(),
            marks,
        })
    }
}
