use axum::extract::{Path, State};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use tracing::info;

use crate::api::types::{created, ok, ok_with_message, ApiJson, ApiQuery, AppState, Reply};
use crate::error::ApiError;
use crate::model::{Student, StudentInput, StudentStatus};
use crate::store::students;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/student", get(list).post(create))
        .route(
            "/api/v1/student/{id}",
            get(get_one).put(update).delete(remove),
        )
}

#[derive(Debug, Default, Deserialize)]
pub struct StudentFilter {
    pub status: Option<String>,
}

impl StudentFilter {
    fn status(&self) -> Result<Option<StudentStatus>, ApiError> {
        match self.status.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) => StudentStatus::parse(s).map(Some).ok_or_else(|| {
                ApiError::Validation("Status must be one of: pending, done".to_string())
            }),
        }
    }
}

async fn list(
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<StudentFilter>,
) -> Reply<Vec<Student>> {
    let status = filter.status()?;
    let data = state.with_db(|conn| students::list(conn, status))?;
    Ok(ok(data))
}

async fn create(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<StudentInput>,
) -> Reply<Student> {
    let new = input.validate()?;
    let student = state.with_db(|conn| students::create(conn, &new))?;
    info!(
        student_id = %student.id,
        class = %student.class,
        roll_no = student.roll_no,
        "student created"
    );
    Ok(created("Student created successfully!", student))
}

async fn get_one(State(state): State<AppState>, Path(id): Path<String>) -> Reply<Student> {
    let student = state.with_db(|conn| students::get(conn, &id))?;
    Ok(ok(student))
}

async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<StudentInput>,
) -> Reply<Student> {
    let new = input.validate()?;
    let student = state.with_db(|conn| students::update(conn, &id, &new))?;
    info!(student_id = %student.id, "student updated");
    Ok(ok_with_message("Student updated successfully!", student))
}

async fn remove(State(state): State<AppState>, Path(id): Path<String>) -> Reply<Student> {
    let student = state.with_db(|conn| students::delete(conn, &id))?;
    info!(student_id = %student.id, "student deleted (soft delete)");
    Ok(ok_with_message("Student deleted successfully (soft delete)", student))
}
