use axum::extract::{Path, State};
use axum::routing::get;
use axum::Router;
use tracing::info;

use crate::api::types::{created, ok, ok_with_message, ApiJson, AppState, Reply};
use crate::model::{Subject, SubjectInput};
use crate::store::subjects;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/subject", get(list).post(create))
        .route(
            "/api/v1/subject/{id}",
            get(get_one).put(update).delete(remove),
        )
}

async fn list(State(state): State<AppState>) -> Reply<Vec<Subject>> {
    let data = state.with_db(subjects::list)?;
    Ok(ok_with_message("All subject fetched successfully!", data))
}

async fn create(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<SubjectInput>,
) -> Reply<Subject> {
    let new = input.validate()?;
    let subject = state.with_db(|conn| subjects::create(conn, &new))?;
    info!(
        subject_id = %subject.id,
        class = %subject.class,
        name = %subject.name,
        "subject created"
    );
    Ok(created("Subject created successfully!", subject))
}

async fn get_one(State(state): State<AppState>, Path(id): Path<String>) -> Reply<Subject> {
    let subject = state.with_db(|conn| subjects::get(conn, &id))?;
    Ok(ok(subject))
}

async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<SubjectInput>,
) -> Reply<Subject> {
    let new = input.validate()?;
    let subject = state.with_db(|conn| subjects::update(conn, &id, &new))?;
    info!(subject_id = %subject.id, "subject updated");
    Ok(ok_with_message("Subject updated successfully!", subject))
}

async fn remove(State(state): State<AppState>, Path(id): Path<String>) -> Reply<Subject> {
    let subject = state.with_db(|conn| subjects::delete(conn, &id))?;
    info!(subject_id = %subject.id, "subject deleted (soft delete)");
    Ok(ok_with_message("Subject deleted successfully (soft delete)", subject))
}
