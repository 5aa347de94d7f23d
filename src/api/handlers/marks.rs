use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tracing::info;

use crate::api::types::{created, ok, ApiJson, AppState, Reply};
use crate::calc::{self, ClassReport};
use crate::error::ApiError;
use crate::model::{MarkBatchInput, MarkRow};
use crate::store::marks::{self, BatchOutcome};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/mark", get(list).post(create))
        .route("/api/v1/mark/report", get(report))
        .route("/api/v1/mark/report.csv", get(report_csv))
}

async fn list(State(state): State<AppState>) -> Reply<Vec<MarkRow>> {
    let rows = state.with_db(marks::list_rows)?;
    Ok(ok(rows))
}

async fn create(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<MarkBatchInput>,
) -> Reply<BatchOutcome> {
    let batch = input.validate()?;
    let outcome = state.with_db(|conn| marks::record_batch(conn, &batch))?;
    info!(
        student_id = %batch.student_id,
        inserted = outcome.inserted,
        updated = outcome.updated,
        "marks recorded"
    );
    Ok(created("Marks saved successfully", outcome))
}

async fn report(State(state): State<AppState>) -> Reply<Vec<ClassReport>> {
    let rows = state.with_db(marks::list_rows)?;
    Ok(ok(calc::aggregate_marks(&rows)))
}

async fn report_csv(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let rows = state.with_db(marks::list_rows)?;
    let csv = calc::reports_to_csv(&calc::aggregate_marks(&rows));
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"mark-report.csv\"",
            ),
        ],
        csv,
    ))
}
