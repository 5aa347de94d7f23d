use axum::response::{Html, IntoResponse};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use crate::api::types::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(index_page))
        .route("/health", get(health))
}

async fn index_page() -> impl IntoResponse {
    Html(include_str!("../../web/index.html"))
}

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
