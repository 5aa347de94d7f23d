use axum::http::{Method, Uri};
use axum::Router;

use super::handlers;
use super::types::AppState;
use crate::error::ApiError;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(handlers::core::routes())
        .merge(handlers::students::routes())
        .merge(handlers::subjects::routes())
        .merge(handlers::marks::routes())
        .method_not_allowed_fallback(unsupported_method)
        .fallback(unknown_route)
        .with_state(state)
}

async fn unknown_route(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("unknown route: {}", uri.path()))
}

async fn unsupported_method(method: Method, uri: Uri) -> ApiError {
    ApiError::MethodNotAllowed(format!("method {} not allowed on {}", method, uri.path()))
}
