#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use recordsd::api::{build_router, AppState};
use recordsd::db;

pub fn app() -> Router {
    let conn = db::open_db_in_memory().expect("open in-memory db");
    build_router(AppState::new(conn))
}

pub async fn call(
    router: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if body.is_some() {
        builder = builder.header("content-type", "application/json");
    }
    let body = match body {
        Some(v) => Body::from(serde_json::to_string(&v).expect("encode body")),
        None => Body::empty(),
    };
    let req = builder.body(body).expect("build request");
    let resp = router.clone().oneshot(req).await.expect("router response");
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    let json = if bytes.is_empty() {
        json!(null)
    } else {
        serde_json::from_slice(&bytes).unwrap_or(json!(null))
    };
    (status, json)
}

pub async fn call_ok(router: &Router, method: &str, uri: &str, body: Option<Value>) -> Value {
    let (status, json) = call(router, method, uri, body).await;
    assert!(
        status.is_success(),
        "{} {} failed with {}: {}",
        method,
        uri,
        status,
        json
    );
    assert_eq!(json["status"], "success");
    json
}

pub async fn create_student(
    router: &Router,
    first: &str,
    last: &str,
    class: &str,
    roll: i64,
) -> String {
    let res = call_ok(
        router,
        "POST",
        "/api/v1/student",
        Some(json!({ "firstName": first, "lastName": last, "class": class, "rollNo": roll })),
    )
    .await;
    res["data"]["id"].as_str().expect("student id").to_string()
}

pub async fn create_subject(router: &Router, name: &str, class: &str) -> String {
    let res = call_ok(
        router,
        "POST",
        "/api/v1/subject",
        Some(json!({ "name": name, "class": class })),
    )
    .await;
    res["data"]["id"].as_str().expect("subject id").to_string()
}
