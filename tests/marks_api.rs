mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use common::{app, call, call_ok, create_student, create_subject};
use serde_json::json;
use tower::ServiceExt;

#[tokio::test]
async fn batch_inserts_one_mark_per_pair_and_marks_student_done() {
    let router = app();
    let asha = create_student(&router, "Asha", "Rao", "5th", 1).await;
    let math = create_subject(&router, "math", "5th").await;
    let sci = create_subject(&router, "sci", "5th").await;

    let (status, res) = call(
        &router,
        "POST",
        "/api/v1/mark",
        Some(json!({
            "studentId": asha,
            "class": "5th",
            "marks": [
                { "subjectId": math, "mark": 80 },
                { "subjectId": sci, "mark": 90 }
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(res["message"], "Marks saved successfully");
    assert_eq!(res["data"]["inserted"], 2);
    assert_eq!(res["data"]["updated"], 0);

    let marks = call_ok(&router, "GET", "/api/v1/mark", None).await;
    let rows = marks["data"].as_array().expect("data array");
    assert_eq!(rows.len(), 2);
    for row in rows {
        assert_eq!(row["studentName"], "Asha Rao");
        assert_eq!(row["studentClass"], "5th");
        assert_eq!(row["rollNo"], 1);
    }

    let student = call_ok(&router, "GET", &format!("/api/v1/student/{asha}"), None).await;
    assert_eq!(student["data"]["status"], "done");

    let pending = call_ok(&router, "GET", "/api/v1/student?status=pending", None).await;
    assert_eq!(pending["data"].as_array().expect("data array").len(), 0);
}

#[tokio::test]
async fn failed_batch_writes_nothing() {
    let router = app();
    let asha = create_student(&router, "Asha", "Rao", "5th", 1).await;
    let math = create_subject(&router, "math", "5th").await;

    let (status, body) = call(
        &router,
        "POST",
        "/api/v1/mark",
        Some(json!({
            "studentId": asha,
            "class": "5th",
            "marks": [
                { "subjectId": math, "mark": 80 },
                { "subjectId": "no-such-subject", "mark": 90 }
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Subject not found: no-such-subject");

    let marks = call_ok(&router, "GET", "/api/v1/mark", None).await;
    assert_eq!(marks["data"].as_array().expect("data array").len(), 0);
    let student = call_ok(&router, "GET", &format!("/api/v1/student/{asha}"), None).await;
    assert_eq!(student["data"]["status"], "pending");
}

#[tokio::test]
async fn out_of_range_mark_is_rejected() {
    let router = app();
    let asha = create_student(&router, "Asha", "Rao", "5th", 1).await;
    let math = create_subject(&router, "math", "5th").await;

    let (status, body) = call(
        &router,
        "POST",
        "/api/v1/mark",
        Some(json!({
            "studentId": asha,
            "class": "5th",
            "marks": [{ "subjectId": math, "mark": 120 }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "marks[0]: Marks cannot be more than 100");
}

#[tokio::test]
async fn unknown_student_is_404_and_class_must_match() {
    let router = app();
    let math = create_subject(&router, "math", "5th").await;
    let batch = |student: &str, class: &str| {
        json!({
            "studentId": student,
            "class": class,
            "marks": [{ "subjectId": math, "mark": 50 }]
        })
    };

    let (status, body) = call(&router, "POST", "/api/v1/mark", Some(batch("ghost", "5th"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Student not found");

    let asha = create_student(&router, "Asha", "Rao", "5th", 1).await;
    let (status, _) = call(&router, "POST", "/api/v1/mark", Some(batch(&asha, "6th"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    call_ok(&router, "POST", "/api/v1/mark", Some(batch(&asha, "5TH"))).await;
}

#[tokio::test]
async fn resubmission_overwrites_existing_mark() {
    let router = app();
    let asha = create_student(&router, "Asha", "Rao", "5th", 1).await;
    let math = create_subject(&router, "math", "5th").await;

    for mark in [40, 65] {
        call_ok(
            &router,
            "POST",
            "/api/v1/mark",
            Some(json!({
                "studentId": asha,
                "class": "5th",
                "marks": [{ "subjectId": math, "mark": mark }]
            })),
        )
        .await;
    }

    let marks = call_ok(&router, "GET", "/api/v1/mark", None).await;
    let rows = marks["data"].as_array().expect("data array");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["mark"], 65.0);
}

#[tokio::test]
async fn report_groups_by_class_and_averages() {
    let router = app();
    let a = create_student(&router, "A", "One", "5th", 1).await;
    let b = create_student(&router, "B", "Two", "5th", 2).await;
    // Class with students and subjects but no marks.
    create_student(&router, "C", "Three", "6th", 1).await;
    create_subject(&router, "art", "6th").await;

    let math = create_subject(&router, "math", "5th").await;
    let sci = create_subject(&router, "sci", "5th").await;

    call_ok(
        &router,
        "POST",
        "/api/v1/mark",
        Some(json!({
            "studentId": a,
            "class": "5th",
            "marks": [
                { "subjectId": math, "mark": 80 },
                { "subjectId": sci, "mark": 90 }
            ]
        })),
    )
    .await;
    call_ok(
        &router,
        "POST",
        "/api/v1/mark",
        Some(json!({
            "studentId": b,
            "class": "5th",
            "marks": [{ "subjectId": math, "mark": 70 }]
        })),
    )
    .await;

    let res = call_ok(&router, "GET", "/api/v1/mark/report", None).await;
    let classes = res["data"].as_array().expect("data array");
    assert_eq!(classes.len(), 1, "6th has no marks and must not appear");
    let report = &classes[0];
    assert_eq!(report["class"], "5th");

    let rows = report["rows"].as_array().expect("rows");
    let row_a = rows
        .iter()
        .find(|r| r["studentName"] == "A One")
        .expect("row for A");
    assert_eq!(row_a["marks"]["math"], 80.0);
    assert_eq!(row_a["marks"]["sci"], 90.0);
    assert_eq!(row_a["average"], "85.00");

    let row_b = rows
        .iter()
        .find(|r| r["studentName"] == "B Two")
        .expect("row for B");
    assert_eq!(row_b["marks"]["sci"], "-");
    assert_eq!(row_b["average"], "70.00");
}

#[tokio::test]
async fn report_csv_is_served_as_text() {
    let router = app();
    let a = create_student(&router, "A", "One", "5th", 1).await;
    let math = create_subject(&router, "math", "5th").await;
    call_ok(
        &router,
        "POST",
        "/api/v1/mark",
        Some(json!({
            "studentId": a,
            "class": "5th",
            "marks": [{ "subjectId": math, "mark": 75 }]
        })),
    )
    .await;

    let req = Request::builder()
        .uri("/api/v1/mark/report.csv")
        .body(Body::empty())
        .expect("request");
    let resp = router.clone().oneshot(req).await.expect("response");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()[header::CONTENT_TYPE],
        "text/csv; charset=utf-8"
    );
    let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024)
        .await
        .expect("body");
    let text = String::from_utf8(bytes.to_vec()).expect("utf8");
    assert_eq!(
        text,
        "class,student_name,roll_no,math,average\n5th,A One,1,75,75.00\n"
    );
}

#[tokio::test]
async fn deleting_referenced_records_keeps_marks() {
    let router = app();
    let a = create_student(&router, "A", "One", "5th", 1).await;
    let math = create_subject(&router, "math", "5th").await;
    call_ok(
        &router,
        "POST",
        "/api/v1/mark",
        Some(json!({
            "studentId": a,
            "class": "5th",
            "marks": [{ "subjectId": math, "mark": 60 }]
        })),
    )
    .await;

    call_ok(&router, "DELETE", &format!("/api/v1/subject/{math}"), None).await;
    call_ok(&router, "DELETE", &format!("/api/v1/student/{a}"), None).await;

    let marks = call_ok(&router, "GET", "/api/v1/mark", None).await;
    let rows = marks["data"].as_array().expect("data array");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["studentId"], a.as_str());
    assert_eq!(rows[0]["subjectId"], math.as_str());
    assert_eq!(rows[0]["subjectName"], "math");

    // Deleted records cannot take new marks.
    let (status, _) = call(
        &router,
        "POST",
        "/api/v1/mark",
        Some(json!({
            "studentId": a,
            "class": "5th",
            "marks": [{ "subjectId": math, "mark": 70 }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn report_prefers_mark_for_recreated_subject() {
    let router = app();
    let a = create_student(&router, "A", "One", "5th", 1).await;
    let batch = |subject: &str, mark: i64| {
        json!({
            "studentId": a,
            "class": "5th",
            "marks": [{ "subjectId": subject, "mark": mark }]
        })
    };

    let old_math = create_subject(&router, "math", "5th").await;
    call_ok(&router, "POST", "/api/v1/mark", Some(batch(&old_math, 10))).await;
    call_ok(&router, "DELETE", &format!("/api/v1/subject/{old_math}"), None).await;

    let new_math = create_subject(&router, "math", "5th").await;
    assert_ne!(new_math, old_math);
    call_ok(&router, "POST", "/api/v1/mark", Some(batch(&new_math, 90))).await;

    let marks = call_ok(&router, "GET", "/api/v1/mark", None).await;
    assert_eq!(marks["data"].as_array().expect("data array").len(), 2);

    let res = call_ok(&router, "GET", "/api/v1/mark/report", None).await;
    let row = &res["data"][0]["rows"][0];
    assert_eq!(res["data"][0]["subjects"], json!(["math"]));
    assert_eq!(row["marks"]["math"], 90.0);
    assert_eq!(row["average"], "90.00");
}
