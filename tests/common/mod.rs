//! A stand-in for the task backend, served on an ephemeral local port

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    extract::{Multipart, Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Value, json};
use tokio::net::TcpListener;

pub const SESSION: &str = "session=abc123";
pub const FAILING_DAY: &str = "2026-03-06";

/// `Cookie` headers seen by the counts endpoint, in arrival order
pub type CookieLog = Arc<Mutex<Vec<Option<String>>>>;

fn task(id: i64, department: &str, content: &str, date: &str) -> Value {
    json!({
        "id": id,
        "stt": id,
        "department": department,
        "content": content,
        "warning_date": date
    })
}

fn march_fifth() -> Vec<Value> {
    vec![
        task(1, "Ops", "Rotate keys", "2026-03-05"),
        task(2, "Finance", "Close books", "2026-03-05"),
    ]
}

fn authorised(headers: &HeaderMap) -> bool {
    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains(SESSION))
}

fn unauthorised() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "success": false, "error": "Not authenticated" })),
    )
        .into_response()
}

async fn all_tasks() -> Json<Value> {
    let mut tasks = march_fifth();
    tasks.push(task(3, "Ops", "Patch servers", "2026-03-20"));
    Json(json!({ "tasks": tasks }))
}

async fn departments() -> Json<Value> {
    Json(json!({ "departments": ["Finance", "Ops"] }))
}

async fn counts(State(log): State<CookieLog>, headers: HeaderMap) -> Json<Value> {
    let cookie = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    log.lock().unwrap().push(cookie);
    Json(json!({ "data": { "2026-03-05": 2, "2026-03-20": 1 } }))
}

async fn by_date() -> Json<Value> {
    Json(json!({
        "data": {
            "2026-03-05": march_fifth(),
            "2026-03-20": [task(3, "Ops", "Patch servers", "2026-03-20")],
        }
    }))
}

async fn upcoming() -> Json<Value> {
    Json(json!({
        "tasks": [
            task(1, "Ops", "Rotate keys", "2099-03-05"),
            {
                "id": 4,
                "department": null,
                "content": "Unowned",
                "warning_date": "2099-04-01T00:00:00"
            },
        ]
    }))
}

async fn for_date(Path(date): Path<String>) -> Response {
    match date.as_str() {
        "2026-03-05" => Json(json!({ "tasks": march_fifth() })).into_response(),
        FAILING_DAY => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "success": false, "error": "database locked" })),
        )
            .into_response(),
        _ => Json(json!({ "tasks": [] })).into_response(),
    }
}

async fn stats() -> Json<Value> {
    Json(json!({
        "success": true,
        "stats": {
            "total_tasks": 3,
            "total_departments": 2,
            "date_range": { "min_date": "2026-03-05", "max_date": "2026-03-20" }
        }
    }))
}

async fn me(headers: HeaderMap) -> Response {
    if !authorised(&headers) {
        return unauthorised();
    }
    Json(json!({ "success": true, "user": admin() })).into_response()
}

fn admin() -> Value {
    json!({ "id": 1, "username": "admin", "role": "admin" })
}

async fn login(Json(body): Json<Value>) -> Response {
    if body["username"] == "admin" && body["password"] == "secret" {
        (
            [(header::SET_COOKIE, format!("{}; HttpOnly; Path=/", SESSION))],
            Json(json!({ "success": true, "user": admin() })),
        )
            .into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "success": false, "error": "Invalid credentials" })),
        )
            .into_response()
    }
}

async fn logout() -> Json<Value> {
    Json(json!({ "success": true, "message": "Logged out" }))
}

async fn change_password(headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if !authorised(&headers) {
        return unauthorised();
    }
    if body["current_password"] != "secret" {
        return Json(json!({ "success": false, "error": "Current password is incorrect" }))
            .into_response();
    }
    Json(json!({ "success": true, "message": "Password changed" })).into_response()
}

async fn uploaded_name(mut multipart: Multipart) -> Option<String> {
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() == Some("file") {
            return field.file_name().map(str::to_string);
        }
    }
    None
}

async fn preview(headers: HeaderMap, multipart: Multipart) -> Response {
    if !authorised(&headers) {
        return unauthorised();
    }
    let name = uploaded_name(multipart).await.unwrap_or_default();
    Json(json!({
        "success": true,
        "preview": {
            "total_tasks": 2,
            "departments": ["Ops"],
            "total_departments": 1,
            "date_range": { "min": "2026-05-01", "max": "2026-05-02" },
            "sample_tasks": [task(1, "Ops", &format!("From {}", name), "2026-05-01")]
        },
        "stats": { "total_rows": 2, "valid_rows": 2 },
        "errors": []
    }))
    .into_response()
}

async fn import(headers: HeaderMap, multipart: Multipart) -> Response {
    if !authorised(&headers) {
        return unauthorised();
    }
    let name = uploaded_name(multipart).await.unwrap_or_default();
    let errors: Vec<String> = (1..=12).map(|i| format!("Row {}: missing date", i)).collect();
    Json(json!({
        "success": true,
        "message": format!("Imported {}", name),
        "stats": {
            "total_rows": 20,
            "valid_rows": 8,
            "invalid_rows": 12,
            "new_records": 5,
            "duplicates_skipped": 3
        },
        "errors": errors
    }))
    .into_response()
}

pub fn backend(log: CookieLog) -> Router {
    Router::new()
        .route("/api/tasks", get(all_tasks))
        .route("/api/departments", get(departments))
        .route("/api/tasks/counts", get(counts))
        .route("/api/tasks/by-date", get(by_date))
        .route("/api/tasks/upcoming", get(upcoming))
        .route("/api/tasks/date/:date", get(for_date))
        .route("/api/stats", get(stats))
        .route("/api/admin/me", get(me))
        .route("/api/admin/login", post(login))
        .route("/api/admin/logout", post(logout))
        .route("/api/admin/change-password", post(change_password))
        .route("/api/admin/preview", post(preview))
        .route("/api/admin/import", post(import))
        .with_state(log)
}

/// Serve the fake backend and return its base URL
pub async fn spawn_backend() -> String {
    spawn_logged_backend().await.0
}

/// Like [`spawn_backend`], also returning the cookies the counts endpoint saw
pub async fn spawn_logged_backend() -> (String, CookieLog) {
    let _ = env_logger::builder().is_test(true).try_init();

    let log = CookieLog::default();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = backend(log.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), log)
}

/// A base URL nothing listens on
pub async fn unreachable_backend() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}
