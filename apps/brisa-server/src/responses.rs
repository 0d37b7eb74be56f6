use axum::{
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use crate::request_ctx::current_request_id;

const PROBLEM_JSON: &str = "application/problem+json";

/// RFC 7807 body; carries the request id when one is in scope.
pub fn problem(status: StatusCode, title: &str, detail: impl Into<String>) -> Response {
    let mut body = json!({
        "type": "about:blank",
        "title": title,
        "status": status.as_u16(),
        "detail": detail.into(),
    });
    if let (Value::Object(map), Some(id)) = (&mut body, current_request_id()) {
        map.insert("request_id".into(), Value::String(id));
    }
    (status, [(header::CONTENT_TYPE, PROBLEM_JSON)], Json(body)).into_response()
}

pub async fn not_found(uri: Uri) -> Response {
    problem(
        StatusCode::NOT_FOUND,
        "Not Found",
        format!("no route for {}", uri.path()),
    )
}
