use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, Request};
use axum::middleware::Next;
use axum::response::Response;
use tokio::task_local;
use tracing::Span;
use uuid::Uuid;

pub const HEADER_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");
const MAX_ID_LEN: usize = 128;

task_local! {
    static REQUEST_ID: RequestId;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestId(String);

impl RequestId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Accepts the caller's `x-request-id` (sanitised) or mints one, exposes it
/// to handlers through [`current_request_id`], and echoes it on the response.
pub async fn request_id_mw(mut req: Request<Body>, next: Next) -> Response {
    let id = req
        .headers()
        .get(&HEADER_REQUEST_ID)
        .and_then(|value| value.to_str().ok())
        .and_then(normalize_id)
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    if let Ok(value) = HeaderValue::from_str(&id) {
        req.headers_mut().insert(HEADER_REQUEST_ID, value);
    }
    let id = RequestId(id);
    req.extensions_mut().insert(id.clone());

    REQUEST_ID
        .scope(id.clone(), async move {
            let mut res = next.run(req).await;
            if !res.headers().contains_key(&HEADER_REQUEST_ID) {
                if let Ok(value) = HeaderValue::from_str(id.as_str()) {
                    res.headers_mut().insert(HEADER_REQUEST_ID, value);
                }
            }
            res
        })
        .await
}

pub fn current_request_id() -> Option<String> {
    REQUEST_ID.try_with(|id| id.0.clone()).ok()
}

/// Span for `TraceLayer`, carrying the request id assigned further out.
pub fn make_span(req: &Request<Body>) -> Span {
    let request_id = req
        .headers()
        .get(&HEADER_REQUEST_ID)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("-");
    tracing::info_span!(
        "http",
        method = %req.method(),
        uri = %req.uri().path(),
        request_id = %request_id,
    )
}

fn normalize_id(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let out: String = trimmed
        .chars()
        .filter(|ch| !ch.is_control())
        .take(MAX_ID_LEN)
        .collect();
    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::get, Router};
    use tower::ServiceExt;

    #[test]
    fn normalize_id_trims_controls_and_limits_length() {
        assert_eq!(normalize_id("  abc  "), Some("abc".into()));
        assert!(normalize_id("   ").is_none());
        assert_eq!(normalize_id("a\u{0007}b\u{007f}c"), Some("abc".into()));
        let long = "x".repeat(MAX_ID_LEN + 24);
        assert_eq!(normalize_id(&long).unwrap().len(), MAX_ID_LEN);
    }

    #[tokio::test]
    async fn provided_id_is_visible_and_echoed() {
        let app = Router::new()
            .route(
                "/",
                get(|| async move {
                    assert_eq!(current_request_id().as_deref(), Some("req-xyz"));
                    "ok"
                }),
            )
            .layer(axum::middleware::from_fn(request_id_mw));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header("x-request-id", "req-xyz")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("response");
        assert_eq!(response.headers()["x-request-id"], "req-xyz");
    }

    #[tokio::test]
    async fn missing_id_is_generated() {
        let app = Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(axum::middleware::from_fn(request_id_mw));
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .expect("response");
        let id = response.headers()["x-request-id"].to_str().unwrap();
        assert!(Uuid::parse_str(id).is_ok());
    }
}
