use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Request};
use axum::middleware::Next;
use axum::response::Response;

const PERMISSIONS_POLICY: HeaderName = HeaderName::from_static("permissions-policy");
const HSTS_VALUE: &str = "max-age=31536000; includeSubDomains";

/// Baseline response headers. Headers already set by a handler win.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HeaderPolicy {
    pub hsts: bool,
}

impl HeaderPolicy {
    pub fn apply(&self, headers: &mut HeaderMap) {
        add_default(headers, header::X_CONTENT_TYPE_OPTIONS, "nosniff");
        add_default(headers, header::X_FRAME_OPTIONS, "DENY");
        add_default(headers, header::REFERRER_POLICY, "no-referrer");
        add_default(
            headers,
            PERMISSIONS_POLICY,
            "geolocation=(), microphone=(), camera=()",
        );
        if self.hsts {
            add_default(headers, header::STRICT_TRANSPORT_SECURITY, HSTS_VALUE);
        }
    }
}

fn add_default(headers: &mut HeaderMap, name: HeaderName, value: &'static str) {
    if !headers.contains_key(&name) {
        headers.insert(name, HeaderValue::from_static(value));
    }
}

pub async fn headers_mw(
    policy: HeaderPolicy,
    req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let mut res = next.run(req).await;
    policy.apply(res.headers_mut());
    res
}
