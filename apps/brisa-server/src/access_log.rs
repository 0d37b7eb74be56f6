use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use axum::extract::{ConnectInfo, MatchedPath};
use axum::http::{header, Request};
use axum::middleware::Next;
use axum::response::Response;
use once_cell::sync::Lazy;

use crate::request_ctx::HEADER_REQUEST_ID;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Cfg {
    enabled: bool,
    sample_n: u64,
    ua: bool,
    referer: bool,
}

impl Cfg {
    fn from_env() -> Self {
        Self {
            enabled: flag("BRISA_ACCESS_LOG"),
            sample_n: std::env::var("BRISA_ACCESS_SAMPLE_N")
                .ok()
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(1)
                .max(1),
            ua: flag("BRISA_ACCESS_UA"),
            referer: flag("BRISA_ACCESS_REF"),
        }
    }
}

static CFG: Lazy<Cfg> = Lazy::new(Cfg::from_env);

static COUNTER: AtomicU64 = AtomicU64::new(0);

fn flag(name: &str) -> bool {
    std::env::var(name).ok().as_deref() == Some("1")
}

/// Keeps every `sample_n`-th request; `n` counts from 1.
fn sampled(n: u64, sample_n: u64) -> bool {
    sample_n <= 1 || n % sample_n == 0
}

/// One event per (sampled) request on the `http.access` target; the
/// telemetry crate routes that target to its own rolling file.
pub async fn access_log_mw(req: Request<axum::body::Body>, next: Next) -> Response {
    log_request(&CFG, &COUNTER, req, next).await
}

async fn log_request(
    cfg: &Cfg,
    counter: &AtomicU64,
    req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    if !cfg.enabled {
        return next.run(req).await;
    }
    let started = Instant::now();
    let method = req.method().clone();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());
    let remote = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|c| c.0.ip().to_string());
    // Owned copies only; the request must not be borrowed across the await.
    let (ua, referer) = {
        let headers = req.headers();
        let owned = |name: header::HeaderName| {
            headers
                .get(name)
                .and_then(|h| h.to_str().ok())
                .map(str::to_string)
        };
        let ua = if cfg.ua { owned(header::USER_AGENT) } else { None };
        let referer = if cfg.referer {
            owned(header::REFERER).map(|rf| rf.split('?').next().unwrap_or("").to_string())
        } else {
            None
        };
        (ua, referer)
    };

    let res = next.run(req).await;

    let n = counter.fetch_add(1, Ordering::Relaxed) + 1;
    if !sampled(n, cfg.sample_n) {
        return res;
    }
    let request_id = res
        .headers()
        .get(&HEADER_REQUEST_ID)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("-");
    tracing::info!(
        target: brisa_otel::ACCESS_TARGET,
        method = method.as_str(),
        path = %path,
        status = res.status().as_u16(),
        dur_ms = started.elapsed().as_millis() as u64,
        remote = remote.as_deref().unwrap_or("-"),
        request_id = %request_id,
        ua = ua.as_deref(),
        referer = referer.as_deref(),
        "request"
    );
    res
}
