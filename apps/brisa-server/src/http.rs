use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use brisa_core::HttpSettings;

pub const BIND_ENV: &str = "BRISA_BIND";
pub const PORT_ENV: &str = "BRISA_PORT";

#[derive(Debug, thiserror::Error)]
pub enum HttpConfigError {
    #[error("invalid BRISA_PORT: {0}")]
    InvalidPort(String),
    #[error("invalid bind address: {0}")]
    InvalidBind(String),
}

/// Listen address for the server binary: the profile's `http` section,
/// overridden by `BRISA_BIND` / `BRISA_PORT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpConfig {
    pub addr: SocketAddr,
}

impl HttpConfig {
    pub fn from_settings(http: &HttpSettings) -> Result<Self, HttpConfigError> {
        let bind = std::env::var(BIND_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| http.bind.clone());
        let port = match std::env::var(PORT_ENV) {
            Ok(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| HttpConfigError::InvalidPort(raw))?,
            Err(_) => http.port,
        };
        let ip = parse_bind(&bind)?;
        Ok(Self {
            addr: SocketAddr::new(ip, port),
        })
    }
}

fn parse_bind(bind: &str) -> Result<IpAddr, HttpConfigError> {
    let trimmed = bind.trim();
    if trimmed.eq_ignore_ascii_case("localhost") {
        return Ok(IpAddr::V4(Ipv4Addr::LOCALHOST));
    }
    trimmed
        .trim_start_matches('[')
        .trim_end_matches(']')
        .parse()
        .map_err(|_| HttpConfigError::InvalidBind(bind.to_string()))
}
