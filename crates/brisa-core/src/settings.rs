use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Marker accepted in CORS lists meaning "any value".
pub const WILDCARD: &str = "*";

pub const DEVELOPMENT: &str = "development";
pub const TESTING: &str = "testing";
pub const PRODUCTION: &str = "production";

/// Cross-origin policy for one profile.
///
/// `["*"]` in any of the lists means "everything". Wildcard origins are only
/// accepted when `allow_permissive` is set; the built-in development and
/// testing profiles set it, production does not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CorsSettings {
    pub allow_origins: Vec<String>,
    pub allow_methods: Vec<String>,
    pub allow_headers: Vec<String>,
    pub allow_credentials: bool,
    pub allow_permissive: bool,
    #[serde(default)]
    pub max_age_secs: Option<u64>,
}

impl CorsSettings {
    pub fn permissive() -> Self {
        Self {
            allow_origins: vec![WILDCARD.into()],
            allow_methods: vec![WILDCARD.into()],
            allow_headers: vec![WILDCARD.into()],
            allow_credentials: true,
            allow_permissive: true,
            max_age_secs: None,
        }
    }

    /// Same-origin only until origins are listed explicitly.
    pub fn locked_down() -> Self {
        Self {
            allow_origins: Vec::new(),
            allow_methods: vec![WILDCARD.into()],
            allow_headers: vec![WILDCARD.into()],
            allow_credentials: true,
            allow_permissive: false,
            max_age_secs: Some(600),
        }
    }

    pub fn any_origin(&self) -> bool {
        is_wildcard(&self.allow_origins)
    }

    pub fn any_method(&self) -> bool {
        is_wildcard(&self.allow_methods)
    }

    pub fn any_header(&self) -> bool {
        is_wildcard(&self.allow_headers)
    }
}

fn is_wildcard(list: &[String]) -> bool {
    list.iter().any(|v| v.trim() == WILDCARD)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct HttpSettings {
    pub bind: String,
    pub port: u16,
    /// In-flight request cap shared by every route of the app.
    pub concurrency_limit: usize,
    /// Emit `strict-transport-security` on every response.
    #[serde(default)]
    pub hsts: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DocsSettings {
    pub enabled: bool,
}

/// Connection parameters handed to database extensions. The core never
/// opens a connection itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DatabaseSettings {
    #[serde(default)]
    pub url: Option<String>,
    pub pool_size: u32,
}

/// Settings of one named profile. Immutable once the registry is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Settings {
    pub name: String,
    pub debug: bool,
    pub cors: CorsSettings,
    pub http: HttpSettings,
    pub docs: DocsSettings,
    pub database: DatabaseSettings,
}

impl Settings {
    pub fn development() -> Self {
        Self {
            name: DEVELOPMENT.into(),
            debug: true,
            cors: CorsSettings::permissive(),
            http: HttpSettings {
                bind: "127.0.0.1".into(),
                port: 8000,
                concurrency_limit: 1024,
                hsts: false,
            },
            docs: DocsSettings { enabled: true },
            database: DatabaseSettings {
                url: None,
                pool_size: 5,
            },
        }
    }

    pub fn testing() -> Self {
        Self {
            name: TESTING.into(),
            ..Self::development()
        }
    }

    pub fn production() -> Self {
        Self {
            name: PRODUCTION.into(),
            debug: false,
            cors: CorsSettings::locked_down(),
            http: HttpSettings {
                bind: "0.0.0.0".into(),
                port: 8000,
                concurrency_limit: 1024,
                hsts: true,
            },
            docs: DocsSettings { enabled: true },
            database: DatabaseSettings {
                url: None,
                pool_size: 20,
            },
        }
    }

    /// Checks the invariants the application factory relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let cors = &self.cors;
        for (field, list) in [
            ("allow_origins", &cors.allow_origins),
            ("allow_methods", &cors.allow_methods),
            ("allow_headers", &cors.allow_headers),
        ] {
            if is_wildcard(list) && list.len() > 1 {
                return Err(ConfigError::MixedWildcard {
                    profile: self.name.clone(),
                    field,
                });
            }
        }
        if cors.any_origin() && !cors.allow_permissive {
            return Err(ConfigError::PermissiveCors {
                profile: self.name.clone(),
            });
        }
        if !cors.any_origin() {
            for origin in &cors.allow_origins {
                validate_origin(&self.name, origin)?;
            }
        }
        if self.http.concurrency_limit == 0 {
            return Err(ConfigError::InvalidHttp {
                profile: self.name.clone(),
                reason: "concurrency_limit must be greater than zero".into(),
            });
        }
        if self.http.bind.trim().is_empty() {
            return Err(ConfigError::InvalidHttp {
                profile: self.name.clone(),
                reason: "bind must not be empty".into(),
            });
        }
        if let Some(raw) = &self.database.url {
            url::Url::parse(raw).map_err(|err| ConfigError::InvalidDatabaseUrl {
                profile: self.name.clone(),
                reason: err.to_string(),
            })?;
        }
        Ok(())
    }
}

fn validate_origin(profile: &str, origin: &str) -> Result<(), ConfigError> {
    canonical_origin(origin)
        .map(|_| ())
        .ok_or_else(|| ConfigError::InvalidOrigin {
            profile: profile.to_string(),
            origin: origin.to_string(),
        })
}

/// Serializes `origin` the way a browser sends it in the `Origin` header:
/// lowercase scheme and host, default port dropped. `None` unless the input
/// is a bare `http(s)://host[:port]`.
pub fn canonical_origin(origin: &str) -> Option<String> {
    let origin = origin.trim();
    let parsed = url::Url::parse(origin).ok()?;
    let bare = matches!(parsed.scheme(), "http" | "https")
        && parsed.host_str().is_some()
        && parsed.username().is_empty()
        && parsed.password().is_none()
        && parsed.path() == "/"
        && !origin.ends_with('/')
        && parsed.query().is_none()
        && parsed.fragment().is_none();
    bare.then(|| parsed.origin().ascii_serialization())
}
