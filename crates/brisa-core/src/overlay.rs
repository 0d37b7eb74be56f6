use std::collections::BTreeMap;
use std::path::Path;

use jsonschema::{validator_for, Validator};
use once_cell::sync::Lazy;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::settings::Settings;

/// On-disk profile overrides (TOML).
///
/// ```toml
/// [profiles.production.cors]
/// allow_origins = ["https://brisa.example.edu"]
///
/// [profiles.staging]
/// extends = "production"
/// debug = true
/// ```
#[derive(Debug, Default, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub profiles: BTreeMap<String, ProfileOverlay>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ProfileOverlay {
    /// Profile to start from. Existing profiles default to themselves, new
    /// ones to `production`.
    #[serde(default)]
    pub extends: Option<String>,
    #[serde(default)]
    pub debug: Option<bool>,
    #[serde(default)]
    pub cors: Option<CorsOverlay>,
    #[serde(default)]
    pub http: Option<HttpOverlay>,
    #[serde(default)]
    pub docs: Option<DocsOverlay>,
    #[serde(default)]
    pub database: Option<DatabaseOverlay>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct CorsOverlay {
    #[serde(default)]
    pub allow_origins: Option<Vec<String>>,
    #[serde(default)]
    pub allow_methods: Option<Vec<String>>,
    #[serde(default)]
    pub allow_headers: Option<Vec<String>>,
    #[serde(default)]
    pub allow_credentials: Option<bool>,
    #[serde(default)]
    pub allow_permissive: Option<bool>,
    #[serde(default)]
    pub max_age_secs: Option<u64>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct HttpOverlay {
    #[serde(default)]
    pub bind: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub concurrency_limit: Option<usize>,
    #[serde(default)]
    pub hsts: Option<bool>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct DocsOverlay {
    #[serde(default)]
    pub enabled: Option<bool>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct DatabaseOverlay {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub pool_size: Option<u32>,
}

impl ProfileOverlay {
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(debug) = self.debug {
            settings.debug = debug;
        }
        if let Some(cors) = &self.cors {
            let target = &mut settings.cors;
            if let Some(v) = &cors.allow_origins {
                target.allow_origins = v.clone();
            }
            if let Some(v) = &cors.allow_methods {
                target.allow_methods = v.clone();
            }
            if let Some(v) = &cors.allow_headers {
                target.allow_headers = v.clone();
            }
            if let Some(v) = cors.allow_credentials {
                target.allow_credentials = v;
            }
            if let Some(v) = cors.allow_permissive {
                target.allow_permissive = v;
            }
            if cors.max_age_secs.is_some() {
                target.max_age_secs = cors.max_age_secs;
            }
        }
        if let Some(http) = &self.http {
            if let Some(v) = &http.bind {
                settings.http.bind = v.clone();
            }
            if let Some(v) = http.port {
                settings.http.port = v;
            }
            if let Some(v) = http.concurrency_limit {
                settings.http.concurrency_limit = v;
            }
            if let Some(v) = http.hsts {
                settings.http.hsts = v;
            }
        }
        if let Some(enabled) = self.docs.as_ref().and_then(|d| d.enabled) {
            settings.docs.enabled = enabled;
        }
        if let Some(db) = &self.database {
            if db.url.is_some() {
                settings.database.url = db.url.clone();
            }
            if let Some(v) = db.pool_size {
                settings.database.pool_size = v;
            }
        }
    }
}

static CONFIG_SCHEMA: Lazy<Validator> = Lazy::new(|| {
    let schema_value = config_schema_json();
    validator_for(&schema_value).expect("valid schema")
});

/// Returns the JSON schema describing the overlay file.
///
/// # Panics
///
/// Panics if schema generation fails; this indicates a programming error.
pub fn config_schema_json() -> serde_json::Value {
    let schema = schemars::schema_for!(ConfigFile);
    serde_json::to_value(&schema).expect("schema json")
}

pub fn load_config_file(path: &Path) -> Result<ConfigFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config_file(path, &content)
}

/// Parses and schema-checks overlay content; `path` is only used in errors.
pub fn parse_config_file(path: &Path, content: &str) -> Result<ConfigFile, ConfigError> {
    let parse_err = |source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    };
    let raw: toml::Value = toml::from_str(content).map_err(parse_err)?;
    let json_value = serde_json::to_value(&raw).unwrap_or(serde_json::Value::Null);
    let validation_errors: Vec<_> = CONFIG_SCHEMA
        .iter_errors(&json_value)
        .map(|e| e.to_string())
        .collect();
    if !validation_errors.is_empty() {
        return Err(ConfigError::Schema {
            path: path.to_path_buf(),
            errors: validation_errors.join(", "),
        });
    }
    toml::from_str(content).map_err(parse_err)
}
