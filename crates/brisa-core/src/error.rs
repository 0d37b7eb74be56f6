use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown configuration profile `{name}` (known profiles: {known})")]
    UnknownProfile { name: String, known: String },
    #[error("overlay entries `{first}` and `{second}` both configure profile `{profile}`")]
    DuplicateProfile {
        profile: String,
        first: String,
        second: String,
    },
    #[error("profile `{profile}` extends unknown profile `{base}`")]
    UnknownBase { profile: String, base: String },
    #[error(
        "profile `{profile}` allows any CORS origin; set cors.allow_permissive = true to opt in"
    )]
    PermissiveCors { profile: String },
    #[error("profile `{profile}`: `*` cannot be combined with other entries in cors.{field}")]
    MixedWildcard {
        profile: String,
        field: &'static str,
    },
    #[error("profile `{profile}`: invalid CORS origin `{origin}`")]
    InvalidOrigin { profile: String, origin: String },
    #[error("profile `{profile}`: invalid CORS {field} entry `{value}`")]
    InvalidCorsEntry {
        profile: String,
        field: &'static str,
        value: String,
    },
    #[error("profile `{profile}`: {reason}")]
    InvalidHttp { profile: String, reason: String },
    #[error("profile `{profile}`: invalid database url: {reason}")]
    InvalidDatabaseUrl { profile: String, reason: String },
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("config file {} does not match schema: {errors}", path.display())]
    Schema { path: PathBuf, errors: String },
    #[error("config file {} names no existing file", path.display())]
    NotFound { path: PathBuf },
}
