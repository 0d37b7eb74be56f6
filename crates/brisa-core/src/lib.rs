//! Configuration profiles for the BRISA backend.
//!
//! A [`ConfigRegistry`] maps profile names to immutable [`Settings`]. It is
//! built once at startup (built-in profiles plus an optional TOML overlay)
//! and handed to the application factory by reference.

use std::path::{Path, PathBuf};

mod error;
mod overlay;
mod registry;
mod settings;

pub use error::ConfigError;
pub use overlay::{
    config_schema_json, load_config_file, parse_config_file, ConfigFile, CorsOverlay,
    DatabaseOverlay, DocsOverlay, HttpOverlay, ProfileOverlay,
};
pub use registry::{
    resolve_profile_name, ConfigRegistry, CONFIG_FILE_ENV, DEFAULT_ALIAS, DEFAULT_PROFILE,
    PROFILE_ENV,
};
pub use settings::{
    canonical_origin, CorsSettings, DatabaseSettings, DocsSettings, HttpSettings, Settings,
    DEVELOPMENT, PRODUCTION, TESTING, WILDCARD,
};

/// Directory a relative `BRISA_CONFIG` is looked up in before the working
/// directory.
pub const CONFIG_DIR_ENV: &str = "BRISA_CONFIG_DIR";

/// Locates the overlay file. Absolute paths are taken as they are; relative
/// ones are tried under `BRISA_CONFIG_DIR`, then the working directory.
pub fn resolve_config_path(rel: &str) -> Option<PathBuf> {
    let path = Path::new(rel);
    if path.is_absolute() {
        return path.is_file().then(|| path.to_path_buf());
    }
    let config_dir = std::env::var_os(CONFIG_DIR_ENV)
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from);
    config_dir
        .into_iter()
        .chain(std::env::current_dir().ok())
        .map(|base| base.join(path))
        .find(|candidate| candidate.is_file())
}
