use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::ConfigError;
use crate::overlay::{load_config_file, ConfigFile};
use crate::settings::{Settings, DEVELOPMENT, PRODUCTION};

/// Environment variable naming the active profile.
pub const PROFILE_ENV: &str = "ENV";
/// Profile used when neither an explicit name nor `ENV` is given.
pub const DEFAULT_PROFILE: &str = DEVELOPMENT;
/// Environment variable pointing at an optional TOML overlay.
pub const CONFIG_FILE_ENV: &str = "BRISA_CONFIG";
/// Alias kept for deployments that select `default`.
pub const DEFAULT_ALIAS: &str = "default";

/// Resolves the profile name: explicit argument, then `ENV`, then
/// `development`. Blank values count as unset.
pub fn resolve_profile_name(explicit: Option<&str>) -> String {
    explicit
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .or_else(|| {
            std::env::var(PROFILE_ENV)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        })
        .unwrap_or_else(|| DEFAULT_PROFILE.to_string())
}

/// Immutable map of profile name to settings, built once at startup.
#[derive(Debug, Clone)]
pub struct ConfigRegistry {
    profiles: BTreeMap<String, Arc<Settings>>,
    aliases: BTreeMap<String, String>,
    source: Option<PathBuf>,
}

impl ConfigRegistry {
    pub fn empty() -> Self {
        Self {
            profiles: BTreeMap::new(),
            aliases: BTreeMap::new(),
            source: None,
        }
    }

    /// `development`, `testing`, `production`, and `default` as an alias of
    /// `development`.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.insert(Settings::development());
        registry.insert(Settings::testing());
        registry.insert(Settings::production());
        registry.alias(DEFAULT_ALIAS, DEFAULT_PROFILE);
        registry
    }

    /// Built-in profiles plus the overlay named by `BRISA_CONFIG`, if any.
    pub fn from_env() -> Result<Self, ConfigError> {
        let registry = Self::builtin();
        match config_file_from_env()? {
            Some(path) => registry.with_file(&path),
            None => Ok(registry),
        }
    }

    pub fn with_file(self, path: &Path) -> Result<Self, ConfigError> {
        let file = load_config_file(path)?;
        let mut registry = self.with_overlay(file)?;
        info!(
            target: "brisa::config",
            path = %path.display(),
            profiles = registry.profiles.len(),
            "loaded profile overlay"
        );
        registry.source = Some(path.to_path_buf());
        Ok(registry)
    }

    /// Applies overlay profiles. A profile may extend another one defined in
    /// the same file regardless of declaration order. Alias names address
    /// the profile they point at.
    pub fn with_overlay(mut self, file: ConfigFile) -> Result<Self, ConfigError> {
        let mut pending = Vec::new();
        let mut entries: BTreeMap<String, String> = BTreeMap::new();
        for (entry, overlay) in file.profiles {
            let name = self.canonical_name(&entry);
            if let Some(first) = entries.insert(name.clone(), entry.clone()) {
                return Err(ConfigError::DuplicateProfile {
                    profile: name,
                    first,
                    second: entry,
                });
            }
            pending.push((name, overlay));
        }
        while !pending.is_empty() {
            let before = pending.len();
            let waiting: Vec<String> = pending.iter().map(|(name, _)| name.clone()).collect();
            let mut deferred = Vec::new();
            for (name, overlay) in pending {
                let base = match overlay.extends.as_deref().map(|b| self.canonical_name(b)) {
                    Some(base) => match self.lookup(&base) {
                        Some(settings) if base == name || !waiting.contains(&base) => settings,
                        _ => {
                            deferred.push((name, overlay));
                            continue;
                        }
                    },
                    None => match self.lookup(&name) {
                        Some(existing) => existing,
                        None => self.lookup(PRODUCTION).unwrap_or_else(|| {
                            Arc::new(Settings::production())
                        }),
                    },
                };
                let mut settings = (*base).clone();
                settings.name = name.clone();
                overlay.apply(&mut settings);
                debug!(target: "brisa::config", profile = %name, "applied profile overlay");
                self.profiles.insert(name, Arc::new(settings));
            }
            if deferred.len() == before {
                let (name, overlay) = deferred.swap_remove(0);
                return Err(ConfigError::UnknownBase {
                    profile: name,
                    base: overlay.extends.unwrap_or_default(),
                });
            }
            pending = deferred;
        }
        Ok(self)
    }

    pub fn insert(&mut self, settings: Settings) {
        self.profiles
            .insert(settings.name.clone(), Arc::new(settings));
    }

    pub fn alias(&mut self, alias: &str, target: &str) {
        self.aliases.insert(alias.to_string(), target.to_string());
    }

    /// Real profile name behind `name`; profiles shadow aliases.
    fn canonical_name(&self, name: &str) -> String {
        match self.aliases.get(name) {
            Some(target) if !self.profiles.contains_key(name) => target.clone(),
            _ => name.to_string(),
        }
    }

    fn lookup(&self, name: &str) -> Option<Arc<Settings>> {
        self.profiles.get(name).cloned().or_else(|| {
            self.aliases
                .get(name)
                .and_then(|target| self.profiles.get(target).cloned())
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Looks up and validates a profile. Unknown names never fall back to
    /// another profile.
    pub fn get(&self, name: &str) -> Result<Arc<Settings>, ConfigError> {
        let settings = self
            .lookup(name)
            .ok_or_else(|| ConfigError::UnknownProfile {
                name: name.to_string(),
                known: self.names().join(", "),
            })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Profile names followed by alias names, each listed once.
    pub fn names(&self) -> Vec<&str> {
        self.profiles
            .keys()
            .chain(
                self.aliases
                    .keys()
                    .filter(|alias| !self.profiles.contains_key(*alias)),
            )
            .map(String::as_str)
            .collect()
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }
}

impl Default for ConfigRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn config_file_from_env() -> Result<Option<PathBuf>, ConfigError> {
    let Some(raw) = std::env::var(CONFIG_FILE_ENV)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
    else {
        return Ok(None);
    };
    crate::resolve_config_path(&raw)
        .map(Some)
        .ok_or(ConfigError::NotFound {
            path: PathBuf::from(raw),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::parse_config_file;
    use serial_test::serial;

    fn overlay(content: &str) -> ConfigFile {
        parse_config_file(Path::new("test.toml"), content).expect("overlay parses")
    }

    #[test]
    fn builtin_profiles_resolve() {
        let registry = ConfigRegistry::builtin();
        for name in ["development", "testing", "production", "default"] {
            let settings = registry.get(name).expect("builtin profile");
            assert!(!settings.name.is_empty());
        }
        assert_eq!(registry.get("default").unwrap().name, "development");
    }

    #[test]
    fn unknown_profile_fails_instead_of_defaulting() {
        let registry = ConfigRegistry::builtin();
        let err = registry.get("staging").unwrap_err();
        match err {
            ConfigError::UnknownProfile { name, known } => {
                assert_eq!(name, "staging");
                assert!(known.contains("production"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    #[serial]
    fn explicit_name_wins_over_env() {
        std::env::set_var(PROFILE_ENV, "production");
        assert_eq!(resolve_profile_name(Some("testing")), "testing");
        assert_eq!(resolve_profile_name(None), "production");
        std::env::remove_var(PROFILE_ENV);
    }

    #[test]
    #[serial]
    fn missing_or_blank_env_uses_default() {
        std::env::remove_var(PROFILE_ENV);
        assert_eq!(resolve_profile_name(None), DEFAULT_PROFILE);
        std::env::set_var(PROFILE_ENV, "   ");
        assert_eq!(resolve_profile_name(None), DEFAULT_PROFILE);
        assert_eq!(resolve_profile_name(Some("")), DEFAULT_PROFILE);
        std::env::remove_var(PROFILE_ENV);
    }

    #[test]
    fn overlay_updates_existing_profile() {
        let registry = ConfigRegistry::builtin()
            .with_overlay(overlay(
                r#"
                [profiles.production.cors]
                allow_origins = ["https://brisa.example.edu"]
                "#,
            ))
            .expect("overlay applies");
        let prod = registry.get("production").expect("production");
        assert_eq!(prod.cors.allow_origins, vec!["https://brisa.example.edu"]);
        assert!(!prod.debug);
    }

    #[test]
    fn new_profiles_extend_in_any_order() {
        let registry = ConfigRegistry::builtin()
            .with_overlay(overlay(
                r#"
                [profiles.a-preview]
                extends = "z-staging"
                debug = true

                [profiles.z-staging]
                extends = "production"

                [profiles.z-staging.http]
                port = 9001
                "#,
            ))
            .expect("overlay applies");
        let preview = registry.get("a-preview").expect("preview profile");
        assert_eq!(preview.name, "a-preview");
        assert_eq!(preview.http.port, 9001);
        assert!(preview.debug);
        assert!(!preview.cors.any_origin());
    }

    #[test]
    fn new_profile_without_base_starts_from_production() {
        let registry = ConfigRegistry::builtin()
            .with_overlay(overlay(
                r#"
                [profiles.campus]
                debug = true
                "#,
            ))
            .expect("overlay applies");
        let campus = registry.get("campus").expect("campus profile");
        assert!(campus.http.hsts);
        assert!(!campus.cors.allow_permissive);
    }

    #[test]
    fn cyclic_or_missing_base_is_rejected() {
        let err = ConfigRegistry::builtin()
            .with_overlay(overlay(
                r#"
                [profiles.one]
                extends = "two"

                [profiles.two]
                extends = "one"
                "#,
            ))
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownBase { .. }));
    }

    #[test]
    fn overlay_on_alias_updates_its_target() {
        let registry = ConfigRegistry::builtin()
            .with_overlay(overlay(
                r#"
                [profiles.default.http]
                port = 8200
                "#,
            ))
            .expect("overlay applies");
        let dev = registry.get("development").expect("development");
        assert_eq!(dev.http.port, 8200);
        assert!(dev.debug);
        assert_eq!(registry.get("default").unwrap().name, "development");
        let names = registry.names();
        assert_eq!(names.iter().filter(|n| **n == "default").count(), 1);
        assert_eq!(names, ["development", "production", "testing", "default"]);
    }

    #[test]
    fn alias_as_base_follows_overlaid_target() {
        let registry = ConfigRegistry::builtin()
            .with_overlay(overlay(
                r#"
                [profiles.demo]
                extends = "default"

                [profiles.development.http]
                port = 8300
                "#,
            ))
            .expect("overlay applies");
        let demo = registry.get("demo").expect("demo");
        assert_eq!(demo.http.port, 8300);
        assert!(demo.debug);
    }

    #[test]
    fn alias_and_target_in_one_overlay_are_rejected() {
        let err = ConfigRegistry::builtin()
            .with_overlay(overlay(
                r#"
                [profiles.default]
                debug = false

                [profiles.development]
                debug = true
                "#,
            ))
            .unwrap_err();
        match err {
            ConfigError::DuplicateProfile {
                profile,
                first,
                second,
            } => {
                assert_eq!(profile, "development");
                assert_eq!((first.as_str(), second.as_str()), ("default", "development"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn invalid_profile_fails_on_selection_only() {
        let registry = ConfigRegistry::builtin()
            .with_overlay(overlay(
                r#"
                [profiles.production.cors]
                allow_origins = ["*"]
                "#,
            ))
            .expect("overlay applies");
        assert!(matches!(
            registry.get("production"),
            Err(ConfigError::PermissiveCors { .. })
        ));
        assert!(registry.get("development").is_ok());
    }

    #[test]
    #[serial]
    fn from_env_loads_overlay_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("brisa.toml");
        std::fs::write(
            &path,
            "[profiles.development.http]\nport = 8123\n",
        )
        .expect("write overlay");
        std::env::set_var(CONFIG_FILE_ENV, path.display().to_string());
        let registry = ConfigRegistry::from_env();
        std::env::remove_var(CONFIG_FILE_ENV);
        let registry = registry.expect("registry from env");
        assert_eq!(registry.get("development").unwrap().http.port, 8123);
        assert_eq!(registry.source(), Some(path.as_path()));
    }

    #[test]
    #[serial]
    fn from_env_reports_missing_file() {
        std::env::set_var(CONFIG_FILE_ENV, "/definitely/not/here/brisa.toml");
        let result = ConfigRegistry::from_env();
        std::env::remove_var(CONFIG_FILE_ENV);
        assert!(matches!(result, Err(ConfigError::NotFound { .. })));
    }
}
