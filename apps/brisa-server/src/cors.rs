//! Cross-origin policy derived from the active profile.

use std::time::Duration;

use axum::http::{HeaderName, HeaderValue, Method};
use brisa_core::{canonical_origin, ConfigError, Settings};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule<T> {
    Any,
    List(Vec<T>),
}

impl<T: PartialEq> Rule<T> {
    pub fn allows(&self, value: &T) -> bool {
        match self {
            Rule::Any => true,
            Rule::List(items) => items.contains(value),
        }
    }

    pub fn is_any(&self) -> bool {
        matches!(self, Rule::Any)
    }
}

/// Parsed CORS settings, ready to become a [`CorsLayer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsPolicy {
    origins: Rule<HeaderValue>,
    methods: Rule<Method>,
    headers: Rule<HeaderName>,
    credentials: bool,
    max_age: Option<Duration>,
}

impl CorsPolicy {
    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        let cors = &settings.cors;
        let profile = settings.name.as_str();

        let origins = if cors.any_origin() {
            if !cors.allow_permissive {
                return Err(ConfigError::PermissiveCors {
                    profile: profile.to_string(),
                });
            }
            Rule::Any
        } else {
            Rule::List(
                cors.allow_origins
                    .iter()
                    .map(|origin| {
                        canonical_origin(origin)
                            .and_then(|canonical| HeaderValue::from_str(&canonical).ok())
                            .ok_or_else(|| ConfigError::InvalidOrigin {
                                profile: profile.to_string(),
                                origin: origin.clone(),
                            })
                    })
                    .collect::<Result<_, _>>()?,
            )
        };
        let methods = if cors.any_method() {
            Rule::Any
        } else {
            Rule::List(parse_entries(profile, "allow_methods", &cors.allow_methods, |raw| {
                Method::from_bytes(raw.to_ascii_uppercase().as_bytes()).ok()
            })?)
        };
        let headers = if cors.any_header() {
            Rule::Any
        } else {
            Rule::List(parse_entries(profile, "allow_headers", &cors.allow_headers, |raw| {
                HeaderName::from_bytes(raw.as_bytes()).ok()
            })?)
        };

        Ok(Self {
            origins,
            methods,
            headers,
            credentials: cors.allow_credentials,
            max_age: cors.max_age_secs.map(Duration::from_secs),
        })
    }

    pub fn allows_any_origin(&self) -> bool {
        self.origins.is_any()
    }

    pub fn allows_any_method(&self) -> bool {
        self.methods.is_any()
    }

    pub fn allows_any_header(&self) -> bool {
        self.headers.is_any()
    }

    pub fn allows_credentials(&self) -> bool {
        self.credentials
    }

    pub fn allows_origin(&self, origin: &str) -> bool {
        HeaderValue::from_str(origin).is_ok_and(|value| self.origins.allows(&value))
    }

    pub fn allows_method(&self, method: &Method) -> bool {
        self.methods.allows(method)
    }

    /// Builds the layer. Wildcards are expressed by mirroring the request so
    /// they stay valid alongside credentials; an empty origin list yields a
    /// layer that never emits `access-control-allow-origin`.
    pub fn layer(&self) -> CorsLayer {
        let origin = match &self.origins {
            Rule::Any => AllowOrigin::mirror_request(),
            Rule::List(list) => AllowOrigin::list(list.iter().cloned()),
        };
        let methods = match &self.methods {
            Rule::Any => AllowMethods::mirror_request(),
            Rule::List(list) => AllowMethods::list(list.iter().cloned()),
        };
        let headers = match &self.headers {
            Rule::Any => AllowHeaders::mirror_request(),
            Rule::List(list) => AllowHeaders::list(list.iter().cloned()),
        };
        let mut layer = CorsLayer::new()
            .allow_origin(origin)
            .allow_methods(methods)
            .allow_headers(headers)
            .allow_credentials(self.credentials);
        if let Some(max_age) = self.max_age {
            layer = layer.max_age(max_age);
        }
        layer
    }
}

fn parse_entries<T>(
    profile: &str,
    field: &'static str,
    raw: &[String],
    parse: impl Fn(&str) -> Option<T>,
) -> Result<Vec<T>, ConfigError> {
    raw.iter()
        .map(|entry| {
            parse(entry.trim()).ok_or_else(|| ConfigError::InvalidCorsEntry {
                profile: profile.to_string(),
                field,
                value: entry.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn development_allows_everything_with_credentials() {
        let policy = CorsPolicy::from_settings(&Settings::development()).unwrap();
        assert!(policy.allows_any_origin());
        assert!(policy.allows_any_method());
        assert!(policy.allows_any_header());
        assert!(policy.allows_credentials());
        assert!(policy.allows_origin("http://localhost:5173"));
    }

    #[test]
    fn production_allows_no_cross_origin_by_default() {
        let policy = CorsPolicy::from_settings(&Settings::production()).unwrap();
        assert!(!policy.allows_any_origin());
        assert!(!policy.allows_origin("https://evil.example"));
        assert!(policy.allows_method(&Method::DELETE));
    }

    #[test]
    fn explicit_lists_are_parsed() {
        let mut settings = Settings::production();
        settings.cors.allow_origins = vec!["https://brisa.example.edu".into()];
        settings.cors.allow_methods = vec!["get".into(), "POST".into()];
        settings.cors.allow_headers = vec!["Authorization".into()];
        let policy = CorsPolicy::from_settings(&settings).unwrap();
        assert!(policy.allows_origin("https://brisa.example.edu"));
        assert!(!policy.allows_origin("https://other.example.edu"));
        assert!(policy.allows_method(&Method::GET));
        assert!(!policy.allows_method(&Method::DELETE));
        assert!(!policy.allows_any_header());
    }

    #[test]
    fn configured_origins_match_the_browser_form() {
        let mut settings = Settings::production();
        settings.cors.allow_origins = vec![
            "https://Campus.Brisa.Example.EDU:443".into(),
            "http://LOCALHOST:5173".into(),
        ];
        let policy = CorsPolicy::from_settings(&settings).unwrap();
        assert!(policy.allows_origin("https://campus.brisa.example.edu"));
        assert!(policy.allows_origin("http://localhost:5173"));
        assert!(!policy.allows_origin("https://campus.brisa.example.edu:8443"));
    }

    #[test]
    fn origin_with_path_is_rejected() {
        let mut settings = Settings::production();
        settings.cors.allow_origins = vec!["https://brisa.example.edu/app".into()];
        let err = CorsPolicy::from_settings(&settings).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOrigin { .. }));
    }

    #[test]
    fn wildcard_origin_without_opt_in_is_rejected() {
        let mut settings = Settings::production();
        settings.cors.allow_origins = vec!["*".into()];
        let err = CorsPolicy::from_settings(&settings).unwrap_err();
        assert!(matches!(err, ConfigError::PermissiveCors { .. }));
    }

    #[test]
    fn malformed_header_name_is_rejected() {
        let mut settings = Settings::production();
        settings.cors.allow_headers = vec!["bad header".into()];
        let err = CorsPolicy::from_settings(&settings).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidCorsEntry {
                field: "allow_headers",
                ..
            }
        ));
    }
}
