//! Application factory: profile selection, extension initialisation, route
//! registration, and the middleware stack, in that order.

use std::sync::Arc;

use axum::{extract::Request, middleware::Next, Router};
use brisa_core::{resolve_profile_name, ConfigError, ConfigRegistry, Settings};
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::cors::CorsPolicy;
use crate::extensions::{
    default_extensions, init_extensions, Extension, ExtensionContext, ExtensionError, Lifecycle,
};
use crate::info::AppInfo;
use crate::router::{register_routes, ApiModule, EndpointInfo, RegistrationError};
use crate::security::HeaderPolicy;
use crate::state::Resources;
use crate::{access_log, docs, modules, request_ctx, responses, security, AppState};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Extension(#[from] ExtensionError),
    #[error(transparent)]
    Registration(#[from] RegistrationError),
    #[error("failed to render OpenAPI document: {0}")]
    OpenApi(#[from] serde_json::Error),
}

/// Builds [`App`]s from a profile registry, a list of extensions, and the
/// module manifest. Building never mutates the factory, so one factory can
/// produce apps for several profiles.
pub struct AppFactory {
    registry: ConfigRegistry,
    extensions: Vec<Arc<dyn Extension>>,
    modules: Vec<ApiModule>,
}

impl AppFactory {
    /// Default extensions and the full module manifest.
    pub fn new(registry: ConfigRegistry) -> Self {
        Self {
            registry,
            extensions: default_extensions(),
            modules: modules::manifest(),
        }
    }

    /// No extensions and no modules beyond the documentation endpoints.
    pub fn bare(registry: ConfigRegistry) -> Self {
        Self {
            registry,
            extensions: Vec::new(),
            modules: Vec::new(),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self::new(ConfigRegistry::from_env()?))
    }

    pub fn extension(mut self, extension: impl Extension + 'static) -> Self {
        self.extensions.push(Arc::new(extension));
        self
    }

    pub fn module(mut self, module: ApiModule) -> Self {
        self.modules.push(module);
        self
    }

    pub fn registry(&self) -> &ConfigRegistry {
        &self.registry
    }

    /// Assembles the app for `config_name`, or for the profile named by `ENV`
    /// when absent. Any failure aborts construction.
    pub fn build(&self, config_name: Option<&str>) -> Result<App, AppError> {
        let profile = resolve_profile_name(config_name);
        let settings = self.registry.get(&profile)?;
        let cors = CorsPolicy::from_settings(&settings)?;
        let info = Arc::new(AppInfo::default());

        let mut resources = Resources::default();
        let mut lifecycle = Lifecycle::default();
        {
            let mut cx = ExtensionContext::new(&settings, &info, &mut resources, &mut lifecycle);
            init_extensions(&self.extensions, &mut cx)?;
        }

        let mut mounted = Vec::with_capacity(self.modules.len() + 1);
        if settings.docs.enabled {
            mounted.push(docs::module());
        }
        mounted.extend(self.modules.iter().cloned());
        let registered = register_routes(mounted)?;

        let openapi = docs::finalize(registered.openapi, &info, &registered.tags);
        let state = AppState::new(
            info,
            settings.clone(),
            Arc::new(resources),
            Arc::new(registered.endpoints),
            Arc::from(openapi.to_json()?),
        );
        let router = attach_layers(registered.router, state.clone(), &settings, &cors);

        info!(
            target: "brisa::app",
            profile = %settings.name,
            debug = settings.debug,
            routes = state.endpoints().len(),
            extensions = self.extensions.len(),
            permissive_cors = cors.allows_any_origin(),
            "application assembled"
        );
        Ok(App {
            state,
            cors,
            openapi,
            lifecycle,
            router,
        })
    }
}

/// Layers run outermost first: concurrency limit, access log, request id,
/// tracing, security headers, CORS, then routing.
fn attach_layers(
    router: Router<AppState>,
    state: AppState,
    settings: &Settings,
    cors: &CorsPolicy,
) -> Router {
    let headers = HeaderPolicy {
        hsts: settings.http.hsts,
    };
    router
        .fallback(responses::not_found)
        .with_state(state)
        .layer(cors.layer())
        .layer(axum::middleware::from_fn(move |req: Request, next: Next| {
            security::headers_mw(headers, req, next)
        }))
        .layer(TraceLayer::new_for_http().make_span_with(request_ctx::make_span))
        .layer(axum::middleware::from_fn(request_ctx::request_id_mw))
        .layer(axum::middleware::from_fn(access_log::access_log_mw))
        .layer(GlobalConcurrencyLimitLayer::new(settings.http.concurrency_limit))
}

/// Builds an app with the built-in profiles, the `BRISA_CONFIG` overlay, the
/// default extensions, and every module in the manifest.
pub fn create_app(config_name: Option<&str>) -> Result<App, AppError> {
    AppFactory::from_env()?.build(config_name)
}

/// A fully assembled application.
pub struct App {
    state: AppState,
    cors: CorsPolicy,
    openapi: utoipa::openapi::OpenApi,
    lifecycle: Lifecycle,
    router: Router,
}

impl App {
    pub fn info(&self) -> &AppInfo {
        self.state.info()
    }

    pub fn settings(&self) -> &Settings {
        self.state.settings()
    }

    pub fn cors(&self) -> &CorsPolicy {
        &self.cors
    }

    pub fn endpoints(&self) -> &[EndpointInfo] {
        self.state.endpoints()
    }

    pub fn resource<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.state.resource::<T>()
    }

    pub fn openapi(&self) -> &utoipa::openapi::OpenApi {
        &self.openapi
    }

    pub fn lifecycle_mut(&mut self) -> &mut Lifecycle {
        &mut self.lifecycle
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn into_parts(self) -> (Router, Lifecycle) {
        (self.router, self.lifecycle)
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("profile", &self.settings().name)
            .field("endpoints", &self.endpoints().len())
            .field("lifecycle", &self.lifecycle)
            .finish()
    }
}
