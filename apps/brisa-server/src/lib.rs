//! BRISA academic-management backend.
//!
//! [`create_app`] resolves a configuration profile, runs the extension
//! initialisers, mounts every module in [`modules::manifest`] under the
//! shared `/api` prefix, and wraps the result in the middleware stack. A new
//! domain module only needs to expose an [`ApiModule`] and be added to the
//! manifest.

mod access_log;
pub mod app;
pub mod cors;
pub mod docs;
pub mod extensions;
pub mod http;
pub mod info;
pub mod modules;
pub mod request_ctx;
pub mod responses;
pub mod router;
mod security;
mod state;
#[cfg(test)]
mod test_support;

pub use app::{create_app, App, AppError, AppFactory};
pub use cors::CorsPolicy;
pub use extensions::{Extension, ExtensionContext, ExtensionError, Lifecycle};
pub use info::AppInfo;
pub use router::{register_routes, ApiModule, EndpointInfo, RegistrationError, Stability};
pub use security::HeaderPolicy;
pub use state::{AppState, Resources};
