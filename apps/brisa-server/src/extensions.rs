//! Extension initialisation: the hook through which infrastructure
//! (database pools, caches, auth providers) attaches to the application.
//!
//! Extensions run synchronously while the factory builds the app. Work that
//! needs the async runtime is registered as a startup or shutdown hook on
//! [`Lifecycle`]; the server binary runs those around `serve`.

use std::future::Future;
use std::sync::Arc;

use brisa_core::Settings;
use futures_util::future::BoxFuture;
use tracing::{debug, info, warn};

use crate::info::AppInfo;
use crate::state::Resources;

pub type HookFuture = BoxFuture<'static, Result<(), ExtensionError>>;
type Hook = Box<dyn FnOnce() -> HookFuture + Send>;

#[derive(Debug, thiserror::Error)]
pub enum ExtensionError {
    #[error("extension `{extension}` failed: {message}")]
    Failed { extension: String, message: String },
    #[error("extension `{extension}` failed: {source}")]
    Source {
        extension: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ExtensionError {
    pub fn new(extension: impl Into<String>, message: impl Into<String>) -> Self {
        ExtensionError::Failed {
            extension: extension.into(),
            message: message.into(),
        }
    }

    pub fn from_source<E>(extension: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        ExtensionError::Source {
            extension: extension.into(),
            source: Box::new(source),
        }
    }

    pub fn extension(&self) -> &str {
        match self {
            ExtensionError::Failed { extension, .. } | ExtensionError::Source { extension, .. } => {
                extension
            }
        }
    }
}

pub trait Extension: Send + Sync {
    fn name(&self) -> &str;

    fn init(&self, cx: &mut ExtensionContext<'_>) -> Result<(), ExtensionError>;
}

/// What an extension may see and touch while the app is being built.
pub struct ExtensionContext<'a> {
    settings: &'a Settings,
    info: &'a AppInfo,
    resources: &'a mut Resources,
    lifecycle: &'a mut Lifecycle,
}

impl<'a> ExtensionContext<'a> {
    pub fn new(
        settings: &'a Settings,
        info: &'a AppInfo,
        resources: &'a mut Resources,
        lifecycle: &'a mut Lifecycle,
    ) -> Self {
        Self {
            settings,
            info,
            resources,
            lifecycle,
        }
    }

    pub fn settings(&self) -> &Settings {
        self.settings
    }

    pub fn info(&self) -> &AppInfo {
        self.info
    }

    pub fn insert_resource<T: Clone + Send + Sync + 'static>(&mut self, value: T) -> Option<T> {
        self.resources.insert(value)
    }

    pub fn resource<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.resources.get::<T>()
    }

    pub fn lifecycle(&mut self) -> &mut Lifecycle {
        self.lifecycle
    }
}

/// Async hooks run by the server binary. Startup hooks run in registration
/// order before the listener binds; shutdown hooks run in reverse order after
/// the server drains.
#[derive(Default)]
pub struct Lifecycle {
    startup: Vec<(String, Hook)>,
    shutdown: Vec<(String, Hook)>,
}

impl std::fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lifecycle")
            .field("startup", &self.startup_names().collect::<Vec<_>>())
            .field("shutdown", &self.shutdown_names().collect::<Vec<_>>())
            .finish()
    }
}

impl Lifecycle {
    pub fn on_startup<F, Fut>(&mut self, name: impl Into<String>, hook: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), ExtensionError>> + Send + 'static,
    {
        self.startup
            .push((name.into(), Box::new(move || Box::pin(hook()) as HookFuture)));
    }

    pub fn on_shutdown<F, Fut>(&mut self, name: impl Into<String>, hook: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), ExtensionError>> + Send + 'static,
    {
        self.shutdown
            .push((name.into(), Box::new(move || Box::pin(hook()) as HookFuture)));
    }

    pub fn startup_names(&self) -> impl Iterator<Item = &str> {
        self.startup.iter().map(|(name, _)| name.as_str())
    }

    pub fn shutdown_names(&self) -> impl Iterator<Item = &str> {
        self.shutdown.iter().map(|(name, _)| name.as_str())
    }

    /// Runs startup hooks; the first failure stops the sequence.
    pub async fn run_startup(&mut self) -> Result<(), ExtensionError> {
        for (name, hook) in self.startup.drain(..) {
            debug!(target: "brisa::ext", hook = %name, "running startup hook");
            hook().await?;
        }
        Ok(())
    }

    /// Runs startup hooks, then `body` if they all succeeded, then every
    /// shutdown hook however either of the first two ended.
    pub async fn run_around<T, E, F, Fut>(&mut self, body: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<ExtensionError>,
    {
        let outcome = match self.run_startup().await {
            Ok(()) => body().await,
            Err(err) => Err(err.into()),
        };
        info!(target: "brisa::ext", hooks = self.shutdown.len(), "running shutdown hooks");
        self.run_shutdown().await;
        outcome
    }

    /// Runs every shutdown hook even when earlier ones fail.
    pub async fn run_shutdown(&mut self) {
        for (name, hook) in self.shutdown.drain(..).rev() {
            if let Err(err) = hook().await {
                warn!(target: "brisa::ext", hook = %name, error = %err, "shutdown hook failed");
            }
        }
    }
}

/// Runs each extension in order. The first error aborts and is returned
/// unchanged.
pub fn init_extensions(
    extensions: &[Arc<dyn Extension>],
    cx: &mut ExtensionContext<'_>,
) -> Result<(), ExtensionError> {
    for ext in extensions {
        info!(target: "brisa::ext", extension = ext.name(), "initialising extension");
        ext.init(cx)?;
    }
    Ok(())
}

pub fn default_extensions() -> Vec<Arc<dyn Extension>> {
    vec![Arc::new(DatabaseExtension)]
}

/// Validated connection target published for a database layer to pick up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatabaseTarget {
    pub url: url::Url,
    pub pool_size: u32,
}

impl DatabaseTarget {
    /// The URL with any password replaced, for logs.
    pub fn redacted(&self) -> String {
        let mut url = self.url.clone();
        if url.password().is_some() {
            let _ = url.set_password(Some("***"));
        }
        url.to_string()
    }
}

/// Publishes the profile's database target. Opening the pool belongs to the
/// persistence layer, which reads [`DatabaseTarget`] from the resources.
pub struct DatabaseExtension;

impl Extension for DatabaseExtension {
    fn name(&self) -> &str {
        "database"
    }

    fn init(&self, cx: &mut ExtensionContext<'_>) -> Result<(), ExtensionError> {
        let Some(raw) = cx.settings().database.url.clone() else {
            debug!(target: "brisa::ext", profile = %cx.settings().name, "no database configured");
            return Ok(());
        };
        let url =
            url::Url::parse(&raw).map_err(|err| ExtensionError::from_source(self.name(), err))?;
        let target = DatabaseTarget {
            url,
            pool_size: cx.settings().database.pool_size,
        };
        info!(
            target: "brisa::ext",
            url = %target.redacted(),
            pool_size = target.pool_size,
            "database target registered"
        );
        cx.insert_resource(target);
        Ok(())
    }
}
