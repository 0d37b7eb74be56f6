use std::sync::Arc;

use axum::http::Extensions;
use brisa_core::Settings;

use crate::info::AppInfo;
use crate::router::EndpointInfo;

/// Type-keyed store for whatever extensions attach (pools, clients, ...).
#[derive(Debug, Default)]
pub struct Resources {
    map: Extensions,
}

impl Resources {
    /// Stores `value`, returning the previous value of the same type.
    pub fn insert<T: Clone + Send + Sync + 'static>(&mut self, value: T) -> Option<T> {
        self.map.insert(value)
    }

    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.map.get::<T>()
    }

    pub fn contains<T: Send + Sync + 'static>(&self) -> bool {
        self.get::<T>().is_some()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// State shared by every handler. Everything behind it is immutable.
#[derive(Clone)]
pub struct AppState {
    info: Arc<AppInfo>,
    settings: Arc<Settings>,
    resources: Arc<Resources>,
    endpoints: Arc<Vec<EndpointInfo>>,
    openapi_json: Arc<str>,
}

impl AppState {
    pub(crate) fn new(
        info: Arc<AppInfo>,
        settings: Arc<Settings>,
        resources: Arc<Resources>,
        endpoints: Arc<Vec<EndpointInfo>>,
        openapi_json: Arc<str>,
    ) -> Self {
        Self {
            info,
            settings,
            resources,
            endpoints,
            openapi_json,
        }
    }

    pub fn info(&self) -> &AppInfo {
        &self.info
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn resource<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.resources.get::<T>()
    }

    pub fn endpoints(&self) -> &[EndpointInfo] {
        &self.endpoints
    }

    pub fn openapi_json(&self) -> Arc<str> {
        self.openapi_json.clone()
    }
}
