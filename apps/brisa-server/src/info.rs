use serde::Serialize;
use utoipa::ToSchema;

pub const TITLE: &str = "BRISA Backend API";
pub const DESCRIPTION: &str = "Sistema de Gestión Académica";
pub const VERSION: &str = "1.0.0";
pub const DOCS_URL: &str = "/docs";
pub const REDOC_URL: &str = "/redoc";
pub const OPENAPI_URL: &str = "/openapi.json";

/// Fixed application metadata carried by every constructed app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct AppInfo {
    pub title: String,
    pub description: String,
    pub version: String,
    pub docs_url: String,
    pub redoc_url: String,
    pub openapi_url: String,
}

impl Default for AppInfo {
    fn default() -> Self {
        Self {
            title: TITLE.into(),
            description: DESCRIPTION.into(),
            version: VERSION.into(),
            docs_url: DOCS_URL.into(),
            redoc_url: REDOC_URL.into(),
            openapi_url: OPENAPI_URL.into(),
        }
    }
}
