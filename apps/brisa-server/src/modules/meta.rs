use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::{OpenApi, ToSchema};

use crate::router::{ApiModule, EndpointInfo, Stability, API_PREFIX};
use crate::AppState;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DocsLinks {
    pub docs_url: String,
    pub redoc_url: String,
    pub openapi_url: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AboutResponse {
    pub service: String,
    pub description: String,
    pub version: String,
    pub profile: String,
    pub debug: bool,
    /// Absent when the profile disables the documentation endpoints.
    pub docs: Option<DocsLinks>,
    #[schema(example = json!(["GET /api/health", "GET /api/about"]))]
    pub endpoints: Vec<String>,
    pub endpoints_meta: Vec<EndpointInfo>,
}

/// Service metadata and endpoints index.
#[utoipa::path(
    get,
    path = "/api/about",
    tag = "Meta",
    operation_id = "about",
    description = "Service metadata, active profile and the index of mounted endpoints.",
    responses(
        (status = 200, description = "Service metadata", body = AboutResponse)
    )
)]
pub async fn about(State(state): State<AppState>) -> Json<AboutResponse> {
    let info = state.info();
    let settings = state.settings();
    let docs = settings.docs.enabled.then(|| DocsLinks {
        docs_url: info.docs_url.clone(),
        redoc_url: info.redoc_url.clone(),
        openapi_url: info.openapi_url.clone(),
    });
    Json(AboutResponse {
        service: info.title.clone(),
        description: info.description.clone(),
        version: info.version.clone(),
        profile: settings.name.clone(),
        debug: settings.debug,
        docs,
        endpoints: state.endpoints().iter().map(EndpointInfo::label).collect(),
        endpoints_meta: state.endpoints().to_vec(),
    })
}

#[derive(OpenApi)]
#[openapi(
    paths(about),
    components(schemas(AboutResponse, DocsLinks, EndpointInfo, Stability))
)]
struct MetaDoc;

pub fn module() -> ApiModule {
    ApiModule::new("meta", API_PREFIX, "Meta")
        .description("Service metadata and endpoint index")
        .route_get("/about", about, Some(Stability::Stable))
        .with_openapi(MetaDoc::openapi())
}
