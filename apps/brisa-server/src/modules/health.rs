use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};

use crate::router::{ApiModule, Stability, API_PREFIX};
use crate::AppState;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: String,
    pub service: String,
    pub version: String,
    pub profile: String,
    /// RFC 3339 UTC timestamp.
    pub time: String,
}

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "Health",
    operation_id = "health_check",
    description = "Liveness probe; answers 200 while the process serves requests.",
    responses(
        (status = 200, description = "Service alive", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        service: state.info().title.clone(),
        version: state.info().version.clone(),
        profile: state.settings().name.clone(),
        time: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
    })
}

#[derive(OpenApi)]
#[openapi(paths(health), components(schemas(HealthResponse)))]
struct HealthDoc;

pub fn module() -> ApiModule {
    ApiModule::new("health", API_PREFIX, "Health")
        .description("Service liveness")
        .route_get("/health", health, Some(Stability::Stable))
        .with_openapi(HealthDoc::openapi())
}
