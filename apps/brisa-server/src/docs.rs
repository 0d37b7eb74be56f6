//! Generated API documentation: the OpenAPI document assembled from module
//! fragments, and the interactive (Swagger UI) and alternate (ReDoc) pages.

use std::path::Path;

use axum::{
    extract::State,
    http::header,
    response::{Html, IntoResponse, Response},
};
use utoipa::openapi::{info::InfoBuilder, tag::TagBuilder, OpenApi};

use crate::info::{AppInfo, DOCS_URL, OPENAPI_URL, REDOC_URL};
use crate::router::{ApiModule, ModuleTag};
use crate::AppState;

const SWAGGER_UI_CDN: &str = "https://cdn.jsdelivr.net/npm/swagger-ui-dist@5";
const REDOC_CDN: &str = "https://cdn.jsdelivr.net/npm/redoc@2/bundles/redoc.standalone.js";

/// Stamps the merged module fragments with the app metadata and the tags
/// collected by the registrar.
pub fn finalize(mut doc: OpenApi, info: &AppInfo, tags: &[ModuleTag]) -> OpenApi {
    doc.info = InfoBuilder::new()
        .title(info.title.clone())
        .version(info.version.clone())
        .description(Some(info.description.clone()))
        .build();
    doc.tags = Some(
        tags.iter()
            .map(|tag| {
                TagBuilder::new()
                    .name(tag.name.clone())
                    .description(tag.description.clone())
                    .build()
            })
            .collect(),
    );
    doc
}

pub async fn openapi_json(State(state): State<AppState>) -> Response {
    (
        [(header::CONTENT_TYPE, "application/json")],
        state.openapi_json().to_string(),
    )
        .into_response()
}

pub async fn swagger_ui(State(state): State<AppState>) -> Html<String> {
    let info = state.info();
    Html(format!(
        r##"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title} - Swagger UI</title>
<link rel="stylesheet" href="{cdn}/swagger-ui.css">
</head>
<body>
<div id="swagger-ui"></div>
<script src="{cdn}/swagger-ui-bundle.js"></script>
<script>
window.ui = SwaggerUIBundle({{
  url: "{openapi}",
  dom_id: "#swagger-ui",
  layout: "BaseLayout",
  deepLinking: true,
  presets: [SwaggerUIBundle.presets.apis, SwaggerUIBundle.SwaggerUIStandalonePreset]
}});
</script>
</body>
</html>
"##,
        title = info.title,
        cdn = SWAGGER_UI_CDN,
        openapi = info.openapi_url,
    ))
}

pub async fn redoc(State(state): State<AppState>) -> Html<String> {
    let info = state.info();
    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title} - ReDoc</title>
</head>
<body>
<redoc spec-url="{openapi}"></redoc>
<script src="{cdn}"></script>
</body>
</html>
"#,
        title = info.title,
        cdn = REDOC_CDN,
        openapi = info.openapi_url,
    ))
}

/// Documentation endpoints, mounted at the root and kept out of the
/// document's own tag list.
pub fn module() -> ApiModule {
    ApiModule::new("docs", "", "Docs")
        .undocumented()
        .route_get(OPENAPI_URL, openapi_json, None)
        .route_get(DOCS_URL, swagger_ui, None)
        .route_get(REDOC_URL, redoc, None)
}

/// Writes the document to `path`; YAML for `.yaml`/`.yml`, JSON otherwise.
pub fn export(doc: &OpenApi, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));
    let body = if is_yaml {
        doc.to_yaml()?
    } else {
        doc.to_pretty_json()?
    };
    std::fs::write(path, body)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finalize_sets_metadata_and_tags() {
        let doc = finalize(
            utoipa::openapi::OpenApiBuilder::new().build(),
            &AppInfo::default(),
            &[ModuleTag {
                name: "Health".into(),
                description: Some("Service liveness".into()),
            }],
        );
        assert_eq!(doc.info.title, "BRISA Backend API");
        assert_eq!(doc.info.version, "1.0.0");
        let tags = doc.tags.expect("tags");
        assert_eq!(tags[0].name, "Health");
        assert_eq!(tags[0].description.as_deref(), Some("Service liveness"));
    }

    #[test]
    fn export_picks_format_from_extension() {
        let dir = tempfile::tempdir().expect("tempdir");
        let doc = finalize(
            utoipa::openapi::OpenApiBuilder::new().build(),
            &AppInfo::default(),
            &[],
        );
        let json_path = dir.path().join("out/openapi.json");
        export(&doc, &json_path).expect("json export");
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(json["info"]["title"], "BRISA Backend API");

        let yaml_path = dir.path().join("openapi.yaml");
        export(&doc, &yaml_path).expect("yaml export");
        let yaml = std::fs::read_to_string(&yaml_path).unwrap();
        assert!(yaml.contains("title: BRISA Backend API"));
    }
}
