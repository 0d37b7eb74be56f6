use std::collections::{HashMap, HashSet};

use axum::{
    handler::Handler,
    routing::{delete, get, patch, post, put, MethodRouter},
    Router,
};
use serde::Serialize;
use tracing::{debug, info};
use utoipa::ToSchema;

use crate::AppState;

/// Shared prefix for every API module.
pub const API_PREFIX: &str = "/api";

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Stability {
    Stable,
    Beta,
    Experimental,
}

impl Stability {
    pub fn as_str(self) -> &'static str {
        match self {
            Stability::Stable => "stable",
            Stability::Beta => "beta",
            Stability::Experimental => "experimental",
        }
    }
}

#[derive(Clone)]
struct ModuleRoute {
    method: &'static str,
    path: &'static str,
    handler: MethodRouter<AppState>,
    stability: Option<Stability>,
}

/// Descriptor a module hands to the registrar: its routes, the prefix they
/// mount under, and the tag grouping them in the API docs.
#[derive(Clone)]
pub struct ApiModule {
    name: &'static str,
    prefix: &'static str,
    tag: &'static str,
    description: Option<&'static str>,
    documented: bool,
    openapi: Option<utoipa::openapi::OpenApi>,
    routes: Vec<ModuleRoute>,
}

impl ApiModule {
    pub fn new(name: &'static str, prefix: &'static str, tag: &'static str) -> Self {
        Self {
            name,
            prefix,
            tag,
            description: None,
            documented: true,
            openapi: None,
            routes: Vec::new(),
        }
    }

    pub fn description(mut self, description: &'static str) -> Self {
        self.description = Some(description);
        self
    }

    /// Module's contribution to the OpenAPI document.
    pub fn with_openapi(mut self, doc: utoipa::openapi::OpenApi) -> Self {
        self.openapi = Some(doc);
        self
    }

    /// Keeps the module's tag out of the API docs.
    pub fn undocumented(mut self) -> Self {
        self.documented = false;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn prefix(&self) -> &'static str {
        self.prefix
    }

    pub fn tag(&self) -> &'static str {
        self.tag
    }

    fn push(
        mut self,
        method: &'static str,
        path: &'static str,
        handler: MethodRouter<AppState>,
        stability: Option<Stability>,
    ) -> Self {
        self.routes.push(ModuleRoute {
            method,
            path,
            handler,
            stability,
        });
        self
    }

    pub fn route_get<H, T>(
        self,
        path: &'static str,
        handler: H,
        stability: Option<Stability>,
    ) -> Self
    where
        H: Handler<T, AppState> + Clone + 'static,
        T: Send + 'static,
    {
        self.push("GET", path, get(handler), stability)
    }

    pub fn route_post<H, T>(
        self,
        path: &'static str,
        handler: H,
        stability: Option<Stability>,
    ) -> Self
    where
        H: Handler<T, AppState> + Clone + 'static,
        T: Send + 'static,
    {
        self.push("POST", path, post(handler), stability)
    }

    pub fn route_put<H, T>(
        self,
        path: &'static str,
        handler: H,
        stability: Option<Stability>,
    ) -> Self
    where
        H: Handler<T, AppState> + Clone + 'static,
        T: Send + 'static,
    {
        self.push("PUT", path, put(handler), stability)
    }

    pub fn route_patch<H, T>(
        self,
        path: &'static str,
        handler: H,
        stability: Option<Stability>,
    ) -> Self
    where
        H: Handler<T, AppState> + Clone + 'static,
        T: Send + 'static,
    {
        self.push("PATCH", path, patch(handler), stability)
    }

    pub fn route_delete<H, T>(
        self,
        path: &'static str,
        handler: H,
        stability: Option<Stability>,
    ) -> Self
    where
        H: Handler<T, AppState> + Clone + 'static,
        T: Send + 'static,
    {
        self.push("DELETE", path, delete(handler), stability)
    }
}

/// One mounted route, as listed by `/api/about`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct EndpointInfo {
    pub method: String,
    pub path: String,
    pub module: String,
    pub tag: String,
    pub stability: Option<Stability>,
}

impl EndpointInfo {
    pub fn label(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleTag {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
    #[error("module `{module}`: invalid {what} `{value}`")]
    InvalidPath {
        module: String,
        what: &'static str,
        value: String,
    },
    #[error("module `{module}` is registered twice")]
    DuplicateModule { module: String },
    #[error("{method} {path} is registered by both `{first}` and `{second}`")]
    DuplicateRoute {
        method: String,
        path: String,
        first: String,
        second: String,
    },
    #[error("{path} (module `{second}`) overlaps {existing} (module `{first}`)")]
    ConflictingPath {
        path: String,
        existing: String,
        first: String,
        second: String,
    },
}

pub struct RegisteredRoutes {
    pub router: Router<AppState>,
    pub endpoints: Vec<EndpointInfo>,
    pub tags: Vec<ModuleTag>,
    pub openapi: utoipa::openapi::OpenApi,
}

/// Mounts every module. Modules sharing a prefix coexist; any duplicate
/// route, overlapping path, or repeated module name fails the whole
/// registration so the process never starts half-wired.
pub fn register_routes(
    modules: impl IntoIterator<Item = ApiModule>,
) -> Result<RegisteredRoutes, RegistrationError> {
    let mut router = Router::new();
    let mut endpoints = Vec::new();
    let mut tags: Vec<ModuleTag> = Vec::new();
    let mut openapi = utoipa::openapi::OpenApiBuilder::new().build();
    let mut module_names = HashSet::new();
    // route key -> owning module
    let mut routes_seen: HashMap<(&'static str, String), &'static str> = HashMap::new();
    // path shape -> (literal path, owning module)
    let mut shapes: HashMap<String, (String, &'static str)> = HashMap::new();

    for module in modules {
        if !valid_prefix(module.prefix) {
            return Err(RegistrationError::InvalidPath {
                module: module.name.into(),
                what: "prefix",
                value: module.prefix.into(),
            });
        }
        if !module_names.insert(module.name) {
            return Err(RegistrationError::DuplicateModule {
                module: module.name.into(),
            });
        }
        if module.documented {
            match tags.iter_mut().find(|t| t.name == module.tag) {
                Some(existing) => {
                    if existing.description.is_none() {
                        existing.description = module.description.map(str::to_string);
                    }
                }
                None => tags.push(ModuleTag {
                    name: module.tag.into(),
                    description: module.description.map(str::to_string),
                }),
            }
        }
        if let Some(doc) = module.openapi {
            openapi.merge(doc);
        }

        let route_count = module.routes.len();
        for route in module.routes {
            let full = join_path(module.prefix, route.path);
            if !valid_path(route.path) || !valid_path(&full) {
                return Err(RegistrationError::InvalidPath {
                    module: module.name.into(),
                    what: "path",
                    value: route.path.into(),
                });
            }
            let shape = path_shape(&full);
            if let Some((existing, first)) = shapes.get(&shape) {
                if *existing != full {
                    return Err(RegistrationError::ConflictingPath {
                        path: full,
                        existing: existing.clone(),
                        first: (*first).into(),
                        second: module.name.into(),
                    });
                }
            }
            if let Some(first) = routes_seen.get(&(route.method, shape.clone())) {
                return Err(RegistrationError::DuplicateRoute {
                    method: route.method.into(),
                    path: full,
                    first: (*first).into(),
                    second: module.name.into(),
                });
            }
            routes_seen.insert((route.method, shape.clone()), module.name);
            shapes.insert(shape, (full.clone(), module.name));

            debug!(target: "brisa::routes", method = route.method, path = %full, "route mounted");
            router = router.route(&full, route.handler);
            endpoints.push(EndpointInfo {
                method: route.method.into(),
                path: full,
                module: module.name.into(),
                tag: module.tag.into(),
                stability: route.stability,
            });
        }
        info!(
            target: "brisa::routes",
            module = module.name,
            prefix = module.prefix,
            tag = module.tag,
            routes = route_count,
            "module registered"
        );
    }

    Ok(RegisteredRoutes {
        router,
        endpoints,
        tags,
        openapi,
    })
}

fn valid_prefix(prefix: &str) -> bool {
    prefix.is_empty() || (!prefix.ends_with('/') && valid_path(prefix))
}

enum Segment<'a> {
    Static,
    Param(&'a str),
}

/// Paths the router accepts without panicking: absolute, every `{param}`
/// spanning a whole segment, `{*rest}` only as the last segment, and no
/// parameter named twice.
fn valid_path(path: &str) -> bool {
    let Some(rest) = path.strip_prefix('/') else {
        return false;
    };
    let mut names = HashSet::new();
    let mut segments = rest.split('/').peekable();
    while let Some(seg) = segments.next() {
        match segment(seg, segments.peek().is_none()) {
            Some(Segment::Static) => {}
            Some(Segment::Param(name)) => {
                if !names.insert(name) {
                    return false;
                }
            }
            None => return false,
        }
    }
    true
}

fn segment(seg: &str, last: bool) -> Option<Segment<'_>> {
    if let Some(inner) = seg.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
        let name = match inner.strip_prefix('*') {
            Some(_) if !last => return None,
            Some(name) => name,
            None => inner,
        };
        let named = !name.is_empty() && !name.contains(['{', '}', '*', ':']);
        return named.then_some(Segment::Param(name));
    }
    // `:id` and `*rest` are the old capture syntax and panic at mount time.
    let plain = !seg.starts_with([':', '*']) && !seg.contains(['{', '}']);
    plain.then_some(Segment::Static)
}

fn join_path(prefix: &str, path: &str) -> String {
    match (prefix, path) {
        ("", path) => path.to_string(),
        (prefix, "/") => prefix.to_string(),
        (prefix, path) => format!("{prefix}{path}"),
    }
}

// Parameter names do not matter for matching: `/a/{id}` and `/a/{key}` collide.
fn path_shape(path: &str) -> String {
    path.split('/')
        .map(|seg| if seg.starts_with('{') { "{}" } else { seg })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn ok() -> &'static str {
        "ok"
    }

    fn module(name: &'static str, prefix: &'static str, tag: &'static str) -> ApiModule {
        ApiModule::new(name, prefix, tag)
    }

    #[test]
    fn joins_prefix_and_path() {
        assert_eq!(join_path("/api", "/health"), "/api/health");
        assert_eq!(join_path("/api", "/"), "/api");
        assert_eq!(join_path("", "/docs"), "/docs");
    }

    #[test]
    fn shape_ignores_parameter_names() {
        assert_eq!(path_shape("/api/cursos/{id}"), path_shape("/api/cursos/{curso}"));
        assert_ne!(path_shape("/api/cursos/{id}"), path_shape("/api/cursos/activos"));
    }

    #[test]
    fn modules_sharing_prefix_keep_all_routes() {
        let registered = register_routes([
            module("health", API_PREFIX, "Health").route_get("/health", ok, None),
            module("usuarios", API_PREFIX, "Usuarios")
                .route_get("/usuarios", ok, Some(Stability::Beta))
                .route_post("/usuarios", ok, Some(Stability::Beta)),
        ])
        .expect("registration");
        let labels: Vec<String> = registered.endpoints.iter().map(EndpointInfo::label).collect();
        assert_eq!(
            labels,
            ["GET /api/health", "GET /api/usuarios", "POST /api/usuarios"]
        );
        let tags: Vec<&str> = registered.tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(tags, ["Health", "Usuarios"]);
    }

    #[test]
    fn duplicate_route_across_modules_is_fatal() {
        let err = register_routes([
            module("health", API_PREFIX, "Health").route_get("/health", ok, None),
            module("legacy", API_PREFIX, "Legacy").route_get("/health", ok, None),
        ])
        .err()
        .expect("duplicate must fail");
        assert_eq!(
            err,
            RegistrationError::DuplicateRoute {
                method: "GET".into(),
                path: "/api/health".into(),
                first: "health".into(),
                second: "legacy".into(),
            }
        );
    }

    #[test]
    fn renamed_parameters_still_conflict() {
        let err = register_routes([
            module("cursos", API_PREFIX, "Cursos").route_get("/cursos/{id}", ok, None),
            module("notas", API_PREFIX, "Notas").route_post("/cursos/{curso}", ok, None),
        ])
        .err()
        .expect("overlap must fail");
        assert!(matches!(err, RegistrationError::ConflictingPath { .. }));
    }

    #[test]
    fn same_path_different_methods_is_allowed() {
        let registered = register_routes([
            module("read", API_PREFIX, "Cursos").route_get("/cursos/{id}", ok, None),
            module("write", API_PREFIX, "Cursos").route_put("/cursos/{id}", ok, None),
        ])
        .expect("registration");
        assert_eq!(registered.endpoints.len(), 2);
        assert_eq!(registered.tags.len(), 1);
    }

    #[test]
    fn rejects_bad_prefixes_and_paths() {
        for prefix in ["api", "/api/"] {
            let err = register_routes([module("m", prefix, "M").route_get("/x", ok, None)])
                .err()
                .expect("bad prefix");
            assert!(matches!(err, RegistrationError::InvalidPath { what: "prefix", .. }));
        }
        let err = register_routes([module("m", API_PREFIX, "M").route_get("x", ok, None)])
            .err()
            .expect("bad path");
        assert!(matches!(err, RegistrationError::InvalidPath { what: "path", .. }));
    }

    fn path_error(path: &'static str) -> Option<RegistrationError> {
        register_routes([module("cursos", API_PREFIX, "Cursos").route_get(path, ok, None)]).err()
    }

    #[test]
    fn colon_capture_is_rejected_not_mounted() {
        assert!(matches!(
            path_error("/cursos/:id"),
            Some(RegistrationError::InvalidPath { what: "path", .. })
        ));
    }

    #[test]
    fn bare_star_wildcard_is_rejected() {
        assert!(path_error("/archivos/*rest").is_some());
    }

    #[test]
    fn unbalanced_braces_are_rejected() {
        for path in ["/cursos/{id", "/cursos/id}", "/cursos/{}", "/cursos/{{id}}"] {
            assert!(path_error(path).is_some(), "{path}");
        }
    }

    #[test]
    fn catch_all_must_end_the_path() {
        assert!(path_error("/archivos/{*rest}/mas").is_some());
        assert!(path_error("/archivos/{*}").is_some());
        assert!(path_error("/archivos/{*rest}").is_none());
    }

    #[test]
    fn partial_segment_parameters_are_rejected() {
        assert!(path_error("/fotos/{nombre}.png").is_some());
        assert!(path_error("/cursos/{id}/alumnos/{id}").is_some());
        assert!(path_error("/cursos/{id}/alumnos/{alumno}").is_none());
    }

    #[test]
    fn prefix_syntax_is_checked_too() {
        let err = register_routes([module("m", "/api/:v", "M").route_get("/x", ok, None)])
            .err()
            .expect("bad prefix");
        assert!(matches!(err, RegistrationError::InvalidPath { what: "prefix", .. }));
    }

    #[test]
    fn duplicate_module_names_rejected() {
        let err = register_routes([
            module("health", API_PREFIX, "Health").route_get("/health", ok, None),
            module("health", API_PREFIX, "Health").route_get("/status", ok, None),
        ])
        .err()
        .expect("duplicate module");
        assert!(matches!(err, RegistrationError::DuplicateModule { .. }));
    }

    #[test]
    fn undocumented_modules_add_no_tag() {
        let registered = register_routes([
            module("docs", "", "Docs").undocumented().route_get("/docs", ok, None),
        ])
        .expect("registration");
        assert!(registered.tags.is_empty());
        assert_eq!(registered.endpoints[0].path, "/docs");
    }
}
