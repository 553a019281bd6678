use axum::{
    Json, Router,
    extract::{FromRef, FromRequestParts, Request, State},
    http::{HeaderName, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Redirect, Response},
};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Policy core.
pub mod guard;
pub mod routing;
pub mod session;

// Collaborators and HTTP surface.
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod storage;
pub mod utils;

pub mod routes;
use routes::{authenticated, dashboards, public};

use auth::{AuthPrincipal, ResolvedProfile};
use guard::{AccessPolicy, GuardState};
use models::PlaceholderResponse;
use session::AuthSnapshot;

// --- Public Re-exports ---

pub use config::AppConfig;
pub use guard::{AccessGuard, Navigator, evaluate};
pub use repository::{InMemoryProfileRepository, PostgresProfileRepository, RepositoryState};
pub use routing::{Route, dashboard_link, resolve_dashboard_route, try_dashboard_route};
pub use storage::{ImageHostClient, MockUploadService, S3UploadClient, UploadState};

/// ApiDoc
///
/// OpenAPI document served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::get_nav, handlers::login_page, handlers::unauthorized_page,
        handlers::get_me, handlers::get_dashboard_route, handlers::register_profile,
        handlers::upload_image, handlers::dashboard
    ),
    components(
        schemas(
            models::Principal, models::Profile, models::Role, models::AdminType,
            models::WorkerService, models::RegisterProfileRequest, models::MeResponse,
            models::DashboardRouteResponse, models::DashboardView, models::PlaceholderResponse,
            models::UploadResponse, routing::NavMenu, routing::NavLink, routing::NavAction,
            guard::AccessPolicy, guard::GuardState,
        )
    ),
    tags(
        (name = "marketplace-gateway", description = "Marketplace access & routing API")
    ),
    modifiers(&DashboardPaths)
)]
struct ApiDoc;

/// DashboardPaths
///
/// `handlers::dashboard` serves every guarded dashboard but is annotated once;
/// this copies its operation onto each of the other dashboard paths.
struct DashboardPaths;

impl Modify for DashboardPaths {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let Some(template) = openapi
            .paths
            .paths
            .get(routing::CUSTOMER_DASHBOARD_PATH)
            .cloned()
        else {
            return;
        };

        for route in routing::all_dashboard_routes() {
            let path = route.into_string();
            let mut item = template.clone();
            if let Some(operation) = item.get.as_mut() {
                let slug = path.trim_matches('/').replace('/', "_");
                operation.operation_id = Some(format!("dashboard_{slug}"));
            }
            openapi.paths.paths.insert(path, item);
        }
    }
}

/// AppState
///
/// Shared, cloneable container for the services every request may need.
#[derive(Clone)]
pub struct AppState {
    /// Profile lookups (document store).
    pub repo: RepositoryState,
    /// Image upload collaborator.
    pub uploads: UploadState,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for UploadState {
    fn from_ref(app_state: &AppState) -> UploadState {
        app_state.uploads.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Rejects requests without a verified principal (401) before they reach the
/// authenticated handlers.
async fn auth_middleware(_principal: AuthPrincipal, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// ProtectedView
///
/// Middleware state for one protected view: the app services plus the view's policy.
#[derive(Clone)]
pub struct ProtectedView {
    pub state: AppState,
    pub policy: AccessPolicy,
}

/// access_guard
///
/// Server-side rendition of the access guard. Each request is one evaluation
/// cycle over a fresh snapshot (the server never has a pending identity
/// provider, so `loading` is always false):
/// - `Granted`: the profile is attached as an extension and the handler runs.
/// - `Unauthenticated` / `PolicyDenied`: 303 to `/login` / `/unauthorized`.
/// - `Resolving`: 202 placeholder, no redirect.
pub(crate) async fn access_guard(
    State(view): State<ProtectedView>,
    request: Request,
    next: Next,
) -> Response {
    let (mut parts, body) = request.into_parts();

    let principal = AuthPrincipal::from_request_parts(&mut parts, &view.state)
        .await
        .ok()
        .map(|AuthPrincipal(p)| p);

    let resolved = parts.extensions.remove::<ResolvedProfile>();
    let profile = match (&principal, resolved) {
        (Some(_), Some(ResolvedProfile(profile))) => profile,
        (Some(p), None) => view.state.repo.get_profile(&p.uid).await,
        (None, _) => None,
    };

    let snapshot = AuthSnapshot {
        principal,
        profile,
        loading: false,
    };

    let decision = guard::evaluate(&snapshot, &view.policy);
    tracing::debug!(path = %parts.uri.path(), state = decision.as_str(), "access guard");

    if decision == GuardState::Granted {
        let mut request = Request::from_parts(parts, body);
        if let Some(profile) = snapshot.profile {
            request.extensions_mut().insert(profile);
        }
        return next.run(request).await;
    }

    match decision.redirect() {
        Some(target) => Redirect::to(target.as_str()).into_response(),
        None => (
            StatusCode::ACCEPTED,
            Json(PlaceholderResponse {
                state: decision.as_str().to_string(),
            }),
        )
            .into_response(),
    }
}

/// create_router
///
/// Assembles the routing structure, applies scoped and global middleware and
/// registers the application state.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes()
                .route_layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware,
                )),
        )
        // Each dashboard carries its own guard layer.
        .merge(dashboards::dashboard_routes(&state))
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(
                    x_request_id.clone(),
                    MakeRequestUuid,
                ))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Request span carrying method, URI and the `x-request-id` so every log line of
/// a request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_documents_every_dashboard() {
        let openapi = ApiDoc::openapi();

        for route in routing::all_dashboard_routes() {
            let item = openapi
                .paths
                .paths
                .get(route.as_str())
                .unwrap_or_else(|| panic!("{route} missing from the OpenAPI document"));
            assert!(item.get.is_some());
        }

        let cab = openapi.paths.paths.get("/worker/cab").unwrap();
        assert_eq!(
            cab.get.as_ref().unwrap().operation_id.as_deref(),
            Some("dashboard_worker_cab")
        );
    }
}
