use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::{IntoResponse, Response},
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod retry;

pub mod routes;
use auth::AuthUser;
use routes::{authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::{ApiError, RepoError};
pub use repository::{PostgresRepository, Repository, RepositoryState};
pub use retry::RetryPolicy;

/// ApiDoc
///
/// OpenAPI document for the note endpoints, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(handlers::store_note, handlers::update_note, handlers::destroy_note),
    components(
        schemas(
            models::CreateNoteRequest, models::UpdateNoteRequest, models::MessageResponse,
            models::ErrorResponse, models::Note, models::Section,
        )
    ),
    tags(
        (name = "chronicle-notes", description = "Notes attached to document sections")
    )
)]
struct ApiDoc;

/// AppState
///
/// Shared, cheaply clonable container for the services every request needs.
#[derive(Clone)]
pub struct AppState {
    /// Persistence layer.
    pub repo: RepositoryState,
    /// The loaded, immutable configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Rejects the request with 401 before the handler runs unless `AuthUser` resolves.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// admin_middleware
///
/// Only lets callers holding the `admin` role through.
async fn admin_middleware(AuthUser { role, .. }: AuthUser, request: Request, next: Next) -> Response {
    if role != "admin" {
        return ApiError::Forbidden("Administrator role required".to_string()).into_response();
    }
    next.run(request).await
}

/// apply_auth_middlewares
///
/// Layers the router with each middleware named in the configuration, in order.
/// Unknown names are skipped with a warning so a typo never takes the service down.
fn apply_auth_middlewares(router: Router<AppState>, state: &AppState) -> Router<AppState> {
    state
        .config
        .auth_middlewares
        .iter()
        .fold(router, |router, name| match name.as_str() {
            "auth" => router.route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
            "admin" => router.route_layer(middleware::from_fn_with_state(
                state.clone(),
                admin_middleware,
            )),
            unknown => {
                tracing::warn!(middleware = unknown, "unknown auth middleware name, skipping");
                router
            }
        })
}

/// create_router
///
/// Assembles the routing structure, applies global and scoped middleware, and
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
        .merge(apply_auth_middlewares(
            authenticated::authenticated_routes(),
            &state,
        ))
        .with_state(state);

    // Observability: request id generation, a tracing span per request, and id propagation.
    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
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
/// Builds the per-request span so every log line of a request carries its `x-request-id`.
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
