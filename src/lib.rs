use axum::{
    Router,
    extract::{FromRef, Request, State},
    http::HeaderName,
    middleware::{self, Next},
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;
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

// Request gating: the access router and its configuration.
pub mod gate;

// Core application services and components.
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod inference;
pub mod models;
pub mod pages;
pub mod registry;
pub mod results;

// Module for routing segregation (Public, Authenticated, Admin).
pub mod routes;
use auth::session_token;
use gate::AccessState;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use gate::{AccessConfig, AccessRouter};
pub use identity::{FirebaseIdentityClient, IdentityState, MockIdentityProvider};
pub use inference::{GeminiClient, IdentifierState, MockObjectIdentifier};
pub use registry::Registry;
pub use results::{FirebaseResultStore, MockResultStore, ResultStoreState};

/// ApiDoc
///
/// OpenAPI document for the JSON API, served at `/api/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::sign_up, handlers::login, handlers::logout, handlers::get_session,
        handlers::list_agents, handlers::get_agent, handlers::list_tools, handlers::get_dashboard,
        handlers::analyze_image
    ),
    components(
        schemas(
            models::Credentials, models::AuthResponse, models::AnalyzeImageRequest,
            models::AnalyzeImageResponse, models::SessionInfo, models::DashboardSummary,
            registry::AgentDefinition, registry::ToolDefinition,
        )
    ),
    tags(
        (name = "agent-console", description = "Agent Console API")
    )
)]
struct ApiDoc;

/// AppState
///
/// Single, immutable container holding every service the handlers need. Cloned per request;
/// every field is either `Arc`-backed or cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// Access router: decides continue/redirect for every request.
    pub access: AccessState,
    /// External account service (signup/login).
    pub identity: IdentityState,
    /// Remote vision model.
    pub identifier: IdentifierState,
    /// Results log. `None` disables logging; analysis still works.
    pub results: Option<ResultStoreState>,
    /// Statically registered agents and tools.
    pub registry: Arc<Registry>,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for AccessState {
    fn from_ref(app_state: &AppState) -> AccessState {
        app_state.access.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// access_gate
///
/// Applies the access router's verdict before any handler runs. The router only sees the
/// path, the raw query and whether the session cookie is present; this function owns the
/// HTTP side (reading the cookie, issuing the 307).
async fn access_gate(State(access): State<AccessState>, request: Request, next: Next) -> Response {
    let has_session = session_token(request.headers(), access.cookie_name()).is_some();
    let path = request.uri().path().to_owned();
    let query = request.uri().query().unwrap_or("");

    let verdict = access.decide(&path, query, has_session);
    tracing::debug!(%path, has_session, ?verdict, "access decision");

    match verdict.location() {
        None => next.run(request).await,
        Some(location) => {
            tracing::info!(%path, %location, "redirecting");
            Redirect::temporary(&location).into_response()
        }
    }
}

/// create_router
///
/// Assembles the routing structure, installs the access gate, and registers the state.
/// Page routes follow the access configuration, so every redirect target the gate can
/// issue has a handler behind it.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/api/docs").url("/api/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes(&state.access))
        .merge(authenticated::authenticated_routes())
        .merge(admin::admin_routes(&state.access))
        // Outermost application layer: runs for every path, including unmatched ones.
        .layer(middleware::from_fn_with_state(
            state.access.clone(),
            access_gate,
        ))
        .with_state(state);

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
/// Span per request carrying method, URI and the `x-request-id` generated above, so every
/// log line for one request can be correlated.
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
