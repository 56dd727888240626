use crate::{AppState, handlers};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

/// Request body cap for the analysis endpoint: a 4 MiB image grows by a third once
/// base64-encoded, plus the JSON envelope.
const ANALYZE_BODY_LIMIT: usize = 8 * 1024 * 1024;

/// Authenticated Router Module
///
/// JSON API for the admin panel. These paths live under the API bypass prefix, so the
/// access gate lets them through untouched. Every handler takes a `SessionUser`, whose
/// extractor answers 401 when the session cookie is missing.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        .route("/api/session", get(handlers::get_session))
        // GET /api/agents
        // Registered agents, each with the tools it is configured to use.
        .route("/api/agents", get(handlers::list_agents))
        .route("/api/agents/{id}", get(handlers::get_agent))
        .route("/api/tools", get(handlers::list_tools))
        .route("/api/dashboard", get(handlers::get_dashboard))
        // POST /api/analyze
        // Forwards the uploaded image to the vision model and logs non-empty results.
        .route(
            "/api/analyze",
            post(handlers::analyze_image).layer(DefaultBodyLimit::max(ANALYZE_BODY_LIMIT)),
        )
}
