use crate::{AppState, gate::AccessRouter, handlers, pages};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a session. The login and signup pages are mounted wherever
/// the access configuration puts them, so the gate's redirect target always has a handler.
/// They are still classified by the gate: an authenticated visitor opening them is bounced
/// to the landing page.
pub fn public_routes(access: &AccessRouter) -> Router<AppState> {
    Router::new()
        .route(access.login_path(), get(pages::login_page))
        .route(access.signup_path(), get(pages::signup_page))
        // GET /api/health
        // Load balancer probe. Under the API prefix, so never redirected.
        .route("/api/health", get(|| async { "ok" }))
        // POST /api/auth/{signup,login,logout}
        // JSON for API clients; the HTML forms post urlencoded bodies and get a 303 back.
        .route("/api/auth/signup", post(handlers::sign_up))
        .route("/api/auth/login", post(handlers::login))
        .route("/api/auth/logout", post(handlers::logout))
}
