use crate::{
    AppState,
    gate::{AccessRouter, RouteClass},
    pages,
};
use axum::{
    Router,
    routing::{MethodRouter, get},
};

pub const DASHBOARD_PATH: &str = "/admin/dashboard";
pub const AGENTS_PATH: &str = "/admin/agents";
pub const TOOLS_PATH: &str = "/admin/tools";
pub const PLAYGROUND_PATH: &str = "/admin/playground";

/// Admin Router Module
///
/// `/` and the panel pages. Protected by the access gate: without a session cookie the gate
/// answers with a redirect to the login page before these handlers run.
///
/// The configured landing page always gets a handler. When it is not one of the panel
/// pages it serves the dashboard, and when it is `/` the root serves the dashboard instead
/// of forwarding to itself. A panel path reused as an auth page is left to the auth page.
pub fn admin_routes(access: &AccessRouter) -> Router<AppState> {
    let landing = access.landing_path();

    let root: MethodRouter<AppState> = if landing == "/" {
        get(pages::dashboard_page)
    } else {
        // GET /
        // An authenticated visitor is forwarded to the landing page.
        get(pages::home)
    };

    let pages: [(&str, MethodRouter<AppState>); 5] = [
        ("/", root),
        (DASHBOARD_PATH, get(pages::dashboard_page)),
        (AGENTS_PATH, get(pages::agents_page)),
        (TOOLS_PATH, get(pages::tools_page)),
        // GET /admin/playground
        // Upload form that drives POST /api/analyze.
        (PLAYGROUND_PATH, get(pages::playground_page)),
    ];

    let mut router = Router::new();
    let mut landing_served = false;
    for (path, page) in pages {
        if access.classify(path) == RouteClass::PublicAuthPage {
            continue;
        }
        landing_served |= path == landing;
        router = router.route(path, page);
    }

    if !landing_served {
        router = router.route(landing, get(pages::dashboard_page));
    }
    router
}
