use agent_console::{
    AccessRouter, AppState, FirebaseIdentityClient, FirebaseResultStore, GeminiClient, Registry,
    ResultStoreState,
    config::{AppConfig, Env},
    create_router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Entry point: configuration, logging, external clients, then the HTTP server.
#[tokio::main]
async fn main() {
    // 1. Configuration & Environment Loading (Fail-Fast)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging Filter Setup
    // RUST_LOG wins; otherwise verbose for this crate and the HTTP stack.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "agent_console=debug,tower_http=info,axum=trace".into());

    // 3. Initialize Logging based on Environment
    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            // JSON lines for log aggregation.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 4. Access Router
    // A configuration that could loop (e.g. landing page == login page) is refused here.
    let access = AccessRouter::new(config.access.clone())
        .expect("FATAL: Invalid access configuration. Check LOGIN_PATH/SIGNUP_PATH/LANDING_PATH/BYPASS_PREFIXES.");
    tracing::info!(
        login = %access.login_path(),
        landing = %access.landing_path(),
        cookie = %access.cookie_name(),
        "access gate configured"
    );

    // 5. External Services
    let identity = Arc::new(FirebaseIdentityClient::new(
        &config.identity_base_url,
        &config.firebase_api_key,
    ));
    let identifier = Arc::new(GeminiClient::new(
        &config.gemini_base_url,
        &config.gemini_api_key,
        &config.gemini_model,
    ));
    let results = config.firebase_database_url.as_deref().map(|url| {
        tracing::info!("Logging identification results to {}", url);
        Arc::new(FirebaseResultStore::new(url)) as ResultStoreState
    });
    if results.is_none() {
        tracing::warn!("FIREBASE_DATABASE_URL not set; identification results will not be logged.");
    }

    // 6. Unified State Assembly
    let app_state = AppState {
        access: Arc::new(access),
        identity,
        identifier,
        results,
        registry: Arc::new(Registry::builtin()),
        config: config.clone(),
    };

    // 7. Router and Server Startup
    let app = create_router(app_state);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .expect("FATAL: Failed to bind the HTTP listener. Check BIND_ADDR.");

    tracing::info!("Listening on {}", config.bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at /api/docs");

    axum::serve(listener, app)
        .await
        .expect("FATAL: HTTP server terminated unexpectedly.");
}
