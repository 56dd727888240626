use agent_console::{
    AccessConfig, AccessRouter, AppConfig, AppState, MockIdentityProvider, MockObjectIdentifier,
    MockResultStore, Registry, ResultStoreState, create_router,
    models::{AnalyzeImageResponse, DashboardSummary},
    registry::{AgentDefinition, ToolDefinition},
    results::MockStoreFailure,
};
use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use std::sync::Arc;
use tower::util::ServiceExt;

const SESSION: &str = "fb-studio-auth-session=mock-uid-1";
// 1x1 PNG signature bytes; enough for validation, the mock model never looks at it.
const PNG_DATA_URI: &str = "data:image/png;base64,iVBORw0KGgo=";

fn app(identifier: MockObjectIdentifier, results: Option<ResultStoreState>) -> axum::Router {
    let state = AppState {
        access: Arc::new(AccessRouter::new(AccessConfig::default()).unwrap()),
        identity: Arc::new(MockIdentityProvider::new()),
        identifier: Arc::new(identifier),
        results,
        registry: Arc::new(Registry::builtin()),
        config: AppConfig::default(),
    };
    create_router(state)
}

async fn get_json<T: serde::de::DeserializeOwned>(app: axum::Router, uri: &str) -> (StatusCode, Option<T>) {
    let response = app
        .oneshot(
            Request::builder()
                .uri(uri)
                .header(header::COOKIE, SESSION)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).ok())
}

async fn analyze(app: axum::Router, data_uri: &str) -> (StatusCode, AnalyzeImageResponse) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/analyze")
                .header("Content-Type", "application/json")
                .header(header::COOKIE, SESSION)
                .body(Body::from(
                    serde_json::json!({ "photo_data_uri": data_uri }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_health_check() {
    let response = app(MockObjectIdentifier::default(), None)
        .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_openapi_document_is_public() {
    let response = app(MockObjectIdentifier::default(), None)
        .oneshot(
            Request::builder()
                .uri("/api/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let doc: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert!(doc["paths"]["/api/analyze"].is_object());
}

#[tokio::test]
async fn test_registry_requires_session() {
    let response = app(MockObjectIdentifier::default(), None)
        .oneshot(Request::builder().uri("/api/agents").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get(header::LOCATION).is_none());
}

#[tokio::test]
async fn test_list_agents_with_tools() {
    let (status, agents) =
        get_json::<Vec<AgentDefinition>>(app(MockObjectIdentifier::default(), None), "/api/agents")
            .await;
    let agents = agents.unwrap();

    assert_eq!(status, StatusCode::OK);
    assert_eq!(agents.len(), 1);
    assert_eq!(agents[0].id, "agent-object-identification");
    assert_eq!(agents[0].associated_tools[0].name, "identifyObjectsInImage");
    assert_eq!(agents[0].output_schema["required"][0], "objects");
}

#[tokio::test]
async fn test_get_agent_by_id() {
    let (status, agent) = get_json::<AgentDefinition>(
        app(MockObjectIdentifier::default(), None),
        "/api/agents/agent-object-identification",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(agent.unwrap().name, "Object Identification Agent");

    let (status, agent) = get_json::<AgentDefinition>(
        app(MockObjectIdentifier::default(), None),
        "/api/agents/agent-unknown",
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(agent.is_none());
}

#[tokio::test]
async fn test_list_tools_and_dashboard() {
    let (status, tools) =
        get_json::<Vec<ToolDefinition>>(app(MockObjectIdentifier::default(), None), "/api/tools")
            .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tools.unwrap().len(), 1);

    let (status, summary) =
        get_json::<DashboardSummary>(app(MockObjectIdentifier::default(), None), "/api/dashboard")
            .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        summary.unwrap(),
        DashboardSummary {
            agent_count: 1,
            tool_count: 1
        }
    );
}

#[tokio::test]
async fn test_analyze_logs_identified_objects() {
    let store = Arc::new(MockResultStore::new());
    let router = app(
        MockObjectIdentifier::returning(&["cat", "sofa"]),
        Some(store.clone() as ResultStoreState),
    );

    let (status, body) = analyze(router, PNG_DATA_URI).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, AnalyzeImageResponse::identified(vec!["cat".into(), "sofa".into()]));

    let records = store.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].objects, vec!["cat", "sofa"]);
}

#[tokio::test]
async fn test_analyze_skips_logging_when_nothing_found() {
    let store = Arc::new(MockResultStore::new());
    let router = app(
        MockObjectIdentifier::returning(&[]),
        Some(store.clone() as ResultStoreState),
    );

    let (status, body) = analyze(router, PNG_DATA_URI).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.data, Some(vec![]));
    assert!(store.records().is_empty());
}

#[tokio::test]
async fn test_analyze_without_results_store() {
    let (status, body) = analyze(app(MockObjectIdentifier::returning(&["lamp"]), None), PNG_DATA_URI).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.success);
}

#[tokio::test]
async fn test_analyze_model_failure() {
    let (status, body) = analyze(app(MockObjectIdentifier::new_failing(), None), PNG_DATA_URI).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(!body.success);
    assert!(
        body.error
            .unwrap()
            .starts_with("Failed to analyze image with AI. Details: ")
    );
}

#[tokio::test]
async fn test_analyze_store_permission_denied() {
    let store = Arc::new(MockResultStore::failing_with(MockStoreFailure::PermissionDenied));
    let router = app(
        MockObjectIdentifier::returning(&["cat"]),
        Some(store as ResultStoreState),
    );

    let (status, body) = analyze(router, PNG_DATA_URI).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(
        body.error.as_deref(),
        Some(
            "Image analyzed, but failed to save results to the database. Details: Permission denied. Check Firebase rules."
        )
    );
}

#[tokio::test]
async fn test_analyze_store_unavailable() {
    let store = Arc::new(MockResultStore::failing_with(MockStoreFailure::Unavailable));
    let router = app(
        MockObjectIdentifier::returning(&["cat"]),
        Some(store as ResultStoreState),
    );

    let (_, body) = analyze(router, PNG_DATA_URI).await;

    let error = body.error.unwrap();
    assert!(error.starts_with("Image analyzed, but failed to save results to the database."));
    assert!(error.contains("Mock Store Error"));
}

#[tokio::test]
async fn test_analyze_rejects_bad_image() {
    let (status, body) = analyze(app(MockObjectIdentifier::returning(&["cat"]), None), "").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body.error.as_deref(), Some("Image data URI cannot be empty."));

    let (status, body) = analyze(
        app(MockObjectIdentifier::returning(&["cat"]), None),
        "data:application/pdf;base64,JVBERi0=",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.error.unwrap().contains("application/pdf"));
}

#[tokio::test]
async fn test_analyze_requires_session() {
    let response = app(MockObjectIdentifier::returning(&["cat"]), None)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/analyze")
                .header("Content-Type", "application/json")
                .body(Body::from(
                    serde_json::json!({ "photo_data_uri": PNG_DATA_URI }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
