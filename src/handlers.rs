use crate::{
    AppState,
    auth::{SessionUser, cleared_session_cookie, session_cookie},
    error::ServiceError,
    inference::PhotoDataUri,
    models::{
        AnalyzeImageRequest, AnalyzeImageResponse, AuthResponse, Credentials, DashboardSummary,
        SessionInfo,
    },
    registry::{AgentDefinition, ToolDefinition},
    results::IdentificationRecord,
};
use axum::{
    Form, Json,
    extract::{FromRequest, Path, Request, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Redirect, Response},
};
use serde::de::DeserializeOwned;

// --- Extractors ---

/// Submission
///
/// A request body accepted either as JSON (API clients, scripts) or as
/// `application/x-www-form-urlencoded` (the plain HTML auth forms). Form submissions are
/// answered with a 303 so the browser lands on a page instead of a JSON document.
#[derive(Debug)]
pub enum Submission<T> {
    Json(T),
    Form(T),
}

impl<T> Submission<T> {
    fn into_parts(self) -> (T, bool) {
        match self {
            Submission::Json(value) => (value, false),
            Submission::Form(value) => (value, true),
        }
    }
}

impl<S, T> FromRequest<S> for Submission<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = Response;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        if is_form(request.headers()) {
            let Form(value) = Form::<T>::from_request(request, state)
                .await
                .map_err(IntoResponse::into_response)?;
            Ok(Submission::Form(value))
        } else {
            let Json(value) = Json::<T>::from_request(request, state)
                .await
                .map_err(IntoResponse::into_response)?;
            Ok(Submission::Json(value))
        }
    }
}

fn is_form(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|content_type| {
            content_type.starts_with("application/x-www-form-urlencoded")
        })
}

// --- Helpers ---

/// Message shown when a provider failure carries no explanation of its own.
fn provider_message(error: &ServiceError, fallback: &str) -> String {
    match error {
        ServiceError::Upstream { message, .. } if !message.is_empty() => message.clone(),
        _ => fallback.to_string(),
    }
}

/// Where a failed form submission sends the browser: back to its page, with the error and
/// the pending `redirect` in the query.
fn form_failure_location(page: &str, error: &str, redirect: Option<&str>) -> String {
    let mut location = format!("{}?error={}", page, urlencoding::encode(error));
    if let Some(redirect) = redirect.filter(|r| !r.is_empty()) {
        location.push_str("&redirect=");
        location.push_str(&urlencoding::encode(redirect));
    }
    location
}

/// The page a form submission came from, and its pending `redirect`.
struct FormOrigin<'a> {
    page: &'a str,
    redirect: Option<&'a str>,
}

type AuthOutcome = Result<(String, String), (StatusCode, String)>;

/// Turns a signup/login outcome into a response: JSON for API callers, a 303 for forms.
/// A successful outcome is `(user_id, redirect_to)` and always sets the session cookie.
fn auth_reply(state: &AppState, outcome: AuthOutcome, origin: Option<FormOrigin<'_>>) -> Response {
    let (user_id, redirect_to) = match outcome {
        Ok(signed_in) => signed_in,
        Err((status, error)) => {
            return match origin {
                Some(origin) => Redirect::to(&form_failure_location(
                    origin.page,
                    &error,
                    origin.redirect,
                ))
                .into_response(),
                None => (status, Json(AuthResponse::failed(error))).into_response(),
            };
        }
    };

    let cookie = match session_cookie(
        state.access.cookie_name(),
        &user_id,
        state.config.secure_cookies(),
    ) {
        Ok(cookie) => cookie,
        Err(e) => {
            tracing::error!("user id is not a valid cookie value: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(AuthResponse::failed("Failed to start a session.")),
            )
                .into_response();
        }
    };

    match origin {
        Some(_) => ([(header::SET_COOKIE, cookie)], Redirect::to(&redirect_to)).into_response(),
        None => (
            StatusCode::OK,
            [(header::SET_COOKIE, cookie)],
            Json(AuthResponse::signed_in(user_id, redirect_to)),
        )
            .into_response(),
    }
}

// --- Handlers ---

/// sign_up
///
/// [Public Route] Creates an account with the identity provider and opens a session.
/// New accounts always land on the landing page.
#[utoipa::path(
    post,
    path = "/api/auth/signup",
    request_body = Credentials,
    responses(
        (status = 200, description = "Account created, session cookie set", body = AuthResponse),
        (status = 303, description = "Form submission: landing page on success, signup page with `error` otherwise"),
        (status = 400, description = "Invalid credentials or rejected by the provider", body = AuthResponse)
    )
)]
pub async fn sign_up(
    State(state): State<AppState>,
    submission: Submission<Credentials>,
) -> Response {
    let (payload, from_form) = submission.into_parts();

    let outcome = match payload.validate() {
        Err(message) => Err((StatusCode::BAD_REQUEST, message)),
        Ok(()) => match state.identity.sign_up(&payload.email, &payload.password).await {
            Ok(user_id) => {
                tracing::info!(%user_id, "account created");
                Ok((user_id, state.access.landing_path().to_string()))
            }
            Err(e) => {
                tracing::error!("Signup Error: {}", e);
                Err((
                    StatusCode::BAD_REQUEST,
                    provider_message(&e, "Failed to create account."),
                ))
            }
        },
    };

    let origin = from_form.then(|| FormOrigin {
        page: state.access.signup_path(),
        redirect: None,
    });
    auth_reply(&state, outcome, origin)
}

/// login
///
/// [Public Route] Verifies credentials with the identity provider and opens a session.
/// `redirect_to` echoes the login page's `redirect` parameter when it is a safe local path.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = Credentials,
    responses(
        (status = 200, description = "Signed in, session cookie set", body = AuthResponse),
        (status = 303, description = "Form submission: `redirect_to` on success, login page with `error` otherwise"),
        (status = 400, description = "Invalid credentials format", body = AuthResponse),
        (status = 401, description = "Rejected by the provider", body = AuthResponse)
    )
)]
pub async fn login(State(state): State<AppState>, submission: Submission<Credentials>) -> Response {
    let (payload, from_form) = submission.into_parts();

    let outcome = match payload.validate() {
        Err(message) => Err((StatusCode::BAD_REQUEST, message)),
        Ok(()) => match state.identity.sign_in(&payload.email, &payload.password).await {
            Ok(user_id) => {
                let target = state.access.post_login_target(payload.redirect.as_deref());
                tracing::info!(%user_id, redirect_to = %target, "signed in");
                Ok((user_id, target))
            }
            Err(e) => {
                tracing::error!("Login Error: {}", e);
                Err((
                    StatusCode::UNAUTHORIZED,
                    provider_message(&e, "Invalid email or password."),
                ))
            }
        },
    };

    let origin = from_form.then(|| FormOrigin {
        page: state.access.login_path(),
        redirect: payload.redirect.as_deref(),
    });
    auth_reply(&state, outcome, origin)
}

/// logout
///
/// [Public Route] Clears the session cookie. Succeeds whether or not a session existed.
/// The sign-out button in the page header posts here as a form and is sent to the login page.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Session cleared", body = AuthResponse),
        (status = 303, description = "Form submission: session cleared, sent to the login page")
    )
)]
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let login_path = state.access.login_path();

    let cookie = match cleared_session_cookie(state.access.cookie_name(), state.config.secure_cookies()) {
        Ok(cookie) => cookie,
        Err(e) => {
            tracing::error!("cookie name is not a valid header value: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(AuthResponse::failed("Failed to sign out.")),
            )
                .into_response();
        }
    };

    if is_form(&headers) {
        return ([(header::SET_COOKIE, cookie)], Redirect::to(login_path)).into_response();
    }

    let body = AuthResponse {
        success: true,
        redirect_to: Some(login_path.to_string()),
        ..AuthResponse::default()
    };
    (StatusCode::OK, [(header::SET_COOKIE, cookie)], Json(body)).into_response()
}

/// get_session
///
/// [Session Route] Returns the user id carried by the session cookie.
#[utoipa::path(
    get,
    path = "/api/session",
    responses(
        (status = 200, description = "Current session", body = SessionInfo),
        (status = 401, description = "No session")
    )
)]
pub async fn get_session(SessionUser { user_id }: SessionUser) -> Json<SessionInfo> {
    Json(SessionInfo { user_id })
}

/// list_agents
///
/// [Session Route] Lists the registered agents with their associated tools.
#[utoipa::path(
    get,
    path = "/api/agents",
    responses((status = 200, description = "Registered agents", body = [AgentDefinition]))
)]
pub async fn list_agents(
    _session: SessionUser,
    State(state): State<AppState>,
) -> Json<Vec<AgentDefinition>> {
    Json(state.registry.agents().to_vec())
}

/// get_agent
///
/// [Session Route] A single agent by id.
#[utoipa::path(
    get,
    path = "/api/agents/{id}",
    params(("id" = String, Path, description = "Agent id")),
    responses(
        (status = 200, description = "The agent", body = AgentDefinition),
        (status = 404, description = "No agent with this id")
    )
)]
pub async fn get_agent(
    _session: SessionUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AgentDefinition>, StatusCode> {
    state
        .registry
        .agent(&id)
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

/// list_tools
///
/// [Session Route] Lists the tools agents can invoke.
#[utoipa::path(
    get,
    path = "/api/tools",
    responses((status = 200, description = "Available tools", body = [ToolDefinition]))
)]
pub async fn list_tools(
    _session: SessionUser,
    State(state): State<AppState>,
) -> Json<Vec<ToolDefinition>> {
    Json(state.registry.tools().to_vec())
}

/// get_dashboard
///
/// [Session Route] Agent and tool counters for the dashboard.
#[utoipa::path(
    get,
    path = "/api/dashboard",
    responses((status = 200, description = "Dashboard counters", body = DashboardSummary))
)]
pub async fn get_dashboard(
    _session: SessionUser,
    State(state): State<AppState>,
) -> Json<DashboardSummary> {
    Json(state.registry.summary())
}

/// analyze_image
///
/// [Session Route] Sends an uploaded image to the vision model and, when a results store is
/// configured and at least one object came back, logs the result.
///
/// *Failure semantics*: a model failure and a logging failure are both reported as
/// `success: false` (502). A logging failure therefore hides an otherwise good analysis,
/// so the user knows the result was not recorded.
#[utoipa::path(
    post,
    path = "/api/analyze",
    request_body = AnalyzeImageRequest,
    responses(
        (status = 200, description = "Objects identified", body = AnalyzeImageResponse),
        (status = 400, description = "Invalid image", body = AnalyzeImageResponse),
        (status = 502, description = "Model or results store failed", body = AnalyzeImageResponse)
    )
)]
pub async fn analyze_image(
    SessionUser { user_id }: SessionUser,
    State(state): State<AppState>,
    Json(payload): Json<AnalyzeImageRequest>,
) -> Response {
    let photo = match PhotoDataUri::parse(&payload.photo_data_uri) {
        Ok(photo) => photo,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(AnalyzeImageResponse::failed(e.to_string())),
            )
                .into_response();
        }
    };

    let objects = match state.identifier.identify(&photo).await {
        Ok(objects) => objects,
        Err(e) => {
            tracing::error!(%user_id, "Error in AI analysis: {}", e);
            return (
                StatusCode::BAD_GATEWAY,
                Json(AnalyzeImageResponse::failed(format!(
                    "Failed to analyze image with AI. Details: {}",
                    e
                ))),
            )
                .into_response();
        }
    };

    tracing::info!(%user_id, mime = %photo.mime_type, count = objects.len(), "image analyzed");

    if let (Some(store), false) = (&state.results, objects.is_empty()) {
        let record = IdentificationRecord {
            objects: objects.clone(),
            captured_at: chrono::Utc::now(),
        };
        if let Err(e) = store.record(&record).await {
            tracing::error!("Error saving identification results: {}", e);
            let details = match e {
                ServiceError::PermissionDenied => {
                    "Permission denied. Check Firebase rules.".to_string()
                }
                other => other.to_string(),
            };
            return (
                StatusCode::BAD_GATEWAY,
                Json(AnalyzeImageResponse::failed(format!(
                    "Image analyzed, but failed to save results to the database. Details: {}",
                    details
                ))),
            )
                .into_response();
        }
    }

    (StatusCode::OK, Json(AnalyzeImageResponse::identified(objects))).into_response()
}
