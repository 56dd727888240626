use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

// --- Request Payloads (Input Schemas) ---

/// Credentials
///
/// Input payload for signup (POST /api/auth/signup) and login (POST /api/auth/login).
/// The password is forwarded to the identity provider and never logged or stored.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct Credentials {
    #[schema(example = "admin@example.com")]
    pub email: String,
    pub password: String,
    /// Page to return to after login, as received in the login page's `redirect` parameter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
}

impl Credentials {
    /// validate
    ///
    /// Returns every violated rule, joined with ", ".
    pub fn validate(&self) -> Result<(), String> {
        let mut errors = Vec::new();
        if !is_email(&self.email) {
            errors.push("Invalid email address.");
        }
        if self.password.chars().count() < 6 {
            errors.push("Password must be at least 6 characters.");
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors.join(", "))
        }
    }
}

fn is_email(candidate: &str) -> bool {
    let Some((local, domain)) = candidate.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !candidate.chars().any(char::is_whitespace)
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
}

/// AnalyzeImageRequest
///
/// Input payload for POST /api/analyze.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AnalyzeImageRequest {
    /// `data:<mimetype>;base64,<encoded_data>`
    #[schema(example = "data:image/png;base64,iVBORw0KGgo=")]
    pub photo_data_uri: String,
}

// --- Response Schemas (Output) ---

/// AuthResponse
///
/// Outcome of signup, login and logout. `redirect_to` tells the client where to go next.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct AuthResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AuthResponse {
    pub fn signed_in(user_id: String, redirect_to: String) -> Self {
        Self {
            success: true,
            user_id: Some(user_id),
            redirect_to: Some(redirect_to),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

/// AnalyzeImageResponse
///
/// `{success: true, data: [...]}` or `{success: false, error: "..."}`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct AnalyzeImageResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnalyzeImageResponse {
    pub fn identified(objects: Vec<String>) -> Self {
        Self {
            success: true,
            data: Some(objects),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

/// SessionInfo
///
/// Output of GET /api/session.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct SessionInfo {
    pub user_id: String,
}

/// DashboardSummary
///
/// Counters shown on the admin dashboard (GET /api/dashboard).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct DashboardSummary {
    pub agent_count: usize,
    pub tool_count: usize,
}
