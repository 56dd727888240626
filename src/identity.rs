use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::ServiceError;

// 1. IdentityProvider Contract
/// IdentityProvider
///
/// Abstract contract for the external account service. The console never stores
/// passwords: it forwards credentials and keeps only the returned user id, which becomes
/// the session cookie value.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Creates an email/password account and returns the provider's user id.
    async fn sign_up(&self, email: &str, password: &str) -> Result<String, ServiceError>;

    /// Verifies an email/password pair and returns the provider's user id.
    async fn sign_in(&self, email: &str, password: &str) -> Result<String, ServiceError>;
}

/// IdentityState
///
/// The concrete type used to share the identity provider across the application state.
pub type IdentityState = Arc<dyn IdentityProvider>;

// 2. The Real Implementation (Firebase Identity Toolkit)
/// FirebaseIdentityClient
///
/// Talks to the Identity Toolkit REST API (`accounts:signUp`, `accounts:signInWithPassword`).
#[derive(Clone)]
pub struct FirebaseIdentityClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl FirebaseIdentityClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    async fn call(&self, method: &str, email: &str, password: &str) -> Result<String, ServiceError> {
        let url = format!("{}/v1/accounts:{}", self.base_url, method);

        let response = self
            .http
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(&serde_json::json!({
                "email": email,
                "password": password,
                "returnSecureToken": true,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            // The toolkit reports failures as {"error": {"message": "EMAIL_EXISTS", ...}}.
            let message = response
                .json::<ErrorEnvelope>()
                .await
                .map(|envelope| envelope.error.message)
                .unwrap_or_else(|_| status.to_string());
            tracing::warn!(method, %status, %message, "identity provider rejected request");
            return Err(ServiceError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        let account = response
            .json::<AccountResponse>()
            .await
            .map_err(|e| ServiceError::Malformed(e.to_string()))?;
        Ok(account.local_id)
    }
}

#[async_trait]
impl IdentityProvider for FirebaseIdentityClient {
    async fn sign_up(&self, email: &str, password: &str) -> Result<String, ServiceError> {
        self.call("signUp", email, password).await
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<String, ServiceError> {
        self.call("signInWithPassword", email, password).await
    }
}

// 3. The Mock Implementation (For Tests)
/// MockIdentityProvider
///
/// In-memory account table used by the integration tests. User ids are deterministic
/// (`mock-uid-<n>`) so assertions can match the issued cookie.
#[derive(Default)]
pub struct MockIdentityProvider {
    accounts: Mutex<HashMap<String, (String, String)>>,
    /// When true, every call fails as if the provider were unreachable.
    pub should_fail: bool,
}

impl MockIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// Seeds an account, returning its user id.
    pub fn with_account(self, email: &str, password: &str) -> Self {
        let mut accounts = self.accounts.lock().unwrap_or_else(|e| e.into_inner());
        let uid = format!("mock-uid-{}", accounts.len() + 1);
        accounts.insert(email.to_string(), (password.to_string(), uid));
        drop(accounts);
        self
    }

    fn unavailable() -> ServiceError {
        ServiceError::Upstream {
            status: 503,
            message: "Mock Identity Error: Simulation requested".to_string(),
        }
    }
}

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    async fn sign_up(&self, email: &str, password: &str) -> Result<String, ServiceError> {
        if self.should_fail {
            return Err(Self::unavailable());
        }
        let mut accounts = self.accounts.lock().unwrap_or_else(|e| e.into_inner());
        if accounts.contains_key(email) {
            return Err(ServiceError::Upstream {
                status: 400,
                message: "EMAIL_EXISTS".to_string(),
            });
        }
        let uid = format!("mock-uid-{}", accounts.len() + 1);
        accounts.insert(email.to_string(), (password.to_string(), uid.clone()));
        Ok(uid)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<String, ServiceError> {
        if self.should_fail {
            return Err(Self::unavailable());
        }
        let accounts = self.accounts.lock().unwrap_or_else(|e| e.into_inner());
        match accounts.get(email) {
            Some((stored, uid)) if stored == password => Ok(uid.clone()),
            _ => Err(ServiceError::Upstream {
                status: 400,
                message: "INVALID_LOGIN_CREDENTIALS".to_string(),
            }),
        }
    }
}
