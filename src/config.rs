use std::env;

use crate::gate::AccessConfig;

pub const DEFAULT_IDENTITY_BASE_URL: &str = "https://identitytoolkit.googleapis.com";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";

/// AppConfig
///
/// Holds the application's entire configuration state. Loaded once at startup and never
/// mutated; handlers reach it through `FromRef` like every other piece of `AppState`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls log format and the `Secure` cookie attribute.
    pub env: Env,
    // Socket address the HTTP server binds to.
    pub bind_addr: String,
    // Login/signup/landing paths, bypass prefixes and the session cookie name.
    pub access: AccessConfig,
    // Web API key for the Firebase Identity Toolkit (email/password accounts).
    pub firebase_api_key: String,
    // Realtime Database root. When absent, analysis results are not logged anywhere.
    pub firebase_database_url: Option<String>,
    // API key for the Gemini generative model.
    pub gemini_api_key: String,
    // Gemini model used for object identification.
    pub gemini_model: String,
    pub identity_base_url: String,
    pub gemini_base_url: String,
}

/// Env
///
/// Defines the runtime context: pretty logs and plain cookies locally, JSON logs and
/// `Secure` cookies in production.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// Safe, non-panicking values for test state setup.
    fn default() -> Self {
        Self {
            env: Env::Local,
            bind_addr: "127.0.0.1:3000".to_string(),
            access: AccessConfig::default(),
            firebase_api_key: "test-firebase-key".to_string(),
            firebase_database_url: None,
            gemini_api_key: "test-gemini-key".to_string(),
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            identity_base_url: DEFAULT_IDENTITY_BASE_URL.to_string(),
            gemini_base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads every parameter from the environment and implements the **fail-fast** principle.
    ///
    /// # Panics
    /// Panics if a secret required in production is missing, or if `FIREBASE_DATABASE_URL`
    /// is set but does not point at a Realtime Database instance.
    pub fn load() -> Self {
        let env_str = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let env = match env_str.as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        let (firebase_api_key, gemini_api_key) = match env {
            Env::Production => (
                env::var("FIREBASE_API_KEY")
                    .expect("FATAL: FIREBASE_API_KEY must be set in production."),
                env::var("GEMINI_API_KEY")
                    .expect("FATAL: GEMINI_API_KEY must be set in production."),
            ),
            // Local runs fall back to placeholders; remote calls will fail but the gate and
            // the registry remain usable.
            Env::Local => (
                env::var("FIREBASE_API_KEY").unwrap_or_default(),
                env::var("GEMINI_API_KEY").unwrap_or_default(),
            ),
        };

        let firebase_database_url = env::var("FIREBASE_DATABASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());
        if let Some(url) = &firebase_database_url {
            if !is_realtime_database_url(url) {
                panic!(
                    "FATAL: Invalid FIREBASE_DATABASE_URL. Received: \"{}\". Expected \
                     'https://<PROJECT_ID>-default-rtdb.firebaseio.com' or \
                     'https://<PROJECT_ID>.firebaseio.com'.",
                    url
                );
            }
        }

        Self {
            env,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            access: access_from_env(),
            firebase_api_key,
            firebase_database_url,
            gemini_api_key,
            gemini_model: env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.to_string()),
            identity_base_url: env::var("IDENTITY_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_IDENTITY_BASE_URL.to_string()),
            gemini_base_url: env::var("GEMINI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_GEMINI_BASE_URL.to_string()),
        }
    }

    /// Whether session cookies carry the `Secure` attribute.
    pub fn secure_cookies(&self) -> bool {
        self.env == Env::Production
    }
}

fn access_from_env() -> AccessConfig {
    let defaults = AccessConfig::default();

    let bypass_prefixes = match env::var("BYPASS_PREFIXES") {
        Ok(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|prefix| !prefix.is_empty())
            .map(str::to_string)
            .collect(),
        Err(_) => defaults.bypass_prefixes,
    };

    AccessConfig {
        login_path: env::var("LOGIN_PATH").unwrap_or(defaults.login_path),
        signup_path: env::var("SIGNUP_PATH").unwrap_or(defaults.signup_path),
        landing_path: env::var("LANDING_PATH").unwrap_or(defaults.landing_path),
        bypass_prefixes,
        cookie_name: env::var("AUTH_COOKIE_NAME").unwrap_or(defaults.cookie_name),
    }
}

/// is_realtime_database_url
///
/// A Realtime Database root must be served over HTTPS from `firebaseio.com`.
pub fn is_realtime_database_url(url: &str) -> bool {
    url.starts_with("https://") && url.contains(".firebaseio.com")
}
