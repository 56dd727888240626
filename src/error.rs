use thiserror::Error;

/// ServiceError
///
/// Failure raised by one of the remote collaborators (identity provider, model API,
/// realtime database). Handlers translate it into an HTTP status plus a user-facing message.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The HTTP request never produced a usable response (DNS, TLS, timeout, body decode).
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The remote service answered with a non-success status and an explanatory message.
    #[error("{message}")]
    Upstream { status: u16, message: String },

    /// The remote database refused the write (security rules).
    #[error("permission denied")]
    PermissionDenied,

    /// The remote service answered successfully but the payload did not match the expected shape.
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// ConfigError
///
/// Raised when the access configuration could produce malformed redirects or a redirect loop.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("path `{0}` must start with '/'")]
    NotAbsolute(String),

    #[error("landing path `{0}` must not be the login or signup page")]
    LandingIsAuthPage(String),

    #[error("login and signup pages must differ, both are `{0}`")]
    SharedAuthPath(String),

    #[error("path `{0}` is excluded from gating by a bypass rule")]
    Bypassed(String),

    #[error("session cookie name must not be empty")]
    EmptyCookieName,
}
