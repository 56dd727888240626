use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, HeaderValue, StatusCode, header, request::Parts},
};

use crate::gate::AccessState;

/// Session cookie lifetime: one week.
pub const SESSION_MAX_AGE_SECS: u64 = 60 * 60 * 24 * 7;

/// SessionUser
///
/// The resolved session of a request: the opaque token carried by the session cookie.
/// The token is the identity provider's user id; nothing here verifies it, presence is
/// the whole contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub user_id: String,
}

/// SessionUser Extractor Implementation
///
/// Makes `SessionUser` usable as a handler argument on the session-only API routes.
/// Those routes live under the API prefix, which the access gate never redirects, so the
/// check happens here instead and rejects with 401.
impl<S> FromRequestParts<S> for SessionUser
where
    S: Send + Sync,
    AccessState: FromRef<S>,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let access = AccessState::from_ref(state);

        session_token(&parts.headers, access.cookie_name())
            .map(|user_id| SessionUser { user_id })
            .ok_or(StatusCode::UNAUTHORIZED)
    }
}

/// session_token
///
/// Looks up `name` across every `Cookie` header. An absent cookie and an empty value are
/// the same thing: no session.
pub fn session_token(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|raw| raw.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim().trim_matches('"').to_string())
        .filter(|value| !value.is_empty())
}

/// session_cookie
///
/// Builds the `Set-Cookie` value issued after a successful login or signup.
///
/// # Errors
/// Fails when the token contains characters that are not valid in a header value.
pub fn session_cookie(
    name: &str,
    token: &str,
    secure: bool,
) -> Result<HeaderValue, header::InvalidHeaderValue> {
    HeaderValue::from_str(&format!(
        "{}={}; HttpOnly; Path=/; Max-Age={}; SameSite=Lax{}",
        name,
        token,
        SESSION_MAX_AGE_SECS,
        if secure { "; Secure" } else { "" }
    ))
}

/// cleared_session_cookie
///
/// `Set-Cookie` value that makes the browser drop the session immediately.
pub fn cleared_session_cookie(
    name: &str,
    secure: bool,
) -> Result<HeaderValue, header::InvalidHeaderValue> {
    HeaderValue::from_str(&format!(
        "{}=; HttpOnly; Path=/; Max-Age=0; SameSite=Lax{}",
        name,
        if secure { "; Secure" } else { "" }
    ))
}
