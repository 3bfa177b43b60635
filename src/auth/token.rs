use crate::error::VortexError;
use axum::http::request::Parts;

/// Pulls credentials out of request parts for [`AccessPolicy::current_user`]
/// implementations.
///
/// [`AccessPolicy::current_user`]: super::AccessPolicy::current_user
pub struct TokenExtractor;

impl TokenExtractor {
    /// Extract token from Authorization header
    pub fn from_header(parts: &Parts) -> Result<String, VortexError> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| VortexError::unauthorized("Missing authorization header"))?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            VortexError::unauthorized("Invalid authorization header format. Expected: Bearer <token>")
        })?;

        let token = token.trim();
        if token.is_empty() {
            return Err(VortexError::unauthorized("Empty bearer token"));
        }

        Ok(token.to_string())
    }

    /// Extract a session token from a cookie
    pub fn from_cookie(parts: &Parts, cookie_name: &str) -> Result<String, VortexError> {
        let cookie_header = parts
            .headers
            .get("cookie")
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| VortexError::unauthorized("Missing cookie header"))?;

        let prefix = format!("{}=", cookie_name);
        cookie_header
            .split(';')
            .find_map(|cookie| cookie.trim().strip_prefix(prefix.as_str()))
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .ok_or_else(|| VortexError::unauthorized(format!("Cookie '{}' not found", cookie_name)))
    }
}
