//! Session identity from a HS256 JWT.
//!
//! The token is looked for in the session query parameter, then the session
//! header (`Bearer <jwt>`), then `Authorization: Bearer <jwt>`, then the session
//! cookie. The first place that carries one decides; a token that fails to
//! validate leaves the request anonymous.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use axum::extract::{FromRequestParts, Query};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::api::rest::error::ApiError;
use crate::config::RecordsConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "userID")]
    pub user_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
}

/// Verification settings, shared with handlers through a request extension.
#[derive(Clone)]
pub struct AuthConfig {
    key: Option<Arc<DecodingKey>>,
    session_key: Arc<str>,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("enabled", &self.key.is_some())
            .field("session_key", &self.session_key)
            .finish()
    }
}

impl AuthConfig {
    /// An empty secret disables verification; no request is ever identified.
    pub fn new(secret: &str, session_key: &str) -> Self {
        let key = (!secret.is_empty()).then(|| Arc::new(DecodingKey::from_secret(secret.as_bytes())));
        Self {
            key,
            session_key: Arc::from(session_key),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.key.is_some()
    }

    /// The caller's identity, if the request carries a valid session token.
    pub fn identify(&self, parts: &Parts) -> Option<Uuid> {
        let key = self.key.as_ref()?;
        let token = find_token(parts, &self.session_key)?;
        let mut validation = Validation::new(Algorithm::HS256);
        // Session tokens are not required to expire; `exp` is still checked when present.
        validation.required_spec_claims.clear();
        match decode::<Claims>(&token, key, &validation) {
            Ok(data) => Some(data.claims.user_id),
            Err(e) => {
                debug!(error = %e, "session token rejected");
                None
            }
        }
    }
}

impl From<&RecordsConfig> for AuthConfig {
    fn from(cfg: &RecordsConfig) -> Self {
        Self::new(&cfg.jwt_secret, &cfg.session_key)
    }
}

/// Sign a session token for `user_id`.
pub fn issue_token(secret: &str, user_id: Uuid) -> jsonwebtoken::errors::Result<String> {
    encode(
        &Header::new(Algorithm::HS256),
        &Claims { user_id, exp: None },
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

fn find_token(parts: &Parts, session_key: &str) -> Option<String> {
    if let Ok(Query(params)) = Query::<HashMap<String, String>>::try_from_uri(&parts.uri) {
        if let Some(t) = params.get(session_key) {
            return Some(t.clone());
        }
    }

    // A session header without the Bearer scheme never validates.
    if let Some(v) = header_str(parts, session_key) {
        return Some(v.strip_prefix("Bearer ").unwrap_or_default().to_string());
    }

    if let Some(t) = header_str(parts, AUTHORIZATION.as_str()).and_then(|v| v.strip_prefix("Bearer ")) {
        return Some(t.trim().to_string());
    }

    CookieJar::from_headers(&parts.headers)
        .get(session_key)
        .map(|c| c.value_trimmed().to_string())
}

fn header_str<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts.headers.get(name).and_then(|v| v.to_str().ok())
}

/// Extractor for endpoints that require a caller. Answers 401 otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity(pub Uuid);

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(cfg) = parts.extensions.get::<AuthConfig>() else {
            debug!("no auth configuration on request");
            return Err(ApiError::unauthorized());
        };
        cfg.identify(parts).map(Identity).ok_or_else(ApiError::unauthorized)
    }
}
