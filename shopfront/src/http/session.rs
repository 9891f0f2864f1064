use std::time::Duration;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::cookie::{Cookie, SameSite};
use axum_extra::extract::SignedCookieJar;
use tracing::warn;

use crate::session::Session;

use super::error::ApiError;
use super::state::{AppState, CookieSettings};

/// The caller's session, resolved from the signed session cookie.
///
/// Extraction never rejects for a missing, tampered or expired cookie; those
/// all yield `session: None`. Only a failing session backend is an error.
#[derive(Debug, Clone)]
pub struct CurrentSession {
    pub session: Option<Session>,
}

impl CurrentSession {
    pub fn require(self) -> Result<Session, ApiError> {
        self.session.ok_or(ApiError::Unauthorized)
    }
}

impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = SignedCookieJar::from_headers(&parts.headers, state.cookies.key.clone());
        let Some(token) = session_token(&jar, &state.cookies) else {
            return Ok(Self { session: None });
        };

        let session = state
            .sessions
            .get(&token)
            .await
            .map_err(|err| ApiError::internal("Failed to load session", err))?;
        if session.is_none() {
            warn!("session cookie refers to an unknown or expired session");
        }

        Ok(Self { session })
    }
}

/// Token from the signed cookie; `None` when absent or the signature is bad.
pub fn session_token(jar: &SignedCookieJar, settings: &CookieSettings) -> Option<String> {
    jar.get(&settings.name)
        .map(|cookie| cookie.value().to_owned())
}

pub fn session_cookie(settings: &CookieSettings, token: String, ttl: Duration) -> Cookie<'static> {
    let max_age = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
    Cookie::build((settings.name.clone(), token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(settings.secure)
        .max_age(cookie::time::Duration::seconds(max_age))
        .build()
}

pub fn removal_cookie(settings: &CookieSettings) -> Cookie<'static> {
    Cookie::build((settings.name.clone(), "")).path("/").build()
}
