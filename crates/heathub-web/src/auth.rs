//! Bearer-token authentication for dashboard routes.
//!
//! Token issuance (login, registration, JWT signing) is handled by the
//! auth service in front of this one; here a token is an opaque string
//! resolved to a user id through the state's registry. Handlers that take
//! an [`AuthUser`] argument are authenticated; everything else is
//! device-facing and open.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::error::ApiError;
use crate::AppState;

/// The authenticated caller's user id.
#[derive(Debug, Clone)]
pub struct AuthUser(pub String);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;

        let token = header.strip_prefix("Bearer ").ok_or(ApiError::Unauthorized)?;

        match state.tokens.get(token) {
            Some(user_id) => Ok(AuthUser(user_id.clone())),
            None => {
                tracing::warn!("rejected request with unknown bearer token");
                Err(ApiError::Unauthorized)
            }
        }
    }
}
