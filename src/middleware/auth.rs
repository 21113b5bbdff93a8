//! Caller identity, injected by the upstream identity/session provider as
//! `x-user-id` and `x-user-email` headers. Absence is an authorization
//! failure, reported distinctly from validation failures.

use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get("x-user-id")
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("missing user identity".to_string()))?;

        let user_id = Uuid::parse_str(user_id)
            .map_err(|_| AppError::Unauthorized("malformed user identity".to_string()))?;

        let email = parts
            .headers
            .get("x-user-email")
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("missing user email".to_string()))?
            .to_string();

        Ok(AuthUser { user_id, email })
    }
}
