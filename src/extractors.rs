//! Authentication Extractors
//!
//! Axum extractor for verified access-token claims.

use crate::error::AuthError;
use crate::models::VerifiedClaims;
use crate::service::AuthService;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use std::sync::Arc;

/// Claims of a verified `Authorization: Bearer` access token
#[derive(Debug, Clone)]
pub struct AccessClaims(pub VerifiedClaims);

#[async_trait]
impl<S> FromRequestParts<S> for AccessClaims
where
    Arc<AuthService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // Already verified by middleware
        if let Some(claims) = parts.extensions.get::<AccessClaims>() {
            return Ok(claims.clone());
        }

        let auth = Arc::<AuthService>::from_ref(state);
        let token = bearer_token(&parts.headers)?;

        auth.validator().verify_access(token).map(AccessClaims)
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(AuthError::MissingToken)?;

    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::MissingToken)
}
