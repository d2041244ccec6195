//! Token and Password Error Types
//!
//! Every failure the token core can produce. Verification failures are
//! expected outcomes (expired sessions, forged links) and are returned as
//! values, never raised as panics.

use crate::models::TokenType;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

/// Authentication errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Token could not be signed")]
    SigningFailed,

    #[error("Token signature or encoding is invalid")]
    VerificationFailed,

    #[error("Token has expired")]
    Expired,

    #[error("Expected a {expected} token, got {found}")]
    WrongTokenType { expected: TokenType, found: String },

    #[error("Token claims are malformed: {0}")]
    MalformedClaims(String),

    #[error("Invalid token payload: {0}")]
    InvalidPayload(String),

    #[error("Password hashing failed: {0}")]
    HashingFailed(String),

    #[error("Password does not match")]
    PasswordMismatch,

    #[error("Stored password digest is invalid: {0}")]
    InvalidDigest(String),

    #[error("Authentication required")]
    MissingToken,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AuthError {
    /// Short machine-readable code, also used as the `reason` log field
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::SigningFailed => "signing_failed",
            AuthError::VerificationFailed => "verification_failed",
            AuthError::Expired => "expired",
            AuthError::WrongTokenType { .. } => "wrong_token_type",
            AuthError::MalformedClaims(_) => "malformed_claims",
            AuthError::InvalidPayload(_) => "invalid_payload",
            AuthError::HashingFailed(_) => "hashing_failed",
            AuthError::PasswordMismatch => "password_mismatch",
            AuthError::InvalidDigest(_) => "invalid_digest",
            AuthError::MissingToken => "unauthorized",
            AuthError::Config(_) => "configuration_error",
        }
    }

    /// Whether this error rejects a presented token
    pub fn is_token_rejection(&self) -> bool {
        matches!(
            self,
            AuthError::VerificationFailed
                | AuthError::Expired
                | AuthError::WrongTokenType { .. }
                | AuthError::MalformedClaims(_)
                | AuthError::MissingToken
        )
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            // Rejections share one message so callers cannot tell why a token failed
            err if err.is_token_rejection() => (
                StatusCode::UNAUTHORIZED,
                "Invalid or expired token".to_string(),
            ),
            AuthError::PasswordMismatch => (
                StatusCode::UNAUTHORIZED,
                "Invalid credentials".to_string(),
            ),
            AuthError::InvalidPayload(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An internal error occurred".to_string(),
            ),
        };

        let error_code = match &self {
            err if err.is_token_rejection() => "invalid_token",
            err => err.code(),
        };

        (
            status,
            Json(serde_json::json!({
                "error": error_code,
                "message": message
            })),
        )
            .into_response()
    }
}

impl From<argon2::password_hash::Error> for AuthError {
    fn from(err: argon2::password_hash::Error) -> Self {
        tracing::warn!("Password hashing error: {}", err);
        AuthError::HashingFailed(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        tracing::debug!("JWT error: {:?}", err.kind());
        AuthError::VerificationFailed
    }
}
