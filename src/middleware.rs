//! Authentication Middleware
//!
//! Rejects requests without a valid access token and hands the verified
//! claims to downstream extractors.

use crate::error::AuthError;
use crate::extractors::{bearer_token, AccessClaims};
use crate::service::AuthService;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Middleware that requires a valid access token
///
/// ```rust,ignore
/// let protected = Router::new()
///     .route("/me", get(me))
///     .layer(axum::middleware::from_fn_with_state(auth.clone(), require_access));
/// ```
pub async fn require_access(
    State(auth): State<Arc<AuthService>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = bearer_token(request.headers())?;
    let claims = auth.validator().verify_access(token)?;

    request.extensions_mut().insert(AccessClaims(claims));

    Ok(next.run(request).await)
}
