//! Token Issuer
//!
//! Builds the claim set for each family, stamps it with `tokenType` and
//! `iat`, and signs it with that family's key.

use crate::clock::Clock;
use crate::codec::{Keyring, TokenCodec};
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::models::{Claims, EmailPayload, TokenType, ISSUED_AT_CLAIM, TOKEN_TYPE_CLAIM};

use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use validator::Validate;

/// Issues tokens for all four families
#[derive(Clone)]
pub struct TokenIssuer {
    codec: TokenCodec,
    keyring: Arc<Keyring>,
    clock: Arc<dyn Clock>,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig, clock: Arc<dyn Clock>) -> Result<Self, AuthError> {
        let keyring = Arc::new(Keyring::from_config(config)?);
        Ok(Self::with_keyring(TokenCodec::new(), keyring, clock))
    }

    pub fn with_keyring(codec: TokenCodec, keyring: Arc<Keyring>, clock: Arc<dyn Clock>) -> Self {
        Self {
            codec,
            keyring,
            clock,
        }
    }

    /// Issue an access token carrying the caller's identity payload
    pub fn issue_access<P>(&self, payload: &P) -> Result<String, AuthError>
    where
        P: Serialize + ?Sized,
    {
        self.issue(TokenType::Access, identity_claims(payload)?)
    }

    /// Issue a refresh token carrying the caller's identity payload
    pub fn issue_refresh<P>(&self, payload: &P) -> Result<String, AuthError>
    where
        P: Serialize + ?Sized,
    {
        self.issue(TokenType::Refresh, identity_claims(payload)?)
    }

    /// Issue a password reset token for `email`
    pub fn issue_change_password(&self, email: &str) -> Result<String, AuthError> {
        self.issue(TokenType::ChangePassword, email_claims(email)?)
    }

    /// Issue an email confirmation token for `email`
    pub fn issue_confirm_email(&self, email: &str) -> Result<String, AuthError> {
        self.issue(TokenType::ConfirmEmail, email_claims(email)?)
    }

    fn issue(&self, token_type: TokenType, mut claims: Claims) -> Result<String, AuthError> {
        let overridden = [TOKEN_TYPE_CLAIM, ISSUED_AT_CLAIM]
            .into_iter()
            .filter(|key| claims.remove(*key).is_some())
            .count();
        if overridden > 0 {
            tracing::debug!(
                token_type = %token_type,
                "Caller payload contained control claims; replacing them"
            );
        }

        claims.insert(
            TOKEN_TYPE_CLAIM.to_string(),
            Value::String(token_type.as_str().to_string()),
        );
        // Read as late as possible so batched callers don't skew iat
        claims.insert(ISSUED_AT_CLAIM.to_string(), Value::from(self.clock.now()));

        self.codec.sign(self.keyring.get(token_type), &claims)
    }
}

fn identity_claims<P>(payload: &P) -> Result<Claims, AuthError>
where
    P: Serialize + ?Sized,
{
    match serde_json::to_value(payload) {
        Ok(Value::Object(claims)) => Ok(claims),
        Ok(other) => Err(AuthError::InvalidPayload(format!(
            "identity payload must be an object, got {}",
            json_kind(&other)
        ))),
        Err(e) => Err(AuthError::InvalidPayload(e.to_string())),
    }
}

fn email_claims(email: &str) -> Result<Claims, AuthError> {
    let payload = EmailPayload::new(email);
    payload
        .validate()
        .map_err(|e| AuthError::InvalidPayload(e.to_string()))?;

    identity_claims(&payload)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
