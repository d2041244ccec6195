//! Token Models
//!
//! Token families, claim sets and the shapes handed back to callers.

use crate::error::AuthError;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;
use validator::Validate;

/// Claim key carrying the token family
pub const TOKEN_TYPE_CLAIM: &str = "tokenType";

/// Claim key carrying the issuance timestamp (seconds since epoch)
pub const ISSUED_AT_CLAIM: &str = "iat";

/// A signed claim set: string keys to JSON values
pub type Claims = Map<String, Value>;

// ============================================
// Token Families
// ============================================

/// Token family, stamped into every token as `tokenType`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TokenType {
    Access,
    Refresh,
    ChangePassword,
    ConfirmEmail,
}

impl TokenType {
    pub const ALL: [TokenType; 4] = [
        TokenType::Access,
        TokenType::Refresh,
        TokenType::ChangePassword,
        TokenType::ConfirmEmail,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
            TokenType::ChangePassword => "change-password",
            TokenType::ConfirmEmail => "confirm-email",
        }
    }

    /// Mail families carry exactly `{ email }`
    pub fn is_mail(&self) -> bool {
        matches!(self, TokenType::ChangePassword | TokenType::ConfirmEmail)
    }
}

impl std::fmt::Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TokenType {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TokenType::ALL
            .into_iter()
            .find(|family| family.as_str() == s)
            .ok_or_else(|| AuthError::MalformedClaims(format!("unknown token type `{s}`")))
    }
}

// ============================================
// Payloads
// ============================================

/// Payload of change-password and confirm-email tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct EmailPayload {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

impl EmailPayload {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
        }
    }
}

// ============================================
// Verified Tokens
// ============================================

/// Claims of a token that passed signature, liveness and family checks
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedClaims {
    pub token_type: TokenType,
    /// Issued at timestamp
    pub issued_at: i64,
    /// Caller payload, without `tokenType` and `iat`
    pub payload: Claims,
}

impl VerifiedClaims {
    /// Look up a single payload field
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    /// Decode the payload into a caller type
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, AuthError> {
        serde_json::from_value(Value::Object(self.payload.clone()))
            .map_err(|e| AuthError::InvalidPayload(e.to_string()))
    }

    /// Full claim set as it was signed
    pub fn into_claims(self) -> Claims {
        let mut claims = self.payload;
        claims.insert(
            TOKEN_TYPE_CLAIM.to_string(),
            Value::String(self.token_type.as_str().to_string()),
        );
        claims.insert(ISSUED_AT_CLAIM.to_string(), Value::from(self.issued_at));
        claims
    }
}

/// Verified change-password or confirm-email token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailClaims {
    pub email: String,
    pub issued_at: i64,
}

impl TryFrom<VerifiedClaims> for EmailClaims {
    type Error = AuthError;

    fn try_from(claims: VerifiedClaims) -> Result<Self, Self::Error> {
        let email = claims
            .get("email")
            .and_then(Value::as_str)
            .ok_or_else(|| AuthError::MalformedClaims("missing email claim".to_string()))?;

        Ok(Self {
            email: email.to_string(),
            issued_at: claims.issued_at,
        })
    }
}

// ============================================
// Response DTOs
// ============================================

/// Access/refresh pair handed to clients
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}
