//! Token Codec
//!
//! HS256 JWT signing and verification. The codec proves authenticity and
//! integrity only: it does not look at `tokenType` and does not enforce
//! expiry. Liveness is decided by the validator from `iat` and the family TTL.

use crate::config::{AuthConfig, Secret};
use crate::error::AuthError;
use crate::models::{Claims, TokenType};

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

/// Keys derived from one family secret
#[derive(Clone)]
pub struct FamilyKeys {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl FamilyKeys {
    pub fn from_secret(secret: &Secret) -> Result<Self, AuthError> {
        if secret.is_empty() {
            return Err(AuthError::SigningFailed);
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        })
    }
}

/// Keys for all four families, derived once at startup
#[derive(Clone)]
pub struct Keyring {
    access: FamilyKeys,
    refresh: FamilyKeys,
    change_password: FamilyKeys,
    confirm_email: FamilyKeys,
}

impl Keyring {
    pub fn from_config(config: &AuthConfig) -> Result<Self, AuthError> {
        Ok(Self {
            access: FamilyKeys::from_secret(&config.access.secret)?,
            refresh: FamilyKeys::from_secret(&config.refresh.secret)?,
            change_password: FamilyKeys::from_secret(&config.change_password.secret)?,
            confirm_email: FamilyKeys::from_secret(&config.confirm_email.secret)?,
        })
    }

    pub fn get(&self, token_type: TokenType) -> &FamilyKeys {
        match token_type {
            TokenType::Access => &self.access,
            TokenType::Refresh => &self.refresh,
            TokenType::ChangePassword => &self.change_password,
            TokenType::ConfirmEmail => &self.confirm_email,
        }
    }
}

/// Sign/verify primitive
#[derive(Clone)]
pub struct TokenCodec {
    header: Header,
    validation: Validation,
}

impl TokenCodec {
    pub fn new() -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;

        Self {
            header: Header::new(Algorithm::HS256),
            validation,
        }
    }

    /// Sign a claim set into a compact, URL-safe token
    pub fn sign(&self, keys: &FamilyKeys, claims: &Claims) -> Result<String, AuthError> {
        encode(&self.header, claims, &keys.encoding_key).map_err(|e| {
            tracing::warn!("JWT signing error: {:?}", e.kind());
            AuthError::SigningFailed
        })
    }

    /// Check the signature and decode the claim set
    pub fn verify(&self, keys: &FamilyKeys, token: &str) -> Result<Claims, AuthError> {
        let token_data = decode::<Claims>(token, &keys.decoding_key, &self.validation)?;
        Ok(token_data.claims)
    }
}

impl Default for TokenCodec {
    fn default() -> Self {
        Self::new()
    }
}
