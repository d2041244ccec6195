//! Authentication Service
//!
//! The surface the rest of the application talks to: token issuance and
//! verification for every family plus password hashing.
//!
//! Failures are collapsed to `None`/`false` here and logged by kind. Callers
//! that need to tell `Expired` from `WrongTokenType` use [`AuthService::issuer`]
//! and [`AuthService::validator`] directly.

use crate::clock::{Clock, SystemClock};
use crate::codec::{Keyring, TokenCodec};
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::issuer::TokenIssuer;
use crate::models::*;
use crate::password::PasswordHasher;
use crate::validation::TokenValidator;

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Authentication service
pub struct AuthService {
    config: AuthConfig,
    issuer: TokenIssuer,
    validator: TokenValidator,
    hasher: Arc<PasswordHasher>,
    hash_permits: Arc<Semaphore>,
}

impl AuthService {
    /// Create a new authentication service on the system clock
    pub fn new(config: AuthConfig) -> Result<Self, AuthError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a new authentication service with an explicit time source
    pub fn with_clock(config: AuthConfig, clock: Arc<dyn Clock>) -> Result<Self, AuthError> {
        config.validate()?;

        let codec = TokenCodec::new();
        let keyring = Arc::new(Keyring::from_config(&config)?);

        let issuer = TokenIssuer::with_keyring(codec.clone(), keyring.clone(), clock.clone());
        let validator = TokenValidator::with_keyring(&config, codec, keyring, clock);
        let hasher = Arc::new(PasswordHasher::from_config(&config)?);
        let hash_permits = Arc::new(Semaphore::new(config.max_concurrent_hashes));

        Ok(Self {
            config,
            issuer,
            validator,
            hasher,
            hash_permits,
        })
    }

    /// Get reference to config
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    pub fn validator(&self) -> &TokenValidator {
        &self.validator
    }

    // ============================================
    // Token Issuance
    // ============================================

    pub fn issue_access_token<P>(&self, payload: &P) -> Option<String>
    where
        P: Serialize + ?Sized,
    {
        issued(TokenType::Access, self.issuer.issue_access(payload))
    }

    pub fn issue_refresh_token<P>(&self, payload: &P) -> Option<String>
    where
        P: Serialize + ?Sized,
    {
        issued(TokenType::Refresh, self.issuer.issue_refresh(payload))
    }

    pub fn issue_change_password_token(&self, email: &str) -> Option<String> {
        issued(
            TokenType::ChangePassword,
            self.issuer.issue_change_password(email),
        )
    }

    pub fn issue_confirm_email_token(&self, email: &str) -> Option<String> {
        issued(
            TokenType::ConfirmEmail,
            self.issuer.issue_confirm_email(email),
        )
    }

    /// Issue an access and a refresh token for the same identity
    pub fn issue_token_pair<P>(&self, payload: &P) -> Option<TokenPair>
    where
        P: Serialize + ?Sized,
    {
        Some(TokenPair {
            access_token: self.issue_access_token(payload)?,
            refresh_token: self.issue_refresh_token(payload)?,
            token_type: "Bearer".to_string(),
            expires_in: self.config.access.ttl_seconds,
        })
    }

    /// Exchange a refresh token for a new pair carrying the same identity
    pub fn refresh_session(&self, refresh_token: &str) -> Option<TokenPair> {
        let claims = self.verify_refresh_token(refresh_token)?;
        self.issue_token_pair(&claims.payload)
    }

    // ============================================
    // Token Verification
    // ============================================

    pub fn verify_access_token(&self, token: &str) -> Option<VerifiedClaims> {
        self.validator.verify_access(token).ok()
    }

    pub fn verify_refresh_token(&self, token: &str) -> Option<VerifiedClaims> {
        self.validator.verify_refresh(token).ok()
    }

    pub fn verify_change_password_token(&self, token: &str) -> Option<EmailClaims> {
        self.validator.verify_change_password(token).ok()
    }

    pub fn verify_confirm_email_token(&self, token: &str) -> Option<EmailClaims> {
        self.validator.verify_confirm_email(token).ok()
    }

    // ============================================
    // Password Hashing
    // ============================================

    /// Hash a password using Argon2id on the blocking pool
    pub async fn hash_password(&self, password: &str) -> Option<String> {
        let password = password.to_owned();

        match self.run_hasher(move |hasher| hasher.hash(&password)).await {
            Ok(digest) => Some(digest),
            Err(err) => {
                tracing::warn!(reason = err.code(), "Password hashing failed");
                None
            }
        }
    }

    /// Verify a password against a stored digest
    ///
    /// A malformed digest counts as a mismatch.
    pub async fn verify_password(&self, password: &str, digest: &str) -> bool {
        let (password, digest) = (password.to_owned(), digest.to_owned());

        match self
            .run_hasher(move |hasher| hasher.check(&password, &digest))
            .await
        {
            Ok(()) => true,
            Err(AuthError::PasswordMismatch) => false,
            Err(err) => {
                tracing::warn!(reason = err.code(), "Password verification failed");
                false
            }
        }
    }

    /// Run an Argon2 job once a permit is free. Each job holds a full
    /// memory-cost working set, so the permit count bounds peak memory.
    ///
    /// The permit travels with the blocking job and is released when the job
    /// returns, even if the caller stopped waiting for it.
    async fn run_hasher<T, F>(&self, job: F) -> Result<T, AuthError>
    where
        F: FnOnce(&PasswordHasher) -> Result<T, AuthError> + Send + 'static,
        T: Send + 'static,
    {
        let permit = self
            .hash_permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| AuthError::HashingFailed("hash pool closed".to_string()))?;

        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            job(&*hasher)
        })
        .await
        .map_err(|e| AuthError::HashingFailed(format!("hash task panicked: {e}")))?
    }
}

fn issued(token_type: TokenType, result: Result<String, AuthError>) -> Option<String> {
    match result {
        Ok(token) => Some(token),
        Err(err) => {
            tracing::warn!(token_type = %token_type, reason = err.code(), "Token issuance failed");
            None
        }
    }
}
