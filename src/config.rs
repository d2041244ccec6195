//! Token Configuration
//!
//! All configuration values are loaded from environment variables once at
//! startup. No hardcoded secrets: a missing secret is a startup error.

use crate::error::AuthError;
use crate::models::TokenType;

use argon2::Params;
use std::env;

/// Signing key material. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Empty or whitespace only
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Secret(**redacted**)")
    }
}

/// Secret and validity window of one token family
#[derive(Debug, Clone)]
pub struct FamilyConfig {
    pub secret: Secret,
    pub ttl_seconds: i64,
}

impl FamilyConfig {
    pub fn new(secret: impl Into<String>, ttl_seconds: i64) -> Self {
        Self {
            secret: Secret::new(secret),
            ttl_seconds,
        }
    }
}

/// Token and password configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Access tokens (JWT_ACCESS_SECRET_KEY, JWT_ACCESS_EXPIRATION_TIME)
    pub access: FamilyConfig,

    /// Refresh tokens (JWT_REFRESH_SECRET_KEY, JWT_REFRESH_EXPIRATION_TIME)
    pub refresh: FamilyConfig,

    /// Password reset tokens (JWT_EMAIL_SECRET_KEY, TIME_EXP_RESET_PASSWORD)
    pub change_password: FamilyConfig,

    /// Email confirmation tokens (JWT_EMAIL_SECRET_KEY, TIME_EXP_CONFIRM_EMAIL)
    pub confirm_email: FamilyConfig,

    /// Argon2 memory cost in KiB (ARGON2_MEMORY_COST)
    pub argon2_memory_cost: u32,

    /// Argon2 time cost (iterations) (ARGON2_TIME_COST)
    pub argon2_time_cost: u32,

    /// Argon2 parallelism (ARGON2_PARALLELISM)
    pub argon2_parallelism: u32,

    /// Maximum concurrent password hash/verify jobs (PASSWORD_HASH_CONCURRENCY)
    pub max_concurrent_hashes: usize,
}

/// Shortest HS256 key accepted without a warning, in bytes
pub const MIN_SECRET_LENGTH: usize = 32;

/// 64 MiB
pub const DEFAULT_ARGON2_MEMORY_COST: u32 = 65536;
pub const DEFAULT_ARGON2_TIME_COST: u32 = 3;
pub const DEFAULT_ARGON2_PARALLELISM: u32 = 1;

impl AuthConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AuthError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key/value source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AuthError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String, AuthError> {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| AuthError::Config(format!("{key} environment variable must be set")))
        };

        let mail_secret = required("JWT_EMAIL_SECRET_KEY")?;

        let config = Self {
            access: FamilyConfig::new(
                required("JWT_ACCESS_SECRET_KEY")?,
                parse_or(&lookup, "JWT_ACCESS_EXPIRATION_TIME", 300)?, // 5 minutes
            ),
            refresh: FamilyConfig::new(
                required("JWT_REFRESH_SECRET_KEY")?,
                parse_or(&lookup, "JWT_REFRESH_EXPIRATION_TIME", 604800)?, // 7 days
            ),
            change_password: FamilyConfig::new(
                mail_secret.clone(),
                parse_or(&lookup, "TIME_EXP_RESET_PASSWORD", 900)?, // 15 minutes
            ),
            confirm_email: FamilyConfig::new(
                mail_secret,
                parse_or(&lookup, "TIME_EXP_CONFIRM_EMAIL", 900)?,
            ),
            argon2_memory_cost: parse_or(&lookup, "ARGON2_MEMORY_COST", DEFAULT_ARGON2_MEMORY_COST)?,
            argon2_time_cost: parse_or(&lookup, "ARGON2_TIME_COST", DEFAULT_ARGON2_TIME_COST)?,
            argon2_parallelism: parse_or(&lookup, "ARGON2_PARALLELISM", DEFAULT_ARGON2_PARALLELISM)?,
            max_concurrent_hashes: parse_or(&lookup, "PASSWORD_HASH_CONCURRENCY", 4)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Configuration of one token family
    pub fn family(&self, token_type: TokenType) -> &FamilyConfig {
        match token_type {
            TokenType::Access => &self.access,
            TokenType::Refresh => &self.refresh,
            TokenType::ChangePassword => &self.change_password,
            TokenType::ConfirmEmail => &self.confirm_email,
        }
    }

    /// Argon2 cost parameters
    pub fn argon2_params(&self) -> Result<Params, AuthError> {
        Params::new(
            self.argon2_memory_cost,
            self.argon2_time_cost,
            self.argon2_parallelism,
            None,
        )
        .map_err(|e| AuthError::Config(format!("invalid Argon2 parameters: {e}")))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), AuthError> {
        for family in TokenType::ALL {
            let config = self.family(family);

            if config.secret.is_empty() {
                return Err(AuthError::Config(format!(
                    "{family} token secret must not be empty"
                )));
            }

            if config.secret.len() < MIN_SECRET_LENGTH {
                tracing::warn!(
                    token_type = %family,
                    min_length = MIN_SECRET_LENGTH,
                    "Token secret is shorter than recommended"
                );
            }

            if config.ttl_seconds <= 0 {
                return Err(AuthError::Config(format!(
                    "{family} token TTL must be positive"
                )));
            }
        }

        // Mail families may share a key; their tokenType keeps them apart
        let session_secrets = [&self.access.secret, &self.refresh.secret];
        let mail_secrets = [&self.change_password.secret, &self.confirm_email.secret];

        if self.access.secret == self.refresh.secret {
            return Err(AuthError::Config(
                "access and refresh tokens must use different secrets".to_string(),
            ));
        }

        if session_secrets
            .iter()
            .any(|session| mail_secrets.contains(session))
        {
            return Err(AuthError::Config(
                "session and mail tokens must use different secrets".to_string(),
            ));
        }

        self.argon2_params()?;

        if self.max_concurrent_hashes == 0 {
            return Err(AuthError::Config(
                "PASSWORD_HASH_CONCURRENCY must be at least 1".to_string(),
            ));
        }

        if self.argon2_memory_cost < DEFAULT_ARGON2_MEMORY_COST
            || self.argon2_time_cost < DEFAULT_ARGON2_TIME_COST
        {
            tracing::warn!(
                memory_kib = self.argon2_memory_cost,
                time_cost = self.argon2_time_cost,
                "Argon2 cost parameters are below the recommended floor"
            );
        }

        Ok(())
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, AuthError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| AuthError::Config(format!("{key} must be a number, got `{value}`"))),
        None => Ok(default),
    }
}

#[cfg(test)]
impl AuthConfig {
    /// Distinct secrets and cheap Argon2 costs
    pub(crate) fn test_default() -> Self {
        Self {
            access: FamilyConfig::new("access-secret-for-tests-0123456789", 300),
            refresh: FamilyConfig::new("refresh-secret-for-tests-0123456789", 604800),
            change_password: FamilyConfig::new("mail-secret-for-tests-0123456789", 900),
            confirm_email: FamilyConfig::new("mail-secret-for-tests-0123456789", 900),
            argon2_memory_cost: 1024,
            argon2_time_cost: 1,
            argon2_parallelism: 1,
            max_concurrent_hashes: 2,
        }
    }
}
