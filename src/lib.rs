//! RustPress Token Plugin
//!
//! Identity tokens for RustPress providing:
//! - Access and refresh session tokens
//! - Password reset (`change-password`) tokens
//! - Email confirmation (`confirm-email`) tokens
//! - Argon2id password hashing with bounded concurrency
//!
//! Each token family has its own secret and lifetime. Tokens carry a
//! `tokenType` claim and an `iat` timestamp; liveness is computed as
//! `iat + ttl > now` at verification time, so a lifetime change applies to
//! tokens already in circulation.
//!
//! # Configuration
//!
//! All configuration is loaded from environment variables:
//! - `JWT_ACCESS_SECRET_KEY` - Access token secret (required)
//! - `JWT_ACCESS_EXPIRATION_TIME` - Access token lifetime in seconds (default: 300)
//! - `JWT_REFRESH_SECRET_KEY` - Refresh token secret (required)
//! - `JWT_REFRESH_EXPIRATION_TIME` - Refresh token lifetime in seconds (default: 604800)
//! - `JWT_EMAIL_SECRET_KEY` - Secret for password reset and confirmation tokens (required)
//! - `TIME_EXP_RESET_PASSWORD` - Password reset token lifetime (default: 900)
//! - `TIME_EXP_CONFIRM_EMAIL` - Confirmation token lifetime (default: 900)
//! - `ARGON2_MEMORY_COST` / `ARGON2_TIME_COST` / `ARGON2_PARALLELISM` (default: 65536 / 3 / 1)
//! - `PASSWORD_HASH_CONCURRENCY` - Concurrent Argon2 jobs (default: 4)
//!
//! # Usage
//!
//! ```rust,ignore
//! use rustpress_tokens::{AuthPlugin, Plugin};
//!
//! let plugin = AuthPlugin::new();
//! plugin.activate_from_env().await?;
//!
//! let auth = plugin.auth_service().await.unwrap();
//! let token = auth.issue_access_token(&json!({ "userId": 42, "role": "admin" }));
//! ```

pub mod clock;
pub mod codec;
pub mod config;
pub mod error;
pub mod extractors;
pub mod issuer;
pub mod middleware;
pub mod models;
pub mod password;
pub mod service;
pub mod validation;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use codec::TokenCodec;
pub use config::{AuthConfig, FamilyConfig, Secret};
pub use error::AuthError;
pub use extractors::AccessClaims;
pub use issuer::TokenIssuer;
pub use middleware::require_access;
pub use models::*;
pub use password::PasswordHasher;
pub use service::AuthService;
pub use validation::TokenValidator;

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

// ============================================
// Plugin Types
// ============================================

/// Plugin state enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginState {
    Inactive,
    Active,
    Error,
}

/// Plugin metadata
#[derive(Debug, Clone)]
pub struct PluginInfo {
    pub id: String,
    pub name: String,
    pub version: String,
    pub description: String,
}

/// Plugin lifecycle trait
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Get plugin information
    fn info(&self) -> &PluginInfo;

    /// Get current plugin state
    async fn state(&self) -> PluginState;

    /// Activate the plugin
    async fn activate(&self, config: AuthConfig) -> Result<(), AuthError>;

    /// Deactivate the plugin
    async fn deactivate(&self) -> Result<(), AuthError>;
}

// ============================================
// Token Plugin Implementation
// ============================================

/// RustPress Token Plugin
pub struct AuthPlugin {
    info: PluginInfo,
    state: RwLock<PluginState>,
    auth_service: RwLock<Option<Arc<AuthService>>>,
}

impl AuthPlugin {
    /// Create a new plugin instance
    pub fn new() -> Self {
        Self {
            info: PluginInfo {
                id: "rustpress-tokens".into(),
                name: "RustPress Tokens".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                description: "Identity tokens and password hashing for RustPress".into(),
            },
            state: RwLock::new(PluginState::Inactive),
            auth_service: RwLock::new(None),
        }
    }

    /// Get the authentication service
    pub async fn auth_service(&self) -> Option<Arc<AuthService>> {
        self.auth_service.read().await.clone()
    }

    /// Activate with configuration read from the environment
    pub async fn activate_from_env(&self) -> Result<(), AuthError> {
        let config = match AuthConfig::from_env() {
            Ok(config) => config,
            Err(err) => {
                *self.state.write().await = PluginState::Error;
                return Err(err);
            }
        };

        self.activate(config).await
    }
}

impl Default for AuthPlugin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Plugin for AuthPlugin {
    fn info(&self) -> &PluginInfo {
        &self.info
    }

    async fn state(&self) -> PluginState {
        *self.state.read().await
    }

    async fn activate(&self, config: AuthConfig) -> Result<(), AuthError> {
        tracing::info!("Activating RustPress Tokens plugin");

        let auth_service = match AuthService::new(config) {
            Ok(service) => Arc::new(service),
            Err(err) => {
                tracing::error!(error = %err, "RustPress Tokens plugin failed to activate");
                *self.state.write().await = PluginState::Error;
                return Err(err);
            }
        };

        *self.auth_service.write().await = Some(auth_service);
        *self.state.write().await = PluginState::Active;

        tracing::info!("RustPress Tokens plugin activated successfully");
        Ok(())
    }

    async fn deactivate(&self) -> Result<(), AuthError> {
        tracing::info!("Deactivating RustPress Tokens plugin");

        *self.auth_service.write().await = None;
        *self.state.write().await = PluginState::Inactive;

        tracing::info!("RustPress Tokens plugin deactivated");
        Ok(())
    }
}

// ============================================
// Module Tests
// ============================================
