//! Token Validator
//!
//! Every family is checked the same way:
//! 1. signature with the family key
//! 2. liveness: `iat + ttl > now`, computed from the configured TTL on each call
//! 3. `tokenType` equals the expected family
//!
//! The `tokenType` check also runs for access and refresh tokens so a future
//! merge of secrets cannot reopen cross-family replay.

use crate::clock::Clock;
use crate::codec::{Keyring, TokenCodec};
use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::models::{
    Claims, EmailClaims, TokenType, VerifiedClaims, ISSUED_AT_CLAIM, TOKEN_TYPE_CLAIM,
};

use serde_json::Value;
use std::sync::Arc;

/// Verifies tokens for all four families
#[derive(Clone)]
pub struct TokenValidator {
    codec: TokenCodec,
    keyring: Arc<Keyring>,
    clock: Arc<dyn Clock>,
    ttl: FamilyTtls,
}

/// Validity window per family, in seconds
#[derive(Debug, Clone, Copy)]
struct FamilyTtls {
    access: i64,
    refresh: i64,
    change_password: i64,
    confirm_email: i64,
}

impl TokenValidator {
    pub fn new(config: &AuthConfig, clock: Arc<dyn Clock>) -> Result<Self, AuthError> {
        let keyring = Arc::new(Keyring::from_config(config)?);
        Ok(Self::with_keyring(config, TokenCodec::new(), keyring, clock))
    }

    pub fn with_keyring(
        config: &AuthConfig,
        codec: TokenCodec,
        keyring: Arc<Keyring>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            codec,
            keyring,
            clock,
            ttl: FamilyTtls {
                access: config.access.ttl_seconds,
                refresh: config.refresh.ttl_seconds,
                change_password: config.change_password.ttl_seconds,
                confirm_email: config.confirm_email.ttl_seconds,
            },
        }
    }

    pub fn verify_access(&self, token: &str) -> Result<VerifiedClaims, AuthError> {
        self.verify(TokenType::Access, token)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<VerifiedClaims, AuthError> {
        self.verify(TokenType::Refresh, token)
    }

    pub fn verify_change_password(&self, token: &str) -> Result<EmailClaims, AuthError> {
        self.verify(TokenType::ChangePassword, token)?.try_into()
    }

    pub fn verify_confirm_email(&self, token: &str) -> Result<EmailClaims, AuthError> {
        self.verify(TokenType::ConfirmEmail, token)?.try_into()
    }

    /// Verify `token` as a member of `expected`
    pub fn verify(&self, expected: TokenType, token: &str) -> Result<VerifiedClaims, AuthError> {
        let result = self.verify_inner(expected, token);

        if let Err(err) = &result {
            tracing::debug!(token_type = %expected, reason = err.code(), "Token rejected");
        }

        result
    }

    fn verify_inner(&self, expected: TokenType, token: &str) -> Result<VerifiedClaims, AuthError> {
        let mut claims = self.codec.verify(self.keyring.get(expected), token)?;

        let issued_at = take_issued_at(&mut claims)?;
        let expires_at = issued_at
            .checked_add(self.ttl_seconds(expected))
            .ok_or_else(|| AuthError::MalformedClaims("iat out of range".to_string()))?;

        if expires_at <= self.clock.now() {
            return Err(AuthError::Expired);
        }

        let token_type = match claims.remove(TOKEN_TYPE_CLAIM) {
            Some(Value::String(found)) if found == expected.as_str() => expected,
            Some(Value::String(found)) => return Err(AuthError::WrongTokenType { expected, found }),
            Some(other) => {
                return Err(AuthError::WrongTokenType {
                    expected,
                    found: other.to_string(),
                })
            }
            None => {
                return Err(AuthError::WrongTokenType {
                    expected,
                    found: "none".to_string(),
                })
            }
        };

        Ok(VerifiedClaims {
            token_type,
            issued_at,
            payload: claims,
        })
    }

    /// Configured validity window of a family
    pub fn ttl_seconds(&self, token_type: TokenType) -> i64 {
        match token_type {
            TokenType::Access => self.ttl.access,
            TokenType::Refresh => self.ttl.refresh,
            TokenType::ChangePassword => self.ttl.change_password,
            TokenType::ConfirmEmail => self.ttl.confirm_email,
        }
    }
}

fn take_issued_at(claims: &mut Claims) -> Result<i64, AuthError> {
    claims
        .remove(ISSUED_AT_CLAIM)
        .as_ref()
        .and_then(Value::as_i64)
        .ok_or_else(|| AuthError::MalformedClaims("missing or non-integer iat".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::issuer::TokenIssuer;
    use serde_json::json;

    const NOW: i64 = 1_700_000_000;

    struct Fixture {
        clock: Arc<ManualClock>,
        issuer: TokenIssuer,
        validator: TokenValidator,
        config: AuthConfig,
    }

    fn fixture() -> Fixture {
        let config = AuthConfig::test_default();
        let clock = Arc::new(ManualClock::new(NOW));
        Fixture {
            issuer: TokenIssuer::new(&config, clock.clone()).unwrap(),
            validator: TokenValidator::new(&config, clock.clone()).unwrap(),
            clock,
            config,
        }
    }

    #[test]
    fn test_access_round_trip() {
        let f = fixture();
        let token = f
            .issuer
            .issue_access(&json!({ "userId": 42, "role": "admin" }))
            .unwrap();

        let verified = f.validator.verify_access(&token).unwrap();
        assert_eq!(verified.token_type, TokenType::Access);
        assert_eq!(verified.issued_at, NOW);
        assert_eq!(verified.get("userId"), Some(&json!(42)));
        assert_eq!(verified.get("role"), Some(&json!("admin")));
        assert!(verified.get("tokenType").is_none());
        assert_eq!(
            Value::Object(verified.into_claims()),
            json!({ "userId": 42, "role": "admin", "tokenType": "access", "iat": NOW })
        );
    }

    #[test]
    fn test_access_expires_after_ttl() {
        let f = fixture();
        let token = f
            .issuer
            .issue_access(&json!({ "userId": 42, "role": "admin" }))
            .unwrap();

        f.clock.advance(301);
        assert_eq!(f.validator.verify_access(&token), Err(AuthError::Expired));
    }

    #[test]
    fn test_expiry_boundary_for_every_family() {
        for family in TokenType::ALL {
            let f = fixture();
            let ttl = f.config.family(family).ttl_seconds;
            let token = match family {
                TokenType::Access => f.issuer.issue_access(&json!({ "userId": 1 })),
                TokenType::Refresh => f.issuer.issue_refresh(&json!({ "userId": 1 })),
                TokenType::ChangePassword => f.issuer.issue_change_password("a@b.com"),
                TokenType::ConfirmEmail => f.issuer.issue_confirm_email("a@b.com"),
            }
            .unwrap();

            f.clock.set(NOW + ttl - 1);
            assert!(f.validator.verify(family, &token).is_ok(), "{family} at ttl-1");

            f.clock.set(NOW + ttl);
            assert_eq!(
                f.validator.verify(family, &token),
                Err(AuthError::Expired),
                "{family} at ttl"
            );

            f.clock.set(NOW + ttl + 1);
            assert_eq!(f.validator.verify(family, &token), Err(AuthError::Expired));
        }
    }

    #[test]
    fn test_mail_families_do_not_cross() {
        let f = fixture();

        let confirm = f.issuer.issue_confirm_email("a@b.com").unwrap();
        assert_eq!(
            f.validator.verify_change_password(&confirm),
            Err(AuthError::WrongTokenType {
                expected: TokenType::ChangePassword,
                found: "confirm-email".to_string(),
            })
        );
        assert_eq!(
            f.validator.verify_confirm_email(&confirm).unwrap(),
            EmailClaims {
                email: "a@b.com".to_string(),
                issued_at: NOW,
            }
        );

        let reset = f.issuer.issue_change_password("a@b.com").unwrap();
        assert!(matches!(
            f.validator.verify_confirm_email(&reset),
            Err(AuthError::WrongTokenType { .. })
        ));
        assert_eq!(
            f.validator.verify_change_password(&reset).unwrap().email,
            "a@b.com"
        );
    }

    #[test]
    fn test_session_families_do_not_cross() {
        let f = fixture();
        let payload = json!({ "userId": 42 });

        let access = f.issuer.issue_access(&payload).unwrap();
        let refresh = f.issuer.issue_refresh(&payload).unwrap();

        assert_eq!(
            f.validator.verify_refresh(&access),
            Err(AuthError::VerificationFailed)
        );
        assert_eq!(
            f.validator.verify_access(&refresh),
            Err(AuthError::VerificationFailed)
        );
        assert_eq!(
            f.validator.verify_change_password(&access),
            Err(AuthError::VerificationFailed)
        );
    }

    #[test]
    fn test_token_type_checked_even_with_shared_secret() {
        // Same key for access and refresh: only tokenType keeps them apart
        let mut config = AuthConfig::test_default();
        config.refresh.secret = config.access.secret.clone();
        let clock = Arc::new(ManualClock::new(NOW));
        let issuer = TokenIssuer::new(&config, clock.clone()).unwrap();
        let validator = TokenValidator::new(&config, clock).unwrap();

        let refresh = issuer.issue_refresh(&json!({ "userId": 42 })).unwrap();
        assert_eq!(
            validator.verify_access(&refresh),
            Err(AuthError::WrongTokenType {
                expected: TokenType::Access,
                found: "refresh".to_string(),
            })
        );
    }

    #[test]
    fn test_expiry_is_checked_before_token_type() {
        let f = fixture();
        let confirm = f.issuer.issue_confirm_email("a@b.com").unwrap();

        f.clock.advance(10_000);
        assert_eq!(
            f.validator.verify_change_password(&confirm),
            Err(AuthError::Expired)
        );
    }

    #[test]
    fn test_ttl_is_not_taken_from_token() {
        // A lifetime change applies to tokens already in circulation
        let f = fixture();
        let token = f.issuer.issue_access(&json!({ "userId": 1 })).unwrap();

        let mut shorter = f.config.clone();
        shorter.access.ttl_seconds = 10;
        let validator = TokenValidator::new(&shorter, f.clock.clone()).unwrap();

        f.clock.advance(10);
        assert_eq!(validator.verify_access(&token), Err(AuthError::Expired));
        assert!(f.validator.verify_access(&token).is_ok());
    }

    #[test]
    fn test_each_family_uses_its_own_ttl() {
        let mut config = AuthConfig::test_default();
        config.access.ttl_seconds = 11;
        config.refresh.ttl_seconds = 22;
        config.change_password.ttl_seconds = 33;
        config.confirm_email.ttl_seconds = 44;

        let validator = TokenValidator::new(&config, Arc::new(ManualClock::new(NOW))).unwrap();
        for family in TokenType::ALL {
            assert_eq!(
                validator.ttl_seconds(family),
                config.family(family).ttl_seconds,
                "{family}"
            );
        }
    }

    #[test]
    fn test_missing_control_claims() {
        let f = fixture();
        let codec = TokenCodec::new();
        let keyring = Keyring::from_config(&f.config).unwrap();

        let no_iat = json!({ "tokenType": "access", "userId": 1 });
        let token = codec
            .sign(keyring.get(TokenType::Access), no_iat.as_object().unwrap())
            .unwrap();
        assert!(matches!(
            f.validator.verify_access(&token),
            Err(AuthError::MalformedClaims(_))
        ));

        let no_type = json!({ "iat": NOW, "userId": 1 });
        let token = codec
            .sign(keyring.get(TokenType::Access), no_type.as_object().unwrap())
            .unwrap();
        assert!(matches!(
            f.validator.verify_access(&token),
            Err(AuthError::WrongTokenType { .. })
        ));

        let huge_iat = json!({ "iat": i64::MAX, "tokenType": "access" });
        let token = codec
            .sign(keyring.get(TokenType::Access), huge_iat.as_object().unwrap())
            .unwrap();
        assert!(matches!(
            f.validator.verify_access(&token),
            Err(AuthError::MalformedClaims(_))
        ));
    }

    #[test]
    fn test_garbage_is_rejected() {
        let f = fixture();
        assert_eq!(
            f.validator.verify_access("not.a.token"),
            Err(AuthError::VerificationFailed)
        );
        assert_eq!(
            f.validator.verify_confirm_email(""),
            Err(AuthError::VerificationFailed)
        );
    }
}
