//! Password Hashing
//!
//! Argon2id hashing and verification. Digests are PHC strings carrying their
//! own salt and cost parameters, so digests created under older costs keep
//! verifying after the configured costs change.

use crate::config::AuthConfig;
use crate::error::AuthError;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, SaltString},
    Algorithm, Argon2, Params, PasswordHasher as _, PasswordVerifier, Version,
};

/// Argon2id hasher with fixed cost parameters
#[derive(Clone)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
}

impl PasswordHasher {
    /// Create a hasher with explicit cost parameters
    pub fn new(params: Params) -> Self {
        Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        }
    }

    /// Create a hasher from the configured cost parameters
    pub fn from_config(config: &AuthConfig) -> Result<Self, AuthError> {
        Ok(Self::new(config.argon2_params()?))
    }

    /// Cost parameters applied to new digests
    pub fn params(&self) -> &Params {
        self.argon2.params()
    }

    /// Hash a password with a fresh random salt
    pub fn hash(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);

        let hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)?
            .to_string();

        Ok(hash)
    }

    /// Verify a password against a stored digest
    ///
    /// `Ok(false)` is a plain mismatch. An `Err` means the digest itself could
    /// not be used and must be treated as an authentication failure.
    pub fn verify(&self, password: &str, digest: &str) -> Result<bool, AuthError> {
        let parsed_hash =
            PasswordHash::new(digest).map_err(|e| AuthError::InvalidDigest(e.to_string()))?;

        match self.argon2.verify_password(password.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AuthError::InvalidDigest(e.to_string())),
        }
    }

    /// Like [`verify`](Self::verify), but a mismatch is an error
    pub fn check(&self, password: &str, digest: &str) -> Result<(), AuthError> {
        if self.verify(password, digest)? {
            Ok(())
        } else {
            Err(AuthError::PasswordMismatch)
        }
    }
}

impl std::fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordHasher")
            .field("params", self.params())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> PasswordHasher {
        PasswordHasher::from_config(&AuthConfig::test_default()).unwrap()
    }

    #[test]
    fn test_hash_and_verify() {
        let hasher = hasher();
        let digest = hasher.hash("correct horse battery staple").unwrap();

        assert!(digest.starts_with("$argon2id$v=19$"));
        assert!(!digest.contains("correct horse"));
        assert!(hasher.verify("correct horse battery staple", &digest).unwrap());
        assert!(!hasher.verify("Tr0ub4dor&3", &digest).unwrap());
    }

    #[test]
    fn test_hash_is_salted() {
        let hasher = hasher();
        let first = hasher.hash("hunter22").unwrap();
        let second = hasher.hash("hunter22").unwrap();

        assert_ne!(first, second);
        assert!(hasher.verify("hunter22", &first).unwrap());
        assert!(hasher.verify("hunter22", &second).unwrap());
    }

    #[test]
    fn test_verify_malformed_digest() {
        let hasher = hasher();

        assert!(matches!(
            hasher.verify("hunter22", "not-a-phc-string"),
            Err(AuthError::InvalidDigest(_))
        ));
        assert!(hasher.verify("hunter22", "").is_err());
    }

    #[test]
    fn test_verify_uses_digest_params() {
        let cheap = hasher();
        let digest = cheap.hash("hunter22").unwrap();

        let other = PasswordHasher::new(Params::new(2048, 2, 1, None).unwrap());
        assert!(other.verify("hunter22", &digest).unwrap());
    }

    #[test]
    fn test_check_reports_mismatch() {
        let hasher = hasher();
        let digest = hasher.hash("hunter22").unwrap();

        assert_eq!(hasher.check("hunter22", &digest), Ok(()));
        assert_eq!(
            hasher.check("hunter23", &digest),
            Err(AuthError::PasswordMismatch)
        );
    }

    #[test]
    fn test_default_cost_floor() {
        let mut config = AuthConfig::test_default();
        config.argon2_memory_cost = 65536;
        config.argon2_time_cost = 3;
        config.argon2_parallelism = 1;

        let hasher = PasswordHasher::from_config(&config).unwrap();
        assert_eq!(hasher.params().m_cost(), 65536);
        assert_eq!(hasher.params().t_cost(), 3);
        assert_eq!(hasher.params().p_cost(), 1);
    }
}
