//! Operator password hashing and verification using Argon2id.

use crate::errors::{Error, Result};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use rand_core::OsRng;
use tracing::{debug, error};

/// Password hashing service using Argon2 with default parameters.
#[derive(Debug, Clone, Default)]
pub struct PasswordService {
    argon2: Argon2<'static>,
}

impl PasswordService {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hashes a password, returning the PHC string to store.
    pub fn hash_password(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);

        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| {
                error!(error = %e, "Failed to hash password");
                Error::PasswordHash {
                    message: format!("Password hashing failed: {e}"),
                }
            })
    }

    /// Checks a password against a stored hash.
    ///
    /// Returns `Ok(false)` for a wrong password and an error only for a malformed hash.
    pub fn verify_password(&self, password: &str, hash: &str) -> Result<bool> {
        let parsed_hash = PasswordHash::new(hash).map_err(|e| {
            error!(error = %e, "Failed to parse password hash");
            Error::PasswordHash {
                message: format!("Invalid password hash format: {e}"),
            }
        })?;

        match self
            .argon2
            .verify_password(password.as_bytes(), &parsed_hash)
        {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => {
                debug!("Password verification failed: incorrect password");
                Ok(false)
            }
            Err(e) => Err(Error::PasswordHash {
                message: format!("Password verification failed: {e}"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let service = PasswordService::new();
        let hash = service.hash_password("correct_password").unwrap();

        assert!(hash.starts_with("$argon2"));
        assert!(service.verify_password("correct_password", &hash).unwrap());
        assert!(!service.verify_password("wrong_password", &hash).unwrap());
    }

    #[test]
    fn test_same_password_gets_different_salts() {
        let service = PasswordService::new();
        let first = service.hash_password("same").unwrap();
        let second = service.hash_password("same").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_invalid_hash_format() {
        let service = PasswordService::new();
        let result = service.verify_password("password", "not_a_valid_hash");
        assert!(matches!(result, Err(Error::PasswordHash { .. })));
    }
}
