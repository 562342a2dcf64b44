//! # Password hashing and verification: Argon2id
//!
//! The hosted identity provider keeps its own password hashes; these helpers
//! back the in-memory backend's accounts, which are hashed the same way a
//! real store would hash them:
//!
//! - [`hash_password`] draws a random salt via [`OsRng`] and returns a
//!   PHC-format string (`$argon2id$v=19$...`).
//! - [`verify_password`] checks a plaintext against such a string. A mismatch is
//!   `Ok(false)`; only a malformed stored hash is an error.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::error::ApiError;

pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| ApiError::PasswordHash(e.to_string()))?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, ApiError> {
    let parsed = PasswordHash::new(hash).map_err(|e| ApiError::PasswordHash(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("Secret123").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("Secret123", &hash).unwrap());
        assert!(!verify_password("secret123", &hash).unwrap());
        assert!(verify_password("Secret123", "not-a-hash").is_err());
    }
}
