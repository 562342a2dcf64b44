//! # Note cipher: encrypting private notes at rest
//!
//! Private note bodies are stored in the `private_notes` table only as cipher
//! text. This module turns plaintext into that cipher text and back using
//! **AES-256-GCM** with a server-managed key.
//!
//! ## Key
//!
//! The deployment provides a passphrase in `NOTES_ENCRYPTION_KEY`. [`NoteKey::derive`]
//! stretches it into a 32-byte key with Argon2id and a fixed application salt,
//! once at start-up. The same passphrase always yields the same key, so notes
//! written before a restart stay readable after it.
//!
//! ## Format
//!
//! Each call to [`encrypt`] draws a fresh random 12-byte nonce. The stored string
//! is lowercase hex of `nonce || ciphertext || tag`, so encrypting the same text
//! twice gives two different strings.
//!
//! | Function | Purpose |
//! |----------|---------|
//! | [`encrypt`] | Plaintext to stored cipher text. |
//! | [`decrypt`] | Stored cipher text to plaintext; any failure is an error. |
//!
//! Views that must not fail on one bad row (the notes list) catch the error
//! themselves and show the note empty and flagged.

use std::fmt;

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use argon2::Argon2;
use rand::RngCore;
use thiserror::Error;

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;
const KEY_SALT: &[u8] = b"mindcare/private-notes/v1";

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Encryption key must not be empty")]
    EmptyKey,

    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("Encryption failed")]
    Encrypt,

    #[error("Cipher text is not valid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("Cipher text is too short")]
    Truncated,

    #[error("Decryption failed: wrong key or corrupted data")]
    Decrypt,

    #[error("Decrypted content is not valid UTF-8")]
    InvalidUtf8,
}

/// The symmetric key all notes are encrypted with.
#[derive(Clone)]
pub struct NoteKey([u8; 32]);

impl NoteKey {
    /// Derive the key from the configured passphrase.
    pub fn derive(passphrase: &str) -> Result<Self, CryptoError> {
        if passphrase.is_empty() {
            return Err(CryptoError::EmptyKey);
        }
        let mut key = [0u8; 32];
        Argon2::default()
            .hash_password_into(passphrase.as_bytes(), KEY_SALT, &mut key)
            .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
        Ok(Self(key))
    }

    fn cipher(&self) -> Result<Aes256Gcm, CryptoError> {
        Aes256Gcm::new_from_slice(&self.0).map_err(|e| CryptoError::KeyDerivation(e.to_string()))
    }
}

impl fmt::Debug for NoteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NoteKey(..)")
    }
}

/// Encrypt `plaintext` for storage.
pub fn encrypt(plaintext: &str, key: &NoteKey) -> Result<String, CryptoError> {
    let cipher = key.cipher()?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let sealed = cipher
        .encrypt(nonce, plaintext.as_bytes())
        .map_err(|_| CryptoError::Encrypt)?;

    let mut out = Vec::with_capacity(NONCE_LEN + sealed.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&sealed);
    Ok(hex::encode(out))
}

/// Decrypt a string produced by [`encrypt`] with the same key.
pub fn decrypt(ciphertext: &str, key: &NoteKey) -> Result<String, CryptoError> {
    let bytes = hex::decode(ciphertext.trim())?;
    if bytes.len() < NONCE_LEN + TAG_LEN {
        return Err(CryptoError::Truncated);
    }
    let (nonce_bytes, sealed) = bytes.split_at(NONCE_LEN);

    let plaintext = key
        .cipher()?
        .decrypt(Nonce::from_slice(nonce_bytes), sealed)
        .map_err(|_| CryptoError::Decrypt)?;

    String::from_utf8(plaintext).map_err(|_| CryptoError::InvalidUtf8)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> NoteKey {
        NoteKey::derive("correct horse battery staple").unwrap()
    }

    #[test]
    fn test_round_trip() {
        let key = key();
        for text in ["", "hello", "Heute war gut. 😊 ünïcödé", "line one\nline two"] {
            let sealed = encrypt(text, &key).unwrap();
            assert_eq!(decrypt(&sealed, &key).unwrap(), text);
        }
    }

    #[test]
    fn test_cipher_text_hides_plaintext_and_varies() {
        let key = key();
        let a = encrypt("I felt anxious today", &key).unwrap();
        let b = encrypt("I felt anxious today", &key).unwrap();
        assert_ne!(a, b);
        assert!(!a.contains("anxious"));
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(a.len(), 2 * (NONCE_LEN + "I felt anxious today".len() + TAG_LEN));
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let sealed = encrypt("stable", &key()).unwrap();
        assert_eq!(decrypt(&sealed, &key()).unwrap(), "stable");
    }

    #[test]
    fn test_wrong_key_fails() {
        let sealed = encrypt("secret", &key()).unwrap();
        let other = NoteKey::derive("another passphrase").unwrap();
        assert!(matches!(decrypt(&sealed, &other), Err(CryptoError::Decrypt)));
    }

    #[test]
    fn test_corrupted_input_fails() {
        let key = key();
        let mut sealed = encrypt("secret", &key).unwrap();
        let last = if sealed.ends_with('0') { "1" } else { "0" };
        sealed.replace_range(sealed.len() - 1.., last);
        assert!(matches!(decrypt(&sealed, &key), Err(CryptoError::Decrypt)));

        assert!(matches!(decrypt("not hex!", &key), Err(CryptoError::InvalidHex(_))));
        assert!(matches!(decrypt("00ff", &key), Err(CryptoError::Truncated)));
        assert!(decrypt("U2FsdGVkX1+legacy", &key).is_err());
    }

    #[test]
    fn test_empty_passphrase_rejected() {
        assert!(matches!(NoteKey::derive(""), Err(CryptoError::EmptyKey)));
    }
}
