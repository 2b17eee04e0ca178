// --- File: crates/geotrack_common/src/crypto.rs ---
//! Field-level encryption of integration credentials.
//!
//! Secrets are sealed with AES-256-GCM using a random 12-byte IV per value;
//! ciphertext, IV and tag are stored separately as base64 in an
//! [`EncryptedSecret`].

use base64::{engine::general_purpose, Engine as _};
use ring::aead::{self, Aad, LessSafeKey, Nonce, UnboundKey, NONCE_LEN};
use ring::rand::{SecureRandom, SystemRandom};
use std::fmt;
use thiserror::Error;

use crate::models::EncryptedSecret;

const KEY_LEN: usize = 32;
const TAG_LEN: usize = 16;

#[derive(Error, Debug)]
pub enum SecretError {
    #[error("Key error: {0}")]
    KeyError(String),

    #[error("Base64 error: {0}")]
    Base64Error(#[from] base64::DecodeError),

    #[error("Malformed secret: {0}")]
    Malformed(String),

    #[error("Decrypted value is not UTF-8")]
    NotUtf8,

    /// Authentication failed or the RNG was unavailable.
    #[error("Cryptographic operation failed")]
    CryptoError,
}

impl From<ring::error::Unspecified> for SecretError {
    fn from(_: ring::error::Unspecified) -> Self {
        SecretError::CryptoError
    }
}

/// Opaque encrypt/decrypt capability consumed by the tracking jobs.
pub trait SecretCipher: Send + Sync {
    fn encrypt(&self, plaintext: &str) -> Result<EncryptedSecret, SecretError>;

    fn decrypt(&self, secret: &EncryptedSecret) -> Result<String, SecretError>;
}

/// AES-256-GCM cipher backed by `ring`.
pub struct AesGcmCipher {
    key: LessSafeKey,
    rng: SystemRandom,
}

impl fmt::Debug for AesGcmCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AesGcmCipher").finish_non_exhaustive()
    }
}

impl AesGcmCipher {
    pub fn new(key_bytes: &[u8]) -> Result<Self, SecretError> {
        if key_bytes.len() != KEY_LEN {
            return Err(SecretError::KeyError(format!(
                "Encryption key must be {} bytes, got {} bytes",
                KEY_LEN,
                key_bytes.len()
            )));
        }
        let unbound = UnboundKey::new(&aead::AES_256_GCM, key_bytes)?;
        Ok(Self {
            key: LessSafeKey::new(unbound),
            rng: SystemRandom::new(),
        })
    }

    /// Builds the cipher from the `encryption.key_base64` config value.
    pub fn from_base64_key(key_b64: &str) -> Result<Self, SecretError> {
        let key_bytes = general_purpose::STANDARD.decode(key_b64.trim())?;
        Self::new(&key_bytes)
    }
}

impl SecretCipher for AesGcmCipher {
    fn encrypt(&self, plaintext: &str) -> Result<EncryptedSecret, SecretError> {
        let mut iv = [0u8; NONCE_LEN];
        self.rng.fill(&mut iv)?;

        let mut in_out = plaintext.as_bytes().to_vec();
        let tag = self.key.seal_in_place_separate_tag(
            Nonce::assume_unique_for_key(iv),
            Aad::empty(),
            &mut in_out,
        )?;

        Ok(EncryptedSecret {
            ciphertext_b64: general_purpose::STANDARD.encode(&in_out),
            iv_b64: general_purpose::STANDARD.encode(iv),
            tag_b64: general_purpose::STANDARD.encode(tag.as_ref()),
        })
    }

    fn decrypt(&self, secret: &EncryptedSecret) -> Result<String, SecretError> {
        let iv = general_purpose::STANDARD.decode(&secret.iv_b64)?;
        let tag = general_purpose::STANDARD.decode(&secret.tag_b64)?;
        let mut in_out = general_purpose::STANDARD.decode(&secret.ciphertext_b64)?;

        if tag.len() != TAG_LEN {
            return Err(SecretError::Malformed(format!(
                "tag must be {} bytes, got {}",
                TAG_LEN,
                tag.len()
            )));
        }
        let nonce = Nonce::try_assume_unique_for_key(&iv).map_err(|_| {
            SecretError::Malformed(format!("iv must be {} bytes, got {}", NONCE_LEN, iv.len()))
        })?;

        in_out.extend_from_slice(&tag);
        let plaintext = self.key.open_in_place(nonce, Aad::empty(), &mut in_out)?;
        String::from_utf8(plaintext.to_vec()).map_err(|_| SecretError::NotUtf8)
    }
}
