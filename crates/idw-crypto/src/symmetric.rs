//! # Symmetric Keys
//!
//! AES-256-GCM keys for the encryption envelope. The 12-byte GCM nonce is the
//! envelope's initialization vector. Key bytes are zeroized on drop.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use idw_core::CryptoError;
use rand::{CryptoRng, RngCore};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Length of a symmetric key in bytes.
pub const KEY_LENGTH: usize = 32;

/// Length of an initialization vector in bytes.
pub const IV_LENGTH: usize = 12;

/// An AES-256-GCM key.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey([u8; KEY_LENGTH]);

impl SymmetricKey {
    /// A fresh random key.
    pub fn generate<R: RngCore + CryptoRng + ?Sized>(rng: &mut R) -> Self {
        let mut key = [0u8; KEY_LENGTH];
        rng.fill_bytes(&mut key);
        Self(key)
    }

    /// Wrap raw key bytes.
    pub fn from_bytes(bytes: [u8; KEY_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Wrap a slice that must be exactly [`KEY_LENGTH`] bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let key: [u8; KEY_LENGTH] = bytes.try_into().map_err(|_| {
            CryptoError::InvalidKey(format!(
                "symmetric key must be {KEY_LENGTH} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(key))
    }

    /// The raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.0
    }

    /// Encrypt `plaintext`; the output carries the GCM tag.
    pub fn encrypt(&self, iv: &[u8; IV_LENGTH], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let cipher = Aes256Gcm::new_from_slice(&self.0)
            .map_err(|e| CryptoError::Cipher(format!("cipher init failed: {e}")))?;
        cipher
            .encrypt(Nonce::from_slice(iv), plaintext)
            .map_err(|e| CryptoError::Cipher(format!("encryption failed: {e}")))
    }

    /// Decrypt and authenticate `ciphertext`.
    pub fn decrypt(&self, iv: &[u8; IV_LENGTH], ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let cipher = Aes256Gcm::new_from_slice(&self.0)
            .map_err(|e| CryptoError::Cipher(format!("cipher init failed: {e}")))?;
        cipher
            .decrypt(Nonce::from_slice(iv), ciphertext)
            .map_err(|e| CryptoError::Cipher(format!("decryption failed: {e}")))
    }
}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SymmetricKey(<redacted>)")
    }
}

/// A fresh random initialization vector.
pub fn generate_iv<R: RngCore + CryptoRng + ?Sized>(rng: &mut R) -> [u8; IV_LENGTH] {
    let mut iv = [0u8; IV_LENGTH];
    rng.fill_bytes(&mut iv);
    iv
}
