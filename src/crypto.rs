//! Symmetric sealing of stored profile secrets.
//!
//! Secrets are sealed with AES-256-GCM under a key derived from the operator's
//! passphrase. The stored form is the hex encoding of `nonce || ciphertext`,
//! so a single text column holds everything needed to open it again.
//!
//! The passphrase is turned into a key with a single unsalted SHA-256. That is
//! fast to brute force if the database leaks; callers that seal new secrets
//! surface [`KDF_WARNING`] to the operator.

use aes_gcm::{
    Aes256Gcm, Key, Nonce,
    aead::{Aead, AeadCore, KeyInit, OsRng},
};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::error::{Result, SshmanError};

/// Nonce length of AES-GCM in bytes.
pub const NONCE_LEN: usize = 12;

/// Notice shown when a new secret is sealed.
pub const KDF_WARNING: &str = "Note: the passphrase is hashed once without a salt. \
     Use a long passphrase and keep the database file private.";

/// A 256-bit key derived from a passphrase. Lives only in memory.
#[derive(Clone, PartialEq, Eq)]
pub struct VaultKey([u8; 32]);

impl VaultKey {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for VaultKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("VaultKey(..)")
    }
}

/// Derive a key from a passphrase (SHA-256 of its UTF-8 bytes).
pub fn derive_key(passphrase: &str) -> VaultKey {
    let digest: [u8; 32] = Sha256::digest(passphrase.as_bytes()).into();
    VaultKey(digest)
}

/// Seal `plaintext` under `key`. Returns `nonce || ciphertext`.
pub fn encrypt(plaintext: &[u8], key: &VaultKey) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let sealed = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| SshmanError::Other(format!("encryption failed: {}", e)))?;

    let mut out = Vec::with_capacity(NONCE_LEN + sealed.len());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&sealed);
    Ok(out)
}

/// Open `nonce || ciphertext` under `key`.
///
/// A wrong key, a flipped byte and a truncated input all yield the same
/// `Authentication` error.
pub fn decrypt(data: &[u8], key: &VaultKey) -> Result<Vec<u8>> {
    if data.len() < NONCE_LEN {
        return Err(SshmanError::authentication("ciphertext is malformed or the key is wrong"));
    }
    let (nonce, body) = data.split_at(NONCE_LEN);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));
    cipher
        .decrypt(Nonce::from_slice(nonce), body)
        .map_err(|_| SshmanError::authentication("ciphertext is malformed or the key is wrong"))
}

/// Seal and hex-encode for storage in a text column.
pub fn seal_hex(plaintext: &[u8], key: &VaultKey) -> Result<String> {
    Ok(hex::encode(encrypt(plaintext, key)?))
}

/// Decode hex and open. Bad hex is reported like a failed tag check.
pub fn open_hex(encoded: &str, key: &VaultKey) -> Result<Vec<u8>> {
    let data = hex::decode(encoded.trim())
        .map_err(|_| SshmanError::authentication("ciphertext is malformed or the key is wrong"))?;
    decrypt(&data, key)
}

/// Open a hex-encoded secret that must be UTF-8 text (passwords, PEM keys).
pub fn open_str(encoded: &str, key: &VaultKey) -> Result<String> {
    let plain = open_hex(encoded, key)?;
    String::from_utf8(plain)
        .map_err(|_| SshmanError::authentication("ciphertext is malformed or the key is wrong"))
}
