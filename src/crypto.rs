//! # Symmetric Crypto Engine
//!
//! Authenticated encryption of whole plaintexts under a caller-supplied key.
//!
//! ## Security Properties
//!
//! - **Encryption:** XChaCha20-Poly1305 AEAD with a random 192-bit nonce per token
//! - **Key Derivation:** BLAKE3 `derive_key` turns opaque key material of any
//!   length into a 256-bit cipher key
//! - **Fail Closed:** wrong key, truncation and tampering all surface as
//!   [`CryptoError::DecryptionFailed`]; no plaintext is returned
//! - **Memory Safety:** key bytes and decrypted plaintext are zeroized on drop
//!
//! ## Token Format
//!
//! ```text
//! +-------------+-------------+----------------+-----------------------------+
//! | Magic (4B)  | Version (1B)| Nonce (24B)    | Ciphertext (N) + Tag (16B)  |
//! +-------------+-------------+----------------+-----------------------------+
//! ```
//!
//! Magic and version are bound to the ciphertext as associated data.

use crate::error::CryptoError;
use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    Key, XChaCha20Poly1305, XNonce,
};
use std::fmt;
use std::path::Path;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Token magic bytes.
const MAGIC: &[u8; 4] = b"DVLT";

/// Current token format version.
const FORMAT_VERSION: u8 = 1;

/// Size of the token header (magic + version).
const HEADER_SIZE: usize = MAGIC.len() + 1;

/// Size of nonce for XChaCha20-Poly1305.
const NONCE_SIZE: usize = 24;

/// Size of authentication tag.
const TAG_SIZE: usize = 16;

/// Context string for deriving the cipher key from caller key material.
const KEY_CONTEXT: &str = "dotvault 2024-01-01 entry encryption key v1";

/// Cipher key derived from opaque caller-supplied material.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct CryptoKey {
    key: [u8; 32],
}

impl CryptoKey {
    /// Derive a key from opaque bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::EmptyKey`] if `material` is empty.
    pub fn from_material(material: &[u8]) -> Result<Self, CryptoError> {
        if material.is_empty() {
            return Err(CryptoError::EmptyKey);
        }
        Ok(Self {
            key: blake3::derive_key(KEY_CONTEXT, material),
        })
    }

    /// Read key material from a file.
    ///
    /// Trailing ASCII whitespace (usually an editor-added newline) is not
    /// part of the key.
    pub fn from_file(path: &Path) -> Result<Self, crate::error::DotfileError> {
        let raw = Zeroizing::new(std::fs::read(path)?);
        let end = raw
            .iter()
            .rposition(|b| !b.is_ascii_whitespace())
            .map_or(0, |i| i + 1);
        Ok(Self::from_material(&raw[..end])?)
    }

    fn cipher(&self) -> XChaCha20Poly1305 {
        XChaCha20Poly1305::new(Key::from_slice(&self.key))
    }
}

impl fmt::Debug for CryptoKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CryptoKey(<redacted>)")
    }
}

fn header() -> [u8; HEADER_SIZE] {
    let mut header = [0u8; HEADER_SIZE];
    header[..MAGIC.len()].copy_from_slice(MAGIC);
    header[MAGIC.len()] = FORMAT_VERSION;
    header
}

/// Encrypt a plaintext into a self-contained token.
///
/// # Errors
///
/// Fails if the system random source is unavailable or the AEAD rejects the
/// input.
pub fn encrypt(plaintext: &[u8], key: &CryptoKey) -> Result<Vec<u8>, CryptoError> {
    let mut nonce = [0u8; NONCE_SIZE];
    getrandom::getrandom(&mut nonce)
        .map_err(|e| CryptoError::RandomGenerationFailed(e.to_string()))?;

    let header = header();
    let ciphertext = key
        .cipher()
        .encrypt(
            XNonce::from_slice(&nonce),
            Payload {
                msg: plaintext,
                aad: &header,
            },
        )
        .map_err(|_| CryptoError::EncryptionFailed)?;

    let mut token = Vec::with_capacity(HEADER_SIZE + NONCE_SIZE + ciphertext.len());
    token.extend_from_slice(&header);
    token.extend_from_slice(&nonce);
    token.extend_from_slice(&ciphertext);
    Ok(token)
}

/// Decrypt a token produced by [`encrypt`].
///
/// # Errors
///
/// Returns [`CryptoError::DecryptionFailed`] for a wrong key, a foreign or
/// truncated token, or any modified byte.
pub fn decrypt(token: &[u8], key: &CryptoKey) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    if token.len() < HEADER_SIZE + NONCE_SIZE + TAG_SIZE {
        return Err(CryptoError::DecryptionFailed);
    }
    let (header, rest) = token.split_at(HEADER_SIZE);
    if header != self::header().as_slice() {
        return Err(CryptoError::DecryptionFailed);
    }
    let (nonce, ciphertext) = rest.split_at(NONCE_SIZE);

    key.cipher()
        .decrypt(
            XNonce::from_slice(nonce),
            Payload {
                msg: ciphertext,
                aad: header,
            },
        )
        .map(Zeroizing::new)
        .map_err(|_| CryptoError::DecryptionFailed)
}
