//! Self-describing artifact encoding.
//!
//! Layout before encoding:
//!
//! ```text
//! version (1) | issued_at, unix seconds BE (8) | nonce (12) | AES-256-GCM ciphertext + tag
//! ```
//!
//! `version | issued_at` is bound as associated data, so the whole token is
//! authenticated. The result is stored as URL-safe base64 text.

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng, Payload},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::URL_SAFE, Engine as _};
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::key_provider::KeyMaterial;

pub const TOKEN_VERSION: u8 = 0x80;

const HEADER_LEN: usize = 1 + 8;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("artifact is not valid base64: {0}")]
    Encoding(String),
    #[error("artifact is truncated ({0} bytes)")]
    Truncated(usize),
    #[error("unsupported artifact version {0:#04x}")]
    UnsupportedVersion(u8),
    #[error("authentication failed: wrong key or tampered artifact")]
    Authentication,
    #[error("encrypt failed: {0}")]
    Seal(String),
}

/// Plaintext recovered from a token together with its embedded timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opened {
    pub plaintext: Vec<u8>,
    pub issued_at: DateTime<Utc>,
}

/// Authenticated encryption bound to one key.
pub struct TokenCipher {
    cipher: Aes256Gcm,
}

impl TokenCipher {
    pub fn new(material: &KeyMaterial) -> Self {
        Self {
            cipher: Aes256Gcm::new(&material.bytes.into()),
        }
    }

    pub fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>, TokenError> {
        self.seal_at(plaintext, Utc::now())
    }

    fn seal_at(&self, plaintext: &[u8], issued_at: DateTime<Utc>) -> Result<Vec<u8>, TokenError> {
        let mut header = [0u8; HEADER_LEN];
        header[0] = TOKEN_VERSION;
        header[1..].copy_from_slice(&issued_at.timestamp().to_be_bytes());

        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(
                &nonce,
                Payload {
                    msg: plaintext,
                    aad: &header,
                },
            )
            .map_err(|e| TokenError::Seal(e.to_string()))?;

        let mut raw = Vec::with_capacity(HEADER_LEN + NONCE_LEN + ciphertext.len());
        raw.extend_from_slice(&header);
        raw.extend_from_slice(nonce.as_slice());
        raw.extend_from_slice(&ciphertext);
        Ok(URL_SAFE.encode(raw).into_bytes())
    }

    pub fn open(&self, token: &[u8]) -> Result<Opened, TokenError> {
        let raw = URL_SAFE
            .decode(token)
            .map_err(|e| TokenError::Encoding(e.to_string()))?;
        if raw.len() < HEADER_LEN + NONCE_LEN + TAG_LEN {
            return Err(TokenError::Truncated(raw.len()));
        }

        let (header, rest) = raw.split_at(HEADER_LEN);
        if header[0] != TOKEN_VERSION {
            return Err(TokenError::UnsupportedVersion(header[0]));
        }
        let (nonce, ciphertext) = rest.split_at(NONCE_LEN);

        let plaintext = self
            .cipher
            .decrypt(
                Nonce::from_slice(nonce),
                Payload {
                    msg: ciphertext,
                    aad: header,
                },
            )
            .map_err(|_| TokenError::Authentication)?;

        let mut secs = [0u8; 8];
        secs.copy_from_slice(&header[1..]);
        let issued_at = DateTime::from_timestamp(i64::from_be_bytes(secs), 0)
            .ok_or(TokenError::Authentication)?;

        Ok(Opened {
            plaintext,
            issued_at,
        })
    }
}
