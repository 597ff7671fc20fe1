use std::{
    fmt,
    path::{Component, Path, PathBuf},
    str::FromStr,
};

use chrono::{Local, NaiveDateTime};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// Suffix appended to an original filename to form its artifact identifier.
pub const ARTIFACT_SUFFIX: &str = ".enc";

/// Derive the ledger key (and encrypted file name) for an original filename.
pub fn artifact_id_for(original_filename: &str) -> String {
    format!("{original_filename}{ARTIFACT_SUFFIX}")
}

/// True when `name` is a single plain path component (no separators, `.`, `..` or roots).
pub fn is_plain_filename(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(first)), None) if first == name
    )
}

fn plain_filename<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let name = String::deserialize(deserializer)?;
    if !is_plain_filename(&name) {
        return Err(de::Error::custom(format!(
            "original_filename must be a bare file name, got {name:?}"
        )));
    }
    Ok(name)
}

/// SHA-256 digest of a file's plaintext, rendered as lowercase hex on the wire.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentDigest([u8; 32]);

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum DigestParseError {
    #[error("expected 64 hex characters, got {0}")]
    Length(usize),
    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),
}

impl ContentDigest {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl FromStr for ContentDigest {
    type Err = DigestParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 64 {
            return Err(DigestParseError::Length(s.len()));
        }
        let mut out = [0u8; 32];
        hex::decode_to_slice(s, &mut out)?;
        Ok(Self(out))
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentDigest({}...)", &self.to_hex()[..12])
    }
}

impl Serialize for ContentDigest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ContentDigest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

/// Provenance of one encrypted artifact. Field names are the on-disk ledger format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvenanceRecord {
    /// Basename of the file that was encrypted.
    #[serde(deserialize_with = "plain_filename")]
    pub original_filename: String,
    /// Local wall-clock time the artifact was produced.
    pub encryption_time: NaiveDateTime,
    /// Digest of the plaintext as read back from disk at encrypt time.
    pub original_file_hash_sha256: ContentDigest,
    /// Where the encrypted artifact was written.
    pub encrypted_file_path: PathBuf,
}

impl ProvenanceRecord {
    pub fn new(
        original_filename: impl Into<String>,
        digest: ContentDigest,
        encrypted_file_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            original_filename: original_filename.into(),
            encryption_time: Local::now().naive_local(),
            original_file_hash_sha256: digest,
            encrypted_file_path: encrypted_file_path.into(),
        }
    }
}
