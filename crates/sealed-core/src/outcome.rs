use std::path::{Path, PathBuf};

use crate::record::ContentDigest;

/// Result of comparing a recovered file's digest with the one recorded at encrypt time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityVerdict {
    Verified,
    /// Bytes were recovered but do not hash to the recorded digest.
    Mismatch {
        expected: ContentDigest,
        actual: ContentDigest,
    },
}

impl IntegrityVerdict {
    pub fn is_verified(&self) -> bool {
        matches!(self, IntegrityVerdict::Verified)
    }
}

/// Outcome of a decrypt request.
///
/// Refusals are ordinary values: nothing is written when decryption is refused.
/// A digest mismatch is not a refusal; the plaintext is still written and the
/// verdict travels alongside the path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecryptOutcome {
    Recovered {
        path: PathBuf,
        integrity: IntegrityVerdict,
    },
    /// The ledger has no record for this artifact.
    MissingProvenance { artifact_id: String },
    /// The artifact failed to decode or authenticate under the current key.
    DecryptionFailed { artifact_id: String, reason: String },
}

impl DecryptOutcome {
    /// Path of the recovered plaintext, if decryption went ahead.
    pub fn path(&self) -> Option<&Path> {
        match self {
            DecryptOutcome::Recovered { path, .. } => Some(path),
            _ => None,
        }
    }

    pub fn is_refused(&self) -> bool {
        !matches!(self, DecryptOutcome::Recovered { .. })
    }
}
