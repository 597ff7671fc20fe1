use std::{
    fs, io,
    path::{Path, PathBuf},
};

use sealed_core::{
    artifact_id_for, is_plain_filename, DecryptOutcome, IntegrityVerdict, Ledger, LedgerError,
    LedgerStore, ProvenanceRecord,
};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::{
    atomic::write_atomic,
    hasher::digest_file,
    key_provider::{KeyError, KeyProvider},
    token::{TokenCipher, TokenError},
};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("key store: {0}")]
    Key(#[from] KeyError),
    #[error("metadata ledger: {0}")]
    Ledger(#[from] LedgerError),
    #[error("I/O failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("input path has no file name: {0}")]
    InvalidInput(PathBuf),
    #[error("file name is not valid UTF-8: {0}")]
    NonUtf8Name(PathBuf),
    #[error("recorded file name {0:?} is not a bare file name")]
    UnsafeFilename(String),
    #[error("{0}")]
    Seal(TokenError),
}

/// Basename of `path` as UTF-8; ledger keys and recorded names are strings.
fn file_name_of(path: &Path) -> Result<String, EngineError> {
    let name = path
        .file_name()
        .ok_or_else(|| EngineError::InvalidInput(path.to_path_buf()))?;
    name.to_str()
        .map(str::to_owned)
        .ok_or_else(|| EngineError::NonUtf8Name(path.to_path_buf()))
}

fn io_at(path: &Path) -> impl FnOnce(io::Error) -> EngineError + '_ {
    move |source| EngineError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Encrypts files into self-describing artifacts and recovers them, recording
/// provenance for every artifact in a ledger that is persisted after each change.
pub struct EncryptionEngine<S: LedgerStore> {
    cipher: TokenCipher,
    ledger: Ledger,
    store: S,
}

impl<S: LedgerStore> EncryptionEngine<S> {
    /// Load (or create) the key and load the existing ledger.
    pub fn open<P: KeyProvider>(keys: &P, store: S) -> Result<Self, EngineError> {
        let key = keys.get_or_create()?;
        let ledger = store.load()?;
        Ok(Self {
            cipher: TokenCipher::new(&key),
            ledger,
            store,
        })
    }

    /// Encrypt `input` into `<output_dir>/<filename>.enc` and record its provenance.
    ///
    /// Re-encrypting a file with the same name replaces both the artifact and its record.
    #[instrument(skip_all, fields(input = %input.display(), output_dir = %output_dir.display()))]
    pub fn encrypt(&mut self, input: &Path, output_dir: &Path) -> Result<PathBuf, EngineError> {
        let original_filename = file_name_of(input)?;

        fs::create_dir_all(output_dir).map_err(io_at(output_dir))?;
        let plaintext = fs::read(input).map_err(io_at(input))?;
        let sealed = self.cipher.seal(&plaintext).map_err(EngineError::Seal)?;

        let artifact_id = artifact_id_for(&original_filename);
        let output_path = output_dir.join(&artifact_id);
        write_atomic(&output_path, &sealed).map_err(io_at(&output_path))?;

        // Hash what is on disk now, not the buffer we encrypted.
        let digest = digest_file(input).map_err(io_at(input))?;

        // Only adopt the new ledger once it is durable.
        let record = ProvenanceRecord::new(original_filename, digest, output_path.clone());
        let mut next = self.ledger.clone();
        next.put(artifact_id.clone(), record);
        self.store.persist(&next)?;
        self.ledger = next;

        info!(%artifact_id, output = %output_path.display(), "file encrypted");
        Ok(output_path)
    }

    /// Decrypt `encrypted` into `output_dir`, restoring the original filename.
    ///
    /// Nothing is written when the artifact has no ledger record or fails to
    /// authenticate. A digest mismatch after decryption is reported in the
    /// outcome, but the plaintext is still written.
    #[instrument(skip_all, fields(encrypted = %encrypted.display(), output_dir = %output_dir.display()))]
    pub fn decrypt(
        &self,
        encrypted: &Path,
        output_dir: &Path,
    ) -> Result<DecryptOutcome, EngineError> {
        let artifact_id = file_name_of(encrypted)?;

        let Some(record) = self.ledger.get(&artifact_id) else {
            warn!(%artifact_id, "no provenance record; refusing to decrypt");
            return Ok(DecryptOutcome::MissingProvenance { artifact_id });
        };

        // Records loaded from disk are already checked; this covers records put by callers.
        if !is_plain_filename(&record.original_filename) {
            return Err(EngineError::UnsafeFilename(record.original_filename.clone()));
        }

        let token = fs::read(encrypted).map_err(io_at(encrypted))?;
        let opened = match self.cipher.open(&token) {
            Ok(opened) => {
                debug!(%artifact_id, sealed_at = %opened.issued_at, "artifact authenticated");
                opened
            }
            Err(err) => {
                warn!(%artifact_id, error = %err, "decryption failed");
                return Ok(DecryptOutcome::DecryptionFailed {
                    artifact_id,
                    reason: err.to_string(),
                });
            }
        };

        fs::create_dir_all(output_dir).map_err(io_at(output_dir))?;
        let output_path = output_dir.join(&record.original_filename);
        write_atomic(&output_path, &opened.plaintext).map_err(io_at(&output_path))?;

        let actual = digest_file(&output_path).map_err(io_at(&output_path))?;
        let expected = record.original_file_hash_sha256;
        let integrity = if actual == expected {
            info!(%artifact_id, output = %output_path.display(), "file decrypted, integrity verified");
            IntegrityVerdict::Verified
        } else {
            warn!(
                %artifact_id,
                %expected,
                %actual,
                "decrypted file does not match recorded digest"
            );
            IntegrityVerdict::Mismatch { expected, actual }
        };

        Ok(DecryptOutcome::Recovered {
            path: output_path,
            integrity,
        })
    }

    pub fn record(&self, artifact_id: &str) -> Option<&ProvenanceRecord> {
        self.ledger.get(artifact_id)
    }

    /// Ledger entries in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &ProvenanceRecord)> {
        self.ledger.entries()
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }
}
