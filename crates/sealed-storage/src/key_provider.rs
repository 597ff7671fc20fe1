use std::{
    fs::{self, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use rand::{rngs::OsRng, RngCore};
use thiserror::Error;
use tracing::{debug, info};

/// Length of the AES-256-GCM key in bytes.
pub const KEY_LEN: usize = 32;

/// Key material used for encryption at rest.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyMaterial {
    /// 256-bit symmetric key.
    pub bytes: [u8; KEY_LEN],
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("KeyMaterial(..)")
    }
}

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("key file I/O failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("key file {path} holds {len} bytes, expected {KEY_LEN}")]
    InvalidLength { path: PathBuf, len: usize },
    #[error("generation error: {0}")]
    Generation(String),
}

/// Provides the single symmetric key (a key file in production; memory in tests).
pub trait KeyProvider {
    fn get_or_create(&self) -> Result<KeyMaterial, KeyError>;
}

/// Key file holding the raw key bytes. Created on first use, never overwritten.
#[derive(Debug, Clone)]
pub struct FileKeyProvider {
    path: PathBuf,
}

impl FileKeyProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_existing(&self) -> Result<Option<KeyMaterial>, KeyError> {
        match fs::read(&self.path) {
            Ok(bytes) => decode_key(&self.path, &bytes).map(Some),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(KeyError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn write_new(&self, material: &KeyMaterial) -> Result<(), io::Error> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(&self.path)?;
        file.write_all(&material.bytes)?;
        file.sync_all()
    }
}

impl KeyProvider for FileKeyProvider {
    fn get_or_create(&self) -> Result<KeyMaterial, KeyError> {
        if let Some(existing) = self.read_existing()? {
            debug!(path = %self.path.display(), "loaded existing key");
            return Ok(existing);
        }

        let material = generate_key();
        match self.write_new(&material) {
            Ok(()) => {
                info!(path = %self.path.display(), "generated new encryption key");
                Ok(material)
            }
            // Lost a creation race; the file on disk wins.
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => self
                .read_existing()?
                .ok_or_else(|| KeyError::Generation("key file vanished after creation".into())),
            Err(source) => Err(KeyError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

/// In-memory key provider for tests and ephemeral sessions.
#[derive(Debug, Default, Clone)]
pub struct InMemoryKeyProvider {
    inner: Arc<Mutex<Option<KeyMaterial>>>,
}

impl KeyProvider for InMemoryKeyProvider {
    fn get_or_create(&self) -> Result<KeyMaterial, KeyError> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|err| KeyError::Generation(format!("lock poisoned: {err}")))?;

        if let Some(existing) = guard.clone() {
            return Ok(existing);
        }

        let material = generate_key();
        *guard = Some(material.clone());
        Ok(material)
    }
}

fn generate_key() -> KeyMaterial {
    let mut bytes = [0u8; KEY_LEN];
    OsRng.fill_bytes(&mut bytes);
    KeyMaterial { bytes }
}

fn decode_key(path: &Path, bytes: &[u8]) -> Result<KeyMaterial, KeyError> {
    let bytes: [u8; KEY_LEN] = bytes.try_into().map_err(|_| KeyError::InvalidLength {
        path: path.to_path_buf(),
        len: bytes.len(),
    })?;
    Ok(KeyMaterial { bytes })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_provider_returns_same_key() {
        let provider = InMemoryKeyProvider::default();
        let first = provider.get_or_create().unwrap();
        let second = provider.get_or_create().unwrap();

        assert_eq!(first.bytes, second.bytes);
    }

    #[test]
    fn file_provider_creates_then_reuses_key() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("storage.key");

        let first = FileKeyProvider::new(&path).get_or_create().expect("create");
        assert_eq!(fs::read(&path).expect("key file"), first.bytes.to_vec());

        let second = FileKeyProvider::new(&path).get_or_create().expect("load");
        assert_eq!(first, second);
    }

    #[test]
    fn file_provider_creates_missing_parent_dirs() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("keys/nested/storage.key");
        FileKeyProvider::new(&path).get_or_create().expect("create");
        assert!(path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn file_provider_restricts_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("storage.key");
        FileKeyProvider::new(&path).get_or_create().expect("create");

        let mode = fs::metadata(&path).expect("metadata").permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn file_provider_rejects_wrong_length() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("storage.key");
        fs::write(&path, b"abcd").expect("write short key");

        let err = FileKeyProvider::new(&path)
            .get_or_create()
            .expect_err("should reject wrong length");
        assert!(matches!(err, KeyError::InvalidLength { len: 4, .. }));
        assert_eq!(fs::read(&path).expect("untouched"), b"abcd");
    }

    #[test]
    fn debug_output_hides_key_bytes() {
        let material = KeyMaterial { bytes: [0xAB; KEY_LEN] };
        assert_eq!(format!("{material:?}"), "KeyMaterial(..)");
    }
}
