use std::{fs, io, path::PathBuf};

use sealed_core::{Ledger, LedgerError, LedgerStore};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use tracing::{debug, instrument};

use crate::atomic::write_atomic;

/// Ledger persisted as a single pretty-printed JSON document.
#[derive(Debug, Clone)]
pub struct JsonLedgerStore {
    path: PathBuf,
}

impl JsonLedgerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn io_err(&self, source: io::Error) -> LedgerError {
        LedgerError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl LedgerStore for JsonLedgerStore {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    fn load(&self) -> Result<Ledger, LedgerError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!("no ledger on disk, starting empty");
                return Ok(Ledger::new());
            }
            Err(err) => return Err(self.io_err(err)),
        };

        let ledger: Ledger =
            serde_json::from_slice(&bytes).map_err(|source| LedgerError::Malformed {
                location: self.path.display().to_string(),
                source,
            })?;
        debug!(entries = ledger.len(), "ledger loaded");
        Ok(ledger)
    }

    #[instrument(skip(self, ledger), fields(path = %self.path.display(), entries = ledger.len()))]
    fn persist(&self, ledger: &Ledger) -> Result<(), LedgerError> {
        let body = to_pretty_json(ledger).map_err(|err| LedgerError::Storage {
            reason: err.to_string(),
        })?;
        write_atomic(&self.path, &body).map_err(|err| self.io_err(err))?;
        debug!("ledger persisted");
        Ok(())
    }
}

/// Four-space indentation, matching ledgers written by earlier tooling.
fn to_pretty_json(ledger: &Ledger) -> serde_json::Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut ser =
        serde_json::Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(b"    "));
    ledger.serialize(&mut ser)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use sealed_core::{ContentDigest, ProvenanceRecord};

    use super::*;

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JsonLedgerStore::new(dir.path().join("metadata.json"));
        assert!(store.load().expect("load").is_empty());
    }

    #[test]
    fn malformed_file_is_fatal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("metadata.json");
        fs::write(&path, "{\"a.enc\": {\"original_filename\": 3}}").expect("write");

        let err = JsonLedgerStore::new(&path).load().expect_err("malformed");
        assert!(matches!(err, LedgerError::Malformed { .. }));
    }

    #[test]
    fn empty_file_is_malformed_not_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("metadata.json");
        fs::write(&path, "").expect("write");

        let err = JsonLedgerStore::new(&path).load().expect_err("empty document");
        assert!(matches!(err, LedgerError::Malformed { .. }));
    }

    #[test]
    fn persist_writes_indented_document_and_reloads() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("metadata.json");
        let store = JsonLedgerStore::new(&path);

        let mut ledger = Ledger::new();
        ledger.put(
            "note.txt.enc",
            ProvenanceRecord::new(
                "note.txt",
                ContentDigest::from_bytes([9; 32]),
                "encrypted_files/note.txt.enc",
            ),
        );
        store.persist(&ledger).expect("persist");

        let text = fs::read_to_string(&path).expect("read");
        assert!(text.starts_with("{\n    \"note.txt.enc\": {\n        \"original_filename\""));
        assert_eq!(store.load().expect("reload"), ledger);
    }

    #[test]
    fn reads_ledger_written_by_earlier_tooling() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("metadata.json");
        let legacy = r#"{
    "report.pdf.enc": {
        "original_filename": "report.pdf",
        "encryption_time": "2024-03-09T14:02:11.845120",
        "original_file_hash_sha256": "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad",
        "encrypted_file_path": "encrypted_files/report.pdf.enc"
    }
}"#;
        fs::write(&path, legacy).expect("write");

        let ledger = JsonLedgerStore::new(&path).load().expect("load");
        let record = ledger.get("report.pdf.enc").expect("record");
        assert_eq!(record.original_filename, "report.pdf");
        assert_eq!(
            record.encryption_time.format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
            "2024-03-09T14:02:11.845120"
        );
    }
}
