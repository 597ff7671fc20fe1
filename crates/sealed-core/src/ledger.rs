use std::{
    fmt, io,
    path::PathBuf,
    sync::{Arc, Mutex},
};

use serde::{
    de::{MapAccess, Visitor},
    ser::SerializeMap,
    Deserialize, Deserializer, Serialize, Serializer,
};
use thiserror::Error;
use tracing::debug;

use crate::record::ProvenanceRecord;

/// Mapping from artifact identifier to provenance, kept in insertion order.
///
/// Re-inserting an existing identifier replaces its record in place, so listing
/// order reflects when an artifact was first sealed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    entries: Vec<(String, ProvenanceRecord)>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, artifact_id: &str) -> Option<&ProvenanceRecord> {
        self.entries
            .iter()
            .find(|(id, _)| id == artifact_id)
            .map(|(_, record)| record)
    }

    /// Insert or overwrite; returns the record that was replaced, if any.
    pub fn put(
        &mut self,
        artifact_id: impl Into<String>,
        record: ProvenanceRecord,
    ) -> Option<ProvenanceRecord> {
        let artifact_id = artifact_id.into();
        match self.entries.iter_mut().find(|(id, _)| *id == artifact_id) {
            Some((_, slot)) => {
                debug!(%artifact_id, "replacing ledger entry");
                Some(std::mem::replace(slot, record))
            }
            None => {
                debug!(%artifact_id, "adding ledger entry");
                self.entries.push((artifact_id, record));
                None
            }
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &ProvenanceRecord)> {
        self.entries.iter().map(|(id, record)| (id.as_str(), record))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for Ledger {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (id, record) in &self.entries {
            map.serialize_entry(id, record)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Ledger {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct LedgerVisitor;

        impl<'de> Visitor<'de> for LedgerVisitor {
            type Value = Ledger;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of artifact identifiers to provenance records")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Ledger, A::Error> {
                let mut ledger = Ledger::new();
                while let Some((id, record)) = access.next_entry::<String, ProvenanceRecord>()? {
                    ledger.put(id, record);
                }
                Ok(ledger)
            }
        }

        deserializer.deserialize_map(LedgerVisitor)
    }
}

/// Errors produced while loading or persisting a ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The ledger document could not be read or written.
    #[error("ledger I/O failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// A ledger document exists but does not describe valid records.
    #[error("malformed ledger at {location}: {source}")]
    Malformed {
        location: String,
        #[source]
        source: serde_json::Error,
    },
    /// Backend-specific failure (lock poisoning, serialization).
    #[error("ledger storage failure: {reason}")]
    Storage { reason: String },
}

/// Durable home for a ledger. Every `persist` replaces the whole document.
pub trait LedgerStore {
    /// Load the stored ledger; an absent document yields an empty ledger.
    fn load(&self) -> Result<Ledger, LedgerError>;

    /// Replace the stored document with `ledger`.
    fn persist(&self, ledger: &Ledger) -> Result<(), LedgerError>;
}

/// Ledger store holding the serialized document in memory. Used by tests and dry runs.
#[derive(Debug, Default, Clone)]
pub struct InMemoryLedgerStore {
    document: Arc<Mutex<Option<Vec<u8>>>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with a raw document, as if written by another tool.
    pub fn with_document(document: impl Into<Vec<u8>>) -> Self {
        Self {
            document: Arc::new(Mutex::new(Some(document.into()))),
        }
    }

    /// Snapshot of the raw stored document, if any.
    pub fn document(&self) -> Result<Option<Vec<u8>>, LedgerError> {
        let guard = self.document.lock().map_err(|err| LedgerError::Storage {
            reason: format!("lock poisoned: {err}"),
        })?;
        Ok(guard.clone())
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn load(&self) -> Result<Ledger, LedgerError> {
        match self.document()? {
            Some(bytes) => serde_json::from_slice(&bytes).map_err(|source| LedgerError::Malformed {
                location: "memory".to_string(),
                source,
            }),
            None => Ok(Ledger::new()),
        }
    }

    fn persist(&self, ledger: &Ledger) -> Result<(), LedgerError> {
        let bytes = serde_json::to_vec(ledger).map_err(|err| LedgerError::Storage {
            reason: err.to_string(),
        })?;
        let mut guard = self.document.lock().map_err(|err| LedgerError::Storage {
            reason: format!("lock poisoned: {err}"),
        })?;
        *guard = Some(bytes);
        Ok(())
    }
}
