//! Core abstractions for Sealed: provenance records, the metadata ledger contract,
//! and decrypt outcomes. Kept free of crypto so the CLI and tests can share it.

pub mod ledger;
pub mod outcome;
pub mod record;

pub use ledger::{InMemoryLedgerStore, Ledger, LedgerError, LedgerStore};
pub use outcome::{DecryptOutcome, IntegrityVerdict};
pub use record::{
    artifact_id_for, is_plain_filename, ContentDigest, ProvenanceRecord, ARTIFACT_SUFFIX,
};
