use color_eyre::Result;
use sealed_storage::{
    engine::EncryptionEngine, key_provider::FileKeyProvider, ledger_file::JsonLedgerStore,
};
use tracing::debug;

use crate::config::Settings;

/// Build the engine backed by the configured key file and metadata ledger.
pub fn engine_from_settings(settings: &Settings) -> Result<EncryptionEngine<JsonLedgerStore>> {
    debug!(
        key_file = %settings.key_file.display(),
        metadata_file = %settings.metadata_file.display(),
        "initializing encryption engine"
    );
    let engine = EncryptionEngine::open(
        &FileKeyProvider::new(&settings.key_file),
        JsonLedgerStore::new(&settings.metadata_file),
    )?;
    Ok(engine)
}

/// Helper for tests to construct an engine rooted at a temp dir.
#[cfg(test)]
pub fn test_settings(root: &std::path::Path) -> Settings {
    Settings {
        key_file: root.join("storage.key"),
        metadata_file: root.join("metadata.json"),
        encrypted_dir: root.join("encrypted_files"),
        decrypted_dir: root.join("decrypted_files"),
    }
}
