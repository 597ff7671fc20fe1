use std::path::Path;

use sealed_core::{DecryptOutcome, IntegrityVerdict, ProvenanceRecord};

pub fn encrypted(path: &Path) -> String {
    format!(
        "File encrypted and saved to {}\nMetadata updated.",
        path.display()
    )
}

pub fn decrypted(outcome: &DecryptOutcome) -> String {
    match outcome {
        DecryptOutcome::Recovered {
            path,
            integrity: IntegrityVerdict::Verified,
        } => format!(
            "File decrypted successfully to {}\nIntegrity check passed: Decrypted file hash matches original.",
            path.display()
        ),
        DecryptOutcome::Recovered {
            path,
            integrity: IntegrityVerdict::Mismatch { expected, actual },
        } => format!(
            "WARNING: Integrity check failed for {}!\n\
             Stored original hash: {expected}\n\
             Decrypted file hash:  {actual}\n\
             The decrypted file may have been tampered with or corrupted.",
            path.display()
        ),
        DecryptOutcome::MissingProvenance { artifact_id } => {
            format!("Error: No metadata found for {artifact_id}. Cannot decrypt securely.")
        }
        DecryptOutcome::DecryptionFailed { reason, .. } => format!("Decryption failed: {reason}"),
    }
}

pub fn listing<'a>(entries: impl IntoIterator<Item = (&'a str, &'a ProvenanceRecord)>) -> String {
    let mut entries = entries.into_iter().peekable();
    if entries.peek().is_none() {
        return "No files have been encrypted yet.".to_string();
    }

    let mut out = String::from("--- Encrypted Files ---\n");
    for (artifact_id, record) in entries {
        out.push_str(&format!(
            "  Encrypted: {artifact_id}\n    Original: {}\n    Time: {}\n    Hash (SHA256): {}\n    Path: {}\n{}\n",
            record.original_filename,
            record.encryption_time.format("%Y-%m-%dT%H:%M:%S%.6f"),
            record.original_file_hash_sha256,
            record.encrypted_file_path.display(),
            "-".repeat(25),
        ));
    }
    out.push_str("-----------------------");
    out
}
