mod cli;
mod config;
mod report;
mod storage;

use std::{path::Path, process::ExitCode};

use clap::Parser;
use color_eyre::Result;
use sealed_core::{DecryptOutcome, IntegrityVerdict, LedgerStore};
use sealed_storage::engine::EncryptionEngine;
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{
    cli::{Command, ConfigCommand},
    config::Settings,
};

/// Input file given on the command line does not exist.
const EXIT_MISSING_INPUT: u8 = 2;
/// Decryption refused: no provenance record, or the artifact failed to authenticate.
const EXIT_REFUSED: u8 = 3;

fn main() -> Result<ExitCode> {
    color_eyre::install()?;
    init_tracing();

    let cli = cli::Cli::parse();
    let config = config::load()?;
    let settings = Settings::resolve(&cli, &config);

    match cli.command {
        Command::Encrypt {
            input_file,
            output_dir,
        } => {
            let output_dir = output_dir.unwrap_or_else(|| settings.encrypted_dir.clone());
            run_encrypt(&settings, &input_file, &output_dir)
        }
        Command::Decrypt {
            encrypted_file,
            output_dir,
        } => {
            let output_dir = output_dir.unwrap_or_else(|| settings.decrypted_dir.clone());
            run_decrypt(&settings, &encrypted_file, &output_dir)
        }
        Command::List => {
            let engine = storage::engine_from_settings(&settings)?;
            println!("{}", report::listing(engine.entries()));
            Ok(ExitCode::SUCCESS)
        }
        Command::Config(ConfigCommand::Init) => {
            let path = config::write_default_if_missing(&config::starter())?;
            println!("Config initialized at {}", path.display());
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn init_tracing() {
    // Respect user-provided filters, default to info. Logs go to stderr.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

fn run_encrypt(settings: &Settings, input: &Path, output_dir: &Path) -> Result<ExitCode> {
    if !input.exists() {
        eprintln!("Error: Input file '{}' not found.", input.display());
        return Ok(ExitCode::from(EXIT_MISSING_INPUT));
    }
    let mut engine = storage::engine_from_settings(settings)?;
    println!("{}", encrypt_with(&mut engine, input, output_dir)?);
    Ok(ExitCode::SUCCESS)
}

fn run_decrypt(settings: &Settings, encrypted: &Path, output_dir: &Path) -> Result<ExitCode> {
    if !encrypted.exists() {
        eprintln!("Error: Encrypted file '{}' not found.", encrypted.display());
        return Ok(ExitCode::from(EXIT_MISSING_INPUT));
    }
    let engine = storage::engine_from_settings(settings)?;
    let (message, code) = decrypt_with(&engine, encrypted, output_dir)?;
    println!("{message}");
    Ok(code)
}

fn encrypt_with<S: LedgerStore>(
    engine: &mut EncryptionEngine<S>,
    input: &Path,
    output_dir: &Path,
) -> Result<String> {
    let path = engine.encrypt(input, output_dir)?;
    Ok(report::encrypted(&path))
}

fn decrypt_with<S: LedgerStore>(
    engine: &EncryptionEngine<S>,
    encrypted: &Path,
    output_dir: &Path,
) -> Result<(String, ExitCode)> {
    let outcome = engine.decrypt(encrypted, output_dir)?;
    let code = match &outcome {
        DecryptOutcome::Recovered {
            integrity: IntegrityVerdict::Mismatch { .. },
            ..
        } => {
            warn!("integrity check failed; plaintext written anyway");
            ExitCode::SUCCESS
        }
        DecryptOutcome::Recovered { .. } => ExitCode::SUCCESS,
        DecryptOutcome::MissingProvenance { .. } | DecryptOutcome::DecryptionFailed { .. } => {
            ExitCode::from(EXIT_REFUSED)
        }
    };
    Ok((report::decrypted(&outcome), code))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::storage;

    #[test]
    fn encrypt_then_decrypt_through_settings() {
        let dir = tempfile::tempdir().expect("tempdir");
        let settings = storage::test_settings(dir.path());
        let input = dir.path().join("note.txt");
        fs::write(&input, "hello-test").expect("write input");

        let mut engine = storage::engine_from_settings(&settings).expect("engine");
        let message =
            encrypt_with(&mut engine, &input, &settings.encrypted_dir).expect("encrypt");
        assert!(message.contains("note.txt.enc"));

        let engine = storage::engine_from_settings(&settings).expect("engine reopened");
        let (message, code) = decrypt_with(
            &engine,
            &settings.encrypted_dir.join("note.txt.enc"),
            &settings.decrypted_dir,
        )
        .expect("decrypt");
        assert_eq!(code, ExitCode::SUCCESS);
        assert!(message.contains("Integrity check passed"));
        assert_eq!(
            fs::read_to_string(settings.decrypted_dir.join("note.txt")).expect("plaintext"),
            "hello-test"
        );
    }

    #[test]
    fn unknown_artifact_maps_to_refused_exit_code() {
        let dir = tempfile::tempdir().expect("tempdir");
        let settings = storage::test_settings(dir.path());
        let stray = dir.path().join("stray.enc");
        fs::write(&stray, "garbage").expect("write");

        let engine = storage::engine_from_settings(&settings).expect("engine");
        let (message, code) =
            decrypt_with(&engine, &stray, &settings.decrypted_dir).expect("decrypt");
        assert_eq!(code, ExitCode::from(EXIT_REFUSED));
        assert!(message.contains("No metadata found for stray.enc"));
    }
}
