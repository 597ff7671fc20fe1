use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// CLI surface definition.
#[derive(Parser, Debug)]
#[command(
    name = "sealed",
    about = "Secure file storage with AES-256 encryption and integrity checks",
    version,
    propagate_version = true
)]
pub struct Cli {
    /// Path to the encryption key file (created on first use).
    #[arg(long, global = true, value_name = "PATH")]
    pub key_file: Option<PathBuf>,

    /// Path to the metadata ledger.
    #[arg(long, global = true, value_name = "PATH")]
    pub metadata_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Encrypt a file.
    Encrypt {
        /// Path to the file to encrypt.
        input_file: PathBuf,
        /// Directory to save the encrypted file.
        #[arg(long, value_name = "DIR")]
        output_dir: Option<PathBuf>,
    },
    /// Decrypt an encrypted file.
    Decrypt {
        /// Path to the encrypted file to decrypt.
        encrypted_file: PathBuf,
        /// Directory to save the decrypted file.
        #[arg(long, value_name = "DIR")]
        output_dir: Option<PathBuf>,
    },
    /// List all encrypted files and their metadata.
    List,
    /// Manage CLI configuration.
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigCommand {
    /// Create a default config file if one does not exist.
    Init,
}
