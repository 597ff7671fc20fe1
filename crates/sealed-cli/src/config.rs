use std::{
    env, fs,
    path::{Path, PathBuf},
};

use color_eyre::Result;
use dirs::config_dir;
use serde::{Deserialize, Serialize};

use crate::cli::Cli;

/// Environment variable pointing at an alternate config file.
pub const CONFIG_ENV: &str = "SEALED_CONFIG";

pub const DEFAULT_KEY_FILE: &str = "storage.key";
pub const DEFAULT_METADATA_FILE: &str = "metadata.json";
pub const DEFAULT_ENCRYPTED_DIR: &str = "encrypted_files";
pub const DEFAULT_DECRYPTED_DIR: &str = "decrypted_files";

/// User-level configuration loaded from `~/.config/sealed/config.toml` (platform-specific).
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct Config {
    /// Key file location.
    pub key_file: Option<PathBuf>,
    /// Metadata ledger location.
    pub metadata_file: Option<PathBuf>,
    /// Default output directory for `encrypt`.
    pub encrypted_dir: Option<PathBuf>,
    /// Default output directory for `decrypt`.
    pub decrypted_dir: Option<PathBuf>,
}

/// Paths after applying CLI flags over config over built-in defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub key_file: PathBuf,
    pub metadata_file: PathBuf,
    pub encrypted_dir: PathBuf,
    pub decrypted_dir: PathBuf,
}

impl Settings {
    pub fn resolve(cli: &Cli, config: &Config) -> Self {
        fn pick(flag: &Option<PathBuf>, file: &Option<PathBuf>, default: &str) -> PathBuf {
            flag.clone()
                .or_else(|| file.clone())
                .unwrap_or_else(|| PathBuf::from(default))
        }

        Self {
            key_file: pick(&cli.key_file, &config.key_file, DEFAULT_KEY_FILE),
            metadata_file: pick(&cli.metadata_file, &config.metadata_file, DEFAULT_METADATA_FILE),
            encrypted_dir: pick(&None, &config.encrypted_dir, DEFAULT_ENCRYPTED_DIR),
            decrypted_dir: pick(&None, &config.decrypted_dir, DEFAULT_DECRYPTED_DIR),
        }
    }
}

/// Load config from the default path; if missing, return defaults.
pub fn load() -> Result<Config> {
    let path = default_path()?;
    load_from_path(path)
}

/// Load config from a given path; if missing or empty, return defaults.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(Config::default());
    }
    let contents = fs::read_to_string(path)?;
    if contents.trim().is_empty() {
        return Ok(Config::default());
    }
    let cfg: Config = toml::from_str(&contents)?;
    Ok(cfg)
}

/// Resolve the config path: `SEALED_CONFIG` if set, else the platform config dir.
pub fn default_path() -> Result<PathBuf> {
    if let Some(path) = env::var_os(CONFIG_ENV) {
        return Ok(PathBuf::from(path));
    }
    let base = config_dir().ok_or_else(|| color_eyre::eyre::eyre!("no config dir available"))?;
    Ok(base.join("sealed").join("config.toml"))
}

/// Write the given config to disk, creating parent directories as needed.
/// Leaves an existing file alone to avoid clobbering user edits.
pub fn write_default_if_missing(config: &Config) -> Result<PathBuf> {
    let path = default_path()?;
    write_if_missing(config, &path)?;
    Ok(path)
}

fn write_if_missing(config: &Config, path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let body = toml::to_string_pretty(config)?;
    fs::write(path, body)?;
    Ok(())
}

/// Config populated with the built-in defaults, used by `config init`.
pub fn starter() -> Config {
    Config {
        key_file: Some(PathBuf::from(DEFAULT_KEY_FILE)),
        metadata_file: Some(PathBuf::from(DEFAULT_METADATA_FILE)),
        encrypted_dir: Some(PathBuf::from(DEFAULT_ENCRYPTED_DIR)),
        decrypted_dir: Some(PathBuf::from(DEFAULT_DECRYPTED_DIR)),
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn returns_default_when_missing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = load_from_path(dir.path().join("config.toml")).expect("load");
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn parses_custom_config() {
        let contents = r#"
            key_file = "/var/lib/sealed/storage.key"
            metadata_file = "/var/lib/sealed/metadata.json"
            encrypted_dir = "vault"
        "#;
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(&path, contents).expect("write temp config");

        let cfg = load_from_path(&path).expect("load");
        assert_eq!(
            cfg,
            Config {
                key_file: Some(PathBuf::from("/var/lib/sealed/storage.key")),
                metadata_file: Some(PathBuf::from("/var/lib/sealed/metadata.json")),
                encrypted_dir: Some(PathBuf::from("vault")),
                decrypted_dir: None,
            }
        );
    }

    #[test]
    fn malformed_config_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "key_file = [").expect("write");
        assert!(load_from_path(&path).is_err());
    }

    #[test]
    fn write_creates_file_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested/config.toml");
        let cfg = starter();

        write_if_missing(&cfg, &path).expect("write should succeed");
        fs::write(&path, "key_file = \"edited.key\"\n").expect("user edit");
        write_if_missing(&cfg, &path).expect("second write ok");

        let loaded = load_from_path(&path).expect("load");
        assert_eq!(loaded.key_file, Some(PathBuf::from("edited.key")));
    }

    #[test]
    fn flags_override_config_which_overrides_defaults() {
        let cli = Cli::try_parse_from(["sealed", "--key-file", "flag.key", "list"]).expect("parse");
        let cfg = Config {
            key_file: Some(PathBuf::from("config.key")),
            metadata_file: Some(PathBuf::from("config.json")),
            encrypted_dir: None,
            decrypted_dir: Some(PathBuf::from("plain")),
        };

        let settings = Settings::resolve(&cli, &cfg);
        assert_eq!(
            settings,
            Settings {
                key_file: PathBuf::from("flag.key"),
                metadata_file: PathBuf::from("config.json"),
                encrypted_dir: PathBuf::from(DEFAULT_ENCRYPTED_DIR),
                decrypted_dir: PathBuf::from("plain"),
            }
        );
    }
}
