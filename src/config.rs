// Application configuration

use crate::error::Result;
use crate::wallet::KdfParams;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default data directory
pub const DEFAULT_DATA_DIR: &str = "./data";

/// Settings read from `config.json` in the data directory.
///
/// Every field is optional in the file; missing ones take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the ledger database and this file
    #[serde(skip)]
    pub data_dir: PathBuf,
    /// Upper bound on a single node exchange
    pub request_timeout_secs: u64,
    /// Argon2id parameters for newly encrypted private keys
    pub kdf: KdfParams,
    /// Label request bodies `application/x-www-form-urlencoded` for nodes
    /// that still expect the old header
    pub legacy_form_content_type: bool,
    /// Log filter used when RUST_LOG is unset
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            request_timeout_secs: 30,
            kdf: KdfParams::default(),
            legacy_form_content_type: false,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    pub const FILE_NAME: &'static str = "config.json";

    /// Load the configuration for `data_dir`, falling back to defaults
    pub fn load<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        let path = data_dir.join(Self::FILE_NAME);

        let mut config = if path.exists() {
            let json = fs::read_to_string(&path)?;
            serde_json::from_str(&json)?
        } else {
            Config::default()
        };

        config.data_dir = data_dir.to_path_buf();
        Ok(config)
    }

    /// Write the configuration to `config.json` in the data directory
    pub fn save(&self) -> Result<()> {
        fs::create_dir_all(&self.data_dir)?;
        let json = crate::core::to_json(self, true)?;
        fs::write(self.data_dir.join(Self::FILE_NAME), json)?;
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Location of the ledger database
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("ledger")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();

        assert_eq!(config.data_dir, dir.path());
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.kdf, KdfParams::default());
        assert!(!config.legacy_form_content_type);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.db_path(), dir.path().join("ledger"));
    }

    #[test]
    fn test_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(Config::FILE_NAME),
            r#"{"request_timeout_secs": 5, "legacy_form_content_type": true}"#,
        )
        .unwrap();

        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.request_timeout_secs, 5);
        assert!(config.legacy_form_content_type);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::load(dir.path()).unwrap();
        config.log_level = "debug".to_string();
        config.kdf.t_cost = 4;
        config.save().unwrap();

        assert_eq!(Config::load(dir.path()).unwrap(), config);
    }

    #[test]
    fn test_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(Config::FILE_NAME), "{not json").unwrap();
        assert!(Config::load(dir.path()).is_err());
    }
}
