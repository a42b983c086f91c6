use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Directory holding the database and other app data.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default)]
    pub scanner: ScannerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            scanner: ScannerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ScannerConfig {
    /// Spool directory for scan staging. Defaults to a mediashelf folder
    /// under the system temp directory.
    #[serde(default)]
    pub spool_dir: Option<PathBuf>,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Config {
    /// Path of the SQLite database file.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("mediashelf.db")
    }

    /// Root directory for per-index scan spool directories.
    pub fn spool_root(&self) -> PathBuf {
        self.scanner
            .spool_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("mediashelf"))
    }
}
