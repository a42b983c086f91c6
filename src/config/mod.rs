//! Configuration loading.

mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    Ok(config)
}

/// Load config from default locations or return the default config.
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    for path_str in ["./mediashelf.toml", "./config.toml"] {
        let path = Path::new(path_str);
        if path.exists() {
            return load_config(path);
        }
    }

    Ok(Config::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.database_path(), Path::new("./mediashelf.db"));
        assert!(config.spool_root().ends_with("mediashelf"));
    }

    #[test]
    fn test_load_config_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mediashelf.toml");
        std::fs::write(
            &path,
            "data_dir = \"/var/lib/mediashelf\"\n\n[scanner]\nspool_dir = \"/tmp/spool\"\n",
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(
            config.database_path(),
            Path::new("/var/lib/mediashelf/mediashelf.db")
        );
        assert_eq!(config.spool_root(), Path::new("/tmp/spool"));
    }

    #[test]
    fn test_missing_custom_config_is_an_error() {
        assert!(load_config(Path::new("/does/not/exist.toml")).is_err());
    }

    #[test]
    fn test_no_config_falls_back_to_default() {
        let config = load_config_or_default(None).unwrap();
        assert_eq!(config.data_dir, Path::new("."));
    }
}
