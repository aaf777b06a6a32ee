//! Config file loading.

use crate::schema::OcrgrepConfig;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Config file picked up from the working directory when `--config` is absent.
pub const CONFIG_FILE_NAME: &str = "ocrgrep.yaml";

/// The file to load: the explicit path, else `./ocrgrep.yaml`.
pub fn config_file_path(explicit: Option<&Path>) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME))
}

/// Load and parse the config from disk.
///
/// Returns `Ok(Default::default())` if the file doesn't exist.
pub async fn load_config(path: &Path) -> Result<OcrgrepConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "Config file does not exist; using defaults");
        return Ok(OcrgrepConfig::default());
    }

    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    if raw.trim().is_empty() {
        return Ok(OcrgrepConfig::default());
    }

    let config: OcrgrepConfig = serde_yaml::from_str(&raw)
        .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?;

    info!(path = %path.display(), "Loaded config");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::RuntimeMode;

    #[tokio::test]
    async fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("absent.yaml")).await.unwrap();
        assert_eq!(config, OcrgrepConfig::default());
    }

    #[tokio::test]
    async fn empty_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ocrgrep.yaml");
        std::fs::write(&path, "\n").unwrap();
        assert_eq!(load_config(&path).await.unwrap(), OcrgrepConfig::default());
    }

    #[tokio::test]
    async fn reads_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ocrgrep.yaml");
        std::fs::write(
            &path,
            "worker:\n  runtime: local\n  timeout_secs: 5\noutput:\n  index_file: out/index.json\n",
        )
        .unwrap();

        let config = load_config(&path).await.unwrap();
        assert_eq!(config.worker.runtime, RuntimeMode::Local);
        assert_eq!(config.worker.timeout_secs, 5);
        assert_eq!(config.output.index_file, PathBuf::from("out/index.json"));
    }

    #[tokio::test]
    async fn malformed_yaml_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        std::fs::write(&path, "worker: [unclosed").unwrap();
        let err = load_config(&path).await.unwrap_err();
        assert!(format!("{err:#}").contains("bad.yaml"));
    }

    #[test]
    fn explicit_path_wins() {
        assert_eq!(config_file_path(None), PathBuf::from(CONFIG_FILE_NAME));
        assert_eq!(
            config_file_path(Some(Path::new("/etc/ocrgrep.yaml"))),
            PathBuf::from("/etc/ocrgrep.yaml")
        );
    }
}
