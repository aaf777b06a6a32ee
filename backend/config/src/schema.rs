//! Typed configuration for ocrgrep.
//!
//! Every field has a default, so an empty YAML document (or no file at all)
//! yields a runnable configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_PYTHON: &str = "python3";
pub const DEFAULT_WORKER_SCRIPT: &str = "easyocr_script.py";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_PYTHON_VERSION: &str = "3.9";
pub const DEFAULT_BASE_DIR: &str = "./repo-test-ocr";
pub const DEFAULT_FOLDER_NAME: &str = "_images";
pub const DEFAULT_INDEX_FILE: &str = "ocr_results.json";
pub const DEFAULT_RESULTS_FILE_NAME: &str = "query_results.json";
pub const DEFAULT_LOG_LEVEL: &str = "info";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OcrgrepConfig {
    pub worker: WorkerSettings,
    pub scan: ScanSettings,
    pub output: OutputSettings,
    pub log: LogSettings,
}

// ---------------------------------------------------------------------------
// Worker
// ---------------------------------------------------------------------------

/// How the worker's interpreter environment is shaped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeMode {
    /// `container` inside Docker, `local` otherwise.
    #[default]
    Auto,
    /// Virtualenv under the user's home (or `worker.venv`).
    Local,
    /// System-wide install under `/usr/local`.
    Container,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkerSettings {
    /// Interpreter used to run the worker script.
    pub python: String,
    pub script: PathBuf,
    pub languages: Vec<String>,
    /// Per-request deadline; 0 disables it.
    pub timeout_secs: u64,
    pub runtime: RuntimeMode,
    /// Virtualenv root for `local` runtime; `~/myenv` when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub venv: Option<PathBuf>,
    /// Selects the `lib/python<version>/site-packages` directory.
    pub python_version: String,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            python: DEFAULT_PYTHON.to_string(),
            script: PathBuf::from(DEFAULT_WORKER_SCRIPT),
            languages: vec!["en".to_string(), "fr".to_string()],
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            runtime: RuntimeMode::Auto,
            venv: None,
            python_version: DEFAULT_PYTHON_VERSION.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Scan
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScanSettings {
    pub base_dir: PathBuf,
    /// Directories under `base_dir` searched for image folders.
    pub roots: Vec<String>,
    /// Name of the folders holding images, matched at any depth.
    pub folder_name: String,
    /// File extensions treated as images, compared case-insensitively.
    pub extensions: Vec<String>,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from(DEFAULT_BASE_DIR),
            roots: vec!["docs".to_string(), "releasenotes".to_string()],
            folder_name: DEFAULT_FOLDER_NAME.to_string(),
            extensions: vec!["png".to_string(), "jpg".to_string(), "jpeg".to_string()],
        }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputSettings {
    pub index_file: PathBuf,
    pub results_file: PathBuf,
}

impl Default for OutputSettings {
    fn default() -> Self {
        let results_file = dirs::home_dir()
            .map(|home| home.join(DEFAULT_RESULTS_FILE_NAME))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_RESULTS_FILE_NAME));
        Self {
            index_file: PathBuf::from(DEFAULT_INDEX_FILE),
            results_file,
        }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogSettings {
    pub level: String,
    /// Directory for the JSON log file; console only when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_yaml_gives_defaults() {
        let config: OcrgrepConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, OcrgrepConfig::default());
        assert_eq!(config.worker.languages, vec!["en", "fr"]);
        assert_eq!(config.scan.roots, vec!["docs", "releasenotes"]);
        assert_eq!(config.worker.runtime, RuntimeMode::Auto);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config: OcrgrepConfig = serde_yaml::from_str(
            "worker:\n  runtime: container\n  languages: [de]\nscan:\n  base_dir: /srv/site\n",
        )
        .unwrap();
        assert_eq!(config.worker.runtime, RuntimeMode::Container);
        assert_eq!(config.worker.languages, vec!["de"]);
        assert_eq!(config.worker.python, DEFAULT_PYTHON);
        assert_eq!(config.scan.base_dir, PathBuf::from("/srv/site"));
        assert_eq!(config.scan.folder_name, DEFAULT_FOLDER_NAME);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(serde_yaml::from_str::<OcrgrepConfig>("wroker: {}").is_err());
        assert!(serde_yaml::from_str::<OcrgrepConfig>("worker:\n  pyhton: x\n").is_err());
    }
}
