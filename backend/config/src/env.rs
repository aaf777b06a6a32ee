//! Environment variable overrides, applied after the YAML file.

use crate::schema::OcrgrepConfig;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, warn};

pub const ENV_PYTHON: &str = "OCRGREP_PYTHON";
/// Older name for the interpreter path, still honoured.
pub const ENV_PYTHON_LEGACY: &str = "PYTHON_PATH";
pub const ENV_WORKER_SCRIPT: &str = "OCRGREP_WORKER_SCRIPT";
pub const ENV_LANGUAGES: &str = "OCRGREP_LANGUAGES";
pub const ENV_TIMEOUT_SECS: &str = "OCRGREP_TIMEOUT_SECS";
pub const ENV_BASE_DIR: &str = "BASE_DIR";
pub const ENV_LOG_LEVEL: &str = "OCRGREP_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "OCRGREP_LOG_DIR";

/// Apply overrides from the process environment.
pub fn apply_env_overrides(config: OcrgrepConfig) -> OcrgrepConfig {
    apply_env_overrides_with(config, &std::env::vars().collect())
}

/// Apply overrides from a provided map (useful for testing).
pub fn apply_env_overrides_with(
    mut config: OcrgrepConfig,
    env: &HashMap<String, String>,
) -> OcrgrepConfig {
    let get = |key: &str| {
        env.get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    if let Some(python) = get(ENV_PYTHON).or_else(|| get(ENV_PYTHON_LEGACY)) {
        debug!(python = %python, "Worker interpreter overridden from environment");
        config.worker.python = python;
    }
    if let Some(script) = get(ENV_WORKER_SCRIPT) {
        config.worker.script = PathBuf::from(script);
    }
    if let Some(raw) = get(ENV_LANGUAGES) {
        let languages = parse_list(&raw);
        if languages.is_empty() {
            warn!(var = ENV_LANGUAGES, value = %raw, "Ignoring empty language list");
        } else {
            config.worker.languages = languages;
        }
    }
    if let Some(raw) = get(ENV_TIMEOUT_SECS) {
        match raw.parse::<u64>() {
            Ok(secs) => config.worker.timeout_secs = secs,
            Err(e) => warn!(var = ENV_TIMEOUT_SECS, value = %raw, error = %e, "Ignoring invalid timeout"),
        }
    }
    if let Some(base_dir) = get(ENV_BASE_DIR) {
        config.scan.base_dir = PathBuf::from(base_dir);
    }
    if let Some(level) = get(ENV_LOG_LEVEL) {
        config.log.level = level;
    }
    if let Some(dir) = get(ENV_LOG_DIR) {
        config.log.dir = Some(PathBuf::from(dir));
    }

    config
}

/// Split a comma separated list, dropping blanks.
pub fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn no_variables_changes_nothing() {
        let config = apply_env_overrides_with(OcrgrepConfig::default(), &HashMap::new());
        assert_eq!(config, OcrgrepConfig::default());
    }

    #[test]
    fn overrides_each_field() {
        let config = apply_env_overrides_with(
            OcrgrepConfig::default(),
            &env(&[
                (ENV_PYTHON, "/opt/py/bin/python"),
                (ENV_WORKER_SCRIPT, "/opt/ocr/worker.py"),
                (ENV_LANGUAGES, "en, de ,"),
                (ENV_TIMEOUT_SECS, "30"),
                (ENV_BASE_DIR, "/srv/site"),
                (ENV_LOG_LEVEL, "debug"),
                (ENV_LOG_DIR, "/var/log/ocrgrep"),
            ]),
        );
        assert_eq!(config.worker.python, "/opt/py/bin/python");
        assert_eq!(config.worker.script, PathBuf::from("/opt/ocr/worker.py"));
        assert_eq!(config.worker.languages, vec!["en", "de"]);
        assert_eq!(config.worker.timeout_secs, 30);
        assert_eq!(config.scan.base_dir, PathBuf::from("/srv/site"));
        assert_eq!(config.log.level, "debug");
        assert_eq!(config.log.dir, Some(PathBuf::from("/var/log/ocrgrep")));
    }

    #[test]
    fn legacy_python_variable_is_fallback_only() {
        let legacy = apply_env_overrides_with(
            OcrgrepConfig::default(),
            &env(&[(ENV_PYTHON_LEGACY, "/usr/bin/python3.9")]),
        );
        assert_eq!(legacy.worker.python, "/usr/bin/python3.9");

        let both = apply_env_overrides_with(
            OcrgrepConfig::default(),
            &env(&[(ENV_PYTHON_LEGACY, "/usr/bin/python3.9"), (ENV_PYTHON, "py")]),
        );
        assert_eq!(both.worker.python, "py");
    }

    #[test]
    fn invalid_values_are_ignored() {
        let config = apply_env_overrides_with(
            OcrgrepConfig::default(),
            &env(&[(ENV_TIMEOUT_SECS, "soon"), (ENV_LANGUAGES, " , "), (ENV_BASE_DIR, "  ")]),
        );
        assert_eq!(config, OcrgrepConfig::default());
    }
}
