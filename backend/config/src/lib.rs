//! `ocrgrep-config`: runtime configuration for ocrgrep.
//!
//! Provides:
//! - Typed config schema with defaults for every field
//! - YAML loading (missing file means defaults)
//! - Environment variable overrides
//! - Worker runtime resolution (virtualenv or container prefix)
//! - Validation with per-field errors and warnings

pub mod env;
pub mod io;
pub mod runtime;
pub mod schema;
pub mod validation;

pub use env::{apply_env_overrides, apply_env_overrides_with};
pub use io::{config_file_path, load_config, CONFIG_FILE_NAME};
pub use runtime::{resolve_runtime, resolve_runtime_with, RuntimeEnvironment};
pub use schema::{
    LogSettings, OcrgrepConfig, OutputSettings, RuntimeMode, ScanSettings, WorkerSettings,
};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use anyhow::{bail, Result};
use std::path::Path;

/// Load the config file (if any) and apply environment overrides.
///
/// This is the main entry point for loading a config at runtime. CLI flags
/// are applied on top by the caller, which then runs [`check`] once logging
/// is up.
pub async fn load_and_prepare(explicit: Option<&Path>) -> Result<OcrgrepConfig> {
    let path = config_file_path(explicit);
    if explicit.is_some() && !path.exists() {
        bail!("Config file not found: {}", path.display());
    }

    let config = load_config(&path).await?;
    Ok(apply_env_overrides(config))
}

/// Log the validation report and fail if it has errors.
pub fn check(config: &OcrgrepConfig) -> Result<()> {
    let report = validate(config);
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    for error in &report.errors {
        tracing::error!(path = %error.path, message = %error.message, "Config error");
    }
    if !report.is_valid() {
        let summary: Vec<String> = report.errors.iter().map(ToString::to_string).collect();
        bail!("Invalid configuration:\n  {}", summary.join("\n  "));
    }
    Ok(())
}
