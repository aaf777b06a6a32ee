//! Config validation with user-friendly error messages.

use crate::schema::OcrgrepConfig;
use thiserror::Error;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// A collection of validation errors found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate the config and return a report of all errors and warnings.
pub fn validate(config: &OcrgrepConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_worker(config, &mut report);
    validate_scan(config, &mut report);
    validate_output(config, &mut report);
    validate_log(config, &mut report);
    report
}

fn validate_worker(config: &OcrgrepConfig, report: &mut ValidationReport) {
    let worker = &config.worker;
    if worker.python.trim().is_empty() {
        report.error("worker.python", "Interpreter cannot be empty");
    }
    if worker.script.as_os_str().is_empty() {
        report.error("worker.script", "Worker script path cannot be empty");
    }
    if worker.languages.is_empty() {
        report.error("worker.languages", "At least one language is required");
    }
    for (i, lang) in worker.languages.iter().enumerate() {
        if lang.trim().is_empty() || lang.contains(char::is_whitespace) {
            report.error(
                format!("worker.languages[{i}]"),
                format!("Invalid language code {lang:?}"),
            );
        }
    }
    if worker.timeout_secs == 0 {
        report.warn(
            "worker.timeout_secs",
            "Timeout disabled; a stuck worker will block the scan",
        );
    }
}

fn validate_scan(config: &OcrgrepConfig, report: &mut ValidationReport) {
    let scan = &config.scan;
    if scan.roots.is_empty() {
        report.error("scan.roots", "At least one root directory is required");
    }
    if scan.folder_name.trim().is_empty() {
        report.error("scan.folder_name", "Image folder name cannot be empty");
    } else if scan.folder_name.contains(['/', '\\', '*', '?', '[']) {
        report.error(
            "scan.folder_name",
            "Image folder name must be a plain directory name",
        );
    }
    if scan.extensions.is_empty() {
        report.error("scan.extensions", "At least one image extension is required");
    }
    for (i, ext) in scan.extensions.iter().enumerate() {
        if ext.starts_with('.') {
            report.warn(
                format!("scan.extensions[{i}]"),
                "Leading dot is ignored",
            );
        }
    }
}

fn validate_output(config: &OcrgrepConfig, report: &mut ValidationReport) {
    if config.output.index_file.as_os_str().is_empty() {
        report.error("output.index_file", "Index file path cannot be empty");
    }
    if config.output.results_file.as_os_str().is_empty() {
        report.error("output.results_file", "Results file path cannot be empty");
    }
}

fn validate_log(config: &OcrgrepConfig, report: &mut ValidationReport) {
    let level = config.log.level.to_ascii_lowercase();
    // Full filter directives like "ocrgrep=debug" are accepted as-is.
    if !level.contains('=') && !LOG_LEVELS.contains(&level.as_str()) {
        report.warn(
            "log.level",
            format!("Unknown log level {:?}; falling back to info", config.log.level),
        );
    }
}
