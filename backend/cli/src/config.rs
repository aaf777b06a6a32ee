//! CLI flag overrides and the mapping from config to worker settings.

use std::path::PathBuf;
use std::time::Duration;

use ocrgrep_config::{resolve_runtime, OcrgrepConfig, RuntimeEnvironment};
use ocrgrep_worker::WorkerConfig;

/// Values given on the command line; each one beats the file and environment.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub log_level: Option<String>,
    pub base_dir: Option<PathBuf>,
    pub index_file: Option<PathBuf>,
    pub results_file: Option<PathBuf>,
}

impl Overrides {
    pub fn apply(self, mut config: OcrgrepConfig) -> OcrgrepConfig {
        if let Some(level) = self.log_level {
            config.log.level = level;
        }
        if let Some(base_dir) = self.base_dir {
            config.scan.base_dir = base_dir;
        }
        if let Some(index_file) = self.index_file {
            config.output.index_file = index_file;
        }
        if let Some(results_file) = self.results_file {
            config.output.results_file = results_file;
        }
        config
    }
}

/// Worker process settings: `<python> <script>` with the resolved runtime.
pub fn worker_config(config: &OcrgrepConfig) -> WorkerConfig {
    worker_config_with(config, resolve_runtime(&config.worker))
}

pub fn worker_config_with(config: &OcrgrepConfig, runtime: RuntimeEnvironment) -> WorkerConfig {
    let worker = &config.worker;
    let timeout = (worker.timeout_secs > 0).then(|| Duration::from_secs(worker.timeout_secs));

    let mut settings = WorkerConfig::new(&worker.python)
        .with_args([worker.script.to_string_lossy().into_owned()])
        .with_timeout(timeout);
    for dir in runtime.search_paths {
        settings = settings.with_search_path(dir);
    }
    for (key, value) in runtime.variables {
        settings = settings.with_env(key, value);
    }
    settings
}
