//! Interpreter environment for the worker process.
//!
//! The worker's Python packages live either in a virtualenv under the user's
//! home or in the system prefix of a container image. The resolved search
//! paths and variables are handed to the child only; the parent's own
//! environment is left untouched.

use crate::schema::{RuntimeMode, WorkerSettings};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const ENV_IN_DOCKER: &str = "IN_DOCKER";
pub const DOCKER_MARKER: &str = "/.dockerenv";
pub const DEFAULT_VENV_DIR: &str = "myenv";
pub const CONTAINER_PREFIX: &str = "/usr/local";

/// Search paths and variables to apply to the worker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeEnvironment {
    /// Resolved mode; never [`RuntimeMode::Auto`].
    pub mode: RuntimeMode,
    /// Prepended to the inherited `PATH`.
    pub search_paths: Vec<PathBuf>,
    pub variables: BTreeMap<String, String>,
}

/// True when running inside a container.
pub fn detect_container(env: &HashMap<String, String>) -> bool {
    env.get(ENV_IN_DOCKER).is_some_and(|v| !v.trim().is_empty()) || Path::new(DOCKER_MARKER).exists()
}

/// Resolve against the real process environment and home directory.
pub fn resolve_runtime(settings: &WorkerSettings) -> RuntimeEnvironment {
    let env: HashMap<String, String> = std::env::vars().collect();
    let in_container = detect_container(&env);
    resolve_runtime_with(settings, in_container, dirs::home_dir().as_deref())
}

pub fn resolve_runtime_with(
    settings: &WorkerSettings,
    in_container: bool,
    home: Option<&Path>,
) -> RuntimeEnvironment {
    let mode = match settings.runtime {
        RuntimeMode::Auto if in_container => RuntimeMode::Container,
        RuntimeMode::Auto => RuntimeMode::Local,
        explicit => explicit,
    };

    let prefix = match mode {
        RuntimeMode::Container => Some(PathBuf::from(CONTAINER_PREFIX)),
        _ => match (&settings.venv, home) {
            (Some(venv), home) => Some(expand_home(venv, home)),
            (None, Some(home)) => Some(home.join(DEFAULT_VENV_DIR)),
            (None, None) => None,
        },
    };

    let Some(prefix) = prefix else {
        warn!("No home directory and no worker.venv; worker runs with the inherited environment");
        return RuntimeEnvironment {
            mode,
            ..Default::default()
        };
    };

    let site_packages = prefix
        .join("lib")
        .join(format!("python{}", settings.python_version))
        .join("site-packages");
    let mut variables = BTreeMap::new();
    variables.insert(
        "PYTHONPATH".to_string(),
        site_packages.to_string_lossy().into_owned(),
    );

    let resolved = RuntimeEnvironment {
        mode,
        search_paths: vec![prefix.join("bin")],
        variables,
    };
    debug!(mode = ?resolved.mode, prefix = %prefix.display(), "Resolved worker runtime");
    resolved
}

/// Replace a leading `~` with the home directory.
pub fn expand_home(path: &Path, home: Option<&Path>) -> PathBuf {
    match (path.strip_prefix("~"), home) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}
