use std::collections::HashMap;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::warn;

/// How to launch the worker process.
///
/// The parent process environment is inherited unchanged; search paths and
/// runtime variables are applied to the child only.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Interpreter or binary to run (resolved against the child's `PATH`).
    pub executable_path: PathBuf,
    /// Arguments passed to the executable, typically the worker script.
    pub args: Vec<String>,
    /// Directories prepended to the inherited `PATH`.
    pub extra_search_paths: Vec<PathBuf>,
    /// Extra variables for the child, e.g. `PYTHONPATH`. Applied after `PATH`
    /// so an explicit `PATH` entry here wins.
    pub runtime_environment: HashMap<String, String>,
    /// Per-request deadline. On expiry the worker is killed and restarted by
    /// the next request. `None` waits forever.
    pub timeout: Option<Duration>,
}

impl WorkerConfig {
    pub fn new(executable_path: impl Into<PathBuf>) -> Self {
        Self {
            executable_path: executable_path.into(),
            args: Vec::new(),
            extra_search_paths: Vec::new(),
            runtime_environment: HashMap::new(),
            timeout: None,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn with_search_path(mut self, dir: impl Into<PathBuf>) -> Self {
        self.extra_search_paths.push(dir.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.runtime_environment.insert(key.into(), value.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Display form of the executable for logs and errors.
    pub fn program(&self) -> String {
        self.executable_path.display().to_string()
    }

    /// `PATH` for the child: extra search paths first, then the inherited one.
    pub fn search_path(&self) -> Option<OsString> {
        if self.extra_search_paths.is_empty() {
            return None;
        }
        let mut dirs = self.extra_search_paths.clone();
        if let Some(inherited) = std::env::var_os("PATH") {
            dirs.extend(std::env::split_paths(&inherited));
        }
        match std::env::join_paths(dirs) {
            Ok(joined) => Some(joined),
            Err(e) => {
                warn!(error = %e, "Ignoring extra worker search paths");
                None
            }
        }
    }

    /// Build the spawn command with all three standard streams piped.
    pub(crate) fn command(&self) -> Command {
        let mut cmd = Command::new(&self.executable_path);
        cmd.args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(path) = self.search_path() {
            cmd.env("PATH", path);
        }
        cmd.envs(&self.runtime_environment);
        cmd
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_path_prepends_extra_dirs() {
        let config = WorkerConfig::new("python3")
            .with_search_path("/opt/venv/bin")
            .with_search_path("/usr/local/bin");
        let joined = config.search_path().unwrap();
        let dirs: Vec<PathBuf> = std::env::split_paths(&joined).collect();
        assert_eq!(dirs[0], PathBuf::from("/opt/venv/bin"));
        assert_eq!(dirs[1], PathBuf::from("/usr/local/bin"));
    }

    #[test]
    fn no_extra_dirs_leaves_path_alone() {
        assert!(WorkerConfig::new("python3").search_path().is_none());
    }

    #[test]
    fn builder_collects_settings() {
        let config = WorkerConfig::new("python3")
            .with_args(["worker.py"])
            .with_env("PYTHONPATH", "/opt/site-packages")
            .with_timeout(Some(Duration::from_secs(5)));
        assert_eq!(config.program(), "python3");
        assert_eq!(config.args, vec!["worker.py"]);
        assert_eq!(config.runtime_environment["PYTHONPATH"], "/opt/site-packages");
        assert_eq!(config.timeout, Some(Duration::from_secs(5)));
    }
}
