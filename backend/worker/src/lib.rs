//! Bridge to the external text recognition worker.
//!
//! ```text
//!   RecognitionClient ── init / read_text / close
//!          │
//!   WorkerChannel ──── stdin:  "<command> <args…>\n"
//!          │           stdout: one JSON response per line
//!          ▼
//!   worker process (spawned lazily, respawned after exit)
//! ```

pub mod channel;
pub mod client;
pub mod config;
pub mod protocol;

pub use channel::{ProcessState, WorkerChannel, STDERR_TARGET};
pub use client::RecognitionClient;
pub use config::WorkerConfig;
pub use protocol::{ResponseStatus, WorkerResponse, CMD_CLOSE, CMD_INIT, CMD_READ_TEXT};

#[cfg(all(test, unix))]
pub(crate) mod testing {
    use crate::config::WorkerConfig;

    /// A worker that answers every known command successfully.
    pub const ECHO_WORKER: &str = r#"
while IFS= read -r line; do
  set -- $line
  case "$1" in
    init) echo '{"status":"success"}' ;;
    read_text) echo '{"status":"success","data":[{"text":"Salt","confidence":0.98,"region":[[0,0],[4,0],[4,2],[0,2]]},{"text":"dough","confidence":0.91,"region":[[0,3],[4,3],[4,5],[0,5]]}]}' ;;
    close) echo '{"status":"success"}'; exit 0 ;;
    *) echo '{"status":"error","message":"unknown command"}' ;;
  esac
done
"#;

    /// Run `script` under `sh -c` as the worker.
    pub fn script_worker(script: &str) -> WorkerConfig {
        WorkerConfig::new("sh").with_args(["-c", script])
    }
}
