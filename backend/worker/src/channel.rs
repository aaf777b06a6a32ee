//! Worker channel: one long-lived worker process and the requests in flight
//! on its standard streams.
//!
//! Two coupled state machines live here:
//!
//! - the process, `NotStarted → Starting → Running → Exited`, published per
//!   spawn through a `watch` channel by the task that owns the `Child`;
//! - the request table, `idle ⇄ awaiting`, an ordered list of pending entries
//!   keyed by correlation id. Ids stay on this side of the pipe; the worker
//!   answers in request order.
//!
//! Each process gets its own request table. The `Exited` transition is
//! published first, then the table is drained and closed, so a request can
//! never be left waiting on a dead process: it is either failed by the drain
//! or refused at insertion.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout};
use tokio::sync::{oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use ocrgrep_core::{OcrError, OcrResult};

use crate::config::WorkerConfig;
use crate::protocol::{decode_response, encode_command, WorkerResponse, CMD_CLOSE};

/// How long to keep reading stdout after the process exits, so responses
/// written just before exit are still delivered.
const STDOUT_DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Log target for lines the worker writes to stderr, logged at debug level.
/// Enable with `--log-level info,ocrgrep::worker::stderr=debug`.
pub const STDERR_TARGET: &str = "ocrgrep::worker::stderr";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    NotStarted,
    Starting,
    Running,
    Exited { code: Option<i32> },
}

impl ProcessState {
    pub fn is_live(&self) -> bool {
        matches!(self, ProcessState::Starting | ProcessState::Running)
    }

    pub fn is_exited(&self) -> bool {
        matches!(self, ProcessState::Exited { .. })
    }
}

// ---------------------------------------------------------------------------
// Request table
// ---------------------------------------------------------------------------

type Reply = oneshot::Sender<OcrResult<WorkerResponse>>;

struct PendingRequest {
    id: Uuid,
    command: String,
    reply: Reply,
}

/// Requests written to the current process and not yet answered, oldest
/// first.
///
/// Correlation ids are never written to the worker (see
/// [`encode_command`]), so in practice every response is matched to the
/// oldest entry. Matching by `id` only applies to a worker that puts the id
/// in its responses by some other means.
#[derive(Default)]
struct PendingTable {
    entries: VecDeque<PendingRequest>,
    /// Set once the owning process has exited; carries its exit code.
    closed: Option<Option<i32>>,
}

impl PendingTable {
    fn insert(&mut self, id: Uuid, command: &str, reply: Reply) -> OcrResult<()> {
        if let Some(code) = self.closed {
            return Err(OcrError::WorkerExited { code });
        }
        self.entries.push_back(PendingRequest {
            id,
            command: command.to_string(),
            reply,
        });
        Ok(())
    }

    fn remove(&mut self, id: Uuid) -> bool {
        match self.entries.iter().position(|p| p.id == id) {
            Some(idx) => self.entries.remove(idx).is_some(),
            None => false,
        }
    }

    /// Hand a response to the oldest request, or to the request its `id`
    /// names when it carries one (see the type docs).
    fn resolve(&mut self, response: WorkerResponse) {
        let idx = match response.id.as_deref() {
            Some(raw) => Uuid::parse_str(raw)
                .ok()
                .and_then(|id| self.entries.iter().position(|p| p.id == id)),
            None if self.entries.is_empty() => None,
            None => Some(0),
        };

        match idx.and_then(|i| self.entries.remove(i)) {
            Some(entry) => {
                debug!(id = %entry.id, command = %entry.command, status = ?response.status, "Worker response received");
                let _ = entry.reply.send(Ok(response));
            }
            None => {
                warn!(response_id = ?response.id, status = ?response.status, "Discarding worker response with no matching request");
            }
        }
    }

    fn reject_oldest(&mut self, err: OcrError) {
        match self.entries.pop_front() {
            Some(entry) => {
                let _ = entry.reply.send(Err(err));
            }
            None => warn!(error = %err, "Worker output error with no request pending"),
        }
    }

    fn fail_all(&mut self, code: Option<i32>) -> usize {
        self.closed = Some(code);
        let count = self.entries.len();
        for entry in self.entries.drain(..) {
            debug!(id = %entry.id, command = %entry.command, "Failing request on worker exit");
            let _ = entry.reply.send(Err(OcrError::WorkerExited { code }));
        }
        count
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

fn lock(table: &StdMutex<PendingTable>) -> MutexGuard<'_, PendingTable> {
    table.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ---------------------------------------------------------------------------
// Process handle
// ---------------------------------------------------------------------------

struct WorkerHandle {
    generation: u64,
    pid: Option<u32>,
    pending: Arc<StdMutex<PendingTable>>,
    stdin: Option<ChildStdin>,
    kill_tx: Option<oneshot::Sender<()>>,
    state_rx: watch::Receiver<ProcessState>,
}

impl WorkerHandle {
    fn state(&self) -> ProcessState {
        *self.state_rx.borrow()
    }

    fn kill(&mut self) {
        if let Some(tx) = self.kill_tx.take() {
            let _ = tx.send(());
        }
    }
}

// ---------------------------------------------------------------------------
// Channel
// ---------------------------------------------------------------------------

/// Owns one worker process and correlates commands with its responses.
///
/// The process is spawned on the first [`send`](Self::send) and again on the
/// first `send` after it exits. Requests may be issued concurrently: writes to
/// stdin are serialised and responses are matched to requests in order.
pub struct WorkerChannel {
    config: WorkerConfig,
    handle: Mutex<Option<WorkerHandle>>,
    spawns: AtomicU64,
}

impl WorkerChannel {
    pub fn new(config: WorkerConfig) -> Self {
        Self {
            config,
            handle: Mutex::new(None),
            spawns: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub async fn process_state(&self) -> ProcessState {
        self.handle
            .lock()
            .await
            .as_ref()
            .map(WorkerHandle::state)
            .unwrap_or(ProcessState::NotStarted)
    }

    pub async fn is_running(&self) -> bool {
        self.process_state().await == ProcessState::Running
    }

    pub async fn pid(&self) -> Option<u32> {
        self.handle.lock().await.as_ref().and_then(|h| h.pid)
    }

    /// Number of requests awaiting a response from the current process.
    pub async fn pending_count(&self) -> usize {
        match self.handle.lock().await.as_ref() {
            Some(handle) => lock(&handle.pending).len(),
            None => 0,
        }
    }

    /// Number of processes spawned over the channel's lifetime.
    pub fn spawn_count(&self) -> u64 {
        self.spawns.load(Ordering::SeqCst)
    }

    /// Send one command and wait for its response.
    pub async fn send(&self, command: &str, args: &[String]) -> OcrResult<WorkerResponse> {
        let line = encode_command(command, args)?;
        let id = Uuid::new_v4();
        let (reply_tx, reply_rx) = oneshot::channel();

        let (generation, pending) = {
            let mut guard = self.handle.lock().await;
            let handle = self.ensure_started(&mut guard)?;
            let generation = handle.generation;
            let pending = Arc::clone(&handle.pending);
            let Some(stdin) = handle.stdin.as_mut() else {
                return Err(OcrError::ChannelClosed("worker input stream already closed".into()));
            };

            lock(&pending).insert(id, command, reply_tx)?;
            debug!(%id, command, generation, "Sending worker command");

            if let Err(e) = write_line(stdin, &line).await {
                lock(&pending).remove(id);
                warn!(%id, command, generation, error = %e, "Failed to write to worker");
                return Err(OcrError::WorkerExited { code: None });
            }
            (generation, pending)
        };

        let reply = match self.config.timeout {
            Some(limit) => match tokio::time::timeout(limit, reply_rx).await {
                Ok(reply) => reply,
                Err(_) => {
                    lock(&pending).remove(id);
                    warn!(%id, command, generation, timeout = ?limit, "Worker request timed out; killing worker");
                    self.kill_generation(generation).await;
                    return Err(OcrError::Timeout(limit));
                }
            },
            None => reply_rx.await,
        };

        reply.map_err(|_| OcrError::ChannelClosed("worker reply dropped".into()))?
    }

    /// Ask the worker to exit and wait until it has. A no-op when no worker
    /// is running.
    pub async fn close(&self) -> OcrResult<()> {
        if !self.is_running().await {
            debug!("Worker not running; nothing to close");
            return Ok(());
        }

        match self.send(CMD_CLOSE, &[]).await {
            Ok(response) => debug!(status = ?response.status, "Worker acknowledged close"),
            Err(OcrError::WorkerExited { code }) => {
                debug!(?code, "Worker exited before acknowledging close")
            }
            Err(e) => warn!(error = %e, "Close command failed; shutting down input anyway"),
        }

        let mut state_rx = {
            let mut guard = self.handle.lock().await;
            let Some(handle) = guard.as_mut() else {
                return Ok(());
            };
            if let Some(mut stdin) = handle.stdin.take() {
                if let Err(e) = stdin.shutdown().await {
                    debug!(error = %e, "Worker input already closed");
                }
            }
            handle.state_rx.clone()
        };

        let state = match self.config.timeout {
            Some(limit) => match tokio::time::timeout(limit, wait_exited(&mut state_rx)).await {
                Ok(state) => state,
                Err(_) => {
                    warn!(timeout = ?limit, "Worker did not exit after close; killing");
                    self.kill_current().await;
                    wait_exited(&mut state_rx).await
                }
            },
            None => wait_exited(&mut state_rx).await,
        };

        info!(?state, "Worker closed");
        Ok(())
    }

    /// Return the live handle, spawning a new process when there is none or
    /// the previous one has exited.
    fn ensure_started<'a>(&self, slot: &'a mut Option<WorkerHandle>) -> OcrResult<&'a mut WorkerHandle> {
        if slot.as_ref().is_some_and(|h| h.state().is_live()) {
            return slot.as_mut().ok_or_else(|| OcrError::ChannelClosed("worker handle missing".into()));
        }
        if let Some(stale) = slot.take() {
            debug!(generation = stale.generation, state = ?stale.state(), "Discarding exited worker handle");
        }

        let program = self.config.program();
        let (state_tx, state_rx) = watch::channel(ProcessState::Starting);

        let mut child = self.config.command().spawn().map_err(|source| {
            error!(program = %program, error = %source, "Failed to start worker process");
            OcrError::Startup {
                program: program.clone(),
                source,
            }
        })?;

        let generation = self.spawns.fetch_add(1, Ordering::SeqCst) + 1;
        let pid = child.id();

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            return Err(OcrError::ChannelClosed("worker standard streams unavailable".into()));
        };
        let pending = Arc::new(StdMutex::new(PendingTable::default()));
        let reader = tokio::spawn(read_responses(stdout, Arc::clone(&pending), generation));
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_stderr(stderr, generation));
        }

        let (kill_tx, kill_rx) = oneshot::channel();
        state_tx.send_replace(ProcessState::Running);
        tokio::spawn(supervise(
            child,
            reader,
            kill_rx,
            Arc::clone(&pending),
            state_tx,
            generation,
        ));

        info!(program = %program, generation, pid = ?pid, "Worker process started");

        Ok(slot.insert(WorkerHandle {
            generation,
            pid,
            pending,
            stdin: Some(stdin),
            kill_tx: Some(kill_tx),
            state_rx,
        }))
    }

    async fn kill_generation(&self, generation: u64) {
        let mut guard = self.handle.lock().await;
        if let Some(handle) = guard.as_mut().filter(|h| h.generation == generation) {
            handle.kill();
        }
    }

    async fn kill_current(&self) {
        if let Some(handle) = self.handle.lock().await.as_mut() {
            handle.kill();
        }
    }
}

async fn write_line(stdin: &mut ChildStdin, line: &str) -> std::io::Result<()> {
    stdin.write_all(line.as_bytes()).await?;
    stdin.flush().await
}

async fn wait_exited(state_rx: &mut watch::Receiver<ProcessState>) -> ProcessState {
    let result = state_rx.wait_for(ProcessState::is_exited).await.map(|state| *state);
    result.unwrap_or_else(|_| *state_rx.borrow())
}

// ---------------------------------------------------------------------------
// Per-process tasks
// ---------------------------------------------------------------------------

/// Owns the child: waits for it to exit (or kills it on request), publishes
/// `Exited`, then fails and closes whatever is still pending.
async fn supervise(
    mut child: Child,
    mut reader: JoinHandle<()>,
    kill_rx: oneshot::Receiver<()>,
    pending: Arc<StdMutex<PendingTable>>,
    state_tx: watch::Sender<ProcessState>,
    generation: u64,
) {
    // A dropped sender counts as a kill request, so dropping the channel
    // takes the process down with it.
    let exited = tokio::select! {
        status = child.wait() => Some(status),
        _ = kill_rx => None,
    };
    let status = match exited {
        Some(status) => status,
        None => {
            debug!(generation, "Killing worker process");
            if let Err(e) = child.start_kill() {
                warn!(generation, error = %e, "Failed to signal worker process");
            }
            child.wait().await
        }
    };

    let code = match &status {
        Ok(status) => status.code(),
        Err(e) => {
            error!(generation, error = %e, "Failed to wait on worker process");
            None
        }
    };

    if tokio::time::timeout(STDOUT_DRAIN_GRACE, &mut reader).await.is_err() {
        reader.abort();
    }

    state_tx.send_replace(ProcessState::Exited { code });
    let failed = lock(&pending).fail_all(code);

    if failed > 0 {
        warn!(generation, ?code, failed, "Worker exited with requests pending");
    } else {
        info!(generation, ?code, "Worker process exited");
    }
}

async fn read_responses(stdout: ChildStdout, pending: Arc<StdMutex<PendingTable>>, generation: u64) {
    let mut lines = BufReader::new(stdout).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let mut table = lock(&pending);
                match decode_response(trimmed) {
                    Ok(response) => table.resolve(response),
                    Err(err) => {
                        warn!(generation, error = %err, "Unparseable worker output");
                        table.reject_oldest(err);
                    }
                }
            }
            Ok(None) => {
                debug!(generation, "Worker output stream closed");
                break;
            }
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                warn!(generation, error = %e, "Worker wrote non-UTF-8 output");
                lock(&pending).reject_oldest(OcrError::Protocol(format!("worker output is not UTF-8: {e}")));
            }
            Err(e) => {
                warn!(generation, error = %e, "Failed reading worker output");
                break;
            }
        }
    }
}

async fn forward_stderr(stderr: ChildStderr, generation: u64) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        debug!(target: STDERR_TARGET, generation, "{}", line);
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::testing::{script_worker, ECHO_WORKER};

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn starts_lazily_and_only_once() {
        let channel = WorkerChannel::new(script_worker(ECHO_WORKER));
        assert_eq!(channel.process_state().await, ProcessState::NotStarted);
        assert_eq!(channel.spawn_count(), 0);

        let first = channel.send("init", &args(&["en"])).await.unwrap();
        assert!(first.is_success());
        let pid = channel.pid().await;

        let second = channel.send("read_text", &args(&["/tmp/a.png"])).await.unwrap();
        assert!(second.data.is_some());

        assert_eq!(channel.spawn_count(), 1);
        assert_eq!(channel.pid().await, pid);
        assert_eq!(channel.process_state().await, ProcessState::Running);
        assert_eq!(channel.pending_count().await, 0);

        channel.close().await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_requests_resolve_in_order() {
        let channel = WorkerChannel::new(script_worker(ECHO_WORKER));
        let init = args(&["en"]);
        let path = args(&["/tmp/a.png"]);

        let (a, b) = tokio::join!(channel.send("init", &init), channel.send("read_text", &path));
        assert!(a.unwrap().data.is_none());
        assert!(b.unwrap().data.is_some());
        assert_eq!(channel.spawn_count(), 1);

        channel.close().await.unwrap();
    }

    #[tokio::test]
    async fn exit_while_pending_rejects_request() {
        let channel = WorkerChannel::new(script_worker("read -r line; exit 3"));

        let err = channel.send("read_text", &args(&["/tmp/a.png"])).await.unwrap_err();
        assert!(matches!(err, OcrError::WorkerExited { code: Some(3) }), "got {err:?}");
        assert_eq!(channel.pending_count().await, 0);
        assert_eq!(channel.process_state().await, ProcessState::Exited { code: Some(3) });

        // The next request starts a fresh process.
        let err = channel.send("read_text", &args(&["/tmp/b.png"])).await.unwrap_err();
        assert!(matches!(err, OcrError::WorkerExited { .. }));
        assert_eq!(channel.spawn_count(), 2);
    }

    #[tokio::test]
    async fn unparseable_output_is_protocol_error() {
        let channel = WorkerChannel::new(script_worker(
            "while read -r line; do echo 'Downloading detection model'; done",
        ));
        let err = channel.send("init", &args(&["en"])).await.unwrap_err();
        assert!(matches!(err, OcrError::Protocol(_)), "got {err:?}");
        assert!(channel.is_running().await);
    }

    #[tokio::test]
    async fn missing_executable_is_startup_error() {
        let channel = WorkerChannel::new(WorkerConfig::new("/nonexistent/ocr-worker"));
        let err = channel.send("init", &args(&["en"])).await.unwrap_err();
        assert!(matches!(err, OcrError::Startup { .. }), "got {err:?}");
        assert_eq!(channel.process_state().await, ProcessState::NotStarted);
        assert_eq!(channel.spawn_count(), 0);
    }

    #[tokio::test]
    async fn timeout_kills_and_restarts_worker() {
        let config = script_worker("while read -r line; do sleep 30; done")
            .with_timeout(Some(Duration::from_millis(200)));
        let channel = WorkerChannel::new(config);

        let err = channel.send("read_text", &args(&["/tmp/a.png"])).await.unwrap_err();
        assert!(matches!(err, OcrError::Timeout(_)), "got {err:?}");
        assert_eq!(channel.pending_count().await, 0);

        let mut state_rx = channel.handle.lock().await.as_ref().unwrap().state_rx.clone();
        assert!(wait_exited(&mut state_rx).await.is_exited());

        let err = channel.send("read_text", &args(&["/tmp/a.png"])).await.unwrap_err();
        assert!(matches!(err, OcrError::Timeout(_)));
        assert_eq!(channel.spawn_count(), 2);
    }

    #[tokio::test]
    async fn timeout_fails_other_pending_requests() {
        let config = script_worker("while read -r line; do :; done")
            .with_timeout(Some(Duration::from_millis(500)));
        let channel = WorkerChannel::new(config);
        let a = args(&["/tmp/a.png"]);
        let b = args(&["/tmp/b.png"]);

        let (first, second) = tokio::join!(channel.send("read_text", &a), async {
            tokio::time::sleep(Duration::from_millis(250)).await;
            channel.send("read_text", &b).await
        });

        assert!(matches!(first, Err(OcrError::Timeout(_))), "got {first:?}");
        assert!(matches!(second, Err(OcrError::WorkerExited { .. })), "got {second:?}");
        assert_eq!(channel.pending_count().await, 0);
        assert_eq!(channel.spawn_count(), 1);
    }

    #[tokio::test]
    async fn close_kills_worker_that_ignores_eof() {
        let config = script_worker(
            r#"while IFS= read -r line; do echo '{"status":"success"}'; done
while :; do sleep 0.1; done"#,
        )
        .with_timeout(Some(Duration::from_millis(300)));
        let channel = WorkerChannel::new(config);

        channel.send("init", &args(&["en"])).await.unwrap();
        channel.close().await.unwrap();

        // Killed by a signal, so there is no exit code.
        assert_eq!(channel.process_state().await, ProcessState::Exited { code: None });
    }

    #[tokio::test]
    async fn stderr_output_does_not_disturb_responses() {
        let channel = WorkerChannel::new(script_worker(
            r#"while read -r line; do echo 'Using CPU. Note: This module is much faster with a GPU.' >&2; echo '{"status":"success"}'; done"#,
        ));
        let response = channel.send("init", &args(&["en"])).await.unwrap();
        assert!(response.is_success());
        assert_eq!(channel.pending_count().await, 0);
        assert!(STDERR_TARGET.starts_with("ocrgrep::"));
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let channel = WorkerChannel::new(script_worker(ECHO_WORKER));
        channel.close().await.unwrap();
        assert_eq!(channel.spawn_count(), 0);

        channel.send("init", &args(&["en"])).await.unwrap();
        channel.close().await.unwrap();
        assert_eq!(channel.process_state().await, ProcessState::Exited { code: Some(0) });

        channel.close().await.unwrap();
        assert_eq!(channel.spawn_count(), 1);
    }

    #[tokio::test]
    async fn close_tolerates_silent_exit() {
        let channel = WorkerChannel::new(script_worker(
            r#"while IFS= read -r line; do
  case "$line" in
    close*) exit 0 ;;
    *) echo '{"status":"success"}' ;;
  esac
done"#,
        ));
        channel.send("init", &args(&["en"])).await.unwrap();
        channel.close().await.unwrap();
        assert!(channel.process_state().await.is_exited());
    }

    #[tokio::test]
    async fn response_with_id_resolves_matching_request() {
        let mut table = PendingTable::default();
        let (tx_a, mut rx_a) = oneshot::channel();
        let (tx_b, mut rx_b) = oneshot::channel();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        table.insert(a, "init", tx_a).unwrap();
        table.insert(b, "read_text", tx_b).unwrap();

        table.resolve(decode_response(&format!(r#"{{"id":"{b}","status":"success"}}"#)).unwrap());
        assert!(rx_a.try_recv().is_err());
        assert!(rx_b.try_recv().unwrap().unwrap().is_success());
        assert_eq!(table.len(), 1);

        table.fail_all(Some(1));
        assert!(matches!(
            rx_a.try_recv().unwrap(),
            Err(OcrError::WorkerExited { code: Some(1) })
        ));

        let (tx_c, _rx_c) = oneshot::channel();
        let refused = table.insert(Uuid::new_v4(), "init", tx_c).unwrap_err();
        assert!(matches!(refused, OcrError::WorkerExited { code: Some(1) }));
    }
}
