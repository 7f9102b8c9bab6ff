//! One-shot agent CLI runner using `tokio::process::Command`.
//!
//! Fallback transport for when the daemon is not reachable: each turn spawns
//! `<command> run --format json [--session <id>] <text>` and decodes the
//! child's stdout with the same ND-JSON decoder as the daemon path. A
//! supervisor task owns the child, watches the turn's cancellation token, and
//! always reaps the process.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStderr, Command};
use tokio::sync::oneshot;
use tokio_stream::StreamExt;
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use ferry_core::{PermissionDecision, TurnRequest};

use crate::errors::{TransportError, TransportResult};
use crate::jsonl::{parse_event_line, split_json_lines, take_until_terminal};
use crate::transport::{TurnHandle, TurnTransport};

/// Default agent CLI command.
const DEFAULT_COMMAND: &str = "opencode";

/// Default grace period between SIGTERM and SIGKILL.
const DEFAULT_GRACE: Duration = Duration::from_secs(2);

/// Upper bound on the stderr tail kept for error context.
const MAX_STDERR_TAIL_BYTES: usize = 4096;

/// Subprocess runner configuration.
#[derive(Clone, Debug)]
pub struct ProcessConfig {
    /// Agent CLI command name or path.
    pub command: String,
    /// How long a cancelled child gets to exit after SIGTERM.
    pub grace: Duration,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            command: DEFAULT_COMMAND.into(),
            grace: DEFAULT_GRACE,
        }
    }
}

/// One-shot CLI transport.
pub struct CliRunner {
    /// Configuration.
    config: ProcessConfig,
}

impl CliRunner {
    /// Create a new runner.
    #[must_use]
    pub fn new(config: ProcessConfig) -> Self {
        Self { config }
    }
}

/// How a supervised child ended.
enum ExitOutcome {
    /// The process exited on its own. `code` is `None` when a signal killed it.
    Completed {
        code: Option<i32>,
        stderr_tail: String,
    },
    /// The turn's token fired and the process was stopped.
    Cancelled,
}

#[async_trait]
impl TurnTransport for CliRunner {
    fn name(&self) -> &'static str {
        "process"
    }

    async fn dispatch(
        &self,
        request: TurnRequest,
        cancel: CancellationToken,
    ) -> TransportResult<TurnHandle> {
        let mut cmd = Command::new(&self.config.command);
        let _ = cmd.arg("run").arg("--format").arg("json");
        if let Some(session_id) = &request.session_id {
            let _ = cmd.arg("--session").arg(session_id);
        }
        let _ = cmd
            .arg(&request.text)
            .current_dir(&request.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        debug!(
            command = %self.config.command,
            session_id = request.session_id.as_deref().unwrap_or("<new>"),
            working_dir = %request.working_dir.display(),
            "spawning agent process"
        );

        let mut child = cmd.spawn().map_err(TransportError::Spawn)?;
        let stdout = child.stdout.take().ok_or_else(|| {
            TransportError::Spawn(std::io::Error::other("child stdout not captured"))
        })?;
        let stderr = child.stderr.take();

        let (exit_tx, exit_rx) = oneshot::channel();
        let _ = tokio::spawn(supervise(child, stderr, cancel, self.config.grace, exit_tx));

        let events = split_json_lines(Box::pin(ReaderStream::new(stdout)))
            .filter_map(|line| parse_event_line(&line))
            .map(Ok);

        // Stdout closing without a terminal event is only diagnosable once
        // the exit status is known, so the tail item waits for the supervisor.
        let tail = futures::stream::once(async move {
            match exit_rx.await {
                Ok(ExitOutcome::Cancelled) => Err(TransportError::Cancelled),
                Ok(ExitOutcome::Completed { code, stderr_tail }) => match code {
                    Some(0) => Err(TransportError::Interrupted),
                    Some(code) => Err(TransportError::ProcessExit { code, stderr_tail }),
                    None => Err(TransportError::ProcessExit {
                        code: -1,
                        stderr_tail,
                    }),
                },
                Err(_) => Err(TransportError::Interrupted),
            }
        });

        let events = take_until_terminal(Box::pin(events.chain(tail)));

        Ok(TurnHandle {
            session_id_hint: None,
            events,
        })
    }

    async fn respond_permission(
        &self,
        session_id: &str,
        request_id: &str,
        decision: PermissionDecision,
    ) -> TransportResult<()> {
        // A one-shot run has no channel back into the agent mid-turn.
        warn!(
            session_id,
            request_id,
            decision = %decision,
            "permission decision has no delivery path on the subprocess transport"
        );
        Ok(())
    }

    async fn abort_turn(&self, session_id: &str) -> TransportResult<()> {
        // Cancellation reaches the child through the dispatch token.
        debug!(session_id, "abort is a no-op here; subprocess turns stop via their token");
        Ok(())
    }
}

/// Own the child until it exits or the turn is cancelled, then report how it
/// ended. Runs detached so early stream consumers never leak a zombie.
async fn supervise(
    mut child: Child,
    stderr: Option<ChildStderr>,
    cancel: CancellationToken,
    grace: Duration,
    exit_tx: oneshot::Sender<ExitOutcome>,
) {
    let stderr_task = tokio::spawn(read_stderr_tail(stderr));

    let outcome = tokio::select! {
        () = cancel.cancelled() => {
            debug!("turn cancelled; stopping agent process");
            terminate(&mut child, grace).await;
            stderr_task.abort();
            ExitOutcome::Cancelled
        }
        status = child.wait() => {
            let stderr_tail = stderr_task.await.unwrap_or_default();
            match status {
                Ok(status) => {
                    debug!(code = status.code().unwrap_or(-1), "agent process exited");
                    ExitOutcome::Completed { code: status.code(), stderr_tail }
                }
                Err(e) => {
                    warn!(error = %e, "failed waiting for agent process");
                    ExitOutcome::Completed { code: None, stderr_tail }
                }
            }
        }
    };

    let _ = exit_tx.send(outcome);
}

/// Read stderr to EOF, keeping only the last [`MAX_STDERR_TAIL_BYTES`].
async fn read_stderr_tail(stderr: Option<ChildStderr>) -> String {
    let Some(mut stderr) = stderr else {
        return String::new();
    };
    let mut tail: Vec<u8> = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        match stderr.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                tail.extend_from_slice(&chunk[..n]);
                if tail.len() > MAX_STDERR_TAIL_BYTES {
                    let excess = tail.len() - MAX_STDERR_TAIL_BYTES;
                    let _ = tail.drain(..excess);
                }
            }
        }
    }
    String::from_utf8_lossy(&tail).trim().to_string()
}

/// Stop the child: SIGTERM, bounded wait, then SIGKILL. Always reaps.
async fn terminate(child: &mut Child, grace: Duration) {
    #[cfg(unix)]
    if let Some(pid) = child.id().and_then(|id| i32::try_from(id).ok()) {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        if kill(Pid::from_raw(pid), Signal::SIGTERM).is_ok() {
            match tokio::time::timeout(grace, child.wait()).await {
                Ok(_) => return,
                Err(_) => warn!(
                    pid,
                    grace_ms = u64::try_from(grace.as_millis()).unwrap_or(u64::MAX),
                    "agent process ignored SIGTERM; killing"
                ),
            }
        }
    }

    if let Err(e) = child.kill().await {
        warn!(error = %e, "failed to kill agent process");
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
