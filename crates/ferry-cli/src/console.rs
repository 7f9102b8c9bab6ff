//! Console front-end.
//!
//! A line-oriented REPL standing in for a chat platform: plain lines are
//! messages for the agent, slash commands manage the session. Turns run on
//! a background task so `/stop` stays responsive while the agent works.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::debug;

use ferry_agent::AvailabilityProbe;
use ferry_core::{AutonomyLevel, ConversationId, PermissionDecision, PermissionRequest};
use ferry_runtime::{ConversationSink, TurnOrchestrator, TurnPhase};
use ferry_sessions::{RegistryError, SessionRegistry};

/// The single conversation a console session drives.
const CONSOLE_CONVERSATION: &str = "console";

/// One parsed input line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// `/new [path]`: fresh session, optionally in a new working directory.
    New {
        /// Working directory for the new session.
        working_dir: Option<PathBuf>,
    },
    /// `/sessions`: recent session history.
    Sessions,
    /// `/auto [level]`: show or set the autonomy level.
    Auto {
        /// Level to set; `None` shows the current one.
        level: Option<AutonomyLevel>,
    },
    /// `/stop`: cancel the live turn.
    Stop,
    /// `/stream`: toggle live tool updates for this session.
    Stream,
    /// `/status`: daemon availability and turn state.
    Status,
    /// `/help`: command list.
    Help,
    /// `/quit`: leave the console.
    Quit,
    /// Anything without a leading slash: a message for the agent.
    Message(String),
}

/// Why an input line did not parse.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ParseCommandError {
    /// The `/auto` argument was not a known level.
    #[error("Invalid level. Use: off, low, medium, high, unsafe")]
    InvalidAutonomyLevel,
    /// The slash command is not in the vocabulary.
    #[error("Unknown command /{0}. Try /help.")]
    UnknownCommand(String),
}

/// Parse one trimmed input line.
pub fn parse(line: &str) -> Result<Command, ParseCommandError> {
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Command::Message(line.to_owned()));
    };
    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };
    match name {
        "new" => Ok(Command::New {
            working_dir: (!arg.is_empty()).then(|| PathBuf::from(arg)),
        }),
        "sessions" => Ok(Command::Sessions),
        "auto" => {
            if arg.is_empty() {
                Ok(Command::Auto { level: None })
            } else {
                arg.parse()
                    .map(|level| Command::Auto { level: Some(level) })
                    .map_err(|_| ParseCommandError::InvalidAutonomyLevel)
            }
        }
        "stop" => Ok(Command::Stop),
        "stream" => Ok(Command::Stream),
        "status" => Ok(Command::Status),
        "help" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        other => Err(ParseCommandError::UnknownCommand(other.to_owned())),
    }
}

fn autonomy_emoji(level: AutonomyLevel) -> &'static str {
    match level {
        AutonomyLevel::Off => "👁",
        AutonomyLevel::Low => "🔒",
        AutonomyLevel::Medium => "🔓",
        AutonomyLevel::High => "⚡",
        AutonomyLevel::Unsafe => "⚠️",
    }
}

/// Flip live tool updates for the conversation, creating its record on
/// first use. Returns the new state.
fn toggle_streaming(
    registry: &SessionRegistry,
    conversation: &ConversationId,
    default_working_dir: &Path,
) -> Result<bool, RegistryError> {
    let _ = registry.get_or_create(conversation, default_working_dir)?;
    let record = registry.update(conversation, |record| {
        record.streaming_enabled = !record.streaming_enabled;
    })?;
    Ok(record.streaming_enabled)
}

/// Shorten a path for display by folding the home prefix into `~`.
fn short_path(path: &Path) -> String {
    let display = path.display().to_string();
    std::env::var("HOME")
        .ok()
        .filter(|home| !home.is_empty())
        .and_then(|home| {
            display
                .strip_prefix(&home)
                .map(|rest| format!("~{rest}"))
        })
        .unwrap_or(display)
}

/// Sink that prints progress blocks to stdout and parks permission prompts
/// until the input loop answers them.
pub struct ConsoleSink {
    pending: Mutex<Option<oneshot::Sender<PermissionDecision>>>,
}

impl ConsoleSink {
    /// New sink with no pending prompt.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(None),
        }
    }

    /// Feed an input line to the pending prompt, if one is waiting.
    ///
    /// Returns `true` when the line was consumed as a permission answer.
    pub fn answer_prompt(&self, line: &str) -> bool {
        let Some(sender) = self.pending.lock().take() else {
            return false;
        };
        let decision = match line {
            "y" | "yes" => PermissionDecision::AllowOnce,
            "a" | "always" => PermissionDecision::AllowAlways,
            _ => PermissionDecision::Deny,
        };
        if sender.send(decision).is_err() {
            debug!("permission prompt was abandoned before the answer arrived");
        }
        true
    }

    /// Drop any prompt left over from a turn that already ended.
    pub fn clear_pending(&self) {
        *self.pending.lock() = None;
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConversationSink for ConsoleSink {
    async fn progress(&self, _conversation: &ConversationId, text: &str) {
        println!("{text}");
        println!();
    }

    async fn permission_prompt(
        &self,
        _conversation: &ConversationId,
        request: &PermissionRequest,
    ) -> PermissionDecision {
        println!("Permission needed: {}", request.description);
        println!("y = allow once, a = always allow, anything else = deny");
        let (tx, rx) = oneshot::channel();
        *self.pending.lock() = Some(tx);
        // A dropped sender means the turn went away; deny is the safe answer.
        rx.await.unwrap_or(PermissionDecision::Deny)
    }
}

/// Run the console loop until `/quit`, end of input, or an idle Ctrl-C.
pub async fn run(
    orchestrator: Arc<TurnOrchestrator>,
    probe: Arc<AvailabilityProbe>,
    sink: Arc<ConsoleSink>,
    default_working_dir: PathBuf,
) -> Result<()> {
    let conversation = ConversationId::from(CONSOLE_CONVERSATION);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut turn: Option<JoinHandle<()>> = None;

    println!("ferry console. /help lists commands, /quit leaves.");

    loop {
        let line = tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => line,
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                // A Ctrl-C stops the live turn; an idle one quits.
                if orchestrator.cancel_turn(&conversation) {
                    println!("✓ Process stopped");
                    continue;
                }
                break;
            }
        };

        let line = line.trim().to_owned();
        if line.is_empty() {
            continue;
        }

        // Permission answers are plain lines; commands always win.
        if !line.starts_with('/') && sink.answer_prompt(&line) {
            continue;
        }

        let command = match parse(&line) {
            Ok(command) => command,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };

        match command {
            Command::Message(text) => {
                let task = tokio::spawn(run_one_turn(
                    orchestrator.clone(),
                    sink.clone(),
                    conversation.clone(),
                    text,
                ));
                // Keep the handle of a still-live turn; a rejected second
                // message only prints its notice.
                if turn.as_ref().is_none_or(JoinHandle::is_finished) {
                    turn = Some(task);
                }
            }
            Command::New { working_dir } => {
                // A bare /new returns to the configured default directory.
                let dir = working_dir.unwrap_or_else(|| default_working_dir.clone());
                match orchestrator.registry().reset(&conversation, dir) {
                    Ok(record) => println!(
                        "🆕 New session started in {}",
                        short_path(&record.working_dir)
                    ),
                    Err(e) => println!("Error: {e}"),
                }
            }
            Command::Sessions => print_sessions(orchestrator.registry()),
            Command::Auto { level: None } => {
                let current = orchestrator
                    .registry()
                    .get(&conversation)
                    .map_or_else(AutonomyLevel::default, |record| record.autonomy_level);
                println!(
                    "Current autonomy: {} {}",
                    autonomy_emoji(current),
                    current.as_str()
                );
                println!("Usage: /auto <off|low|medium|high|unsafe>");
            }
            Command::Auto { level: Some(level) } => {
                let updated = orchestrator
                    .registry()
                    .get_or_create(&conversation, &default_working_dir)
                    .and_then(|_| {
                        orchestrator
                            .registry()
                            .update(&conversation, |record| record.autonomy_level = level)
                    });
                match updated {
                    Ok(_) => println!(
                        "{} Autonomy set to {} for this session",
                        autonomy_emoji(level),
                        level.as_str()
                    ),
                    Err(e) => println!("Error: {e}"),
                }
            }
            Command::Stop => {
                if orchestrator.cancel_turn(&conversation) {
                    println!("✓ Process stopped");
                } else {
                    println!("Process already finished.");
                }
            }
            Command::Stream => {
                match toggle_streaming(
                    orchestrator.registry(),
                    &conversation,
                    &default_working_dir,
                ) {
                    Ok(enabled) => println!(
                        "Live tool updates: {}",
                        if enabled { "ON" } else { "OFF" }
                    ),
                    Err(e) => println!("Error: {e}"),
                }
            }
            Command::Status => {
                let daemon = if probe.force_check().await {
                    "🟢 Connected"
                } else {
                    "🔴 Not running"
                };
                let turn_state = match orchestrator.turn_phase(&conversation) {
                    Some(TurnPhase::Dispatching) => "dispatching",
                    Some(TurnPhase::Streaming) => "streaming",
                    None => "idle",
                };
                let record = orchestrator.registry().get(&conversation);
                let live = record
                    .as_ref()
                    .is_none_or(|record| record.streaming_enabled);
                println!("🖥️ Daemon: {daemon}");
                println!("⚡ Live updates: {}", if live { "ON" } else { "OFF" });
                println!("⚙️ Turn: {turn_state}");
                if let Some(record) = record {
                    let sid = record
                        .session_id
                        .as_deref()
                        .map_or("pending", |id| id.get(..8).unwrap_or(id));
                    println!(
                        "📂 Session: {sid} {} in {}",
                        autonomy_emoji(record.autonomy_level),
                        short_path(&record.working_dir)
                    );
                }
            }
            Command::Help => print_help(),
            Command::Quit => break,
        }
    }

    orchestrator.shutdown();
    if let Some(handle) = turn.take() {
        let _ = handle.await;
    }
    Ok(())
}

/// One turn on a background task: the final answer (or failure notice) is
/// the only message printed after the progress stream.
async fn run_one_turn(
    orchestrator: Arc<TurnOrchestrator>,
    sink: Arc<ConsoleSink>,
    conversation: ConversationId,
    text: String,
) {
    match orchestrator.run_turn(&conversation, &text).await {
        Ok(outcome) => {
            println!("{}", outcome.text);
            println!();
        }
        Err(e) => {
            println!("{}", e.user_message());
            println!();
        }
    }
    sink.clear_pending();
}

fn print_sessions(registry: &SessionRegistry) {
    let history = registry.history(10);
    if history.is_empty() {
        println!("No sessions yet. Use /new to start one.");
        return;
    }
    println!("Recent sessions:");
    for entry in &history {
        let sid = entry.session_id.get(..8).unwrap_or(&entry.session_id);
        let preview = if entry.first_prompt.is_empty() {
            "N/A"
        } else {
            entry.first_prompt.as_str()
        };
        println!("  {sid}  {}  {preview}", short_path(&entry.working_dir));
    }
}

fn print_help() {
    println!("Commands:");
    println!("  /new [path]    start a fresh session (optional working directory)");
    println!("  /sessions      recent sessions");
    println!("  /auto [level]  show or set autonomy (off/low/medium/high/unsafe)");
    println!("  /stop          cancel the running turn");
    println!("  /stream        toggle live tool updates");
    println!("  /status        daemon and turn state");
    println!("  /help          this list");
    println!("  /quit          leave the console");
    println!("Anything else is sent to the agent.");
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
