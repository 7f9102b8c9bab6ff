//! Per-conversation session state.
//!
//! A [`SessionRecord`] is what ferry remembers about one conversation between
//! turns: which agent session to resume, where the agent works, and how much
//! it may do without asking. Records are owned by the session registry and
//! keyed by [`ConversationId`](crate::ConversationId).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::text::truncate_chars;

/// History keeps a short preview of the prompt that opened each session.
const FIRST_PROMPT_MAX_CHARS: usize = 50;

// ─────────────────────────────────────────────────────────────────────────────
// AutonomyLevel
// ─────────────────────────────────────────────────────────────────────────────

/// How much the agent may do before asking for permission.
///
/// The level is forwarded to the agent as its permission mode on every turn.
/// Ferry's own behavior only changes at [`AutonomyLevel::Unsafe`], which
/// auto-approves permission requests instead of prompting the user.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AutonomyLevel {
    /// The agent asks before every protected action.
    #[default]
    Off,
    /// Safe read-only actions proceed without asking.
    Low,
    /// File edits inside the working directory proceed without asking.
    Medium,
    /// Most commands proceed without asking.
    High,
    /// All permission checks are skipped.
    Unsafe,
}

impl AutonomyLevel {
    /// All levels, lowest to highest.
    pub const ALL: [Self; 5] = [Self::Off, Self::Low, Self::Medium, Self::High, Self::Unsafe];

    /// String form used on the wire, in settings files, and in user commands.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Unsafe => "unsafe",
        }
    }

    /// Whether this level auto-approves every permission request.
    #[must_use]
    pub fn skips_permission_checks(self) -> bool {
        matches!(self, Self::Unsafe)
    }
}

impl fmt::Display for AutonomyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an [`AutonomyLevel`] from a string.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown autonomy level `{0}` (expected off, low, medium, high, or unsafe)")]
pub struct ParseAutonomyLevelError(pub String);

impl FromStr for AutonomyLevel {
    type Err = ParseAutonomyLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" => Ok(Self::Off),
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "unsafe" => Ok(Self::Unsafe),
            other => Err(ParseAutonomyLevelError(other.to_owned())),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SessionRecord
// ─────────────────────────────────────────────────────────────────────────────

fn default_streaming_enabled() -> bool {
    true
}

/// Durable per-conversation state.
///
/// `session_id` is only ever a value assigned by the agent (session creation
/// response or a terminal stream event). Ferry never fabricates one locally;
/// `None` means the next turn starts a fresh agent session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    /// Agent-assigned session to resume, when one exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Directory the agent works in for this conversation.
    pub working_dir: PathBuf,
    /// Permission mode forwarded to the agent.
    #[serde(default)]
    pub autonomy_level: AutonomyLevel,
    /// Whether incremental progress updates are pushed to the front-end.
    #[serde(default = "default_streaming_enabled")]
    pub streaming_enabled: bool,
    /// Last mutation time, used to order recent sessions.
    pub updated_at: DateTime<Utc>,
}

impl SessionRecord {
    /// Create a fresh record rooted at `working_dir`.
    #[must_use]
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            session_id: None,
            working_dir: working_dir.into(),
            autonomy_level: AutonomyLevel::default(),
            streaming_enabled: default_streaming_enabled(),
            updated_at: Utc::now(),
        }
    }

    /// Refresh the `updated_at` stamp.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SessionHistoryEntry
// ─────────────────────────────────────────────────────────────────────────────

/// One line of the recent-session history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionHistoryEntry {
    /// Agent-assigned session identifier.
    pub session_id: String,
    /// Directory the session worked in.
    pub working_dir: PathBuf,
    /// Preview of the prompt that opened the session.
    pub first_prompt: String,
    /// When the session was first seen.
    pub created_at: DateTime<Utc>,
}

impl SessionHistoryEntry {
    /// Create an entry, truncating `first_prompt` to its preview length.
    #[must_use]
    pub fn new(
        session_id: impl Into<String>,
        working_dir: impl Into<PathBuf>,
        first_prompt: &str,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            working_dir: working_dir.into(),
            first_prompt: truncate_chars(first_prompt, FIRST_PROMPT_MAX_CHARS, "...").into_owned(),
            created_at: Utc::now(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
