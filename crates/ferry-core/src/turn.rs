//! Turn dispatch and permission types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::ids::ConversationId;
use crate::session::AutonomyLevel;

/// Everything a transport needs to run one turn.
///
/// Built by the orchestrator from the user's message plus the conversation's
/// [`SessionRecord`](crate::SessionRecord). The same request is reused
/// verbatim when a turn falls back from the daemon to the subprocess path.
#[derive(Clone, Debug, PartialEq)]
pub struct TurnRequest {
    /// Conversation the turn belongs to.
    pub conversation_id: ConversationId,
    /// The user's message text.
    pub text: String,
    /// Agent session to resume, when one exists.
    pub session_id: Option<String>,
    /// Directory the agent works in.
    pub working_dir: PathBuf,
    /// Permission mode forwarded to the agent.
    pub permission_mode: AutonomyLevel,
}

/// An in-stream request for permission to take a protected action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PermissionRequest {
    /// Request ID, echoed back with the decision.
    pub id: String,
    /// Human-readable description of the action.
    pub description: String,
}

/// The answer to a [`PermissionRequest`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionDecision {
    /// Allow this request only.
    AllowOnce,
    /// Allow this request and stop asking for the rest of the session.
    AllowAlways,
    /// Refuse the request.
    Deny,
}

impl PermissionDecision {
    /// String form used on the wire and in user prompts.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AllowOnce => "allow_once",
            Self::AllowAlways => "allow_always",
            Self::Deny => "deny",
        }
    }

    /// Whether the decision lets the action proceed.
    #[must_use]
    pub fn allows(self) -> bool {
        matches!(self, Self::AllowOnce | Self::AllowAlways)
    }
}

impl fmt::Display for PermissionDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing a [`PermissionDecision`] from a string.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown permission decision `{0}` (expected once, always, or deny)")]
pub struct ParsePermissionDecisionError(pub String);

impl FromStr for PermissionDecision {
    type Err = ParsePermissionDecisionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "once" | "allow_once" => Ok(Self::AllowOnce),
            "always" | "allow_always" => Ok(Self::AllowAlways),
            "deny" => Ok(Self::Deny),
            other => Err(ParsePermissionDecisionError(other.to_owned())),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
