//! Streamed agent events.
//!
//! An [`AgentEvent`] is one record of the agent's progress during a turn,
//! decoded from a transport's line-delimited JSON output. Both transports
//! (HTTP daemon and one-shot CLI) emit the same vocabulary; the orchestrator
//! consumes each turn's stream exactly once, in arrival order.
//!
//! [`AgentEvent::TurnComplete`] and [`AgentEvent::TurnError`] are terminal:
//! nothing follows them on a well-formed stream.

use serde::{Deserialize, Serialize};

/// One streamed event within a turn.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AgentEvent {
    /// A tool call began executing.
    #[serde(rename = "tool_call_started")]
    ToolCallStarted {
        /// Tool call ID, stable across this call's events.
        id: String,
        /// Tool name.
        name: String,
        /// Short argument summary (a path, a command line).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },

    /// Incremental output from a running tool call.
    #[serde(rename = "tool_call_output")]
    ToolCallOutput {
        /// Tool call ID.
        id: String,
        /// Output fragment.
        chunk: String,
    },

    /// A tool call finished.
    #[serde(rename = "tool_call_finished")]
    ToolCallFinished {
        /// Tool call ID.
        id: String,
        /// Whether the call succeeded.
        ok: bool,
    },

    /// The agent is asking for permission before a protected action.
    #[serde(rename = "permission_request")]
    PermissionRequest {
        /// Request ID, echoed back with the decision.
        id: String,
        /// Human-readable description of the action.
        description: String,
    },

    /// A fragment of the assistant's reply text.
    #[serde(rename = "assistant_text")]
    AssistantText {
        /// Text fragment.
        text: String,
    },

    /// Terminal: the turn finished.
    #[serde(rename = "turn_complete")]
    TurnComplete {
        /// Session the turn ran under (present when the agent assigned or
        /// confirmed one).
        #[serde(rename = "sessionId", default, skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
        /// Full reply text, when the agent sends it in one piece.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },

    /// Terminal: the turn failed agent-side.
    #[serde(rename = "turn_error")]
    TurnError {
        /// Agent error code, when the agent provides one.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<String>,
        /// Human-readable error message.
        message: String,
        /// Session the turn ran under, when one was assigned before the
        /// failure.
        #[serde(rename = "sessionId", default, skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
    },
}

impl AgentEvent {
    /// Get the event type string (for logging and metrics labels).
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ToolCallStarted { .. } => "tool_call_started",
            Self::ToolCallOutput { .. } => "tool_call_output",
            Self::ToolCallFinished { .. } => "tool_call_finished",
            Self::PermissionRequest { .. } => "permission_request",
            Self::AssistantText { .. } => "assistant_text",
            Self::TurnComplete { .. } => "turn_complete",
            Self::TurnError { .. } => "turn_error",
        }
    }

    /// Whether this event ends the turn.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::TurnComplete { .. } | Self::TurnError { .. })
    }

    /// The session ID carried by this event, if any.
    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        match self {
            Self::TurnComplete { session_id, .. } | Self::TurnError { session_id, .. } => {
                session_id.as_deref()
            }
            _ => None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
