//! Turn-level error types.

use ferry_agent::TransportError;
use ferry_sessions::RegistryError;

/// Result alias for turn operations.
pub type TurnResult<T> = Result<T, TurnError>;

/// Why a turn did not produce an answer.
///
/// Every terminal state of a turn maps to exactly one of these or to a
/// successful [`TurnOutcome`](crate::TurnOutcome); the front-end renders
/// [`TurnError::user_message`] as the turn's final message.
#[derive(Debug, thiserror::Error)]
pub enum TurnError {
    /// A turn is already live for this conversation.
    #[error("a turn is already running for this conversation")]
    AlreadyRunning,

    /// The turn was cancelled before it finished.
    #[error("turn cancelled")]
    Cancelled,

    /// The transport failed to deliver the turn.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The session registry could not be read or written.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl TurnError {
    /// Stable label for logs and metrics.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Self::AlreadyRunning => "already_running",
            Self::Cancelled => "cancelled",
            Self::Transport(e) => e.category(),
            Self::Registry(_) => "registry",
        }
    }

    /// Whether retrying the same turn could plausibly succeed.
    ///
    /// Agent-reported errors are deterministic refusals; registry failures
    /// need operator attention. Everything else is transient.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::AlreadyRunning | Self::Cancelled => true,
            Self::Transport(e) => !matches!(e, TransportError::Agent { .. }),
            Self::Registry(_) => false,
        }
    }

    /// The final message shown to the user for this failure.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::AlreadyRunning => {
                "A turn is already running for this conversation. Use /stop to cancel it.".to_owned()
            }
            Self::Cancelled => "🛑 Stopped by user".to_owned(),
            Self::Transport(TransportError::Agent { message, .. }) => format!("Error: {message}"),
            Self::Transport(e) => format!("Error: {e}"),
            Self::Registry(e) => format!("Error: {e}"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
