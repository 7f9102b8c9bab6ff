//! Transport error types shared by both agent paths.

/// Result type alias for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Errors that can occur while dispatching a turn or driving its event stream.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The daemon could not be reached at all (connect failure or timeout).
    #[error("agent daemon unavailable: {message}")]
    Unavailable {
        /// Error description.
        message: String,
    },

    /// The event stream ended before a terminal event arrived.
    #[error("event stream ended before the turn finished")]
    Interrupted,

    /// The agent itself reported a failure.
    #[error("agent error: {message}")]
    Agent {
        /// Agent-specific error code, when one was provided.
        code: Option<String>,
        /// Error description.
        message: String,
    },

    /// The agent CLI process could not be started.
    #[error("failed to start agent process: {0}")]
    Spawn(#[from] std::io::Error),

    /// The agent CLI process exited non-zero before a terminal event.
    #[error("agent process exited with status {code}")]
    ProcessExit {
        /// Process exit code (`-1` when killed by a signal).
        code: i32,
        /// Tail of the captured stderr output.
        stderr_tail: String,
    },

    /// The turn was cancelled.
    #[error("turn cancelled")]
    Cancelled,
}

impl TransportError {
    /// Whether a daemon-path failure with this error may be retried once via
    /// the subprocess path.
    ///
    /// Only pre-stream reachability failures and dropped connections qualify;
    /// an error the agent itself reported would recur on any transport.
    #[must_use]
    pub fn is_fallback_eligible(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::Interrupted)
    }

    /// Error category string for metrics and log labels.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Self::Unavailable { .. } => "unavailable",
            Self::Interrupted => "interrupted",
            Self::Agent { .. } => "agent",
            Self::Spawn(_) => "spawn",
            Self::ProcessExit { .. } => "process_exit",
            Self::Cancelled => "cancelled",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
