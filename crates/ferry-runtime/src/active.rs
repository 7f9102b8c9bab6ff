//! In-flight turn tracking.
//!
//! [`ActiveTurns`] enforces the one-live-turn-per-conversation rule and owns
//! the cancellation token each turn is driven under. `begin` claims the
//! conversation before any session state is touched; `end` runs on every
//! exit path.

use std::collections::HashMap;
use std::time::Instant;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use ferry_core::ConversationId;

use crate::errors::TurnError;

/// Where a live turn currently is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnPhase {
    /// Resolving session state and choosing a transport.
    Dispatching,
    /// Consuming the agent's event stream.
    Streaming,
}

struct ActiveTurn {
    cancel: CancellationToken,
    phase: TurnPhase,
    started_at: Instant,
}

/// The set of live turns, at most one per conversation.
#[derive(Default)]
pub struct ActiveTurns {
    inner: Mutex<HashMap<ConversationId, ActiveTurn>>,
}

impl ActiveTurns {
    /// Create an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the conversation for a new turn and hand back its cancel token.
    ///
    /// Fails with [`TurnError::AlreadyRunning`] while another turn is live.
    pub fn begin(&self, conversation: &ConversationId) -> Result<CancellationToken, TurnError> {
        let mut inner = self.inner.lock();
        if inner.contains_key(conversation) {
            debug!(%conversation, "turn rejected, one already live");
            return Err(TurnError::AlreadyRunning);
        }
        let cancel = CancellationToken::new();
        let _ = inner.insert(
            conversation.clone(),
            ActiveTurn {
                cancel: cancel.clone(),
                phase: TurnPhase::Dispatching,
                started_at: Instant::now(),
            },
        );
        metrics::gauge!("ferry_active_turns").increment(1.0);
        Ok(cancel)
    }

    /// Fire the cancel token of a conversation's live turn.
    ///
    /// Returns `false` when the conversation is idle. The claim itself is
    /// released by the turn's own `end` once it unwinds.
    pub fn cancel(&self, conversation: &ConversationId) -> bool {
        match self.inner.lock().get(conversation) {
            Some(turn) => {
                turn.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Release the conversation after its turn reached a terminal state.
    pub fn end(&self, conversation: &ConversationId) {
        if let Some(turn) = self.inner.lock().remove(conversation) {
            metrics::gauge!("ferry_active_turns").decrement(1.0);
            debug!(%conversation, elapsed = ?turn.started_at.elapsed(), "turn released");
        }
    }

    /// Move a conversation's live turn to `phase`.
    pub fn set_phase(&self, conversation: &ConversationId, phase: TurnPhase) {
        if let Some(turn) = self.inner.lock().get_mut(conversation) {
            turn.phase = phase;
        }
    }

    /// The phase of a conversation's live turn, if one is live.
    #[must_use]
    pub fn phase(&self, conversation: &ConversationId) -> Option<TurnPhase> {
        self.inner.lock().get(conversation).map(|turn| turn.phase)
    }

    /// How many turns are live across all conversations.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.inner.lock().len()
    }

    /// Cancel every live turn.
    pub fn shutdown(&self) {
        let inner = self.inner.lock();
        for turn in inner.values() {
            turn.cancel.cancel();
        }
        debug!(turns = inner.len(), "cancelled all live turns");
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
