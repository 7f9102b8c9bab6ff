//! # Transport Trait
//!
//! Core abstraction over the two ways of reaching the agent. Both the HTTP
//! daemon client and the one-shot CLI runner implement [`TurnTransport`] to
//! expose a unified streaming interface.
//!
//! The trait returns a boxed [`Stream`] of [`AgentEvent`]s, allowing the
//! orchestrator to process a turn incrementally regardless of which path
//! carried it.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use tokio_util::sync::CancellationToken;

use ferry_core::{AgentEvent, PermissionDecision, TurnRequest};

use crate::errors::{TransportError, TransportResult};

/// Boxed stream of [`AgentEvent`]s returned by [`TurnTransport::dispatch`].
pub type AgentEventStream =
    Pin<Box<dyn Stream<Item = Result<AgentEvent, TransportError>> + Send>>;

/// A dispatched turn: the event stream plus the session it runs under.
///
/// `Debug` is implemented manually because the event stream is an opaque
/// trait object.
pub struct TurnHandle {
    /// Session ID known at dispatch time.
    ///
    /// The daemon path fills this in (creating a session first when the
    /// request carries none); the subprocess path leaves it `None` until a
    /// terminal event names the session.
    pub session_id_hint: Option<String>,
    /// The turn's event stream. Ends at the first terminal event; a stream
    /// that runs out of events beforehand ends with
    /// [`TransportError::Interrupted`].
    pub events: AgentEventStream,
}

impl std::fmt::Debug for TurnHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnHandle")
            .field("session_id_hint", &self.session_id_hint)
            .field("events", &"<AgentEventStream>")
            .finish()
    }
}

/// One way of running a turn against the agent.
///
/// Implementors must be `Send + Sync` for use across async tasks. The
/// orchestrator treats both transports identically once dispatch succeeds;
/// only the failure and cancellation paths differ.
#[async_trait]
pub trait TurnTransport: Send + Sync {
    /// Transport identifier for logs and metrics (`"daemon"`, `"process"`).
    fn name(&self) -> &'static str;

    /// Start one turn and return its event stream.
    ///
    /// The token is the turn's cancellation signal; transports that own a
    /// child process watch it directly, while the daemon path is cancelled
    /// via [`abort_turn`](TurnTransport::abort_turn).
    async fn dispatch(
        &self,
        request: TurnRequest,
        cancel: CancellationToken,
    ) -> TransportResult<TurnHandle>;

    /// Answer an in-stream permission request.
    async fn respond_permission(
        &self,
        session_id: &str,
        request_id: &str,
        decision: PermissionDecision,
    ) -> TransportResult<()>;

    /// Ask the agent to stop the session's in-flight turn. Best effort.
    async fn abort_turn(&self, session_id: &str) -> TransportResult<()>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
