//! The turn orchestrator.
//!
//! [`TurnOrchestrator::run_turn`] drives one turn end to end: claim the
//! conversation, resolve its session record, pick a transport, stream the
//! agent's events into throttled progress updates, gate permission
//! requests, and write the session id back. Each conversation moves
//! through `DISPATCHING → STREAMING → {completed | failed | cancelled}`,
//! with at most one live turn at a time.
//!
//! The daemon gets one shot; if it dies before producing a single event
//! the same request is retried once through the subprocess runner. After
//! the first event there is no second attempt, so the user never sees a
//! turn restart halfway.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use ferry_agent::{DaemonAvailability, TransportError, TurnTransport};
use ferry_core::{
    AgentEvent, AutonomyLevel, ConversationId, PermissionDecision, PermissionRequest,
    SessionRecord, TurnRequest,
};
use ferry_sessions::SessionRegistry;

use crate::active::{ActiveTurns, TurnPhase};
use crate::errors::{TurnError, TurnResult};
use crate::policy::PermissionPolicy;
use crate::render::{self, ProgressView};
use crate::sink::ConversationSink;
use crate::throttle::UpdateThrottle;

/// Orchestrator tuning.
#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    /// Working directory for conversations without a record yet.
    pub default_working_dir: PathBuf,
    /// Minimum interval between progress updates.
    pub throttle_interval: Duration,
    /// Final answer length cap, in characters.
    pub response_limit_chars: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            default_working_dir: PathBuf::from("."),
            throttle_interval: Duration::from_millis(1500),
            response_limit_chars: 4000,
        }
    }
}

/// What a completed turn produced.
#[derive(Clone, Debug, PartialEq)]
pub struct TurnOutcome {
    /// Final answer text, shaped for display.
    pub text: String,
    /// Agent session the turn ran under, when known.
    pub session_id: Option<String>,
    /// Label of the transport that delivered the turn.
    pub transport: &'static str,
    /// Whether the turn fell back from the daemon to the subprocess path.
    pub fell_back: bool,
}

/// Why one transport attempt died, plus what the retry logic needs to know.
struct AttemptFailure {
    error: TurnError,
    saw_event: bool,
    assigned_session: Option<String>,
}

impl AttemptFailure {
    fn cancelled(saw_event: bool, assigned_session: Option<String>) -> Self {
        Self {
            error: TurnError::Cancelled,
            saw_event,
            assigned_session,
        }
    }

    fn can_fall_back(&self) -> bool {
        if self.saw_event {
            return false;
        }
        matches!(&self.error, TurnError::Transport(e) if e.is_fallback_eligible())
    }
}

/// Drives turns end to end against the two agent transports.
pub struct TurnOrchestrator {
    registry: Arc<SessionRegistry>,
    availability: Arc<dyn DaemonAvailability>,
    daemon: Arc<dyn TurnTransport>,
    process: Arc<dyn TurnTransport>,
    policy: Arc<dyn PermissionPolicy>,
    sink: Arc<dyn ConversationSink>,
    active: ActiveTurns,
    config: RuntimeConfig,
}

impl TurnOrchestrator {
    /// Wire an orchestrator together from its collaborators.
    #[must_use]
    pub fn new(
        registry: Arc<SessionRegistry>,
        availability: Arc<dyn DaemonAvailability>,
        daemon: Arc<dyn TurnTransport>,
        process: Arc<dyn TurnTransport>,
        policy: Arc<dyn PermissionPolicy>,
        sink: Arc<dyn ConversationSink>,
        config: RuntimeConfig,
    ) -> Self {
        Self {
            registry,
            availability,
            daemon,
            process,
            policy,
            sink,
            active: ActiveTurns::new(),
            config,
        }
    }

    /// The session registry this orchestrator reads and writes.
    #[must_use]
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// The phase of a conversation's live turn, if one is live.
    #[must_use]
    pub fn turn_phase(&self, conversation: &ConversationId) -> Option<TurnPhase> {
        self.active.phase(conversation)
    }

    /// How many turns are live right now.
    #[must_use]
    pub fn active_turns(&self) -> usize {
        self.active.active_count()
    }

    /// Cancel a conversation's live turn.
    ///
    /// Returns `false` when the conversation is idle. The running turn
    /// notices at its next suspension point and unwinds with
    /// [`TurnError::Cancelled`].
    pub fn cancel_turn(&self, conversation: &ConversationId) -> bool {
        self.active.cancel(conversation)
    }

    /// Cancel every live turn.
    pub fn shutdown(&self) {
        self.active.shutdown();
    }

    /// Run one turn for a conversation.
    ///
    /// Exactly one final user-visible message exists per call: this return
    /// value on success, or the error's
    /// [`user_message`](TurnError::user_message). Progress updates along the
    /// way go through the sink and are never retracted.
    #[instrument(skip_all, fields(conversation = %conversation))]
    pub async fn run_turn(
        &self,
        conversation: &ConversationId,
        text: &str,
    ) -> TurnResult<TurnOutcome> {
        // 1. Claim the conversation; a live turn rejects immediately.
        let cancel = self.active.begin(conversation)?;

        let result = self.drive_turn(conversation, text, &cancel).await;

        // 9. The claim is released on every exit path.
        self.active.end(conversation);

        let state = match &result {
            Ok(_) => "completed",
            Err(TurnError::Cancelled) => "cancelled",
            Err(_) => "failed",
        };
        metrics::counter!("ferry_turns_total", "state" => state).increment(1);
        match &result {
            Ok(outcome) => {
                info!(
                    transport = outcome.transport,
                    fell_back = outcome.fell_back,
                    "turn completed"
                );
            }
            Err(TurnError::Cancelled) => info!("turn cancelled"),
            Err(e) => warn!(category = e.category(), error = %e, "turn failed"),
        }
        result
    }

    async fn drive_turn(
        &self,
        conversation: &ConversationId,
        text: &str,
        cancel: &CancellationToken,
    ) -> TurnResult<TurnOutcome> {
        // 2. Resolve durable session state.
        let record = self
            .registry
            .get_or_create(conversation, &self.config.default_working_dir)?;

        let request = TurnRequest {
            conversation_id: conversation.clone(),
            text: text.to_owned(),
            session_id: record.session_id.clone(),
            working_dir: record.working_dir.clone(),
            permission_mode: record.autonomy_level,
        };

        // 3. Daemon when its health check answers, else the subprocess
        //    runner directly.
        let result = if self.availability.is_daemon_available().await {
            match self
                .attempt(conversation, &record, &request, cancel, self.daemon.as_ref())
                .await
            {
                Err(failure) if failure.can_fall_back() => {
                    // 6. One retry through the subprocess with the identical
                    //    request. Subprocess failures never retry.
                    warn!(
                        error = %failure.error,
                        "daemon turn died before its first event, retrying via subprocess"
                    );
                    metrics::counter!("ferry_turn_fallbacks_total").increment(1);
                    self.active.set_phase(conversation, TurnPhase::Dispatching);
                    self.attempt(conversation, &record, &request, cancel, self.process.as_ref())
                        .await
                        .map(|outcome| TurnOutcome {
                            fell_back: true,
                            ..outcome
                        })
                }
                other => other,
            }
        } else {
            self.attempt(conversation, &record, &request, cancel, self.process.as_ref())
                .await
        };

        match result {
            Ok(outcome) => Ok(outcome),
            Err(failure) => {
                // 8. A session the agent assigned before the failure is
                //    still worth resuming next turn. Cancellation leaves
                //    the registry untouched.
                if !matches!(failure.error, TurnError::Cancelled) {
                    if let Some(id) = failure
                        .assigned_session
                        .as_deref()
                        .filter(|id| record.session_id.as_deref() != Some(*id))
                    {
                        if let Err(e) = self.registry.assign_session(conversation, id, text) {
                            warn!(error = %e, "failed to persist session assigned before the failure");
                        }
                    }
                }
                Err(failure.error)
            }
        }
    }

    /// Run one attempt over `transport`, streaming events to the sink.
    #[allow(clippy::too_many_lines)]
    #[instrument(skip_all, fields(transport = transport.name()))]
    async fn attempt(
        &self,
        conversation: &ConversationId,
        record: &SessionRecord,
        request: &TurnRequest,
        cancel: &CancellationToken,
        transport: &dyn TurnTransport,
    ) -> Result<TurnOutcome, AttemptFailure> {
        // 4. Dispatch. The daemon creates missing sessions up front, so its
        //    handle already names the session the turn runs under.
        let dispatched = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                return Err(AttemptFailure::cancelled(false, None));
            }
            dispatched = transport.dispatch(request.clone(), cancel.clone()) => dispatched,
        };
        let mut handle = match dispatched {
            Ok(handle) => handle,
            Err(e) => {
                return Err(AttemptFailure {
                    error: e.into(),
                    saw_event: false,
                    assigned_session: None,
                });
            }
        };
        let mut assigned = handle.session_id_hint.take();
        self.active.set_phase(conversation, TurnPhase::Streaming);

        let streaming = record.streaming_enabled;
        let mut view = ProgressView::new(record.session_id.is_some(), record.autonomy_level);
        let mut throttle = UpdateThrottle::new(self.config.throttle_interval);
        let mut answer = String::new();
        let mut autonomy = record.autonomy_level;
        let mut saw_event = false;

        // The status surface exists before the first event arrives.
        if streaming {
            if let Some(update) = throttle.offer(&view.render()) {
                self.sink.progress(conversation, &update).await;
            }
        } else {
            self.sink.progress(conversation, render::THINKING_STATUS).await;
        }

        // 5. Stream until a terminal event, checking cancellation first at
        //    every suspension point.
        loop {
            let polled = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    self.abort_after_cancel(
                        transport,
                        assigned.as_deref().or(request.session_id.as_deref()),
                    )
                    .await;
                    return Err(AttemptFailure::cancelled(saw_event, assigned));
                }
                polled = handle.events.next() => polled,
            };

            let event = match polled {
                // The stream dried up without a terminal event.
                None => {
                    return Err(AttemptFailure {
                        error: TransportError::Interrupted.into(),
                        saw_event,
                        assigned_session: assigned,
                    });
                }
                Some(Err(TransportError::Cancelled)) => {
                    return Err(AttemptFailure::cancelled(saw_event, assigned));
                }
                Some(Err(e)) => {
                    return Err(AttemptFailure {
                        error: e.into(),
                        saw_event,
                        assigned_session: assigned,
                    });
                }
                Some(Ok(event)) => event,
            };

            saw_event = true;
            if let Some(id) = event.session_id() {
                assigned = Some(id.to_owned());
            }

            match event {
                AgentEvent::ToolCallStarted { id, name, detail } => {
                    view.tool_started(&id, &name, detail.as_deref());
                    self.offer_progress(conversation, streaming, &mut throttle, &view)
                        .await;
                }
                AgentEvent::ToolCallOutput { .. } => {
                    // Output chunks are not displayed, but they tick the
                    // throttle so a held render can go out.
                    self.offer_progress(conversation, streaming, &mut throttle, &view)
                        .await;
                }
                AgentEvent::ToolCallFinished { id, ok } => {
                    view.tool_finished(&id, ok);
                    self.offer_progress(conversation, streaming, &mut throttle, &view)
                        .await;
                }
                AgentEvent::AssistantText { text } => {
                    answer.push_str(&text);
                    self.offer_progress(conversation, streaming, &mut throttle, &view)
                        .await;
                }
                AgentEvent::PermissionRequest { id, description } => {
                    // The user decides against a current view of what the
                    // agent is doing.
                    if streaming {
                        if let Some(update) = throttle.flush() {
                            self.sink.progress(conversation, &update).await;
                        }
                    }
                    let permission = PermissionRequest { id, description };
                    let decision = match self.policy.resolve(&permission, autonomy) {
                        Some(decision) => {
                            debug!(request_id = %permission.id, %decision, "permission resolved by policy");
                            decision
                        }
                        None => {
                            tokio::select! {
                                biased;
                                () = cancel.cancelled() => {
                                    self.abort_after_cancel(
                                        transport,
                                        assigned.as_deref().or(request.session_id.as_deref()),
                                    )
                                    .await;
                                    return Err(AttemptFailure::cancelled(saw_event, assigned));
                                }
                                decision = self.sink.permission_prompt(conversation, &permission) => decision,
                            }
                        }
                    };
                    if decision == PermissionDecision::AllowAlways
                        && autonomy != AutonomyLevel::Unsafe
                    {
                        // "Always" holds for the rest of the session, not
                        // just this turn.
                        autonomy = AutonomyLevel::Unsafe;
                        match self
                            .registry
                            .update(conversation, |r| r.autonomy_level = AutonomyLevel::Unsafe)
                        {
                            Ok(_) => info!("autonomy escalated to unsafe"),
                            Err(e) => warn!(error = %e, "failed to persist autonomy escalation"),
                        }
                    }
                    match assigned.as_deref().or(request.session_id.as_deref()) {
                        Some(session_id) => {
                            if let Err(e) = transport
                                .respond_permission(session_id, &permission.id, decision)
                                .await
                            {
                                warn!(error = %e, "failed to relay permission decision");
                            }
                        }
                        None => {
                            debug!(request_id = %permission.id, "no session id to relay the permission decision to");
                        }
                    }
                }
                AgentEvent::TurnComplete { text, .. } => {
                    if streaming {
                        if let Some(update) = throttle.flush() {
                            self.sink.progress(conversation, &update).await;
                        }
                    }
                    let final_text = render::final_answer(
                        text.as_deref(),
                        &answer,
                        self.config.response_limit_chars,
                    );

                    // The session the turn ran under is durable before the
                    // answer is returned. New ids also enter the history.
                    let persisted = match assigned.as_deref() {
                        Some(id) if record.session_id.as_deref() != Some(id) => {
                            self.registry.assign_session(conversation, id, &request.text)
                        }
                        _ => self.registry.update(conversation, |_| {}),
                    };
                    if let Err(e) = persisted {
                        return Err(AttemptFailure {
                            error: e.into(),
                            saw_event: true,
                            assigned_session: assigned,
                        });
                    }

                    return Ok(TurnOutcome {
                        text: final_text,
                        session_id: assigned.or_else(|| record.session_id.clone()),
                        transport: transport.name(),
                        fell_back: false,
                    });
                }
                AgentEvent::TurnError { code, message, .. } => {
                    // A held render still lands before the failure notice.
                    if streaming {
                        if let Some(update) = throttle.flush() {
                            self.sink.progress(conversation, &update).await;
                        }
                    }
                    return Err(AttemptFailure {
                        error: TransportError::Agent { code, message }.into(),
                        saw_event: true,
                        assigned_session: assigned,
                    });
                }
            }
        }
    }

    async fn offer_progress(
        &self,
        conversation: &ConversationId,
        streaming: bool,
        throttle: &mut UpdateThrottle,
        view: &ProgressView,
    ) {
        if !streaming {
            return;
        }
        if let Some(update) = throttle.offer(&view.render()) {
            self.sink.progress(conversation, &update).await;
        }
    }

    async fn abort_after_cancel(&self, transport: &dyn TurnTransport, session_id: Option<&str>) {
        let Some(session_id) = session_id else {
            return;
        };
        if let Err(e) = transport.abort_turn(session_id).await {
            debug!(error = %e, "abort after cancel failed");
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::VecDeque;

    use assert_matches::assert_matches;
    use async_stream::stream;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use tempfile::TempDir;

    use ferry_agent::{AgentEventStream, TransportResult, TurnHandle};

    use crate::policy::AutonomyPolicy;

    // ── scripted doubles ──

    enum DispatchScript {
        Stream {
            hint: Option<&'static str>,
            events: Vec<Result<AgentEvent, TransportError>>,
        },
        Fail(TransportError),
    }

    struct ScriptedTransport {
        label: &'static str,
        script: Mutex<VecDeque<DispatchScript>>,
        requests: Mutex<Vec<TurnRequest>>,
        decisions: Mutex<Vec<(String, String, PermissionDecision)>>,
        aborted: Mutex<Vec<String>>,
    }

    impl ScriptedTransport {
        fn new(label: &'static str, script: Vec<DispatchScript>) -> Arc<Self> {
            Arc::new(Self {
                label,
                script: Mutex::new(script.into()),
                requests: Mutex::new(Vec::new()),
                decisions: Mutex::new(Vec::new()),
                aborted: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl TurnTransport for ScriptedTransport {
        fn name(&self) -> &'static str {
            self.label
        }

        async fn dispatch(
            &self,
            request: TurnRequest,
            _cancel: CancellationToken,
        ) -> TransportResult<TurnHandle> {
            self.requests.lock().push(request);
            match self.script.lock().pop_front() {
                Some(DispatchScript::Stream { hint, events }) => Ok(TurnHandle {
                    session_id_hint: hint.map(str::to_owned),
                    events: Box::pin(futures::stream::iter(events)),
                }),
                Some(DispatchScript::Fail(e)) => Err(e),
                None => Err(TransportError::Unavailable {
                    message: "script exhausted".into(),
                }),
            }
        }

        async fn respond_permission(
            &self,
            session_id: &str,
            request_id: &str,
            decision: PermissionDecision,
        ) -> TransportResult<()> {
            self.decisions
                .lock()
                .push((session_id.to_owned(), request_id.to_owned(), decision));
            Ok(())
        }

        async fn abort_turn(&self, session_id: &str) -> TransportResult<()> {
            self.aborted.lock().push(session_id.to_owned());
            Ok(())
        }
    }

    struct FixedAvailability(bool);

    #[async_trait]
    impl DaemonAvailability for FixedAvailability {
        async fn is_daemon_available(&self) -> bool {
            self.0
        }
    }

    #[derive(Debug, PartialEq)]
    enum SinkEvent {
        Progress(String),
        Prompt(String),
    }

    struct RecordingSink {
        log: Mutex<Vec<SinkEvent>>,
        decision: PermissionDecision,
    }

    impl RecordingSink {
        fn new(decision: PermissionDecision) -> Arc<Self> {
            Arc::new(Self {
                log: Mutex::new(Vec::new()),
                decision,
            })
        }

        fn progress_texts(&self) -> Vec<String> {
            self.log
                .lock()
                .iter()
                .filter_map(|e| match e {
                    SinkEvent::Progress(text) => Some(text.clone()),
                    SinkEvent::Prompt(_) => None,
                })
                .collect()
        }

        fn prompt_count(&self) -> usize {
            self.log
                .lock()
                .iter()
                .filter(|e| matches!(e, SinkEvent::Prompt(_)))
                .count()
        }
    }

    #[async_trait]
    impl ConversationSink for RecordingSink {
        async fn progress(&self, _conversation: &ConversationId, text: &str) {
            self.log.lock().push(SinkEvent::Progress(text.to_owned()));
        }

        async fn permission_prompt(
            &self,
            _conversation: &ConversationId,
            request: &PermissionRequest,
        ) -> PermissionDecision {
            self.log.lock().push(SinkEvent::Prompt(request.id.clone()));
            self.decision
        }
    }

    struct Harness {
        orchestrator: Arc<TurnOrchestrator>,
        registry: Arc<SessionRegistry>,
        daemon: Arc<ScriptedTransport>,
        process: Arc<ScriptedTransport>,
        sink: Arc<RecordingSink>,
        dir: TempDir,
    }

    fn harness(
        daemon_up: bool,
        daemon: Arc<ScriptedTransport>,
        process: Arc<ScriptedTransport>,
        sink: Arc<RecordingSink>,
    ) -> Harness {
        let dir = TempDir::new().unwrap();
        let registry = Arc::new(SessionRegistry::open(dir.path().join("sessions.json")));
        let orchestrator = Arc::new(TurnOrchestrator::new(
            registry.clone(),
            Arc::new(FixedAvailability(daemon_up)),
            daemon.clone(),
            process.clone(),
            Arc::new(AutonomyPolicy),
            sink.clone(),
            RuntimeConfig {
                default_working_dir: dir.path().to_path_buf(),
                ..RuntimeConfig::default()
            },
        ));
        Harness {
            orchestrator,
            registry,
            daemon,
            process,
            sink,
            dir,
        }
    }

    fn conv(s: &str) -> ConversationId {
        ConversationId::from(s)
    }

    fn tool_started(id: &str, name: &str, detail: &str) -> Result<AgentEvent, TransportError> {
        Ok(AgentEvent::ToolCallStarted {
            id: id.into(),
            name: name.into(),
            detail: Some(detail.into()),
        })
    }

    fn tool_finished(id: &str, ok: bool) -> Result<AgentEvent, TransportError> {
        Ok(AgentEvent::ToolCallFinished { id: id.into(), ok })
    }

    fn text(t: &str) -> Result<AgentEvent, TransportError> {
        Ok(AgentEvent::AssistantText { text: t.into() })
    }

    fn permission(id: &str, description: &str) -> Result<AgentEvent, TransportError> {
        Ok(AgentEvent::PermissionRequest {
            id: id.into(),
            description: description.into(),
        })
    }

    fn complete(session_id: Option<&str>, text: Option<&str>) -> Result<AgentEvent, TransportError> {
        Ok(AgentEvent::TurnComplete {
            session_id: session_id.map(Into::into),
            text: text.map(Into::into),
        })
    }

    fn agent_error(message: &str) -> Result<AgentEvent, TransportError> {
        Ok(AgentEvent::TurnError {
            code: None,
            message: message.into(),
            session_id: None,
        })
    }

    // ── completion ──

    #[tokio::test]
    async fn fresh_turn_over_the_daemon_writes_back_the_session() {
        let daemon = ScriptedTransport::new(
            "daemon",
            vec![DispatchScript::Stream {
                hint: Some("ses_new"),
                events: vec![
                    tool_started("tc1", "bash", "echo hello"),
                    tool_finished("tc1", true),
                    text("Hello "),
                    text("world."),
                    complete(Some("ses_new"), None),
                ],
            }],
        );
        let process = ScriptedTransport::new("process", vec![]);
        let sink = RecordingSink::new(PermissionDecision::Deny);
        let h = harness(true, daemon, process, sink);

        let outcome = h
            .orchestrator
            .run_turn(&conv("c1"), "say hello")
            .await
            .unwrap();

        assert_eq!(outcome.text, "Hello world.");
        assert_eq!(outcome.session_id.as_deref(), Some("ses_new"));
        assert_eq!(outcome.transport, "daemon");
        assert!(!outcome.fell_back);
        assert!(h.process.requests.lock().is_empty());

        let record = h.registry.get(&conv("c1")).unwrap();
        assert_eq!(record.session_id.as_deref(), Some("ses_new"));
        let history = h.registry.history(10);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].first_prompt, "say hello");
        assert_eq!(h.orchestrator.active_turns(), 0);
    }

    #[tokio::test]
    async fn terminal_text_wins_over_accumulated_fragments() {
        let daemon = ScriptedTransport::new(
            "daemon",
            vec![DispatchScript::Stream {
                hint: Some("s"),
                events: vec![text("partial"), complete(Some("s"), Some("Final."))],
            }],
        );
        let h = harness(
            true,
            daemon,
            ScriptedTransport::new("process", vec![]),
            RecordingSink::new(PermissionDecision::Deny),
        );

        let outcome = h.orchestrator.run_turn(&conv("c1"), "go").await.unwrap();
        assert_eq!(outcome.text, "Final.");
    }

    #[tokio::test]
    async fn resumed_turn_sends_the_stored_session_id_and_skips_history() {
        let daemon = ScriptedTransport::new(
            "daemon",
            vec![DispatchScript::Stream {
                hint: Some("ses_old"),
                events: vec![complete(Some("ses_old"), Some("hi"))],
            }],
        );
        let h = harness(
            true,
            daemon,
            ScriptedTransport::new("process", vec![]),
            RecordingSink::new(PermissionDecision::Deny),
        );
        let _ = h
            .registry
            .get_or_create(&conv("c1"), h.dir.path())
            .unwrap();
        let _ = h
            .registry
            .update(&conv("c1"), |r| r.session_id = Some("ses_old".into()))
            .unwrap();

        let outcome = h.orchestrator.run_turn(&conv("c1"), "again").await.unwrap();

        assert_eq!(outcome.session_id.as_deref(), Some("ses_old"));
        assert_eq!(
            h.daemon.requests.lock()[0].session_id.as_deref(),
            Some("ses_old")
        );
        // Same session, so no new history entry
        assert!(h.registry.history(10).is_empty());
    }

    #[tokio::test]
    async fn empty_turn_yields_the_placeholder_answer() {
        let daemon = ScriptedTransport::new(
            "daemon",
            vec![DispatchScript::Stream {
                hint: Some("s"),
                events: vec![complete(Some("s"), None)],
            }],
        );
        let h = harness(
            true,
            daemon,
            ScriptedTransport::new("process", vec![]),
            RecordingSink::new(PermissionDecision::Deny),
        );

        let outcome = h.orchestrator.run_turn(&conv("c1"), "go").await.unwrap();
        assert_eq!(outcome.text, "No response from the agent");
    }

    #[tokio::test]
    async fn overlong_answers_are_truncated() {
        let long = "x".repeat(4100);
        let daemon = ScriptedTransport::new(
            "daemon",
            vec![DispatchScript::Stream {
                hint: Some("s"),
                events: vec![complete(Some("s"), Some(&long))],
            }],
        );
        let h = harness(
            true,
            daemon,
            ScriptedTransport::new("process", vec![]),
            RecordingSink::new(PermissionDecision::Deny),
        );

        let outcome = h.orchestrator.run_turn(&conv("c1"), "go").await.unwrap();
        assert!(outcome.text.ends_with("[Response truncated]"));
    }

    // ── transport selection and fallback ──

    #[tokio::test]
    async fn daemon_down_goes_straight_to_the_subprocess() {
        let daemon = ScriptedTransport::new("daemon", vec![]);
        let process = ScriptedTransport::new(
            "process",
            vec![DispatchScript::Stream {
                hint: None,
                events: vec![complete(Some("ses_cli"), Some("ok"))],
            }],
        );
        let h = harness(
            false,
            daemon,
            process,
            RecordingSink::new(PermissionDecision::Deny),
        );

        let outcome = h.orchestrator.run_turn(&conv("c1"), "go").await.unwrap();

        assert_eq!(outcome.transport, "process");
        assert!(!outcome.fell_back);
        assert!(h.daemon.requests.lock().is_empty());
        assert_eq!(h.process.requests.lock().len(), 1);
        assert_eq!(
            h.registry.get(&conv("c1")).unwrap().session_id.as_deref(),
            Some("ses_cli")
        );
    }

    #[tokio::test]
    async fn unavailable_daemon_falls_back_once_with_the_identical_request() {
        let daemon = ScriptedTransport::new(
            "daemon",
            vec![DispatchScript::Fail(TransportError::Unavailable {
                message: "connection refused".into(),
            })],
        );
        let process = ScriptedTransport::new(
            "process",
            vec![DispatchScript::Stream {
                hint: None,
                events: vec![complete(None, Some("ok"))],
            }],
        );
        let h = harness(
            true,
            daemon,
            process,
            RecordingSink::new(PermissionDecision::Deny),
        );
        let _ = h
            .registry
            .get_or_create(&conv("c1"), h.dir.path())
            .unwrap();
        let _ = h
            .registry
            .update(&conv("c1"), |r| r.session_id = Some("ses_old".into()))
            .unwrap();

        let outcome = h.orchestrator.run_turn(&conv("c1"), "go").await.unwrap();

        assert!(outcome.fell_back);
        assert_eq!(outcome.transport, "process");
        assert_eq!(h.daemon.requests.lock().len(), 1);
        assert_eq!(h.process.requests.lock().len(), 1);
        assert_eq!(h.daemon.requests.lock()[0], h.process.requests.lock()[0]);
    }

    #[tokio::test]
    async fn empty_daemon_stream_before_any_event_falls_back() {
        let daemon = ScriptedTransport::new(
            "daemon",
            vec![DispatchScript::Stream {
                hint: Some("ses_x"),
                events: vec![],
            }],
        );
        let process = ScriptedTransport::new(
            "process",
            vec![DispatchScript::Stream {
                hint: None,
                events: vec![complete(None, Some("recovered"))],
            }],
        );
        let h = harness(
            true,
            daemon,
            process,
            RecordingSink::new(PermissionDecision::Deny),
        );

        let outcome = h.orchestrator.run_turn(&conv("c1"), "go").await.unwrap();
        assert!(outcome.fell_back);
        assert_eq!(outcome.text, "recovered");
    }

    #[tokio::test]
    async fn no_fallback_once_an_event_was_seen() {
        let daemon = ScriptedTransport::new(
            "daemon",
            vec![DispatchScript::Stream {
                hint: Some("s"),
                events: vec![
                    tool_started("tc1", "bash", "make"),
                    Err(TransportError::Interrupted),
                ],
            }],
        );
        let h = harness(
            true,
            daemon,
            ScriptedTransport::new("process", vec![]),
            RecordingSink::new(PermissionDecision::Deny),
        );

        let err = h.orchestrator.run_turn(&conv("c1"), "go").await.unwrap_err();

        assert_matches!(err, TurnError::Transport(TransportError::Interrupted));
        assert!(h.process.requests.lock().is_empty());
    }

    #[tokio::test]
    async fn agent_errors_do_not_fall_back() {
        let daemon = ScriptedTransport::new(
            "daemon",
            vec![DispatchScript::Stream {
                hint: None,
                events: vec![agent_error("model overloaded")],
            }],
        );
        let h = harness(
            true,
            daemon,
            ScriptedTransport::new("process", vec![]),
            RecordingSink::new(PermissionDecision::Deny),
        );

        let err = h.orchestrator.run_turn(&conv("c1"), "go").await.unwrap_err();

        assert_matches!(
            err,
            TurnError::Transport(TransportError::Agent { ref message, .. }) if message == "model overloaded"
        );
        assert!(h.process.requests.lock().is_empty());
    }

    #[tokio::test]
    async fn subprocess_failures_never_fall_back() {
        let process = ScriptedTransport::new(
            "process",
            vec![DispatchScript::Fail(TransportError::Unavailable {
                message: "spawn refused".into(),
            })],
        );
        let h = harness(
            false,
            ScriptedTransport::new("daemon", vec![]),
            process,
            RecordingSink::new(PermissionDecision::Deny),
        );

        let err = h.orchestrator.run_turn(&conv("c1"), "go").await.unwrap_err();

        assert_matches!(err, TurnError::Transport(TransportError::Unavailable { .. }));
        assert_eq!(h.process.requests.lock().len(), 1);
        assert!(h.daemon.requests.lock().is_empty());
    }

    #[tokio::test]
    async fn fallback_failure_reports_the_subprocess_error() {
        let daemon = ScriptedTransport::new(
            "daemon",
            vec![DispatchScript::Fail(TransportError::Unavailable {
                message: "refused".into(),
            })],
        );
        let process = ScriptedTransport::new(
            "process",
            vec![DispatchScript::Fail(TransportError::Spawn(
                std::io::Error::other("no such binary"),
            ))],
        );
        let h = harness(
            true,
            daemon,
            process,
            RecordingSink::new(PermissionDecision::Deny),
        );

        let err = h.orchestrator.run_turn(&conv("c1"), "go").await.unwrap_err();

        assert_matches!(err, TurnError::Transport(TransportError::Spawn(_)));
        assert_eq!(h.daemon.requests.lock().len(), 1);
        assert_eq!(h.process.requests.lock().len(), 1);
    }

    // ── failure persistence ──

    #[tokio::test]
    async fn session_assigned_before_a_failure_is_persisted() {
        let daemon = ScriptedTransport::new(
            "daemon",
            vec![DispatchScript::Stream {
                hint: Some("ses_pre"),
                events: vec![tool_started("tc1", "bash", "make"), agent_error("boom")],
            }],
        );
        let h = harness(
            true,
            daemon,
            ScriptedTransport::new("process", vec![]),
            RecordingSink::new(PermissionDecision::Deny),
        );

        let err = h.orchestrator.run_turn(&conv("c1"), "go").await.unwrap_err();

        assert_matches!(err, TurnError::Transport(TransportError::Agent { .. }));
        assert_eq!(
            h.registry.get(&conv("c1")).unwrap().session_id.as_deref(),
            Some("ses_pre")
        );
    }

    #[tokio::test]
    async fn session_observed_on_the_error_event_is_persisted() {
        let daemon = ScriptedTransport::new(
            "daemon",
            vec![DispatchScript::Stream {
                hint: None,
                events: vec![Ok(AgentEvent::TurnError {
                    code: None,
                    message: "broke".into(),
                    session_id: Some("ses_err".into()),
                })],
            }],
        );
        let h = harness(
            true,
            daemon,
            ScriptedTransport::new("process", vec![]),
            RecordingSink::new(PermissionDecision::Deny),
        );

        let _ = h.orchestrator.run_turn(&conv("c1"), "go").await.unwrap_err();

        assert_eq!(
            h.registry.get(&conv("c1")).unwrap().session_id.as_deref(),
            Some("ses_err")
        );
    }

    #[tokio::test]
    async fn failure_without_a_new_assignment_leaves_the_registry_unchanged() {
        let daemon = ScriptedTransport::new(
            "daemon",
            vec![DispatchScript::Stream {
                hint: Some("ses_old"),
                events: vec![agent_error("boom")],
            }],
        );
        let h = harness(
            true,
            daemon,
            ScriptedTransport::new("process", vec![]),
            RecordingSink::new(PermissionDecision::Deny),
        );
        let _ = h
            .registry
            .get_or_create(&conv("c1"), h.dir.path())
            .unwrap();
        let _ = h
            .registry
            .update(&conv("c1"), |r| r.session_id = Some("ses_old".into()))
            .unwrap();

        let _ = h.orchestrator.run_turn(&conv("c1"), "go").await.unwrap_err();

        assert_eq!(
            h.registry.get(&conv("c1")).unwrap().session_id.as_deref(),
            Some("ses_old")
        );
        assert!(h.registry.history(10).is_empty());
    }

    // ── permissions ──

    #[tokio::test]
    async fn permission_prompt_is_preceded_by_a_progress_flush() {
        let daemon = ScriptedTransport::new(
            "daemon",
            vec![DispatchScript::Stream {
                hint: Some("ses_p"),
                events: vec![
                    tool_started("tc1", "bash", "rm -rf target"),
                    permission("perm-1", "Run `rm -rf target`"),
                    text("Removed."),
                    complete(Some("ses_p"), None),
                ],
            }],
        );
        let sink = RecordingSink::new(PermissionDecision::AllowOnce);
        let h = harness(
            true,
            daemon,
            ScriptedTransport::new("process", vec![]),
            sink,
        );

        let outcome = h.orchestrator.run_turn(&conv("c1"), "clean").await.unwrap();

        assert_eq!(outcome.text, "Removed.");
        assert_eq!(
            h.daemon.decisions.lock().as_slice(),
            [(
                "ses_p".to_owned(),
                "perm-1".to_owned(),
                PermissionDecision::AllowOnce
            )]
        );

        let log = h.sink.log.lock();
        let flush_at = log
            .iter()
            .position(|e| matches!(e, SinkEvent::Progress(t) if t.contains("bash: rm -rf target")))
            .expect("tool line flushed");
        let prompt_at = log
            .iter()
            .position(|e| matches!(e, SinkEvent::Prompt(_)))
            .expect("prompt surfaced");
        assert!(flush_at < prompt_at);
    }

    #[tokio::test]
    async fn unsafe_autonomy_resolves_permissions_without_prompting() {
        let daemon = ScriptedTransport::new(
            "daemon",
            vec![DispatchScript::Stream {
                hint: Some("s"),
                events: vec![permission("perm-1", "write a file"), complete(Some("s"), Some("done"))],
            }],
        );
        let sink = RecordingSink::new(PermissionDecision::Deny);
        let h = harness(
            true,
            daemon,
            ScriptedTransport::new("process", vec![]),
            sink,
        );
        let _ = h
            .registry
            .get_or_create(&conv("c1"), h.dir.path())
            .unwrap();
        let _ = h
            .registry
            .update(&conv("c1"), |r| r.autonomy_level = AutonomyLevel::Unsafe)
            .unwrap();

        let outcome = h.orchestrator.run_turn(&conv("c1"), "go").await.unwrap();

        assert_eq!(outcome.text, "done");
        assert_eq!(h.sink.prompt_count(), 0);
        assert_eq!(
            h.daemon.decisions.lock()[0].2,
            PermissionDecision::AllowOnce
        );
    }

    #[tokio::test]
    async fn allow_always_escalates_autonomy_for_the_rest_of_the_session() {
        let daemon = ScriptedTransport::new(
            "daemon",
            vec![DispatchScript::Stream {
                hint: Some("ses_a"),
                events: vec![
                    permission("p1", "first"),
                    permission("p2", "second"),
                    complete(Some("ses_a"), Some("ok")),
                ],
            }],
        );
        let sink = RecordingSink::new(PermissionDecision::AllowAlways);
        let h = harness(
            true,
            daemon,
            ScriptedTransport::new("process", vec![]),
            sink,
        );

        let outcome = h.orchestrator.run_turn(&conv("c1"), "go").await.unwrap();

        assert_eq!(outcome.text, "ok");
        // Only the first request prompts; the second is auto-allowed
        assert_eq!(h.sink.prompt_count(), 1);
        let decisions = h.daemon.decisions.lock();
        assert_eq!(decisions[0].2, PermissionDecision::AllowAlways);
        assert_eq!(decisions[1].2, PermissionDecision::AllowOnce);
        assert_eq!(
            h.registry.get(&conv("c1")).unwrap().autonomy_level,
            AutonomyLevel::Unsafe
        );
    }

    #[tokio::test]
    async fn denied_permission_is_relayed_and_the_stream_continues() {
        let daemon = ScriptedTransport::new(
            "daemon",
            vec![DispatchScript::Stream {
                hint: Some("ses_d"),
                events: vec![
                    permission("p1", "risky thing"),
                    text("Skipped that."),
                    complete(Some("ses_d"), None),
                ],
            }],
        );
        let sink = RecordingSink::new(PermissionDecision::Deny);
        let h = harness(
            true,
            daemon,
            ScriptedTransport::new("process", vec![]),
            sink,
        );

        let outcome = h.orchestrator.run_turn(&conv("c1"), "go").await.unwrap();

        assert_eq!(outcome.text, "Skipped that.");
        assert_eq!(
            h.daemon.decisions.lock().as_slice(),
            [(
                "ses_d".to_owned(),
                "p1".to_owned(),
                PermissionDecision::Deny
            )]
        );
    }

    // ── progress display ──

    #[tokio::test(start_paused = true)]
    async fn progress_is_throttled_to_initial_and_final_renders() {
        let daemon = ScriptedTransport::new(
            "daemon",
            vec![DispatchScript::Stream {
                hint: Some("s"),
                events: vec![
                    tool_started("tc1", "bash", "cargo build"),
                    tool_finished("tc1", true),
                    tool_started("tc2", "read", "/src/lib.rs"),
                    complete(Some("s"), Some("done")),
                ],
            }],
        );
        let sink = RecordingSink::new(PermissionDecision::Deny);
        let h = harness(
            true,
            daemon,
            ScriptedTransport::new("process", vec![]),
            sink,
        );

        let _ = h.orchestrator.run_turn(&conv("c1"), "go").await.unwrap();

        // Everything arrived within one interval: initial status, then the
        // held final render flushed at completion.
        let progress = h.sink.progress_texts();
        assert_eq!(progress.len(), 2);
        assert_eq!(progress[0], "Working...");
        assert!(progress[1].contains("✓ bash: cargo build"));
        assert!(progress[1].contains("⏳ read: /src/lib.rs"));
    }

    #[tokio::test(start_paused = true)]
    async fn agent_failures_flush_the_held_render() {
        let daemon = ScriptedTransport::new(
            "daemon",
            vec![DispatchScript::Stream {
                hint: Some("s"),
                events: vec![
                    tool_started("tc1", "bash", "make"),
                    agent_error("model overloaded"),
                ],
            }],
        );
        let sink = RecordingSink::new(PermissionDecision::Deny);
        let h = harness(
            true,
            daemon,
            ScriptedTransport::new("process", vec![]),
            sink,
        );

        let err = h.orchestrator.run_turn(&conv("c1"), "go").await.unwrap_err();

        assert_matches!(err, TurnError::Transport(TransportError::Agent { .. }));
        // The tool line landed inside one interval; the failing turn still
        // delivers the held render before its notice.
        let progress = h.sink.progress_texts();
        assert_eq!(progress.len(), 2);
        assert_eq!(progress[0], "Working...");
        assert!(progress[1].contains("⏳ bash: make"));
    }

    #[tokio::test]
    async fn disabled_streaming_sends_a_single_thinking_status() {
        let daemon = ScriptedTransport::new(
            "daemon",
            vec![DispatchScript::Stream {
                hint: Some("s"),
                events: vec![
                    tool_started("tc1", "bash", "make"),
                    text("hi"),
                    complete(Some("s"), None),
                ],
            }],
        );
        let sink = RecordingSink::new(PermissionDecision::Deny);
        let h = harness(
            true,
            daemon,
            ScriptedTransport::new("process", vec![]),
            sink,
        );
        let _ = h
            .registry
            .get_or_create(&conv("c1"), h.dir.path())
            .unwrap();
        let _ = h
            .registry
            .update(&conv("c1"), |r| r.streaming_enabled = false)
            .unwrap();

        let outcome = h.orchestrator.run_turn(&conv("c1"), "go").await.unwrap();

        assert_eq!(outcome.text, "hi");
        assert_eq!(h.sink.progress_texts(), ["Thinking..."]);
    }

    // ── concurrency and cancellation ──

    struct HangingTransport;

    #[async_trait]
    impl TurnTransport for HangingTransport {
        fn name(&self) -> &'static str {
            "daemon"
        }

        async fn dispatch(
            &self,
            _request: TurnRequest,
            _cancel: CancellationToken,
        ) -> TransportResult<TurnHandle> {
            let events: AgentEventStream = Box::pin(stream! {
                yield Ok(AgentEvent::AssistantText { text: "started".into() });
                futures::future::pending::<()>().await;
            });
            Ok(TurnHandle {
                session_id_hint: Some("ses_hang".into()),
                events,
            })
        }

        async fn respond_permission(
            &self,
            _session_id: &str,
            _request_id: &str,
            _decision: PermissionDecision,
        ) -> TransportResult<()> {
            Ok(())
        }

        async fn abort_turn(&self, _session_id: &str) -> TransportResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn second_turn_for_the_same_conversation_is_rejected() {
        let dir = TempDir::new().unwrap();
        let registry = Arc::new(SessionRegistry::open(dir.path().join("sessions.json")));
        let orchestrator = Arc::new(TurnOrchestrator::new(
            registry,
            Arc::new(FixedAvailability(true)),
            Arc::new(HangingTransport),
            ScriptedTransport::new("process", vec![]),
            Arc::new(AutonomyPolicy),
            RecordingSink::new(PermissionDecision::Deny),
            RuntimeConfig {
                default_working_dir: dir.path().to_path_buf(),
                ..RuntimeConfig::default()
            },
        ));

        let running = tokio::spawn({
            let orchestrator = orchestrator.clone();
            let id = conv("c1");
            async move { orchestrator.run_turn(&id, "first").await }
        });
        while orchestrator.turn_phase(&conv("c1")) != Some(TurnPhase::Streaming) {
            tokio::task::yield_now().await;
        }

        let err = orchestrator
            .run_turn(&conv("c1"), "second")
            .await
            .unwrap_err();
        assert_matches!(err, TurnError::AlreadyRunning);

        assert!(orchestrator.cancel_turn(&conv("c1")));
        let result = running.await.unwrap();
        assert_matches!(result, Err(TurnError::Cancelled));
        assert_eq!(orchestrator.active_turns(), 0);
    }

    struct SelfCancellingTransport {
        aborted: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TurnTransport for SelfCancellingTransport {
        fn name(&self) -> &'static str {
            "daemon"
        }

        async fn dispatch(
            &self,
            request: TurnRequest,
            cancel: CancellationToken,
        ) -> TransportResult<TurnHandle> {
            let events: AgentEventStream = Box::pin(stream! {
                yield Ok(AgentEvent::ToolCallStarted {
                    id: "tc1".into(),
                    name: "bash".into(),
                    detail: Some("sleep 999".into()),
                });
                cancel.cancel();
                // Keep the stream open; cancellation must win, not EOF
                futures::future::pending::<()>().await;
            });
            Ok(TurnHandle {
                session_id_hint: request.session_id.or_else(|| Some("ses_live".into())),
                events,
            })
        }

        async fn respond_permission(
            &self,
            _session_id: &str,
            _request_id: &str,
            _decision: PermissionDecision,
        ) -> TransportResult<()> {
            Ok(())
        }

        async fn abort_turn(&self, session_id: &str) -> TransportResult<()> {
            self.aborted.lock().push(session_id.to_owned());
            Ok(())
        }
    }

    #[tokio::test]
    async fn cancellation_mid_stream_aborts_and_leaves_the_registry_alone() {
        let transport = Arc::new(SelfCancellingTransport {
            aborted: Mutex::new(Vec::new()),
        });
        let dir = TempDir::new().unwrap();
        let registry = Arc::new(SessionRegistry::open(dir.path().join("sessions.json")));
        let _ = registry.get_or_create(&conv("c1"), dir.path()).unwrap();
        let _ = registry
            .update(&conv("c1"), |r| r.session_id = Some("ses_old".into()))
            .unwrap();
        let sink = RecordingSink::new(PermissionDecision::Deny);
        let orchestrator = TurnOrchestrator::new(
            registry.clone(),
            Arc::new(FixedAvailability(true)),
            transport.clone(),
            ScriptedTransport::new("process", vec![]),
            Arc::new(AutonomyPolicy),
            sink.clone(),
            RuntimeConfig {
                default_working_dir: dir.path().to_path_buf(),
                ..RuntimeConfig::default()
            },
        );

        let err = orchestrator
            .run_turn(&conv("c1"), "long job")
            .await
            .unwrap_err();

        assert_matches!(err, TurnError::Cancelled);
        assert_eq!(transport.aborted.lock().as_slice(), ["ses_old"]);
        assert_eq!(
            registry.get(&conv("c1")).unwrap().session_id.as_deref(),
            Some("ses_old")
        );
        assert!(registry.history(10).is_empty());
        // Progress already delivered stays visible
        assert!(!sink.progress_texts().is_empty());
        assert_eq!(orchestrator.active_turns(), 0);
    }

    struct StallingSink {
        prompted: Mutex<bool>,
    }

    #[async_trait]
    impl ConversationSink for StallingSink {
        async fn progress(&self, _conversation: &ConversationId, _text: &str) {}

        async fn permission_prompt(
            &self,
            _conversation: &ConversationId,
            _request: &PermissionRequest,
        ) -> PermissionDecision {
            *self.prompted.lock() = true;
            futures::future::pending::<PermissionDecision>().await
        }
    }

    #[tokio::test]
    async fn cancellation_lands_while_a_prompt_is_open() {
        let daemon = ScriptedTransport::new(
            "daemon",
            vec![DispatchScript::Stream {
                hint: Some("ses_w"),
                events: vec![permission("p1", "risky"), complete(Some("ses_w"), None)],
            }],
        );
        let sink = Arc::new(StallingSink {
            prompted: Mutex::new(false),
        });
        let dir = TempDir::new().unwrap();
        let registry = Arc::new(SessionRegistry::open(dir.path().join("sessions.json")));
        let orchestrator = Arc::new(TurnOrchestrator::new(
            registry,
            Arc::new(FixedAvailability(true)),
            daemon.clone(),
            ScriptedTransport::new("process", vec![]),
            Arc::new(AutonomyPolicy),
            sink.clone(),
            RuntimeConfig {
                default_working_dir: dir.path().to_path_buf(),
                ..RuntimeConfig::default()
            },
        ));

        let running = tokio::spawn({
            let orchestrator = orchestrator.clone();
            let id = conv("c1");
            async move { orchestrator.run_turn(&id, "go").await }
        });
        while !*sink.prompted.lock() {
            tokio::task::yield_now().await;
        }

        assert!(orchestrator.cancel_turn(&conv("c1")));
        let result = running.await.unwrap();
        assert_matches!(result, Err(TurnError::Cancelled));
        assert_eq!(daemon.aborted.lock().as_slice(), ["ses_w"]);
    }

    #[tokio::test]
    async fn cancel_turn_reports_idle_conversations() {
        let h = harness(
            true,
            ScriptedTransport::new("daemon", vec![]),
            ScriptedTransport::new("process", vec![]),
            RecordingSink::new(PermissionDecision::Deny),
        );
        assert!(!h.orchestrator.cancel_turn(&conv("nobody")));
    }
}
