//! HTTP client for the long-running agent daemon.
//!
//! Speaks the daemon's small session API: create a session, stream a turn as
//! ND-JSON, answer permission requests, and abort in-flight turns. All
//! failures are mapped onto [`TransportError`] so the orchestrator can decide
//! whether the subprocess path should take over.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, instrument};

use ferry_core::{AutonomyLevel, PermissionDecision, TurnRequest};

use crate::errors::{TransportError, TransportResult};
use crate::jsonl::decode_event_stream;
use crate::transport::{AgentEventStream, TurnHandle, TurnTransport};

/// Default daemon base URL.
const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080";

/// Timeout for the short, non-streaming daemon requests.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Daemon client configuration.
#[derive(Clone, Debug)]
pub struct DaemonConfig {
    /// Base URL of the daemon, without a trailing slash.
    pub base_url: String,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
        }
    }
}

/// Client for the agent daemon's session API.
pub struct DaemonClient {
    /// Configuration.
    config: DaemonConfig,
    /// HTTP client.
    client: reqwest::Client,
}

/// Response body of `POST /session`.
#[derive(Debug, Deserialize)]
struct CreateSessionResponse {
    id: String,
}

impl DaemonClient {
    /// Create a new daemon client.
    #[must_use]
    pub fn new(config: DaemonConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// Create a new daemon client with a shared HTTP client.
    #[must_use]
    pub fn with_client(config: DaemonConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    /// Base URL this client talks to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Create a fresh agent session rooted in `working_dir`.
    ///
    /// Returns the agent-assigned session ID.
    pub async fn create_session(&self, working_dir: &std::path::Path) -> TransportResult<String> {
        let url = format!("{}/session", self.config.base_url);
        let body = serde_json::json!({ "workingDir": working_dir.display().to_string() });

        let response = self
            .client
            .post(&url)
            .timeout(REQUEST_TIMEOUT)
            .json(&body)
            .send()
            .await
            .map_err(map_request_error)?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let created: CreateSessionResponse =
            response.json().await.map_err(map_request_error)?;
        debug!(session_id = %created.id, working_dir = %working_dir.display(), "created agent session");
        Ok(created.id)
    }

    /// Send one turn and return its decoded event stream.
    ///
    /// The response body is ND-JSON, one event per line, consumed
    /// incrementally. The returned stream ends at the first terminal event;
    /// a connection that drops beforehand ends the stream with
    /// [`TransportError::Interrupted`].
    #[instrument(skip_all, fields(session_id = %session_id))]
    pub async fn send_turn(
        &self,
        session_id: &str,
        text: &str,
        permission_mode: AutonomyLevel,
    ) -> TransportResult<AgentEventStream> {
        let url = format!("{}/session/{session_id}/message", self.config.base_url);
        let body = serde_json::json!({
            "text": text,
            "permissionMode": permission_mode.as_str(),
        });

        debug!(permission_mode = %permission_mode, "dispatching turn to daemon");

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(map_request_error)?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let byte_stream = Box::pin(
            response
                .bytes_stream()
                .map(|chunk| chunk.map_err(std::io::Error::other)),
        );
        Ok(decode_event_stream(byte_stream))
    }
}

#[async_trait]
impl TurnTransport for DaemonClient {
    fn name(&self) -> &'static str {
        "daemon"
    }

    async fn dispatch(
        &self,
        request: TurnRequest,
        _cancel: CancellationToken,
    ) -> TransportResult<TurnHandle> {
        // Sessions are created eagerly so the ID is known before the first
        // event; a failure later in the turn can then still be tied to it.
        let session_id = match &request.session_id {
            Some(id) => id.clone(),
            None => self.create_session(&request.working_dir).await?,
        };

        let events = self
            .send_turn(&session_id, &request.text, request.permission_mode)
            .await?;

        Ok(TurnHandle {
            session_id_hint: Some(session_id),
            events,
        })
    }

    async fn respond_permission(
        &self,
        session_id: &str,
        request_id: &str,
        decision: PermissionDecision,
    ) -> TransportResult<()> {
        let url = format!(
            "{}/session/{session_id}/permission/{request_id}",
            self.config.base_url
        );
        let body = serde_json::json!({ "decision": decision.as_str() });

        let response = self
            .client
            .post(&url)
            .timeout(REQUEST_TIMEOUT)
            .json(&body)
            .send()
            .await
            .map_err(map_request_error)?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        debug!(session_id, request_id, decision = %decision, "relayed permission decision");
        Ok(())
    }

    async fn abort_turn(&self, session_id: &str) -> TransportResult<()> {
        let url = format!("{}/session/{session_id}/abort", self.config.base_url);

        let response = self
            .client
            .post(&url)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(map_request_error)?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        debug!(session_id, "abort requested");
        Ok(())
    }
}

/// Map a request-phase `reqwest` error onto the transport vocabulary.
///
/// Connect failures and timeouts mean the daemon is not reachable; anything
/// else happened after the daemon answered and is treated as an agent error.
fn map_request_error(e: reqwest::Error) -> TransportError {
    if e.is_connect() || e.is_timeout() {
        TransportError::Unavailable {
            message: e.to_string(),
        }
    } else {
        TransportError::Agent {
            code: None,
            message: e.to_string(),
        }
    }
}

/// Build a [`TransportError::Agent`] from a non-success daemon response.
async fn error_from_response(response: reqwest::Response) -> TransportError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let (code, message) = parse_agent_error(&body, status.as_u16());
    error!(
        status = status.as_u16(),
        code = code.as_deref().unwrap_or("unknown"),
        "daemon request failed"
    );
    TransportError::Agent { code, message }
}

/// Parse an error response body.
fn parse_agent_error(body: &str, status: u16) -> (Option<String>, String) {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        let error = &json["error"];
        let message = error["message"]
            .as_str()
            .unwrap_or("Unknown error")
            .to_string();
        let code = error["code"].as_str().map(String::from);
        (code, message)
    } else {
        (None, format!("HTTP {status}: {body}"))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
