//! Front-end delivery seam.

use async_trait::async_trait;

use ferry_core::{ConversationId, PermissionDecision, PermissionRequest};

/// Where a conversation's progress and prompts are delivered.
///
/// Implementations edit one status surface in place: each `progress` text
/// replaces the previous one. Final answers and failure notices are not
/// delivered here; they are the `run_turn` return value, sent once by the
/// caller. Delivery failures are the sink's problem to swallow, so a broken
/// front-end never aborts a turn.
#[async_trait]
pub trait ConversationSink: Send + Sync {
    /// Replace the conversation's progress display.
    async fn progress(&self, conversation: &ConversationId, text: &str);

    /// Ask the user to decide a permission request, waiting for the answer.
    async fn permission_prompt(
        &self,
        conversation: &ConversationId,
        request: &PermissionRequest,
    ) -> PermissionDecision;
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
