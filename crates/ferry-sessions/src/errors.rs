//! Registry error types.

use ferry_core::ConversationId;
use thiserror::Error;

/// Errors that can occur when reading or mutating the session registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Failed to access the registry file on disk.
    #[error("failed to access registry file: {0}")]
    Io(#[from] std::io::Error),
    /// Registry data could not be serialized or parsed.
    #[error("registry data corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
    /// No record exists for the conversation.
    #[error("no session record for conversation `{0}`")]
    UnknownConversation(ConversationId),
}

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_display() {
        let err = RegistryError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        assert!(err.to_string().contains("registry file"));
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn unknown_conversation_display() {
        let err = RegistryError::UnknownConversation(ConversationId::from("chat-9"));
        assert_eq!(
            err.to_string(),
            "no session record for conversation `chat-9`"
        );
    }

    #[test]
    fn corrupt_from_serde_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{bad}").unwrap_err();
        let err: RegistryError = json_err.into();
        assert!(matches!(err, RegistryError::Corrupt(_)));
    }
}
