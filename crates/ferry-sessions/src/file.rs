//! Registry file I/O.
//!
//! The registry persists as one pretty-printed JSON document: a flat map of
//! conversation ID to session record, plus a capped recent-session history.
//! Every mutation rewrites the whole file; the document stays small enough
//! that this is the simplest durable option.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use ferry_core::{ConversationId, SessionHistoryEntry, SessionRecord};

use crate::errors::RegistryError;

/// Current registry file schema version.
const REGISTRY_VERSION: u32 = 1;

/// History keeps at most this many entries, oldest dropped first.
const MAX_HISTORY_ENTRIES: usize = 100;

/// On-disk registry document.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryFile {
    /// Schema version.
    pub version: u32,
    /// One record per conversation.
    #[serde(default)]
    pub sessions: HashMap<ConversationId, SessionRecord>,
    /// Recent sessions, oldest first.
    #[serde(default)]
    pub history: Vec<SessionHistoryEntry>,
    /// When the file was last written (RFC 3339).
    #[serde(default)]
    pub last_updated: String,
}

impl RegistryFile {
    /// Create an empty registry document.
    #[must_use]
    pub fn new() -> Self {
        Self {
            version: REGISTRY_VERSION,
            sessions: HashMap::new(),
            history: Vec::new(),
            last_updated: String::new(),
        }
    }

    /// Append a history entry unless one with the same session ID already
    /// exists, dropping the oldest entries beyond the cap.
    pub fn push_history(&mut self, entry: SessionHistoryEntry) {
        if self.history.iter().any(|e| e.session_id == entry.session_id) {
            return;
        }
        self.history.push(entry);
        if self.history.len() > MAX_HISTORY_ENTRIES {
            let excess = self.history.len() - MAX_HISTORY_ENTRIES;
            let _ = self.history.drain(..excess);
        }
    }
}

impl Default for RegistryFile {
    fn default() -> Self {
        Self::new()
    }
}

/// Load the registry document from file.
///
/// Returns `None` if the file doesn't exist, can't be read, or holds data
/// this version can't use. The caller starts fresh in every `None` case;
/// session records are advisory state, losing them only costs resumption.
pub fn load_registry_file(path: &Path) -> Option<RegistryFile> {
    let data = match std::fs::read_to_string(path) {
        Ok(d) => d,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            tracing::warn!("failed to read registry file: {e}");
            return None;
        }
    };

    match serde_json::from_str::<RegistryFile>(&data) {
        Ok(file) if file.version == REGISTRY_VERSION => Some(file),
        Ok(file) => {
            tracing::warn!("unsupported registry version: {}", file.version);
            None
        }
        Err(e) => {
            tracing::warn!("failed to parse registry file: {e}");
            None
        }
    }
}

/// Save the registry document to file.
///
/// Stamps `last_updated` and creates parent directories if needed. Sets
/// file permissions to 0o600.
pub fn save_registry_file(path: &Path, file: &mut RegistryFile) -> Result<(), RegistryError> {
    file.last_updated = chrono::Utc::now().to_rfc3339();

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(file)?;
    std::fs::write(path, &json)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        let _ = std::fs::set_permissions(path, perms);
    }

    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
