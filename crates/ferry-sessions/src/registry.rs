//! The session registry.
//!
//! [`SessionRegistry`] owns every [`SessionRecord`]: an in-memory map
//! mirrored to one JSON file. The interior lock spans each
//! read-modify-write-persist cycle, so mutations are atomic per call and
//! the file never lags the map.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, info};

use ferry_core::{ConversationId, SessionHistoryEntry, SessionRecord};

use crate::errors::{RegistryError, Result};
use crate::file::{RegistryFile, load_registry_file, save_registry_file};

/// Durable per-conversation session state.
///
/// A missing or unreadable file opens as an empty registry; session records
/// only cost resumption when lost, so corruption is never fatal.
pub struct SessionRegistry {
    path: PathBuf,
    inner: Mutex<RegistryFile>,
}

impl SessionRegistry {
    /// Open the registry at `path`, loading existing records if present.
    #[must_use]
    pub fn open(path: PathBuf) -> Self {
        let file = load_registry_file(&path).unwrap_or_default();
        debug!(
            path = %path.display(),
            sessions = file.sessions.len(),
            "opened session registry"
        );
        Self {
            path,
            inner: Mutex::new(file),
        }
    }

    /// The registry file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the record for a conversation, if one exists.
    #[must_use]
    pub fn get(&self, conversation: &ConversationId) -> Option<SessionRecord> {
        self.inner.lock().sessions.get(conversation).cloned()
    }

    /// Get the record for a conversation, creating and persisting a fresh
    /// one rooted at `default_working_dir` if none exists.
    pub fn get_or_create(
        &self,
        conversation: &ConversationId,
        default_working_dir: &Path,
    ) -> Result<SessionRecord> {
        let mut inner = self.inner.lock();
        if let Some(record) = inner.sessions.get(conversation) {
            return Ok(record.clone());
        }

        let record = SessionRecord::new(default_working_dir);
        let _ = inner
            .sessions
            .insert(conversation.clone(), record.clone());
        save_registry_file(&self.path, &mut inner)?;
        info!(%conversation, working_dir = %record.working_dir.display(), "created session record");
        Ok(record)
    }

    /// Mutate a conversation's record and persist the result.
    ///
    /// The `updated_at` stamp is refreshed after `mutate` runs.
    pub fn update(
        &self,
        conversation: &ConversationId,
        mutate: impl FnOnce(&mut SessionRecord),
    ) -> Result<SessionRecord> {
        let mut inner = self.inner.lock();
        let record = inner
            .sessions
            .get_mut(conversation)
            .ok_or_else(|| RegistryError::UnknownConversation(conversation.clone()))?;
        mutate(record);
        record.touch();
        let record = record.clone();
        save_registry_file(&self.path, &mut inner)?;
        Ok(record)
    }

    /// Replace a conversation's record with a fresh one rooted at
    /// `working_dir`.
    ///
    /// The next turn starts a new agent session; autonomy returns to its
    /// default.
    pub fn reset(
        &self,
        conversation: &ConversationId,
        working_dir: PathBuf,
    ) -> Result<SessionRecord> {
        let mut inner = self.inner.lock();
        let record = SessionRecord::new(working_dir);
        let _ = inner
            .sessions
            .insert(conversation.clone(), record.clone());
        save_registry_file(&self.path, &mut inner)?;
        info!(%conversation, working_dir = %record.working_dir.display(), "reset session record");
        Ok(record)
    }

    /// Record an agent-assigned session ID for a conversation.
    ///
    /// Writes the ID into the record and, when the ID is new, appends a
    /// history entry previewing `first_prompt`. One persisted write covers
    /// both.
    pub fn assign_session(
        &self,
        conversation: &ConversationId,
        session_id: &str,
        first_prompt: &str,
    ) -> Result<SessionRecord> {
        let mut inner = self.inner.lock();
        let record = inner
            .sessions
            .get_mut(conversation)
            .ok_or_else(|| RegistryError::UnknownConversation(conversation.clone()))?;
        record.session_id = Some(session_id.to_owned());
        record.touch();
        let record = record.clone();
        inner.push_history(SessionHistoryEntry::new(
            session_id,
            record.working_dir.clone(),
            first_prompt,
        ));
        save_registry_file(&self.path, &mut inner)?;
        debug!(%conversation, session_id, "assigned agent session");
        Ok(record)
    }

    /// Conversations and their records, most recently updated first.
    #[must_use]
    pub fn list_recent(&self, limit: usize) -> Vec<(ConversationId, SessionRecord)> {
        let inner = self.inner.lock();
        let mut entries: Vec<_> = inner
            .sessions
            .iter()
            .map(|(id, record)| (id.clone(), record.clone()))
            .collect();
        entries.sort_by(|a, b| b.1.updated_at.cmp(&a.1.updated_at));
        entries.truncate(limit);
        entries
    }

    /// Recent-session history, most recent first.
    #[must_use]
    pub fn history(&self, limit: usize) -> Vec<SessionHistoryEntry> {
        let inner = self.inner.lock();
        inner.history.iter().rev().take(limit).cloned().collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
