//! In-memory chat state mirrored to a snapshot store
//!
//! `SessionStore` owns the active transcript, the session-summary list and
//! the active session id. Every mutation writes the full current value of
//! the collections it touched before returning, so memory and storage never
//! drift apart.

use super::types::{truncate_chars, ChatSession, Message, Role, DEFAULT_SESSION_TITLE};
use crate::config::SessionsConfig;
use crate::error::{MiraError, Result};
use crate::storage::{
    transcript_slot, SnapshotStore, ACTIVE_SESSION_SLOT, MESSAGES_SLOT, SESSIONS_SLOT,
};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashSet;
use ulid::Ulid;

/// Id of the session that is active before any "new chat"
pub const DEFAULT_SESSION_ID: &str = "default";

/// Generate a fresh, process-unique session id
///
/// # Examples
///
/// ```
/// use mira::session::generate_session_id;
///
/// let a = generate_session_id();
/// let b = generate_session_id();
/// assert!(a.starts_with("chat_"));
/// assert_ne!(a, b);
/// ```
pub fn generate_session_id() -> String {
    format!("chat_{}", Ulid::new())
}

/// Authoritative conversation state
pub struct SessionStore {
    repo: Box<dyn SnapshotStore>,
    limits: SessionsConfig,
    active_id: String,
    messages: Vec<Message>,
    sessions: Vec<ChatSession>,
    epoch: u64,
}

impl SessionStore {
    /// Build a store from whatever the repository holds
    ///
    /// Missing slots start empty. Unreadable or malformed slots are logged
    /// and discarded; loading never fails.
    pub fn load(repo: Box<dyn SnapshotStore>, limits: SessionsConfig) -> Self {
        let mut store = Self {
            repo,
            limits,
            active_id: DEFAULT_SESSION_ID.to_string(),
            messages: Vec::new(),
            sessions: Vec::new(),
            epoch: 0,
        };

        store.messages = store.read_slot(MESSAGES_SLOT).unwrap_or_default();
        store.sessions = store
            .read_slot::<Vec<ChatSession>>(SESSIONS_SLOT)
            .map(|sessions| normalize_sessions(sessions, store.limits.max_sessions))
            .unwrap_or_default();
        if let Some(id) = store
            .read_slot::<String>(ACTIVE_SESSION_SLOT)
            .filter(|id| !id.trim().is_empty())
        {
            store.active_id = id;
        }

        tracing::debug!(
            active_session = %store.active_id,
            messages = store.messages.len(),
            sessions = store.sessions.len(),
            "Loaded chat state"
        );
        store
    }

    /// Messages of the active conversation, oldest first
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Session summaries, most recently updated first
    pub fn sessions(&self) -> &[ChatSession] {
        &self.sessions
    }

    pub fn active_session_id(&self) -> &str {
        &self.active_id
    }

    /// Counter bumped whenever the active transcript is reset or replaced
    ///
    /// A caller that captured the epoch before an async operation can tell
    /// whether the conversation it was working on still exists.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Append one message to the active conversation
    ///
    /// Persists the message list and refreshes the session summary. If the
    /// message list cannot be written the message is not kept.
    pub fn append(&mut self, message: Message) -> Result<()> {
        self.messages.push(message);
        if let Err(e) = self.write_slot(MESSAGES_SLOT, &self.messages) {
            self.messages.pop();
            return Err(e);
        }
        self.recompute_summary()
    }

    /// Deliver `reply` to the conversation that asked `question`
    ///
    /// The reply is appended only if the conversation `session_id` still
    /// ends with `question`, whether it is the active one or an archived
    /// transcript. Returns `false` when the conversation was cleared or
    /// evicted in the meantime and the reply was dropped.
    pub fn append_reply(
        &mut self,
        session_id: &str,
        question: &Message,
        reply: Message,
    ) -> Result<bool> {
        if session_id == self.active_id {
            if self.messages.last() != Some(question) {
                return Ok(false);
            }
            self.append(reply)?;
            return Ok(true);
        }

        if !self.sessions.iter().any(|s| s.id == session_id) {
            return Ok(false);
        }
        let slot = transcript_slot(session_id);
        let mut transcript: Vec<Message> = self.read_slot(&slot).unwrap_or_default();
        if transcript.last() != Some(question) {
            return Ok(false);
        }

        transcript.push(reply);
        self.write_slot(&slot, &transcript)?;
        tracing::debug!(session = %session_id, "Delivered reply to archived session");
        self.upsert_summary(session_id, &transcript)?;
        Ok(true)
    }

    /// Empty the active conversation and drop its persisted transcript
    ///
    /// Session summaries are left untouched.
    pub fn clear(&mut self) -> Result<()> {
        self.repo.remove(MESSAGES_SLOT)?;
        self.messages.clear();
        self.epoch += 1;
        tracing::info!(session = %self.active_id, "Cleared active conversation");
        Ok(())
    }

    /// Rebuild the summary of the active session and move it to the front
    ///
    /// Does nothing while the conversation is empty.
    pub fn recompute_summary(&mut self) -> Result<()> {
        let id = self.active_id.clone();
        let messages = std::mem::take(&mut self.messages);
        let result = self.upsert_summary(&id, &messages);
        self.messages = messages;
        result
    }

    /// Leave the active session and start an empty one
    ///
    /// The transcript being left is archived under its id so it can be
    /// reopened with [`SessionStore::load_session`]; its summary stays in
    /// the session list. Returns the new session id.
    pub fn start_new_session(&mut self) -> Result<String> {
        self.archive_active()?;

        let id = generate_session_id();
        self.write_slot(ACTIVE_SESSION_SLOT, &id)?;
        if let Err(e) = self.repo.remove(MESSAGES_SLOT) {
            if let Err(restore) = self.write_slot(ACTIVE_SESSION_SLOT, &self.active_id) {
                tracing::error!("Failed to restore active session id: {:#}", restore);
            }
            return Err(e);
        }

        self.messages.clear();
        self.epoch += 1;
        self.active_id = id;
        tracing::info!(session = %self.active_id, "Started new session");
        Ok(self.active_id.clone())
    }

    /// Make a past session active and restore its archived transcript
    ///
    /// # Errors
    ///
    /// Returns [`MiraError::SessionNotFound`] when `id` is not in the
    /// session list.
    pub fn load_session(&mut self, id: &str) -> Result<()> {
        if id == self.active_id {
            return Ok(());
        }
        if !self.sessions.iter().any(|s| s.id == id) {
            return Err(MiraError::SessionNotFound(id.to_string()).into());
        }

        self.archive_active()?;

        let slot = transcript_slot(id);
        let restored: Vec<Message> = self.read_slot(&slot).unwrap_or_default();
        self.write_slot(MESSAGES_SLOT, &restored)?;
        if let Err(e) = self.write_slot(ACTIVE_SESSION_SLOT, id) {
            if let Err(restore) = self.write_slot(MESSAGES_SLOT, &self.messages) {
                tracing::error!("Failed to restore active transcript: {:#}", restore);
            }
            return Err(e);
        }

        self.messages = restored;
        self.epoch += 1;
        self.active_id = id.to_string();
        if let Err(e) = self.repo.remove(&slot) {
            tracing::warn!(session = %id, "Failed to drop restored archive: {:#}", e);
        }

        tracing::info!(
            session = %self.active_id,
            messages = self.messages.len(),
            "Switched session"
        );
        Ok(())
    }

    /// Sessions whose title or preview contains `query`, ignoring case
    ///
    /// A blank query matches every session.
    pub fn search_sessions(&self, query: &str) -> Vec<&ChatSession> {
        let needle = query.trim().to_lowercase();
        self.sessions
            .iter()
            .filter(|s| {
                needle.is_empty()
                    || s.title.to_lowercase().contains(&needle)
                    || s.preview.to_lowercase().contains(&needle)
            })
            .collect()
    }

    /// Replace the summary of `id` with one built from `messages`
    ///
    /// The list is written before it replaces the in-memory one; archives of
    /// sessions pushed past the cap are dropped afterwards.
    fn upsert_summary(&mut self, id: &str, messages: &[Message]) -> Result<()> {
        if messages.is_empty() {
            return Ok(());
        }

        let title = messages
            .iter()
            .find(|m| m.role == Role::User)
            .map(|m| truncate_chars(&m.content, self.limits.title_chars))
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_SESSION_TITLE.to_string());
        let preview = messages
            .last()
            .map(|m| truncate_chars(&m.content, self.limits.preview_chars))
            .unwrap_or_default();

        let mut sessions: Vec<ChatSession> = self
            .sessions
            .iter()
            .filter(|s| s.id != id)
            .cloned()
            .collect();
        sessions.insert(
            0,
            ChatSession {
                id: id.to_string(),
                title,
                preview,
                timestamp: Utc::now(),
            },
        );
        let evicted = if sessions.len() > self.limits.max_sessions {
            sessions.split_off(self.limits.max_sessions)
        } else {
            Vec::new()
        };

        self.write_slot(SESSIONS_SLOT, &sessions)?;
        self.sessions = sessions;

        for session in evicted {
            tracing::debug!(session = %session.id, "Evicting session beyond cap");
            if let Err(e) = self.repo.remove(&transcript_slot(&session.id)) {
                tracing::warn!(
                    session = %session.id,
                    "Failed to drop archived transcript: {}",
                    e
                );
            }
        }
        Ok(())
    }

    fn archive_active(&mut self) -> Result<()> {
        let slot = transcript_slot(&self.active_id);
        if self.messages.is_empty() {
            self.repo.remove(&slot)
        } else {
            self.write_slot(&slot, &self.messages)
        }
    }

    fn read_slot<T: DeserializeOwned>(&self, slot: &str) -> Option<T> {
        match self.repo.load(slot) {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!(slot = slot, "Discarding malformed persisted state: {}", e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(slot = slot, "Failed to read persisted state: {}", e);
                None
            }
        }
    }

    fn write_slot<T: Serialize + ?Sized>(&self, slot: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string(value).map_err(MiraError::Serialization)?;
        self.repo.save(slot, &json)
    }
}

/// Enforce the list invariants on data read back from storage
fn normalize_sessions(sessions: Vec<ChatSession>, cap: usize) -> Vec<ChatSession> {
    let mut seen = HashSet::new();
    let mut sessions: Vec<ChatSession> = sessions
        .into_iter()
        .filter(|s| seen.insert(s.id.clone()))
        .collect();
    sessions.truncate(cap);
    sessions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::types::{Source, SourceType};
    use crate::storage::MemoryStorage;
    use std::sync::{Arc, Mutex};

    /// Memory storage whose writes to selected slots fail
    #[derive(Clone, Default)]
    struct FailingStorage {
        inner: MemoryStorage,
        failing: Arc<Mutex<Vec<String>>>,
    }

    impl FailingStorage {
        fn fail_on(&self, slot: &str) {
            self.failing.lock().unwrap().push(slot.to_string());
        }

        fn check(&self, slot: &str) -> Result<()> {
            if self.failing.lock().unwrap().iter().any(|s| s == slot) {
                return Err(MiraError::Storage(format!("disk full writing {}", slot)).into());
            }
            Ok(())
        }
    }

    impl SnapshotStore for FailingStorage {
        fn load(&self, slot: &str) -> Result<Option<String>> {
            self.inner.load(slot)
        }

        fn save(&self, slot: &str, value: &str) -> Result<()> {
            self.check(slot)?;
            self.inner.save(slot, value)
        }

        fn remove(&self, slot: &str) -> Result<()> {
            self.check(slot)?;
            self.inner.remove(slot)
        }
    }

    fn failing_store() -> (SessionStore, FailingStorage) {
        let repo = FailingStorage::default();
        let store = SessionStore::load(Box::new(repo.clone()), SessionsConfig::default());
        (store, repo)
    }

    /// A fresh load from storage must see exactly what is in memory
    fn assert_converged(store: &SessionStore, repo: &FailingStorage) {
        let reloaded = SessionStore::load(Box::new(repo.inner.clone()), SessionsConfig::default());
        assert_eq!(reloaded.messages(), store.messages());
        assert_eq!(reloaded.sessions(), store.sessions());
        assert_eq!(reloaded.active_session_id(), store.active_session_id());
    }

    fn store_with(repo: &MemoryStorage) -> SessionStore {
        SessionStore::load(Box::new(repo.clone()), SessionsConfig::default())
    }

    fn persisted<T: DeserializeOwned>(repo: &MemoryStorage, slot: &str) -> Option<T> {
        repo.load(slot)
            .unwrap()
            .map(|raw| serde_json::from_str(&raw).unwrap())
    }

    #[test]
    fn test_load_empty_repository() {
        let repo = MemoryStorage::new();
        let store = store_with(&repo);
        assert!(store.messages().is_empty());
        assert!(store.sessions().is_empty());
        assert_eq!(store.active_session_id(), DEFAULT_SESSION_ID);
        assert_eq!(store.epoch(), 0);
    }

    #[test]
    fn test_load_discards_malformed_state() {
        let repo = MemoryStorage::new();
        repo.save(MESSAGES_SLOT, "{not json").unwrap();
        repo.save(SESSIONS_SLOT, r#"[{"id": 1}]"#).unwrap();
        repo.save(ACTIVE_SESSION_SLOT, "42").unwrap();

        let store = store_with(&repo);
        assert!(store.messages().is_empty());
        assert!(store.sessions().is_empty());
        assert_eq!(store.active_session_id(), DEFAULT_SESSION_ID);
    }

    #[test]
    fn test_append_persists_messages_and_summary() {
        let repo = MemoryStorage::new();
        let mut store = store_with(&repo);

        store.append(Message::user("What is a data warehouse?")).unwrap();

        let messages: Vec<Message> = persisted(&repo, MESSAGES_SLOT).unwrap();
        assert_eq!(messages, store.messages().to_vec());

        let sessions: Vec<ChatSession> = persisted(&repo, SESSIONS_SLOT).unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].id, DEFAULT_SESSION_ID);
        assert_eq!(sessions[0].title, "What is a data warehouse?");
        assert_eq!(sessions[0].preview, "What is a data warehouse?");
    }

    #[test]
    fn test_messages_round_trip_through_storage() {
        let repo = MemoryStorage::new();
        let mut store = store_with(&repo);

        let mut source = Source::new("Warehouses store integrated data.");
        source.title = Some("DW Guide".to_string());
        source.relevance = Some(0.87);
        source.relevance_score = Some("87%".to_string());

        store.append(Message::user("What is a data warehouse?")).unwrap();
        store
            .append(Message::answer(
                "A data warehouse is...",
                Some(SourceType::KnowledgeBase),
                vec![source],
            ))
            .unwrap();
        store.append(Message::fallback()).unwrap();

        let reloaded = store_with(&repo);
        assert_eq!(reloaded.messages(), store.messages());
        assert_eq!(reloaded.sessions(), store.sessions());
    }

    #[test]
    fn test_summary_title_and_preview_are_truncated() {
        let repo = MemoryStorage::new();
        let mut store = store_with(&repo);

        let question = "q".repeat(80);
        let answer = "a".repeat(150);
        store.append(Message::user(question)).unwrap();
        store.append(Message::assistant(answer)).unwrap();

        let summary = &store.sessions()[0];
        assert_eq!(summary.title, "q".repeat(50));
        assert_eq!(summary.preview, "a".repeat(100));
    }

    #[test]
    fn test_summary_uses_default_title_without_user_message() {
        let repo = MemoryStorage::new();
        let mut store = store_with(&repo);
        store.append(Message::assistant("Welcome back")).unwrap();
        assert_eq!(store.sessions()[0].title, DEFAULT_SESSION_TITLE);
        assert_eq!(store.sessions()[0].preview, "Welcome back");
    }

    #[test]
    fn test_recompute_summary_on_empty_conversation_is_noop() {
        let repo = MemoryStorage::new();
        let mut store = store_with(&repo);
        store.recompute_summary().unwrap();
        assert!(store.sessions().is_empty());
        assert!(repo.load(SESSIONS_SLOT).unwrap().is_none());
    }

    #[test]
    fn test_session_list_is_unique_by_id() {
        let repo = MemoryStorage::new();
        let mut store = store_with(&repo);
        store.append(Message::user("one")).unwrap();
        store.append(Message::assistant("two")).unwrap();
        store.append(Message::user("three")).unwrap();

        assert_eq!(store.sessions().len(), 1);
        assert_eq!(store.sessions()[0].title, "one");
        assert_eq!(store.sessions()[0].preview, "three");
    }

    #[test]
    fn test_session_list_capped_newest_first() {
        let repo = MemoryStorage::new();
        let mut store = store_with(&repo);

        let mut ids = Vec::new();
        for i in 0..25 {
            store.append(Message::user(format!("question {}", i))).unwrap();
            ids.push(store.active_session_id().to_string());
            store.start_new_session().unwrap();
        }

        let sessions = store.sessions();
        assert_eq!(sessions.len(), 20);
        let expected: Vec<&String> = ids.iter().rev().take(20).collect();
        let actual: Vec<&String> = sessions.iter().map(|s| &s.id).collect();
        assert_eq!(actual, expected);

        // Transcripts of evicted sessions are dropped with them
        for evicted in ids.iter().take(5) {
            assert!(repo.load(&transcript_slot(evicted)).unwrap().is_none());
        }
        assert!(repo.load(&transcript_slot(&ids[24])).unwrap().is_some());

        let persisted_sessions: Vec<ChatSession> = persisted(&repo, SESSIONS_SLOT).unwrap();
        assert_eq!(persisted_sessions.len(), 20);
    }

    #[test]
    fn test_clear_keeps_other_session_summaries() {
        let repo = MemoryStorage::new();
        let mut store = store_with(&repo);

        store.append(Message::user("first chat")).unwrap();
        let first_id = store.active_session_id().to_string();
        store.start_new_session().unwrap();
        store.append(Message::user("second chat")).unwrap();

        store.clear().unwrap();

        assert!(store.messages().is_empty());
        assert!(repo.load(MESSAGES_SLOT).unwrap().is_none());
        assert!(store.sessions().iter().any(|s| s.id == first_id));
    }

    #[test]
    fn test_clear_bumps_epoch() {
        let repo = MemoryStorage::new();
        let mut store = store_with(&repo);
        store.append(Message::user("hi")).unwrap();
        let before = store.epoch();
        store.clear().unwrap();
        assert_eq!(store.epoch(), before + 1);
    }

    #[test]
    fn test_start_new_session_generates_unique_ids() {
        let repo = MemoryStorage::new();
        let mut store = store_with(&repo);

        let a = store.start_new_session().unwrap();
        let b = store.start_new_session().unwrap();
        assert_ne!(a, b);
        assert_eq!(store.active_session_id(), b);

        let persisted_id: String = persisted(&repo, ACTIVE_SESSION_SLOT).unwrap();
        assert_eq!(persisted_id, b);
    }

    #[test]
    fn test_start_new_session_keeps_previous_summary() {
        let repo = MemoryStorage::new();
        let mut store = store_with(&repo);
        store.append(Message::user("keep me")).unwrap();

        store.start_new_session().unwrap();

        assert!(store.messages().is_empty());
        assert_eq!(store.sessions().len(), 1);
        assert_eq!(store.sessions()[0].id, DEFAULT_SESSION_ID);
    }

    #[test]
    fn test_load_session_restores_transcript() {
        let repo = MemoryStorage::new();
        let mut store = store_with(&repo);

        store.append(Message::user("about warehouses")).unwrap();
        store.append(Message::assistant("warehouses answer")).unwrap();
        let original = store.messages().to_vec();

        let new_id = store.start_new_session().unwrap();
        store.append(Message::user("about lakes")).unwrap();

        store.load_session(DEFAULT_SESSION_ID).unwrap();
        assert_eq!(store.active_session_id(), DEFAULT_SESSION_ID);
        assert_eq!(store.messages(), original.as_slice());

        // The session we left was archived and can be reopened too
        store.load_session(&new_id).unwrap();
        assert_eq!(store.messages().len(), 1);
        assert_eq!(store.messages()[0].content, "about lakes");
    }

    #[test]
    fn test_load_session_survives_restart() {
        let repo = MemoryStorage::new();
        let mut store = store_with(&repo);
        store.append(Message::user("persist me")).unwrap();
        store.start_new_session().unwrap();
        store.append(Message::user("other")).unwrap();
        store.load_session(DEFAULT_SESSION_ID).unwrap();

        let reloaded = store_with(&repo);
        assert_eq!(reloaded.active_session_id(), DEFAULT_SESSION_ID);
        assert_eq!(reloaded.messages().len(), 1);
        assert_eq!(reloaded.messages()[0].content, "persist me");
    }

    #[test]
    fn test_load_session_unknown_id() {
        let repo = MemoryStorage::new();
        let mut store = store_with(&repo);
        let err = store.load_session("chat_missing").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MiraError>(),
            Some(MiraError::SessionNotFound(id)) if id == "chat_missing"
        ));
    }

    #[test]
    fn test_load_session_bumps_epoch() {
        let repo = MemoryStorage::new();
        let mut store = store_with(&repo);
        store.append(Message::user("a")).unwrap();
        store.start_new_session().unwrap();
        let before = store.epoch();
        store.load_session(DEFAULT_SESSION_ID).unwrap();
        assert_eq!(store.epoch(), before + 1);
    }

    #[test]
    fn test_search_sessions() {
        let repo = MemoryStorage::new();
        let mut store = store_with(&repo);
        store.append(Message::user("Data Warehouse basics")).unwrap();
        store.start_new_session().unwrap();
        store.append(Message::user("OCR pipelines")).unwrap();
        store.append(Message::assistant("Tesseract handles scanned pages")).unwrap();

        let hits = store.search_sessions("warehouse");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Data Warehouse basics");

        let preview_hits = store.search_sessions("TESSERACT");
        assert_eq!(preview_hits.len(), 1);

        assert_eq!(store.search_sessions("  ").len(), 2);
        assert!(store.search_sessions("kubernetes").is_empty());
    }

    #[test]
    fn test_load_normalizes_oversized_session_list() {
        let repo = MemoryStorage::new();
        let now = Utc::now();
        let mut sessions: Vec<ChatSession> = (0..30)
            .map(|i| ChatSession {
                id: format!("chat_{}", i),
                title: format!("t{}", i),
                preview: String::new(),
                timestamp: now,
            })
            .collect();
        sessions.insert(1, sessions[0].clone());
        repo.save(SESSIONS_SLOT, &serde_json::to_string(&sessions).unwrap())
            .unwrap();

        let store = store_with(&repo);
        assert_eq!(store.sessions().len(), 20);
        assert_eq!(store.sessions()[0].id, "chat_0");
        assert_eq!(store.sessions()[1].id, "chat_1");
    }

    #[test]
    fn test_failed_message_write_drops_the_message() {
        let (mut store, repo) = failing_store();
        store.append(Message::user("one")).unwrap();

        repo.fail_on(MESSAGES_SLOT);
        assert!(store.append(Message::user("two")).is_err());

        assert_eq!(store.messages().len(), 1);
        assert_eq!(store.messages()[0].content, "one");
        assert_converged(&store, &repo);
    }

    #[test]
    fn test_failed_summary_write_keeps_previous_list() {
        let (mut store, repo) = failing_store();
        repo.fail_on(SESSIONS_SLOT);

        assert!(store.append(Message::user("one")).is_err());

        assert_eq!(store.messages().len(), 1);
        assert!(store.sessions().is_empty());
        assert_converged(&store, &repo);
    }

    #[test]
    fn test_failed_clear_keeps_messages() {
        let (mut store, repo) = failing_store();
        store.append(Message::user("one")).unwrap();
        repo.fail_on(MESSAGES_SLOT);

        assert!(store.clear().is_err());

        assert_eq!(store.messages().len(), 1);
        assert_eq!(store.epoch(), 0);
        assert_converged(&store, &repo);
    }

    #[test]
    fn test_failed_new_session_keeps_active_id() {
        let (mut store, repo) = failing_store();
        store.append(Message::user("one")).unwrap();
        repo.fail_on(ACTIVE_SESSION_SLOT);

        assert!(store.start_new_session().is_err());

        assert_eq!(store.active_session_id(), DEFAULT_SESSION_ID);
        assert_eq!(store.messages().len(), 1);
        assert_eq!(store.epoch(), 0);
        assert_converged(&store, &repo);
    }

    #[test]
    fn test_failed_new_session_transcript_removal_keeps_active_id() {
        let (mut store, repo) = failing_store();
        store.append(Message::user("one")).unwrap();
        repo.fail_on(MESSAGES_SLOT);

        assert!(store.start_new_session().is_err());

        assert_eq!(store.active_session_id(), DEFAULT_SESSION_ID);
        assert_eq!(store.messages().len(), 1);
        assert_converged(&store, &repo);
    }

    #[test]
    fn test_failed_switch_keeps_active_session() {
        let (mut store, repo) = failing_store();
        store.append(Message::user("first topic")).unwrap();
        let first = store.active_session_id().to_string();
        store.start_new_session().unwrap();
        store.append(Message::user("second topic")).unwrap();
        let second = store.active_session_id().to_string();
        let epoch = store.epoch();

        repo.fail_on(ACTIVE_SESSION_SLOT);
        assert!(store.load_session(&first).is_err());

        assert_eq!(store.active_session_id(), second);
        assert_eq!(store.messages().len(), 1);
        assert_eq!(store.messages()[0].content, "second topic");
        assert_eq!(store.epoch(), epoch);
        assert_converged(&store, &repo);
    }

    #[test]
    fn test_append_reply_to_active_session() {
        let repo = MemoryStorage::new();
        let mut store = store_with(&repo);
        let question = Message::user("hello");
        store.append(question.clone()).unwrap();
        let id = store.active_session_id().to_string();

        assert!(store
            .append_reply(&id, &question, Message::assistant("hi"))
            .unwrap());
        assert_eq!(store.messages().len(), 2);
        assert_eq!(store.sessions()[0].preview, "hi");
    }

    #[test]
    fn test_append_reply_to_archived_session() {
        let repo = MemoryStorage::new();
        let mut store = store_with(&repo);
        let question = Message::user("What is a data warehouse?");
        store.append(question.clone()).unwrap();
        let first = store.active_session_id().to_string();
        store.start_new_session().unwrap();

        let delivered = store
            .append_reply(&first, &question, Message::assistant("A data warehouse is..."))
            .unwrap();
        assert!(delivered);
        assert!(store.messages().is_empty());

        let summary = store.sessions().iter().find(|s| s.id == first).unwrap();
        assert_eq!(summary.preview, "A data warehouse is...");

        store.load_session(&first).unwrap();
        let roles: Vec<Role> = store.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant]);
    }

    #[test]
    fn test_append_reply_after_clear_is_dropped() {
        let repo = MemoryStorage::new();
        let mut store = store_with(&repo);
        let question = Message::user("hello");
        store.append(question.clone()).unwrap();
        let id = store.active_session_id().to_string();
        store.clear().unwrap();

        assert!(!store
            .append_reply(&id, &question, Message::assistant("hi"))
            .unwrap());
        assert!(store.messages().is_empty());
        assert!(persisted::<Vec<Message>>(&repo, MESSAGES_SLOT).is_none());
    }

    #[test]
    fn test_append_reply_to_unknown_session_is_dropped() {
        let repo = MemoryStorage::new();
        let mut store = store_with(&repo);
        let question = Message::user("hello");

        assert!(!store
            .append_reply("chat_gone", &question, Message::assistant("hi"))
            .unwrap());
        assert!(store.sessions().is_empty());
    }
}
