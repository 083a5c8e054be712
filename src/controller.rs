//! Chat controller: one request/response cycle at a time
//!
//! The controller moves between two phases, `Idle` and `Sending`. A send
//! claims `Sending` before anything is appended, so a rejected send leaves
//! the conversation untouched and a concurrent send is refused rather than
//! queued. Backend failures never escape as errors: a failed chat call
//! becomes the fallback assistant message, a failed clear notification is
//! only logged.

use crate::api::{AssistantApi, BackendStatus};
use crate::config::ApiConfig;
use crate::error::{MiraError, Result};
use crate::session::{Message, SessionStore};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Controller phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Sending,
}

/// Why a send was refused before anything was appended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Input was empty or whitespace only
    EmptyInput,
    /// Another send is still waiting for its answer
    Busy,
}

/// Result of one [`ChatController::send`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Nothing was appended
    Rejected(RejectReason),
    /// The user message and the backend's answer were appended
    Answered,
    /// The user message and the fallback message were appended
    Failed,
    /// The asking conversation was cleared or dropped while waiting; the
    /// reply was not recorded anywhere
    Discarded,
}

/// Retry policy for `/api/initialize`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitializePolicy {
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl From<&ApiConfig> for InitializePolicy {
    fn from(config: &ApiConfig) -> Self {
        Self {
            max_retries: config.initialize_max_retries,
            retry_delay: config.initialize_retry_delay(),
        }
    }
}

impl Default for InitializePolicy {
    fn default() -> Self {
        Self::from(&ApiConfig::default())
    }
}

/// The conversation a request belongs to
#[derive(Debug, Clone, PartialEq)]
struct RequestTicket {
    session_id: String,
    epoch: u64,
    question: Message,
}

/// Resets the sending flag when the send finishes, however it finishes
struct SendingGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> SendingGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for SendingGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Runs chat cycles against the backend and records them in the store
pub struct ChatController {
    api: Arc<dyn AssistantApi>,
    store: Arc<Mutex<SessionStore>>,
    sending: AtomicBool,
    init_policy: InitializePolicy,
}

impl ChatController {
    /// Create a controller over an explicit store and backend
    pub fn new(
        api: Arc<dyn AssistantApi>,
        store: Arc<Mutex<SessionStore>>,
        init_policy: InitializePolicy,
    ) -> Self {
        Self {
            api,
            store,
            sending: AtomicBool::new(false),
            init_policy,
        }
    }

    /// Shared handle to the session store
    pub fn store(&self) -> Arc<Mutex<SessionStore>> {
        Arc::clone(&self.store)
    }

    pub fn phase(&self) -> Phase {
        if self.sending.load(Ordering::Acquire) {
            Phase::Sending
        } else {
            Phase::Idle
        }
    }

    /// True while a send is waiting for the backend
    pub fn is_sending(&self) -> bool {
        self.phase() == Phase::Sending
    }

    /// Lock the store for reading or mutation
    ///
    /// The guard must not be held across an `.await`.
    pub fn lock_store(&self) -> Result<MutexGuard<'_, SessionStore>> {
        self.store
            .lock()
            .map_err(|_| MiraError::Storage("session store lock poisoned".to_string()).into())
    }

    /// Send one user message and record the reply
    ///
    /// Appends exactly one user message and then exactly one assistant
    /// message (the answer or the fallback), unless the send is rejected
    /// at entry, in which case nothing is appended. A reply that lands
    /// after a new session was started or another one was loaded goes to
    /// the archived session that asked; after a clear it is dropped.
    ///
    /// # Errors
    ///
    /// Only storage failures are returned; backend failures are turned
    /// into the fallback message.
    pub async fn send(&self, text: &str) -> Result<SendOutcome> {
        if text.trim().is_empty() {
            tracing::debug!("Ignoring empty input");
            return Ok(SendOutcome::Rejected(RejectReason::EmptyInput));
        }

        let Some(_guard) = SendingGuard::acquire(&self.sending) else {
            tracing::debug!("Send rejected: a request is already in flight");
            return Ok(SendOutcome::Rejected(RejectReason::Busy));
        };

        let ticket = {
            let mut store = self.lock_store()?;
            let question = Message::user(text);
            store.append(question.clone())?;
            RequestTicket {
                session_id: store.active_session_id().to_string(),
                epoch: store.epoch(),
                question,
            }
        };

        let (reply, outcome) = match self.api.chat(text).await {
            Ok(response) => (
                Message::answer(response.answer, response.source_type, response.sources),
                SendOutcome::Answered,
            ),
            Err(e) => {
                tracing::error!("Chat request failed: {:#}", e);
                (Message::fallback(), SendOutcome::Failed)
            }
        };

        let mut store = self.lock_store()?;
        if store.active_session_id() == ticket.session_id && store.epoch() == ticket.epoch {
            store.append(reply)?;
            return Ok(outcome);
        }

        if store.append_reply(&ticket.session_id, &ticket.question, reply)? {
            Ok(outcome)
        } else {
            tracing::info!(
                session = %ticket.session_id,
                "Conversation cleared while waiting for the backend, dropping reply"
            );
            Ok(SendOutcome::Discarded)
        }
    }

    /// Ask the backend to get ready, retrying per the policy
    ///
    /// Returns whether the backend reported ready. Never fails; callers
    /// usually run this on a background task so it does not hold up sends.
    pub async fn initialize(&self) -> bool {
        let mut attempt: u32 = 0;
        loop {
            match self.api.initialize().await {
                Ok(()) => {
                    tracing::info!("Assistant backend initialized");
                    return true;
                }
                Err(e) if attempt < self.init_policy.max_retries => {
                    attempt += 1;
                    tracing::warn!(
                        "Failed to initialize backend ({:#}), retry {}/{} in {:?}",
                        e,
                        attempt,
                        self.init_policy.max_retries,
                        self.init_policy.retry_delay
                    );
                    tokio::time::sleep(self.init_policy.retry_delay).await;
                }
                Err(e) => {
                    tracing::warn!("Failed to initialize backend: {:#}", e);
                    return false;
                }
            }
        }
    }

    /// Clear the active conversation and notify the backend
    ///
    /// The local clear happens before this returns. The notification runs
    /// on a spawned task whose failure is only logged; the handle may be
    /// dropped.
    pub fn clear(&self) -> Result<JoinHandle<()>> {
        self.lock_store()?.clear()?;
        Ok(self.notify_backend_clear())
    }

    /// Archive the active conversation and start a fresh session
    ///
    /// Like [`ChatController::clear`], the backend's conversation memory is
    /// reset in the background. Returns the new session id.
    pub fn start_new_session(&self) -> Result<(String, JoinHandle<()>)> {
        let id = self.lock_store()?.start_new_session()?;
        Ok((id, self.notify_backend_clear()))
    }

    /// Reopen a past session
    ///
    /// # Errors
    ///
    /// Returns [`MiraError::SessionNotFound`] for an unknown id.
    pub fn switch_session(&self, id: &str) -> Result<JoinHandle<()>> {
        self.lock_store()?.load_session(id)?;
        Ok(self.notify_backend_clear())
    }

    /// Fetch backend readiness and knowledge base counters
    pub async fn status(&self) -> Result<BackendStatus> {
        self.api.status().await
    }

    fn notify_backend_clear(&self) -> JoinHandle<()> {
        let api = Arc::clone(&self.api);
        tokio::spawn(async move {
            if let Err(e) = api.clear().await {
                tracing::warn!("Failed to notify backend of clear: {:#}", e);
            }
        })
    }
}
