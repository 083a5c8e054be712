//! Conversation state: data model and the persisted session store

pub mod store;
pub mod types;

pub use store::{generate_session_id, SessionStore, DEFAULT_SESSION_ID};
pub use types::{
    truncate_chars, ChatSession, Message, PageRef, Role, Source, SourceType,
    DEFAULT_SESSION_TITLE, FALLBACK_MESSAGE,
};
