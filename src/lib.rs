//! Mira - knowledge assistant chat client library
//!
//! This library provides the client side of a document-grounded question
//! answering assistant: a persistent session store, a chat controller that
//! runs one request at a time against the backend, and the HTTP client for
//! the backend's `/api/*` endpoints.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `session`: Messages, session summaries and the `SessionStore`
//! - `storage`: Snapshot persistence backends (SQLite, JSON directory, memory)
//! - `api`: The `AssistantApi` trait and its HTTP implementation
//! - `controller`: `ChatController`, the send/clear/switch state machine
//! - `render`: Terminal formatting of messages, sources and sessions
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli` / `commands`: Command-line interface and its handlers
//!
//! # Example
//!
//! ```no_run
//! use mira::{commands, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/config.yaml", &Default::default())?;
//!     config.validate()?;
//!
//!     let controller = commands::build_controller(&config)?;
//!     controller.initialize().await;
//!     controller.send("What is a data warehouse?").await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod controller;
pub mod error;
pub mod render;
pub mod session;
pub mod storage;

// Re-export commonly used types
pub use config::Config;
pub use controller::{ChatController, SendOutcome};
pub use error::{MiraError, Result};
pub use session::SessionStore;
