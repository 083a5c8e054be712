//! Assistant backend interface
//!
//! The backend that indexes documents and generates answers lives outside
//! this crate. `AssistantApi` is the seam the chat controller talks to;
//! `HttpAssistantClient` is the real implementation and tests substitute
//! their own.

use crate::error::Result;
use crate::session::{Source, SourceType};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod http;

pub use http::HttpAssistantClient;

/// Body of `POST /api/chat`
#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub message: &'a str,
}

/// Successful body of `POST /api/chat`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatResponse {
    pub answer: String,
    #[serde(default, deserialize_with = "crate::session::types::lenient_source_type")]
    pub source_type: Option<SourceType>,
    #[serde(default, deserialize_with = "crate::session::types::null_as_empty")]
    pub sources: Vec<Source>,
}

/// Body of `GET /api/status`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BackendStatus {
    pub initialized: bool,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub stats: BackendStats,
}

/// Knowledge base counters reported by the backend
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BackendStats {
    /// Indexed chunks in the vector store
    #[serde(default)]
    pub documents: u64,
    /// PDF files found in the knowledge base directory
    #[serde(default)]
    pub pdfs: u64,
}

/// Operations offered by the assistant backend
#[async_trait]
pub trait AssistantApi: Send + Sync {
    /// Ask the backend to load its knowledge base; any 2xx means ready
    async fn initialize(&self) -> Result<()>;

    /// Send one user message and return the answer
    async fn chat(&self, message: &str) -> Result<ChatResponse>;

    /// Tell the backend to drop its conversation memory
    async fn clear(&self) -> Result<()>;

    /// Report readiness and knowledge base counters
    async fn status(&self) -> Result<BackendStatus>;
}
