//! The generator trait and its prompt/stream types.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use lantern_core::{Message, ToolCall};
use serde::{Deserialize, Serialize};

/// Result type alias for generation operations.
pub type GenerateResult<T> = Result<T, GenerateError>;

/// Boxed stream of text chunks returned by [`Generator::stream`].
pub type ChunkStream = Pin<Box<dyn Stream<Item = GenerateResult<String>> + Send>>;

/// Errors that can occur during generation.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    /// The backend rejected or failed the request.
    #[error("generation backend error: {message}")]
    Backend {
        /// Error description.
        message: String,
        /// Whether retrying may succeed.
        retryable: bool,
    },

    /// The stream was cancelled before completion.
    #[error("stream cancelled")]
    Cancelled,

    /// No checkpoint or live stream exists under this id.
    #[error("unknown stream: {stream_id}")]
    UnknownStream {
        /// The requested stream id.
        stream_id: String,
    },

    /// Persisting or loading a checkpoint failed.
    #[error("checkpoint error: {message}")]
    Checkpoint {
        /// Error description.
        message: String,
    },

    /// JSON serialization/deserialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GenerateError {
    /// A backend failure, flagged retryable or not.
    pub fn backend(message: impl Into<String>, retryable: bool) -> Self {
        Self::Backend {
            message: message.into(),
            retryable,
        }
    }

    /// Whether this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Backend { retryable, .. } => *retryable,
            Self::Checkpoint { .. } => true,
            Self::Cancelled | Self::UnknownStream { .. } | Self::Json(_) => false,
        }
    }
}

/// Everything a backend needs to compose one assistant reply.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prompt {
    /// The user message this reply answers.
    pub user_message: String,
    /// Resolved conversation history, oldest first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<Message>,
    /// Tool calls executed for this turn, in plan order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_results: Vec<ToolCall>,
    /// Already-generated text the backend must continue after, not repeat.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume_from: Option<String>,
}

impl Prompt {
    #[must_use]
    pub fn new(user_message: impl Into<String>) -> Self {
        Self {
            user_message: user_message.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_history(mut self, history: Vec<Message>) -> Self {
        self.history = history;
        self
    }

    #[must_use]
    pub fn with_tool_results(mut self, tool_results: Vec<ToolCall>) -> Self {
        self.tool_results = tool_results;
        self
    }
}

/// A text-generation backend.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Backend identifier (e.g. `"template"`).
    fn name(&self) -> &str;

    /// Produce the complete reply in one call.
    async fn complete(&self, prompt: &Prompt) -> GenerateResult<String>;

    /// Produce the reply incrementally.
    ///
    /// When `prompt.resume_from` is set, the stream yields only text after
    /// that prefix.
    async fn stream(&self, prompt: &Prompt) -> GenerateResult<ChunkStream>;
}
