//! # lantern-core
//!
//! Foundation types, errors, branded IDs, and the discovery data model for
//! Lantern.
//!
//! This crate provides the shared vocabulary that all other Lantern crates
//! depend on:
//!
//! - **Branded IDs**: `ChatId`, `BranchId`, `MessageId`, ... as newtypes for
//!   type safety
//! - **Data model**: `Chat`, `Branch`, `Message`, `ToolCall`, `Citation`,
//!   `SourceRecord`
//! - **Envelopes**: `AgentEnvelope` with priority and correlation metadata for
//!   inter-agent routing
//! - **Errors**: `LanternError` taxonomy via `thiserror`

#![deny(unsafe_code)]

pub mod envelope;
pub mod errors;
pub mod ids;
pub mod model;

pub use envelope::{AgentEnvelope, Priority, Recipient, KIND_AGENT_FAILED};
pub use errors::{LanternError, Result};
pub use ids::{
    AgentId, BranchId, ChatId, CitationId, CorrelationId, MessageId, RecordId, ToolCallId, TurnId,
};
pub use model::{
    Branch, Chat, Citation, Message, Role, SourceRecord, Span, ToolCall, ToolCallStatus,
};
