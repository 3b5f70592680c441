//! Tool registry and invoker.
//!
//! Tools are the orchestrator's only way to reach outside the conversation:
//! each one declares a JSON-schema argument shape and result shape, and the
//! [`ToolInvoker`] runs calls in isolation — argument validation, a per-call
//! timeout and cancellation token, and result validation — so one misbehaving
//! call never takes down its siblings.

#![deny(unsafe_code)]

pub mod errors;
pub mod registry;
pub mod schema;
pub mod source;
pub mod traits;

mod invoker;

pub use errors::{FieldIssue, ToolError};
pub use invoker::ToolInvoker;
pub use registry::{ToolDefinition, ToolRegistry};
pub use schema::ParameterSchema;
pub use source::{InMemoryRecordSource, RecordSource, SearchTool};
pub use traits::{Tool, ToolContext, DEFAULT_TOOL_TIMEOUT};
