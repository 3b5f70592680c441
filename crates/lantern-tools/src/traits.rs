//! The tool trait and per-call execution context.

use std::time::Duration;

use async_trait::async_trait;
use lantern_core::{BranchId, ChatId, ToolCallId};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::errors::ToolError;
use crate::schema::ParameterSchema;

/// Default per-call execution timeout.
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(10);

/// Execution context passed to every tool invocation.
#[derive(Clone, Debug)]
pub struct ToolContext {
    /// Unique ID of this tool call.
    pub tool_call_id: ToolCallId,
    /// Chat the invoking turn belongs to.
    pub chat_id: ChatId,
    /// Branch the invoking turn is appending to.
    pub branch_id: BranchId,
    /// Cancellation token for cooperative cancellation.
    pub cancellation: CancellationToken,
}

/// The trait every tool implements.
///
/// A tool declares its argument and result shapes up front; the invoker
/// validates both sides so tool bodies can assume well-formed input and
/// callers can assume well-formed output.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name — the exact string the planner schedules by.
    fn name(&self) -> &str;

    /// Human-readable description.
    fn description(&self) -> &str;

    /// JSON-schema shape of the arguments.
    fn parameters(&self) -> ParameterSchema;

    /// JSON-schema shape of a successful result.
    fn result_schema(&self) -> ParameterSchema;

    /// Per-call execution timeout.
    fn timeout(&self) -> Duration {
        DEFAULT_TOOL_TIMEOUT
    }

    /// Execute with already-validated JSON arguments.
    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<Value, ToolError>;
}
