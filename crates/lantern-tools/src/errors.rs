//! Tool error types.
//!
//! Unified error enum for the registry and invoker. Variants carry enough
//! detail for callers to render an actionable message; the invoker folds them
//! into a failed `ToolCall` rather than letting them escape the call.

use std::fmt;

use thiserror::Error;

/// A single argument-validation failure, addressed by JSON field path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldIssue {
    /// Dotted path to the offending field, e.g. `filters.limit`.
    pub path: String,
    /// What was wrong with it.
    pub detail: String,
}

impl FieldIssue {
    /// An issue at `path` with human-readable `detail`.
    pub fn new(path: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            detail: detail.into(),
        }
    }
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.detail)
        } else {
            write!(f, "{}: {}", self.path, self.detail)
        }
    }
}

/// Errors that can occur while registering or invoking a tool.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Registration collided with an already-registered name.
    #[error("duplicate tool: {name}")]
    DuplicateTool {
        /// The colliding tool name.
        name: String,
    },

    /// No tool with the requested name is registered.
    #[error("unknown tool: {name}")]
    UnknownTool {
        /// The requested tool name.
        name: String,
    },

    /// Arguments failed validation against the tool's parameter schema.
    #[error("invalid arguments: {}", format_issues(issues))]
    InvalidArguments {
        /// Per-field failures.
        issues: Vec<FieldIssue>,
    },

    /// The tool returned a value that violates its declared result schema.
    /// Always a defect in the tool itself.
    #[error("invalid result: {}", format_issues(issues))]
    InvalidResult {
        /// Per-field failures.
        issues: Vec<FieldIssue>,
    },

    /// Execution exceeded the tool's timeout.
    #[error("timeout after {timeout_ms}ms")]
    Timeout {
        /// The timeout that elapsed, in milliseconds.
        timeout_ms: u64,
    },

    /// The call's cancellation token fired before execution finished.
    #[error("cancelled")]
    Cancelled,

    /// The tool's own execution failed (including a panic in the tool body).
    #[error("{message}")]
    Execution {
        /// Description of the failure.
        message: String,
    },

    /// JSON serialization/deserialization error inside a tool.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ToolError {
    /// An execution failure with the given message.
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution {
            message: message.into(),
        }
    }
}

fn format_issues(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
