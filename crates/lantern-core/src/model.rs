//! The discovery data model.
//!
//! Persistent entities: [`Chat`], [`Branch`], [`Message`], [`ToolCall`],
//! [`Citation`]. A chat owns a tree of branches; a branch's history before its
//! fork point is the same records as its parent branch, referenced logically,
//! never copied.
//!
//! [`SourceRecord`] is the read-only corpus row surfaced by analysis tools and
//! bound to generated text through citations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::LanternError;
use crate::ids::{BranchId, ChatId, CitationId, MessageId, RecordId, ToolCallId};

// ─────────────────────────────────────────────────────────────────────────────
// Chat and branches
// ─────────────────────────────────────────────────────────────────────────────

/// A conversation root owning one or more branches.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    /// Chat ID.
    pub id: ChatId,
    /// Opaque owner reference (authentication is external).
    pub owner: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl Chat {
    /// Create a new chat for the given owner.
    #[must_use]
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            id: ChatId::new(),
            owner: owner.into(),
            created_at: Utc::now(),
        }
    }
}

/// A forkable, ordered message sequence within a chat.
///
/// Branches form a tree through `parent_message_id`: the message in an
/// ancestor branch at which this branch diverges. The root branch has no
/// parent message. Acyclicity is structural — a branch's parent message must
/// have been created strictly before the branch itself.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    /// Branch ID.
    pub id: BranchId,
    /// Owning chat.
    pub chat_id: ChatId,
    /// Fork point in an ancestor branch; `None` for the chat's root branch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_message_id: Option<MessageId>,
    /// Human-readable branch name, unique per chat (case-insensitive).
    pub name: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Messages
// ─────────────────────────────────────────────────────────────────────────────

/// Author role of a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// End-user input.
    User,
    /// Assistant reply.
    Assistant,
    /// Tool-produced content.
    Tool,
}

/// One entry in a branch's ordered history.
///
/// Ordinals are strictly increasing per resolved history — a branch's first
/// own message continues from its fork point's ordinal. Content mutates only
/// while the message is in flight; finalization freezes it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Message ID.
    pub id: MessageId,
    /// Owning branch.
    pub branch_id: BranchId,
    /// Author role.
    pub role: Role,
    /// Message text.
    pub content: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Position in the branch's resolved history (gap-free, strictly
    /// increasing).
    pub ordinal: u64,
    /// Whether the message has been finalized (content frozen, citations
    /// attachable).
    pub finalized: bool,
    /// Whether this message is a degraded fallback produced by a failed turn.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub degraded: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tool calls
// ─────────────────────────────────────────────────────────────────────────────

/// Lifecycle status of a tool call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCallStatus {
    /// Dispatched, not yet resolved.
    Pending,
    /// Executed and result validated.
    Complete,
    /// Execution, validation, or timeout failure.
    Failed,
}

/// A recorded invocation of a registered tool.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCall {
    /// Tool call ID.
    pub id: ToolCallId,
    /// Owning assistant message.
    pub message_id: MessageId,
    /// Registered tool name.
    pub tool_name: String,
    /// Schema-validated arguments.
    pub arguments: Value,
    /// Lifecycle status.
    pub status: ToolCallStatus,
    /// Result payload (present when status is `Complete`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Failure detail (present when status is `Failed`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Position in the planner-specified order, for deterministic display.
    pub plan_index: u32,
}

// ─────────────────────────────────────────────────────────────────────────────
// Citations
// ─────────────────────────────────────────────────────────────────────────────

/// A half-open byte range `[start, end)` into a message's content.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Span {
    /// Inclusive start offset.
    pub start: usize,
    /// Exclusive end offset.
    pub end: usize,
}

impl Span {
    /// Create a span.
    #[must_use]
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Validate `start < end <= content_len`.
    pub fn validate(self, content_len: usize) -> Result<(), LanternError> {
        if self.start >= self.end {
            return Err(LanternError::validation(
                "span",
                format!("start ({}) must be less than end ({})", self.start, self.end),
            ));
        }
        if self.end > content_len {
            return Err(LanternError::validation(
                "span",
                format!(
                    "end ({}) exceeds content length ({content_len})",
                    self.end
                ),
            ));
        }
        Ok(())
    }
}

/// A provenance link from a text span to a source record.
///
/// Created once, at message finalization; never retroactively altered.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Citation {
    /// Citation ID.
    pub id: CitationId,
    /// Finalized message the span refers into.
    pub message_id: MessageId,
    /// Cited corpus record.
    pub source_record_id: RecordId,
    /// Text span within the message content.
    pub span: Span,
    /// Attachment confidence in `[0, 1]`.
    pub confidence: f64,
}

// ─────────────────────────────────────────────────────────────────────────────
// Source records
// ─────────────────────────────────────────────────────────────────────────────

/// A user-submitted experience record from the corpus.
///
/// Read-only from Lantern's perspective — the corpus and its query engine are
/// external collaborators.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRecord {
    /// Record ID.
    pub id: RecordId,
    /// Narrative text.
    pub narrative: String,
    /// Category tag (e.g. `"sighting"`).
    pub category: String,
    /// When the experience occurred.
    pub occurred_at: DateTime<Utc>,
    /// Free-form location tag.
    pub location: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
