//! The [`Store`] trait — the persistence surface Lantern requires.
//!
//! Implementations must uphold two structural guarantees the orchestration
//! layer relies on:
//!
//! - **Append discipline**: `insert_message` rejects (with
//!   [`LanternError::Conflict`]) any message whose ordinal is not strictly
//!   greater than every existing ordinal in its branch. Messages are only
//!   ever appended at the tail, which is what freezes a branch's shared
//!   prefix once something forks from it.
//! - **Uniqueness**: `insert_branch` rejects (with `Conflict`) a branch whose
//!   name collides case-insensitively with an existing branch of the same
//!   chat. The collision check and the insert are atomic, so exactly one of
//!   two concurrent same-name creations succeeds.
//!
//! Readers never block on writers; the per-branch writer guard from
//! [`Store::branch_writer`] serializes appends only.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use lantern_core::{
    Branch, BranchId, Chat, ChatId, Citation, LanternError, Message, MessageId, Result, ToolCall,
};

/// Narrow persistence interface for chats, branches, messages, tool calls,
/// and citations.
#[async_trait]
pub trait Store: Send + Sync {
    /// Insert a chat.
    async fn insert_chat(&self, chat: Chat) -> Result<()>;

    /// Fetch a chat by ID.
    async fn get_chat(&self, id: &ChatId) -> Result<Chat>;

    /// Insert a branch. Fails `Conflict` on a case-insensitive name collision
    /// within the chat; the check and insert are atomic.
    async fn insert_branch(&self, branch: Branch) -> Result<()>;

    /// Fetch a branch by ID.
    async fn get_branch(&self, id: &BranchId) -> Result<Branch>;

    /// List a chat's branches ordered by `created_at` ascending.
    async fn list_branches(&self, chat_id: &ChatId) -> Result<Vec<Branch>>;

    /// Insert a message. Fails `Conflict` unless the ordinal is strictly
    /// greater than every existing ordinal in the branch (tail append only).
    async fn insert_message(&self, message: Message) -> Result<()>;

    /// Fetch a message by ID.
    async fn get_message(&self, id: &MessageId) -> Result<Message>;

    /// Replace a message row (in-flight content mutation and finalization).
    async fn update_message(&self, message: Message) -> Result<()>;

    /// Remove a message (turn cancellation rollback only).
    async fn delete_message(&self, id: &MessageId) -> Result<()>;

    /// List a branch's own messages ordered by ordinal ascending.
    async fn list_messages(&self, branch_id: &BranchId) -> Result<Vec<Message>>;

    /// Record a tool call under its owning assistant message.
    async fn insert_tool_call(&self, call: ToolCall) -> Result<()>;

    /// List a message's tool calls ordered by plan index ascending.
    async fn list_tool_calls(&self, message_id: &MessageId) -> Result<Vec<ToolCall>>;

    /// Record a citation.
    async fn insert_citation(&self, citation: Citation) -> Result<()>;

    /// List a message's citations ordered by span start ascending.
    async fn list_citations(&self, message_id: &MessageId) -> Result<Vec<Citation>>;

    /// Per-branch single-writer mutual-exclusion primitive.
    ///
    /// Two calls with the same branch ID return the same lock. Appending a
    /// message and computing its ordinal must happen while holding it.
    fn branch_writer(&self, branch_id: &BranchId) -> Arc<Mutex<()>>;
}

/// Convenience constructor for the conflict every implementation raises on a
/// non-tail message insert.
#[must_use]
pub fn ordinal_conflict(branch_id: &BranchId, ordinal: u64) -> LanternError {
    LanternError::conflict(format!(
        "message ordinal {ordinal} is not past the tail of branch {branch_id}"
    ))
}

/// Convenience constructor for the conflict raised on a duplicate branch name.
#[must_use]
pub fn name_conflict(chat_id: &ChatId, name: &str) -> LanternError {
    LanternError::conflict(format!(
        "branch name \"{name}\" already exists in chat {chat_id}"
    ))
}
