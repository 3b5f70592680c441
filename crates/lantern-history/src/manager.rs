//! The [`BranchManager`] — fork-tree maintenance and history resolution.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use tracing::{debug, instrument, warn};

use lantern_core::{
    Branch, BranchId, Chat, ChatId, LanternError, Message, MessageId, Result, Role,
};
use lantern_store::Store;

/// Maximum ancestor-branch walk depth before resolution fails with a
/// conflict. The structural invariant makes a cycle impossible through the
/// public API; the guard defends against a corrupted store.
pub const MAX_ANCESTOR_DEPTH: usize = 64;

/// Maintains the fork tree of conversation branches per chat and resolves
/// full logical history across forks.
///
/// Appends are serialized per branch through the store's writer guard;
/// unrelated branches append independently. Resolved histories are cached
/// per branch head — appending to a branch invalidates only that branch's
/// entry, because the fork-freeze append discipline keeps every ancestor
/// prefix stable.
pub struct BranchManager {
    store: Arc<dyn Store>,
    resolved: DashMap<BranchId, Arc<Vec<Message>>>,
}

impl BranchManager {
    /// Create a manager over the given store.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            resolved: DashMap::new(),
        }
    }

    /// Create a chat together with its root branch.
    ///
    /// Chats come into existence on the first user message; the root branch
    /// has no parent message.
    pub async fn create_chat(&self, owner: &str, root_name: &str) -> Result<(Chat, Branch)> {
        let chat = Chat::new(owner);
        self.store.insert_chat(chat.clone()).await?;
        let root = Branch {
            id: BranchId::new(),
            chat_id: chat.id.clone(),
            parent_message_id: None,
            name: root_name.to_owned(),
            created_at: Utc::now(),
        };
        self.store.insert_branch(root.clone()).await?;
        debug!(chat_id = %chat.id, branch_id = %root.id, "chat created");
        Ok((chat, root))
    }

    /// Create a branch forking from `parent_message_id`.
    ///
    /// Fails `NotFound` for an unknown chat, `Validation` when the parent
    /// message is unreachable from the chat, and `Conflict` on a
    /// case-insensitive name collision among the chat's branches (the losing
    /// side of a concurrent same-name race sees the same conflict).
    #[instrument(skip(self), fields(chat_id = %chat_id))]
    pub async fn create_branch(
        &self,
        chat_id: &ChatId,
        parent_message_id: Option<MessageId>,
        name: &str,
    ) -> Result<Branch> {
        if name.trim().is_empty() {
            return Err(LanternError::validation("name", "branch name may not be empty"));
        }
        let _ = self.store.get_chat(chat_id).await?;

        if let Some(parent_id) = &parent_message_id {
            let parent = self.store.get_message(parent_id).await.map_err(|_| {
                LanternError::validation(
                    "parentMessageId",
                    format!("message {parent_id} is not reachable from chat {chat_id}"),
                )
            })?;
            let parent_branch = self.store.get_branch(&parent.branch_id).await?;
            if &parent_branch.chat_id != chat_id {
                return Err(LanternError::validation(
                    "parentMessageId",
                    format!("message {parent_id} belongs to a different chat"),
                ));
            }
        }

        let branch = Branch {
            id: BranchId::new(),
            chat_id: chat_id.clone(),
            parent_message_id,
            name: name.to_owned(),
            created_at: Utc::now(),
        };
        self.store.insert_branch(branch.clone()).await?;
        debug!(branch_id = %branch.id, name, "branch created");
        Ok(branch)
    }

    /// List a chat's branches ordered by creation time ascending.
    pub async fn list_branches(&self, chat_id: &ChatId) -> Result<Vec<Branch>> {
        let _ = self.store.get_chat(chat_id).await?;
        self.store.list_branches(chat_id).await
    }

    /// Resolve the ordered message sequence from the chat root to the head of
    /// `branch_id`, splicing each branch's own messages after its fork point.
    ///
    /// Results are cached per branch head; appends to the branch invalidate
    /// the entry.
    pub async fn resolve_history(&self, branch_id: &BranchId) -> Result<Arc<Vec<Message>>> {
        if let Some(cached) = self.resolved.get(branch_id) {
            return Ok(cached.clone());
        }
        let history = Arc::new(self.resolve_uncached(branch_id).await?);
        let _ = self.resolved.insert(branch_id.clone(), history.clone());
        Ok(history)
    }

    /// Append a message at the branch tail, assigning the next ordinal under
    /// the per-branch writer guard.
    ///
    /// An ordinal conflict from a detected race is retried once with a fresh
    /// ordinal before surfacing.
    #[instrument(skip(self, content), fields(branch_id = %branch_id))]
    pub async fn append_message(
        &self,
        branch_id: &BranchId,
        role: Role,
        content: &str,
        finalized: bool,
    ) -> Result<Message> {
        let writer = self.store.branch_writer(branch_id);
        let _guard = writer.lock().await;

        let mut attempt = 0;
        loop {
            let history = self.resolve_uncached(branch_id).await?;
            let ordinal = history.last().map_or(0, |m| m.ordinal + 1);
            let message = Message {
                id: MessageId::new(),
                branch_id: branch_id.clone(),
                role,
                content: content.to_owned(),
                created_at: Utc::now(),
                ordinal,
                finalized,
                degraded: false,
            };
            match self.store.insert_message(message.clone()).await {
                Ok(()) => {
                    let _ = self.resolved.remove(branch_id);
                    debug!(message_id = %message.id, ordinal, "message appended");
                    return Ok(message);
                }
                Err(e) if e.is_conflict() && attempt == 0 => {
                    warn!(branch_id = %branch_id, "ordinal race detected, retrying once");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Freeze a message's content and flags (turn finalization).
    pub async fn finalize_message(
        &self,
        message_id: &MessageId,
        content: Option<String>,
        degraded: bool,
    ) -> Result<Message> {
        let mut message = self.store.get_message(message_id).await?;
        if message.finalized {
            return Err(LanternError::conflict(format!(
                "message {message_id} is already finalized"
            )));
        }
        if let Some(content) = content {
            message.content = content;
        }
        message.finalized = true;
        message.degraded = degraded;
        self.store.update_message(message.clone()).await?;
        let _ = self.resolved.remove(&message.branch_id);
        Ok(message)
    }

    /// Roll back an in-flight message (turn cancellation).
    ///
    /// Only a non-finalized branch tail may be discarded.
    pub async fn discard_message(&self, message_id: &MessageId) -> Result<()> {
        let message = self.store.get_message(message_id).await?;
        if message.finalized {
            return Err(LanternError::conflict(format!(
                "finalized message {message_id} cannot be discarded"
            )));
        }
        let writer = self.store.branch_writer(&message.branch_id);
        let _guard = writer.lock().await;
        let own = self.store.list_messages(&message.branch_id).await?;
        if own.last().map(|m| &m.id) != Some(&message.id) {
            return Err(LanternError::conflict(format!(
                "message {message_id} is not the branch tail"
            )));
        }
        self.store.delete_message(message_id).await?;
        let _ = self.resolved.remove(&message.branch_id);
        Ok(())
    }

    async fn resolve_uncached(&self, branch_id: &BranchId) -> Result<Vec<Message>> {
        // Walk ancestors root-ward, recording each ancestor's fork ordinal.
        let mut segments: Vec<(BranchId, Option<u64>)> = vec![(branch_id.clone(), None)];
        let mut current = self.store.get_branch(branch_id).await?;
        while let Some(parent_message_id) = current.parent_message_id.clone() {
            if segments.len() > MAX_ANCESTOR_DEPTH {
                return Err(LanternError::conflict(format!(
                    "cycle detected resolving history of branch {branch_id}"
                )));
            }
            let fork_point = self.store.get_message(&parent_message_id).await?;
            segments.push((fork_point.branch_id.clone(), Some(fork_point.ordinal)));
            current = self.store.get_branch(&fork_point.branch_id).await?;
        }

        // Splice root-first: each ancestor contributes its prefix up to and
        // including the fork point; the branch itself contributes everything.
        let mut history = Vec::new();
        for (segment_id, bound) in segments.into_iter().rev() {
            let own = self.store.list_messages(&segment_id).await?;
            match bound {
                Some(bound) => {
                    history.extend(own.into_iter().filter(|m| m.ordinal <= bound));
                }
                None => history.extend(own),
            }
        }
        Ok(history)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
