//! In-process reference implementation of [`Store`].
//!
//! Tables are `parking_lot::RwLock`-guarded maps; the per-branch writer
//! guards live in a `DashMap` so unrelated branches append independently.
//! Read methods take the read lock only — readers never block on writers
//! beyond the map lock itself.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use tokio::sync::Mutex;

use lantern_core::{
    Branch, BranchId, Chat, ChatId, Citation, LanternError, Message, MessageId, Result, ToolCall,
};

use crate::store::{name_conflict, ordinal_conflict, Store};

/// In-memory [`Store`] used by default wiring and tests.
#[derive(Default)]
pub struct MemoryStore {
    chats: RwLock<HashMap<ChatId, Chat>>,
    branches: RwLock<HashMap<BranchId, Branch>>,
    messages: RwLock<HashMap<MessageId, Message>>,
    tool_calls: RwLock<Vec<ToolCall>>,
    citations: RwLock<Vec<Citation>>,
    writers: DashMap<BranchId, Arc<Mutex<()>>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_chat(&self, chat: Chat) -> Result<()> {
        let _ = self.chats.write().insert(chat.id.clone(), chat);
        Ok(())
    }

    async fn get_chat(&self, id: &ChatId) -> Result<Chat> {
        self.chats
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| LanternError::not_found("chat", id.as_str()))
    }

    async fn insert_branch(&self, branch: Branch) -> Result<()> {
        // Hold the write lock across the collision check so concurrent
        // same-name creations cannot both pass it.
        let mut branches = self.branches.write();
        let lowered = branch.name.to_lowercase();
        let collides = branches
            .values()
            .any(|b| b.chat_id == branch.chat_id && b.name.to_lowercase() == lowered);
        if collides {
            return Err(name_conflict(&branch.chat_id, &branch.name));
        }
        let _ = branches.insert(branch.id.clone(), branch);
        Ok(())
    }

    async fn get_branch(&self, id: &BranchId) -> Result<Branch> {
        self.branches
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| LanternError::not_found("branch", id.as_str()))
    }

    async fn list_branches(&self, chat_id: &ChatId) -> Result<Vec<Branch>> {
        let mut out: Vec<Branch> = self
            .branches
            .read()
            .values()
            .filter(|b| &b.chat_id == chat_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.as_str().cmp(b.id.as_str())));
        Ok(out)
    }

    async fn insert_message(&self, message: Message) -> Result<()> {
        let mut messages = self.messages.write();
        let tail = messages
            .values()
            .filter(|m| m.branch_id == message.branch_id)
            .map(|m| m.ordinal)
            .max();
        if let Some(tail) = tail {
            if message.ordinal <= tail {
                return Err(ordinal_conflict(&message.branch_id, message.ordinal));
            }
        }
        let _ = messages.insert(message.id.clone(), message);
        Ok(())
    }

    async fn get_message(&self, id: &MessageId) -> Result<Message> {
        self.messages
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| LanternError::not_found("message", id.as_str()))
    }

    async fn update_message(&self, message: Message) -> Result<()> {
        let mut messages = self.messages.write();
        if !messages.contains_key(&message.id) {
            return Err(LanternError::not_found("message", message.id.as_str()));
        }
        let _ = messages.insert(message.id.clone(), message);
        Ok(())
    }

    async fn delete_message(&self, id: &MessageId) -> Result<()> {
        if self.messages.write().remove(id).is_none() {
            return Err(LanternError::not_found("message", id.as_str()));
        }
        Ok(())
    }

    async fn list_messages(&self, branch_id: &BranchId) -> Result<Vec<Message>> {
        let mut out: Vec<Message> = self
            .messages
            .read()
            .values()
            .filter(|m| &m.branch_id == branch_id)
            .cloned()
            .collect();
        out.sort_by_key(|m| m.ordinal);
        Ok(out)
    }

    async fn insert_tool_call(&self, call: ToolCall) -> Result<()> {
        self.tool_calls.write().push(call);
        Ok(())
    }

    async fn list_tool_calls(&self, message_id: &MessageId) -> Result<Vec<ToolCall>> {
        let mut out: Vec<ToolCall> = self
            .tool_calls
            .read()
            .iter()
            .filter(|c| &c.message_id == message_id)
            .cloned()
            .collect();
        out.sort_by_key(|c| c.plan_index);
        Ok(out)
    }

    async fn insert_citation(&self, citation: Citation) -> Result<()> {
        self.citations.write().push(citation);
        Ok(())
    }

    async fn list_citations(&self, message_id: &MessageId) -> Result<Vec<Citation>> {
        let mut out: Vec<Citation> = self
            .citations
            .read()
            .iter()
            .filter(|c| &c.message_id == message_id)
            .cloned()
            .collect();
        out.sort_by_key(|c| c.span.start);
        Ok(out)
    }

    fn branch_writer(&self, branch_id: &BranchId) -> Arc<Mutex<()>> {
        self.writers
            .entry(branch_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::Utc;
    use lantern_core::{Role, Span};

    fn make_branch(chat_id: &ChatId, name: &str) -> Branch {
        Branch {
            id: BranchId::new(),
            chat_id: chat_id.clone(),
            parent_message_id: None,
            name: name.into(),
            created_at: Utc::now(),
        }
    }

    fn make_message(branch_id: &BranchId, ordinal: u64) -> Message {
        Message {
            id: MessageId::new(),
            branch_id: branch_id.clone(),
            role: Role::User,
            content: format!("message {ordinal}"),
            created_at: Utc::now(),
            ordinal,
            finalized: false,
            degraded: false,
        }
    }

    #[tokio::test]
    async fn chat_roundtrip() {
        let store = MemoryStore::new();
        let chat = Chat::new("owner-1");
        let id = chat.id.clone();
        store.insert_chat(chat).await.unwrap();
        let got = store.get_chat(&id).await.unwrap();
        assert_eq!(got.owner, "owner-1");
    }

    #[tokio::test]
    async fn get_chat_unknown_is_not_found() {
        let store = MemoryStore::new();
        let err = store.get_chat(&ChatId::from("missing")).await.unwrap_err();
        assert_matches!(err, LanternError::NotFound { .. });
    }

    #[tokio::test]
    async fn branch_name_collision_case_insensitive() {
        let store = MemoryStore::new();
        let chat_id = ChatId::new();
        store
            .insert_branch(make_branch(&chat_id, "Alt-Theory"))
            .await
            .unwrap();
        let err = store
            .insert_branch(make_branch(&chat_id, "alt-theory"))
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn same_name_in_different_chats_is_allowed() {
        let store = MemoryStore::new();
        store
            .insert_branch(make_branch(&ChatId::new(), "main"))
            .await
            .unwrap();
        store
            .insert_branch(make_branch(&ChatId::new(), "main"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn list_branches_ordered_by_created_at() {
        let store = MemoryStore::new();
        let chat_id = ChatId::new();
        let mut first = make_branch(&chat_id, "a");
        first.created_at = Utc::now() - chrono::Duration::seconds(10);
        let second = make_branch(&chat_id, "b");
        store.insert_branch(second).await.unwrap();
        store.insert_branch(first).await.unwrap();
        let listed = store.list_branches(&chat_id).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].name, "a");
        assert_eq!(listed[1].name, "b");
    }

    #[tokio::test]
    async fn messages_append_only_at_tail() {
        let store = MemoryStore::new();
        let branch_id = BranchId::new();
        store.insert_message(make_message(&branch_id, 0)).await.unwrap();
        store.insert_message(make_message(&branch_id, 1)).await.unwrap();

        // Same ordinal again
        let err = store
            .insert_message(make_message(&branch_id, 1))
            .await
            .unwrap_err();
        assert!(err.is_conflict());

        // Behind the tail
        let err = store
            .insert_message(make_message(&branch_id, 0))
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn list_messages_sorted_by_ordinal() {
        let store = MemoryStore::new();
        let branch_id = BranchId::new();
        for ordinal in 0..3 {
            store
                .insert_message(make_message(&branch_id, ordinal))
                .await
                .unwrap();
        }
        let listed = store.list_messages(&branch_id).await.unwrap();
        let ordinals: Vec<u64> = listed.iter().map(|m| m.ordinal).collect();
        assert_eq!(ordinals, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn update_message_replaces_row() {
        let store = MemoryStore::new();
        let branch_id = BranchId::new();
        let mut msg = make_message(&branch_id, 0);
        let id = msg.id.clone();
        store.insert_message(msg.clone()).await.unwrap();
        msg.content = "edited".into();
        msg.finalized = true;
        store.update_message(msg).await.unwrap();
        let got = store.get_message(&id).await.unwrap();
        assert_eq!(got.content, "edited");
        assert!(got.finalized);
    }

    #[tokio::test]
    async fn update_unknown_message_is_not_found() {
        let store = MemoryStore::new();
        let msg = make_message(&BranchId::new(), 0);
        let err = store.update_message(msg).await.unwrap_err();
        assert_matches!(err, LanternError::NotFound { .. });
    }

    #[tokio::test]
    async fn delete_message_removes_row() {
        let store = MemoryStore::new();
        let branch_id = BranchId::new();
        let msg = make_message(&branch_id, 0);
        let id = msg.id.clone();
        store.insert_message(msg).await.unwrap();
        store.delete_message(&id).await.unwrap();
        assert_matches!(
            store.get_message(&id).await,
            Err(LanternError::NotFound { .. })
        );
    }

    #[tokio::test]
    async fn citations_sorted_by_span_start() {
        let store = MemoryStore::new();
        let message_id = MessageId::new();
        for (start, end) in [(20, 30), (0, 10), (10, 20)] {
            store
                .insert_citation(Citation {
                    id: lantern_core::CitationId::new(),
                    message_id: message_id.clone(),
                    source_record_id: lantern_core::RecordId::new(),
                    span: Span::new(start, end),
                    confidence: 1.0,
                })
                .await
                .unwrap();
        }
        let listed = store.list_citations(&message_id).await.unwrap();
        let starts: Vec<usize> = listed.iter().map(|c| c.span.start).collect();
        assert_eq!(starts, vec![0, 10, 20]);
    }

    #[tokio::test]
    async fn branch_writer_is_stable_per_branch() {
        let store = MemoryStore::new();
        let branch_id = BranchId::new();
        let a = store.branch_writer(&branch_id);
        let b = store.branch_writer(&branch_id);
        assert!(Arc::ptr_eq(&a, &b));
        let other = store.branch_writer(&BranchId::new());
        assert!(!Arc::ptr_eq(&a, &other));
    }

    #[tokio::test]
    async fn concurrent_same_name_branch_creation_one_wins() {
        let store = Arc::new(MemoryStore::new());
        let chat_id = ChatId::new();
        let mut handles = Vec::new();
        for _ in 0..2 {
            let store = store.clone();
            let chat_id = chat_id.clone();
            handles.push(tokio::spawn(async move {
                store.insert_branch(make_branch(&chat_id, "Alt-Theory")).await
            }));
        }
        let mut ok = 0;
        let mut conflicts = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(()) => ok += 1,
                Err(e) if e.is_conflict() => conflicts += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(ok, 1);
        assert_eq!(conflicts, 1);
    }
}
