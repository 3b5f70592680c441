//! Citation attachment and retrieval.

use std::sync::Arc;

use dashmap::DashMap;
use lantern_core::{Citation, CitationId, LanternError, MessageId, RecordId, Result, Span};
use lantern_store::Store;
use tokio::sync::Mutex;
use tracing::instrument;

/// Binds text spans in finalized assistant messages to the corpus records
/// they were drawn from.
///
/// Attachments to the same message are serialized through a per-message lock
/// so concurrent attachers each see a consistent view of the message; they
/// never interleave partially.
pub struct CitationTracker {
    store: Arc<dyn Store>,
    writers: DashMap<MessageId, Arc<Mutex<()>>>,
}

impl CitationTracker {
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            writers: DashMap::new(),
        }
    }

    fn writer(&self, message_id: &MessageId) -> Arc<Mutex<()>> {
        self.writers
            .entry(message_id.clone())
            .or_default()
            .clone()
    }

    /// Attach a citation to a finalized message.
    ///
    /// Fails with `Validation` when `confidence` falls outside `[0, 1]` or
    /// the span does not fit the message content, and with `NotFound` when
    /// the message is absent or not yet finalized — an unfinalized message
    /// has no stable content to cite into.
    #[instrument(skip_all, fields(message_id = %message_id, record_id = %source_record_id))]
    pub async fn attach(
        &self,
        message_id: &MessageId,
        source_record_id: RecordId,
        span: Span,
        confidence: f64,
    ) -> Result<Citation> {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(LanternError::validation(
                "confidence",
                format!("must be within [0, 1], got {confidence}"),
            ));
        }

        let writer = self.writer(message_id);
        let _guard = writer.lock().await;

        let message = self.store.get_message(message_id).await?;
        if !message.finalized {
            return Err(LanternError::not_found("message", message_id.as_str()));
        }
        span.validate(message.content.len())?;

        let citation = Citation {
            id: CitationId::new(),
            message_id: message_id.clone(),
            source_record_id,
            span,
            confidence,
        };
        self.store.insert_citation(citation.clone()).await?;
        Ok(citation)
    }

    /// All citations on a message, ordered by span start.
    ///
    /// A message with no citations yields an empty list, not an error.
    pub async fn citations_for(&self, message_id: &MessageId) -> Result<Vec<Citation>> {
        self.store.list_citations(message_id).await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
