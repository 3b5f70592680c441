//! Resumable streaming.
//!
//! A [`ResumableSession`] wraps a [`Generator`] stream and saves the
//! accumulated text to a [`StreamCheckpointer`] every few chunks. If the
//! consumer disconnects, calling [`ResumableSession::stream`] again with the
//! same stream id reattaches: the saved prefix is handed to the backend as
//! `resume_from`, so the new stream yields exactly the text after the last
//! checkpoint — nothing lost, nothing repeated.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use futures::StreamExt;
use tracing::{debug, instrument};

use crate::generator::{ChunkStream, GenerateResult, Generator, Prompt};

/// Default number of chunks between checkpoint saves.
pub const DEFAULT_CHECKPOINT_EVERY: usize = 4;

/// Persists generated-so-far text per stream id.
#[async_trait]
pub trait StreamCheckpointer: Send + Sync {
    /// Persist the accumulated text for a stream.
    async fn save(&self, stream_id: &str, text_so_far: &str) -> GenerateResult<()>;

    /// Load the last saved text for a stream, if any.
    async fn load(&self, stream_id: &str) -> GenerateResult<Option<String>>;

    /// Discard a stream's checkpoint.
    async fn clear(&self, stream_id: &str) -> GenerateResult<()>;
}

/// In-process checkpointer.
#[derive(Default)]
pub struct MemoryCheckpointer {
    checkpoints: DashMap<String, String>,
}

impl MemoryCheckpointer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StreamCheckpointer for MemoryCheckpointer {
    async fn save(&self, stream_id: &str, text_so_far: &str) -> GenerateResult<()> {
        let _ = self
            .checkpoints
            .insert(stream_id.to_owned(), text_so_far.to_owned());
        Ok(())
    }

    async fn load(&self, stream_id: &str) -> GenerateResult<Option<String>> {
        Ok(self.checkpoints.get(stream_id).map(|e| e.value().clone()))
    }

    async fn clear(&self, stream_id: &str) -> GenerateResult<()> {
        let _ = self.checkpoints.remove(stream_id);
        Ok(())
    }
}

/// A generator wrapped with checkpointed, reattachable streaming.
pub struct ResumableSession {
    generator: Arc<dyn Generator>,
    checkpointer: Arc<dyn StreamCheckpointer>,
    checkpoint_every: usize,
}

impl ResumableSession {
    #[must_use]
    pub fn new(generator: Arc<dyn Generator>, checkpointer: Arc<dyn StreamCheckpointer>) -> Self {
        Self {
            generator,
            checkpointer,
            checkpoint_every: DEFAULT_CHECKPOINT_EVERY,
        }
    }

    /// Override the checkpoint cadence (in chunks). A value of 1 checkpoints
    /// after every chunk.
    #[must_use]
    pub fn with_checkpoint_every(mut self, every: usize) -> Self {
        self.checkpoint_every = every.max(1);
        self
    }

    /// Open (or reattach to) the stream identified by `stream_id`.
    ///
    /// The yielded chunks always continue from the last checkpoint; a final
    /// checkpoint is written when the backend stream ends.
    #[instrument(skip_all, fields(stream_id = %stream_id))]
    pub async fn stream(&self, stream_id: &str, prompt: &Prompt) -> GenerateResult<ChunkStream> {
        let prefix = self.checkpointer.load(stream_id).await?.unwrap_or_default();
        if !prefix.is_empty() {
            debug!(prefix_len = prefix.len(), "resuming from checkpoint");
        }

        let mut prompt = prompt.clone();
        prompt.resume_from = if prefix.is_empty() {
            None
        } else {
            Some(prefix.clone())
        };
        let mut inner = self.generator.stream(&prompt).await?;

        let checkpointer = self.checkpointer.clone();
        let checkpoint_every = self.checkpoint_every;
        let stream_id = stream_id.to_owned();

        let wrapped = async_stream::try_stream! {
            let mut accumulated = prefix;
            let mut chunks_since_save = 0_usize;
            while let Some(chunk) = inner.next().await {
                let chunk = chunk?;
                accumulated.push_str(&chunk);
                chunks_since_save += 1;
                if chunks_since_save >= checkpoint_every {
                    checkpointer.save(&stream_id, &accumulated).await?;
                    chunks_since_save = 0;
                }
                yield chunk;
            }
            checkpointer.save(&stream_id, &accumulated).await?;
        };
        Ok(Box::pin(wrapped))
    }

    /// Drop the checkpoint once the stream's content has been consumed and
    /// persisted elsewhere.
    pub async fn finish(&self, stream_id: &str) -> GenerateResult<()> {
        self.checkpointer.clear(stream_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::TemplateGenerator;

    async fn collect(mut stream: ChunkStream) -> String {
        let mut out = String::new();
        while let Some(chunk) = stream.next().await {
            out.push_str(&chunk.unwrap());
        }
        out
    }

    /// Take at most `n` chunks, then drop the stream mid-flight.
    async fn take_partial(mut stream: ChunkStream, n: usize) -> String {
        let mut out = String::new();
        for _ in 0..n {
            match stream.next().await {
                Some(chunk) => out.push_str(&chunk.unwrap()),
                None => break,
            }
        }
        out
    }

    fn session() -> ResumableSession {
        ResumableSession::new(
            Arc::new(TemplateGenerator::new()),
            Arc::new(MemoryCheckpointer::new()),
        )
        .with_checkpoint_every(1)
    }

    #[tokio::test]
    async fn uninterrupted_stream_equals_complete() {
        let session = session();
        let prompt = Prompt::new("what do people report seeing?");

        let streamed = collect(session.stream("s1", &prompt).await.unwrap()).await;
        let completed = TemplateGenerator::new().complete(&prompt).await.unwrap();
        assert_eq!(streamed, completed);
    }

    #[tokio::test]
    async fn resume_yields_no_loss_and_no_duplication() {
        let session = session();
        let prompt = Prompt::new("strange lights");
        let full = TemplateGenerator::new().complete(&prompt).await.unwrap();

        // Consume part of the stream, checkpointing after every chunk, then
        // drop it as if the consumer disconnected.
        let first_half = take_partial(session.stream("s2", &prompt).await.unwrap(), 3).await;
        assert!(!first_half.is_empty());
        assert!(full.starts_with(&first_half));

        let rest = collect(session.stream("s2", &prompt).await.unwrap()).await;
        assert_eq!(format!("{first_half}{rest}"), full);
    }

    #[tokio::test]
    async fn coarse_checkpoints_may_replay_unsaved_tail_but_never_skip() {
        // With a cadence of 3, dropping after 4 chunks means the checkpoint
        // holds 3 chunks; the resumed stream starts after chunk 3.
        let session = ResumableSession::new(
            Arc::new(TemplateGenerator::new()),
            Arc::new(MemoryCheckpointer::new()),
        )
        .with_checkpoint_every(3);
        let prompt = Prompt::new("strange lights");
        let full = TemplateGenerator::new().complete(&prompt).await.unwrap();

        let consumed = take_partial(session.stream("s3", &prompt).await.unwrap(), 4).await;
        let resumed = collect(session.stream("s3", &prompt).await.unwrap()).await;

        assert!(full.ends_with(&resumed));
        // Chunk 4 was past the last checkpoint, so it replays.
        assert!(resumed.len() >= full.len() - consumed.len());
    }

    #[tokio::test]
    async fn finish_clears_the_checkpoint() {
        let checkpointer = Arc::new(MemoryCheckpointer::new());
        let session = ResumableSession::new(
            Arc::new(TemplateGenerator::new()),
            checkpointer.clone(),
        )
        .with_checkpoint_every(1);
        let prompt = Prompt::new("orbs");

        let _ = collect(session.stream("s4", &prompt).await.unwrap()).await;
        assert!(checkpointer.load("s4").await.unwrap().is_some());

        session.finish("s4").await.unwrap();
        assert!(checkpointer.load("s4").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn streams_are_isolated_by_id() {
        let session = session();
        let a = collect(session.stream("a", &Prompt::new("first")).await.unwrap()).await;
        let b = collect(session.stream("b", &Prompt::new("second")).await.unwrap()).await;
        assert_ne!(a, b);
    }
}
