//! Deterministic template backend.
//!
//! Composes a reply purely from the prompt: one sentence per cited record,
//! with a `[[rec:<id>]]` marker after each claim so the orchestrator can bind
//! citations to final text offsets. Used by tests and offline runs; a model
//! backend implements the same trait.

use async_trait::async_trait;
use lantern_core::ToolCallStatus;
use serde_json::Value;

use crate::generator::{ChunkStream, GenerateError, GenerateResult, Generator, Prompt};

const CHUNK_CHARS: usize = 16;
const MAX_RECORDS_PER_CALL: usize = 3;
const SNIPPET_CHARS: usize = 100;

/// A generator with no model behind it.
#[derive(Default)]
pub struct TemplateGenerator;

impl TemplateGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn compose(prompt: &Prompt) -> String {
        let mut body = String::new();

        for call in &prompt.tool_results {
            match call.status {
                ToolCallStatus::Complete => {
                    let records = call
                        .result
                        .as_ref()
                        .and_then(|r| r.get("records"))
                        .and_then(Value::as_array);
                    if let Some(records) = records {
                        for record in records.iter().take(MAX_RECORDS_PER_CALL) {
                            push_record_sentence(&mut body, record);
                        }
                    } else if let Some(result) = &call.result {
                        body.push_str(&format!(
                            "The {} tool reported: {result}. ",
                            call.tool_name
                        ));
                    }
                }
                ToolCallStatus::Failed => {
                    body.push_str(&format!(
                        "The {} result is unavailable. ",
                        call.tool_name
                    ));
                }
                ToolCallStatus::Pending => {}
            }
        }

        if body.is_empty() {
            format!(
                "I couldn't find anything in the corpus about \"{}\".",
                prompt.user_message
            )
        } else {
            format!(
                "Here is what the corpus holds on \"{}\": {}",
                prompt.user_message,
                body.trim_end()
            )
        }
    }
}

fn push_record_sentence(body: &mut String, record: &Value) {
    let Some(id) = record.get("id").and_then(Value::as_str) else {
        return;
    };
    let location = record
        .get("location")
        .and_then(Value::as_str)
        .unwrap_or("an unknown location");
    let narrative = record
        .get("narrative")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let snippet: String = narrative.chars().take(SNIPPET_CHARS).collect();
    let snippet = snippet.trim_end_matches(['.', ' ']);
    body.push_str(&format!(
        "A report from {location} describes: {snippet} [[rec:{id}]]. "
    ));
}

#[async_trait]
impl Generator for TemplateGenerator {
    fn name(&self) -> &str {
        "template"
    }

    async fn complete(&self, prompt: &Prompt) -> GenerateResult<String> {
        let full = Self::compose(prompt);
        match &prompt.resume_from {
            None => Ok(full),
            Some(prefix) => full
                .strip_prefix(prefix.as_str())
                .map(ToOwned::to_owned)
                .ok_or_else(|| {
                    GenerateError::backend("resume prefix diverges from regenerated text", false)
                }),
        }
    }

    async fn stream(&self, prompt: &Prompt) -> GenerateResult<ChunkStream> {
        let text = self.complete(prompt).await?;
        let chunks = chunk_text(&text, CHUNK_CHARS);
        Ok(Box::pin(futures::stream::iter(chunks.into_iter().map(Ok))))
    }
}

/// Split at char boundaries into pieces of at most `size` chars.
fn chunk_text(text: &str, size: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    for ch in text.chars() {
        current.push(ch);
        if current.chars().count() >= size {
            chunks.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
