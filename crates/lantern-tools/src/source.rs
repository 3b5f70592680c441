//! Corpus access — the `search` tool and its record source delegate.
//!
//! The experience corpus lives outside this process; [`RecordSource`] is the
//! seam it plugs in through. [`SearchTool`] is the built-in tool that exposes
//! it to the planner, returning records whose ids the citation layer later
//! binds claims to.

use std::sync::Arc;

use async_trait::async_trait;
use lantern_core::SourceRecord;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::errors::ToolError;
use crate::schema::ParameterSchema;
use crate::traits::{Tool, ToolContext};

/// Hard cap on records returned from a single query.
pub const MAX_SEARCH_LIMIT: usize = 25;

const DEFAULT_SEARCH_LIMIT: usize = 5;

/// A queryable corpus of experience records.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Return records matching the query, best first, at most `limit`.
    async fn search(
        &self,
        query: &str,
        category: Option<&str>,
        limit: usize,
    ) -> Result<Vec<SourceRecord>, ToolError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Search tool
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchArgs {
    query: String,
    category: Option<String>,
    limit: Option<usize>,
}

/// The built-in corpus search tool.
pub struct SearchTool {
    source: Arc<dyn RecordSource>,
}

impl SearchTool {
    #[must_use]
    pub fn new(source: Arc<dyn RecordSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl Tool for SearchTool {
    fn name(&self) -> &str {
        "search"
    }

    fn description(&self) -> &str {
        "Search the experience corpus for records matching a free-text query."
    }

    fn parameters(&self) -> ParameterSchema {
        let props = json!({
            "query": {
                "type": "string",
                "description": "Free-text query over record narratives.",
            },
            "category": {
                "type": "string",
                "description": "Restrict matches to one category tag.",
            },
            "limit": {
                "type": "integer",
                "minimum": 1,
                "maximum": MAX_SEARCH_LIMIT,
                "description": "Maximum records to return.",
            },
        });
        let Value::Object(props) = props else {
            unreachable!("literal is an object")
        };
        ParameterSchema::object(props, &["query"])
    }

    fn result_schema(&self) -> ParameterSchema {
        let props = json!({
            "records": { "type": "array", "items": { "type": "object" } },
        });
        let Value::Object(props) = props else {
            unreachable!("literal is an object")
        };
        ParameterSchema::object(props, &["records"])
    }

    async fn execute(&self, args: Value, _ctx: &ToolContext) -> Result<Value, ToolError> {
        let args: SearchArgs = serde_json::from_value(args)?;
        let limit = args.limit.unwrap_or(DEFAULT_SEARCH_LIMIT).min(MAX_SEARCH_LIMIT);
        let records = self
            .source
            .search(&args.query, args.category.as_deref(), limit)
            .await?;
        Ok(json!({ "records": records }))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// In-memory source
// ─────────────────────────────────────────────────────────────────────────────

/// A fixed in-process corpus, for tests and offline runs.
///
/// Matching is case-insensitive substring search over the narrative and
/// location, filtered by exact category when one is given.
pub struct InMemoryRecordSource {
    records: Vec<SourceRecord>,
}

impl InMemoryRecordSource {
    #[must_use]
    pub fn new(records: Vec<SourceRecord>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl RecordSource for InMemoryRecordSource {
    async fn search(
        &self,
        query: &str,
        category: Option<&str>,
        limit: usize,
    ) -> Result<Vec<SourceRecord>, ToolError> {
        let needle = query.to_lowercase();
        let matches = self
            .records
            .iter()
            .filter(|r| category.is_none_or(|c| r.category == c))
            .filter(|r| {
                needle.is_empty()
                    || r.narrative.to_lowercase().contains(&needle)
                    || r.location.to_lowercase().contains(&needle)
            })
            .take(limit)
            .cloned()
            .collect();
        Ok(matches)
    }
}
