//! The discovery session — one turn at a time.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use lantern_bus::AgentBus;
use lantern_citations::CitationTracker;
use lantern_core::{
    AgentEnvelope, AgentId, BranchId, ChatId, Citation, LanternError, Message, MessageId,
    Priority, Role, ToolCall, ToolCallId,
};
use lantern_generate::{Generator, Prompt};
use lantern_history::BranchManager;
use lantern_store::Store;
use lantern_tools::{ToolContext, ToolInvoker, ToolRegistry};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::claims::{extract_claims, Claim};
use crate::config::RuntimeConfig;
use crate::plan::Plan;
use crate::planner::{KIND_PLAN, KIND_PLAN_RESULT, PLANNER_AGENT_ID};

/// The agent id the orchestrator sends bus requests as.
pub const ORCHESTRATOR_AGENT_ID: &str = "orchestrator";

const DEFAULT_CLAIM_CONFIDENCE: f64 = 0.9;
const PLANNER_FALLBACK_TEXT: &str =
    "I wasn't able to plan an answer for this message. Please try again.";
const GENERATION_FALLBACK_TEXT: &str =
    "I gathered the material but couldn't compose a full answer this time.";

/// Where a turn ended up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnState {
    /// User message persisted.
    Received,
    /// Awaiting the planner.
    Planning,
    /// Running planned tool calls.
    Executing,
    /// Awaiting reply composition.
    Composing,
    /// Assistant message persisted with tool calls and citations.
    Finalized,
    /// A degraded assistant message was persisted instead.
    Failed,
}

/// What a finished turn hands back to the caller. Rendering is external.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnResponse {
    /// Terminal state — `Finalized` or `Failed`.
    pub state: TurnState,
    /// The persisted assistant message.
    pub message: Message,
    /// Citations attached to the message, ordered by span start.
    pub citations: Vec<Citation>,
    /// Tool calls in plan order.
    pub tool_calls: Vec<ToolCall>,
}

/// Errors that abort a turn without leaving a transcript entry.
#[derive(Debug, thiserror::Error)]
pub enum TurnError {
    /// The turn was cancelled; its messages were rolled back.
    #[error("turn cancelled")]
    Cancelled,

    /// The state layer itself failed.
    #[error(transparent)]
    Internal(#[from] LanternError),
}

/// Drives turns through Received → Planning → Executing → Composing →
/// Finalized (or Failed).
///
/// Turns on unrelated branches run concurrently. Turns on the same branch
/// are serialized through a per-branch guard: the turn's draft messages stay
/// the branch tail until it finalizes or rolls back, so a cancelled turn can
/// always discard them completely.
pub struct DiscoverySession {
    store: Arc<dyn Store>,
    branches: Arc<BranchManager>,
    citations: Arc<CitationTracker>,
    registry: Arc<ToolRegistry>,
    invoker: ToolInvoker,
    bus: Arc<AgentBus>,
    generator: Arc<dyn Generator>,
    config: RuntimeConfig,
    turn_guards: DashMap<BranchId, Arc<Mutex<()>>>,
}

impl DiscoverySession {
    /// Assemble a session over shared state-layer handles.
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        branches: Arc<BranchManager>,
        citations: Arc<CitationTracker>,
        registry: Arc<ToolRegistry>,
        bus: Arc<AgentBus>,
        generator: Arc<dyn Generator>,
        config: RuntimeConfig,
    ) -> Self {
        Self {
            store,
            branches,
            citations,
            invoker: ToolInvoker::new(registry.clone()),
            registry,
            bus,
            generator,
            config,
            turn_guards: DashMap::new(),
        }
    }

    fn turn_guard(&self, branch_id: &BranchId) -> Arc<Mutex<()>> {
        self.turn_guards
            .entry(branch_id.clone())
            .or_default()
            .value()
            .clone()
    }

    /// Run one turn to completion.
    ///
    /// Cancellation at any suspension point rolls the turn's messages back
    /// and returns `TurnError::Cancelled`; nothing from the turn stays
    /// visible. Every other failure still finalizes a message — degraded and
    /// `Failed` in the worst case.
    #[instrument(skip_all, fields(chat_id = %chat_id, branch_id = %branch_id))]
    pub async fn run_turn(
        &self,
        chat_id: &ChatId,
        branch_id: &BranchId,
        user_text: &str,
        cancel: CancellationToken,
    ) -> Result<TurnResponse, TurnError> {
        // One turn at a time per branch: the drafts below must still be the
        // branch tail if this turn is cancelled and rolled back.
        let guard = self.turn_guard(branch_id);
        let _turn = guard.lock().await;

        // Received: reserve both ordinals up front.
        let user_msg = self
            .branches
            .append_message(branch_id, Role::User, user_text, false)
            .await?;
        let assistant_msg = match self
            .branches
            .append_message(branch_id, Role::Assistant, "", false)
            .await
        {
            Ok(message) => message,
            Err(e) => {
                self.discard_quietly(&user_msg.id).await;
                return Err(e.into());
            }
        };
        debug!(user_ordinal = user_msg.ordinal, "turn received");

        match self
            .drive(chat_id, branch_id, &user_msg, &assistant_msg, user_text, &cancel)
            .await
        {
            Ok(response) => {
                info!(state = ?response.state, citations = response.citations.len(), "turn done");
                Ok(response)
            }
            Err(err) => {
                self.discard_quietly(&assistant_msg.id).await;
                self.discard_quietly(&user_msg.id).await;
                Err(err)
            }
        }
    }

    async fn drive(
        &self,
        chat_id: &ChatId,
        branch_id: &BranchId,
        user_msg: &Message,
        assistant_msg: &Message,
        user_text: &str,
        cancel: &CancellationToken,
    ) -> Result<TurnResponse, TurnError> {
        // Planning
        let history = self.branches.resolve_history(branch_id).await?;
        let Some(plan) = self.request_plan(user_text, &history, cancel).await? else {
            return self
                .finalize_turn(
                    user_msg,
                    assistant_msg,
                    Vec::new(),
                    PLANNER_FALLBACK_TEXT.to_owned(),
                    Vec::new(),
                    true,
                )
                .await;
        };

        // Executing
        let tool_calls = self
            .execute_plan(&plan, chat_id, branch_id, &assistant_msg.id, cancel)
            .await?;

        // Composing
        let prompt = Prompt::new(user_text)
            .with_history((*history).clone())
            .with_tool_results(tool_calls.clone());
        let Some(text) = self.compose(&prompt, cancel).await? else {
            return self
                .finalize_turn(
                    user_msg,
                    assistant_msg,
                    tool_calls,
                    GENERATION_FALLBACK_TEXT.to_owned(),
                    Vec::new(),
                    true,
                )
                .await;
        };

        let (clean_text, claims) = extract_claims(&text);
        self.finalize_turn(user_msg, assistant_msg, tool_calls, clean_text, claims, false)
            .await
    }

    async fn request_plan(
        &self,
        user_text: &str,
        history: &[Message],
        cancel: &CancellationToken,
    ) -> Result<Option<Plan>, TurnError> {
        let request = AgentEnvelope::request(
            AgentId::from(ORCHESTRATOR_AGENT_ID),
            AgentId::from(PLANNER_AGENT_ID),
            KIND_PLAN,
            json!({
                "userMessage": user_text,
                "history": history,
                "tools": self.registry.definitions(),
            }),
        )
        .with_priority(Priority::High);
        let correlation_id = request.correlation_id.clone();

        let reply = tokio::select! {
            () = cancel.cancelled() => {
                self.bus.cancel(&correlation_id);
                return Err(TurnError::Cancelled);
            }
            reply = self.bus.request(request, self.config.planner_timeout()) => reply,
        };

        match reply {
            Ok(envelope) if envelope.kind == KIND_PLAN_RESULT => {
                match serde_json::from_value::<Plan>(envelope.payload) {
                    Ok(plan) => {
                        debug!(steps = plan.step_count(), "plan received");
                        Ok(Some(plan))
                    }
                    Err(e) => {
                        warn!(error = %e, "planner reply was not a plan");
                        Ok(None)
                    }
                }
            }
            Ok(envelope) => {
                warn!(kind = %envelope.kind, "planner answered with a failure");
                Ok(None)
            }
            Err(e) => {
                warn!(error = %e, "planner unreachable");
                Ok(None)
            }
        }
    }

    async fn execute_plan(
        &self,
        plan: &Plan,
        chat_id: &ChatId,
        branch_id: &BranchId,
        message_id: &MessageId,
        cancel: &CancellationToken,
    ) -> Result<Vec<ToolCall>, TurnError> {
        let mut tool_calls = Vec::with_capacity(plan.step_count());
        let mut next_index: u32 = 0;

        for stage in &plan.stages {
            if cancel.is_cancelled() {
                return Err(TurnError::Cancelled);
            }
            let mut stage_futures = Vec::with_capacity(stage.len());
            for step in stage {
                let ctx = ToolContext {
                    tool_call_id: ToolCallId::new(),
                    chat_id: chat_id.clone(),
                    branch_id: branch_id.clone(),
                    cancellation: cancel.child_token(),
                };
                stage_futures.push(self.invoker.invoke(
                    message_id.clone(),
                    next_index,
                    &step.tool_name,
                    step.arguments.clone(),
                    ctx,
                ));
                next_index += 1;
            }
            // join_all preserves submission order, so results land in plan
            // order no matter which call finishes first.
            tool_calls.extend(futures::future::join_all(stage_futures).await);
        }

        if cancel.is_cancelled() {
            return Err(TurnError::Cancelled);
        }
        Ok(tool_calls)
    }

    async fn compose(
        &self,
        prompt: &Prompt,
        cancel: &CancellationToken,
    ) -> Result<Option<String>, TurnError> {
        let generation =
            tokio::time::timeout(self.config.generation_timeout(), self.generator.complete(prompt));
        tokio::select! {
            () = cancel.cancelled() => Err(TurnError::Cancelled),
            outcome = generation => match outcome {
                Ok(Ok(text)) => Ok(Some(text)),
                Ok(Err(e)) => {
                    warn!(error = %e, "generation failed");
                    Ok(None)
                }
                Err(_elapsed) => {
                    warn!(timeout_ms = self.config.generation_timeout_ms, "generation timed out");
                    Ok(None)
                }
            }
        }
    }

    async fn finalize_turn(
        &self,
        user_msg: &Message,
        assistant_msg: &Message,
        tool_calls: Vec<ToolCall>,
        content: String,
        claims: Vec<Claim>,
        degraded: bool,
    ) -> Result<TurnResponse, TurnError> {
        for call in &tool_calls {
            self.store.insert_tool_call(call.clone()).await?;
        }
        let _ = self
            .branches
            .finalize_message(&user_msg.id, None, false)
            .await?;
        let message = self
            .branches
            .finalize_message(&assistant_msg.id, Some(content), degraded)
            .await?;

        let citations = self.attach_claims(&message, &tool_calls, claims).await;
        let state = if degraded {
            TurnState::Failed
        } else {
            TurnState::Finalized
        };
        Ok(TurnResponse {
            state,
            message,
            citations,
            tool_calls,
        })
    }

    /// Bind claims to their source records. An individual attach failure
    /// degrades that claim to uncited; it never fails the turn.
    async fn attach_claims(
        &self,
        message: &Message,
        tool_calls: &[ToolCall],
        claims: Vec<Claim>,
    ) -> Vec<Citation> {
        let known = tool_sourced_record_ids(tool_calls);
        let mut citations = Vec::new();
        for claim in claims {
            if !known.contains(claim.record_id.as_str()) {
                warn!(record_id = %claim.record_id, "claim cites a record no tool returned");
                continue;
            }
            match self
                .citations
                .attach(
                    &message.id,
                    claim.record_id.clone(),
                    claim.span,
                    DEFAULT_CLAIM_CONFIDENCE,
                )
                .await
            {
                Ok(citation) => citations.push(citation),
                Err(e) => {
                    warn!(record_id = %claim.record_id, error = %e, "citation attach failed, claim left uncited");
                }
            }
        }
        citations
    }

    async fn discard_quietly(&self, message_id: &MessageId) {
        if let Err(e) = self.branches.discard_message(message_id).await {
            warn!(message_id = %message_id, error = %e, "turn rollback could not discard message");
        }
    }
}

/// Record ids appearing in completed tool results.
fn tool_sourced_record_ids(tool_calls: &[ToolCall]) -> HashSet<String> {
    let mut ids = HashSet::new();
    for call in tool_calls {
        let Some(records) = call
            .result
            .as_ref()
            .and_then(|r| r.get("records"))
            .and_then(serde_json::Value::as_array)
        else {
            continue;
        };
        for record in records {
            if let Some(id) = record.get("id").and_then(serde_json::Value::as_str) {
                let _ = ids.insert(id.to_owned());
            }
        }
    }
    ids
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
