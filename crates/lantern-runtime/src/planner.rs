//! The built-in heuristic planner agent.
//!
//! Answers `plan` requests over the bus with a [`Plan`] derived from keyword
//! heuristics: a corpus search for anything that looks like a question about
//! the records, plus a dependent `trend-predict` stage when the message asks
//! about trends. A model-backed planner would register under the same id and
//! speak the same envelope kinds.

use async_trait::async_trait;
use lantern_bus::Agent;
use lantern_core::{AgentEnvelope, AgentId, LanternError, Result};
use serde_json::{json, Value};
use tracing::debug;

use crate::plan::{Plan, PlanStep};

/// Envelope kind for plan requests.
pub const KIND_PLAN: &str = "plan";
/// Envelope kind for plan replies.
pub const KIND_PLAN_RESULT: &str = "plan_result";

/// The default agent id plan requests are addressed to.
pub const PLANNER_AGENT_ID: &str = "planner";

const SEARCH_LIMIT: usize = 5;
const GREETINGS: &[&str] = &["hello", "hi", "hey", "thanks", "thank you", "ok", "okay"];
const TREND_KEYWORDS: &[&str] = &["trend", "predict", "pattern", "forecast"];

/// Keyword-driven planner.
#[derive(Default)]
pub struct HeuristicPlanner;

impl HeuristicPlanner {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn plan_for(user_message: &str, available_tools: &[String]) -> Plan {
        let trimmed = user_message.trim();
        let lowered = trimmed.to_lowercase();
        if trimmed.is_empty() || GREETINGS.contains(&lowered.as_str()) {
            return Plan::empty();
        }
        if !available_tools.iter().any(|t| t == "search") {
            return Plan::empty();
        }

        let mut stages = vec![vec![PlanStep::new(
            "search",
            json!({ "query": trimmed, "limit": SEARCH_LIMIT }),
        )]];

        // Trend analysis consumes search output, so it runs as a later stage.
        let wants_trend = TREND_KEYWORDS.iter().any(|k| lowered.contains(k));
        if wants_trend && available_tools.iter().any(|t| t == "trend-predict") {
            stages.push(vec![PlanStep::new(
                "trend-predict",
                json!({ "query": trimmed }),
            )]);
        }

        Plan { stages }
    }
}

#[async_trait]
impl Agent for HeuristicPlanner {
    fn id(&self) -> AgentId {
        AgentId::from(PLANNER_AGENT_ID)
    }

    async fn handle(&self, envelope: AgentEnvelope) -> Result<Vec<AgentEnvelope>> {
        if envelope.kind != KIND_PLAN {
            debug!(kind = %envelope.kind, "ignoring envelope of unexpected kind");
            return Ok(vec![]);
        }

        let user_message = envelope
            .payload
            .get("userMessage")
            .and_then(Value::as_str)
            .ok_or_else(|| LanternError::validation("userMessage", "missing from plan request"))?;
        let available_tools: Vec<String> = envelope
            .payload
            .get("tools")
            .and_then(Value::as_array)
            .map(|tools| {
                tools
                    .iter()
                    .filter_map(|t| t.get("name").and_then(Value::as_str))
                    .map(ToOwned::to_owned)
                    .collect()
            })
            .unwrap_or_default();

        let plan = Self::plan_for(user_message, &available_tools);
        debug!(steps = plan.step_count(), "plan composed");
        let payload = serde_json::to_value(&plan)
            .map_err(|e| LanternError::upstream(format!("unserializable plan: {e}")))?;
        Ok(vec![envelope.reply(self.id(), KIND_PLAN_RESULT, payload)])
    }
}
