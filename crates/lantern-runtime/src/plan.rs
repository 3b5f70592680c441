//! Tool plans produced by the planner agent.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One scheduled tool invocation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanStep {
    /// Registered tool name.
    pub tool_name: String,
    /// Arguments, validated by the invoker against the tool's schema.
    pub arguments: Value,
}

impl PlanStep {
    #[must_use]
    pub fn new(tool_name: impl Into<String>, arguments: Value) -> Self {
        Self {
            tool_name: tool_name.into(),
            arguments,
        }
    }
}

/// An ordered sequence of stages.
///
/// Steps within one stage have no mutual data dependency and run
/// concurrently; stages run in order. An empty plan is valid — the reply is
/// composed from the conversation alone.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    /// Stages in execution order.
    #[serde(default)]
    pub stages: Vec<Vec<PlanStep>>,
}

impl Plan {
    /// A plan with no tool calls.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// A one-stage plan.
    #[must_use]
    pub fn single_stage(steps: Vec<PlanStep>) -> Self {
        Self {
            stages: vec![steps],
        }
    }

    /// Total step count across stages.
    #[must_use]
    pub fn step_count(&self) -> usize {
        self.stages.iter().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.step_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_plan_is_valid() {
        let plan = Plan::empty();
        assert!(plan.is_empty());
        assert_eq!(plan.step_count(), 0);
    }

    #[test]
    fn step_count_spans_stages() {
        let plan = Plan {
            stages: vec![
                vec![
                    PlanStep::new("search", json!({ "query": "a" })),
                    PlanStep::new("search", json!({ "query": "b" })),
                ],
                vec![PlanStep::new("trend-predict", json!({}))],
            ],
        };
        assert_eq!(plan.step_count(), 3);
        assert!(!plan.is_empty());
    }

    #[test]
    fn serde_roundtrip() {
        let plan = Plan::single_stage(vec![PlanStep::new("search", json!({ "query": "orbs" }))]);
        let value = serde_json::to_value(&plan).unwrap();
        assert_eq!(value["stages"][0][0]["toolName"], "search");
        let back: Plan = serde_json::from_value(value).unwrap();
        assert_eq!(back, plan);
    }

    #[test]
    fn missing_stages_deserializes_to_empty() {
        let plan: Plan = serde_json::from_str("{}").unwrap();
        assert!(plan.is_empty());
    }
}
