//! Runtime tuning knobs.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Timeouts for a turn's suspension points.
///
/// Per-tool timeouts live on the tools themselves; these bound the planner
/// round-trip and the composing step.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RuntimeConfig {
    /// Bound on the planner request round-trip, in milliseconds.
    pub planner_timeout_ms: u64,
    /// Bound on reply composition, in milliseconds.
    pub generation_timeout_ms: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            planner_timeout_ms: 15_000,
            generation_timeout_ms: 30_000,
        }
    }
}

impl RuntimeConfig {
    #[must_use]
    pub fn planner_timeout(&self) -> Duration {
        Duration::from_millis(self.planner_timeout_ms)
    }

    #[must_use]
    pub fn generation_timeout(&self) -> Duration {
        Duration::from_millis(self.generation_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.planner_timeout(), Duration::from_secs(15));
        assert_eq!(config.generation_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: RuntimeConfig =
            serde_json::from_str(r#"{ "plannerTimeoutMs": 500 }"#).unwrap();
        assert_eq!(config.planner_timeout_ms, 500);
        assert_eq!(config.generation_timeout_ms, 30_000);
    }
}
