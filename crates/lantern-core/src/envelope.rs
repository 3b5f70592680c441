//! Inter-agent envelope types.
//!
//! [`AgentEnvelope`] is the transient message unit routed between cooperating
//! agents (planner, analyzers, summarizer). Envelopes carry a priority band
//! for delivery ordering and a correlation ID linking a request to its reply.
//! They are never persisted.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::{AgentId, CorrelationId};

/// Envelope kind for a synthetic failure reply emitted by the bus when an
/// agent's handler fails.
pub const KIND_AGENT_FAILED: &str = "agent_failed";

/// Delivery priority band. Higher bands drain first; FIFO within a band.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Drains after everything else.
    Low,
    /// Default band.
    #[default]
    Normal,
    /// Drains first.
    High,
}

/// Envelope recipient — a single agent or every other registered agent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "id")]
pub enum Recipient {
    /// Deliver to the named agent.
    Agent(AgentId),
    /// Deliver to every registered agent except the sender.
    Broadcast,
}

/// A routed inter-agent message unit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentEnvelope {
    /// Sending agent.
    pub sender: AgentId,
    /// Recipient agent or broadcast.
    pub recipient: Recipient,
    /// Delivery priority band.
    #[serde(default)]
    pub priority: Priority,
    /// Message kind discriminator (e.g. `"plan"`, `"plan_result"`).
    pub kind: String,
    /// Message payload — shape varies by kind.
    pub payload: Value,
    /// Correlation ID linking this envelope to the request it answers (or the
    /// reply it expects).
    pub correlation_id: CorrelationId,
}

impl AgentEnvelope {
    /// Create a request envelope addressed to a single agent with a fresh
    /// correlation ID.
    #[must_use]
    pub fn request(
        sender: AgentId,
        recipient: AgentId,
        kind: impl Into<String>,
        payload: Value,
    ) -> Self {
        Self {
            sender,
            recipient: Recipient::Agent(recipient),
            priority: Priority::Normal,
            kind: kind.into(),
            payload,
            correlation_id: CorrelationId::new(),
        }
    }

    /// Create a reply to this envelope, swapping sender and recipient and
    /// carrying the same correlation ID.
    #[must_use]
    pub fn reply(&self, sender: AgentId, kind: impl Into<String>, payload: Value) -> Self {
        Self {
            sender,
            recipient: Recipient::Agent(self.sender.clone()),
            priority: self.priority,
            kind: kind.into(),
            payload,
            correlation_id: self.correlation_id.clone(),
        }
    }

    /// Set the priority band.
    #[must_use]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
