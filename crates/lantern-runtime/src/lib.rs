//! The per-turn orchestrator.
//!
//! A [`DiscoverySession`] drives one conversational turn through its state
//! machine: persist the user message, ask the planner agent for a tool plan,
//! execute the plan's stages (concurrent within a stage, ordered across
//! stages), compose the reply, bind citations to final text offsets, and
//! finalize. Every failure mode short of cancellation still leaves a
//! well-formed, possibly degraded, assistant message in the transcript.

#![deny(unsafe_code)]

pub mod claims;
pub mod config;
pub mod plan;
pub mod planner;

mod session;

pub use config::RuntimeConfig;
pub use plan::{Plan, PlanStep};
pub use planner::HeuristicPlanner;
pub use session::{DiscoverySession, TurnError, TurnResponse, TurnState};
