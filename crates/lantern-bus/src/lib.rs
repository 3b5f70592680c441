//! Priority-ordered envelope routing between cooperating agents.
//!
//! The [`AgentBus`] gives each registered [`Agent`] its own dispatch task and
//! mailbox: envelopes drain in priority order (FIFO within a band), one at a
//! time per agent, while distinct agents run concurrently. Request/reply is
//! correlation-id based and cancellable; a failing handler is answered with a
//! synthetic `agent_failed` envelope instead of taking the bus down.

#![deny(unsafe_code)]

mod bus;

pub use bus::{Agent, AgentBus};
