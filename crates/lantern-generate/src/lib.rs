//! Text generation behind a provider-agnostic trait.
//!
//! [`Generator`] is the seam a model backend plugs in through: one-shot
//! completion plus incremental streaming. Streams are resumable — a
//! [`StreamCheckpointer`] periodically persists the generated-so-far text so a
//! dropped stream can reattach from its last checkpoint without losing or
//! duplicating output. [`TemplateGenerator`] is the deterministic built-in
//! backend used in tests and offline runs; it cites records with
//! `[[rec:<id>]]` markers the orchestrator later resolves into citations.

#![deny(unsafe_code)]

mod checkpoint;
mod generator;
mod template;

pub use checkpoint::{MemoryCheckpointer, ResumableSession, StreamCheckpointer};
pub use generator::{ChunkStream, GenerateError, GenerateResult, Generator, Prompt};
pub use template::TemplateGenerator;
