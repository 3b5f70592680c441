//! # lantern-store
//!
//! The opaque persistence interface Lantern consumes.
//!
//! The persistence engine's internals are an external collaborator; the
//! orchestration layer only requires the narrow [`Store`] trait: insert,
//! get-by-id, "list children of X" ordered by creation time or ordinal, and a
//! per-branch single-writer mutual-exclusion primitive. [`MemoryStore`] is
//! the in-process reference implementation used by the runtime default wiring
//! and by tests.

#![deny(unsafe_code)]

pub mod memory;
pub mod store;

pub use memory::MemoryStore;
pub use store::Store;
