//! # lantern-history
//!
//! The branch manager: maintains the fork tree of conversation branches per
//! chat and resolves full logical history across forks.
//!
//! Branches never hold references to each other — only a `parent_message_id`
//! value into an id-indexed arena (the store). Acyclicity is structural: a
//! branch's parent message was created strictly before the branch itself. A
//! maximum-depth guard defends resolution against corrupted stores anyway.

#![deny(unsafe_code)]

pub mod manager;

pub use manager::{BranchManager, MAX_ANCESTOR_DEPTH};
