//! Provenance tracking for assistant messages.
//!
//! Every factual claim in a finalized assistant message can be bound to the
//! source record it came from via a [`Citation`]: a character span over the
//! message content plus the record id and a confidence score. The
//! [`CitationTracker`] owns attachment validation and per-message ordering.
//!
//! [`Citation`]: lantern_core::Citation

#![deny(unsafe_code)]

mod tracker;

pub use tracker::CitationTracker;
