//! # lantern-server
//!
//! Thin Axum transport surface over the discovery state layer.
//!
//! - HTTP endpoints: branch listing and creation, citation lookup, health
//! - Error mapping from `LanternError` to HTTP status codes
//! - Graceful shutdown via `CancellationToken`
//!
//! The server holds no domain logic of its own; handlers are pass-throughs
//! to `BranchManager` and `CitationTracker`.

#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod health;
pub mod routes;
pub mod server;
pub mod shutdown;

pub use config::ServerConfig;
pub use error::ApiError;
pub use server::{AppState, LanternServer};
pub use shutdown::ShutdownCoordinator;
