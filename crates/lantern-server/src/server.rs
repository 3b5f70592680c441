//! `LanternServer` — router assembly and the serve loop.

use std::sync::Arc;
use std::time::Instant;

use axum::routing::get;
use axum::Router;
use lantern_citations::CitationTracker;
use lantern_history::BranchManager;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::ServerConfig;
use crate::routes;
use crate::shutdown::ShutdownCoordinator;

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Branch manager backing the chat/branch routes.
    pub branches: Arc<BranchManager>,
    /// Citation tracker backing the citation routes.
    pub citations: Arc<CitationTracker>,
    /// Shutdown coordinator.
    pub shutdown: Arc<ShutdownCoordinator>,
    /// When the server started.
    pub start_time: Instant,
}

/// The transport surface over the discovery state layer.
pub struct LanternServer {
    config: ServerConfig,
    branches: Arc<BranchManager>,
    citations: Arc<CitationTracker>,
    shutdown: Arc<ShutdownCoordinator>,
    start_time: Instant,
}

impl LanternServer {
    /// Create a server over the shared state-layer handles.
    #[must_use]
    pub fn new(
        config: ServerConfig,
        branches: Arc<BranchManager>,
        citations: Arc<CitationTracker>,
    ) -> Self {
        Self {
            config,
            branches,
            citations,
            shutdown: Arc::new(ShutdownCoordinator::new()),
            start_time: Instant::now(),
        }
    }

    /// Build the Axum router with all routes.
    #[must_use]
    pub fn router(&self) -> Router {
        let state = AppState {
            branches: self.branches.clone(),
            citations: self.citations.clone(),
            shutdown: self.shutdown.clone(),
            start_time: self.start_time,
        };

        Router::new()
            .route("/health", get(routes::health_handler))
            .route(
                "/chats/{chat_id}/branches",
                get(routes::list_branches).post(routes::create_branch),
            )
            .route(
                "/messages/{message_id}/citations",
                get(routes::message_citations),
            )
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .with_state(state)
    }

    /// Bind and serve until the shutdown token fires.
    pub async fn run(&self) -> std::io::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.config.bind_addr()).await?;
        let addr = listener.local_addr()?;
        info!(%addr, "listening");

        let token = self.shutdown.token();
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move { token.cancelled().await })
            .await
    }

    /// Get the shutdown coordinator.
    #[must_use]
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// Get the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
