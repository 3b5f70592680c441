//! # lantern-agent
//!
//! Lantern discovery server binary — wires the state layer, tool registry,
//! planner bus, and generator together and starts the HTTP server.

#![deny(unsafe_code)]

mod config;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{TimeZone, Utc};
use clap::Parser;
use lantern_bus::AgentBus;
use lantern_citations::CitationTracker;
use lantern_core::{RecordId, SourceRecord};
use lantern_generate::{Generator, TemplateGenerator};
use lantern_history::BranchManager;
use lantern_runtime::{DiscoverySession, HeuristicPlanner};
use lantern_server::LanternServer;
use lantern_store::{MemoryStore, Store};
use lantern_tools::{InMemoryRecordSource, SearchTool, ToolRegistry};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use crate::config::AgentConfig;

/// Lantern discovery server.
#[derive(Parser, Debug)]
#[command(name = "lantern-agent", about = "Lantern discovery server")]
struct Cli {
    /// Path to a JSON config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Host to bind (overrides config).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (overrides config; 0 for auto-assign).
    #[arg(long)]
    port: Option<u16>,

    /// Path to a JSON corpus of source records (overrides config).
    #[arg(long)]
    corpus: Option<PathBuf>,

    /// Ask a single question, print the answer with citations, and exit.
    #[arg(long)]
    ask: Option<String>,
}

fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Read the corpus from `path`, or fall back to the built-in sample set.
fn load_corpus(path: Option<&Path>) -> Result<Vec<SourceRecord>> {
    let Some(path) = path else {
        return Ok(sample_corpus());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read corpus file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("corpus file {} is not a record array", path.display()))
}

/// A small built-in corpus so the binary is usable out of the box.
fn sample_corpus() -> Vec<SourceRecord> {
    let record = |narrative: &str, category: &str, y, mo, d, location: &str| SourceRecord {
        id: RecordId::new(),
        narrative: narrative.to_owned(),
        category: category.to_owned(),
        occurred_at: Utc
            .with_ymd_and_hms(y, mo, d, 21, 0, 0)
            .single()
            .unwrap_or_else(Utc::now),
        location: location.to_owned(),
    };
    vec![
        record(
            "A V-shaped formation of lights crossed the sky over the course of several minutes, \
             reported independently by dozens of callers.",
            "sighting",
            1997,
            3,
            13,
            "Phoenix, AZ",
        ),
        record(
            "A glowing disc hovered silently above the treeline before accelerating straight up.",
            "sighting",
            1994,
            9,
            16,
            "Ruwa, Zimbabwe",
        ),
        record(
            "Radar operators tracked an object performing right-angle turns at high speed.",
            "radar",
            1986,
            11,
            17,
            "Anchorage, AK",
        ),
        record(
            "A farmer described a humming orb that followed the irrigation channel at dusk.",
            "sighting",
            2004,
            6,
            2,
            "Bakersfield, CA",
        ),
    ]
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let mut cfg = AgentConfig::load(args.config.as_deref()).context("failed to load config")?;
    if let Some(host) = args.host {
        cfg.server.host = host;
    }
    if let Some(port) = args.port {
        cfg.server.port = port;
    }
    if let Some(corpus) = args.corpus {
        cfg.corpus_path = Some(corpus);
    }

    init_tracing(&cfg.log_filter);

    // State layer
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let branches = Arc::new(BranchManager::new(store.clone()));
    let citations = Arc::new(CitationTracker::new(store.clone()));

    // Tools over the corpus
    let records = load_corpus(cfg.corpus_path.as_deref())?;
    tracing::info!(record_count = records.len(), "corpus loaded");
    let mut registry = ToolRegistry::new();
    registry
        .register(Arc::new(SearchTool::new(Arc::new(
            InMemoryRecordSource::new(records),
        ))))
        .context("failed to register search tool")?;
    let registry = Arc::new(registry);

    // Planner on the bus
    let bus = Arc::new(AgentBus::new());
    bus.register(Arc::new(HeuristicPlanner::new()))
        .context("failed to register planner")?;

    let generator: Arc<dyn Generator> = Arc::new(TemplateGenerator::new());
    let session = DiscoverySession::new(
        store,
        branches.clone(),
        citations.clone(),
        registry,
        bus.clone(),
        generator,
        cfg.runtime.clone(),
    );

    if let Some(question) = args.ask {
        ask_once(&session, &branches, &question).await?;
        bus.shutdown().await;
        return Ok(());
    }

    let server = LanternServer::new(cfg.server.clone(), branches, citations);
    let shutdown = server.shutdown().clone();
    let _ = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown signal received");
            shutdown.shutdown();
        }
    });

    server.run().await.context("server failed")?;
    bus.shutdown().await;
    tracing::info!("shutdown complete");
    Ok(())
}

/// One-shot mode: run a single turn against a fresh chat and print it.
async fn ask_once(
    session: &DiscoverySession,
    branches: &BranchManager,
    question: &str,
) -> Result<()> {
    let (chat, root) = branches
        .create_chat("cli", "main")
        .await
        .context("failed to create chat")?;
    let response = session
        .run_turn(&chat.id, &root.id, question, CancellationToken::new())
        .await
        .context("turn failed")?;

    println!("{}", response.message.content);
    for citation in &response.citations {
        println!(
            "  [{}..{}] record {}",
            citation.span.start, citation.span.end, citation.source_record_id
        );
    }
    Ok(())
}
