use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use tracing::info;

use crate::{
    cli::config::{AppConfig, StoreBackend},
    client::healing_client::HealingClient,
    fingerprint::{extractor::extract, fingerprint_model::Fingerprint, page_key::resolve_page_key},
    healing::{engine::HealingEngine, healing_model::HealOutcome},
    repository::{FingerprintRepository, JsonFileRepository, MemoryRepository},
    server::{AppState, serve},
    snapshot::parser::MarkupSnapshot,
    trace::logger::TraceLogger,
};

// ============================================================================
// Engine assembly
// ============================================================================

/// Build the engine described by `config`: repository backend plus optional
/// audit trail.
pub fn build_engine(config: &AppConfig) -> Result<HealingEngine> {
    let repository: Arc<dyn FingerprintRepository> = match config.store.backend {
        StoreBackend::Memory => Arc::new(MemoryRepository::new()),
        StoreBackend::File => Arc::new(
            JsonFileRepository::open(&config.store.dir)
                .with_context(|| format!("Failed to open store at {}", config.store.dir))?,
        ),
    };

    let mut engine = HealingEngine::new(repository, config.healing.clone());

    if let Some(path) = &config.trace.path {
        let tracer = TraceLogger::open(path)
            .with_context(|| format!("Failed to open trace file {}", path))?;
        engine = engine.with_tracer(Arc::new(tracer));
    }

    Ok(engine)
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")
}

// ============================================================================
// serve subcommand
// ============================================================================

pub fn cmd_serve(mut config: AppConfig, host: Option<String>, port: Option<u16>) -> Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let engine = build_engine(&config)?;
    info!(
        threshold = engine.config().threshold,
        backend = ?config.store.backend,
        "Starting healing server"
    );

    let rt = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    rt.block_on(async {
        let addr = format!("{}:{}", config.server.host, config.server.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;
        serve(listener, AppState::new(engine))
            .await
            .context("Server error")
    })
}

// ============================================================================
// learn subcommand
// ============================================================================

/// Extract the element with `id` from a snapshot file and learn it.
pub fn cmd_learn(
    config: &AppConfig,
    page: &str,
    id: &str,
    snapshot_path: &str,
    server: Option<&str>,
) -> Result<Fingerprint> {
    let markup = std::fs::read_to_string(snapshot_path)
        .with_context(|| format!("Failed to read snapshot {}", snapshot_path))?;
    let page_key = resolve_page_key(page);

    let element = MarkupSnapshot::parse(&markup)
        .find_by_id(id)
        .ok_or_else(|| anyhow!("No element with id '{}' in {}", id, snapshot_path))?;
    let fingerprint = extract(id, &element);

    match server {
        Some(url) => Ok(HealingClient::new(url)?.learn(&page_key, id, &fingerprint.descriptor)?),
        None => {
            let engine = build_engine(config)?;
            Ok(runtime()?.block_on(engine.learn(&page_key, id, fingerprint.descriptor))?)
        }
    }
}

// ============================================================================
// heal subcommand
// ============================================================================

pub fn cmd_heal(
    config: &AppConfig,
    page: &str,
    broken_id: &str,
    snapshot_path: &str,
    server: Option<&str>,
) -> Result<HealOutcome> {
    let markup = std::fs::read_to_string(snapshot_path)
        .with_context(|| format!("Failed to read snapshot {}", snapshot_path))?;
    let page_key = resolve_page_key(page);

    match server {
        Some(url) => Ok(HealingClient::new(url)?.heal(&page_key, broken_id, &markup)?),
        None => {
            let engine = build_engine(config)?;
            Ok(runtime()?.block_on(engine.heal(&page_key, broken_id, &markup))?)
        }
    }
}

/// Process exit code for a heal outcome: 0 healed, 2 ambiguous, 1 otherwise.
pub fn heal_exit_code(outcome: &HealOutcome) -> i32 {
    match outcome {
        HealOutcome::Healed { .. } => 0,
        HealOutcome::Ambiguous { .. } => 2,
        HealOutcome::NotFound { .. } | HealOutcome::NoFingerprint => 1,
    }
}
