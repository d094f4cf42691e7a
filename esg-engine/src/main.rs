//! esg-engine - ESG selection bus and scoring service
//!
//! Serves the selection/report HTTP API and SSE event stream by default, or
//! runs a single report cycle from the command line with `generate`.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use esg_common::config::{ConfigResolver, EngineConfig};
use esg_common::events::{
    progress_percent, AnalysisMode, BusEvent, ScoreValue, Selection, Topic,
};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use esg_engine::export::ExportDocument;
use esg_engine::services::EmitOutcome;
use esg_engine::{AppState, EsgEngine};

/// Command-line arguments for esg-engine
#[derive(Parser, Debug)]
#[command(name = "esg-engine")]
#[command(about = "ESG selection bus and scoring engine")]
#[command(version)]
struct Args {
    /// Config file (TOML)
    #[arg(short, long, env = "ESG_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on (overrides the config file)
    #[arg(short, long, env = "ESG_PORT")]
    port: Option<u16>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP/SSE server (default)
    Serve,

    /// Run one report cycle and print the report as JSON
    Generate {
        /// Parameter label (repeatable)
        #[arg(long = "parameter", required = true)]
        parameters: Vec<String>,

        /// Entity id, e.g. USA (repeatable)
        #[arg(long = "entity", required = true)]
        entities: Vec<String>,

        /// Quick analysis instead of the full report
        #[arg(long)]
        quick: bool,

        /// Directory to write the export document into
        #[arg(long)]
        export: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config =
        EngineConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(port) = args.port {
        config.server.port = port;
    }

    // Initialize tracing; RUST_LOG overrides the configured level
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("esg-engine version {}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration source: {:?}",
        ConfigResolver::new().resolve(args.config.as_deref())
    );

    let engine = Arc::new(
        EsgEngine::from_config(config).context("Failed to initialize engine")?,
    );

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(engine).await,
        Command::Generate {
            parameters,
            entities,
            quick,
            export,
        } => generate(engine, parameters, entities, quick, export).await,
    }
}

async fn serve(engine: Arc<EsgEngine>) -> Result<()> {
    let server = &engine.config().server;
    let addr: SocketAddr = format!("{}:{}", server.host, server.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", server.host, server.port))?;

    let app = esg_engine::build_router(AppState::new(Arc::clone(&engine)));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn generate(
    engine: Arc<EsgEngine>,
    parameters: Vec<String>,
    entities: Vec<String>,
    quick: bool,
    export: Option<PathBuf>,
) -> Result<()> {
    let store = engine.store();
    for label in parameters {
        store.set(Selection::Parameter(label));
    }
    for id in entities {
        if engine.catalog().entity(&id).is_none() {
            warn!(entity = %id, "Entity is not in the entity directory");
        }
        store.set(Selection::Entity(id));
    }
    if quick {
        store.set(Selection::AnalysisMode(AnalysisMode::Quick));
    }

    let _progress = engine.bus().subscribe(Topic::FetchProgress, |event| {
        if let BusEvent::FetchProgress { completed, total, .. } = event {
            info!(
                "Progress: {}/{} ({}%)",
                completed,
                total,
                progress_percent(*completed, *total)
            );
        }
    });

    let report = match engine.generate_report().await? {
        EmitOutcome::Published(report) => report,
        EmitOutcome::Stale { cycle_id, .. } => {
            anyhow::bail!("Report cycle {} was superseded", cycle_id)
        }
    };

    for entity in &report.entity_scores {
        let summary: Vec<String> = entity
            .category_scores()
            .iter()
            .map(|score| match score.value {
                ScoreValue::Value(v) => format!("{}={}", score.category, v),
                ScoreValue::NoData => format!("{}=no data", score.category),
            })
            .collect();
        info!(entity = %entity.entity_id, "{}: {}", entity.display_name, summary.join(", "));
    }

    println!("{}", serde_json::to_string_pretty(&*report)?);

    if let Some(dir) = export {
        let path = ExportDocument::new(report)
            .write_to_dir(&dir)
            .context("Failed to write export")?;
        info!("Export written to {}", path.display());
    }

    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install terminate handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
