use std::sync::Arc;

use clap::Parser;
use jobwatch_core::config::StoreBackend;
use jobwatch_core::{JobStore, JobwatchConfig, JobwatchError, MemoryJobStore, PgJobStore};
use jobwatch_ingest::{build_strategies, FallbackGenerator, IngestionPipeline, IngestionRequest};
use tokio::sync::broadcast;
use tracing_subscriber::{fmt, EnvFilter};

use jobwatch_server::subsystems::scheduler::{IngestionService, IntervalTimer};
use jobwatch_server::{server, AppState};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "jobwatch.toml")]
    config: String,

    /// Check the job store and exit
    #[arg(long)]
    health: bool,

    /// Keep jobs in process memory instead of Postgres
    #[arg(long)]
    memory: bool,
}

async fn open_store(config: &JobwatchConfig) -> Result<Arc<dyn JobStore>, JobwatchError> {
    match config.store.backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryJobStore::new())),
        StoreBackend::Postgres => {
            let pool = jobwatch_core::db::create_pool(&config.database).await?;
            jobwatch_core::db::ensure_schema(&pool).await?;
            Ok(Arc::new(PgJobStore::new(pool)))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (dev convenience, production uses real env vars)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Load config
    let mut config = match JobwatchConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", args.config, e);
            std::process::exit(1);
        }
    };
    if args.memory {
        config.store.backend = StoreBackend::Memory;
    }

    // Init logging; RUST_LOG wins over service.log_level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.service.log_level));
    fmt().with_env_filter(filter).init();

    let store = match open_store(&config).await {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to open job store: {}", e);
            std::process::exit(1);
        }
    };

    if args.health {
        match store.count().await {
            Ok(n) => println!("✅ Job store ({}) reachable: {} jobs", store.name(), n),
            Err(e) => {
                println!("❌ Job store ({}) check failed: {}", store.name(), e);
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    // Ingestion pipeline + scheduler
    let fallback = config.fallback.enabled.then(|| {
        FallbackGenerator::default().with_counts(config.fallback.min_count, config.fallback.max_count)
    });
    let pipeline = IngestionPipeline::new(build_strategies(&config.scraping), store.clone())
        .with_fallback(fallback)
        .with_identity_salt(config.ingestion.identity_salt);

    let ingestion = Arc::new(IngestionService::new(
        Arc::new(pipeline),
        IngestionRequest::from(&config.ingestion),
    ));
    ingestion
        .start(IntervalTimer::every_minutes(
            config.ingestion.interval_minutes,
            config.ingestion.run_on_start,
        ))
        .await;

    let state = Arc::new(AppState::new(store, ingestion.clone(), config.clone()));

    // Shutdown fan-out
    let (tx, _rx) = broadcast::channel(1);
    let shutdown_tx = tx.clone();

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(());
    });

    if config.http.enabled {
        let http_state = state.clone();
        let http_shutdown = tx.subscribe();
        tokio::spawn(async move {
            if let Err(e) = jobwatch_server::http::start_http_server(http_state, http_shutdown).await {
                tracing::error!("HTTP server error: {}", e);
            }
        });
    }

    let socket_path = config.service.socket_path.clone();
    let result = server::run_unix_server(&socket_path, state, tx.subscribe()).await;

    ingestion.stop().await;
    result
}
