use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use product_search::api;
use product_search::bootstrap::{Bootstrap, RetryPolicy, TokioSleeper};
use product_search::config::Config;
use product_search::loader::BatchLoader;
use product_search::state::AppState;

/// Hybrid keyword + semantic product search gateway.
#[derive(Parser)]
#[command(name = "product-search", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Wait for the store, ensure the collection, then serve HTTP (default)
    Serve,
    /// Replay a JSON-lines product file through a running gateway
    Load {
        /// Product file, one JSON object per line
        #[arg(long, env = "DATA_FILE", default_value = "data/products.jsonl")]
        file: PathBuf,

        /// Base URL of the gateway
        #[arg(long, env = "API_URL", default_value = "http://localhost:8000")]
        api_url: String,

        /// Health probes tolerated to fail before giving up
        #[arg(long, default_value = "30")]
        retries: u32,

        /// Delay between health probes
        #[arg(long, default_value = "3")]
        delay_secs: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve().await,
        Command::Load {
            file,
            api_url,
            retries,
            delay_secs,
        } => {
            let loader = BatchLoader::new(reqwest::Client::new(), &api_url);
            let policy = RetryPolicy {
                max_retries: retries,
                delay: Duration::from_secs(delay_secs),
                probe_timeout: Duration::from_secs(3),
            };
            loader.wait_until_ready(policy, &TokioSleeper).await?;
            let summary = loader.load_file(&file).await?;
            println!("{}", serde_json::to_string(&summary)?);
            Ok(())
        }
    }
}

async fn serve() -> anyhow::Result<()> {
    let config = Config::from_env();
    config.validate()?;
    tracing::info!(
        "Store: {} ({}), collection '{}'",
        config.store.backend,
        config.store.url,
        config.store.index_name
    );
    tracing::info!(
        "Embedding endpoint: {}",
        config.embedding.api_url.as_deref().unwrap_or("<not configured>")
    );

    let state = AppState::new(config.clone())?;

    // Nothing is bound until the store is reachable and the collection exists.
    let mut bootstrap = Bootstrap::new(
        state.store.clone(),
        state.schema(),
        RetryPolicy::from(&config.bootstrap),
        Arc::new(TokioSleeper),
    );
    let report = bootstrap.run().await?;
    tracing::info!(
        "Ready after {} probe(s), collection {:?}",
        report.history.len().saturating_sub(2),
        report.collection_status
    );

    let app = api::router(state);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
