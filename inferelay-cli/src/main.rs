//! Long-running relay process.
//!
//! Exits non-zero only on unrecoverable startup configuration errors;
//! otherwise runs until externally terminated.

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use inferelay::prelude::*;

#[derive(Debug, Parser)]
#[command(name = "inferelay", version, about = "Notification-driven inference relay")]
struct Cli {
    /// Base URL of the messaging channel.
    #[arg(long, env = "INFERELAY_CHANNEL_ENDPOINT")]
    channel_endpoint: String,

    /// Subscription to pull artifact events from.
    #[arg(long, env = "INFERELAY_SUBSCRIPTION")]
    subscription: String,

    /// Base URL of the canonical artifact/result store.
    #[arg(long, env = "INFERELAY_STORE_ENDPOINT")]
    store_endpoint: String,

    /// Base URL of the scoring endpoint.
    #[arg(long, env = "INFERELAY_SCORING_ENDPOINT")]
    scoring_endpoint: String,

    /// Model/version identifier to score with.
    #[arg(long, env = "INFERELAY_MODEL")]
    model: String,

    /// Maximum events processed concurrently.
    #[arg(long, default_value_t = 8)]
    concurrency: usize,

    /// Retries for transient artifact-fetch failures.
    #[arg(long, default_value_t = 3)]
    fetch_retries: usize,

    /// Base backoff between fetch retries, in milliseconds.
    #[arg(long, default_value_t = 250)]
    fetch_backoff_ms: u64,

    /// Prediction round-trip timeout, in milliseconds.
    #[arg(long, default_value_t = 30_000)]
    predict_timeout_ms: u64,

    /// Retries after a timed-out prediction.
    #[arg(long, default_value_t = 2)]
    predict_retries: usize,

    /// Overall per-event deadline, in milliseconds.
    #[arg(long, default_value_t = 60_000)]
    event_deadline_ms: u64,

    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn into_config(self) -> RelayConfig {
        RelayConfig::new(
            ChannelConfig::new(self.channel_endpoint, self.subscription),
            StoreConfig::new(self.store_endpoint),
            ScoringConfig::new(self.scoring_endpoint, self.model)
                .with_timeout_ms(self.predict_timeout_ms)
                .with_timeout_retries(self.predict_retries),
        )
        .with_fetch_retry(
            RetryConfig::new()
                .with_max_retries(self.fetch_retries)
                .with_backoff_base_ms(self.fetch_backoff_ms),
        )
        .with_worker(
            WorkerConfig::new()
                .with_concurrency(self.concurrency)
                .with_event_deadline_ms(self.event_deadline_ms),
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = cli.into_config();
    config.validate().context("invalid relay configuration")?;

    let source = Arc::new(
        HttpPullSource::new(config.channel.clone()).context("building channel client")?,
    );
    let fetcher = Arc::new(
        HttpArtifactFetcher::new(config.store.clone()).context("building fetch client")?,
    );
    let predictor = Arc::new(
        HttpPredictionClient::new(config.scoring.clone()).context("building scoring client")?,
    );
    let result_store =
        Arc::new(HttpResultStore::new(config.store.clone()).context("building store client")?);

    let sink: Arc<dyn EventSink> = Arc::new(LoggingEventSink::info());

    let controller = Arc::new(
        RelayController::new(&config, source.clone(), fetcher, predictor, result_store)
            .with_sink(sink.clone()),
    );

    let pool = RelayWorkerPool::new(
        config.channel.clone(),
        config.worker.clone(),
        source,
        controller,
    )
    .with_sink(sink);

    let shutdown = pool.shutdown_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, shutting down");
            shutdown.shutdown("interrupt");
        }
    });

    tracing::info!(
        channel = %config.channel.endpoint,
        subscription = %config.channel.subscription,
        model = %config.scoring.model,
        "Relay starting"
    );

    pool.run().await;

    Ok(())
}
