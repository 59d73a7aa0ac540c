//! Scriptbot channel adapter entry point.

use std::error::Error;
use std::sync::Arc;

use scriptbot_adapter::{AdapterConfig, Dispatcher, LoggingChannelClient, RunnerRegistry};
use scriptbot_bus::PgSubscriber;
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize tracing subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting scriptbot channel adapter");

    let config = AdapterConfig::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(4)
        .connect(&config.database_url)
        .await?;
    let subscriber = PgSubscriber::connect(pool, config.poll_interval).await?;

    let shutdown = CancellationToken::new();
    let registry = RunnerRegistry::new(Arc::new(LoggingChannelClient), shutdown.clone());
    let dispatcher = Dispatcher::new(Box::new(subscriber), registry);

    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown signal received");
        }
        signal.cancel();
    });

    dispatcher.run(shutdown).await?;
    Ok(())
}
