//! Scriptbot API server entry point.

use std::error::Error;
use std::sync::Arc;

use scriptbot_adapter::LoggingChannelClient;
use scriptbot_api::background::{spawn_in_process_adapter, spawn_outbox_flush};
use scriptbot_api::config::{ApiConfig, BusBackend, PublishMode, StorageBackend};
use scriptbot_api::error::AppError;
use scriptbot_api::routes;
use scriptbot_api::state::AppState;
use scriptbot_api::telemetry;
use scriptbot_bus::{OutboxPublisher, PgBus, Publisher};
use scriptbot_core::clock::SystemClock;
use scriptbot_script::application::command_handlers;
use scriptbot_script::domain::repository::{BotRepository, ParticipantRepository};
use scriptbot_store::{
    InMemoryBotRepository, InMemoryParticipantRepository, PgBotRepository,
    PgParticipantRepository,
};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

fn require_pool(pool: Option<&PgPool>) -> Result<PgPool, AppError> {
    pool.cloned()
        .ok_or_else(|| AppError::Config("DATABASE_URL environment variable must be set".into()))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let tracer_provider = telemetry::init("scriptbot-api")?;

    info!("Starting scriptbot API server");

    let config = ApiConfig::from_env()?;
    let shutdown = CancellationToken::new();
    let tasks = TaskTracker::new();

    // Create database connection pool.
    let pool = match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new().max_connections(10).connect(url).await?;
            sqlx::migrate!("../../migrations").run(&pool).await?;
            Some(pool)
        }
        None => None,
    };

    let (bots, participants): (Arc<dyn BotRepository>, Arc<dyn ParticipantRepository>) =
        match config.storage {
            StorageBackend::Postgres => {
                let pool = require_pool(pool.as_ref())?;
                (
                    Arc::new(PgBotRepository::new(pool.clone())),
                    Arc::new(PgParticipantRepository::new(pool)),
                )
            }
            StorageBackend::Memory => (
                Arc::new(InMemoryBotRepository::new()),
                Arc::new(InMemoryParticipantRepository::new()),
            ),
        };

    let bus: Arc<dyn Publisher> = match config.bus {
        BusBackend::Postgres => Arc::new(PgBus::new(require_pool(pool.as_ref())?)),
        BusBackend::Memory => {
            spawn_in_process_adapter(&tasks, Arc::new(LoggingChannelClient), &shutdown)
        }
    };

    let publisher: Arc<dyn Publisher> = match config.publish_mode {
        PublishMode::Direct => bus,
        PublishMode::Outbox => {
            let outbox = Arc::new(OutboxPublisher::new(bus));
            spawn_outbox_flush(
                &tasks,
                Arc::clone(&outbox),
                config.outbox_flush_interval,
                shutdown.clone(),
            );
            outbox
        }
    };

    // Reopen channel sessions of bots that were running before a restart.
    if let Err(e) =
        command_handlers::handle_resume_started_bots(bots.as_ref(), publisher.as_ref()).await
    {
        warn!(error = %e, "failed to resume started bots");
    }

    let app_state = AppState::new(
        Arc::new(SystemClock),
        bots,
        participants,
        publisher,
        config.policy,
    );

    // TODO: Replace CorsLayer::permissive() with restricted origins for production.
    let app = routes::router()
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    info!("Listening on {}", config.addr);
    let listener = tokio::net::TcpListener::bind(config.addr).await?;

    let signal = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "failed to listen for shutdown signal");
            }
            signal.cancel();
        })
        .await?;
    shutdown.cancel();
    tasks.close();
    tasks.wait().await;
    info!("background tasks stopped");

    if let Some(provider) = tracer_provider {
        if let Err(e) = provider.shutdown() {
            warn!(error = %e, "failed to flush spans");
        }
    }

    Ok(())
}
