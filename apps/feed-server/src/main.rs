//! # Feed Server
//!
//! HTTP front end for the feed engine.

use actix_web::{App, HttpServer, web};
use anyhow::Context;
use tracing_actix_web::TracingLogger;

mod background;
mod config;
mod handlers;
mod middleware;
mod state;
mod telemetry;

use background::SchedulerConfig;
use config::AppConfig;
use state::AppState;
use telemetry::TelemetryConfig;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    telemetry::init_telemetry(&TelemetryConfig::from_env());

    let config = AppConfig::from_env();
    tracing::info!(
        "Starting Feed Server on {}:{}",
        config.host,
        config.port
    );

    let state = AppState::new(&config).await;

    // Scheduled posts are also promoted on every submission; the timer
    // covers idle periods.
    let scheduler_config = SchedulerConfig::from_env();

    #[cfg(feature = "scheduler")]
    let mut timer = background::CronTimer::new(&scheduler_config)
        .await
        .context("failed to start job scheduler")?;
    #[cfg(not(feature = "scheduler"))]
    let timer = feed_infra::IntervalTimer;

    if scheduler_config.enabled {
        state
            .posts
            .start(&timer)
            .await
            .context("failed to schedule the reconciler")?;
    } else {
        tracing::info!("Scheduler disabled");
    }

    let app_state = state.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .app_data(web::Data::new(app_state.clone()))
            .configure(handlers::configure_routes)
    })
    .bind((config.host.as_str(), config.port))
    .with_context(|| format!("failed to bind {}:{}", config.host, config.port))?
    .run()
    .await?;

    state.posts.shutdown();
    #[cfg(feature = "scheduler")]
    if let Err(e) = timer.shutdown().await {
        tracing::warn!(error = %e, "Scheduler did not stop cleanly");
    }

    tracing::info!("Feed Server stopped");
    Ok(())
}
