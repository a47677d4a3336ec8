use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Context;
use donation_service::config::StoreBackend;
use donation_service::handlers;
use donation_service::jobs::expiry_sweeper::start_expiry_sweeper;
use donation_service::services::{AggregationService, LifecycleEngine};
use donation_service::store::{InMemoryStore, LifecycleStore, PgLifecycleStore};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,donation_service=debug".into());

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_target(false))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = donation_service::Config::from_env()
        .map_err(anyhow::Error::msg)
        .context("Failed to load configuration")?;

    tracing::info!(
        env = %config.app.env,
        backend = ?config.database.backend,
        "Starting donation-service"
    );

    let store: Arc<dyn LifecycleStore> = match config.database.backend {
        StoreBackend::Postgres => {
            let pool = donation_service::db::create_pool(&config.database)
                .await
                .context("Failed to create database pool")?;
            let store = PgLifecycleStore::new(pool);
            store
                .migrate()
                .await
                .context("Failed to run database migrations")?;
            tracing::info!("Database migrations applied");
            Arc::new(store)
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            Arc::new(InMemoryStore::new())
        }
    };

    let engine = LifecycleEngine::new(store.clone())
        .with_nearby_radius(config.lifecycle.nearby_default_radius_km);
    let aggregation = AggregationService::new(store)
        .with_leaderboard_limit(config.lifecycle.leaderboard_limit);

    match config.lifecycle.expiry_sweep_interval() {
        Some(interval) => {
            tokio::spawn(start_expiry_sweeper(engine.clone(), interval));
        }
        None => tracing::info!("Expiry sweeper disabled (EXPIRY_SWEEP_INTERVAL_SECS=0)"),
    }

    let engine_data = web::Data::new(engine);
    let aggregation_data = web::Data::new(aggregation);

    let bind_addr = format!("{}:{}", config.app.host, config.app.port);
    tracing::info!("HTTP server listening on {}", bind_addr);

    HttpServer::new(move || {
        App::new()
            .app_data(engine_data.clone())
            .app_data(aggregation_data.clone())
            .wrap(Logger::default())
            .wrap(tracing_actix_web::TracingLogger::default())
            .configure(handlers::configure)
            .default_service(web::route().to(handlers::not_found))
    })
    .bind(&bind_addr)
    .with_context(|| format!("Failed to bind {}", bind_addr))?
    .run()
    .await
    .context("HTTP server terminated with error")?;

    tracing::info!("donation-service shut down");
    Ok(())
}
