//! Model Hub Server - version control for JSON models.
//!
//! This server stores the latest document of each model and a chain of
//! invertible patches, and rebuilds any earlier version on request using the
//! modelhub-engine replay logic.

mod config;
mod db;
mod error;
mod handlers;
mod routes;

use crate::config::Config;
use crate::db::Pool;
use axum::http::HeaderValue;
use axum::Router;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub pool: Pool,
    pub config: Arc<Config>,
}

fn cors_layer(config: &Config) -> Result<CorsLayer, axum::http::header::InvalidHeaderValue> {
    let origin = match &config.cors_origin {
        Some(origin) => AllowOrigin::exact(HeaderValue::from_str(origin)?),
        None => AllowOrigin::from(Any),
    };
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "modelhub_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing::info!("Starting Model Hub Server on {}:{}", config.host, config.port);

    // Create database pool
    let pool = db::create_pool(&config.database_url, config.max_db_connections).await?;

    // Run migrations
    tracing::info!("Running database migrations...");
    db::run_migrations(&pool).await?;

    let cors = cors_layer(&config)?;

    // Build application state
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
    };

    // Build router
    let app = Router::new()
        .merge(routes::create_routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state);

    // Start server
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
