use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;

use goldcast_backend::app;
use goldcast_backend::auth::TokenVerifier;
use goldcast_backend::config::AppConfig;
use goldcast_backend::logging::{init_logging, LoggingConfig};
use goldcast_backend::state::AppState;
use goldcast_backend::store::{PgPredictionStore, PgPriceStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Before anything logs
    LoggingConfig::from_env()
        .and_then(init_logging)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    let config = AppConfig::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;

    let state = AppState {
        prices: Arc::new(PgPriceStore::new(pool.clone())),
        predictions: Arc::new(PgPredictionStore::new(pool)),
        tokens: Arc::new(TokenVerifier::new(&config.jwt_secret)),
        sentiment_bounds: config.sentiment_bounds,
        import_data_dir: config.import_data_dir.clone(),
    };
    let app = app::create_app(state);

    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!("Goldcast backend running at http://{}/", config.bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
