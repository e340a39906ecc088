use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};

/// Accepted range for sentiment scores, inclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreBounds {
    pub min: f64,
    pub max: f64,
}

impl Default for ScoreBounds {
    fn default() -> Self {
        // Normalized sentiment: -1.0 (very bearish) to +1.0 (very bullish)
        Self { min: -1.0, max: 1.0 }
    }
}

impl ScoreBounds {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    pub sentiment_bounds: ScoreBounds,
    pub import_data_dir: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let jwt_secret = std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?;

        let max_connections = std::env::var("DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .context("DB_MAX_CONNECTIONS must be a positive integer")?;

        let bind_addr = std::env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
            .parse()
            .context("BIND_ADDR must be a socket address")?;

        let defaults = ScoreBounds::default();
        let sentiment_bounds = ScoreBounds {
            min: env_f64("SENTIMENT_SCORE_MIN", defaults.min)?,
            max: env_f64("SENTIMENT_SCORE_MAX", defaults.max)?,
        };

        let import_data_dir = PathBuf::from(
            std::env::var("IMPORT_DATA_DIR").unwrap_or_else(|_| "data".to_string()),
        );

        let config = Self {
            database_url,
            max_connections,
            bind_addr,
            jwt_secret,
            sentiment_bounds,
            import_data_dir,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.jwt_secret.trim().is_empty() {
            bail!("JWT_SECRET must not be empty");
        }
        if !self.sentiment_bounds.min.is_finite()
            || !self.sentiment_bounds.max.is_finite()
            || self.sentiment_bounds.min > self.sentiment_bounds.max
        {
            bail!(
                "Invalid sentiment score range [{}, {}]",
                self.sentiment_bounds.min,
                self.sentiment_bounds.max
            );
        }
        if self.max_connections == 0 {
            bail!("DB_MAX_CONNECTIONS must be at least 1");
        }
        Ok(())
    }
}

fn env_f64(key: &str, default: f64) -> Result<f64> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a number, got '{}'", key, raw)),
        Err(_) => Ok(default),
    }
}
