use thiserror::Error;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{layer::SubscriberExt, EnvFilter};

const DEFAULT_LEVEL: &str = "info";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("LOKI_ENABLED is true but LOKI_URL is not set")]
    MissingLokiUrl,

    #[error("invalid LOKI_URL: {0}")]
    InvalidLokiUrl(#[from] url::ParseError),

    #[cfg(feature = "loki")]
    #[error("failed to build Loki layer: {0}")]
    Loki(#[from] tracing_loki::Error),

    #[error("global subscriber already installed: {0}")]
    Init(#[from] TryInitError),
}

/// Where to ship logs besides the console.
#[derive(Debug, Clone, PartialEq)]
pub struct LokiTarget {
    pub url: url::Url,
    pub service_name: String,
    pub environment: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    pub log_level: String,
    pub loki: Option<LokiTarget>,
}

impl LoggingConfig {
    pub fn from_env() -> Result<Self, LoggingError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Loki is only configured when
    /// `LOKI_ENABLED=true`, and then `LOKI_URL` must be present and parse.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, LoggingError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let log_level = lookup("RUST_LOG").unwrap_or_else(|| DEFAULT_LEVEL.to_string());
        let loki_enabled = lookup("LOKI_ENABLED")
            .map(|v| v.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let loki = if loki_enabled {
            let raw = lookup("LOKI_URL").ok_or(LoggingError::MissingLokiUrl)?;
            Some(LokiTarget {
                url: url::Url::parse(&raw)?,
                service_name: lookup("SERVICE_NAME").unwrap_or_else(|| "goldcast".to_string()),
                environment: lookup("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
            })
        } else {
            None
        };

        Ok(Self { log_level, loki })
    }
}

/// Parse a filter directive, falling back to `info` when it does not parse.
/// The flag reports whether the fallback was taken.
fn filter_for(level: &str) -> (EnvFilter, bool) {
    match EnvFilter::try_new(level) {
        Ok(filter) => (filter, false),
        Err(_) => (EnvFilter::new(DEFAULT_LEVEL), true),
    }
}

/// Install the global subscriber: console output plus Loki when configured.
/// Needs a running tokio runtime when Loki is on.
pub fn init_logging(config: LoggingConfig) -> Result<(), LoggingError> {
    let (filter, fell_back) = filter_for(&config.log_level);

    #[cfg(feature = "loki")]
    let loki_layer = match &config.loki {
        Some(target) => {
            let (layer, task) = tracing_loki::builder()
                .label("service", &target.service_name)?
                .label("environment", &target.environment)?
                .build_url(target.url.clone())?;
            tokio::spawn(task);
            Some(layer)
        }
        None => None,
    };
    #[cfg(not(feature = "loki"))]
    let loki_layer: Option<tracing_subscriber::layer::Identity> = None;

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(loki_layer)
        .try_init()?;

    if fell_back {
        tracing::warn!("Unparseable log filter {:?}, using {}", config.log_level, DEFAULT_LEVEL);
    }
    match &config.loki {
        #[cfg(feature = "loki")]
        Some(target) => tracing::info!("Logging to console and Loki at {}", target.url),
        #[cfg(not(feature = "loki"))]
        Some(_) => tracing::warn!("Loki configured but the loki feature is disabled, console only"),
        None => tracing::info!("Logging to console"),
    }
    Ok(())
}
