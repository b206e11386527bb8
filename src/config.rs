use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::pipeline::insights::client::{AnthropicConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::pipeline::insights::pacing::MIN_CALL_SPACING;
use crate::pipeline::queue::QueueConfig;

/// Application-level constants
pub const APP_NAME: &str = "ReportLens";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 300;

/// Default tracing filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    if cfg!(debug_assertions) {
        "info,reportlens_lib=debug"
    } else {
        "info"
    }
}

/// Get the application data directory
/// `<platform data dir>/reportlens`, falling back to the working directory.
pub fn app_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("reportlens")
}

pub fn default_db_path() -> PathBuf {
    app_data_dir().join("reportlens.db")
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractorKind {
    Pdf,
    Placeholder,
}

/// Settings for the per-report generation run.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub call_spacing: Duration,
    pub extractor: ExtractorKind,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            call_spacing: MIN_CALL_SPACING,
            extractor: ExtractorKind::Pdf,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub bind_addr: SocketAddr,
    /// Shared secret for the processing trigger. Generated at startup when unset.
    pub cron_secret: Option<String>,
    pub anthropic: AnthropicConfig,
    pub generation: GenerationConfig,
    pub queue: QueueConfig,
    /// `None` disables the background queue worker.
    pub poll_interval: Option<Duration>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let db_path = get("REPORTLENS_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(default_db_path);

        let bind_raw = get("REPORTLENS_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr: SocketAddr = bind_raw.parse().map_err(|_| ConfigError::Invalid {
            var: "REPORTLENS_BIND_ADDR",
            value: bind_raw.clone(),
        })?;

        let anthropic = AnthropicConfig {
            api_key: get("ANTHROPIC_API_KEY"),
            base_url: get("ANTHROPIC_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: get("INSIGHT_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            timeout_secs: parse_or(&get, "MODEL_TIMEOUT_SECS", 120)?,
        };

        let spacing_ms: u64 = parse_or(&get, "INSIGHT_CALL_SPACING_MS", 1000)?;
        let extractor = match get("EXTRACTOR").as_deref() {
            None | Some("pdf") => ExtractorKind::Pdf,
            Some("placeholder") => ExtractorKind::Placeholder,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "EXTRACTOR",
                    value: other.to_string(),
                })
            }
        };
        let generation = GenerationConfig {
            call_spacing: Duration::from_millis(spacing_ms).max(MIN_CALL_SPACING),
            extractor,
        };

        let defaults = QueueConfig::default();
        let queue = QueueConfig {
            batch_size: parse_or(&get, "QUEUE_BATCH_SIZE", defaults.batch_size)?,
            max_retries: parse_or(&get, "QUEUE_MAX_RETRIES", defaults.max_retries)?,
            stale_claim_after: Duration::from_secs(60 * parse_or(&get, "QUEUE_STALE_CLAIM_MINUTES", 30u64)?),
            ..defaults
        };

        let poll_secs: u64 = parse_or(&get, "QUEUE_POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL_SECS)?;
        let poll_interval = (poll_secs > 0).then(|| Duration::from_secs(poll_secs));

        Ok(Self {
            db_path,
            bind_addr,
            cron_secret: get("CRON_SECRET"),
            anthropic,
            generation,
            queue,
            poll_interval,
        })
    }
}

fn parse_or<T, G>(get: &G, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(var) {
        None => Ok(default),
        Some(value) => value.parse().map_err(|_| ConfigError::Invalid { var, value }),
    }
}
