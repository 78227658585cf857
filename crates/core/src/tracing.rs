//! Tracing setup for binaries and tests embedding the twingate-rs crates.
//!
//! Library code only emits events through `tracing` macros; installing a
//! subscriber is left to the embedding process via [`init_tracing`].

use std::io;
use std::sync::OnceLock;

pub use tracing::Level;
use tracing_subscriber::{filter::EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Crates whose events are enabled by the level-derived default filter.
const CRATES: [&str; 3] = ["twingate_core", "twingate_pagination", "twingate_cache"];

/// Tracing output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TracingFormat {
    /// Multi-line human readable output
    Pretty,
    /// Single-line output
    Compact,
    /// Structured JSON, one object per line
    Json,
}

impl std::str::FromStr for TracingFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            _ => Err(Error::configuration(format!("unknown tracing format: {s}"))),
        }
    }
}

/// Tracing configuration.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Output format
    pub format: TracingFormat,
    /// Level used when neither `filter` nor `RUST_LOG` is set
    pub level: Level,
    /// Explicit `EnvFilter` directive string
    pub filter: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            format: TracingFormat::Compact,
            level: Level::WARN,
            filter: None,
        }
    }
}

impl TracingConfig {
    /// Directive string derived from `level` for this workspace's crates.
    #[must_use]
    pub fn default_directives(&self) -> String {
        let level = self.level.as_str().to_lowercase();
        CRATES
            .iter()
            .map(|krate| format!("{krate}={level}"))
            .collect::<Vec<_>>()
            .join(",")
    }

    fn env_filter(&self) -> Result<EnvFilter> {
        let filter = match &self.filter {
            Some(filter) => EnvFilter::try_new(filter),
            None => EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(self.default_directives())),
        };
        filter.map_err(|e| Error::configuration(format!("invalid tracing filter: {e}")))
    }
}

static CORRELATION_ID: OnceLock<Uuid> = OnceLock::new();

/// Process-wide correlation id, created on first use.
pub fn correlation_id() -> Uuid {
    *CORRELATION_ID.get_or_init(Uuid::new_v4)
}

/// Install a global subscriber writing to stderr.
///
/// # Errors
///
/// Returns [`Error::Configuration`] if the filter directives are invalid or a
/// global subscriber is already installed.
pub fn init_tracing(config: &TracingConfig) -> Result<()> {
    let env_filter = config.env_filter()?;
    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = match config.format {
        TracingFormat::Pretty => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_writer(io::stderr)
                    .with_target(true),
            )
            .try_init(),
        TracingFormat::Compact => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_writer(io::stderr)
                    .with_target(false),
            )
            .try_init(),
        TracingFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(io::stderr)
                    .with_current_span(true),
            )
            .try_init(),
    };
    installed.map_err(|e| Error::configuration(format!("tracing already initialized: {e}")))?;

    tracing::info!(
        correlation_id = %correlation_id(),
        format = ?config.format,
        "Tracing initialized"
    );

    Ok(())
}
