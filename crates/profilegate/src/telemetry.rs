//! Logging bootstrap.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::{LogFormat, LoggingConfig};

const DEFAULT_FILTER: &str = "info";

/// Filter from config, else `RUST_LOG`, else `info`.
pub fn filter(config: &LoggingConfig) -> anyhow::Result<EnvFilter> {
	Ok(match config.filter.as_deref() {
		Some(directives) => EnvFilter::try_new(directives)?,
		None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
	})
}

/// Install the global subscriber. Fails if one is already set.
pub fn init(config: &LoggingConfig) -> anyhow::Result<()> {
	let registry = tracing_subscriber::registry().with(filter(config)?);
	match config.format {
		LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).try_init()?,
		LogFormat::Json => registry
			.with(tracing_subscriber::fmt::layer().json())
			.try_init()?,
	}
	Ok(())
}
