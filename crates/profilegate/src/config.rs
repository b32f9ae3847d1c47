//! Gateway configuration.
//!
//! Loaded from an optional YAML file, then overridden from the environment.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Deserializer};

use crate::http::auth::DEFAULT_CLOCK_SKEW;
use crate::http::cors::DEFAULT_ALLOWED_ORIGINS;

pub const ENV_LISTEN: &str = "PROFILEGATE_LISTEN";
pub const ENV_ALLOWED_ORIGINS: &str = "PROFILEGATE_ALLOWED_ORIGINS";
pub const ENV_STRICT_ORIGIN: &str = "PROFILEGATE_STRICT_ORIGIN";
pub const ENV_CLOCK_SKEW: &str = "PROFILEGATE_CLOCK_SKEW";
pub const ENV_PROVIDER_TIMEOUT: &str = "PROFILEGATE_PROVIDER_TIMEOUT";
pub const ENV_LOG_FORMAT: &str = "PROFILEGATE_LOG_FORMAT";
pub const ENV_SECRET_KEY: &str = "CLERK_SECRET_KEY";
pub const ENV_JWT_KEY: &str = "CLERK_JWT_KEY";
pub const ENV_API_URL: &str = "CLERK_API_URL";

pub const DEFAULT_API_URL: &str = "https://api.clerk.com/v1";
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("failed to read config file: {0}")]
	Io(#[from] std::io::Error),
	#[error("failed to parse config file: {0}")]
	Parse(#[from] serde_yaml::Error),
	#[error("invalid value for {name}: {reason}")]
	InvalidEnv { name: &'static str, reason: String },
	#[error("invalid duration '{0}'")]
	InvalidDuration(String),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct Config {
	/// Address the HTTP listener binds to.
	pub listen: SocketAddr,
	/// Origins admitted by the CORS gate.
	pub allowed_origins: Vec<String>,
	/// Reject non-preflight requests from disallowed origins with 403
	/// instead of forwarding them without CORS headers.
	pub strict_origin: bool,
	/// Clock drift tolerated when checking credential time claims.
	#[serde(with = "serde_dur")]
	pub clock_skew: Duration,
	/// Deadline for each identity provider call.
	#[serde(with = "serde_dur")]
	pub provider_timeout: Duration,
	pub provider: ProviderConfig,
	pub logging: LoggingConfig,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			listen: SocketAddr::from(([0, 0, 0, 0], 8080)),
			allowed_origins: DEFAULT_ALLOWED_ORIGINS
				.iter()
				.map(|o| o.to_string())
				.collect(),
			strict_origin: false,
			clock_skew: DEFAULT_CLOCK_SKEW,
			provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
			provider: ProviderConfig::default(),
			logging: LoggingConfig::default(),
		}
	}
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct ProviderConfig {
	/// Base URL of the provider's backend API.
	pub api_url: String,
	/// Backend API secret key.
	#[serde(deserialize_with = "de_secret")]
	pub secret_key: Option<SecretString>,
	/// PEM encoded public key used to verify session tokens.
	pub jwt_key: Option<String>,
}

impl Default for ProviderConfig {
	fn default() -> Self {
		Self {
			api_url: DEFAULT_API_URL.to_string(),
			secret_key: None,
			jwt_key: None,
		}
	}
}

fn de_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
	D: Deserializer<'de>,
{
	Ok(Option::<String>::deserialize(deserializer)?.map(SecretString::from))
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct LoggingConfig {
	pub format: LogFormat,
	/// `tracing` filter directives; `RUST_LOG` applies when unset.
	pub filter: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
	#[default]
	Text,
	Json,
}

impl Config {
	/// Load from `path` (if any) and apply environment overrides.
	pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
		let config = match path {
			Some(path) => Self::from_yaml(&fs_err::read_to_string(path)?)?,
			None => Config::default(),
		};
		config.apply_env(|name| std::env::var(name).ok())
	}

	pub fn from_yaml(contents: &str) -> Result<Config, ConfigError> {
		Ok(serde_yaml::from_str(contents)?)
	}

	/// Override fields from environment variables looked up through `lookup`.
	pub fn apply_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Config, ConfigError> {
		let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

		if let Some(listen) = var(ENV_LISTEN) {
			self.listen = listen.parse().map_err(|e: std::net::AddrParseError| {
				ConfigError::InvalidEnv {
					name: ENV_LISTEN,
					reason: e.to_string(),
				}
			})?;
		}
		if let Some(origins) = var(ENV_ALLOWED_ORIGINS) {
			self.allowed_origins = origins
				.split(',')
				.map(str::trim)
				.filter(|o| !o.is_empty())
				.map(str::to_string)
				.collect();
		}
		if let Some(strict) = var(ENV_STRICT_ORIGIN) {
			self.strict_origin = strict.parse().map_err(|_| ConfigError::InvalidEnv {
				name: ENV_STRICT_ORIGIN,
				reason: format!("expected true or false, got '{strict}'"),
			})?;
		}
		if let Some(skew) = var(ENV_CLOCK_SKEW) {
			self.clock_skew = parse_duration(&skew)?;
		}
		if let Some(timeout) = var(ENV_PROVIDER_TIMEOUT) {
			self.provider_timeout = parse_duration(&timeout)?;
		}
		if let Some(format) = var(ENV_LOG_FORMAT) {
			self.logging.format = match format.to_ascii_lowercase().as_str() {
				"text" => LogFormat::Text,
				"json" => LogFormat::Json,
				_ => {
					return Err(ConfigError::InvalidEnv {
						name: ENV_LOG_FORMAT,
						reason: format!("expected text or json, got '{format}'"),
					});
				},
			};
		}
		if let Some(secret) = var(ENV_SECRET_KEY) {
			self.provider.secret_key = Some(SecretString::from(secret));
		}
		if let Some(key) = var(ENV_JWT_KEY) {
			self.provider.jwt_key = Some(key);
		}
		if let Some(url) = var(ENV_API_URL) {
			self.provider.api_url = url;
		}
		Ok(self)
	}
}

/// Parse a duration string like "500ms", "30s", "5m", "1h". A bare number is seconds.
pub fn parse_duration(s: &str) -> Result<Duration, ConfigError> {
	let s = s.trim();
	let invalid = || ConfigError::InvalidDuration(s.to_string());

	let (num_str, unit) = if let Some(n) = s.strip_suffix("ms") {
		(n, "ms")
	} else if let Some(n) = s.strip_suffix('s') {
		(n, "s")
	} else if let Some(n) = s.strip_suffix('m') {
		(n, "m")
	} else if let Some(n) = s.strip_suffix('h') {
		(n, "h")
	} else {
		(s, "s")
	};

	let num: u64 = num_str.trim().parse().map_err(|_| invalid())?;
	Ok(match unit {
		"ms" => Duration::from_millis(num),
		"m" => Duration::from_secs(num * 60),
		"h" => Duration::from_secs(num * 60 * 60),
		_ => Duration::from_secs(num),
	})
}

mod serde_dur {
	use std::time::Duration;

	use serde::{Deserialize, Deserializer};

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
	where
		D: Deserializer<'de>,
	{
		let raw = String::deserialize(deserializer)?;
		super::parse_duration(&raw).map_err(serde::de::Error::custom)
	}
}
