//! Router assembly and request handlers.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Extension, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router, middleware};
use http::header::{CACHE_CONTROL, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue, StatusCode};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::http::auth::{CredentialGate, Subject, credential_gate};
use crate::http::cors::{OriginGate, origin_gate};
use crate::http::{Response, plain_error};
use crate::identity;
use crate::profile;
use crate::provider::{IdentityProvider, ProviderError, with_deadline};

pub const NO_STORE: &str = "no-cache, no-store, must-revalidate";

/// Shared, read-only state for every request.
#[derive(Clone)]
pub struct Gateway {
	origins: Arc<OriginGate>,
	credentials: CredentialGate,
	provider: Arc<dyn IdentityProvider>,
	provider_timeout: Duration,
}

impl Gateway {
	pub fn new(config: &Config, provider: Arc<dyn IdentityProvider>) -> Self {
		let origins = OriginGate::new(config.allowed_origins.iter().cloned()).strict(config.strict_origin);
		Self {
			origins: Arc::new(origins),
			credentials: CredentialGate::new(
				provider.clone(),
				config.clock_skew,
				config.provider_timeout,
			),
			provider,
			provider_timeout: config.provider_timeout,
		}
	}

	pub fn router(&self) -> Router {
		let protected: Router<Gateway> = Router::new()
			.route("/profile", get(get_profile))
			.route_layer(middleware::from_fn_with_state(
				self.credentials.clone(),
				credential_gate,
			));

		Router::new()
			.route("/health", get(health))
			.merge(protected)
			.fallback(not_found)
			.with_state(self.clone())
			.layer(middleware::from_fn_with_state(
				self.origins.clone(),
				origin_gate,
			))
			.layer(TraceLayer::new_for_http())
	}
}

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
	#[error("identity lookup failed: {0}")]
	Lookup(ProviderError),
	#[error("failed to serialize profile: {0}")]
	Serialize(#[from] serde_json::Error),
}

impl IntoResponse for ProfileError {
	fn into_response(self) -> Response {
		match &self {
			ProfileError::Lookup(err) if err.is_timeout() => {
				error!(error = %err, "identity lookup timed out");
				plain_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch user information")
			},
			ProfileError::Lookup(err) if err.is_not_found() => {
				plain_error(StatusCode::NOT_FOUND, "User not found")
			},
			ProfileError::Lookup(err) if err.is_unauthorized() => plain_error(
				StatusCode::FORBIDDEN,
				"Unauthorized to access user information",
			),
			ProfileError::Lookup(err) => {
				error!(error = %err, "identity lookup failed");
				plain_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch user information")
			},
			ProfileError::Serialize(err) => {
				error!(error = %err, "failed to serialize profile");
				plain_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
			},
		}
	}
}

async fn health() -> Json<serde_json::Value> {
	Json(json!({
		"status": "ok",
		"time": chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
	}))
}

async fn get_profile(
	State(gateway): State<Gateway>,
	Extension(subject): Extension<Subject>,
	headers: HeaderMap,
) -> Result<Response, ProfileError> {
	let client = match identity::extract(&headers) {
		Ok(client) => client,
		Err(err) => {
			warn!(subject = subject.as_str(), error = %err, "ignoring client identity payload");
			None
		},
	};

	let record = with_deadline(
		gateway.provider_timeout,
		gateway.provider.fetch_identity(subject.as_str()),
	)
	.await
	.map_err(ProfileError::Lookup)?;

	let composed = profile::compose(&record, client.as_ref());
	debug!(
		subject = subject.as_str(),
		request_id = %composed.request_id,
		client_payload = composed.frontend_info.is_some(),
		"profile composed"
	);
	let body = serde_json::to_vec(&composed)?;

	Ok(
		(
			[
				(CONTENT_TYPE, HeaderValue::from_static("application/json")),
				(CACHE_CONTROL, HeaderValue::from_static(NO_STORE)),
			],
			body,
		)
			.into_response(),
	)
}

async fn not_found() -> Response {
	plain_error(StatusCode::NOT_FOUND, "Not Found")
}

/// Serve the gateway on `config.listen` until Ctrl-C or SIGTERM.
pub async fn run(config: Config, provider: Arc<dyn IdentityProvider>) -> anyhow::Result<()> {
	let gateway = Gateway::new(&config, provider);
	let listener = TcpListener::bind(config.listen).await?;
	info!(address = %listener.local_addr()?, "profile gateway listening");

	axum::serve(listener, gateway.router())
		.with_graceful_shutdown(shutdown_signal())
		.await?;
	info!("profile gateway stopped");
	Ok(())
}

async fn shutdown_signal() {
	let ctrl_c = async {
		if let Err(e) = signal::ctrl_c().await {
			error!("failed to install Ctrl+C handler: {e}");
			std::future::pending::<()>().await;
		}
	};

	#[cfg(unix)]
	let terminate = async {
		match signal::unix::signal(signal::unix::SignalKind::terminate()) {
			Ok(mut sig) => {
				sig.recv().await;
			},
			Err(e) => {
				error!("failed to install SIGTERM handler: {e}");
				std::future::pending::<()>().await;
			},
		}
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		() = ctrl_c => info!("received Ctrl+C, shutting down"),
		() = terminate => info!("received SIGTERM, shutting down"),
	}
}
