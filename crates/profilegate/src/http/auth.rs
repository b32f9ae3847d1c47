//! Credential gate.
//!
//! Verifies the caller's bearer credential with the identity provider and
//! hands the verified [`Subject`] to downstream handlers through request
//! extensions.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::middleware::Next;
use axum::response::IntoResponse;
use http::{HeaderMap, StatusCode};
use tracing::{debug, error, warn};

use super::{Request, Response, headers, plain_error};
use crate::provider::{IdentityProvider, ProviderError, with_deadline};

pub const AUTHORIZATION: &str = "Authorization";
pub const BEARER_PREFIX: &str = "Bearer ";
/// Clock drift tolerated between the credential issuer and this gateway.
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(30);

/// Verified subject identifier, available to handlers behind the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject(pub String);

impl Subject {
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
	#[error("Missing Authorization header")]
	MissingCredential,
	#[error("Token time validation failed: {0}")]
	TimeValidation(ProviderError),
	#[error("Invalid token: {0}")]
	InvalidCredential(ProviderError),
	#[error("credential verification failed: {0}")]
	Internal(ProviderError),
}

impl AuthError {
	fn classify(err: ProviderError) -> Self {
		if err.is_timeout() {
			AuthError::Internal(err)
		} else if err.is_time_related() {
			AuthError::TimeValidation(err)
		} else {
			AuthError::InvalidCredential(err)
		}
	}

	pub fn status(&self) -> StatusCode {
		match self {
			AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
			_ => StatusCode::UNAUTHORIZED,
		}
	}
}

impl IntoResponse for AuthError {
	fn into_response(self) -> Response {
		match &self {
			AuthError::Internal(err) => {
				error!(error = %err, "credential verification failed");
				plain_error(self.status(), "Internal server error")
			},
			_ => plain_error(self.status(), self.to_string()),
		}
	}
}

#[derive(Clone)]
pub struct CredentialGate {
	provider: Arc<dyn IdentityProvider>,
	clock_skew: Duration,
	timeout: Duration,
}

impl CredentialGate {
	pub fn new(provider: Arc<dyn IdentityProvider>, clock_skew: Duration, timeout: Duration) -> Self {
		Self {
			provider,
			clock_skew,
			timeout,
		}
	}

	pub async fn authenticate(&self, headers: &HeaderMap) -> Result<Subject, AuthError> {
		let credential = headers::resolve(headers, AUTHORIZATION);
		if credential.is_empty() {
			return Err(AuthError::MissingCredential);
		}
		let token = credential
			.strip_prefix(BEARER_PREFIX)
			.unwrap_or(&credential);

		let verified = with_deadline(
			self.timeout,
			self.provider.verify_credential(token, self.clock_skew),
		)
		.await
		.map_err(AuthError::classify)?;
		Ok(Subject(verified.subject))
	}
}

/// Middleware rejecting requests without a valid credential.
pub async fn credential_gate(
	State(gate): State<CredentialGate>,
	mut req: Request,
	next: Next,
) -> Response {
	match gate.authenticate(req.headers()).await {
		Ok(subject) => {
			debug!(subject = subject.as_str(), "credential verified");
			req.extensions_mut().insert(subject);
			next.run(req).await
		},
		Err(err) => {
			if !matches!(err, AuthError::Internal(_)) {
				warn!(error = %err, "credential rejected");
			}
			err.into_response()
		},
	}
}
