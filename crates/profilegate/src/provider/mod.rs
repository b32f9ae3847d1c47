//! Identity provider collaborator.
//!
//! The gateway never issues credentials. It asks an [`IdentityProvider`] to
//! verify a bearer token and to fetch the authoritative record for the
//! subject the token names.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

mod clerk;
mod record;

pub use clerk::ClerkProvider;
pub use record::{EmailAddress, IdentityRecord, PhoneNumber, Verification, Web3Wallet};

#[cfg(any(test, feature = "testing"))]
pub mod memory;

/// Outcome of a successful credential verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedSubject {
	/// Provider-assigned subject identifier.
	pub subject: String,
	/// Provider session the credential belongs to, if the provider reports one.
	pub session_id: Option<String>,
	/// Expiry of the credential, seconds since the epoch.
	pub expires_at: Option<i64>,
}

impl VerifiedSubject {
	pub fn new(subject: impl Into<String>) -> Self {
		Self {
			subject: subject.into(),
			session_id: None,
			expires_at: None,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
	#[error("token is expired")]
	Expired,
	#[error("token is not valid yet (issued in the future)")]
	NotYetValid,
	#[error("invalid token: {0}")]
	InvalidToken(String),
	#[error("user not found")]
	NotFound,
	#[error("unauthorized: {0}")]
	Unauthorized(String),
	#[error("identity provider call timed out after {0:?}")]
	Timeout(Duration),
	#[error("{0}")]
	Other(String),
}

impl ProviderError {
	pub fn is_timeout(&self) -> bool {
		matches!(self, ProviderError::Timeout(_))
	}

	/// Expiry and not-before failures. Providers that only report a message
	/// are classified by its wording.
	pub fn is_time_related(&self) -> bool {
		match self {
			ProviderError::Expired | ProviderError::NotYetValid => true,
			ProviderError::Timeout(_) => false,
			other => other.message_contains(&["expired", "future"]),
		}
	}

	pub fn is_not_found(&self) -> bool {
		match self {
			ProviderError::NotFound => true,
			ProviderError::Timeout(_) => false,
			other => other.message_contains(&["not found"]),
		}
	}

	pub fn is_unauthorized(&self) -> bool {
		match self {
			ProviderError::Unauthorized(_) => true,
			ProviderError::Timeout(_) => false,
			other => other.message_contains(&["unauthorized"]),
		}
	}

	fn message_contains(&self, needles: &[&str]) -> bool {
		let message = self.to_string().to_lowercase();
		needles.iter().any(|needle| message.contains(needle))
	}
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
	/// Verify `token`, tolerating up to `leeway` of clock drift on its time claims.
	async fn verify_credential(
		&self,
		token: &str,
		leeway: Duration,
	) -> Result<VerifiedSubject, ProviderError>;

	/// Fetch the authoritative identity record for `subject`.
	async fn fetch_identity(&self, subject: &str) -> Result<IdentityRecord, ProviderError>;
}

/// Bound a provider call by `deadline`.
pub async fn with_deadline<T>(
	deadline: Duration,
	call: impl Future<Output = Result<T, ProviderError>>,
) -> Result<T, ProviderError> {
	tokio::time::timeout(deadline, call)
		.await
		.unwrap_or(Err(ProviderError::Timeout(deadline)))
}
