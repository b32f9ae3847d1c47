//! In-memory identity provider for tests.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use super::{IdentityProvider, IdentityRecord, ProviderError, VerifiedSubject};

/// Identity provider answering from fixed tables.
///
/// Unknown tokens fail verification and unknown subjects are not found.
#[derive(Default)]
pub struct StaticProvider {
	tokens: HashMap<String, Result<VerifiedSubject, ProviderError>>,
	records: HashMap<String, Result<IdentityRecord, ProviderError>>,
	delay: Option<Duration>,
	observed_leeway: Mutex<Option<Duration>>,
}

impl StaticProvider {
	pub fn new() -> Self {
		Self::default()
	}

	/// Accept `token` as a credential for `subject`.
	pub fn with_token(mut self, token: impl Into<String>, subject: impl Into<String>) -> Self {
		self
			.tokens
			.insert(token.into(), Ok(VerifiedSubject::new(subject)));
		self
	}

	/// Reject `token` with `error`.
	pub fn with_token_error(mut self, token: impl Into<String>, error: ProviderError) -> Self {
		self.tokens.insert(token.into(), Err(error));
		self
	}

	pub fn with_record(mut self, record: IdentityRecord) -> Self {
		self.records.insert(record.id.clone(), Ok(record));
		self
	}

	/// Fail lookups of `subject` with `error`.
	pub fn with_lookup_error(mut self, subject: impl Into<String>, error: ProviderError) -> Self {
		self.records.insert(subject.into(), Err(error));
		self
	}

	/// Delay every call, for exercising deadlines.
	pub fn with_delay(mut self, delay: Duration) -> Self {
		self.delay = Some(delay);
		self
	}

	/// The leeway passed to the most recent verification.
	pub fn observed_leeway(&self) -> Option<Duration> {
		*self.observed_leeway.lock().unwrap_or_else(PoisonError::into_inner)
	}

	async fn pause(&self) {
		if let Some(delay) = self.delay {
			tokio::time::sleep(delay).await;
		}
	}
}

#[async_trait]
impl IdentityProvider for StaticProvider {
	async fn verify_credential(
		&self,
		token: &str,
		leeway: Duration,
	) -> Result<VerifiedSubject, ProviderError> {
		*self.observed_leeway.lock().unwrap_or_else(PoisonError::into_inner) = Some(leeway);
		self.pause().await;
		self
			.tokens
			.get(token)
			.cloned()
			.unwrap_or_else(|| Err(ProviderError::InvalidToken("unknown token".to_string())))
	}

	async fn fetch_identity(&self, subject: &str) -> Result<IdentityRecord, ProviderError> {
		self.pause().await;
		self
			.records
			.get(subject)
			.cloned()
			.unwrap_or(Err(ProviderError::NotFound))
	}
}
