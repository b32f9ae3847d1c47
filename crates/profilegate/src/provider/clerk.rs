//! Clerk-backed identity provider.
//!
//! Session tokens are verified locally against the instance's JWT public key,
//! so verification needs no network round trip. User records come from the
//! Backend API, authenticated with the instance secret key.

use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::{IdentityProvider, IdentityRecord, ProviderError, VerifiedSubject};
use crate::config::ProviderConfig;

#[derive(Debug, Clone, Deserialize)]
struct SessionClaims {
	sub: String,
	#[serde(default)]
	sid: Option<String>,
	#[serde(default)]
	exp: Option<i64>,
	#[serde(default)]
	iat: Option<i64>,
}

pub struct ClerkProvider {
	client: reqwest::Client,
	api_url: Url,
	secret_key: SecretString,
	decoding_key: DecodingKey,
	algorithm: Algorithm,
}

impl ClerkProvider {
	pub fn new(
		api_url: &str,
		secret_key: SecretString,
		decoding_key: DecodingKey,
		algorithm: Algorithm,
	) -> anyhow::Result<Self> {
		let api_url = Url::parse(api_url)?;
		if api_url.cannot_be_a_base() {
			anyhow::bail!("identity provider URL cannot be a base: {api_url}");
		}
		Ok(Self {
			client: reqwest::Client::new(),
			api_url,
			secret_key,
			decoding_key,
			algorithm,
		})
	}

	/// Build a provider verifying RS256 session tokens with the configured PEM key.
	pub fn from_config(config: &ProviderConfig) -> anyhow::Result<Self> {
		let Some(secret_key) = config.secret_key.as_ref() else {
			anyhow::bail!("provider secret key is not configured (CLERK_SECRET_KEY)");
		};
		let Some(jwt_key) = config.jwt_key.as_deref() else {
			anyhow::bail!("provider JWT verification key is not configured (CLERK_JWT_KEY)");
		};
		let decoding_key = DecodingKey::from_rsa_pem(jwt_key.as_bytes())?;
		Self::new(
			&config.api_url,
			SecretString::from(secret_key.expose_secret().to_owned()),
			decoding_key,
			Algorithm::RS256,
		)
	}

	fn user_url(&self, subject: &str) -> Result<Url, ProviderError> {
		let mut url = self.api_url.clone();
		url
			.path_segments_mut()
			.map_err(|_| ProviderError::Other(format!("invalid provider URL: {}", self.api_url)))?
			.pop_if_empty()
			.push("users")
			.push(subject);
		Ok(url)
	}
}

fn token_error(err: jsonwebtoken::errors::Error) -> ProviderError {
	match err.kind() {
		ErrorKind::ExpiredSignature => ProviderError::Expired,
		ErrorKind::ImmatureSignature => ProviderError::NotYetValid,
		_ => ProviderError::InvalidToken(err.to_string()),
	}
}

#[async_trait]
impl IdentityProvider for ClerkProvider {
	async fn verify_credential(
		&self,
		token: &str,
		leeway: Duration,
	) -> Result<VerifiedSubject, ProviderError> {
		let mut validation = Validation::new(self.algorithm);
		validation.leeway = leeway.as_secs();
		validation.validate_nbf = true;
		validation.validate_aud = false;
		validation.set_required_spec_claims(&["exp", "sub"]);

		let claims = jsonwebtoken::decode::<SessionClaims>(token, &self.decoding_key, &validation)
			.map_err(token_error)?
			.claims;

		// iat is not checked by the JWT library; a token minted ahead of our
		// clock is only acceptable within the leeway.
		let now = chrono::Utc::now().timestamp();
		if let Some(iat) = claims.iat
			&& iat > now + leeway.as_secs() as i64
		{
			return Err(ProviderError::NotYetValid);
		}

		Ok(VerifiedSubject {
			subject: claims.sub,
			session_id: claims.sid,
			expires_at: claims.exp,
		})
	}

	async fn fetch_identity(&self, subject: &str) -> Result<IdentityRecord, ProviderError> {
		let url = self.user_url(subject)?;
		debug!(%url, "fetching identity record");

		let response = self
			.client
			.get(url)
			.bearer_auth(self.secret_key.expose_secret())
			.send()
			.await
			.map_err(|e| ProviderError::Other(format!("identity provider request failed: {e}")))?;

		match response.status() {
			status if status.is_success() => {},
			StatusCode::NOT_FOUND => return Err(ProviderError::NotFound),
			status @ (StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) => {
				return Err(ProviderError::Unauthorized(format!(
					"identity provider returned {status}"
				)));
			},
			status => {
				return Err(ProviderError::Other(format!(
					"identity provider returned {status}"
				)));
			},
		}

		let body = response
			.bytes()
			.await
			.map_err(|e| ProviderError::Other(format!("failed to read identity record: {e}")))?;
		serde_json::from_slice(&body)
			.map_err(|e| ProviderError::Other(format!("malformed identity record: {e}")))
	}
}
