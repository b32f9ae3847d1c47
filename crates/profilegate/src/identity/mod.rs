//! Client-asserted identity payloads.
//!
//! Frontends may attach what they believe about the signed-in user to the
//! profile request. The payload is untrusted: it is size-limited, decoded
//! according to the declared encoding, validated and sanitized before it is
//! allowed anywhere near the composed profile. Every failure here is
//! recoverable; callers fall back to the authoritative record alone.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use http::HeaderMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::http::headers;

pub mod sanitize;

pub const USER_INFO_HEADER: &str = "X-User-Info";
pub const USER_INFO_ENCODED_HEADER: &str = "X-User-Info-Encoded";
pub const USER_INFO_ENCODING_HEADER: &str = "X-User-Info-Encoded-Type";

/// Upper bound on the transported payload, checked before any decoding.
pub const MAX_PAYLOAD_BYTES: usize = 10 * 1024;

const MAX_USER_ID_CHARS: usize = 255;
const MAX_USERNAME_CHARS: usize = 100;
const MAX_EMAIL_CHARS: usize = 255;
const MAX_NAME_CHARS: usize = 200;
const MAX_AVATAR_CHARS: usize = 500;

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
	#[error("user info data too large: {0} bytes")]
	TooLarge(usize),
	#[error("failed to decode user info with encoding {encoding}: {reason}")]
	Decode { encoding: Encoding, reason: String },
	#[error("failed to parse user info JSON: {0}")]
	Parse(#[from] serde_json::Error),
	#[error("user info missing required identification fields")]
	MissingIdentification,
}

/// Transport encoding of the `X-User-Info-Encoded` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
	/// Standard-alphabet base64 of the JSON text.
	Base64,
	/// JSON text as-is.
	Raw,
	/// Percent-encoded JSON text.
	Percent,
}

impl Encoding {
	/// Interpret the `X-User-Info-Encoded-Type` marker. Anything that is not
	/// `base64` or `raw`, including a missing marker, means percent-encoding.
	pub fn from_marker(marker: Option<&str>) -> Self {
		match marker.map(str::to_ascii_lowercase).as_deref() {
			Some("base64") => Encoding::Base64,
			Some("raw") => Encoding::Raw,
			_ => Encoding::Percent,
		}
	}

	fn decode(self, payload: &str) -> Result<String, ExtractError> {
		let failed = |reason: String| ExtractError::Decode {
			encoding: self,
			reason,
		};
		match self {
			Encoding::Base64 => {
				let bytes = STANDARD.decode(payload).map_err(|e| failed(e.to_string()))?;
				String::from_utf8(bytes).map_err(|e| failed(e.to_string()))
			},
			Encoding::Raw => Ok(payload.to_string()),
			Encoding::Percent => headers::query_unescape(payload).map_err(|e| failed(e.to_string())),
		}
	}
}

impl fmt::Display for Encoding {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Encoding::Base64 => "base64",
			Encoding::Raw => "raw",
			Encoding::Percent => "percent",
		})
	}
}

/// Identity data asserted by the calling client.
///
/// At least one of `user_id`, `username` and `email` is non-empty once a
/// payload has been through [`extract`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientIdentity {
	#[serde(default, deserialize_with = "null_as_empty")]
	pub user_id: String,
	#[serde(default, deserialize_with = "null_as_empty")]
	pub username: String,
	#[serde(default, deserialize_with = "null_as_empty")]
	pub email: String,
	/// Display name, possibly several whitespace separated words.
	#[serde(default, deserialize_with = "null_as_empty")]
	pub name: String,
	/// Avatar URL.
	#[serde(default, deserialize_with = "null_as_empty")]
	pub avatar: String,
	#[serde(default)]
	pub preferences: Option<Map<String, Value>>,
	#[serde(default)]
	pub metadata: Option<Map<String, Value>>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
	D: Deserializer<'de>,
{
	Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl ClientIdentity {
	pub fn has_identification(&self) -> bool {
		!(self.user_id.is_empty() && self.username.is_empty() && self.email.is_empty())
	}

	/// Cap every string field and scrub the open mappings.
	pub fn sanitized(mut self) -> Self {
		truncate_chars(&mut self.user_id, MAX_USER_ID_CHARS);
		truncate_chars(&mut self.username, MAX_USERNAME_CHARS);
		truncate_chars(&mut self.email, MAX_EMAIL_CHARS);
		truncate_chars(&mut self.name, MAX_NAME_CHARS);
		truncate_chars(&mut self.avatar, MAX_AVATAR_CHARS);
		self.preferences = self.preferences.as_ref().map(sanitize::sanitize);
		self.metadata = self.metadata.as_ref().map(sanitize::sanitize);
		self
	}
}

fn truncate_chars(s: &mut String, max: usize) {
	if let Some((cut, _)) = s.char_indices().nth(max) {
		s.truncate(cut);
	}
}

/// Extract the client identity payload from request headers.
///
/// Sources, in priority order: `X-User-Info-Encoded` (decoded per
/// `X-User-Info-Encoded-Type`), then `X-User-Info` as raw JSON. Returns
/// `Ok(None)` when neither is present.
pub fn extract(headers: &HeaderMap) -> Result<Option<ClientIdentity>, ExtractError> {
	let (payload, encoding) = if let Some(encoded) = headers::raw_bytes(headers, USER_INFO_ENCODED_HEADER) {
		let marker = headers::raw(headers, USER_INFO_ENCODING_HEADER);
		(encoded, Encoding::from_marker(marker.as_deref()))
	} else if let Some(raw) = headers::raw_bytes(headers, USER_INFO_HEADER) {
		(raw, Encoding::Raw)
	} else {
		return Ok(None);
	};

	if payload.len() > MAX_PAYLOAD_BYTES {
		return Err(ExtractError::TooLarge(payload.len()));
	}

	let payload = std::str::from_utf8(payload).map_err(|e| ExtractError::Decode {
		encoding,
		reason: e.to_string(),
	})?;
	let decoded = encoding.decode(payload)?;
	let identity: ClientIdentity = serde_json::from_str(&decoded)?;
	if !identity.has_identification() {
		return Err(ExtractError::MissingIdentification);
	}

	Ok(Some(identity.sanitized()))
}
