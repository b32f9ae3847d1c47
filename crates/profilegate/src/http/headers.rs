//! Header lookup with a fallback to transport-encoded siblings.
//!
//! Clients that can only send ASCII header values (browsers forwarding Unicode
//! display names, for example) percent-encode the value, base64 the result and
//! send it under `<name>-Encoded`. [`resolve`] undoes both layers so downstream
//! stages never need to care which form arrived.

use std::borrow::Cow;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use http::HeaderMap;
use percent_encoding::percent_decode_str;
use tracing::{debug, warn};

/// Suffix of the encoded sibling of a header.
pub const ENCODED_SUFFIX: &str = "-Encoded";

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
	#[error("invalid base64: {0}")]
	Base64(#[from] base64::DecodeError),
	#[error("invalid escape sequence at offset {0}")]
	InvalidEscape(usize),
	#[error("decoded value is not valid UTF-8")]
	Utf8,
}

/// Returns the bytes of `name` if it is present and non-empty.
pub fn raw_bytes<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a [u8]> {
	headers
		.get(name)
		.map(|v| v.as_bytes())
		.filter(|v| !v.is_empty())
}

/// Returns the value of `name` if it is present and non-empty. Non-ASCII
/// bytes are read as UTF-8; invalid sequences are replaced, never dropped.
pub fn raw<'a>(headers: &'a HeaderMap, name: &str) -> Option<Cow<'a, str>> {
	raw_bytes(headers, name).map(String::from_utf8_lossy)
}

/// Resolve the effective value of header `name`.
///
/// The raw header always wins when present. Otherwise `<name>-Encoded` is
/// base64 and percent decoded. Missing headers and decode failures both
/// resolve to an empty string; failures are only logged.
pub fn resolve(headers: &HeaderMap, name: &str) -> String {
	if let Some(value) = raw(headers, name) {
		return value.into_owned();
	}

	let encoded_name = format!("{name}{ENCODED_SUFFIX}");
	let Some(encoded) = raw(headers, &encoded_name) else {
		return String::new();
	};

	match decode_encoded(&encoded) {
		Ok(decoded) => {
			debug!(header = name, "decoded encoded header");
			decoded
		},
		Err(e) => {
			warn!(header = name, error = %e, "failed to decode encoded header");
			String::new()
		},
	}
}

/// Decode a `<name>-Encoded` value: base64 (standard alphabet) then percent-decoding.
pub fn decode_encoded(value: &str) -> Result<String, DecodeError> {
	let bytes = STANDARD.decode(value)?;
	let text = String::from_utf8(bytes).map_err(|_| DecodeError::Utf8)?;
	query_unescape(&text)
}

/// Form-style percent decoding: `+` decodes to a space and every `%` must
/// introduce a two digit hex escape.
pub fn query_unescape(value: &str) -> Result<String, DecodeError> {
	let bytes = value.as_bytes();
	let mut i = 0;
	while i < bytes.len() {
		if bytes[i] == b'%' {
			let valid = bytes
				.get(i + 1..i + 3)
				.is_some_and(|hex| hex.iter().all(|b| b.is_ascii_hexdigit()));
			if !valid {
				return Err(DecodeError::InvalidEscape(i));
			}
			i += 3;
		} else {
			i += 1;
		}
	}

	let spaced = value.replace('+', " ");
	percent_decode_str(&spaced)
		.decode_utf8()
		.map(|s| s.into_owned())
		.map_err(|_| DecodeError::Utf8)
}
