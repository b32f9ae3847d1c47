//! Scrubbing of untrusted, open-shaped JSON mappings.
//!
//! Values under keys that look sensitive are replaced with [`REDACTED`], long
//! strings are cut to [`MAX_STRING_CHARS`] characters followed by [`TRUNCATED`],
//! and containers nested deeper than [`MAX_DEPTH`] collapse to [`DEPTH_EXCEEDED`].
//! Keys are never removed. Sanitizing an already sanitized mapping is a no-op.

use serde_json::{Map, Value};

pub const REDACTED: &str = "[REDACTED]";
pub const TRUNCATED: &str = "...[TRUNCATED]";
pub const DEPTH_EXCEEDED: &str = "[DEPTH_LIMIT]";
pub const MAX_STRING_CHARS: usize = 1000;
pub const MAX_DEPTH: usize = 32;

const SENSITIVE_TERMS: [&str; 6] = ["password", "token", "secret", "key", "auth", "credential"];

/// Whether `key` contains a sensitive term, ignoring case.
pub fn is_sensitive_key(key: &str) -> bool {
	let key = key.to_lowercase();
	SENSITIVE_TERMS.iter().any(|term| key.contains(term))
}

/// Sanitize a mapping. Absent mappings stay absent: callers map over their `Option`.
pub fn sanitize(map: &Map<String, Value>) -> Map<String, Value> {
	sanitize_map(map, 0)
}

fn sanitize_map(map: &Map<String, Value>, depth: usize) -> Map<String, Value> {
	map
		.iter()
		.map(|(key, value)| {
			let value = if is_sensitive_key(key) {
				Value::String(REDACTED.to_string())
			} else {
				sanitize_value(value, depth + 1)
			};
			(key.clone(), value)
		})
		.collect()
}

fn sanitize_value(value: &Value, depth: usize) -> Value {
	match value {
		Value::Object(_) | Value::Array(_) if depth >= MAX_DEPTH => {
			Value::String(DEPTH_EXCEEDED.to_string())
		},
		Value::Object(map) => Value::Object(sanitize_map(map, depth)),
		Value::Array(items) => Value::Array(
			items
				.iter()
				.map(|item| sanitize_value(item, depth + 1))
				.collect(),
		),
		Value::String(s) => Value::String(truncate(s)),
		other => other.clone(),
	}
}

fn truncate(s: &str) -> String {
	match s.char_indices().nth(MAX_STRING_CHARS) {
		Some((cut, _)) => format!("{}{TRUNCATED}", &s[..cut]),
		None => s.to_string(),
	}
}
