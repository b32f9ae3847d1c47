//! Origin gate.
//!
//! Preflight requests are answered here and never reach a handler. Other
//! requests are forwarded; admitted origins get their response annotated.

use std::collections::HashSet;
use std::sync::Arc;

use axum::extract::State;
use axum::middleware::Next;
use http::header::{
	ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
	ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_MAX_AGE, ORIGIN,
};
use http::{HeaderValue, Method, StatusCode};
use tracing::{debug, warn};

use super::{Request, Response, headers};

/// Loopback origins used by local frontends.
pub const DEFAULT_ALLOWED_ORIGINS: &[&str] = &[
	"http://localhost:5173",
	"http://localhost:5174",
	"http://localhost:3000",
	"http://localhost:8080",
	"http://127.0.0.1:5174",
	"http://127.0.0.1:3000",
	"http://127.0.0.1:8080",
];

pub const ALLOWED_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS, PATCH";
pub const ALLOWED_HEADERS: &str = "Content-Type, Authorization, Authorization-Encoded, X-User-Info, X-User-Info-Encoded, X-User-Info-Encoded-Type, X-Requested-With";
pub const MAX_AGE_SECS: u32 = 86400;

const WILDCARD: &str = "*";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
	/// Answer the preflight directly. `allow_origin` is the request origin,
	/// or `*` when the request carried no `Origin` header.
	Preflight { allow_origin: String },
	/// Terminate with 403 and no CORS headers.
	Reject,
	/// Run the next stage; annotate the response when `allow_origin` is set,
	/// using the same echo-or-`*` rule as preflights.
	Forward { allow_origin: Option<String> },
}

/// Admission policy over a fixed origin allow-list. Built once at startup.
#[derive(Debug, Clone)]
pub struct OriginGate {
	allowed: HashSet<String>,
	strict: bool,
}

impl Default for OriginGate {
	fn default() -> Self {
		Self::new(DEFAULT_ALLOWED_ORIGINS.iter().copied())
	}
}

impl OriginGate {
	pub fn new<I, S>(origins: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self {
			allowed: origins.into_iter().map(Into::into).collect(),
			strict: false,
		}
	}

	/// Reject non-preflight requests from disallowed origins instead of
	/// forwarding them unannotated.
	pub fn strict(mut self, strict: bool) -> Self {
		self.strict = strict;
		self
	}

	/// An absent origin is admissible: same-origin and non-browser callers send none.
	pub fn is_admissible(&self, origin: &str) -> bool {
		origin.is_empty() || self.allowed.contains(origin)
	}

	pub fn admit(&self, origin: &str, method: &Method) -> Decision {
		let admissible = self.is_admissible(origin);
		let allow_origin = || {
			if origin.is_empty() {
				WILDCARD.to_string()
			} else {
				origin.to_string()
			}
		};

		match (*method == Method::OPTIONS, admissible) {
			(true, true) => Decision::Preflight {
				allow_origin: allow_origin(),
			},
			(true, false) => Decision::Reject,
			(false, true) => Decision::Forward {
				allow_origin: Some(allow_origin()),
			},
			(false, false) if self.strict => Decision::Reject,
			(false, false) => Decision::Forward { allow_origin: None },
		}
	}
}

fn set_origin(response: &mut Response, allow_origin: &str) {
	let Ok(value) = HeaderValue::from_str(allow_origin) else {
		return;
	};
	let headers = response.headers_mut();
	headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, value);
	headers.insert(
		ACCESS_CONTROL_ALLOW_CREDENTIALS,
		HeaderValue::from_static("true"),
	);
}

fn preflight_response(allow_origin: &str) -> Response {
	let mut response = Response::default();
	set_origin(&mut response, allow_origin);
	let headers = response.headers_mut();
	headers.insert(
		ACCESS_CONTROL_ALLOW_METHODS,
		HeaderValue::from_static(ALLOWED_METHODS),
	);
	headers.insert(
		ACCESS_CONTROL_ALLOW_HEADERS,
		HeaderValue::from_static(ALLOWED_HEADERS),
	);
	headers.insert(ACCESS_CONTROL_MAX_AGE, HeaderValue::from(MAX_AGE_SECS));
	response
}

fn rejection() -> Response {
	let mut response = Response::default();
	*response.status_mut() = StatusCode::FORBIDDEN;
	response
}

/// Middleware applying an [`OriginGate`] to every request.
pub async fn origin_gate(State(gate): State<Arc<OriginGate>>, req: Request, next: Next) -> Response {
	// An unreadable origin is still present, so it never maps to the wildcard.
	let origin = headers::raw(req.headers(), ORIGIN.as_str())
		.unwrap_or_default()
		.into_owned();

	match gate.admit(&origin, req.method()) {
		Decision::Preflight { allow_origin } => {
			debug!(%origin, "preflight admitted");
			preflight_response(&allow_origin)
		},
		Decision::Reject => {
			warn!(%origin, method = %req.method(), "origin rejected");
			rejection()
		},
		Decision::Forward { allow_origin } => {
			if allow_origin.is_none() {
				debug!(%origin, "forwarding request from disallowed origin without CORS headers");
			}
			let mut response = next.run(req).await;
			if let Some(allow_origin) = allow_origin {
				set_origin(&mut response, &allow_origin);
			}
			response
		},
	}
}
