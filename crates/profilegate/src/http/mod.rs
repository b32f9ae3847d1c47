//! HTTP plumbing shared by the gateway stages.

pub mod auth;
pub mod cors;
pub mod headers;

pub type Body = axum::body::Body;
pub type Request = axum::extract::Request;
pub type Response = axum::response::Response;

use axum::response::IntoResponse;
use http::StatusCode;

/// Build a plain-text error response.
pub fn plain_error(status: StatusCode, message: impl Into<String>) -> Response {
	(status, message.into()).into_response()
}
