use std::time::Duration;

use axum::body::Body;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use http::{HeaderValue, StatusCode};
use http::header::{CACHE_CONTROL, CONTENT_TYPE};
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use profilegate::Config;
use profilegate::provider::ProviderError;
use profilegate::provider::memory::StaticProvider;
use serde_json::json;

use crate::common::*;

#[tokio::test]
async fn test_profile_success() {
	let gw = TestGateway::new(provider());
	let resp = gw.send(authed_get("/profile").body(Body::empty()).unwrap()).await;
	assert_eq!(resp.status(), StatusCode::OK);
	assert_eq!(resp.headers()[CONTENT_TYPE], "application/json");
	assert_eq!(
		resp.headers()[CACHE_CONTROL],
		"no-cache, no-store, must-revalidate"
	);

	let body = body_json(resp).await;
	assert_eq!(body["id"], SUBJECT);
	assert_eq!(body["username"], "ada");
	assert_eq!(body["fullName"], "Ada Lovelace");
	assert_eq!(body["primaryEmail"], "ada@example.com");
	assert_eq!(body["hasImage"], true);
	assert_eq!(body["verified"], true);
	assert_eq!(body["emails"][0]["email_address"], "ada@example.com");
	assert!(body.get("frontendInfo").is_none());
	assert!(body["requestId"].as_str().unwrap().starts_with("req_"));
	assert!(body["timestamp"].as_str().unwrap().parse::<i64>().is_ok());
}

#[tokio::test]
async fn test_verification_uses_thirty_second_skew() {
	let gw = TestGateway::new(provider());
	gw.send(authed_get("/profile").body(Body::empty()).unwrap()).await;
	assert_eq!(gw.provider.observed_leeway(), Some(Duration::from_secs(30)));
}

#[tokio::test]
async fn test_missing_credential() {
	let gw = TestGateway::new(provider());
	let resp = gw.send(get("/profile").body(Body::empty()).unwrap()).await;
	assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
	assert_eq!(body_text(resp).await, "Missing Authorization header");
}

#[tokio::test]
async fn test_expired_credential() {
	let gw = TestGateway::new(provider().with_token_error(
		"sess_old",
		ProviderError::InvalidToken("JWT is expired".to_string()),
	));
	let resp = gw
		.send(
			get("/profile")
				.header("Authorization", "Bearer sess_old")
				.body(Body::empty())
				.unwrap(),
		)
		.await;
	assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
	assert!(
		body_text(resp)
			.await
			.starts_with("Token time validation failed:")
	);
}

#[tokio::test]
async fn test_invalid_credential() {
	let gw = TestGateway::new(provider());
	let resp = gw
		.send(
			get("/profile")
				.header("Authorization", "Bearer forged")
				.body(Body::empty())
				.unwrap(),
		)
		.await;
	assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
	assert!(body_text(resp).await.starts_with("Invalid token:"));
}

#[tokio::test]
async fn test_encoded_credential() {
	let gw = TestGateway::new(provider());
	let encoded = STANDARD.encode(format!("Bearer%20{TOKEN}"));
	let resp = gw
		.send(
			get("/profile")
				.header("Authorization-Encoded", encoded)
				.body(Body::empty())
				.unwrap(),
		)
		.await;
	assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_client_payload_backfills_record() {
	let mut sparse = record();
	sparse.username = None;
	sparse.first_name = None;
	sparse.last_name = None;
	sparse.image_url = None;
	let gw = TestGateway::new(
		StaticProvider::new()
			.with_token(TOKEN, SUBJECT)
			.with_record(sparse),
	);

	let payload = json!({
		"userId": SUBJECT,
		"username": "lovelace",
		"name": "Ada Lovelace",
		"avatar": "https://img.example/ada.png",
		"preferences": {"theme": "dark", "apiToken": "abc123"},
	});
	let resp = gw
		.send(
			authed_get("/profile")
				.header("X-User-Info-Encoded", STANDARD.encode(payload.to_string()))
				.header("X-User-Info-Encoded-Type", "base64")
				.body(Body::empty())
				.unwrap(),
		)
		.await;
	assert_eq!(resp.status(), StatusCode::OK);

	let body = body_json(resp).await;
	assert_eq!(body["username"], "lovelace");
	assert_eq!(body["firstName"], "Ada");
	assert_eq!(body["lastName"], "Lovelace");
	assert_eq!(body["imageUrl"], "https://img.example/ada.png");
	assert_eq!(body["hasImage"], false);
	assert_eq!(body["frontendInfo"]["userId"], SUBJECT);
	assert_eq!(body["frontendInfo"]["preferences"]["theme"], "dark");
	assert_eq!(body["frontendInfo"]["preferences"]["apiToken"], "[REDACTED]");
}

#[tokio::test]
async fn test_client_payload_never_overrides_record() {
	let gw = TestGateway::new(provider());
	let payload = json!({"username": "impostor", "name": "Someone Else"}).to_string();
	let resp = gw
		.send(
			authed_get("/profile")
				.header("X-User-Info", payload)
				.body(Body::empty())
				.unwrap(),
		)
		.await;
	let body = body_json(resp).await;
	assert_eq!(body["username"], "ada");
	assert_eq!(body["firstName"], "Ada");
	assert_eq!(body["frontendInfo"]["username"], "impostor");
}

#[tokio::test]
async fn test_raw_unicode_payload() {
	let gw = TestGateway::new(provider());
	let payload = json!({"userId": SUBJECT, "name": "Zoë Saldaña"}).to_string();
	let resp = gw
		.send(
			authed_get("/profile")
				.header("X-User-Info", HeaderValue::from_bytes(payload.as_bytes()).unwrap())
				.body(Body::empty())
				.unwrap(),
		)
		.await;
	assert_eq!(resp.status(), StatusCode::OK);
	let body = body_json(resp).await;
	assert_eq!(body["frontendInfo"]["name"], "Zoë Saldaña");
}

#[tokio::test]
async fn test_percent_encoded_payload() {
	let gw = TestGateway::new(provider());
	let payload = json!({"email": "ada@example.com", "name": "Ada Lovelace"}).to_string();
	let resp = gw
		.send(
			authed_get("/profile")
				.header(
					"X-User-Info-Encoded",
					utf8_percent_encode(&payload, NON_ALPHANUMERIC).to_string(),
				)
				.body(Body::empty())
				.unwrap(),
		)
		.await;
	let body = body_json(resp).await;
	assert_eq!(body["frontendInfo"]["email"], "ada@example.com");
}

#[tokio::test]
async fn test_unusable_client_payload_is_ignored() {
	let gw = TestGateway::new(provider());
	let oversized = json!({"userId": "x".repeat(11 * 1024)}).to_string();
	let anonymous = json!({"name": "No Identifiers"}).to_string();

	for payload in ["{not json", oversized.as_str(), anonymous.as_str()] {
		let resp = gw
			.send(
				authed_get("/profile")
					.header("X-User-Info", payload)
					.body(Body::empty())
					.unwrap(),
			)
			.await;
		assert_eq!(resp.status(), StatusCode::OK);
		let body = body_json(resp).await;
		assert!(body.get("frontendInfo").is_none());
		assert_eq!(body["username"], "ada");
	}

	let resp = gw
		.send(
			authed_get("/profile")
				.header("X-User-Info-Encoded", "%%%")
				.header("X-User-Info-Encoded-Type", "base64")
				.body(Body::empty())
				.unwrap(),
		)
		.await;
	assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_lookup_failures() {
	let gw = TestGateway::new(
		StaticProvider::new()
			.with_token("missing", "user_missing")
			.with_token("hidden", "user_hidden")
			.with_token("broken", "user_broken")
			.with_lookup_error("user_hidden", ProviderError::Unauthorized("403 Forbidden".to_string()))
			.with_lookup_error(
				"user_broken",
				ProviderError::Other("connection reset by upstream at 10.0.0.7".to_string()),
			),
	);

	let cases = [
		("missing", StatusCode::NOT_FOUND, "User not found"),
		(
			"hidden",
			StatusCode::FORBIDDEN,
			"Unauthorized to access user information",
		),
		(
			"broken",
			StatusCode::INTERNAL_SERVER_ERROR,
			"Failed to fetch user information",
		),
	];
	for (token, status, message) in cases {
		let resp = gw
			.send(
				get("/profile")
					.header("Authorization", format!("Bearer {token}"))
					.body(Body::empty())
					.unwrap(),
			)
			.await;
		assert_eq!(resp.status(), status, "{token}");
		assert_eq!(body_text(resp).await, message);
	}
}

#[tokio::test(start_paused = true)]
async fn test_slow_provider_times_out() {
	let config = Config {
		provider_timeout: Duration::from_secs(2),
		..Config::default()
	};
	let gw = TestGateway::with_config(config, provider().with_delay(Duration::from_secs(30)));
	let resp = gw.send(authed_get("/profile").body(Body::empty()).unwrap()).await;
	assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
	assert_eq!(body_text(resp).await, "Internal server error");
}
