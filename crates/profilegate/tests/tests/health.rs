use axum::body::Body;
use http::StatusCode;
use http::header::{ACCESS_CONTROL_ALLOW_ORIGIN, ORIGIN};

use crate::common::*;

#[tokio::test]
async fn test_health_needs_no_credential() {
	let gw = TestGateway::new(provider());
	let resp = gw.send(get("/health").body(Body::empty()).unwrap()).await;
	assert_eq!(resp.status(), StatusCode::OK);
	assert_eq!(resp.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");

	let body = body_json(resp).await;
	assert_eq!(body["status"], "ok");
	let time = body["time"].as_str().unwrap();
	assert!(chrono::DateTime::parse_from_rfc3339(time).is_ok(), "{time}");
}

#[tokio::test]
async fn test_health_echoes_admitted_origin() {
	let gw = TestGateway::new(provider());
	let resp = gw
		.send(
			get("/health")
				.header(ORIGIN, ALLOWED_ORIGIN)
				.body(Body::empty())
				.unwrap(),
		)
		.await;
	assert_eq!(resp.status(), StatusCode::OK);
	assert_eq!(resp.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], ALLOWED_ORIGIN);
	assert_eq!(resp.headers()["access-control-allow-credentials"], "true");
}

#[tokio::test]
async fn test_unknown_path() {
	let gw = TestGateway::new(provider());
	let resp = gw.send(get("/nope").body(Body::empty()).unwrap()).await;
	assert_eq!(resp.status(), StatusCode::NOT_FOUND);
	assert_eq!(body_text(resp).await, "Not Found");
}
