use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use http::Request;
use http_body_util::BodyExt;
use profilegate::http::Response;
use profilegate::provider::memory::StaticProvider;
use profilegate::provider::{EmailAddress, IdentityRecord, Verification};
use profilegate::{Config, Gateway};
use serde_json::Value;
use tower::ServiceExt;

pub const ALLOWED_ORIGIN: &str = "http://localhost:3000";
pub const EVIL_ORIGIN: &str = "http://evil.example";
pub const TOKEN: &str = "sess_valid";
pub const SUBJECT: &str = "user_2abc";

/// In-process gateway driven through its router.
pub struct TestGateway {
	router: Router,
	pub provider: Arc<StaticProvider>,
}

impl TestGateway {
	pub fn new(provider: StaticProvider) -> Self {
		Self::with_config(Config::default(), provider)
	}

	pub fn with_config(config: Config, provider: StaticProvider) -> Self {
		let provider = Arc::new(provider);
		let router = Gateway::new(&config, provider.clone()).router();
		Self { router, provider }
	}

	pub async fn send(&self, req: Request<Body>) -> Response {
		self.router.clone().oneshot(req).await.unwrap()
	}
}

/// A provider that accepts [`TOKEN`] for [`SUBJECT`] and knows [`record`].
pub fn provider() -> StaticProvider {
	StaticProvider::new()
		.with_token(TOKEN, SUBJECT)
		.with_record(record())
}

pub fn record() -> IdentityRecord {
	IdentityRecord {
		id: SUBJECT.to_string(),
		username: Some("ada".to_string()),
		first_name: Some("Ada".to_string()),
		last_name: Some("Lovelace".to_string()),
		image_url: Some("https://img.clerk.com/ada".to_string()),
		primary_email_address_id: Some("idn_1".to_string()),
		email_addresses: vec![EmailAddress {
			id: "idn_1".to_string(),
			email_address: "ada@example.com".to_string(),
			verification: Some(Verification {
				status: "verified".to_string(),
				strategy: Some("email_code".to_string()),
			}),
		}],
		created_at: 1_700_000_000_000,
		updated_at: 1_700_000_100_000,
		..Default::default()
	}
}

pub fn get(path: &str) -> http::request::Builder {
	Request::get(path)
}

pub fn authed_get(path: &str) -> http::request::Builder {
	Request::get(path).header("Authorization", format!("Bearer {TOKEN}"))
}

async fn collect(resp: Response) -> Vec<u8> {
	resp.into_body().collect().await.unwrap().to_bytes().to_vec()
}

pub async fn body_text(resp: Response) -> String {
	String::from_utf8(collect(resp).await).unwrap()
}

pub async fn body_json(resp: Response) -> Value {
	serde_json::from_slice(&collect(resp).await).unwrap()
}
