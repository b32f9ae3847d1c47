//! Profile composition.
//!
//! The identity record is authoritative. A client payload, when present, is
//! attached as `frontendInfo` and only fills fields the record left empty.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::identity::ClientIdentity;
use crate::provider::{EmailAddress, IdentityRecord, PhoneNumber, Web3Wallet};

/// Response document for `GET /profile`. Field order is the wire order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComposedProfile {
	pub id: String,
	pub username: Option<String>,
	pub first_name: String,
	pub last_name: String,
	pub full_name: String,
	pub primary_email: String,
	pub emails: Vec<EmailAddress>,
	pub image_url: Option<String>,
	pub has_image: bool,
	pub created_at: i64,
	pub updated_at: i64,
	pub banned: bool,
	pub locked: bool,
	pub verified: bool,
	pub public_metadata: Map<String, Value>,
	pub private_metadata: Map<String, Value>,
	pub unsafe_metadata: Map<String, Value>,
	pub external_accounts: Vec<Value>,
	pub last_sign_in_at: Option<i64>,
	pub two_factor_enabled: bool,
	pub password_enabled: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub primary_phone: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub phones: Option<Vec<PhoneNumber>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub web3_wallets: Option<Vec<Web3Wallet>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub frontend_info: Option<ClientIdentity>,
	pub request_id: String,
	pub timestamp: String,
}

/// Per-request metadata stamped onto every composed profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestMeta {
	pub request_id: String,
	/// Unix seconds, as a decimal string.
	pub timestamp: String,
}

impl RequestMeta {
	pub fn generate() -> Self {
		Self {
			request_id: generate_request_id(),
			timestamp: chrono::Utc::now().timestamp().to_string(),
		}
	}
}

/// `req_` followed by 16 random bytes in lowercase hex.
pub fn generate_request_id() -> String {
	let bytes: [u8; 16] = rand::random();
	format!("req_{}", hex::encode(bytes))
}

pub fn compose(record: &IdentityRecord, client: Option<&ClientIdentity>) -> ComposedProfile {
	compose_with(record, client, RequestMeta::generate())
}

pub fn compose_with(
	record: &IdentityRecord,
	client: Option<&ClientIdentity>,
	meta: RequestMeta,
) -> ComposedProfile {
	let mut username = record.username.clone();
	let mut first_name = record.first_name.clone().unwrap_or_default();
	let mut last_name = record.last_name.clone().unwrap_or_default();
	let mut image_url = record.image_url.clone();

	if let Some(client) = client {
		if is_blank(username.as_deref()) && !client.username.is_empty() {
			username = Some(client.username.clone());
		}
		if first_name.is_empty() {
			let mut words = client.name.split_whitespace();
			if let Some(first) = words.next() {
				first_name = first.to_string();
				if last_name.is_empty() {
					last_name = words.collect::<Vec<_>>().join(" ");
				}
			}
		}
		if is_blank(image_url.as_deref()) && !client.avatar.is_empty() {
			image_url = Some(client.avatar.clone());
		}
	}

	let full_name = format!("{first_name} {last_name}").trim().to_string();
	let phones = (!record.phone_numbers.is_empty()).then(|| record.phone_numbers.clone());

	ComposedProfile {
		id: record.id.clone(),
		username,
		first_name,
		last_name,
		full_name,
		primary_email: record
			.primary_email()
			.map(|e| e.email_address.clone())
			.unwrap_or_default(),
		emails: record.email_addresses.clone(),
		image_url,
		has_image: !is_blank(record.image_url.as_deref()),
		created_at: record.created_at,
		updated_at: record.updated_at,
		banned: record.banned,
		locked: record.locked,
		verified: record.is_verified(),
		public_metadata: record.public_metadata.clone(),
		private_metadata: record.private_metadata.clone(),
		unsafe_metadata: record.unsafe_metadata.clone(),
		external_accounts: record.external_accounts.clone(),
		last_sign_in_at: record.last_sign_in_at,
		two_factor_enabled: record.two_factor_enabled,
		password_enabled: record.password_enabled,
		primary_phone: record.phone_numbers.first().map(|p| p.phone_number.clone()),
		phones,
		web3_wallets: (!record.web3_wallets.is_empty()).then(|| record.web3_wallets.clone()),
		frontend_info: client.cloned(),
		request_id: meta.request_id,
		timestamp: meta.timestamp,
	}
}

fn is_blank(value: Option<&str>) -> bool {
	value.is_none_or(str::is_empty)
}
