// Authoritative identity record, in the shape the Clerk user API returns it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdentityRecord {
	pub id: String,
	#[serde(default)]
	pub username: Option<String>,
	#[serde(default)]
	pub first_name: Option<String>,
	#[serde(default)]
	pub last_name: Option<String>,
	#[serde(default)]
	pub image_url: Option<String>,
	#[serde(default)]
	pub primary_email_address_id: Option<String>,
	#[serde(default)]
	pub email_addresses: Vec<EmailAddress>,
	#[serde(default)]
	pub phone_numbers: Vec<PhoneNumber>,
	#[serde(default)]
	pub web3_wallets: Vec<Web3Wallet>,
	#[serde(default)]
	pub external_accounts: Vec<Value>,
	#[serde(default)]
	pub public_metadata: Map<String, Value>,
	#[serde(default)]
	pub private_metadata: Map<String, Value>,
	#[serde(default)]
	pub unsafe_metadata: Map<String, Value>,
	/// Milliseconds since the epoch.
	#[serde(default)]
	pub created_at: i64,
	/// Milliseconds since the epoch.
	#[serde(default)]
	pub updated_at: i64,
	#[serde(default)]
	pub last_sign_in_at: Option<i64>,
	#[serde(default)]
	pub banned: bool,
	#[serde(default)]
	pub locked: bool,
	#[serde(default)]
	pub two_factor_enabled: bool,
	#[serde(default)]
	pub password_enabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmailAddress {
	pub id: String,
	pub email_address: String,
	#[serde(default)]
	pub verification: Option<Verification>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhoneNumber {
	pub id: String,
	pub phone_number: String,
	#[serde(default)]
	pub verification: Option<Verification>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Web3Wallet {
	pub id: String,
	pub web3_wallet: String,
	#[serde(default)]
	pub verification: Option<Verification>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Verification {
	pub status: String,
	#[serde(default)]
	pub strategy: Option<String>,
}

impl Verification {
	pub fn is_verified(&self) -> bool {
		self.status == "verified"
	}
}

impl IdentityRecord {
	/// The declared primary email, or the first listed one when the declared
	/// id is missing or does not match any address.
	pub fn primary_email(&self) -> Option<&EmailAddress> {
		self
			.primary_email_address_id
			.as_deref()
			.and_then(|id| self.email_addresses.iter().find(|e| e.id == id))
			.or_else(|| self.email_addresses.first())
	}

	/// Whether the primary email address has completed verification.
	pub fn is_verified(&self) -> bool {
		self
			.primary_email()
			.and_then(|e| e.verification.as_ref())
			.is_some_and(Verification::is_verified)
	}
}
