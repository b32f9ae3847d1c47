//! Profile gateway.
//!
//! Sits in front of an identity provider: verifies the caller's bearer credential,
//! looks up the authoritative identity record, reconciles it with optional
//! client-asserted identity data, and returns a single composed profile document.
//!
//! Request flow: origin gate → credential gate → (client identity extraction,
//! identity record lookup) → profile composition → JSON response.

pub mod app;
pub mod config;
pub mod http;
pub mod identity;
pub mod profile;
pub mod provider;
pub mod telemetry;

pub use app::Gateway;
pub use config::Config;
