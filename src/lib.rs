//! Signed-request gateway for a managed discovery/search API.
//!
//! Service-account OAuth tokens are minted through the JWT-bearer grant and attached to forwarded
//! search requests; a downstream `401` triggers exactly one retry with a freshly minted token.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod config;
pub mod error;
pub mod forward;
pub mod http;
pub mod oauth;
pub mod obs;
pub mod policy;
pub mod search;
pub mod server;
pub mod signer;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for tests; enabled via `cfg(test)` or the `test`
	//! crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		auth::{ScopeSet, ServiceAccountKey},
		http::ReqwestHttpClient,
	};

	/// PKCS#8 RSA key used by fixtures; never valid against a real token endpoint.
	pub const TEST_PRIVATE_KEY_PEM: &str = include_str!("../tests/fixtures/rsa_test_key.pem");
	/// Service-account identity stamped into fixture assertions.
	pub const TEST_CLIENT_EMAIL: &str = "gateway-test@diagnostics.iam.gserviceaccount.com";

	/// Builds a service-account key whose token URI points at `token_uri`.
	pub fn test_service_account_key(token_uri: &str) -> ServiceAccountKey {
		ServiceAccountKey::new(
			TEST_CLIENT_EMAIL,
			TEST_PRIVATE_KEY_PEM,
			Url::parse(token_uri).expect("Failed to parse test token URI."),
		)
	}

	/// Default scope set used across tests.
	pub fn test_scope() -> ScopeSet {
		ScopeSet::new(["https://www.googleapis.com/auth/cloud-platform"])
			.expect("Failed to build test scope.")
	}

	/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestHttpClient::with_client(client)
	}
}

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		hash::{Hash, Hasher},
		pin::Pin,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use serde_json::Value as JsonValue;
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _, tower as _};
