//! Process configuration resolved once at start-up.
//!
//! | Variable | Default |
//! | --- | --- |
//! | `GATEWAY_BIND_ADDR` | `0.0.0.0:8080` |
//! | `GATEWAY_SEARCH_ENDPOINT` | required |
//! | `GATEWAY_CREDENTIALS_JSON` / `GATEWAY_CREDENTIALS_FILE` / `GOOGLE_APPLICATION_CREDENTIALS` | first one set wins; one is required |
//! | `GATEWAY_SCOPES` | `https://www.googleapis.com/auth/cloud-platform` |
//! | `GATEWAY_TOKEN_CACHE` | `false` |
//! | `GATEWAY_TOKEN_CACHE_WINDOW_SECS` | `60` |
//! | `GATEWAY_REQUEST_TIMEOUT_SECS` | `30` |
//! | `GATEWAY_EXPOSE_ERROR_CHAIN` | `false` |

// std
use std::{net::SocketAddr, path::PathBuf, str::FromStr, time::Duration as StdDuration};
// self
use crate::{
	_prelude::*,
	auth::{CredentialSource, ScopeSet},
	error::ConfigError,
	forward::Forwarder,
	http::ReqwestHttpClient,
	policy::{TokenPolicy, TokenProvider},
	signer::CredentialSigner,
};

/// Scope requested when none is configured.
pub const DEFAULT_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

const BIND_ADDR: &str = "GATEWAY_BIND_ADDR";
const SEARCH_ENDPOINT: &str = "GATEWAY_SEARCH_ENDPOINT";
const CREDENTIALS_JSON: &str = "GATEWAY_CREDENTIALS_JSON";
const CREDENTIALS_FILE: &str = "GATEWAY_CREDENTIALS_FILE";
const GOOGLE_APPLICATION_CREDENTIALS: &str = "GOOGLE_APPLICATION_CREDENTIALS";
const SCOPES: &str = "GATEWAY_SCOPES";
const TOKEN_CACHE: &str = "GATEWAY_TOKEN_CACHE";
const TOKEN_CACHE_WINDOW_SECS: &str = "GATEWAY_TOKEN_CACHE_WINDOW_SECS";
const REQUEST_TIMEOUT_SECS: &str = "GATEWAY_REQUEST_TIMEOUT_SECS";
const EXPOSE_ERROR_CHAIN: &str = "GATEWAY_EXPOSE_ERROR_CHAIN";

/// Validated gateway settings.
#[derive(Clone, Debug)]
pub struct GatewayConfig {
	/// Socket the HTTP surface listens on.
	pub bind_addr: SocketAddr,
	/// Downstream search endpoint.
	pub search_endpoint: Url,
	/// Where the service-account key is loaded from.
	pub credentials: CredentialSource,
	/// Scopes requested for every token.
	pub scope: ScopeSet,
	/// Token reuse policy.
	pub token_policy: TokenPolicy,
	/// Timeout applied to every outbound request.
	pub request_timeout: StdDuration,
	/// Include the error source chain in 500 responses.
	pub expose_error_chain: bool,
}
impl GatewayConfig {
	/// Default listen address.
	pub const DEFAULT_BIND_ADDR: &'static str = "0.0.0.0:8080";
	/// Default outbound request timeout.
	pub const DEFAULT_REQUEST_TIMEOUT: StdDuration = StdDuration::from_secs(30);

	/// Starts a builder for programmatic configuration.
	pub fn builder() -> GatewayConfigBuilder {
		GatewayConfigBuilder::default()
	}

	/// Reads the configuration from process environment variables.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|name| std::env::var(name).ok())
	}

	/// Reads the configuration through `lookup`, which maps a variable name to its value.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let var = |name: &str| {
			lookup(name).map(|value| value.trim().to_owned()).filter(|value| !value.is_empty())
		};
		let mut builder = Self::builder();

		if let Some(raw) = var(BIND_ADDR) {
			builder = builder.bind_addr(parse(BIND_ADDR, &raw)?);
		}

		let endpoint = var(SEARCH_ENDPOINT).ok_or(ConfigError::Missing { name: SEARCH_ENDPOINT })?;

		builder = builder.search_endpoint(
			Url::parse(&endpoint)
				.map_err(|source| ConfigError::InvalidUrl { name: SEARCH_ENDPOINT, source })?,
		);

		if let Some(source) = credential_source(&var) {
			builder = builder.credentials(source);
		}
		if let Some(raw) = var(SCOPES) {
			builder = builder.scope(raw.parse()?);
		}
		if parse_flag(TOKEN_CACHE, var(TOKEN_CACHE))? {
			let window = match var(TOKEN_CACHE_WINDOW_SECS) {
				Some(raw) => Duration::seconds(parse::<u32>(TOKEN_CACHE_WINDOW_SECS, &raw)?.into()),
				None => TokenPolicy::DEFAULT_PREEMPTIVE_WINDOW,
			};

			builder = builder.token_policy(TokenPolicy::Cached { preemptive_window: window });
		}
		if let Some(raw) = var(REQUEST_TIMEOUT_SECS) {
			let secs = parse::<u64>(REQUEST_TIMEOUT_SECS, &raw)?;

			if secs == 0 {
				return Err(ConfigError::Invalid { name: REQUEST_TIMEOUT_SECS, value: raw });
			}

			builder = builder.request_timeout(StdDuration::from_secs(secs));
		}

		builder.expose_error_chain(parse_flag(EXPOSE_ERROR_CHAIN, var(EXPOSE_ERROR_CHAIN))?).build()
	}

	/// Loads the key and wires the transport, signer, token policy, and forwarder together.
	pub fn build_forwarder(&self) -> Result<Forwarder<ReqwestHttpClient>> {
		let key = self.credentials.load()?;
		let http_client = Arc::new(ReqwestHttpClient::with_timeout(self.request_timeout)?);
		let signer = CredentialSigner::new(&key, http_client.clone())?;

		tracing::info!(
			client_email = %key.client_email,
			credentials = %self.credentials,
			cached = self.token_policy.is_cached(),
			"Loaded service-account credentials."
		);

		Ok(Forwarder::new(
			self.search_endpoint.clone(),
			self.scope.clone(),
			TokenProvider::new(signer, self.token_policy),
			http_client,
		))
	}
}

/// Builder for [`GatewayConfig`] values.
#[derive(Debug, Default)]
pub struct GatewayConfigBuilder {
	/// Listen address; defaults to [`GatewayConfig::DEFAULT_BIND_ADDR`].
	pub bind_addr: Option<SocketAddr>,
	/// Downstream search endpoint (required).
	pub search_endpoint: Option<Url>,
	/// Credential source (required).
	pub credentials: Option<CredentialSource>,
	/// Requested scopes; defaults to [`DEFAULT_SCOPE`].
	pub scope: Option<ScopeSet>,
	/// Token reuse policy.
	pub token_policy: TokenPolicy,
	/// Outbound timeout; defaults to [`GatewayConfig::DEFAULT_REQUEST_TIMEOUT`].
	pub request_timeout: Option<StdDuration>,
	/// Include the error source chain in 500 responses.
	pub expose_error_chain: bool,
}
impl GatewayConfigBuilder {
	/// Sets the listen address.
	pub fn bind_addr(mut self, addr: SocketAddr) -> Self {
		self.bind_addr = Some(addr);

		self
	}

	/// Sets the downstream search endpoint.
	pub fn search_endpoint(mut self, url: Url) -> Self {
		self.search_endpoint = Some(url);

		self
	}

	/// Sets the credential source.
	pub fn credentials(mut self, source: CredentialSource) -> Self {
		self.credentials = Some(source);

		self
	}

	/// Overrides the requested scopes.
	pub fn scope(mut self, scope: ScopeSet) -> Self {
		self.scope = Some(scope);

		self
	}

	/// Overrides the token reuse policy.
	pub fn token_policy(mut self, policy: TokenPolicy) -> Self {
		self.token_policy = policy;

		self
	}

	/// Overrides the outbound request timeout.
	pub fn request_timeout(mut self, timeout: StdDuration) -> Self {
		self.request_timeout = Some(timeout);

		self
	}

	/// Toggles the error source chain in 500 responses.
	pub fn expose_error_chain(mut self, expose: bool) -> Self {
		self.expose_error_chain = expose;

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<GatewayConfig, ConfigError> {
		let search_endpoint =
			self.search_endpoint.ok_or(ConfigError::Missing { name: SEARCH_ENDPOINT })?;

		if !matches!(search_endpoint.scheme(), "http" | "https") {
			return Err(ConfigError::Invalid {
				name: SEARCH_ENDPOINT,
				value: search_endpoint.to_string(),
			});
		}

		let credentials = self.credentials.ok_or(ConfigError::Missing { name: CREDENTIALS_FILE })?;
		let bind_addr = match self.bind_addr {
			Some(addr) => addr,
			None => parse(BIND_ADDR, GatewayConfig::DEFAULT_BIND_ADDR)?,
		};
		let scope = match self.scope {
			Some(scope) => scope,
			None => ScopeSet::new([DEFAULT_SCOPE])?,
		};

		if let TokenPolicy::Cached { preemptive_window } = self.token_policy
			&& preemptive_window.is_negative()
		{
			return Err(ConfigError::Invalid {
				name: TOKEN_CACHE_WINDOW_SECS,
				value: preemptive_window.whole_seconds().to_string(),
			});
		}

		Ok(GatewayConfig {
			bind_addr,
			search_endpoint,
			credentials,
			scope,
			token_policy: self.token_policy,
			request_timeout: self.request_timeout.unwrap_or(GatewayConfig::DEFAULT_REQUEST_TIMEOUT),
			expose_error_chain: self.expose_error_chain,
		})
	}
}

fn credential_source<F>(var: &F) -> Option<CredentialSource>
where
	F: Fn(&str) -> Option<String>,
{
	if var(CREDENTIALS_JSON).is_some() {
		return Some(CredentialSource::Env(CREDENTIALS_JSON.into()));
	}

	var(CREDENTIALS_FILE)
		.or_else(|| var(GOOGLE_APPLICATION_CREDENTIALS))
		.map(|path| CredentialSource::File(PathBuf::from(path)))
}

fn parse<T>(name: &'static str, raw: &str) -> Result<T, ConfigError>
where
	T: FromStr,
{
	raw.parse().map_err(|_| ConfigError::Invalid { name, value: raw.to_owned() })
}

fn parse_flag(name: &'static str, raw: Option<String>) -> Result<bool, ConfigError> {
	match raw.as_deref().map(str::to_ascii_lowercase).as_deref() {
		None | Some("false" | "0" | "no" | "off") => Ok(false),
		Some("true" | "1" | "yes" | "on") => Ok(true),
		Some(_) => Err(ConfigError::Invalid { name, value: raw.unwrap_or_default() }),
	}
}
