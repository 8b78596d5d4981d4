//! Gateway-level error types shared across the signer, forwarder, and HTTP surface.

// self
use crate::_prelude::*;

/// Gateway-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical gateway error exposed by public APIs.
///
/// Downstream 401s and other non-2xx search responses are not errors; they are carried by
/// [`SearchResponse`](crate::search::SearchResponse) so the caller can mirror the downstream
/// status code.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Service-account key could not be loaded or parsed.
	#[error(transparent)]
	Credential(#[from] CredentialError),
	/// JWT assertion could not be built or signed.
	#[error(transparent)]
	Assertion(#[from] AssertionError),
	/// Token endpoint rejected the assertion or returned an incomplete body.
	#[error(transparent)]
	TokenExchange(#[from] TokenExchangeError),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, timeout).
	#[error(transparent)]
	Transport(#[from] TransportError),
}
impl Error {
	/// Stable label used in logs and metrics.
	pub const fn kind(&self) -> &'static str {
		match self {
			Self::Credential(_) => "credential",
			Self::Assertion(_) => "assertion",
			Self::TokenExchange(_) => "token_exchange",
			Self::Config(_) => "config",
			Self::Transport(_) => "transport",
		}
	}
}

/// Failures raised while loading the service-account key.
#[derive(Debug, ThisError)]
pub enum CredentialError {
	/// Credential file could not be read.
	#[error("Credential file `{path}` could not be read.")]
	Read {
		/// Path that failed to load.
		path: String,
		/// Underlying IO failure.
		#[source]
		source: std::io::Error,
	},
	/// Credential environment variable is not set.
	#[error("Credential environment variable `{name}` is not set.")]
	MissingEnv {
		/// Variable name.
		name: String,
	},
	/// Credential JSON does not match the service-account key shape.
	#[error("Credential JSON is malformed.")]
	Malformed {
		/// Structured parsing failure, including the offending field path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// A required field is present but empty.
	#[error("Credential field `{field}` is empty.")]
	EmptyField {
		/// Field name.
		field: &'static str,
	},
	/// Private key is not a PEM-encoded RSA key.
	#[error("Private key is not a PEM-encoded RSA key.")]
	InvalidPrivateKey {
		/// Underlying PEM/DER decoding failure.
		#[source]
		source: BoxError,
	},
}
impl CredentialError {
	/// Wraps a key decoding failure.
	pub fn invalid_private_key(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::InvalidPrivateKey { source: Box::new(src) }
	}
}

/// Failures raised while building a signed JWT assertion.
#[derive(Debug, ThisError)]
pub enum AssertionError {
	/// Header or claims could not be serialized.
	#[error("Assertion segment could not be serialized.")]
	Serialize(#[from] serde_json::Error),
	/// RSA signing failed.
	#[error("Assertion could not be signed.")]
	Sign(#[from] rsa::signature::Error),
}

/// Token endpoint failures; both variants keep the raw response for diagnosis.
#[derive(Debug, ThisError)]
pub enum TokenExchangeError {
	/// Token endpoint answered with a non-2xx status.
	#[error("Token endpoint rejected the assertion with status {status}.")]
	Rejected {
		/// HTTP status code.
		status: u16,
		/// Raw response body.
		body: String,
	},
	/// Token endpoint answered 2xx without an `access_token` field.
	#[error("Token endpoint response with status {status} is missing access_token.")]
	MissingAccessToken {
		/// HTTP status code.
		status: u16,
		/// Raw response body.
		body: String,
	},
}
impl TokenExchangeError {
	/// HTTP status returned by the token endpoint.
	pub fn status(&self) -> u16 {
		match self {
			Self::Rejected { status, .. } | Self::MissingAccessToken { status, .. } => *status,
		}
	}

	/// Raw response body returned by the token endpoint.
	pub fn body(&self) -> &str {
		match self {
			Self::Rejected { body, .. } | Self::MissingAccessToken { body, .. } => body,
		}
	}
}

/// Configuration and validation failures raised by the gateway.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Request body could not be serialized.
	#[error("Request body could not be serialized.")]
	RequestBody(#[from] serde_json::Error),
	/// Requested scopes are invalid.
	#[error("Configured scopes are invalid.")]
	InvalidScope(#[from] crate::auth::ScopeValidationError),
	/// A required setting is missing.
	#[error("Required setting `{name}` is missing.")]
	Missing {
		/// Setting name.
		name: &'static str,
	},
	/// A setting holds an unparsable value.
	#[error("Setting `{name}` has an invalid value: {value}.")]
	Invalid {
		/// Setting name.
		name: &'static str,
		/// Offending raw value.
		value: String,
	},
	/// An endpoint setting is not a valid URL.
	#[error("Setting `{name}` is not a valid URL.")]
	InvalidUrl {
		/// Setting name.
		name: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling {endpoint}.")]
	Network {
		/// Logical endpoint label (`token` or `search`).
		endpoint: &'static str,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Request timed out.
	#[error("Request to {endpoint} timed out.")]
	Timeout {
		/// Logical endpoint label (`token` or `search`).
		endpoint: &'static str,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling {endpoint}.")]
	Io {
		/// Logical endpoint label (`token` or `search`).
		endpoint: &'static str,
		/// Underlying IO failure.
		#[source]
		source: std::io::Error,
	},
	/// Transport reported an error without a structured source.
	#[error("HTTP client error occurred while calling {endpoint}: {message}.")]
	Other {
		/// Logical endpoint label (`token` or `search`).
		endpoint: &'static str,
		/// Transport-supplied message.
		message: String,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(
		endpoint: &'static str,
		src: impl 'static + Send + Sync + std::error::Error,
	) -> Self {
		Self::Network { endpoint, source: Box::new(src) }
	}
}
