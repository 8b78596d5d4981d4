//! Transport primitives shared by the token exchange and the search forwarder.
//!
//! The module exposes [`GatewayHttpClient`] so the gateway can run over any HTTP stack that
//! speaks the `oauth2` crate's [`AsyncHttpClient`] contract, plus the reqwest-backed default.
//! Requests and responses are plain `http` types ([`HttpRequest`]/[`HttpResponse`]) so the
//! signer and forwarder build them the same way regardless of transport.

// std
use std::time::Duration as StdDuration;
// crates.io
use oauth2::{
	AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse,
	http::{
		Method,
		header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
	},
};
use url::form_urlencoded;
// self
use crate::{
	_prelude::*,
	error::{ConfigError, TransportError},
};

/// Boxed response future returned by [`ReqwestHandle`].
pub type HttpFuture<'c, E> =
	Pin<Box<dyn Future<Output = Result<HttpResponse, HttpClientError<E>>> + 'c + Send>>;

/// Abstraction over HTTP transports used for both outbound calls the gateway makes.
///
/// Implementations must be `Send + Sync + 'static` so a single transport can be shared by every
/// in-flight request, and the handles they return must own whatever state the request future
/// needs so that future stays `Send` for the duration of the call.
pub trait GatewayHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Concrete error emitted by the underlying transport.
	type TransportError: 'static + Send + Sync + StdError;

	/// [`AsyncHttpClient`] handle used for a single call.
	type Handle: for<'c> AsyncHttpClient<
			'c,
			Error = HttpClientError<Self::TransportError>,
			Future: 'c + Send,
		>
		+ 'static
		+ Send
		+ Sync;

	/// Returns a handle that can execute one or more requests.
	fn handle(&self) -> Self::Handle;

	/// Converts a transport failure for `endpoint` (`token` or `search`) into a gateway error.
	fn map_error(
		&self,
		endpoint: &'static str,
		error: HttpClientError<Self::TransportError>,
	) -> Error {
		map_transport_error(endpoint, error)
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// Neither the token endpoint nor the search endpoint is expected to redirect; configure any
/// custom client passed to [`ReqwestHttpClient::with_client`] accordingly.
#[derive(Clone, Debug, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a client whose requests fail after `timeout`.
	pub fn with_timeout(timeout: StdDuration) -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder()
			.timeout(timeout)
			.redirect(reqwest::redirect::Policy::none())
			.build()?;

		Ok(Self(client))
	}
}
impl GatewayHttpClient for ReqwestHttpClient {
	type Handle = ReqwestHandle;
	type TransportError = ReqwestError;

	fn handle(&self) -> Self::Handle {
		ReqwestHandle(self.0.clone())
	}

	fn map_error(&self, endpoint: &'static str, error: HttpClientError<ReqwestError>) -> Error {
		match error {
			HttpClientError::Reqwest(inner) if inner.is_timeout() =>
				TransportError::Timeout { endpoint }.into(),
			HttpClientError::Reqwest(inner) if inner.is_builder() => ConfigError::from(*inner).into(),
			other => map_transport_error(endpoint, other),
		}
	}
}

/// Per-call handle returned by [`ReqwestHttpClient`].
#[derive(Clone, Debug)]
pub struct ReqwestHandle(ReqwestClient);
impl<'c> AsyncHttpClient<'c> for ReqwestHandle {
	type Error = HttpClientError<ReqwestError>;
	type Future = HttpFuture<'c, ReqwestError>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		let client = self.0.clone();

		Box::pin(async move {
			let response =
				client.execute(request.try_into().map_err(Box::new)?).await.map_err(Box::new)?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let mut response_new =
				HttpResponse::new(response.bytes().await.map_err(Box::new)?.to_vec());

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}

/// Default mapping from [`HttpClientError`] into gateway errors.
pub fn map_transport_error<E>(endpoint: &'static str, error: HttpClientError<E>) -> Error
where
	E: 'static + Send + Sync + StdError,
{
	match error {
		HttpClientError::Reqwest(inner) => TransportError::network(endpoint, *inner).into(),
		HttpClientError::Http(inner) => ConfigError::from(inner).into(),
		HttpClientError::Io(source) => TransportError::Io { endpoint, source }.into(),
		HttpClientError::Other(message) => TransportError::Other { endpoint, message }.into(),
		_ => TransportError::Other { endpoint, message: "unrecognized transport failure".into() }
			.into(),
	}
}

/// Parses a response body as JSON, wrapping anything else as `{"raw": <text>}`.
pub fn json_or_raw(body: &[u8]) -> JsonValue {
	serde_json::from_slice(body).unwrap_or_else(|_| {
		serde_json::json!({ "raw": String::from_utf8_lossy(body) })
	})
}

/// Builds a `application/x-www-form-urlencoded` POST.
pub(crate) fn form_post(url: &Url, form: &[(&str, &str)]) -> Result<HttpRequest, ConfigError> {
	let body = form_urlencoded::Serializer::new(String::new()).extend_pairs(form).finish();

	Ok(oauth2::http::Request::builder()
		.method(Method::POST)
		.uri(url.as_str())
		.header(CONTENT_TYPE, "application/x-www-form-urlencoded")
		.header(ACCEPT, "application/json")
		.body(body.into_bytes())?)
}

/// Builds a JSON POST carrying `authorization` verbatim.
pub(crate) fn json_post(
	url: &Url,
	body: Vec<u8>,
	authorization: &str,
) -> Result<HttpRequest, ConfigError> {
	Ok(oauth2::http::Request::builder()
		.method(Method::POST)
		.uri(url.as_str())
		.header(CONTENT_TYPE, "application/json")
		.header(ACCEPT, "application/json")
		.header(AUTHORIZATION, authorization)
		.body(body)?)
}
