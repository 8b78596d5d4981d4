//! Fixtures shared by the integration tests.

#![allow(dead_code)]

// std
use std::{
	collections::VecDeque,
	sync::atomic::{AtomicUsize, Ordering},
};
// self
use discovery_gateway::{
	_preludet::*,
	forward::Forwarder,
	http::{GatewayHttpClient, HttpFuture, ReqwestHttpClient},
	oauth::oauth2::{
		AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse,
		http::{Response, header::AUTHORIZATION},
	},
	policy::{TokenPolicy, TokenProvider},
	signer::CredentialSigner,
};

/// Key file contents in the standard service-account JSON layout, newlines escaped.
pub fn test_key_json(token_uri: &str) -> String {
	serde_json::json!({
		"type": "service_account",
		"project_id": "diagnostics",
		"private_key_id": "kid-it",
		"private_key": TEST_PRIVATE_KEY_PEM,
		"client_email": TEST_CLIENT_EMAIL,
		"client_id": "1234567890",
		"token_uri": token_uri,
	})
	.to_string()
}

pub fn reqwest_forwarder(
	token_uri: &str,
	search_endpoint: &str,
	policy: TokenPolicy,
) -> Forwarder<ReqwestHttpClient> {
	build_forwarder(Arc::new(test_reqwest_http_client()), token_uri, search_endpoint, policy)
}

pub fn build_forwarder<C>(
	http_client: Arc<C>,
	token_uri: &str,
	search_endpoint: &str,
	policy: TokenPolicy,
) -> Forwarder<C>
where
	C: GatewayHttpClient,
{
	let signer = CredentialSigner::new(&test_service_account_key(token_uri), http_client.clone())
		.expect("Fixture key should parse.");

	Forwarder::new(
		Url::parse(search_endpoint).expect("Failed to parse search endpoint."),
		test_scope(),
		TokenProvider::new(signer, policy),
		http_client,
	)
}

/// Scripted transport: the token endpoint mints `tok-1`, `tok-2`, ... and the search endpoint
/// replays queued `(status, body)` pairs in order.
#[derive(Clone, Debug, Default)]
pub struct ScriptedHttpClient(Arc<Script>);
impl ScriptedHttpClient {
	pub const TOKEN_URI: &'static str = "https://oauth2.test/token";
	pub const SEARCH_ENDPOINT: &'static str = "https://search.test/v1/search";

	pub fn with_search_responses<I>(responses: I) -> Self
	where
		I: IntoIterator<Item = (u16, &'static str)>,
	{
		let script = Script {
			search_responses: Mutex::new(responses.into_iter().collect()),
			..Default::default()
		};

		Self(Arc::new(script))
	}

	pub fn mints(&self) -> usize {
		self.0.mints.load(Ordering::SeqCst)
	}

	pub fn searches(&self) -> usize {
		self.0.searches.load(Ordering::SeqCst)
	}

	/// `Authorization` header values seen by the search endpoint, in order.
	pub fn bearers(&self) -> Vec<String> {
		self.0.bearers.lock().clone()
	}

	/// Raw bodies seen by the search endpoint, in order.
	pub fn search_bodies(&self) -> Vec<Vec<u8>> {
		self.0.search_bodies.lock().clone()
	}

	fn respond(
		&self,
		request: HttpRequest,
	) -> Result<HttpResponse, HttpClientError<std::io::Error>> {
		let script = &self.0;
		let (status, body) = if request.uri().path().ends_with("/token") {
			let n = script.mints.fetch_add(1, Ordering::SeqCst) + 1;

			(200, format!("{{\"access_token\":\"tok-{n}\",\"expires_in\":3600}}"))
		} else {
			script.searches.fetch_add(1, Ordering::SeqCst);
			script.bearers.lock().push(
				request
					.headers()
					.get(AUTHORIZATION)
					.and_then(|value| value.to_str().ok())
					.unwrap_or_default()
					.to_owned(),
			);
			script.search_bodies.lock().push(request.body().clone());

			script
				.search_responses
				.lock()
				.pop_front()
				.map(|(status, body)| (status, body.to_owned()))
				.unwrap_or((500, "script exhausted".to_owned()))
		};

		Response::builder().status(status).body(body.into_bytes()).map_err(HttpClientError::Http)
	}
}
impl GatewayHttpClient for ScriptedHttpClient {
	type Handle = ScriptedHttpClient;
	type TransportError = std::io::Error;

	fn handle(&self) -> Self::Handle {
		self.clone()
	}
}
impl<'c> AsyncHttpClient<'c> for ScriptedHttpClient {
	type Error = HttpClientError<std::io::Error>;
	type Future = HttpFuture<'c, std::io::Error>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		Box::pin(async move { self.respond(request) })
	}
}

#[derive(Debug, Default)]
struct Script {
	mints: AtomicUsize,
	searches: AtomicUsize,
	bearers: Mutex<Vec<String>>,
	search_bodies: Mutex<Vec<Vec<u8>>>,
	search_responses: Mutex<VecDeque<(u16, &'static str)>>,
}
