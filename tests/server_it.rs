mod common;

// crates.io
use axum::{
	Router,
	body::{self, Body},
	http::{Request, StatusCode, header::CACHE_CONTROL},
};
use httpmock::prelude::*;
use tower::ServiceExt;
// self
use common::*;
use discovery_gateway::{
	_preludet::*,
	auth::CredentialSource,
	config::GatewayConfig,
	server::{self, AppState},
};

fn gateway(server: &MockServer, expose_error_chain: bool) -> Router {
	let config = GatewayConfig::builder()
		.search_endpoint(Url::parse(&server.url("/v1/search")).expect("Mock URL should parse."))
		.credentials(CredentialSource::Inline(test_key_json(&server.url("/token"))))
		.expose_error_chain(expose_error_chain)
		.build()
		.expect("Config should build.");
	let forwarder = config.build_forwarder().expect("Forwarder should build.");

	server::router(AppState::new(forwarder, config.expose_error_chain))
}

fn search_request(body: &'static str) -> Request<Body> {
	Request::post("/api/search")
		.header("content-type", "application/json")
		.body(Body::from(body))
		.expect("Request should build.")
}

async fn read_json(response: axum::response::Response) -> serde_json::Value {
	let bytes = body::to_bytes(response.into_body(), usize::MAX).await.expect("Body should read.");

	serde_json::from_slice(&bytes).expect("Body should be JSON.")
}

#[tokio::test]
async fn search_round_trip_applies_defaults() {
	let server = MockServer::start_async().await;
	let token = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200).body("{\"access_token\":\"tok-e2e\",\"expires_in\":3600}");
		})
		.await;
	let search = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/v1/search")
				.header("authorization", "Bearer tok-e2e")
				.json_body(serde_json::json!({
					"query": "vitamin d",
					"pageSize": 5,
					"queryExpansionSpec": { "condition": "AUTO" },
					"spellCorrectionSpec": { "mode": "AUTO" },
					"languageCode": "en-US",
					"safeSearch": true,
					"userInfo": { "timeZone": "Asia/Calcutta" },
				}));
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"results\":[{\"id\":\"vitd-25oh\"}]}");
		})
		.await;
	let response = gateway(&server, false)
		.oneshot(search_request("{\"query\":\"vitamin d\",\"pageSize\":5}"))
		.await
		.expect("Router should respond.");

	assert_eq!(response.status(), StatusCode::OK);
	assert_eq!(response.headers()[CACHE_CONTROL], "no-store");
	assert_eq!(read_json(response).await, serde_json::json!({ "results": [{ "id": "vitd-25oh" }] }));

	token.assert_calls_async(1).await;
	search.assert_calls_async(1).await;
}

#[tokio::test]
async fn repeated_unauthorized_returns_envelope_with_401() {
	let server = MockServer::start_async().await;
	let token = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200).body("{\"access_token\":\"tok\"}");
		})
		.await;
	let search = server
		.mock_async(|when, then| {
			when.method(POST).path("/v1/search");
			then.status(401).body("{\"error\":{\"code\":401}}");
		})
		.await;
	let response =
		gateway(&server, false).oneshot(search_request("")).await.expect("Router should respond.");

	assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
	assert_eq!(
		read_json(response).await,
		serde_json::json!({
			"error": "Discovery Engine request failed",
			"status": 401,
			"statusText": "Unauthorized",
			"details": { "error": { "code": 401 } },
		})
	);

	token.assert_calls_async(2).await;
	search.assert_calls_async(2).await;
}

#[tokio::test]
async fn token_body_without_access_token_is_500_without_search() {
	let server = MockServer::start_async().await;
	let token = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200).body("{\"id_token\":\"not-an-access-token\"}");
		})
		.await;
	let search = server
		.mock_async(|when, then| {
			when.method(POST).path("/v1/search");
			then.status(200).body("{}");
		})
		.await;
	let response =
		gateway(&server, false).oneshot(search_request("{}")).await.expect("Router should respond.");

	assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

	let body = read_json(response).await;

	assert_eq!(body, serde_json::json!({ "error": "Internal server error." }));
	assert!(!body.to_string().contains("not-an-access-token"));

	token.assert_calls_async(1).await;
	search.assert_calls_async(0).await;
}

#[tokio::test]
async fn exposed_chain_carries_token_endpoint_status() {
	let server = MockServer::start_async().await;
	let _token = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(400).body("{\"error\":\"invalid_grant\"}");
		})
		.await;
	let response =
		gateway(&server, true).oneshot(search_request("{}")).await.expect("Router should respond.");

	assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

	let body = read_json(response).await;
	let stack = body["stack"].as_str().expect("Stack should be present.");

	assert!(stack.contains("400"));
	assert!(!stack.contains("PRIVATE KEY"));
}

#[tokio::test]
async fn invalid_credentials_fail_at_startup() -> color_eyre::Result<()> {
	let config = GatewayConfig::builder()
		.search_endpoint(Url::parse("https://search.example.com/search").expect("Valid URL."))
		.credentials(CredentialSource::Inline(
			serde_json::json!({
				"client_email": "svc@example.com",
				"private_key": "not a pem",
				"token_uri": "https://oauth2.example.com/token",
			})
			.to_string(),
		))
		.build()?;
	let err = config.build_forwarder().expect_err("Garbage key material must be rejected.");

	assert_eq!(err.kind(), "credential");

	Ok(())
}
