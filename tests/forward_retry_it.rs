mod common;

// crates.io
use httpmock::prelude::*;
// self
use common::*;
use discovery_gateway::{
	_preludet::*,
	policy::TokenPolicy,
	search::{SearchRequest, SearchResponse},
};

fn scripted_forwarder(
	client: &ScriptedHttpClient,
	policy: TokenPolicy,
) -> discovery_gateway::forward::Forwarder<ScriptedHttpClient> {
	build_forwarder(
		Arc::new(client.clone()),
		ScriptedHttpClient::TOKEN_URI,
		ScriptedHttpClient::SEARCH_ENDPOINT,
		policy,
	)
}

#[tokio::test]
async fn unauthorized_then_success_returns_retry_body() {
	let client = ScriptedHttpClient::with_search_responses([
		(401, "{\"error\":{\"status\":\"UNAUTHENTICATED\"}}"),
		(200, "{\"results\":[{\"id\":\"hba1c\"}],\"totalSize\":1}"),
	]);
	let request = SearchRequest { query: Some("hba1c".into()), ..Default::default() };
	let response = scripted_forwarder(&client, TokenPolicy::AlwaysMint)
		.forward_search(request)
		.await
		.expect("Retry should succeed.");

	assert!(response.is_success());
	assert!(matches!(
		response,
		SearchResponse::Success { ref body, .. } if body["totalSize"] == 1
	));
	assert_eq!(client.mints(), 2);
	assert_eq!(client.searches(), 2);
	assert_eq!(client.bearers(), ["Bearer tok-1", "Bearer tok-2"]);

	let bodies = client.search_bodies();

	assert_eq!(bodies[0], bodies[1], "The retry must resend the identical body.");
}

#[tokio::test]
async fn unauthorized_twice_stops_after_one_retry() {
	let client = ScriptedHttpClient::with_search_responses([
		(401, "{\"error\":\"first\"}"),
		(401, "{\"error\":\"second\"}"),
		(200, "{\"never\":\"reached\"}"),
	]);
	let response = scripted_forwarder(&client, TokenPolicy::AlwaysMint)
		.forward_search(SearchRequest::default())
		.await
		.expect("A downstream 401 is not a local error.");
	let SearchResponse::Failed(envelope) = response else {
		panic!("Expected the failure envelope.");
	};

	assert_eq!(envelope.status, 401);
	assert_eq!(envelope.details, serde_json::json!({ "error": "second" }));
	assert_eq!(client.mints(), 2);
	assert_eq!(client.searches(), 2);
}

#[tokio::test]
async fn cached_policy_reuses_token_until_rejected() {
	let client = ScriptedHttpClient::with_search_responses([
		(200, "{\"page\":1}"),
		(200, "{\"page\":2}"),
		(401, "{}"),
		(200, "{\"page\":3}"),
		(200, "{\"page\":4}"),
	]);
	let forwarder = scripted_forwarder(&client, TokenPolicy::cached());

	for _ in 0..3 {
		let response = forwarder
			.forward_search(SearchRequest::default())
			.await
			.expect("Search should succeed.");

		assert!(response.is_success());
	}

	assert_eq!(client.mints(), 2);
	assert_eq!(client.searches(), 4);
	assert_eq!(client.bearers(), ["Bearer tok-1", "Bearer tok-1", "Bearer tok-1", "Bearer tok-2"]);

	forwarder.forward_search(SearchRequest::default()).await.expect("Search should succeed.");

	assert_eq!(client.mints(), 2);
	assert_eq!(client.bearers()[4], "Bearer tok-2");
}

#[tokio::test]
async fn always_mint_uses_a_new_token_per_search() {
	let client = ScriptedHttpClient::with_search_responses([(200, "{}"), (200, "{}")]);
	let forwarder = scripted_forwarder(&client, TokenPolicy::AlwaysMint);

	forwarder.forward_search(SearchRequest::default()).await.expect("Search should succeed.");
	forwarder.forward_search(SearchRequest::default()).await.expect("Search should succeed.");

	assert_eq!(client.bearers(), ["Bearer tok-1", "Bearer tok-2"]);
}

#[tokio::test]
async fn reqwest_transport_retries_once_over_http() {
	let server = MockServer::start_async().await;
	let token = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/token")
				.header("content-type", "application/x-www-form-urlencoded");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"access_token\":\"tok\",\"expires_in\":3599,\"token_type\":\"Bearer\"}");
		})
		.await;
	let search = server
		.mock_async(|when, then| {
			when.method(POST).path("/v1/search").header("authorization", "Bearer tok");
			then.status(401).body("Request had invalid authentication credentials.");
		})
		.await;
	let response = reqwest_forwarder(
		&server.url("/token"),
		&server.url("/v1/search"),
		TokenPolicy::AlwaysMint,
	)
	.forward_search(SearchRequest::default())
	.await
	.expect("A downstream 401 is not a local error.");
	let SearchResponse::Failed(envelope) = response else {
		panic!("Expected the failure envelope.");
	};

	assert_eq!(envelope.status_text, "Unauthorized");
	assert_eq!(
		envelope.details,
		serde_json::json!({ "raw": "Request had invalid authentication credentials." })
	);

	token.assert_calls_async(2).await;
	search.assert_calls_async(2).await;
}
