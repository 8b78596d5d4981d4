//! JWT-bearer grant exchange against the service account's token endpoint.

pub use oauth2;

// crates.io
use oauth2::AsyncHttpClient;
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, ScopeSet, SignedAssertion},
	error::TokenExchangeError,
	http::{self, GatewayHttpClient},
};

/// `grant_type` value for RFC 7523 JWT-bearer assertions.
pub const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Exchanges `assertion` for an access token at `token_uri`.
///
/// Non-2xx responses and 2xx bodies lacking `access_token` (including bodies that are not
/// JSON at all) become [`TokenExchangeError`]s carrying the status and raw body.
pub async fn exchange_jwt_bearer<C>(
	http_client: &C,
	token_uri: &Url,
	assertion: &SignedAssertion,
	scope: &ScopeSet,
) -> Result<AccessToken>
where
	C: ?Sized + GatewayHttpClient,
{
	let request = http::form_post(
		token_uri,
		&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())],
	)?;
	let handle = http_client.handle();
	let response =
		handle.call(request).await.map_err(|err| http_client.map_error("token", err))?;
	let status = response.status();
	let raw = String::from_utf8_lossy(response.body()).into_owned();

	if !status.is_success() {
		return Err(TokenExchangeError::Rejected { status: status.as_u16(), body: raw }.into());
	}

	let parsed = serde_json::from_str::<JsonValue>(&raw).ok();
	let Some(secret) = parsed
		.as_ref()
		.and_then(|body| body.get("access_token"))
		.and_then(JsonValue::as_str)
		.filter(|secret| !secret.is_empty())
		.map(ToOwned::to_owned)
	else {
		return Err(
			TokenExchangeError::MissingAccessToken { status: status.as_u16(), body: raw }.into()
		);
	};
	let expires_in = parsed.as_ref().and_then(|body| body.get("expires_in")).and_then(|value| {
		value.as_i64().or_else(|| value.as_str().and_then(|text| text.parse().ok()))
	});
	let lifetime = expires_in
		.filter(|secs| *secs > 0)
		.map(Duration::seconds)
		.unwrap_or(AccessToken::DEFAULT_LIFETIME);

	Ok(AccessToken::new(secret, scope.clone(), OffsetDateTime::now_utc(), lifetime))
}
