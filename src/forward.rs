//! Downstream request forwarder with a single retry on `401 Unauthorized`.
//!
//! A search runs through at most two attempts. The first uses whatever token the
//! [`TokenProvider`] hands out; a `401` moves to the retry, which always mints a fresh token and
//! re-sends the identical body. The retry's outcome is final whatever its status.

// crates.io
use oauth2::{AsyncHttpClient, http::StatusCode};
// self
use crate::{
	_prelude::*,
	auth::ScopeSet,
	error::ConfigError,
	http::{self, GatewayHttpClient},
	obs::{self, Stage, StageOutcome, StageSpan},
	policy::TokenProvider,
	search::{SearchRequest, SearchResponse},
};

/// Position in the retry state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Attempt {
	/// Initial call.
	First,
	/// Single retry after the downstream rejected the first token.
	Retry,
}
impl Attempt {
	/// Label used in spans and logs.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::First => "first",
			Self::Retry => "retry",
		}
	}

	/// Next attempt after observing `status`, or `None` when the current outcome is final.
	pub fn advance(self, status: StatusCode) -> Option<Self> {
		match (self, status) {
			(Self::First, StatusCode::UNAUTHORIZED) => Some(Self::Retry),
			_ => None,
		}
	}
}

/// Forwards search requests to one downstream endpoint.
pub struct Forwarder<C>
where
	C: ?Sized + GatewayHttpClient,
{
	endpoint: Url,
	scope: ScopeSet,
	tokens: TokenProvider<C>,
	http_client: Arc<C>,
}
impl<C> Forwarder<C>
where
	C: ?Sized + GatewayHttpClient,
{
	/// Creates a forwarder posting to `endpoint` with tokens minted for `scope`.
	pub fn new(
		endpoint: Url,
		scope: ScopeSet,
		tokens: TokenProvider<C>,
		http_client: impl Into<Arc<C>>,
	) -> Self {
		Self { endpoint, scope, tokens, http_client: http_client.into() }
	}

	/// Search endpoint requests are posted to.
	pub fn endpoint(&self) -> &Url {
		&self.endpoint
	}

	/// Scopes requested for every token.
	pub fn scope(&self) -> &ScopeSet {
		&self.scope
	}

	/// Token provider backing this forwarder.
	pub fn tokens(&self) -> &TokenProvider<C> {
		&self.tokens
	}

	/// Applies request defaults, forwards the search, and retries once on `401`.
	///
	/// Non-2xx downstream responses are returned as [`SearchResponse::Failed`]; only local
	/// failures (credential, signing, token exchange, transport) surface as `Err`.
	pub async fn forward_search(&self, request: SearchRequest) -> Result<SearchResponse> {
		let body = serde_json::to_vec(&request.into_downstream()).map_err(ConfigError::from)?;
		let mut attempt = Attempt::First;

		loop {
			let (status, details) = self.send(attempt, &body).await?;

			match attempt.advance(status) {
				Some(next) => {
					tracing::warn!(
						endpoint = %self.endpoint,
						"Search endpoint rejected the token; retrying once with a fresh token."
					);

					attempt = next;
				},
				None => return Ok(SearchResponse::from_downstream(status, details)),
			}
		}
	}

	async fn send(&self, attempt: Attempt, body: &[u8]) -> Result<(StatusCode, JsonValue)> {
		const STAGE: Stage = Stage::Search;

		obs::record_stage_outcome(STAGE, StageOutcome::Attempt);

		let span = StageSpan::new(STAGE).with_attempt(attempt.as_str());
		let result = span
			.instrument(async {
				let token = match attempt {
					Attempt::First => self.tokens.token(&self.scope).await?,
					Attempt::Retry => self.tokens.fresh_token(&self.scope).await?,
				};
				let request = http::json_post(&self.endpoint, body.to_vec(), &token.bearer_header())?;

				tracing::debug!(endpoint = %self.endpoint, "Dispatching search request.");

				let handle = self.http_client.handle();
				let response = handle
					.call(request)
					.await
					.map_err(|err| self.http_client.map_error("search", err))?;

				Ok::<_, Error>((response.status(), http::json_or_raw(response.body())))
			})
			.await;

		match &result {
			Ok((status, _)) if status.is_success() =>
				obs::record_stage_outcome(STAGE, StageOutcome::Success),
			Ok((StatusCode::UNAUTHORIZED, _)) =>
				obs::record_stage_outcome(STAGE, StageOutcome::Unauthenticated),
			Ok((status, _)) => {
				tracing::warn!(status = status.as_u16(), "Search endpoint returned a failure status.");

				obs::record_stage_outcome(STAGE, StageOutcome::Failure);
			},
			Err(_) => obs::record_stage_outcome(STAGE, StageOutcome::Failure),
		}

		result
	}
}
impl<C> Debug for Forwarder<C>
where
	C: ?Sized + GatewayHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Forwarder")
			.field("endpoint", &self.endpoint.as_str())
			.field("scope", &self.scope)
			.field("tokens", &self.tokens)
			.finish()
	}
}
