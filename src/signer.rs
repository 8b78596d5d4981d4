//! Credential signer: self-signs a JWT assertion and trades it for an access token.

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, AssertionSigner, ScopeSet, ServiceAccountKey},
	http::GatewayHttpClient,
	oauth,
	obs::{self, Stage, StageOutcome, StageSpan},
};

/// Mints access tokens for one service account.
///
/// The PEM key is parsed once in [`CredentialSigner::new`]; every call to
/// [`mint_access_token`](Self::mint_access_token) signs a fresh assertion with the current wall
/// clock and performs exactly one token-endpoint round trip. Retrying is the caller's decision.
pub struct CredentialSigner<C>
where
	C: ?Sized + GatewayHttpClient,
{
	assertion_signer: AssertionSigner,
	http_client: Arc<C>,
}
impl<C> CredentialSigner<C>
where
	C: ?Sized + GatewayHttpClient,
{
	/// Parses `key` and binds the signer to `http_client`.
	pub fn new(key: &ServiceAccountKey, http_client: impl Into<Arc<C>>) -> Result<Self> {
		Ok(Self { assertion_signer: AssertionSigner::from_key(key)?, http_client: http_client.into() })
	}

	/// Underlying assertion signer.
	pub fn assertion_signer(&self) -> &AssertionSigner {
		&self.assertion_signer
	}

	/// Signs an assertion for `scope` and exchanges it at the key's token URI.
	pub async fn mint_access_token(&self, scope: &ScopeSet) -> Result<AccessToken> {
		const STAGE: Stage = Stage::Mint;

		obs::record_stage_outcome(STAGE, StageOutcome::Attempt);

		let span = StageSpan::new(STAGE);
		let result = span
			.instrument(async {
				let assertion = self.assertion_signer.sign(scope, OffsetDateTime::now_utc())?;

				tracing::debug!(scope = %scope, exp = assertion.claims.exp, "Signed assertion.");

				oauth::exchange_jwt_bearer(
					self.http_client.as_ref(),
					self.assertion_signer.token_uri(),
					&assertion,
					scope,
				)
				.await
			})
			.await;

		match &result {
			Ok(token) => {
				tracing::debug!(expires_at = %token.expires_at, "Minted access token.");

				obs::record_stage_outcome(STAGE, StageOutcome::Success);
			},
			Err(Error::TokenExchange(err)) => {
				tracing::error!(
					status = err.status(),
					body = %err.body(),
					"Token endpoint rejected the assertion."
				);

				obs::record_stage_outcome(STAGE, StageOutcome::Failure);
			},
			Err(err) => {
				tracing::error!(error = %err, kind = err.kind(), "Failed to mint access token.");

				obs::record_stage_outcome(STAGE, StageOutcome::Failure);
			},
		}

		result
	}
}
impl<C> Debug for CredentialSigner<C>
where
	C: ?Sized + GatewayHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CredentialSigner").field("assertion_signer", &self.assertion_signer).finish()
	}
}
