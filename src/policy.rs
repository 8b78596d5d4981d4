//! Token lifecycle policy deciding when to mint and when to reuse an access token.
//!
//! The default [`TokenPolicy::AlwaysMint`] hands every caller a freshly minted token, so no
//! credential outlives the request that asked for it. [`TokenPolicy::Cached`] keeps one token per
//! scope fingerprint and reuses it until it is within `preemptive_window` of expiry; concurrent
//! misses for the same scopes wait on a per-key guard so only one mint reaches the token endpoint.

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, ScopeSet},
	http::GatewayHttpClient,
	signer::CredentialSigner,
};

type GuardMap = Mutex<HashMap<String, Arc<AsyncMutex<()>>>>;

/// Reuse policy applied by [`TokenProvider`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TokenPolicy {
	/// Mint a new token for every acquisition.
	#[default]
	AlwaysMint,
	/// Reuse cached tokens until `preemptive_window` before their expiry.
	Cached {
		/// Slack subtracted from `expires_at` when judging freshness.
		preemptive_window: Duration,
	},
}
impl TokenPolicy {
	/// Default slack used by [`TokenPolicy::cached`].
	pub const DEFAULT_PREEMPTIVE_WINDOW: Duration = Duration::seconds(60);

	/// Cached policy with [`Self::DEFAULT_PREEMPTIVE_WINDOW`].
	pub const fn cached() -> Self {
		Self::Cached { preemptive_window: Self::DEFAULT_PREEMPTIVE_WINDOW }
	}

	/// Returns `true` when tokens may be reused across acquisitions.
	pub const fn is_cached(&self) -> bool {
		matches!(self, Self::Cached { .. })
	}
}

/// Hands out access tokens according to a [`TokenPolicy`].
pub struct TokenProvider<C>
where
	C: ?Sized + GatewayHttpClient,
{
	signer: CredentialSigner<C>,
	policy: TokenPolicy,
	cache: RwLock<HashMap<String, AccessToken>>,
	guards: GuardMap,
}
impl<C> TokenProvider<C>
where
	C: ?Sized + GatewayHttpClient,
{
	/// Wraps `signer` with the given policy.
	pub fn new(signer: CredentialSigner<C>, policy: TokenPolicy) -> Self {
		Self { signer, policy, cache: Default::default(), guards: Default::default() }
	}

	/// Active policy.
	pub fn policy(&self) -> TokenPolicy {
		self.policy
	}

	/// Underlying signer.
	pub fn signer(&self) -> &CredentialSigner<C> {
		&self.signer
	}

	/// Returns a token for `scope`, reusing a cached one when the policy allows.
	pub async fn token(&self, scope: &ScopeSet) -> Result<AccessToken> {
		let TokenPolicy::Cached { preemptive_window } = self.policy else {
			return self.signer.mint_access_token(scope).await;
		};
		let key = scope.fingerprint();
		let guard = self.guard(&key);
		let _singleflight = guard.lock().await;

		if let Some(current) = self.cached(&key, preemptive_window) {
			tracing::debug!(scope = %scope, expires_at = %current.expires_at, "Reusing cached token.");

			return Ok(current);
		}

		self.mint_and_store(key, scope).await
	}

	/// Mints a new token for `scope` regardless of policy, replacing any cached entry.
	pub async fn fresh_token(&self, scope: &ScopeSet) -> Result<AccessToken> {
		if !self.policy.is_cached() {
			return self.signer.mint_access_token(scope).await;
		}

		let key = scope.fingerprint();
		let guard = self.guard(&key);
		let _singleflight = guard.lock().await;

		self.mint_and_store(key, scope).await
	}

	/// Number of cached tokens (always zero under [`TokenPolicy::AlwaysMint`]).
	pub fn cached_len(&self) -> usize {
		self.cache.read().len()
	}

	fn cached(&self, key: &str, window: Duration) -> Option<AccessToken> {
		let now = OffsetDateTime::now_utc();

		self.cache.read().get(key).filter(|token| token.is_fresh_at(now, window)).cloned()
	}

	async fn mint_and_store(&self, key: String, scope: &ScopeSet) -> Result<AccessToken> {
		let token = self.signer.mint_access_token(scope).await?;

		self.cache.write().insert(key, token.clone());

		Ok(token)
	}

	fn guard(&self, key: &str) -> Arc<AsyncMutex<()>> {
		let mut guards = self.guards.lock();

		guards.entry(key.to_owned()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
	}
}
impl<C> Debug for TokenProvider<C>
where
	C: ?Sized + GatewayHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenProvider")
			.field("signer", &self.signer)
			.field("policy", &self.policy)
			.field("cached", &self.cached_len())
			.finish()
	}
}
