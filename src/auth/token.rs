//! Access-token secret wrapper and lifecycle helpers.

// self
use crate::{_prelude::*, auth::ScopeSet};

/// Redacted token secret wrapper keeping sensitive material out of logs.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner token value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("TokenSecret").field(&"<redacted>").finish()
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Bearer credential minted by the token endpoint.
#[derive(Clone, Debug)]
pub struct AccessToken {
	/// Bearer secret.
	pub secret: TokenSecret,
	/// Scopes the token was minted for.
	pub scope: ScopeSet,
	/// Local instant at which the token endpoint answered.
	pub issued_at: OffsetDateTime,
	/// `issued_at` plus the endpoint's `expires_in`.
	pub expires_at: OffsetDateTime,
}
impl AccessToken {
	/// Validity assumed when the token endpoint omits `expires_in`.
	pub const DEFAULT_LIFETIME: Duration = Duration::seconds(3600);

	/// Creates a token issued at `issued_at` that lives for `lifetime`.
	///
	/// A lifetime that would push `expires_at` past the representable range falls back to
	/// [`Self::DEFAULT_LIFETIME`].
	pub fn new(
		secret: impl Into<String>,
		scope: ScopeSet,
		issued_at: OffsetDateTime,
		lifetime: Duration,
	) -> Self {
		let expires_at = issued_at
			.checked_add(lifetime)
			.or_else(|| issued_at.checked_add(Self::DEFAULT_LIFETIME))
			.unwrap_or(issued_at);

		Self { secret: TokenSecret::new(secret), scope, issued_at, expires_at }
	}

	/// `Authorization` header value.
	pub fn bearer_header(&self) -> String {
		format!("Bearer {}", self.secret.expose())
	}

	/// Returns `true` when the token is usable at `instant` with at least `window` to spare.
	pub fn is_fresh_at(&self, instant: OffsetDateTime, window: Duration) -> bool {
		match self.expires_at.checked_sub(window) {
			Some(deadline) => instant < deadline,
			None => false,
		}
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros::datetime;
	// self
	use super::*;

	fn scope() -> ScopeSet {
		ScopeSet::new(["cloud-platform"]).expect("Scope list should be valid.")
	}

	#[test]
	fn secret_formatters_redact() {
		let secret = TokenSecret::new("super-secret");

		assert_eq!(format!("{secret:?}"), "TokenSecret(\"<redacted>\")");
		assert_eq!(format!("{secret}"), "<redacted>");
	}

	#[test]
	fn freshness_honors_window() {
		let issued = datetime!(2026-01-01 00:00 UTC);
		let token = AccessToken::new("t", scope(), issued, AccessToken::DEFAULT_LIFETIME);

		assert_eq!(token.expires_at, datetime!(2026-01-01 01:00 UTC));
		assert!(token.is_fresh_at(datetime!(2026-01-01 00:58 UTC), Duration::ZERO));
		assert!(!token.is_fresh_at(datetime!(2026-01-01 00:59:30 UTC), Duration::seconds(60)));
		assert!(!token.is_fresh_at(datetime!(2026-01-01 01:00 UTC), Duration::ZERO));
	}

	#[test]
	fn out_of_range_lifetime_falls_back_to_default() {
		let issued = datetime!(2026-01-01 00:00 UTC);
		let token = AccessToken::new("t", scope(), issued, Duration::seconds(9_000_000_000_000));

		assert_eq!(token.expires_at, datetime!(2026-01-01 01:00 UTC));
	}

	#[test]
	fn bearer_header_uses_secret() {
		let token =
			AccessToken::new("abc", scope(), OffsetDateTime::now_utc(), Duration::seconds(10));

		assert_eq!(token.bearer_header(), "Bearer abc");
		assert!(!format!("{token:?}").contains("abc"));
	}
}
