//! Ordered OAuth scope lists used for the `scope` claim and token cache keys.

// std
use std::{str::FromStr, sync::OnceLock};
// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD_NO_PAD};
use sha2::{Digest, Sha256};
// self
use crate::_prelude::*;

/// Errors emitted when validating scopes.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ScopeValidationError {
	/// At least one scope is required to mint a token.
	#[error("At least one scope is required.")]
	NoScopes,
	/// Empty scope entries are not allowed.
	#[error("Scope entries cannot be empty.")]
	Empty,
	/// Scopes cannot contain embedded whitespace characters.
	#[error("Scope contains whitespace: {scope}.")]
	ContainsWhitespace {
		/// The offending scope string.
		scope: String,
	},
}

/// Non-empty, de-duplicated scope list with a stable fingerprint cache.
///
/// Unlike a sorted set, the caller's ordering is kept so the signed `scope` claim reads exactly
/// as configured. The [`fingerprint`](Self::fingerprint) is a base64 (no padding) SHA-256
/// digest of the space-joined list and keys the optional token cache.
pub struct ScopeSet {
	scopes: Arc<[String]>,
	fingerprint_cache: OnceLock<String>,
}
impl ScopeSet {
	/// Creates a scope list from any iterator, dropping duplicates after their first occurrence.
	pub fn new<I, S>(scopes: I) -> Result<Self, ScopeValidationError>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Ok(Self { scopes: normalize(scopes)?, fingerprint_cache: OnceLock::new() })
	}

	/// Number of distinct scopes.
	pub fn len(&self) -> usize {
		self.scopes.len()
	}

	/// Returns true if no scopes are defined.
	pub fn is_empty(&self) -> bool {
		self.scopes.is_empty()
	}

	/// Returns true if the list contains the provided scope.
	pub fn contains(&self, scope: &str) -> bool {
		self.scopes.iter().any(|candidate| candidate == scope)
	}

	/// Iterator over scopes in their configured order.
	pub fn iter(&self) -> impl Iterator<Item = &str> {
		self.scopes.iter().map(|s| s.as_str())
	}

	/// Space-delimited representation used for the `scope` claim.
	pub fn joined(&self) -> String {
		self.scopes.join(" ")
	}

	/// Stable fingerprint derived from the joined scope list; cached after first use.
	pub fn fingerprint(&self) -> String {
		self.fingerprint_cache.get_or_init(|| compute_fingerprint(&self.scopes)).clone()
	}
}
impl Clone for ScopeSet {
	fn clone(&self) -> Self {
		Self { scopes: self.scopes.clone(), fingerprint_cache: OnceLock::new() }
	}
}
impl PartialEq for ScopeSet {
	fn eq(&self, other: &Self) -> bool {
		self.scopes == other.scopes
	}
}
impl Eq for ScopeSet {}
impl Hash for ScopeSet {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.fingerprint_cache.get_or_init(|| compute_fingerprint(&self.scopes)).hash(state);
	}
}
impl Debug for ScopeSet {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("ScopeSet").field(&self.scopes).finish()
	}
}
impl Display for ScopeSet {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.joined())
	}
}
impl FromStr for ScopeSet {
	type Err = ScopeValidationError;

	/// Parses a list separated by whitespace and/or commas.
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::new(s.split(|c: char| c == ',' || c.is_whitespace()).filter(|part| !part.is_empty()))
	}
}

fn normalize<I, S>(scopes: I) -> Result<Arc<[String]>, ScopeValidationError>
where
	I: IntoIterator<Item = S>,
	S: Into<String>,
{
	let mut list = <Vec<String>>::new();

	for scope in scopes {
		let owned: String = scope.into();

		if owned.is_empty() {
			return Err(ScopeValidationError::Empty);
		}
		if owned.chars().any(char::is_whitespace) {
			return Err(ScopeValidationError::ContainsWhitespace { scope: owned });
		}
		if !list.contains(&owned) {
			list.push(owned);
		}
	}

	if list.is_empty() {
		return Err(ScopeValidationError::NoScopes);
	}

	Ok(Arc::from(list))
}

fn compute_fingerprint(scopes: &[String]) -> String {
	let joined = scopes.join(" ");
	let mut hasher = Sha256::new();

	hasher.update(joined.as_bytes());

	STANDARD_NO_PAD.encode(hasher.finalize())
}
