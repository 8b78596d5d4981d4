//! RS256 JWT assertions for the JWT-bearer grant.
//!
//! An assertion is three base64url (no padding) segments, `<header>.<claims>.<signature>`,
//! where the signature is RSASSA-PKCS1-v1_5 over SHA-256 of the first two segments. The
//! signer parses the PEM key once; each call to [`AssertionSigner::sign`] builds a fresh,
//! single-use assertion stamped with the supplied clock reading.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rsa::{
	RsaPrivateKey, RsaPublicKey,
	pkcs1::DecodeRsaPrivateKey,
	pkcs1v15::SigningKey,
	pkcs8::DecodePrivateKey,
	signature::{SignatureEncoding, Signer},
};
use sha2::Sha256;
// self
use crate::{
	_prelude::*,
	auth::{ScopeSet, ServiceAccountKey},
	error::{AssertionError, CredentialError},
};

/// Lifetime stamped into every assertion (`exp - iat`).
pub const ASSERTION_LIFETIME: Duration = Duration::seconds(3600);

/// JOSE header of a signed assertion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtHeader {
	/// Signature algorithm; always `RS256`.
	pub alg: String,
	/// Token type; always `JWT`.
	pub typ: String,
	/// Service-account key identifier, when known.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub kid: Option<String>,
}
impl JwtHeader {
	fn rs256(kid: Option<String>) -> Self {
		Self { alg: "RS256".into(), typ: "JWT".into(), kid }
	}
}

/// Claims carried by a JWT-bearer assertion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionClaims {
	/// Issuer; the service-account email.
	pub iss: String,
	/// Space-joined scopes requested for the access token.
	pub scope: String,
	/// Audience; the token endpoint URI.
	pub aud: String,
	/// Issued-at, seconds since the Unix epoch.
	pub iat: i64,
	/// Expiry, `iat + 3600`.
	pub exp: i64,
}

/// Signed, encoded assertion ready to be exchanged once.
#[derive(Clone)]
pub struct SignedAssertion {
	/// Decoded header.
	pub header: JwtHeader,
	/// Decoded claims.
	pub claims: AssertionClaims,
	encoded: String,
	signing_input_len: usize,
}
impl SignedAssertion {
	/// Compact `<header>.<claims>.<signature>` form.
	pub fn as_str(&self) -> &str {
		&self.encoded
	}

	/// `<header>.<claims>` prefix that was signed.
	pub fn signing_input(&self) -> &str {
		&self.encoded[..self.signing_input_len]
	}

	/// Encoded signature segment.
	pub fn signature_segment(&self) -> &str {
		&self.encoded[self.signing_input_len + 1..]
	}
}
impl Debug for SignedAssertion {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SignedAssertion")
			.field("header", &self.header)
			.field("claims", &self.claims)
			.field("encoded", &"<redacted>")
			.finish()
	}
}

/// Parsed signing key plus the identity fields every assertion carries.
#[derive(Clone)]
pub struct AssertionSigner {
	client_email: String,
	token_uri: Url,
	audience: String,
	key_id: Option<String>,
	public_key: RsaPublicKey,
	signing_key: SigningKey<Sha256>,
}
impl AssertionSigner {
	/// Parses the key's PEM material (PKCS#8, falling back to PKCS#1).
	pub fn from_key(key: &ServiceAccountKey) -> Result<Self, CredentialError> {
		let pem = key.private_key.trim();
		let private_key = match RsaPrivateKey::from_pkcs8_pem(pem) {
			Ok(private_key) => private_key,
			Err(pkcs8_err) => RsaPrivateKey::from_pkcs1_pem(pem)
				.map_err(|_| CredentialError::invalid_private_key(pkcs8_err))?,
		};

		Ok(Self {
			client_email: key.client_email.clone(),
			token_uri: key.token_uri.clone(),
			audience: key.audience.clone(),
			key_id: key.private_key_id.clone(),
			public_key: private_key.to_public_key(),
			signing_key: SigningKey::<Sha256>::new(private_key),
		})
	}

	/// Token endpoint the assertion is addressed to.
	pub fn token_uri(&self) -> &Url {
		&self.token_uri
	}

	/// Public half of the signing key, for verifying produced assertions.
	pub fn public_key(&self) -> &RsaPublicKey {
		&self.public_key
	}

	/// Builds and signs an assertion for `scope`, issued at `now`.
	pub fn sign(
		&self,
		scope: &ScopeSet,
		now: OffsetDateTime,
	) -> Result<SignedAssertion, AssertionError> {
		let iat = now.unix_timestamp();
		let header = JwtHeader::rs256(self.key_id.clone());
		let claims = AssertionClaims {
			iss: self.client_email.clone(),
			scope: scope.joined(),
			aud: self.audience.clone(),
			iat,
			exp: iat + ASSERTION_LIFETIME.whole_seconds(),
		};
		let mut encoded = format!(
			"{}.{}",
			encode_segment(serde_json::to_vec(&header)?),
			encode_segment(serde_json::to_vec(&claims)?)
		);
		let signing_input_len = encoded.len();
		let signature = self.signing_key.try_sign(encoded.as_bytes())?;

		encoded.push('.');
		encoded.push_str(&encode_segment(signature.to_bytes()));

		Ok(SignedAssertion { header, claims, encoded, signing_input_len })
	}
}
impl Debug for AssertionSigner {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AssertionSigner")
			.field("client_email", &self.client_email)
			.field("token_uri", &self.token_uri.as_str())
			.field("audience", &self.audience)
			.field("key_id", &self.key_id)
			.finish_non_exhaustive()
	}
}

/// Base64url without padding, as required for JWS compact segments.
pub fn encode_segment(bytes: impl AsRef<[u8]>) -> String {
	URL_SAFE_NO_PAD.encode(bytes)
}
