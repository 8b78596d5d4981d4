//! Service-account key material and the sources it can be loaded from.

// std
use std::path::{Path, PathBuf};
// self
use crate::{_prelude::*, error::CredentialError};

/// Where the service-account key JSON is read from at process start.
#[derive(Clone, PartialEq, Eq)]
pub enum CredentialSource {
	/// JSON key file on disk.
	File(PathBuf),
	/// Environment variable holding the JSON document itself.
	Env(String),
	/// JSON document supplied directly (tests, secret-manager adapters).
	Inline(String),
}
impl CredentialSource {
	/// Resolves the source into a parsed key.
	pub fn load(&self) -> Result<ServiceAccountKey, CredentialError> {
		match self {
			Self::File(path) => ServiceAccountKey::from_file(path),
			Self::Env(name) => {
				let raw = std::env::var(name)
					.map_err(|_| CredentialError::MissingEnv { name: name.clone() })?;

				ServiceAccountKey::from_json(&raw)
			},
			Self::Inline(raw) => ServiceAccountKey::from_json(raw),
		}
	}
}
impl Debug for CredentialSource {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::File(path) => f.debug_tuple("File").field(path).finish(),
			Self::Env(name) => f.debug_tuple("Env").field(name).finish(),
			Self::Inline(_) => f.debug_tuple("Inline").field(&"<redacted>").finish(),
		}
	}
}
impl Display for CredentialSource {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::File(path) => write!(f, "file:{}", path.display()),
			Self::Env(name) => write!(f, "env:{name}"),
			Self::Inline(_) => f.write_str("inline"),
		}
	}
}

/// Service-account key fields required for the JWT-bearer grant.
///
/// The private key is a secret: [`Debug`] redacts it and the type does not implement
/// `Serialize`.
#[derive(Clone, Deserialize)]
#[serde(try_from = "RawServiceAccountKey")]
pub struct ServiceAccountKey {
	/// Service-account identity, used as the assertion issuer.
	pub client_email: String,
	/// PEM-encoded RSA private key with escaped newlines already normalized.
	pub private_key: String,
	/// OAuth token endpoint the assertion is exchanged at.
	pub token_uri: Url,
	/// `token_uri` exactly as written in the key file; the assertion audience.
	pub audience: String,
	/// Key identifier, forwarded as the JWT `kid` header when present.
	pub private_key_id: Option<String>,
}
impl ServiceAccountKey {
	/// Builds a key from raw fields, normalizing escaped newlines in `private_key`.
	pub fn new(
		client_email: impl Into<String>,
		private_key: impl AsRef<str>,
		token_uri: Url,
	) -> Self {
		Self {
			client_email: client_email.into(),
			private_key: normalize_pem(private_key.as_ref()),
			audience: token_uri.to_string(),
			token_uri,
			private_key_id: None,
		}
	}

	/// Sets the key identifier forwarded as the JWT `kid` header.
	pub fn with_private_key_id(mut self, id: impl Into<String>) -> Self {
		self.private_key_id = Some(id.into());

		self
	}

	/// Parses a service-account JSON document.
	pub fn from_json(raw: &str) -> Result<Self, CredentialError> {
		let mut de = serde_json::Deserializer::from_str(raw);
		let mut key: Self = serde_path_to_error::deserialize(&mut de)
			.map_err(|source| CredentialError::Malformed { source })?;

		key.private_key = normalize_pem(&key.private_key);
		key.validate()?;

		Ok(key)
	}

	/// Reads and parses a service-account JSON file.
	pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CredentialError> {
		let path = path.as_ref();
		let raw = std::fs::read_to_string(path)
			.map_err(|source| CredentialError::Read { path: path.display().to_string(), source })?;

		Self::from_json(&raw)
	}

	fn validate(&self) -> Result<(), CredentialError> {
		if self.client_email.trim().is_empty() {
			return Err(CredentialError::EmptyField { field: "client_email" });
		}
		if self.private_key.trim().is_empty() {
			return Err(CredentialError::EmptyField { field: "private_key" });
		}

		Ok(())
	}
}
impl Debug for ServiceAccountKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ServiceAccountKey")
			.field("client_email", &self.client_email)
			.field("private_key", &"<redacted>")
			.field("token_uri", &self.token_uri.as_str())
			.field("private_key_id", &self.private_key_id)
			.finish()
	}
}
impl TryFrom<RawServiceAccountKey> for ServiceAccountKey {
	type Error = String;

	fn try_from(raw: RawServiceAccountKey) -> Result<Self, Self::Error> {
		let token_uri = Url::parse(&raw.token_uri)
			.map_err(|err| format!("invalid `token_uri` `{}`: {err}", raw.token_uri))?;

		Ok(Self {
			client_email: raw.client_email,
			private_key: raw.private_key,
			token_uri,
			audience: raw.token_uri,
			private_key_id: raw.private_key_id,
		})
	}
}

#[derive(Deserialize)]
struct RawServiceAccountKey {
	client_email: String,
	private_key: String,
	token_uri: String,
	#[serde(default)]
	private_key_id: Option<String>,
}

/// Key files pasted through environment variables often carry literal `\n` sequences.
fn normalize_pem(raw: &str) -> String {
	raw.replace("\\n", "\n")
}
