//! Search request/response shapes exchanged with the managed search API.

// crates.io
use oauth2::http::StatusCode;
// self
use crate::_prelude::*;

/// `error` field of every [`ErrorEnvelope`].
pub const DOWNSTREAM_FAILURE_MESSAGE: &str = "Discovery Engine request failed";

/// Client-supplied search parameters; every field is optional.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
	/// Free-text query.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub query: Option<String>,
	/// Maximum number of results.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub page_size: Option<u32>,
	/// Query expansion options, forwarded as-is.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub query_expansion_spec: Option<JsonValue>,
	/// Spell correction options, forwarded as-is.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub spell_correction_spec: Option<JsonValue>,
	/// BCP-47 language code.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub language_code: Option<String>,
	/// Whether to filter unsafe results.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub safe_search: Option<bool>,
	/// End-user context, forwarded as-is.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub user_info: Option<JsonValue>,
}
impl SearchRequest {
	/// Fills every missing field with its default.
	pub fn into_downstream(self) -> DownstreamSearchBody {
		DownstreamSearchBody {
			query: self.query.unwrap_or_default(),
			page_size: self.page_size.unwrap_or(DownstreamSearchBody::DEFAULT_PAGE_SIZE),
			query_expansion_spec: self
				.query_expansion_spec
				.unwrap_or_else(|| serde_json::json!({ "condition": "AUTO" })),
			spell_correction_spec: self
				.spell_correction_spec
				.unwrap_or_else(|| serde_json::json!({ "mode": "AUTO" })),
			language_code: self
				.language_code
				.unwrap_or_else(|| DownstreamSearchBody::DEFAULT_LANGUAGE_CODE.into()),
			safe_search: self.safe_search.unwrap_or(true),
			user_info: self.user_info.unwrap_or_else(|| {
				serde_json::json!({ "timeZone": DownstreamSearchBody::DEFAULT_TIME_ZONE })
			}),
		}
	}
}

/// Fully populated body POSTed to the search endpoint.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownstreamSearchBody {
	/// Free-text query.
	pub query: String,
	/// Maximum number of results.
	pub page_size: u32,
	/// Query expansion options.
	pub query_expansion_spec: JsonValue,
	/// Spell correction options.
	pub spell_correction_spec: JsonValue,
	/// BCP-47 language code.
	pub language_code: String,
	/// Whether to filter unsafe results.
	pub safe_search: bool,
	/// End-user context.
	pub user_info: JsonValue,
}
impl DownstreamSearchBody {
	/// Page size used when the client omits `pageSize`.
	pub const DEFAULT_PAGE_SIZE: u32 = 10;
	/// Language used when the client omits `languageCode`.
	pub const DEFAULT_LANGUAGE_CODE: &'static str = "en-US";
	/// Time zone used when the client omits `userInfo`.
	pub const DEFAULT_TIME_ZONE: &'static str = "Asia/Calcutta";
}

/// Normalized body returned when the downstream call fails.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
	/// Always [`DOWNSTREAM_FAILURE_MESSAGE`].
	pub error: String,
	/// Downstream HTTP status.
	pub status: u16,
	/// Canonical reason phrase for `status`.
	pub status_text: String,
	/// Downstream body, parsed as JSON or wrapped as `{"raw": ...}`.
	pub details: JsonValue,
}
impl ErrorEnvelope {
	/// Builds the envelope for a failed downstream response.
	pub fn new(status: StatusCode, details: JsonValue) -> Self {
		Self {
			error: DOWNSTREAM_FAILURE_MESSAGE.into(),
			status: status.as_u16(),
			status_text: status.canonical_reason().unwrap_or_default().into(),
			details,
		}
	}
}

/// Final outcome of a forwarded search.
#[derive(Clone, Debug, PartialEq)]
pub enum SearchResponse {
	/// Downstream answered 2xx.
	Success {
		/// Downstream 2xx status.
		status: StatusCode,
		/// Parsed body (or `{"raw": ...}`).
		body: JsonValue,
	},
	/// Downstream answered non-2xx on the final attempt.
	Failed(ErrorEnvelope),
}
impl SearchResponse {
	/// Classifies a downstream response.
	pub fn from_downstream(status: StatusCode, body: JsonValue) -> Self {
		if status.is_success() {
			Self::Success { status, body }
		} else {
			Self::Failed(ErrorEnvelope::new(status, body))
		}
	}

	/// Status code the gateway answers with: `200` on success, the downstream status otherwise.
	pub fn status(&self) -> StatusCode {
		match self {
			Self::Success { .. } => StatusCode::OK,
			Self::Failed(envelope) =>
				StatusCode::from_u16(envelope.status).unwrap_or(StatusCode::BAD_GATEWAY),
		}
	}

	/// Returns `true` for a 2xx outcome.
	pub fn is_success(&self) -> bool {
		matches!(self, Self::Success { .. })
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn empty_request_gets_every_default() {
		let body = serde_json::to_value(SearchRequest::default().into_downstream())
			.expect("Body should serialize.");

		assert_eq!(
			body,
			serde_json::json!({
				"query": "",
				"pageSize": 10,
				"queryExpansionSpec": { "condition": "AUTO" },
				"spellCorrectionSpec": { "mode": "AUTO" },
				"languageCode": "en-US",
				"safeSearch": true,
				"userInfo": { "timeZone": "Asia/Calcutta" },
			})
		);
	}

	#[test]
	fn client_fields_override_defaults() {
		let request: SearchRequest = serde_json::from_value(serde_json::json!({
			"query": "thyroid panel",
			"pageSize": 25,
			"safeSearch": false,
			"userInfo": { "timeZone": "Europe/Berlin", "userId": "u-1" },
		}))
		.expect("Request should deserialize.");
		let body = request.into_downstream();

		assert_eq!(body.query, "thyroid panel");
		assert_eq!(body.page_size, 25);
		assert!(!body.safe_search);
		assert_eq!(body.user_info["userId"], "u-1");
		assert_eq!(body.language_code, "en-US");
		assert_eq!(body.query_expansion_spec, serde_json::json!({ "condition": "AUTO" }));
	}

	#[test]
	fn envelope_mirrors_status() {
		let response = SearchResponse::from_downstream(
			StatusCode::FORBIDDEN,
			serde_json::json!({ "error": { "code": 403 } }),
		);

		assert_eq!(response.status(), StatusCode::FORBIDDEN);
		assert_eq!(
			serde_json::to_value(match response {
				SearchResponse::Failed(envelope) => envelope,
				SearchResponse::Success { .. } => panic!("403 must not be a success."),
			})
			.expect("Envelope should serialize."),
			serde_json::json!({
				"error": "Discovery Engine request failed",
				"status": 403,
				"statusText": "Forbidden",
				"details": { "error": { "code": 403 } },
			})
		);
	}

	#[test]
	fn success_keeps_body() {
		let response =
			SearchResponse::from_downstream(StatusCode::OK, serde_json::json!({ "results": [] }));

		assert!(response.is_success());
		assert_eq!(response.status(), StatusCode::OK);
	}
}
