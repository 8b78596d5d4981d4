//! HTTP surface: `POST /api/search` and `GET /health`.

// std
use std::net::SocketAddr;
// crates.io
use axum::{
	Json, Router,
	body::Bytes,
	extract::{DefaultBodyLimit, State, rejection::BytesRejection},
	http::{StatusCode, header::CACHE_CONTROL},
	response::{IntoResponse, Response},
	routing,
};
use tokio::net::TcpListener;
// self
use crate::{
	_prelude::*,
	forward::Forwarder,
	http::GatewayHttpClient,
	search::{SearchRequest, SearchResponse},
};

const MAX_REQUEST_BYTES: usize = 64 * 1_024;
const INTERNAL_ERROR_MESSAGE: &str = "Internal server error.";
const INVALID_PAYLOAD_MESSAGE: &str = "Invalid request payload.";
const PAYLOAD_TOO_LARGE_MESSAGE: &str = "Request payload too large.";

/// Shared state handed to every handler.
pub struct AppState<C>
where
	C: ?Sized + GatewayHttpClient,
{
	forwarder: Arc<Forwarder<C>>,
	expose_error_chain: bool,
}
impl<C> AppState<C>
where
	C: ?Sized + GatewayHttpClient,
{
	/// Wraps a forwarder; `expose_error_chain` adds the error source chain to 500 bodies.
	pub fn new(forwarder: impl Into<Arc<Forwarder<C>>>, expose_error_chain: bool) -> Self {
		Self { forwarder: forwarder.into(), expose_error_chain }
	}

	/// Forwarder serving `/api/search`.
	pub fn forwarder(&self) -> &Forwarder<C> {
		&self.forwarder
	}
}
impl<C> Clone for AppState<C>
where
	C: ?Sized + GatewayHttpClient,
{
	fn clone(&self) -> Self {
		Self { forwarder: self.forwarder.clone(), expose_error_chain: self.expose_error_chain }
	}
}
impl<C> Debug for AppState<C>
where
	C: ?Sized + GatewayHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AppState")
			.field("forwarder", &self.forwarder)
			.field("expose_error_chain", &self.expose_error_chain)
			.finish()
	}
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	stack: Option<String>,
}

/// Error response rendered as `{"error": ..., "stack"?: ...}`.
#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	body: ErrorBody,
}
impl ApiError {
	fn bad_request(message: impl Into<String>) -> Self {
		Self::with_status(StatusCode::BAD_REQUEST, message)
	}

	fn with_status(status: StatusCode, message: impl Into<String>) -> Self {
		Self { status, body: ErrorBody { error: message.into(), stack: None } }
	}

	fn unreadable_body(rejection: BytesRejection) -> Self {
		let status = rejection.status();

		tracing::warn!(%status, error = %rejection.body_text(), "Rejected request body.");

		if status == StatusCode::PAYLOAD_TOO_LARGE {
			Self::with_status(status, PAYLOAD_TOO_LARGE_MESSAGE)
		} else {
			Self::with_status(status, INVALID_PAYLOAD_MESSAGE)
		}
	}

	fn internal(err: Error, expose_error_chain: bool) -> Self {
		tracing::error!(error = %err, kind = err.kind(), "Search request failed.");

		Self {
			status: StatusCode::INTERNAL_SERVER_ERROR,
			body: ErrorBody {
				error: INTERNAL_ERROR_MESSAGE.into(),
				stack: expose_error_chain.then(|| error_chain(&err)),
			},
		}
	}

	/// Status the error renders with.
	pub fn status(&self) -> StatusCode {
		self.status
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		(self.status, Json(self.body)).into_response()
	}
}

/// Builds the gateway router.
pub fn router<C>(state: AppState<C>) -> Router
where
	C: ?Sized + GatewayHttpClient,
{
	Router::new()
		.route("/health", routing::get(health))
		.route("/api/search", routing::post(search::<C>))
		.with_state(state)
		.layer(DefaultBodyLimit::max(MAX_REQUEST_BYTES))
}

/// Serves `state` on `addr` until the process receives Ctrl-C (or SIGTERM on Unix).
pub async fn serve<C>(addr: SocketAddr, state: AppState<C>) -> std::io::Result<()>
where
	C: ?Sized + GatewayHttpClient,
{
	let listener = TcpListener::bind(addr).await?;

	tracing::info!(addr = %listener.local_addr()?, "Discovery gateway listening.");

	axum::serve(listener, router(state)).with_graceful_shutdown(shutdown_signal()).await
}

async fn health() -> Json<JsonValue> {
	Json(serde_json::json!({ "status": "ok" }))
}

async fn search<C>(
	State(state): State<AppState<C>>,
	body: Result<Bytes, BytesRejection>,
) -> Result<Response, ApiError>
where
	C: ?Sized + GatewayHttpClient,
{
	let body = body.map_err(ApiError::unreadable_body)?;
	let request = parse_request(&body)?;
	let response = state
		.forwarder
		.forward_search(request)
		.await
		.map_err(|err| ApiError::internal(err, state.expose_error_chain))?;
	let status = response.status();

	Ok(match response {
		SearchResponse::Success { body, .. } =>
			(status, [(CACHE_CONTROL, "no-store")], Json(body)).into_response(),
		SearchResponse::Failed(envelope) => (status, Json(envelope)).into_response(),
	})
}

fn parse_request(body: &[u8]) -> Result<SearchRequest, ApiError> {
	if body.iter().all(u8::is_ascii_whitespace) {
		return Ok(SearchRequest::default());
	}

	let deserializer = &mut serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(deserializer).map_err(|err| {
		tracing::warn!(error = %err, "Invalid request payload.");

		ApiError::bad_request(INVALID_PAYLOAD_MESSAGE)
	})
}

fn error_chain(err: &(dyn StdError + 'static)) -> String {
	let mut chain = vec![err.to_string()];
	let mut source = err.source();

	while let Some(cause) = source {
		chain.push(cause.to_string());

		source = cause.source();
	}

	chain.join("\ncaused by: ")
}

async fn shutdown_signal() {
	let ctrl_c = async {
		if let Err(err) = tokio::signal::ctrl_c().await {
			tracing::error!(error = %err, "Failed to listen for Ctrl-C.");
		}
	};
	#[cfg(unix)]
	let terminate = async {
		match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
			Ok(mut signal) => {
				signal.recv().await;
			},
			Err(err) => {
				tracing::error!(error = %err, "Failed to listen for SIGTERM.");

				std::future::pending::<()>().await;
			},
		}
	};
	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => {},
		_ = terminate => {},
	}

	tracing::info!("Shutting down discovery gateway.");
}
