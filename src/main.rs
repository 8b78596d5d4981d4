//! Discovery gateway binary: reads the environment, loads credentials, and serves the router.

// std
use std::process::ExitCode;
// self
use discovery_gateway::{
	config::GatewayConfig,
	obs,
	server::{self, AppState},
};

#[tokio::main]
async fn main() -> ExitCode {
	obs::init_subscriber();

	let config = match GatewayConfig::from_env() {
		Ok(config) => config,
		Err(err) => {
			tracing::error!(error = %err, "Invalid gateway configuration.");

			return ExitCode::FAILURE;
		},
	};
	let forwarder = match config.build_forwarder() {
		Ok(forwarder) => forwarder,
		Err(err) => {
			tracing::error!(error = %err, kind = err.kind(), "Failed to initialize the gateway.");

			return ExitCode::FAILURE;
		},
	};

	match server::serve(config.bind_addr, AppState::new(forwarder, config.expose_error_chain)).await
	{
		Ok(()) => ExitCode::SUCCESS,
		Err(err) => {
			tracing::error!(error = %err, "Gateway server stopped with an error.");

			ExitCode::FAILURE
		},
	}
}
