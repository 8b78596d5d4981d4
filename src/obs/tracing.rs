// crates.io
use tracing::{Instrument, instrument::Instrumented};
use tracing_subscriber::{EnvFilter, fmt};
// self
use crate::{_prelude::*, obs::Stage};

/// A span builder used by gateway stages.
#[derive(Clone, Debug)]
pub struct StageSpan {
	span: tracing::Span,
}
impl StageSpan {
	/// Creates a new span tagged with the provided stage.
	pub fn new(stage: Stage) -> Self {
		let span = tracing::info_span!(
			"discovery_gateway.stage",
			stage = stage.as_str(),
			attempt = tracing::field::Empty
		);

		Self { span }
	}

	/// Records which attempt (`first` or `retry`) the stage belongs to.
	pub fn with_attempt(self, attempt: &'static str) -> Self {
		self.span.record("attempt", attempt);

		self
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> Instrumented<Fut>
	where
		Fut: Future,
	{
		fut.instrument(self.span.clone())
	}
}

/// Installs the global `fmt` subscriber filtered by `RUST_LOG` (default `info`).
///
/// Returns `false` when a subscriber was already installed.
pub fn init_subscriber() -> bool {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

	fmt().with_env_filter(filter).with_target(true).try_init().is_ok()
}
