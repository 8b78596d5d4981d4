//! Observability helpers for gateway stages.
//!
//! - Every stage runs inside a `tracing` span named `discovery_gateway.stage` with the `stage`
//!   (mint or search) and `attempt` (first or retry) fields.
//! - Enable the `metrics` feature to increment the `discovery_gateway_stage_total` counter for
//!   every attempt/success/failure, labeled by `stage` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Gateway stages observed by spans and metrics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
	/// Signing an assertion and exchanging it for an access token.
	Mint,
	/// Forwarding a search request downstream.
	Search,
}
impl Stage {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Stage::Mint => "mint",
			Stage::Search => "search",
		}
	}
}
impl Display for Stage {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StageOutcome {
	/// Entry to a stage.
	Attempt,
	/// Successful completion (for searches, a 2xx downstream response).
	Success,
	/// Downstream rejected the bearer token with 401.
	Unauthenticated,
	/// Failure propagated back to the caller.
	Failure,
}
impl StageOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			StageOutcome::Attempt => "attempt",
			StageOutcome::Success => "success",
			StageOutcome::Unauthenticated => "unauthenticated",
			StageOutcome::Failure => "failure",
		}
	}
}
impl Display for StageOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
