//! Optional observability hooks for the request pipeline.
//!
//! # Feature Flags
//!
//! - `tracing` (default) emits spans named `strava_client.call` with `kind` and `stage`
//!   fields, plus events for retries, rate-limit waits, and refresh outcomes.
//! - `metrics` increments the `strava_client_call_total` counter labeled by `kind` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Pipeline operations observed by the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallKind {
	/// Authorization code exchange.
	Exchange,
	/// Refresh token grant.
	Refresh,
	/// Logical resource request (all attempts).
	Request,
}
impl CallKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CallKind::Exchange => "exchange",
			CallKind::Refresh => "refresh",
			CallKind::Request => "request",
		}
	}
}
impl Display for CallKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded per call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallOutcome {
	/// Entry to a pipeline operation.
	Attempt,
	/// A retry was scheduled.
	Retry,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl CallOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CallOutcome::Attempt => "attempt",
			CallOutcome::Retry => "retry",
			CallOutcome::Success => "success",
			CallOutcome::Failure => "failure",
		}
	}
}
impl Display for CallOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Why the executor scheduled another attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RetryReason {
	/// Transport failure.
	Network,
	/// HTTP 401; the credential was refreshed.
	Unauthorized,
	/// HTTP 429; the executor waits out `Retry-After`.
	RateLimited,
}
impl RetryReason {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			RetryReason::Network => "network",
			RetryReason::Unauthorized => "unauthorized",
			RetryReason::RateLimited => "rate_limited",
		}
	}
}
