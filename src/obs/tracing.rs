// self
use crate::{
	_prelude::*,
	obs::{CallKind, CallOutcome, RetryReason, record_call_outcome},
};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedCall<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedCall<F> = F;

/// A span builder used by pipeline operations.
#[derive(Clone, Debug)]
pub struct CallSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl CallSpan {
	/// Creates a new span tagged with the provided call kind + stage.
	pub fn new(kind: CallKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("strava_client.call", kind = kind.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedCall<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Logs and counts a scheduled retry.
pub fn record_retry(kind: CallKind, reason: RetryReason, attempt: u32, delay: StdDuration) {
	record_call_outcome(kind, CallOutcome::Retry);

	#[cfg(feature = "tracing")]
	tracing::warn!(
		kind = kind.as_str(),
		reason = reason.as_str(),
		attempt,
		delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
		"retrying request"
	);
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (reason, attempt, delay);
	}
}

/// Logs that admission control is holding a request back.
pub fn record_rate_limit_wait(wait: StdDuration) {
	#[cfg(feature = "tracing")]
	tracing::debug!(
		wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
		"local rate limit reached; waiting for window"
	);
	#[cfg(not(feature = "tracing"))]
	{
		let _ = wait;
	}
}

/// Logs that pagination stopped on a failed page and kept the earlier pages.
pub fn record_partial_page(page: u32, error: &Error) {
	#[cfg(feature = "tracing")]
	tracing::warn!(page, error = %error, "pagination stopped early; returning partial results");
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (page, error);
	}
}

/// Logs a terminal pipeline failure.
pub fn record_failure(kind: CallKind, error: &Error) {
	#[cfg(feature = "tracing")]
	tracing::debug!(kind = kind.as_str(), error = %error, "call failed");
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (kind, error);
	}
}
