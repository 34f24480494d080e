//! Client-side admission control over the short and long request windows.
//!
//! The [`RateLimiter`] approximates the server's two fixed-window quotas locally so the
//! client holds requests back before the server starts answering 429. Admission is a
//! reservation: [`RateLimiter::acquire`] returns an [`Admission`] guard that must be
//! turned into a counted attempt with [`Admission::record_attempt`] right before the
//! request is dispatched. Dropping the guard (for example because the caller's future
//! was cancelled while waiting for a credential) releases the reservation without
//! leaving an increment behind.
//!
//! Response headers feed back through [`RateLimiter::record_server_feedback`], which
//! adopts the server's usage and may tighten, but never loosen, the configured ceilings.

mod feedback;

pub use feedback::*;

// crates.io
use tokio::time::{self as tokio_time, Instant};
// self
use crate::{_prelude::*, obs};

/// Window sizes and ceilings used for local admission.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimitConfig {
	/// Length of the short window.
	pub short_window: StdDuration,
	/// Requests allowed per short window.
	pub short_ceiling: u32,
	/// Length of the long window.
	pub long_window: StdDuration,
	/// Requests allowed per long window.
	pub long_ceiling: u32,
}
impl RateLimitConfig {
	/// Default short window (15 minutes).
	pub const DEFAULT_SHORT_WINDOW: StdDuration = StdDuration::from_secs(15 * 60);
	/// Default short ceiling.
	pub const DEFAULT_SHORT_CEILING: u32 = 100;
	/// Default long window (24 hours).
	pub const DEFAULT_LONG_WINDOW: StdDuration = StdDuration::from_secs(24 * 60 * 60);
	/// Default long ceiling.
	pub const DEFAULT_LONG_CEILING: u32 = 1_000;
}
impl Default for RateLimitConfig {
	fn default() -> Self {
		Self {
			short_window: Self::DEFAULT_SHORT_WINDOW,
			short_ceiling: Self::DEFAULT_SHORT_CEILING,
			long_window: Self::DEFAULT_LONG_WINDOW,
			long_ceiling: Self::DEFAULT_LONG_CEILING,
		}
	}
}

/// Result of one admission check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateLimitDecision {
	/// The request may proceed immediately.
	Allow,
	/// Every exhausted window must roll over first; wait this long.
	Delay(StdDuration),
}

/// Point-in-time view of one window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WindowSnapshot {
	/// Dispatched attempts counted in the current window.
	pub count: u32,
	/// Admissions granted but not dispatched yet.
	pub reserved: u32,
	/// Ceiling currently enforced.
	pub ceiling: u32,
	/// Time left until the window rolls over.
	pub resets_in: StdDuration,
}
impl WindowSnapshot {
	/// Admissions still available in the current window.
	pub fn remaining(&self) -> u32 {
		self.ceiling.saturating_sub(self.count.saturating_add(self.reserved))
	}
}

/// Point-in-time view of both windows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimitSnapshot {
	/// Short window.
	pub short: WindowSnapshot,
	/// Long window.
	pub long: WindowSnapshot,
}

/// Dual fixed-window admission controller shared by every call on a client.
#[derive(Debug)]
pub struct RateLimiter {
	state: Mutex<RateLimitState>,
}
impl RateLimiter {
	/// Creates a limiter whose windows start now with zero counts.
	pub fn new(config: RateLimitConfig) -> Self {
		let now = Instant::now();

		Self {
			state: Mutex::new(RateLimitState {
				short: Window::new(config.short_window, config.short_ceiling, now),
				long: Window::new(config.long_window, config.long_ceiling, now),
			}),
		}
	}

	/// Waits until both windows have room, then reserves one admission.
	///
	/// Never fails. When both windows are exhausted the wait is the longer of the two
	/// remaining window times, and the check is repeated after waking since concurrent
	/// callers may have taken the freed room.
	pub async fn acquire(&self) -> Admission<'_> {
		loop {
			let wait = {
				let mut state = self.state.lock();

				match state.check(Instant::now()) {
					RateLimitDecision::Allow => {
						state.short.reserved += 1;
						state.long.reserved += 1;

						return Admission { limiter: self, armed: true };
					},
					RateLimitDecision::Delay(wait) => wait,
				}
			};

			obs::record_rate_limit_wait(wait);
			tokio_time::sleep(wait).await;
		}
	}

	/// Evaluates admission without reserving anything.
	pub fn check(&self) -> RateLimitDecision {
		self.state.lock().check(Instant::now())
	}

	/// Counts one dispatched attempt in both windows.
	pub fn record_attempt(&self) {
		let mut state = self.state.lock();

		state.roll(Instant::now());
		state.short.count = state.short.count.saturating_add(1);
		state.long.count = state.long.count.saturating_add(1);
	}

	/// Absorbs the server's view of both windows.
	///
	/// The local count is raised to the server's usage and the ceiling is set to the
	/// server's limit, capped at the configured default.
	pub fn record_server_feedback(&self, feedback: &QuotaFeedback) {
		let mut state = self.state.lock();

		state.roll(Instant::now());
		state.short.absorb(feedback.short);
		state.long.absorb(feedback.long);
	}

	/// Returns counts, ceilings, and reset times for both windows.
	pub fn snapshot(&self) -> RateLimitSnapshot {
		let mut state = self.state.lock();
		let now = Instant::now();

		state.roll(now);

		RateLimitSnapshot { short: state.short.snapshot(now), long: state.long.snapshot(now) }
	}

	fn commit_reservation(&self) {
		let mut guard = self.state.lock();
		let state = &mut *guard;

		state.roll(Instant::now());

		for window in [&mut state.short, &mut state.long] {
			window.reserved = window.reserved.saturating_sub(1);
			window.count = window.count.saturating_add(1);
		}
	}

	fn release_reservation(&self) {
		let mut state = self.state.lock();

		state.short.reserved = state.short.reserved.saturating_sub(1);
		state.long.reserved = state.long.reserved.saturating_sub(1);
	}
}
impl Default for RateLimiter {
	fn default() -> Self {
		Self::new(RateLimitConfig::default())
	}
}

/// Reserved admission returned by [`RateLimiter::acquire`].
#[must_use = "dropping an admission releases it without counting an attempt"]
pub struct Admission<'a> {
	limiter: &'a RateLimiter,
	armed: bool,
}
impl Admission<'_> {
	/// Converts the reservation into a counted attempt; call right before dispatching.
	pub fn record_attempt(mut self) {
		self.armed = false;
		self.limiter.commit_reservation();
	}
}
impl Debug for Admission<'_> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Admission").field("armed", &self.armed).finish()
	}
}
impl Drop for Admission<'_> {
	fn drop(&mut self) {
		if self.armed {
			self.limiter.release_reservation();
		}
	}
}

#[derive(Debug)]
struct RateLimitState {
	short: Window,
	long: Window,
}
impl RateLimitState {
	fn roll(&mut self, now: Instant) {
		self.short.roll(now);
		self.long.roll(now);
	}

	fn check(&mut self, now: Instant) -> RateLimitDecision {
		self.roll(now);

		let wait = [&self.short, &self.long]
			.into_iter()
			.filter(|window| window.is_exhausted())
			.map(|window| window.resets_in(now))
			.max();

		match wait {
			Some(wait) => RateLimitDecision::Delay(wait),
			None => RateLimitDecision::Allow,
		}
	}
}

#[derive(Debug)]
struct Window {
	duration: StdDuration,
	default_ceiling: u32,
	server_ceiling: Option<u32>,
	count: u32,
	reserved: u32,
	started_at: Instant,
}
impl Window {
	fn new(duration: StdDuration, default_ceiling: u32, now: Instant) -> Self {
		Self { duration, default_ceiling, server_ceiling: None, count: 0, reserved: 0, started_at: now }
	}

	fn roll(&mut self, now: Instant) {
		if now.saturating_duration_since(self.started_at) >= self.duration {
			self.count = 0;
			self.started_at = now;
		}
	}

	fn ceiling(&self) -> u32 {
		self.server_ceiling.map_or(self.default_ceiling, |limit| limit.min(self.default_ceiling))
	}

	fn is_exhausted(&self) -> bool {
		self.count.saturating_add(self.reserved) >= self.ceiling()
	}

	fn resets_in(&self, now: Instant) -> StdDuration {
		self.duration.saturating_sub(now.saturating_duration_since(self.started_at))
	}

	fn absorb(&mut self, quota: WindowQuota) {
		// A zero limit would never admit again, even after the window rolls.
		self.server_ceiling = Some(quota.limit.max(1));
		self.count = self.count.max(quota.usage);
	}

	fn snapshot(&self, now: Instant) -> WindowSnapshot {
		WindowSnapshot {
			count: self.count,
			reserved: self.reserved,
			ceiling: self.ceiling(),
			resets_in: self.resets_in(now),
		}
	}
}
