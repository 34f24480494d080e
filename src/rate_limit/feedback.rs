//! Server quota headers (`X-RateLimit-Usage` / `X-RateLimit-Limit`).

// crates.io
use oauth2::http::HeaderMap;

/// Header carrying `"{short},{long}"` request counts already consumed.
pub const USAGE_HEADER: &str = "x-ratelimit-usage";
/// Header carrying `"{short},{long}"` request ceilings.
pub const LIMIT_HEADER: &str = "x-ratelimit-limit";

/// Usage and limit the server reported for one window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WindowQuota {
	/// Requests already counted by the server.
	pub usage: u32,
	/// Server-side ceiling for the window.
	pub limit: u32,
}
impl WindowQuota {
	/// Requests the server will still accept in this window.
	pub fn remaining(&self) -> u32 {
		self.limit.saturating_sub(self.usage)
	}
}

/// Authoritative quota state parsed from one response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QuotaFeedback {
	/// Short (15 minute) window.
	pub short: WindowQuota,
	/// Long (daily) window.
	pub long: WindowQuota,
}
impl QuotaFeedback {
	/// Parses the usage and limit headers; `None` when either is absent or malformed.
	pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
		let usage = headers.get(USAGE_HEADER)?.to_str().ok()?;
		let limit = headers.get(LIMIT_HEADER)?.to_str().ok()?;

		Self::parse(usage, limit)
	}

	/// Parses raw `"{short},{long}"` header values.
	pub fn parse(usage: &str, limit: &str) -> Option<Self> {
		let (short_usage, long_usage) = parse_pair(usage)?;
		let (short_limit, long_limit) = parse_pair(limit)?;

		Some(Self {
			short: WindowQuota { usage: short_usage, limit: short_limit },
			long: WindowQuota { usage: long_usage, limit: long_limit },
		})
	}
}

fn parse_pair(raw: &str) -> Option<(u32, u32)> {
	let (short, long) = raw.split_once(',')?;

	Some((short.trim().parse().ok()?, long.trim().parse().ok()?))
}
