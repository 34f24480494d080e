//! Validated client configuration and its builder.

// self
use crate::{_prelude::*, auth::TokenSecret, error::ConfigError, rate_limit::RateLimitConfig};

/// Default resource API base.
pub const DEFAULT_BASE_URL: &str = "https://www.strava.com/api/v3";
/// Default OAuth host; the token and authorize endpoints live under `/oauth/`.
pub const DEFAULT_AUTH_BASE_URL: &str = "https://www.strava.com";

/// Settings shared by the executor and the auth coordinator.
///
/// Build one with [`ClientConfig::builder`]; every field has already been validated.
#[derive(Clone)]
pub struct ClientConfig {
	/// OAuth application identifier.
	pub client_id: String,
	/// OAuth application secret.
	pub client_secret: TokenSecret,
	/// Resource API base; request paths are appended to it.
	pub base_url: Url,
	/// OAuth host.
	pub auth_base_url: Url,
	/// `{auth_base_url}/oauth/token`.
	pub token_endpoint: Url,
	/// `{auth_base_url}/oauth/authorize`.
	pub authorize_endpoint: Url,
	/// Upper bound for a single network attempt (token calls included).
	pub request_timeout: StdDuration,
	/// Additional attempts allowed after the first one.
	pub max_retries: u32,
	/// Pause before retrying a transport failure.
	pub retry_delay: StdDuration,
	/// Whether requests pass through local admission control.
	pub rate_limiting_enabled: bool,
	/// Window sizes and ceilings for local admission control.
	pub rate_limit: RateLimitConfig,
}
impl ClientConfig {
	/// Default per-attempt timeout.
	pub const DEFAULT_REQUEST_TIMEOUT: StdDuration = StdDuration::from_secs(30);
	/// Default retry bound.
	pub const DEFAULT_MAX_RETRIES: u32 = 3;
	/// Default delay between transport retries.
	pub const DEFAULT_RETRY_DELAY: StdDuration = StdDuration::from_secs(1);

	/// Starts a builder seeded with the application credentials and default settings.
	pub fn builder(
		client_id: impl Into<String>,
		client_secret: impl Into<TokenSecret>,
	) -> ClientConfigBuilder {
		ClientConfigBuilder::new(client_id, client_secret)
	}
}
impl Debug for ClientConfig {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ClientConfig")
			.field("client_id", &self.client_id)
			.field("client_secret", &self.client_secret)
			.field("base_url", &self.base_url.as_str())
			.field("auth_base_url", &self.auth_base_url.as_str())
			.field("request_timeout", &self.request_timeout)
			.field("max_retries", &self.max_retries)
			.field("retry_delay", &self.retry_delay)
			.field("rate_limiting_enabled", &self.rate_limiting_enabled)
			.field("rate_limit", &self.rate_limit)
			.finish()
	}
}

/// Builder for [`ClientConfig`].
#[derive(Clone, Debug)]
pub struct ClientConfigBuilder {
	client_id: String,
	client_secret: TokenSecret,
	base_url: String,
	auth_base_url: String,
	request_timeout: StdDuration,
	max_retries: u32,
	retry_delay: StdDuration,
	rate_limiting_enabled: bool,
	rate_limit: RateLimitConfig,
}
impl ClientConfigBuilder {
	fn new(client_id: impl Into<String>, client_secret: impl Into<TokenSecret>) -> Self {
		Self {
			client_id: client_id.into(),
			client_secret: client_secret.into(),
			base_url: DEFAULT_BASE_URL.into(),
			auth_base_url: DEFAULT_AUTH_BASE_URL.into(),
			request_timeout: ClientConfig::DEFAULT_REQUEST_TIMEOUT,
			max_retries: ClientConfig::DEFAULT_MAX_RETRIES,
			retry_delay: ClientConfig::DEFAULT_RETRY_DELAY,
			rate_limiting_enabled: true,
			rate_limit: RateLimitConfig::default(),
		}
	}

	/// Overrides the resource API base.
	pub fn base_url(mut self, url: impl Into<String>) -> Self {
		self.base_url = url.into();

		self
	}

	/// Overrides the OAuth host.
	pub fn auth_base_url(mut self, url: impl Into<String>) -> Self {
		self.auth_base_url = url.into();

		self
	}

	/// Overrides the per-attempt timeout.
	pub fn request_timeout(mut self, timeout: StdDuration) -> Self {
		self.request_timeout = timeout;

		self
	}

	/// Overrides the retry bound; `0` disables retries.
	pub fn max_retries(mut self, retries: u32) -> Self {
		self.max_retries = retries;

		self
	}

	/// Overrides the delay applied before retrying a transport failure.
	pub fn retry_delay(mut self, delay: StdDuration) -> Self {
		self.retry_delay = delay;

		self
	}

	/// Enables or disables local admission control.
	pub fn rate_limiting(mut self, enabled: bool) -> Self {
		self.rate_limiting_enabled = enabled;

		self
	}

	/// Overrides the window sizes and ceilings.
	pub fn rate_limit(mut self, config: RateLimitConfig) -> Self {
		self.rate_limit = config;

		self
	}

	/// Validates the settings and derives the OAuth endpoints.
	pub fn build(self) -> Result<ClientConfig, ConfigError> {
		if self.client_id.trim().is_empty() {
			return Err(ConfigError::MissingSetting { setting: "client_id" });
		}
		if self.client_secret.is_blank() {
			return Err(ConfigError::MissingSetting { setting: "client_secret" });
		}
		if self.request_timeout.is_zero() {
			return Err(ConfigError::InvalidSetting {
				setting: "request_timeout",
				reason: "must be greater than zero",
			});
		}
		if self.rate_limit.short_ceiling == 0 || self.rate_limit.long_ceiling == 0 {
			return Err(ConfigError::InvalidSetting {
				setting: "rate_limit",
				reason: "ceilings must be greater than zero",
			});
		}
		if self.rate_limit.short_window.is_zero() || self.rate_limit.long_window.is_zero() {
			return Err(ConfigError::InvalidSetting {
				setting: "rate_limit",
				reason: "windows must be greater than zero",
			});
		}

		let base_url = parse_base("base_url", &self.base_url)?;
		let auth_base_url = parse_base("auth_base_url", &self.auth_base_url)?;
		let token_endpoint = join(&auth_base_url, "token_endpoint", "oauth/token")?;
		let authorize_endpoint = join(&auth_base_url, "authorize_endpoint", "oauth/authorize")?;

		Ok(ClientConfig {
			client_id: self.client_id,
			client_secret: self.client_secret,
			base_url,
			auth_base_url,
			token_endpoint,
			authorize_endpoint,
			request_timeout: self.request_timeout,
			max_retries: self.max_retries,
			retry_delay: self.retry_delay,
			rate_limiting_enabled: self.rate_limiting_enabled,
			rate_limit: self.rate_limit,
		})
	}
}

fn parse_base(field: &'static str, raw: &str) -> Result<Url, ConfigError> {
	let url = Url::parse(raw.trim()).map_err(|source| ConfigError::InvalidUrl { field, source })?;

	if !matches!(url.scheme(), "http" | "https") {
		return Err(ConfigError::InvalidSetting { setting: field, reason: "scheme must be http(s)" });
	}

	Ok(url)
}

fn join(base: &Url, field: &'static str, path: &str) -> Result<Url, ConfigError> {
	let raw = format!("{}/{path}", base.as_str().trim_end_matches('/'));

	Url::parse(&raw).map_err(|source| ConfigError::InvalidUrl { field, source })
}
