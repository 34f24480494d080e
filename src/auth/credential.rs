//! Bearer credential record, expiry rules, and builder.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Lifecycle status of a [`Credential`] at a given instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CredentialStatus {
	/// Outside the refresh buffer; safe to send.
	Valid,
	/// Inside the refresh buffer or past expiry; must be refreshed before use.
	Expiring,
}

/// Errors produced by [`CredentialBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum CredentialBuilderError {
	/// Issued when no access token value was provided.
	#[error("Access token is required.")]
	MissingAccessToken,
	/// Issued when no refresh token value was provided.
	#[error("Refresh token is required.")]
	MissingRefreshToken,
	/// Issued when no expiry (absolute or relative) was configured.
	#[error("Expiry must be supplied via expires_at or expires_in.")]
	MissingExpiry,
	/// Issued when the lifetime puts the expiry outside the representable date range.
	#[error("Expiry is outside the supported date range.")]
	ExpiryOutOfRange,
}

/// Bearer access/refresh token pair with its expiry.
///
/// Records are replaced wholesale on refresh and never mutated in place.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
	/// Token type reported by the token endpoint (normally `Bearer`).
	pub token_type: String,
	/// Access token sent in the `Authorization` header.
	pub access_token: TokenSecret,
	/// Refresh token used to mint the next credential.
	pub refresh_token: TokenSecret,
	/// Absolute expiry, persisted as epoch seconds.
	#[serde(with = "time::serde::timestamp")]
	pub expires_at: OffsetDateTime,
	/// Lifetime reported when the credential was issued, in seconds.
	pub expires_in: i64,
}
impl Credential {
	/// Credentials are treated as expired this long before their real expiry.
	pub const EXPIRY_BUFFER: Duration = Duration::seconds(300);

	/// Returns a builder for assembling a credential from token endpoint fields.
	pub fn builder() -> CredentialBuilder {
		CredentialBuilder::default()
	}

	/// Computes the lifecycle status at the provided instant.
	pub fn status_at(&self, instant: OffsetDateTime) -> CredentialStatus {
		match self.expires_at.checked_sub(Self::EXPIRY_BUFFER) {
			Some(refresh_at) if instant < refresh_at => CredentialStatus::Valid,
			_ => CredentialStatus::Expiring,
		}
	}

	/// Returns `true` if the credential must be refreshed at the provided instant.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		matches!(self.status_at(instant), CredentialStatus::Expiring)
	}

	/// Returns `true` if the credential must be refreshed now.
	pub fn is_expired(&self) -> bool {
		self.is_expired_at(OffsetDateTime::now_utc())
	}

	/// Expiry as Unix epoch seconds.
	pub fn expires_at_epoch(&self) -> i64 {
		self.expires_at.unix_timestamp()
	}

	/// Value for the `Authorization` header.
	pub fn bearer(&self) -> String {
		format!("Bearer {}", self.access_token.expose())
	}
}
impl Debug for Credential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credential")
			.field("token_type", &self.token_type)
			.field("access_token", &"<redacted>")
			.field("refresh_token", &"<redacted>")
			.field("expires_at", &self.expires_at)
			.field("expires_in", &self.expires_in)
			.finish()
	}
}

/// Builder for [`Credential`].
#[derive(Clone, Debug, Default)]
pub struct CredentialBuilder {
	token_type: Option<String>,
	access_token: Option<TokenSecret>,
	refresh_token: Option<TokenSecret>,
	issued_at: Option<OffsetDateTime>,
	expires_at: Option<OffsetDateTime>,
	expires_in: Option<Duration>,
}
impl CredentialBuilder {
	/// Sets the token type (defaults to `Bearer`).
	pub fn token_type(mut self, token_type: impl Into<String>) -> Self {
		self.token_type = Some(token_type.into());

		self
	}

	/// Provides the access token value.
	pub fn access_token(mut self, token: impl Into<String>) -> Self {
		self.access_token = Some(TokenSecret::new(token));

		self
	}

	/// Provides the refresh token value.
	pub fn refresh_token(mut self, token: impl Into<String>) -> Self {
		self.refresh_token = Some(TokenSecret::new(token));

		self
	}

	/// Sets the instant `expires_in` is measured from (defaults to now).
	pub fn issued_at(mut self, instant: OffsetDateTime) -> Self {
		self.issued_at = Some(instant);

		self
	}

	/// Sets an absolute expiry instant; wins over `expires_in` when both are set.
	pub fn expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.expires_at = Some(instant);

		self
	}

	/// Sets an absolute expiry from Unix epoch seconds.
	pub fn expires_at_epoch(self, seconds: i64) -> Self {
		match OffsetDateTime::from_unix_timestamp(seconds) {
			Ok(instant) => self.expires_at(instant),
			Err(_) => self,
		}
	}

	/// Sets a relative lifetime.
	pub fn expires_in(mut self, duration: Duration) -> Self {
		self.expires_in = Some(duration);

		self
	}

	/// Consumes the builder and produces a [`Credential`].
	pub fn build(self) -> Result<Credential, CredentialBuilderError> {
		let access_token = self.access_token.ok_or(CredentialBuilderError::MissingAccessToken)?;
		let refresh_token =
			self.refresh_token.ok_or(CredentialBuilderError::MissingRefreshToken)?;
		let issued_at = self.issued_at.unwrap_or_else(OffsetDateTime::now_utc);
		let (expires_at, expires_in) = match (self.expires_at, self.expires_in) {
			(Some(instant), Some(delta)) => (instant, delta),
			(Some(instant), None) => (instant, instant - issued_at),
			(None, Some(delta)) => (
				issued_at.checked_add(delta).ok_or(CredentialBuilderError::ExpiryOutOfRange)?,
				delta,
			),
			(None, None) => return Err(CredentialBuilderError::MissingExpiry),
		};

		Ok(Credential {
			token_type: self.token_type.unwrap_or_else(|| "Bearer".into()),
			access_token,
			refresh_token,
			expires_at,
			expires_in: expires_in.whole_seconds().max(0),
		})
	}
}
