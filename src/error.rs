//! Client-level error taxonomy shared by the executor, the auth coordinator, and stores.

// self
use crate::_prelude::*;

/// Client-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Structured decode failure carrying the JSON path that did not match.
pub type DecodeError = serde_path_to_error::Error<serde_json::Error>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error returned by every public operation.
///
/// Only [`Error::Network`], a 401 [`Error::Authentication`], and [`Error::RateLimit`] are
/// retried by the executor, and only up to the configured bound. Every other variant is
/// surfaced on first occurrence.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Transport failure (connect, timeout, I/O).
	#[error(transparent)]
	Network(#[from] TransportError),
	/// No usable credential, a rejected refresh, or a 401 that outlived its retries.
	#[error("Authentication failed: {reason}.")]
	Authentication {
		/// Human-readable reason string.
		reason: String,
	},
	/// Response body does not match the expected shape.
	#[error("Response body could not be decoded at `{path}`.")]
	Decoding {
		/// JSON path where decoding stopped.
		path: String,
		/// Underlying JSON failure.
		#[source]
		source: serde_json::Error,
	},
	/// The resource does not exist (HTTP 404).
	#[error("Resource not found.")]
	NotFound {
		/// Raw response body.
		body: String,
	},
	/// Server quota exhausted (HTTP 429) after the retry budget ran out.
	#[error("Rate limit exceeded; retry after {retry_after} seconds.")]
	RateLimit {
		/// Server-advised wait in seconds.
		retry_after: u64,
	},
	/// The server rejected the request payload (HTTP 400).
	#[error("Request failed validation: {body}.")]
	Validation {
		/// Raw response body.
		body: String,
	},
	/// Any other non-success HTTP status.
	#[error("Server returned HTTP {status}.")]
	Http {
		/// HTTP status code.
		status: u16,
		/// Raw response body.
		body: String,
	},
	/// Local configuration or storage problem raised before or outside network activity.
	#[error(transparent)]
	Config(#[from] ConfigError),
}
impl Error {
	/// Builds the error returned when no credential has ever been stored.
	pub fn no_credential() -> Self {
		Self::Authentication { reason: "no credential; initial authorization required".into() }
	}

	/// Returns the HTTP status associated with the error, when there is one.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::NotFound { .. } => Some(404),
			Self::RateLimit { .. } => Some(429),
			Self::Validation { .. } => Some(400),
			Self::Http { status, .. } => Some(*status),
			_ => None,
		}
	}
}
impl From<DecodeError> for Error {
	fn from(e: DecodeError) -> Self {
		let path = e.path().to_string();

		Self::Decoding { path, source: e.into_inner() }
	}
}
impl From<crate::store::StoreError> for Error {
	fn from(e: crate::store::StoreError) -> Self {
		ConfigError::from(e).into()
	}
}

/// Configuration and validation failures raised by the client.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// A configured or derived URL cannot be parsed.
	#[error("The {field} URL is invalid.")]
	InvalidUrl {
		/// Which URL failed validation.
		field: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Redirect URI cannot be parsed.
	#[error("Redirect URI is invalid.")]
	InvalidRedirect {
		/// Underlying parsing failure.
		#[source]
		source: oauth2::url::ParseError,
	},
	/// A required setting is missing.
	#[error("Missing required setting `{setting}`.")]
	MissingSetting {
		/// Setting name.
		setting: &'static str,
	},
	/// A setting holds an unusable value.
	#[error("Setting `{setting}` is invalid: {reason}.")]
	InvalidSetting {
		/// Setting name.
		setting: &'static str,
		/// Why the value was rejected.
		reason: &'static str,
	},
	/// Request body could not be serialized.
	#[error("Request body could not be serialized.")]
	RequestBody(#[source] serde_json::Error),
	/// Credential builder validation failed.
	#[error("Unable to build credential.")]
	CredentialBuild(#[from] crate::auth::CredentialBuilderError),
	/// Token endpoint returned an `expires_in` outside the supported range.
	#[error("The expires_in value exceeds the supported range.")]
	ExpiresInOutOfRange,
	/// Credential storage failed.
	#[error("Credential storage failed: {0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, timeout, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// The attempt did not complete within the per-attempt timeout.
	#[error("Request timed out after {after:?}.")]
	Timeout {
		/// Timeout that elapsed.
		after: StdDuration,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the API.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
