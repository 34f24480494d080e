//! Logical request descriptor, immutable across retries.

// crates.io
use oauth2::http::{
	Method, Request,
	header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderValue},
};
// self
use crate::{_prelude::*, auth::Credential, error::ConfigError, http::HttpRequest};

const JSON: &str = "application/json";

/// One logical API call: method, path, query, and optional JSON body.
///
/// Only the `Authorization` header differs between the attempts made for one request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiRequest {
	/// HTTP method.
	pub method: Method,
	/// Path relative to the configured base URL.
	pub path: String,
	/// Query parameters in insertion order.
	pub query: Vec<(String, String)>,
	/// Pre-encoded JSON body.
	pub body: Option<Vec<u8>>,
}
impl ApiRequest {
	/// Creates a request with an arbitrary method.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self { method, path: path.into(), query: Vec::new(), body: None }
	}

	/// `GET {path}`.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::GET, path)
	}

	/// `POST {path}`.
	pub fn post(path: impl Into<String>) -> Self {
		Self::new(Method::POST, path)
	}

	/// `PUT {path}`.
	pub fn put(path: impl Into<String>) -> Self {
		Self::new(Method::PUT, path)
	}

	/// `DELETE {path}`.
	pub fn delete(path: impl Into<String>) -> Self {
		Self::new(Method::DELETE, path)
	}

	/// Appends a query parameter.
	pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
		self.query.push((key.into(), value.to_string()));

		self
	}

	/// Serializes `body` as the JSON payload.
	pub fn json<B>(mut self, body: &B) -> Result<Self>
	where
		B: ?Sized + Serialize,
	{
		self.body = Some(serde_json::to_vec(body).map_err(ConfigError::RequestBody)?);

		Ok(self)
	}

	/// Resolves the absolute URL against `base`.
	pub fn url(&self, base: &Url) -> Result<Url> {
		let raw = format!(
			"{}/{}",
			base.as_str().trim_end_matches('/'),
			self.path.trim_start_matches('/')
		);
		let mut url = Url::parse(&raw)
			.map_err(|source| ConfigError::InvalidUrl { field: "request path", source })?;

		if !self.query.is_empty() {
			url.query_pairs_mut().extend_pairs(self.query.iter());
		}

		Ok(url)
	}

	/// Builds the wire request for one attempt with `credential` as bearer.
	pub(crate) fn to_http(&self, base: &Url, credential: &Credential) -> Result<HttpRequest> {
		let url = self.url(base)?;
		let bearer = HeaderValue::from_str(&credential.bearer()).map_err(|_| {
			ConfigError::InvalidSetting {
				setting: "access_token",
				reason: "not a valid header value",
			}
		})?;
		let mut builder = Request::builder()
			.method(self.method.clone())
			.uri(url.as_str())
			.header(AUTHORIZATION, bearer)
			.header(ACCEPT, JSON);

		if self.body.is_some() {
			builder = builder.header(CONTENT_TYPE, JSON);
		}

		let request =
			builder.body(self.body.clone().unwrap_or_default()).map_err(ConfigError::from)?;

		Ok(request)
	}
}
