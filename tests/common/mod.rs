//! Scripted in-process transport shared by the integration tests.

#![allow(dead_code)]

// std
use std::{
	collections::VecDeque,
	future::Future,
	io::{Error as IoError, ErrorKind},
	pin::Pin,
	sync::Arc,
	time::Duration as StdDuration,
};
// crates.io
use parking_lot::Mutex;
use time::OffsetDateTime;
// self
use strava_client::{
	api::ApiClient,
	auth::Credential,
	config::{ClientConfig, ClientConfigBuilder},
	http::{
		ApiHttpClient, AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse,
		ResponseMetadata, ResponseMetadataSlot,
	},
	oauth::{
		GenericTransportErrorMapper,
		oauth2::http::{HeaderName, HeaderValue, StatusCode, header::AUTHORIZATION},
	},
	store::{CredentialStore, MemoryStore, StoreError, StoreFuture},
};

pub type ScriptedClient = ApiClient<ScriptedHttpClient, GenericTransportErrorMapper>;

pub const BASE_URL: &str = "https://api.test/api/v3";
pub const AUTH_BASE_URL: &str = "https://auth.test";

/// What the fake server does with one request.
#[derive(Clone, Debug)]
pub enum Reply {
	/// Respond with a status, headers, and body.
	Respond { status: u16, headers: Vec<(&'static str, String)>, body: String },
	/// Fail at the transport level (connection reset).
	Fail,
	/// Never complete; the per-attempt timeout has to fire.
	Hang,
	/// Wait on the tokio clock, then behave like the inner reply.
	Delayed { after: StdDuration, reply: Box<Reply> },
}
impl Reply {
	pub fn status(status: u16, body: impl Into<String>) -> Self {
		Self::Respond { status, headers: Vec::new(), body: body.into() }
	}

	pub fn json(body: impl Into<String>) -> Self {
		Self::status(200, body).header("content-type", "application/json")
	}

	pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
		if let Self::Respond { headers, .. } = &mut self {
			headers.push((name, value.into()));
		}

		self
	}

	pub fn token(access: &str, refresh: &str, expires_in: i64) -> Self {
		let expires_at = OffsetDateTime::now_utc().unix_timestamp() + expires_in;

		Self::json(format!(
			r#"{{"token_type":"Bearer","access_token":"{access}","refresh_token":"{refresh}","expires_at":{expires_at},"expires_in":{expires_in}}}"#
		))
	}

	pub fn token_error(status: u16) -> Self {
		Self::status(status, r#"{"error":"invalid_grant","error_description":"Bad Request"}"#)
			.header("content-type", "application/json")
	}

	pub fn delayed(self, after: StdDuration) -> Self {
		Self::Delayed { after, reply: Box::new(self) }
	}

	pub fn rate_limited(retry_after: u64) -> Self {
		Self::status(429, r#"{"message":"Rate Limit Exceeded"}"#)
			.header("retry-after", retry_after.to_string())
	}
}

/// One request observed by the fake server.
#[derive(Clone, Debug)]
pub struct Recorded {
	pub method: String,
	pub uri: String,
	pub authorization: Option<String>,
	pub body: String,
}

#[derive(Default)]
struct Script {
	token: Mutex<VecDeque<Reply>>,
	resource: Mutex<VecDeque<Reply>>,
	token_requests: Mutex<Vec<Recorded>>,
	resource_requests: Mutex<Vec<Recorded>>,
}

/// Routes `/oauth/token` to the token script and everything else to the resource script.
#[derive(Clone, Default)]
pub struct ScriptedHttpClient(Arc<Script>);
impl ScriptedHttpClient {
	pub fn token_replies(&self, replies: impl IntoIterator<Item = Reply>) -> &Self {
		self.0.token.lock().extend(replies);

		self
	}

	pub fn resource_replies(&self, replies: impl IntoIterator<Item = Reply>) -> &Self {
		self.0.resource.lock().extend(replies);

		self
	}

	pub fn token_requests(&self) -> Vec<Recorded> {
		self.0.token_requests.lock().clone()
	}

	pub fn resource_requests(&self) -> Vec<Recorded> {
		self.0.resource_requests.lock().clone()
	}

	pub fn resource_authorizations(&self) -> Vec<String> {
		self.resource_requests().into_iter().filter_map(|r| r.authorization).collect()
	}
}
impl ApiHttpClient for ScriptedHttpClient {
	type Handle = ScriptedHandle;
	type TransportError = IoError;

	fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle {
		ScriptedHandle { script: self.0.clone(), slot }
	}
}

pub struct ScriptedHandle {
	script: Arc<Script>,
	slot: ResponseMetadataSlot,
}
impl<'c> AsyncHttpClient<'c> for ScriptedHandle {
	type Error = HttpClientError<IoError>;
	type Future = Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		let script = self.script.clone();
		let slot = self.slot.clone();

		Box::pin(async move {
			slot.take();

			let recorded = Recorded {
				method: request.method().to_string(),
				uri: request.uri().to_string(),
				authorization: request
					.headers()
					.get(AUTHORIZATION)
					.and_then(|v| v.to_str().ok())
					.map(str::to_owned),
				body: String::from_utf8_lossy(request.body()).into_owned(),
			};
			let is_token = request.uri().path().ends_with("/oauth/token");
			let reply = if is_token {
				script.token_requests.lock().push(recorded);
				script.token.lock().pop_front()
			} else {
				script.resource_requests.lock().push(recorded);
				script.resource.lock().pop_front()
			};
			let Some(mut reply) = reply else {
				let message = format!("unscripted request to {}", request.uri());

				return Err(HttpClientError::Other(message));
			};

			while let Reply::Delayed { after, reply: inner } = reply {
				tokio::time::sleep(after).await;

				reply = *inner;
			}

			match reply {
				Reply::Fail =>
					Err(HttpClientError::Io(IoError::new(ErrorKind::ConnectionReset, "reset"))),
				Reply::Hang => std::future::pending().await,
				Reply::Delayed { .. } => unreachable!("Delays are unwrapped above."),
				Reply::Respond { status, headers, body } => {
					let mut response = HttpResponse::new(body.into_bytes());

					*response.status_mut() =
						StatusCode::from_u16(status).expect("Scripted status should be valid.");

					for (name, value) in headers {
						response.headers_mut().insert(
							HeaderName::from_static(name),
							HeaderValue::from_str(&value).expect("Scripted header should be valid."),
						);
					}

					slot.store(ResponseMetadata { status: Some(status), retry_after: None });

					Ok(response)
				},
			}
		})
	}
}

pub fn credential(access: &str, refresh: &str, expires_in: time::Duration) -> Credential {
	Credential::builder()
		.access_token(access)
		.refresh_token(refresh)
		.expires_in(expires_in)
		.build()
		.expect("Credential fixture should build.")
}

pub fn valid_credential() -> Credential {
	credential("access-1", "refresh-1", time::Duration::hours(6))
}

pub fn expired_credential() -> Credential {
	credential("stale-access", "refresh-1", time::Duration::minutes(-10))
}

/// Serves a fixed credential and refuses every save.
pub struct ReadOnlyStore(pub Credential);
impl CredentialStore for ReadOnlyStore {
	fn save(&self, _: Credential) -> StoreFuture<'_, ()> {
		Box::pin(async { Err(StoreError::Backend { message: "read-only".into() }) })
	}

	fn load(&self) -> StoreFuture<'_, Option<Credential>> {
		let credential = self.0.clone();

		Box::pin(async move { Ok(Some(credential)) })
	}
}

pub fn client_with(
	http: &ScriptedHttpClient,
	store: MemoryStore,
	configure: impl FnOnce(ClientConfigBuilder) -> ClientConfigBuilder,
) -> ScriptedClient {
	client_with_store(http, Arc::new(store), configure)
}

pub fn client_with_store(
	http: &ScriptedHttpClient,
	store: Arc<dyn CredentialStore>,
	configure: impl FnOnce(ClientConfigBuilder) -> ClientConfigBuilder,
) -> ScriptedClient {
	let config = configure(
		ClientConfig::builder("1234", "client-secret")
			.base_url(BASE_URL)
			.auth_base_url(AUTH_BASE_URL)
			.retry_delay(StdDuration::from_secs(1)),
	)
	.build()
	.expect("Test configuration should build.");

	ApiClient::with_http_client(config, store, http.clone(), GenericTransportErrorMapper)
}

pub fn client(http: &ScriptedHttpClient, store: MemoryStore) -> ScriptedClient {
	client_with(http, store, |builder| builder)
}
