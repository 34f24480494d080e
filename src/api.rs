//! Authenticated request pipeline.
//!
//! [`ApiClient::execute`] turns one logical [`ApiRequest`] into at most `max_retries + 1`
//! network attempts. Each attempt passes local admission control, obtains a credential
//! that is safe to send, and is dispatched on its own task so a caller that stops polling
//! cannot abandon an attempt that has already been counted. Transport failures, 401s,
//! and 429s are retried within the bound; everything else is returned on first sight.

pub mod classify;
pub mod paginate;
pub mod request;

pub use classify::*;
pub use paginate::*;
pub use request::*;

// self
use crate::{
	_prelude::*,
	config::ClientConfig,
	error::TransportError,
	flows::AuthCoordinator,
	http::{ApiHttpClient, AsyncHttpClient, HttpRequest, HttpResponse, ResponseMetadataSlot},
	oauth::TransportErrorMapper,
	obs::{self, CallKind, CallOutcome, CallSpan, RetryReason},
	rate_limit::{QuotaFeedback, RateLimitSnapshot, RateLimiter},
	store::CredentialStore,
};
#[cfg(feature = "reqwest")]
use crate::{http::ReqwestHttpClient, oauth::ReqwestTransportErrorMapper};

type AttemptFuture = Pin<Box<dyn Future<Output = Result<HttpResponse>> + Send>>;

/// Client specialized for the crate's default reqwest transport stack.
#[cfg(feature = "reqwest")]
pub type ReqwestApiClient = ApiClient<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Executes resource requests with auth, admission control, and bounded retries.
///
/// Instances are independent; two clients never share credentials or counters.
pub struct ApiClient<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	http_client: Arc<C>,
	transport_mapper: Arc<M>,
	auth: Arc<AuthCoordinator<C, M>>,
	limiter: Arc<RateLimiter>,
	config: ClientConfig,
}
impl<C, M> ApiClient<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a client that reuses the caller-provided transport + mapper pair for both
	/// resource and token requests.
	pub fn with_http_client(
		config: ClientConfig,
		store: Arc<dyn CredentialStore>,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		let http_client = http_client.into();
		let transport_mapper = mapper.into();
		let auth = AuthCoordinator::with_http_client(
			&config,
			store,
			http_client.clone(),
			transport_mapper.clone(),
		);
		let limiter = RateLimiter::new(config.rate_limit);

		Self {
			http_client,
			transport_mapper,
			auth: Arc::new(auth),
			limiter: Arc::new(limiter),
			config,
		}
	}

	/// Credential coordinator used by this client (bootstrap, install, state).
	pub fn auth(&self) -> &AuthCoordinator<C, M> {
		&self.auth
	}

	/// Validated configuration.
	pub fn config(&self) -> &ClientConfig {
		&self.config
	}

	/// Current counts, ceilings, and reset times of both admission windows.
	pub fn rate_limit_snapshot(&self) -> RateLimitSnapshot {
		self.limiter.snapshot()
	}

	/// Runs `request` through the pipeline and decodes a 2xx body into `T`.
	pub async fn execute<T>(&self, request: &ApiRequest) -> Result<T>
	where
		T: DeserializeOwned,
	{
		const KIND: CallKind = CallKind::Request;

		let span = CallSpan::new(KIND, "execute");

		obs::record_call_outcome(KIND, CallOutcome::Attempt);

		let result = span.instrument(self.run(request)).await;

		match &result {
			Ok(_) => obs::record_call_outcome(KIND, CallOutcome::Success),
			Err(e) => {
				obs::record_call_outcome(KIND, CallOutcome::Failure);
				obs::record_failure(KIND, e);
			},
		}

		result
	}

	/// `GET {path}` with query parameters.
	pub async fn get<T>(&self, path: &str, query: &[(&str, &str)]) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let request = query
			.iter()
			.fold(ApiRequest::get(path), |request, (key, value)| request.query(*key, value));

		self.execute(&request).await
	}

	/// `POST {path}` with a JSON body.
	pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T>
	where
		T: DeserializeOwned,
		B: ?Sized + Serialize,
	{
		self.execute(&ApiRequest::post(path).json(body)?).await
	}

	/// `PUT {path}` with a JSON body.
	pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<T>
	where
		T: DeserializeOwned,
		B: ?Sized + Serialize,
	{
		self.execute(&ApiRequest::put(path).json(body)?).await
	}

	/// `DELETE {path}`.
	pub async fn delete<T>(&self, path: &str) -> Result<T>
	where
		T: DeserializeOwned,
	{
		self.execute(&ApiRequest::delete(path)).await
	}

	/// Walks a paged collection, adding `page` and `per_page` to `request`.
	pub async fn fetch_all<T>(&self, request: &ApiRequest, paginator: &Paginator) -> Result<Vec<T>>
	where
		T: DeserializeOwned,
	{
		paginator
			.fetch_all(|page, per_page| {
				let request = request.clone().query("page", page).query("per_page", per_page);

				async move { self.execute::<Vec<T>>(&request).await }
			})
			.await
	}

	async fn run<T>(&self, request: &ApiRequest) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let max_retries = self.config.max_retries;
		let mut attempt = 0;

		loop {
			let admission = if self.config.rate_limiting_enabled {
				Some(self.limiter.acquire().await)
			} else {
				None
			};
			let credential = self.auth.current_credential().await?;
			let wire = request.to_http(&self.config.base_url, &credential)?;

			match admission {
				Some(admission) => admission.record_attempt(),
				None => self.limiter.record_attempt(),
			}

			let error = match self.dispatch(wire).await {
				Ok(response) =>
					match classify_response(response.status(), response.headers(), response.body())
					{
						None => return decode_body(response.body()),
						Some(error) => error,
					},
				Err(error) => error,
			};

			if attempt >= max_retries {
				return Err(error);
			}

			match error {
				Error::Network(_) => {
					obs::record_retry(
						CallKind::Request,
						RetryReason::Network,
						attempt,
						self.config.retry_delay,
					);
					tokio::time::sleep(self.config.retry_delay).await;
				},
				Error::Authentication { .. } => {
					obs::record_retry(
						CallKind::Request,
						RetryReason::Unauthorized,
						attempt,
						StdDuration::ZERO,
					);
					self.auth.refresh(&credential).await?;
				},
				Error::RateLimit { retry_after } => {
					let wait = StdDuration::from_secs(retry_after);

					obs::record_retry(CallKind::Request, RetryReason::RateLimited, attempt, wait);
					tokio::time::sleep(wait).await;
				},
				other => return Err(other),
			}

			attempt += 1;
		}
	}

	/// Sends one attempt on a spawned task that outlives the caller's future.
	async fn dispatch(&self, wire: HttpRequest) -> Result<HttpResponse> {
		let handle = self.http_client.with_metadata(ResponseMetadataSlot::default());
		let mapper = self.transport_mapper.clone();
		let limiter = self.limiter.clone();
		let timeout = self.config.request_timeout;
		let attempt: AttemptFuture = Box::pin(async move {
			let response = match tokio::time::timeout(timeout, handle.call(wire)).await {
				Ok(Ok(response)) => response,
				Ok(Err(e)) => return Err(mapper.map_transport_error(e)),
				Err(_) => return Err(TransportError::Timeout { after: timeout }.into()),
			};

			if let Some(feedback) = QuotaFeedback::from_headers(response.headers()) {
				limiter.record_server_feedback(&feedback);
			}

			Ok(response)
		});

		tokio::spawn(attempt).await.map_err(TransportError::network)?
	}
}
#[cfg(feature = "reqwest")]
impl ApiClient<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a client with its own redirect-free reqwest transport.
	pub fn new(config: ClientConfig, store: Arc<dyn CredentialStore>) -> Result<Self> {
		Ok(Self::with_http_client(
			config,
			store,
			ReqwestHttpClient::new()?,
			ReqwestTransportErrorMapper,
		))
	}
}
impl<C, M> Debug for ApiClient<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiClient")
			.field("config", &self.config)
			.field("auth", &self.auth)
			.field("rate_limit", &self.limiter.snapshot())
			.finish()
	}
}
