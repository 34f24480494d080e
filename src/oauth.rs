//! Token endpoint facade over the `oauth2` crate.
//!
//! Both grants the client needs (authorization code and refresh token) post
//! `client_id`/`client_secret` in the form body and receive a JSON body carrying
//! `access_token`, `refresh_token`, `expires_at`, and `expires_in`. The facade turns
//! that response into a [`Credential`] and every failure into a client [`Error`].

pub use oauth2;

// crates.io
use oauth2::{
	AuthType, AuthorizationCode, Client, ClientId, ClientSecret, EndpointNotSet, EndpointSet,
	ExtraTokenFields, HttpClientError, RedirectUrl, RefreshToken, RequestTokenError,
	StandardRevocableToken, StandardTokenResponse, TokenResponse, TokenUrl,
	basic::{
		BasicErrorResponse, BasicRevocationErrorResponse, BasicTokenIntrospectionResponse,
		BasicTokenType,
	},
};
// self
use crate::{
	_prelude::*,
	auth::{Credential, CredentialBuilderError, TokenSecret},
	error::{ConfigError, TransportError},
	http::{ApiHttpClient, ResponseMetadata, ResponseMetadataSlot},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

type ConfiguredClient = Client<
	BasicErrorResponse,
	TokenEndpointResponse,
	BasicTokenIntrospectionResponse,
	StandardRevocableToken,
	BasicRevocationErrorResponse,
	EndpointNotSet,
	EndpointNotSet,
	EndpointNotSet,
	EndpointNotSet,
	EndpointSet,
>;
type TokenEndpointResponse = StandardTokenResponse<ExpiryFields, BasicTokenType>;
type TokenRequestError<E> = RequestTokenError<HttpClientError<E>, BasicErrorResponse>;
type FacadeFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Non-standard fields the token endpoint adds to its response.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ExpiryFields {
	/// Absolute expiry as Unix epoch seconds.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub expires_at: Option<i64>,
}
impl ExtraTokenFields for ExpiryFields {}

/// Maps HTTP transport failures into client [`Error`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted by the transport into a client error.
	fn map_transport_error(&self, error: HttpClientError<E>) -> Error;
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(&self, error: HttpClientError<ReqwestError>) -> Error {
		match error {
			HttpClientError::Reqwest(inner) if inner.is_builder() =>
				ConfigError::from(*inner).into(),
			HttpClientError::Reqwest(inner) => TransportError::from(*inner).into(),
			other => GenericTransportErrorMapper.map_transport_error(other),
		}
	}
}

/// Mapper for arbitrary transports: request construction failures are configuration
/// errors, everything else is a network error.
#[derive(Clone, Debug, Default)]
pub struct GenericTransportErrorMapper;
impl<E> TransportErrorMapper<E> for GenericTransportErrorMapper
where
	E: 'static + Send + Sync + StdError,
{
	fn map_transport_error(&self, error: HttpClientError<E>) -> Error {
		match error {
			HttpClientError::Http(inner) => ConfigError::from(inner).into(),
			HttpClientError::Io(inner) => TransportError::Io(inner).into(),
			HttpClientError::Reqwest(inner) => TransportError::network(*inner).into(),
			HttpClientError::Other(message) =>
				TransportError::network(std::io::Error::other(message)).into(),
			other => TransportError::network(std::io::Error::other(other.to_string())).into(),
		}
	}
}

/// Token endpoint client bound to one application's credentials.
pub struct TokenFacade<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	oauth_client: ConfiguredClient,
	http_client: Arc<C>,
	error_mapper: Arc<M>,
	request_timeout: StdDuration,
}
impl<C, M> TokenFacade<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Builds a facade for the provided token endpoint.
	pub fn new(
		token_endpoint: &Url,
		client_id: &str,
		client_secret: &TokenSecret,
		request_timeout: StdDuration,
		http_client: impl Into<Arc<C>>,
		error_mapper: impl Into<Arc<M>>,
	) -> Self {
		let oauth_client: ConfiguredClient = Client::new(ClientId::new(client_id.to_owned()))
			.set_client_secret(ClientSecret::new(client_secret.expose().to_owned()))
			.set_auth_type(AuthType::RequestBody)
			.set_token_uri(TokenUrl::from_url(token_endpoint.clone()));

		Self {
			oauth_client,
			http_client: http_client.into(),
			error_mapper: error_mapper.into(),
			request_timeout,
		}
	}

	/// Exchanges a one-time authorization code for the first credential.
	pub fn exchange_code<'a>(
		&'a self,
		code: &'a str,
		redirect_uri: &'a Url,
	) -> FacadeFuture<'a, Credential> {
		let meta = ResponseMetadataSlot::default();

		Box::pin(async move {
			let redirect_url = RedirectUrl::new(redirect_uri.to_string())
				.map_err(|source| ConfigError::InvalidRedirect { source })?;
			let handle = self.http_client.with_metadata(meta.clone());
			let request = self
				.oauth_client
				.exchange_code(AuthorizationCode::new(code.to_owned()))
				.set_redirect_uri(std::borrow::Cow::Owned(redirect_url));
			let response = tokio::time::timeout(self.request_timeout, request.request_async(&handle))
				.await
				.map_err(|_| TransportError::Timeout { after: self.request_timeout })?
				.map_err(|e| map_request_error(meta.take(), e, self.error_mapper.as_ref()))?;

			map_token_response(response, None)
		})
	}

	/// Redeems a refresh token for a new credential.
	///
	/// When the response omits a refresh token the presented one is carried over.
	pub fn refresh<'a>(&'a self, refresh_token: &'a TokenSecret) -> FacadeFuture<'a, Credential> {
		let meta = ResponseMetadataSlot::default();

		Box::pin(async move {
			let handle = self.http_client.with_metadata(meta.clone());
			let secret = RefreshToken::new(refresh_token.expose().to_owned());
			let request = self.oauth_client.exchange_refresh_token(&secret);
			let response = tokio::time::timeout(self.request_timeout, request.request_async(&handle))
				.await
				.map_err(|_| TransportError::Timeout { after: self.request_timeout })?
				.map_err(|e| map_request_error(meta.take(), e, self.error_mapper.as_ref()))?;

			map_token_response(response, Some(refresh_token))
		})
	}
}
#[cfg(feature = "reqwest")]
impl TokenFacade<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Builds a facade over the default reqwest transport.
	pub fn reqwest(
		token_endpoint: &Url,
		client_id: &str,
		client_secret: &TokenSecret,
		request_timeout: StdDuration,
		http_client: ReqwestHttpClient,
	) -> Self {
		Self::new(
			token_endpoint,
			client_id,
			client_secret,
			request_timeout,
			http_client,
			ReqwestTransportErrorMapper,
		)
	}
}
impl<C, M> Debug for TokenFacade<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenFacade")
			.field("token_endpoint", &self.oauth_client.token_uri().as_str())
			.field("request_timeout", &self.request_timeout)
			.finish()
	}
}

fn map_token_response(
	response: TokenEndpointResponse,
	previous_refresh: Option<&TokenSecret>,
) -> Result<Credential> {
	let mut builder = Credential::builder()
		.token_type(token_type_label(response.token_type()))
		.access_token(response.access_token().secret().to_owned());

	if let Some(epoch) = response.extra_fields().expires_at {
		builder = builder.expires_at_epoch(epoch);
	}
	if let Some(expires_in) = response.expires_in() {
		let seconds =
			i64::try_from(expires_in.as_secs()).map_err(|_| ConfigError::ExpiresInOutOfRange)?;

		builder = builder.expires_in(Duration::seconds(seconds));
	}

	match (response.refresh_token(), previous_refresh) {
		(Some(fresh), _) => builder = builder.refresh_token(fresh.secret().to_owned()),
		(None, Some(previous)) => builder = builder.refresh_token(previous.expose()),
		(None, None) => {},
	}

	builder.build().map_err(|e| match e {
		CredentialBuilderError::ExpiryOutOfRange => ConfigError::ExpiresInOutOfRange.into(),
		other => ConfigError::from(other).into(),
	})
}

fn token_type_label(token_type: &BasicTokenType) -> String {
	match token_type {
		BasicTokenType::Bearer => "Bearer".into(),
		other => serde_json::to_value(other)
			.ok()
			.and_then(|value| value.as_str().map(str::to_owned))
			.unwrap_or_else(|| "Bearer".into()),
	}
}

fn map_request_error<E, M>(
	meta: Option<ResponseMetadata>,
	error: TokenRequestError<E>,
	mapper: &M,
) -> Error
where
	E: 'static + Send + Sync + StdError,
	M: ?Sized + TransportErrorMapper<E>,
{
	let status = meta.and_then(|value| value.status);

	match error {
		RequestTokenError::ServerResponse(response) => {
			let reason = match response.error_description() {
				Some(description) =>
					format!("token endpoint rejected the grant: {description}"),
				None =>
					format!("token endpoint rejected the grant: {}", response.error().as_ref()),
			};

			Error::Authentication { reason }
		},
		RequestTokenError::Request(error) => mapper.map_transport_error(error),
		RequestTokenError::Parse(error, _body) => match status {
			Some(status) if !(200..300).contains(&status) => Error::Authentication {
				reason: format!("token endpoint returned HTTP {status}"),
			},
			_ => error.into(),
		},
		RequestTokenError::Other(message) => Error::Authentication {
			reason: match status {
				Some(status) => format!("token endpoint returned HTTP {status}: {message}"),
				None => format!("token endpoint returned an unexpected response: {message}"),
			},
		},
	}
}
