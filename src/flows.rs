//! Credential lifecycle: bootstrap, lazy load, and single-flight refresh.

pub mod authorize;
pub mod refresh;

pub use authorize::*;
pub use refresh::*;

// self
use crate::{
	_prelude::*,
	auth::{Credential, CredentialStatus},
	config::ClientConfig,
	http::ApiHttpClient,
	oauth::{TokenFacade, TransportErrorMapper},
	store::CredentialStore,
};
#[cfg(feature = "reqwest")]
use crate::{error::ConfigError, http::ReqwestHttpClient, oauth::ReqwestTransportErrorMapper};

/// Coordinator specialized for the crate's default reqwest transport stack.
#[cfg(feature = "reqwest")]
pub type ReqwestAuthCoordinator = AuthCoordinator<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Externally visible credential lifecycle state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthState {
	/// No usable credential; a code exchange or [`AuthCoordinator::install`] is required.
	Unauthenticated,
	/// A credential is loaded and outside the refresh buffer.
	Valid,
	/// A credential is loaded but must be refreshed before it is sent.
	Expiring,
}

#[derive(Clone, Debug)]
enum CredentialSlot {
	Unloaded,
	Unauthenticated,
	Loaded(Credential),
}

/// Owns the in-process credential and is its only writer.
///
/// The coordinator lazily loads the stored credential on first use, refreshes it once it
/// enters the expiry buffer, and persists every credential it mints. Refreshes are
/// single-flight: concurrent callers that observed the same stale credential share one
/// token endpoint call.
pub struct AuthCoordinator<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Token endpoint facade.
	pub facade: TokenFacade<C, M>,
	/// Durable home of the credential.
	pub store: Arc<dyn CredentialStore>,
	/// Shared counters for refresh outcomes.
	pub refresh_metrics: Arc<RefreshMetrics>,
	client_id: String,
	authorize_endpoint: Url,
	slot: RwLock<CredentialSlot>,
	refresh_guard: AsyncMutex<()>,
}
impl<C, M> AuthCoordinator<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a coordinator that reuses the caller-provided transport + mapper pair.
	pub fn with_http_client(
		config: &ClientConfig,
		store: Arc<dyn CredentialStore>,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		let facade = TokenFacade::new(
			&config.token_endpoint,
			&config.client_id,
			&config.client_secret,
			config.request_timeout,
			http_client,
			mapper,
		);

		Self {
			facade,
			store,
			refresh_metrics: Default::default(),
			client_id: config.client_id.clone(),
			authorize_endpoint: config.authorize_endpoint.clone(),
			slot: RwLock::new(CredentialSlot::Unloaded),
			refresh_guard: AsyncMutex::new(()),
		}
	}

	/// Returns a credential that is safe to send, refreshing it first when expiring.
	pub async fn current_credential(&self) -> Result<Credential> {
		let credential = self.loaded().await?;

		if credential.is_expired() { self.refresh(&credential).await } else { Ok(credential) }
	}

	/// Persists a credential obtained out of band and makes it current.
	///
	/// Nothing changes when the store rejects the credential.
	pub async fn install(&self, credential: Credential) -> Result<()> {
		self.store.save(credential.clone()).await?;
		self.replace(credential);

		Ok(())
	}

	/// Reports the lifecycle state, loading from the store on first use.
	pub async fn state(&self) -> Result<AuthState> {
		match self.loaded().await {
			Ok(credential) => Ok(match credential.status_at(OffsetDateTime::now_utc()) {
				CredentialStatus::Valid => AuthState::Valid,
				CredentialStatus::Expiring => AuthState::Expiring,
			}),
			Err(Error::Authentication { .. }) => Ok(AuthState::Unauthenticated),
			Err(e) => Err(e),
		}
	}

	/// Returns the in-process credential, reading the store once if nothing is loaded yet.
	async fn loaded(&self) -> Result<Credential> {
		let snapshot = self.slot.read().clone();

		match snapshot {
			CredentialSlot::Loaded(credential) => Ok(credential),
			CredentialSlot::Unauthenticated => Err(Error::no_credential()),
			CredentialSlot::Unloaded => {
				let stored = self.store.load().await?;
				let mut slot = self.slot.write();

				// Another caller may have installed or refreshed while the store was read.
				if let CredentialSlot::Loaded(current) = &*slot {
					return Ok(current.clone());
				}

				match stored {
					Some(credential) => {
						*slot = CredentialSlot::Loaded(credential.clone());

						Ok(credential)
					},
					None => {
						*slot = CredentialSlot::Unauthenticated;

						Err(Error::no_credential())
					},
				}
			},
		}
	}

	fn mark_unauthenticated(&self) {
		*self.slot.write() = CredentialSlot::Unauthenticated;
	}

	fn replace(&self, credential: Credential) {
		*self.slot.write() = CredentialSlot::Loaded(credential);
	}
}
#[cfg(feature = "reqwest")]
impl AuthCoordinator<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a coordinator with its own redirect-free reqwest transport.
	pub fn new(config: &ClientConfig, store: Arc<dyn CredentialStore>) -> Result<Self, ConfigError> {
		Ok(Self::with_http_client(
			config,
			store,
			ReqwestHttpClient::new()?,
			ReqwestTransportErrorMapper,
		))
	}
}
impl<C, M> Debug for AuthCoordinator<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let state = match &*self.slot.read() {
			CredentialSlot::Unloaded => "unloaded",
			CredentialSlot::Unauthenticated => "unauthenticated",
			CredentialSlot::Loaded(_) => "loaded",
		};

		f.debug_struct("AuthCoordinator")
			.field("client_id", &self.client_id)
			.field("facade", &self.facade)
			.field("slot", &state)
			.finish()
	}
}
