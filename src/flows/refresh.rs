//! Refresh token rotation with a single-flight guard.
//!
//! [`AuthCoordinator::refresh`] is called either because the loaded credential entered the
//! expiry buffer or because a resource request came back 401. Callers pass the credential
//! they observed; once the guard is held, a credential that has already been replaced by a
//! fresher one is returned as-is so a burst of 401s costs one token endpoint call.
//!
//! A refresh the server rejects moves the coordinator to the unauthenticated state. A
//! transport failure leaves the current credential in place for the next attempt.
//!
//! A rotated credential becomes current before it is persisted, since the token endpoint
//! may already have invalidated the previous refresh token. If the save fails the caller
//! sees [`Error::Config`] while later calls keep using the in-memory credential.

mod metrics;

pub use metrics::RefreshMetrics;

// self
use crate::{
	_prelude::*,
	auth::Credential,
	flows::{AuthCoordinator, CredentialSlot},
	http::ApiHttpClient,
	oauth::TransportErrorMapper,
	obs::{self, CallKind, CallOutcome, CallSpan},
};

impl<C, M> AuthCoordinator<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Replaces `observed` with a freshly minted credential and persists it.
	///
	/// Fails with [`Error::Authentication`] when no credential is available or the token
	/// endpoint rejects the refresh token, [`Error::Network`] on transport failure, and
	/// [`Error::Decoding`] when a 2xx body is malformed. The call itself is never retried.
	pub async fn refresh(&self, observed: &Credential) -> Result<Credential> {
		const KIND: CallKind = CallKind::Refresh;

		let span = CallSpan::new(KIND, "refresh");

		obs::record_call_outcome(KIND, CallOutcome::Attempt);

		let result = span
			.instrument(async move {
				let _singleflight = self.refresh_guard.lock().await;
				let snapshot = self.slot.read().clone();
				let current = match snapshot {
					CredentialSlot::Loaded(current) => current,
					CredentialSlot::Unauthenticated => return Err(Error::no_credential()),
					CredentialSlot::Unloaded => self.loaded().await?,
				};

				if current.access_token != observed.access_token && !current.is_expired() {
					self.refresh_metrics.record_reuse();

					return Ok(current);
				}

				self.refresh_metrics.record_attempt();

				let fresh = match self.facade.refresh(&current.refresh_token).await {
					Ok(fresh) => fresh,
					Err(e) => {
						self.refresh_metrics.record_failure();

						if matches!(e, Error::Authentication { .. }) {
							self.mark_unauthenticated();
						}

						return Err(e);
					},
				};

				self.replace(fresh.clone());
				self.store.save(fresh.clone()).await.inspect_err(|_| {
					self.refresh_metrics.record_failure();
				})?;
				self.refresh_metrics.record_success();

				Ok(fresh)
			})
			.await;

		match &result {
			Ok(_) => obs::record_call_outcome(KIND, CallOutcome::Success),
			Err(e) => {
				obs::record_call_outcome(KIND, CallOutcome::Failure);
				obs::record_failure(KIND, e);
			},
		}

		result
	}
}
