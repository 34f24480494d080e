//! Authorization code bootstrap: build the consent URL, then exchange the returned code.

// crates.io
use rand::{Rng, distr::Alphanumeric};
// self
use crate::{
	_prelude::*,
	auth::Credential,
	flows::AuthCoordinator,
	http::ApiHttpClient,
	oauth::TransportErrorMapper,
	obs::{self, CallKind, CallOutcome, CallSpan},
};

const STATE_LEN: usize = 32;

/// Consent URL plus the CSRF state the redirect handler must verify.
#[derive(Clone, Debug)]
pub struct AuthorizationRequest {
	/// URL the user should be sent to.
	pub url: Url,
	/// Opaque value that must come back unchanged on the redirect.
	pub state: String,
	/// Redirect URI embedded in `url`; pass it again to the code exchange.
	pub redirect_uri: Url,
}
impl AuthorizationRequest {
	/// Validates the returned `state` parameter after the authorization redirect.
	pub fn validate_state(&self, returned_state: &str) -> Result<()> {
		if returned_state == self.state {
			Ok(())
		} else {
			Err(Error::Authentication { reason: "authorization state mismatch".into() })
		}
	}
}

impl<C, M> AuthCoordinator<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Builds the consent URL for the requested scopes.
	///
	/// Scopes are joined with commas, which is what the authorize endpoint expects.
	pub fn authorize_url(&self, redirect_uri: &Url, scopes: &[&str]) -> AuthorizationRequest {
		let state = random_string(STATE_LEN);
		let mut url = self.authorize_endpoint.clone();

		{
			let mut pairs = url.query_pairs_mut();

			pairs.append_pair("client_id", &self.client_id);
			pairs.append_pair("redirect_uri", redirect_uri.as_str());
			pairs.append_pair("response_type", "code");
			pairs.append_pair("approval_prompt", "auto");

			if !scopes.is_empty() {
				pairs.append_pair("scope", &scopes.join(","));
			}

			pairs.append_pair("state", &state);
		}

		AuthorizationRequest { url, state, redirect_uri: redirect_uri.clone() }
	}

	/// Exchanges a one-time authorization code, persists the credential, and makes it current.
	pub async fn exchange_code(&self, code: &str, redirect_uri: &Url) -> Result<Credential> {
		const KIND: CallKind = CallKind::Exchange;

		let span = CallSpan::new(KIND, "exchange_code");

		obs::record_call_outcome(KIND, CallOutcome::Attempt);

		let result = span
			.instrument(async move {
				let _singleflight = self.refresh_guard.lock().await;
				let credential = self.facade.exchange_code(code, redirect_uri).await?;

				self.install(credential.clone()).await?;

				Ok(credential)
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

fn random_string(len: usize) -> String {
	rand::rng().sample_iter(Alphanumeric).take(len).map(char::from).collect()
}
