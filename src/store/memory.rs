//! Thread-safe in-memory [`CredentialStore`] for tests and short-lived processes.

// self
use crate::{
	_prelude::*,
	auth::Credential,
	store::{CredentialStore, StoreFuture},
};

type Slot = Arc<RwLock<Option<Credential>>>;

/// Keeps the credential in-process; contents vanish with the process.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(Slot);
impl MemoryStore {
	/// Creates a store pre-seeded with a credential.
	pub fn with_credential(credential: Credential) -> Self {
		Self(Arc::new(RwLock::new(Some(credential))))
	}

	/// Returns the stored credential without going through the async contract.
	pub fn snapshot(&self) -> Option<Credential> {
		self.0.read().clone()
	}
}
impl CredentialStore for MemoryStore {
	fn save(&self, credential: Credential) -> StoreFuture<'_, ()> {
		let slot = self.0.clone();

		Box::pin(async move {
			*slot.write() = Some(credential);

			Ok(())
		})
	}

	fn load(&self) -> StoreFuture<'_, Option<Credential>> {
		let slot = self.0.clone();

		Box::pin(async move { Ok(slot.read().clone()) })
	}
}
