//! Storage contract and built-in stores for the client's single credential record.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{_prelude::*, auth::Credential};

/// Boxed future returned by [`CredentialStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Durable or ephemeral home for the last issued [`Credential`].
///
/// Implementations are interchangeable: the auth coordinator only ever replaces the
/// record wholesale and reads it back.
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Persists or replaces the stored credential.
	fn save(&self, credential: Credential) -> StoreFuture<'_, ()>;

	/// Returns the stored credential, if one was ever saved.
	fn load(&self) -> StoreFuture<'_, Option<Credential>>;
}

/// Error type produced by [`CredentialStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
