//! Credential storage contract and built-in key/value backends with expiry.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::_prelude::*;

/// Key/value backend that persists raw token strings.
///
/// Entries written with an expiry must stop being returned once that instant passes, the same way
/// a browser evicts an expired cookie. Implementations must be cheap to call from synchronous
/// code; the client never holds its own locks while calling into a store.
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Fetches the live value stored under `key`.
	fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

	/// Persists or replaces the value under `key`, optionally evicting it at `expires_at`.
	fn set(
		&self,
		key: &str,
		value: &str,
		expires_at: Option<OffsetDateTime>,
	) -> Result<(), StoreError>;

	/// Removes the value under `key`. Removing a missing key succeeds.
	fn remove(&self, key: &str) -> Result<(), StoreError>;
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

/// Value persisted by the built-in backends.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEntry {
	/// Raw stored value.
	pub value: String,
	/// Eviction instant, if any.
	#[serde(default, with = "time::serde::timestamp::option")]
	pub expires_at: Option<OffsetDateTime>,
}
impl StoredEntry {
	/// Creates an entry.
	pub fn new(value: impl Into<String>, expires_at: Option<OffsetDateTime>) -> Self {
		Self { value: value.into(), expires_at }
	}

	/// Returns `true` while the entry has not reached its eviction instant.
	pub fn is_live_at(&self, now: OffsetDateTime) -> bool {
		self.expires_at.is_none_or(|expires_at| expires_at > now)
	}
}
