//! Thread-safe in-memory [`CredentialStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	store::{CredentialStore, StoreError, StoredEntry},
};

type StoreMap = Arc<RwLock<HashMap<String, StoredEntry>>>;

/// Thread-safe storage backend that keeps entries in-process and evicts them lazily on read.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreMap);
impl MemoryStore {
	/// Returns the raw entry under `key`, including its expiry, if it is still live.
	pub fn entry(&self, key: &str) -> Option<StoredEntry> {
		let now = OffsetDateTime::now_utc();

		self.0.read().get(key).filter(|entry| entry.is_live_at(now)).cloned()
	}

	/// Number of entries currently held, expired ones included.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when nothing is stored.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}
}
impl CredentialStore for MemoryStore {
	fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
		let now = OffsetDateTime::now_utc();
		let mut guard = self.0.write();

		match guard.get(key) {
			Some(entry) if entry.is_live_at(now) => Ok(Some(entry.value.clone())),
			Some(_) => {
				guard.remove(key);

				Ok(None)
			},
			None => Ok(None),
		}
	}

	fn set(
		&self,
		key: &str,
		value: &str,
		expires_at: Option<OffsetDateTime>,
	) -> Result<(), StoreError> {
		self.0.write().insert(key.to_owned(), StoredEntry::new(value, expires_at));

		Ok(())
	}

	fn remove(&self, key: &str) -> Result<(), StoreError> {
		self.0.write().remove(key);

		Ok(())
	}
}
