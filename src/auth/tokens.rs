//! Token pair persistence on top of a [`CredentialStore`].

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	config::{ClientConfig, TokenKeys},
	obs::obs_warn,
	store::{CredentialStore, StoreError},
};

/// Owns the access/refresh pair and answers whether a real session exists.
///
/// Reads never fail: a missing key, an empty value, and a backend error all read as "no token".
/// The access token is persisted without expiry because the server enforces it; the refresh
/// token is persisted with the expiry declared by its own `exp` claim so the backend evicts it.
#[derive(Clone)]
pub struct TokenStore {
	backend: Arc<dyn CredentialStore>,
	keys: TokenKeys,
	identity_claim: String,
}
impl TokenStore {
	/// Creates a token store over `backend`.
	pub fn new(
		backend: Arc<dyn CredentialStore>,
		keys: TokenKeys,
		identity_claim: impl Into<String>,
	) -> Self {
		Self { backend, keys, identity_claim: identity_claim.into() }
	}

	/// Creates a token store using the keys and identity claim from `config`.
	pub fn from_config(backend: Arc<dyn CredentialStore>, config: &ClientConfig) -> Self {
		Self::new(backend, config.token_keys.clone(), config.identity_claim.clone())
	}

	/// Underlying storage backend.
	pub fn backend(&self) -> &Arc<dyn CredentialStore> {
		&self.backend
	}

	/// Current access token.
	pub fn access_token(&self) -> Option<TokenSecret> {
		self.read(&self.keys.access)
	}

	/// Current refresh token.
	pub fn refresh_token(&self) -> Option<TokenSecret> {
		self.read(&self.keys.refresh)
	}

	/// Returns `true` when the access token carries the identity claim.
	///
	/// Expiry is deliberately ignored; an expired token still identifies a session that the
	/// refresh endpoint can rotate.
	pub fn is_authenticated(&self) -> bool {
		self.access_token()
			.and_then(|token| token.claims())
			.is_some_and(|claims| claims.has_marker(&self.identity_claim))
	}

	/// Persists the access token without expiry.
	pub fn set_access_token(&self, token: &TokenSecret) -> Result<(), StoreError> {
		self.backend.set(&self.keys.access, token.expose(), None)
	}

	/// Persists the refresh token until the instant named by its `exp` claim.
	pub fn set_refresh_token(&self, token: &TokenSecret) -> Result<(), StoreError> {
		let expires_at = token.claims().and_then(|claims| claims.expires_at());

		self.backend.set(&self.keys.refresh, token.expose(), expires_at)
	}

	/// Replaces the access token and, when provided, the refresh token.
	pub fn update_tokens(
		&self,
		access: &TokenSecret,
		refresh: Option<&TokenSecret>,
	) -> Result<(), StoreError> {
		self.set_access_token(access)?;

		if let Some(refresh) = refresh {
			self.set_refresh_token(refresh)?;
		}

		Ok(())
	}

	/// Removes both tokens. Clearing an empty store succeeds.
	///
	/// Both removals are attempted even if the first one fails; the first failure is returned.
	pub fn clear_tokens(&self) -> Result<(), StoreError> {
		let access = self.backend.remove(&self.keys.access);
		let refresh = self.backend.remove(&self.keys.refresh);

		access.and(refresh)
	}

	/// Clears both tokens, logging instead of returning a backend failure.
	pub(crate) fn discard(&self) {
		if let Err(e) = self.clear_tokens() {
			obs_warn!(error = %e, "Failed to clear stored tokens.");
		}
	}

	fn read(&self, key: &str) -> Option<TokenSecret> {
		match self.backend.get(key) {
			Ok(value) => value.filter(|value| !value.is_empty()).map(TokenSecret::from),
			Err(e) => {
				obs_warn!(key, error = %e, "Token read failed; treating it as absent.");

				None
			},
		}
	}
}
impl Debug for TokenStore {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenStore")
			.field("keys", &self.keys)
			.field("identity_claim", &self.identity_claim)
			.finish()
	}
}
