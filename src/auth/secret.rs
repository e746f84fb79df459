//! Redacted bearer credential wrapper.

// self
use crate::{_prelude::*, auth::Claims};

/// Redacted token secret wrapper keeping access and refresh tokens out of logs.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner token value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Formats the secret as an `Authorization`-style bearer credential.
	pub fn bearer(&self) -> String {
		format!("Bearer {}", self.0)
	}

	/// Decodes the JWT payload carried by the secret, if it has one.
	pub fn claims(&self) -> Option<Claims> {
		Claims::decode(&self.0).ok()
	}
}
impl AsRef<str> for TokenSecret {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl From<String> for TokenSecret {
	fn from(value: String) -> Self {
		Self(value)
	}
}
impl From<&str> for TokenSecret {
	fn from(value: &str) -> Self {
		Self(value.to_owned())
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("TokenSecret").field(&"<redacted>").finish()
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Short-lived credential attached to every API call.
pub type AccessToken = TokenSecret;
/// Long-lived credential used only against the refresh endpoints.
pub type RefreshToken = TokenSecret;
