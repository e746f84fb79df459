//! Unverified JWT payload decoding.
//!
//! The client never validates signatures; the server remains the authority on whether a token
//! is acceptable. Claims are only consulted for local decisions: whether a session exists and
//! how long the refresh token should be persisted.

// crates.io
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde_json::{Map, Value};
// self
use crate::_prelude::*;

/// Errors raised while decoding a JWT payload.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ClaimsError {
	/// Token does not contain a payload segment.
	#[error("Token is not a JWT: missing payload segment.")]
	MissingPayload,
	/// Payload segment is not valid base64url.
	#[error("Token payload is not valid base64url.")]
	Encoding(#[from] base64::DecodeError),
	/// Payload segment is not a JSON object.
	#[error("Token payload is not a JSON object: {message}.")]
	Json {
		/// Parser message.
		message: String,
	},
}

/// Decoded JWT payload.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Claims {
	/// Expiry as a Unix timestamp in seconds.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub exp: Option<i64>,
	/// Issue time as a Unix timestamp in seconds.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub iat: Option<i64>,
	/// Every other claim, keyed by name.
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}
impl Claims {
	/// Decodes the payload segment of `token` without verifying its signature.
	pub fn decode(token: &str) -> Result<Self, ClaimsError> {
		let payload = token
			.split('.')
			.nth(1)
			.filter(|segment| !segment.is_empty())
			.ok_or(ClaimsError::MissingPayload)?;
		let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('='))?;

		serde_json::from_slice(&bytes).map_err(|e| ClaimsError::Json { message: e.to_string() })
	}

	/// Returns the claim stored under `name`.
	pub fn get(&self, name: &str) -> Option<Value> {
		match name {
			"exp" => self.exp.map(Value::from),
			"iat" => self.iat.map(Value::from),
			_ => self.extra.get(name).cloned(),
		}
	}

	/// Returns `true` when the claim exists and carries a meaningful value.
	///
	/// Only `null`, `false`, `0`, and the empty string count as absent. Arrays and objects are
	/// present even when empty.
	pub fn has_marker(&self, name: &str) -> bool {
		match self.get(name) {
			None | Some(Value::Null) => false,
			Some(Value::Bool(flag)) => flag,
			Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
			Some(Value::String(s)) => !s.is_empty(),
			Some(Value::Array(_) | Value::Object(_)) => true,
		}
	}

	/// Expiry instant, if the token declares one.
	pub fn expires_at(&self) -> Option<OffsetDateTime> {
		self.exp.and_then(|exp| OffsetDateTime::from_unix_timestamp(exp).ok())
	}

	/// Returns `true` once `now + buffer` passes the expiry. Tokens without `exp` never expire.
	pub fn is_expired_at(&self, now: OffsetDateTime, buffer: Duration) -> bool {
		let buffer = if buffer.is_negative() { Duration::ZERO } else { buffer };

		self.expires_at().is_some_and(|expires_at| expires_at < now + buffer)
	}

	/// Remaining lifetime clamped at zero; `None` when the token never expires.
	pub fn remaining_at(&self, now: OffsetDateTime) -> Option<Duration> {
		self.expires_at().map(|expires_at| (expires_at - now).max(Duration::ZERO))
	}
}
