//! Client configuration: base URL, refresh endpoints, storage keys, and side-effect settings.
//!
//! [`ClientConfig`] is serde-friendly so deployments can load it from JSON; every field except
//! the base URL falls back to the defaults below. Configurations assembled through
//! [`ClientConfigBuilder`] are validated on [`build`](ClientConfigBuilder::build); deserialized
//! ones should be checked with [`ClientConfig::validate`].

// crates.io
use ::http::HeaderName;
// self
use crate::{_prelude::*, error::ConfigError};

/// Errors raised while validating a [`ClientConfig`].
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ClientConfigError {
	/// Base URL must use HTTP(S) and be able to carry paths.
	#[error("The base URL must be an http(s) URL that can carry paths: {url}.")]
	UnsupportedBaseUrl {
		/// Offending URL.
		url: String,
	},
	/// Endpoint paths must be rooted.
	#[error("The {endpoint} path must start with `/`: {path}.")]
	RelativeEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Path that failed validation.
		path: String,
	},
	/// Transport timeout must be positive.
	#[error("The request timeout must be positive.")]
	NonPositiveTimeout,
	/// Redirect grace delay cannot be negative.
	#[error("The redirect grace delay cannot be negative.")]
	NegativeRedirectGrace,
	/// The identity claim name is empty.
	#[error("The identity claim name cannot be empty.")]
	EmptyIdentityClaim,
	/// Storage keys must be non-empty and distinct.
	#[error("Access and refresh token keys must be non-empty and distinct.")]
	InvalidTokenKeys,
	/// Trace header must be a valid HTTP header name.
	#[error("The trace header `{header}` is not a valid HTTP header name.")]
	InvalidTraceHeader {
		/// Offending header name.
		header: String,
	},
}

/// Paths of the two refresh endpoints, relative to the base URL.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshEndpoints {
	/// Rotates the pair of an authenticated session.
	#[serde(default = "RefreshEndpoints::default_refresh")]
	pub refresh: String,
	/// Mints a pair for an anonymous session.
	#[serde(default = "RefreshEndpoints::default_initialize")]
	pub initialize: String,
}
impl RefreshEndpoints {
	fn default_refresh() -> String {
		"/authorization/refreshUserToken".into()
	}

	fn default_initialize() -> String {
		"/authorization/initializeToken".into()
	}
}
impl Default for RefreshEndpoints {
	fn default() -> Self {
		Self { refresh: Self::default_refresh(), initialize: Self::default_initialize() }
	}
}

/// Keys under which the token pair is persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenKeys {
	/// Key for the access token.
	#[serde(default = "TokenKeys::default_access")]
	pub access: String,
	/// Key for the refresh token.
	#[serde(default = "TokenKeys::default_refresh")]
	pub refresh: String,
}
impl TokenKeys {
	fn default_access() -> String {
		"access_token".into()
	}

	fn default_refresh() -> String {
		"refresh_token".into()
	}
}
impl Default for TokenKeys {
	fn default() -> Self {
		Self { access: Self::default_access(), refresh: Self::default_refresh() }
	}
}

/// Immutable client configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
	/// Root every relative request path is appended to.
	pub base_url: Url,
	/// Refresh endpoint paths.
	#[serde(default)]
	pub endpoints: RefreshEndpoints,
	/// Upper bound for a single transport call, the refresh call included.
	#[serde(default = "ClientConfig::default_timeout")]
	pub timeout: Duration,
	/// Delay between surfacing a failure notice and redirecting to the login route.
	#[serde(default = "ClientConfig::default_redirect_grace")]
	pub redirect_grace: Duration,
	/// Access-token claim whose presence marks an authenticated session.
	#[serde(default = "ClientConfig::default_identity_claim")]
	pub identity_claim: String,
	/// Storage keys for the token pair.
	#[serde(default)]
	pub token_keys: TokenKeys,
	/// Response header carrying the server's trace identifier.
	#[serde(default = "ClientConfig::default_trace_header")]
	pub trace_header: String,
	/// Route the user is sent to when the session cannot be recovered.
	#[serde(default = "ClientConfig::default_login_route")]
	pub login_route: String,
}
impl ClientConfig {
	/// Default transport timeout (24 hours).
	pub const DEFAULT_TIMEOUT: Duration = Duration::hours(24);
	/// Default grace delay before redirecting to the login route.
	pub const DEFAULT_REDIRECT_GRACE: Duration = Duration::seconds(1);

	/// Creates a builder rooted at `base_url`.
	pub fn builder(base_url: Url) -> ClientConfigBuilder {
		ClientConfigBuilder::new(base_url)
	}

	/// Checks invariants for configurations that did not come from the builder.
	pub fn validate(&self) -> Result<(), ClientConfigError> {
		if !matches!(self.base_url.scheme(), "http" | "https") || self.base_url.cannot_be_a_base()
		{
			return Err(ClientConfigError::UnsupportedBaseUrl { url: self.base_url.to_string() });
		}

		for (endpoint, path) in
			[("refresh", &self.endpoints.refresh), ("initialize", &self.endpoints.initialize)]
		{
			if !path.starts_with('/') {
				return Err(ClientConfigError::RelativeEndpoint { endpoint, path: path.clone() });
			}
		}

		if !self.login_route.starts_with('/') {
			return Err(ClientConfigError::RelativeEndpoint {
				endpoint: "login",
				path: self.login_route.clone(),
			});
		}
		if !self.timeout.is_positive() {
			return Err(ClientConfigError::NonPositiveTimeout);
		}
		if self.redirect_grace.is_negative() {
			return Err(ClientConfigError::NegativeRedirectGrace);
		}
		if self.identity_claim.trim().is_empty() {
			return Err(ClientConfigError::EmptyIdentityClaim);
		}

		let keys = &self.token_keys;

		if keys.access.is_empty() || keys.refresh.is_empty() || keys.access == keys.refresh {
			return Err(ClientConfigError::InvalidTokenKeys);
		}
		if HeaderName::from_bytes(self.trace_header.as_bytes()).is_err() {
			return Err(ClientConfigError::InvalidTraceHeader { header: self.trace_header.clone() });
		}

		Ok(())
	}

	/// Resolves a request path against the base URL.
	///
	/// Absolute `http(s)` URLs pass through untouched. Relative paths are appended to the base
	/// path instead of replacing it, so `/users` under `https://host/api` becomes
	/// `https://host/api/users`.
	pub fn resolve(&self, path: &str) -> Result<Url, ConfigError> {
		let invalid = |source| ConfigError::InvalidPath { path: path.to_owned(), source };

		if path.starts_with("http://") || path.starts_with("https://") {
			return Url::parse(path).map_err(invalid);
		}

		let base = self.base_url.as_str().trim_end_matches('/');
		let joined = format!("{base}/{}", path.trim_start_matches('/'));

		Url::parse(&joined).map_err(invalid)
	}

	fn default_timeout() -> Duration {
		Self::DEFAULT_TIMEOUT
	}

	fn default_redirect_grace() -> Duration {
		Self::DEFAULT_REDIRECT_GRACE
	}

	fn default_identity_claim() -> String {
		"ip".into()
	}

	fn default_trace_header() -> String {
		"x-encore-trace-id".into()
	}

	fn default_login_route() -> String {
		"/login".into()
	}
}

/// Builder for [`ClientConfig`] values.
#[derive(Debug)]
pub struct ClientConfigBuilder {
	config: ClientConfig,
}
impl ClientConfigBuilder {
	/// Creates a builder seeded with defaults.
	pub fn new(base_url: Url) -> Self {
		Self {
			config: ClientConfig {
				base_url,
				endpoints: RefreshEndpoints::default(),
				timeout: ClientConfig::DEFAULT_TIMEOUT,
				redirect_grace: ClientConfig::DEFAULT_REDIRECT_GRACE,
				identity_claim: ClientConfig::default_identity_claim(),
				token_keys: TokenKeys::default(),
				trace_header: ClientConfig::default_trace_header(),
				login_route: ClientConfig::default_login_route(),
			},
		}
	}

	/// Overrides the refresh-existing-session path.
	pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
		self.config.endpoints.refresh = path.into();

		self
	}

	/// Overrides the initialize-anonymous-session path.
	pub fn initialize_path(mut self, path: impl Into<String>) -> Self {
		self.config.endpoints.initialize = path.into();

		self
	}

	/// Overrides the transport timeout.
	pub fn timeout(mut self, timeout: Duration) -> Self {
		self.config.timeout = timeout;

		self
	}

	/// Overrides the grace delay before redirecting to the login route.
	pub fn redirect_grace(mut self, grace: Duration) -> Self {
		self.config.redirect_grace = grace;

		self
	}

	/// Overrides the identity claim name.
	pub fn identity_claim(mut self, claim: impl Into<String>) -> Self {
		self.config.identity_claim = claim.into();

		self
	}

	/// Overrides the storage keys.
	pub fn token_keys(mut self, access: impl Into<String>, refresh: impl Into<String>) -> Self {
		self.config.token_keys = TokenKeys { access: access.into(), refresh: refresh.into() };

		self
	}

	/// Overrides the trace header name.
	pub fn trace_header(mut self, header: impl Into<String>) -> Self {
		self.config.trace_header = header.into().to_ascii_lowercase();

		self
	}

	/// Overrides the login route.
	pub fn login_route(mut self, route: impl Into<String>) -> Self {
		self.config.login_route = route.into();

		self
	}

	/// Validates and returns the configuration.
	pub fn build(self) -> Result<ClientConfig, ClientConfigError> {
		self.config.validate()?;

		Ok(self.config)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn base() -> Url {
		Url::parse("https://example.com/api").expect("Fixture base URL should parse.")
	}

	#[test]
	fn builder_applies_defaults() {
		let config = ClientConfig::builder(base()).build().expect("Defaults should validate.");

		assert_eq!(config.endpoints.refresh, "/authorization/refreshUserToken");
		assert_eq!(config.endpoints.initialize, "/authorization/initializeToken");
		assert_eq!(config.timeout, Duration::hours(24));
		assert_eq!(config.redirect_grace, Duration::seconds(1));
		assert_eq!(config.identity_claim, "ip");
		assert_eq!(config.token_keys, TokenKeys::default());
		assert_eq!(config.login_route, "/login");
	}

	#[test]
	fn builder_rejects_invalid_settings() {
		let err = ClientConfig::builder(base())
			.refresh_path("authorization/refresh")
			.build()
			.expect_err("Relative refresh paths should be rejected.");

		assert!(matches!(err, ClientConfigError::RelativeEndpoint { endpoint: "refresh", .. }));

		let err = ClientConfig::builder(base())
			.token_keys("token", "token")
			.build()
			.expect_err("Colliding storage keys should be rejected.");

		assert_eq!(err, ClientConfigError::InvalidTokenKeys);

		let err = ClientConfig::builder(base())
			.timeout(Duration::ZERO)
			.build()
			.expect_err("Zero timeouts should be rejected.");

		assert_eq!(err, ClientConfigError::NonPositiveTimeout);

		let err = ClientConfig::builder(
			Url::parse("mailto:ops@example.com").expect("Fixture URL should parse."),
		)
		.build()
		.expect_err("Non-HTTP base URLs should be rejected.");

		assert!(matches!(err, ClientConfigError::UnsupportedBaseUrl { .. }));
	}

	#[test]
	fn resolve_appends_to_base_path() {
		let config = ClientConfig::builder(base()).build().expect("Defaults should validate.");

		assert_eq!(
			config.resolve("/users/list?page=2").expect("Relative path should resolve.").as_str(),
			"https://example.com/api/users/list?page=2",
		);
		assert_eq!(
			config.resolve("users").expect("Unrooted path should resolve.").as_str(),
			"https://example.com/api/users",
		);
		assert_eq!(
			config.resolve("https://other.test/x").expect("Absolute URL should pass.").as_str(),
			"https://other.test/x",
		);
	}

	#[test]
	fn deserializes_with_defaults() {
		let config: ClientConfig =
			serde_json::from_str(r#"{"base_url":"https://example.com/api","login_route":"/signin"}"#)
				.expect("Minimal JSON config should deserialize.");

		config.validate().expect("Deserialized defaults should validate.");

		assert_eq!(config.login_route, "/signin");
		assert_eq!(config.endpoints, RefreshEndpoints::default());
		assert_eq!(config.timeout, ClientConfig::DEFAULT_TIMEOUT);
	}
}
