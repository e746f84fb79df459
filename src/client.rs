//! Authenticated client facade tying the token store, refresher, queue, and transport together.
//!
//! [`AuthClient`] is cheap to clone; every clone shares the same transport, token store,
//! refresher state, and queue, so concurrent callers on different clones still observe a single
//! refresh cycle. The request pipeline lives in [`interceptor`] and the refresh cycle in
//! [`refresh`]; both are `impl` blocks on [`AuthClient`].

pub mod interceptor;
pub mod refresh;

mod metrics;

pub use interceptor::*;
pub use metrics::RefreshMetrics;
pub use refresh::*;

// self
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;
use crate::{
	_prelude::*,
	auth::TokenStore,
	config::ClientConfig,
	error::ConfigError,
	http::HttpTransport,
	queue::QueuedRequestInfo,
	session::{SessionHooks, TracingHooks},
	store::CredentialStore,
};

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport.
pub type ReqwestAuthClient = AuthClient<ReqwestTransport>;

/// Bearer-token HTTP client with transparent, single-flight token refresh.
///
/// Callers hand [`ApiRequest`](crate::http::ApiRequest)s to [`AuthClient::execute`] and get back
/// either the server's success response or an ordinary error; 401 recovery, queueing, and replay
/// happen inside the pipeline.
pub struct AuthClient<T>
where
	T: HttpTransport,
{
	config: Arc<ClientConfig>,
	transport: Arc<T>,
	tokens: TokenStore,
	refresher: Arc<TokenRefresher>,
	hooks: Arc<dyn SessionHooks>,
	refresh_metrics: Arc<RefreshMetrics>,
}
impl<T> AuthClient<T>
where
	T: HttpTransport,
{
	/// Creates a client over a caller-provided transport.
	///
	/// The configuration is validated first. Session side effects go to [`TracingHooks`] until
	/// [`AuthClient::with_hooks`] installs application hooks.
	pub fn with_transport(
		config: ClientConfig,
		store: Arc<dyn CredentialStore>,
		transport: impl Into<Arc<T>>,
	) -> Result<Self> {
		config.validate().map_err(ConfigError::from)?;

		let tokens = TokenStore::from_config(store, &config);

		Ok(Self {
			config: Arc::new(config),
			transport: transport.into(),
			tokens,
			refresher: Default::default(),
			hooks: Arc::new(TracingHooks),
			refresh_metrics: Default::default(),
		})
	}

	/// Replaces the hooks that surface notices and perform login redirects.
	pub fn with_hooks(mut self, hooks: Arc<dyn SessionHooks>) -> Self {
		self.hooks = hooks;

		self
	}

	/// Active configuration.
	pub fn config(&self) -> &ClientConfig {
		&self.config
	}

	/// Token store backing this client.
	pub fn tokens(&self) -> &TokenStore {
		&self.tokens
	}

	/// Shared transport.
	pub fn transport(&self) -> &Arc<T> {
		&self.transport
	}

	/// Refresh cycle counters.
	pub fn refresh_metrics(&self) -> &RefreshMetrics {
		&self.refresh_metrics
	}

	/// Returns `true` while a refresh cycle is active.
	pub fn is_refreshing(&self) -> bool {
		self.refresher.is_refreshing()
	}

	/// Lists requests currently waiting on the refresh cycle, in replay order.
	pub fn queued_requests(&self) -> Vec<QueuedRequestInfo> {
		self.refresher.queued()
	}
}
#[cfg(feature = "reqwest")]
impl AuthClient<ReqwestTransport> {
	/// Creates a client with a reqwest transport bounded by the configured timeout.
	pub fn new(config: ClientConfig, store: Arc<dyn CredentialStore>) -> Result<Self> {
		let transport = ReqwestTransport::with_timeout(config.timeout)?;

		Self::with_transport(config, store, transport)
	}
}
impl<T> Clone for AuthClient<T>
where
	T: HttpTransport,
{
	fn clone(&self) -> Self {
		Self {
			config: self.config.clone(),
			transport: self.transport.clone(),
			tokens: self.tokens.clone(),
			refresher: self.refresher.clone(),
			hooks: self.hooks.clone(),
			refresh_metrics: self.refresh_metrics.clone(),
		}
	}
}
impl<T> Debug for AuthClient<T>
where
	T: HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthClient")
			.field("base_url", &self.config.base_url.as_str())
			.field("tokens", &self.tokens)
			.field("refresher", &self.refresher)
			.finish()
	}
}
