//! Client-level error types shared across the pipeline, refresher, queue, and stores.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type SharedError = Arc<dyn StdError + Send + Sync>;

/// Canonical client error exposed by public APIs.
///
/// Every variant is cheap to clone so a single refresh failure can settle every queued request.
#[derive(Clone, Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, timeout).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Response body could not be decoded.
	#[error("Response body is malformed.")]
	Decode {
		/// Structured parsing failure pointing at the offending field.
		#[source]
		source: Arc<serde_path_to_error::Error<serde_json::Error>>,
		/// HTTP status code of the response that carried the body.
		status: u16,
	},

	/// Server answered with a non-success status.
	#[error("Server responded with HTTP {status}.")]
	Status {
		/// HTTP status code.
		status: u16,
		/// Correlation identifier echoed by the server, when present.
		trace_id: Option<String>,
		/// Response body, lossily decoded as UTF-8.
		body: String,
	},
	/// A 401 arrived while no session exists that could be refreshed.
	#[error("Authentication required: {reason}.")]
	Unauthenticated {
		/// Human-readable reason surfaced to the user.
		reason: String,
	},
	/// The refresh cycle was abandoned before it could settle the queue.
	#[error("Token refresh was aborted before it finished.")]
	RefreshAborted,
	/// A queued request was discarded without being replayed or rejected.
	#[error("Queued request was dropped before it settled.")]
	Abandoned,
}
impl Error {
	/// Returns the HTTP status associated with the failure, when one exists.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Status { status, .. } | Self::Decode { status, .. } => Some(*status),
			_ => None,
		}
	}

	/// Returns the server-issued trace identifier, when one exists.
	pub fn trace_id(&self) -> Option<&str> {
		match self {
			Self::Status { trace_id, .. } => trace_id.as_deref(),
			_ => None,
		}
	}

	/// Returns `true` for HTTP 401 responses.
	pub fn is_unauthorized(&self) -> bool {
		self.status() == Some(401)
	}

	pub(crate) fn decode(
		source: serde_path_to_error::Error<serde_json::Error>,
		status: u16,
	) -> Self {
		Self::Decode { source: Arc::new(source), status }
	}
}

/// Configuration and request-construction failures raised by the client.
#[derive(Clone, Debug, ThisError)]
pub enum ConfigError {
	/// Client configuration failed validation.
	#[error(transparent)]
	InvalidConfig(#[from] crate::config::ClientConfigError),
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: SharedError,
	},
	/// Request path cannot be joined onto the base URL.
	#[error("Request path `{path}` cannot be joined onto the base URL.")]
	InvalidPath {
		/// Path that failed to join.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Header value contains characters that cannot be sent.
	#[error("Header `{name}` carries an invalid value.")]
	InvalidHeader {
		/// Header name whose value was rejected.
		name: String,
	},
	/// Request body could not be serialized.
	#[error("Request body could not be serialized: {message}.")]
	InvalidBody {
		/// Serializer message.
		message: String,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::HttpClientBuild { source: Arc::new(src) }
	}
}
/// Transport-level failures (network, IO, timeouts).
#[derive(Clone, Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling `{url}`.")]
	Network {
		/// Target URL of the failed call.
		url: String,
		/// Transport-specific network error.
		#[source]
		source: SharedError,
	},
	/// The call exceeded the configured transport timeout.
	#[error("Request to `{url}` timed out.")]
	Timeout {
		/// Target URL of the timed-out call.
		url: String,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(url: impl Into<String>, src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Network { url: url.into(), source: Arc::new(src) }
	}
}
