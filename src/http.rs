//! Request/response model and the transport seam.
//!
//! Callers describe work with [`ApiRequest`]; the pipeline resolves it against the configured
//! base URL, attaches credentials, and hands a [`TransportRequest`] to an [`HttpTransport`]. The
//! transport only reports what the server said: any status, 401 included, is a successful
//! transport call. Classifying statuses is the pipeline's job.

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
// crates.io
use ::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, header::CONTENT_TYPE};
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	error::{ConfigError, TransportError},
};

/// Content type attached to every request that does not set its own.
pub const JSON_CONTENT_TYPE: &str = "application/json;charset=UTF-8";

/// Caller-facing description of an API call.
///
/// The description is kept verbatim while the request waits in the queue, so a replay re-runs
/// the whole pipeline (fresh bearer header included) rather than resending stale bytes.
#[derive(Clone, Debug)]
pub struct ApiRequest {
	/// HTTP method.
	pub method: Method,
	/// Path relative to the base URL, or an absolute `http(s)` URL.
	pub path: String,
	/// Caller-supplied headers.
	pub headers: HeaderMap,
	/// Raw request body.
	pub body: Option<Vec<u8>>,
	/// Marks a replay issued by the queue; such requests are never retried again.
	pub is_retry: bool,
}
impl ApiRequest {
	/// Creates a request for `method` + `path`.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self { method, path: path.into(), headers: HeaderMap::new(), body: None, is_retry: false }
	}

	/// Shorthand for a `GET` request.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::GET, path)
	}

	/// Shorthand for a `POST` request.
	pub fn post(path: impl Into<String>) -> Self {
		Self::new(Method::POST, path)
	}

	/// Shorthand for a `PUT` request.
	pub fn put(path: impl Into<String>) -> Self {
		Self::new(Method::PUT, path)
	}

	/// Shorthand for a `DELETE` request.
	pub fn delete(path: impl Into<String>) -> Self {
		Self::new(Method::DELETE, path)
	}

	/// Adds or replaces a header.
	pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
		self.headers.insert(name, value);

		self
	}

	/// Sets a raw body.
	pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
		self.body = Some(body.into());

		self
	}

	/// Serializes `payload` as the JSON body.
	pub fn json<T>(mut self, payload: &T) -> Result<Self>
	where
		T: ?Sized + Serialize,
	{
		let body = serde_json::to_vec(payload)
			.map_err(|e| ConfigError::InvalidBody { message: e.to_string() })?;

		self.body = Some(body);

		Ok(self)
	}

	pub(crate) fn into_retry(mut self) -> Self {
		self.is_retry = true;

		self
	}
}

/// Fully resolved request handed to an [`HttpTransport`].
#[derive(Clone, Debug)]
pub struct TransportRequest {
	/// HTTP method.
	pub method: Method,
	/// Absolute target URL.
	pub url: Url,
	/// Final header set, credentials included.
	pub headers: HeaderMap,
	/// Raw request body.
	pub body: Option<Vec<u8>>,
}
impl TransportRequest {
	/// Creates a body-less request.
	pub fn new(method: Method, url: Url) -> Self {
		Self { method, url, headers: HeaderMap::new(), body: None }
	}

	/// Inserts a header from a string value.
	pub fn insert_header(&mut self, name: HeaderName, value: &str) -> Result<(), ConfigError> {
		let value = HeaderValue::from_str(value)
			.map_err(|_| ConfigError::InvalidHeader { name: name.to_string() })?;

		self.headers.insert(name, value);

		Ok(())
	}

	/// Sets the JSON content type unless the caller chose one.
	pub(crate) fn ensure_content_type(&mut self) {
		self.headers
			.entry(CONTENT_TYPE)
			.or_insert_with(|| HeaderValue::from_static(JSON_CONTENT_TYPE));
	}
}

/// Response returned by an [`HttpTransport`] or surfaced to callers.
#[derive(Clone, Debug)]
pub struct ApiResponse {
	/// HTTP status.
	pub status: StatusCode,
	/// Response headers.
	pub headers: HeaderMap,
	/// Raw response body.
	pub body: Vec<u8>,
}
impl ApiResponse {
	/// Creates a response without headers.
	pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
		Self { status, headers: HeaderMap::new(), body: body.into() }
	}

	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		self.status.is_success()
	}

	/// Returns a header value when it is valid UTF-8.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.get(name).and_then(|value| value.to_str().ok())
	}

	/// Body decoded as UTF-8, replacing invalid sequences.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}

	/// Deserializes the JSON body, reporting the path of the first offending field.
	pub fn json<T>(&self) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let mut deserializer = serde_json::Deserializer::from_slice(&self.body);

		serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|e| Error::decode(e, self.status.as_u16()))
	}
}

/// Boxed future returned by [`HttpTransport::send`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<ApiResponse, TransportError>> + 'a + Send>>;

/// Abstraction over the HTTP stack shared by API calls and refresh calls.
///
/// Implementations must be `Send + Sync + 'static` so one transport can back every clone of a
/// client. A completed exchange is always `Ok`, whatever its status; `Err` is reserved for
/// failures where no response exists (DNS, TCP, TLS, timeouts).
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Executes `request` and collects the whole response body.
	fn send(&self, request: TransportRequest) -> TransportFuture<'_>;
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a client whose every call is bounded by `timeout`.
	pub fn with_timeout(timeout: Duration) -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder()
			.timeout(timeout.unsigned_abs())
			.build()
			.map_err(ConfigError::http_client_build)?;

		Ok(Self(client))
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestTransport {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestTransport {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestTransport {
	fn send(&self, request: TransportRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			let url = request.url.to_string();
			let mut builder =
				self.0.request(request.method, request.url).headers(request.headers);

			if let Some(body) = request.body {
				builder = builder.body(body);
			}

			let response = builder.send().await.map_err(|e| map_reqwest_error(&url, e))?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let body = response.bytes().await.map_err(|e| map_reqwest_error(&url, e))?;

			Ok(ApiResponse { status, headers, body: body.to_vec() })
		})
	}
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(url: &str, err: ReqwestError) -> TransportError {
	if err.is_timeout() {
		TransportError::Timeout { url: url.to_owned() }
	} else {
		TransportError::network(url, err)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn json_body_round_trips_through_response() {
		let request = ApiRequest::post("/items")
			.json(&serde_json::json!({ "name": "widget" }))
			.expect("JSON bodies should serialize.");
		let response = ApiResponse::new(
			StatusCode::OK,
			request.body.clone().expect("Body should be populated."),
		);
		let value: serde_json::Value = response.json().expect("Body should decode.");

		assert_eq!(value["name"], "widget");
		assert!(!request.is_retry);
		assert!(request.into_retry().is_retry);
	}

	#[test]
	fn malformed_json_reports_field_path() {
		#[derive(Debug, Deserialize)]
		#[allow(dead_code)]
		struct Payload {
			count: u32,
		}

		let response = ApiResponse::new(StatusCode::OK, br#"{"count":"many"}"#.to_vec());
		let err = response.json::<Payload>().expect_err("Mistyped fields should fail.");

		match err {
			Error::Decode { source, status } => {
				assert_eq!(status, 200);
				assert_eq!(source.path().to_string(), "count");
			},
			other => panic!("Unexpected error: {other:?}"),
		}
	}

	#[test]
	fn content_type_defaults_to_json() {
		let url = Url::parse("https://example.com/api/items").expect("Fixture URL should parse.");
		let mut request = TransportRequest::new(Method::GET, url);

		request.ensure_content_type();

		assert_eq!(
			request.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()),
			Some(JSON_CONTENT_TYPE),
		);
	}
}
