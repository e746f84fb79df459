//! Shared fixtures for integration tests: an in-process scripted transport with per-path gates,
//! plus token and response builders.

#![allow(dead_code)]

// crates.io
use serde_json::json;
use tokio::sync::{Notify, Semaphore};
// self
use bearer_client::{
	_preludet::*,
	auth::TokenSecret,
	client::AuthClient,
	config::ClientConfig,
	http::{ApiResponse, HttpTransport, TransportFuture, TransportRequest},
	http_types::StatusCode,
	store::MemoryStore,
};

pub const REFRESH_PATH: &str = "/api/authorization/refreshUserToken";
pub const INITIALIZE_PATH: &str = "/api/authorization/initializeToken";

/// Access token identifying a signed-in user.
pub fn user_access(tag: &str) -> String {
	unsigned_jwt(json!({ "ip": "10.0.0.7", "tag": tag }))
}

/// Access token of an anonymous session.
pub fn anonymous_access(tag: &str) -> String {
	unsigned_jwt(json!({ "tag": tag }))
}

/// Refresh token valid for one hour.
pub fn refresh_token(tag: &str) -> String {
	let exp = (OffsetDateTime::now_utc() + Duration::hours(1)).unix_timestamp();

	unsigned_jwt(json!({ "tag": tag, "exp": exp }))
}

/// Body returned by the refresh endpoints.
pub fn refresh_body(access: &str, refresh: &str) -> Vec<u8> {
	json!({ "data": { "access_token": access, "refresh_token": refresh } }).to_string().into_bytes()
}

/// Builds a response with an optional trace header.
pub fn respond(status: u16, body: impl Into<Vec<u8>>, trace_id: Option<&str>) -> ApiResponse {
	let status = StatusCode::from_u16(status).expect("Fixture status should be valid.");
	let mut response = ApiResponse::new(status, body);

	if let Some(trace_id) = trace_id {
		response.headers.insert(
			"x-encore-trace-id",
			trace_id.parse().expect("Fixture trace identifier should be a valid header."),
		);
	}

	response
}

/// Request as observed by [`ScriptedTransport`].
#[derive(Clone, Debug)]
pub struct SentRequest {
	pub path: String,
	pub authorization: Option<String>,
	pub refresh_header: Option<String>,
	pub content_type: Option<String>,
}

/// Holds responses for one path until released.
#[derive(Debug)]
pub struct Gate {
	arrived: Notify,
	release: Semaphore,
}
impl Gate {
	/// Waits until a request reached the gated path.
	pub async fn arrival(&self) {
		self.arrived.notified().await;
	}

	/// Lets every current and future request through.
	pub fn open(&self) {
		self.release.add_permits(Semaphore::MAX_PERMITS / 2);
	}
}

type Handler = Box<dyn Fn(&SentRequest) -> ApiResponse + Send + Sync>;

/// In-process transport answering through a closure and logging every request.
pub struct ScriptedTransport {
	handler: Handler,
	log: Mutex<Vec<SentRequest>>,
	gates: Mutex<HashMap<String, Arc<Gate>>>,
}
impl ScriptedTransport {
	pub fn new(handler: impl 'static + Fn(&SentRequest) -> ApiResponse + Send + Sync) -> Self {
		Self { handler: Box::new(handler), log: Default::default(), gates: Default::default() }
	}

	/// Holds every response for `path` until the returned gate opens.
	pub fn gate(&self, path: &str) -> Arc<Gate> {
		let gate = Arc::new(Gate { arrived: Notify::new(), release: Semaphore::new(0) });

		self.gates.lock().insert(path.into(), gate.clone());

		gate
	}

	pub fn sent(&self) -> Vec<SentRequest> {
		self.log.lock().clone()
	}

	pub fn calls_to(&self, path: &str) -> usize {
		self.log.lock().iter().filter(|request| request.path == path).count()
	}
}
impl HttpTransport for ScriptedTransport {
	fn send(&self, request: TransportRequest) -> TransportFuture<'_> {
		let header = |name: &str| {
			request.headers.get(name).and_then(|value| value.to_str().ok()).map(str::to_owned)
		};
		let sent = SentRequest {
			path: request.url.path().to_owned(),
			authorization: header("authorization"),
			refresh_header: header("x-refresh-token"),
			content_type: header("content-type"),
		};
		let gate = self.gates.lock().get(&sent.path).cloned();

		self.log.lock().push(sent.clone());

		Box::pin(async move {
			if let Some(gate) = gate {
				gate.arrived.notify_one();
				gate.release.acquire().await.expect("Gate semaphore is never closed.").forget();
			}

			Ok((self.handler)(&sent))
		})
	}
}

/// Client over `transport` rooted at `https://app.test/api`, with no redirect grace delay.
pub fn build_client(
	transport: ScriptedTransport,
) -> (AuthClient<ScriptedTransport>, MemoryStore, Arc<RecordingHooks>) {
	let store = MemoryStore::default();
	let hooks = Arc::new(RecordingHooks::default());
	let config = ClientConfig::builder(
		Url::parse("https://app.test/api").expect("Fixture base URL should parse."),
	)
	.redirect_grace(Duration::ZERO)
	.build()
	.expect("Fixture config should validate.");
	let client =
		<AuthClient<ScriptedTransport>>::with_transport(config, Arc::new(store.clone()), transport)
			.expect("Fixture client should build.")
			.with_hooks(hooks.clone());

	(client, store, hooks)
}

/// Seeds the token pair.
pub fn seed(client: &AuthClient<ScriptedTransport>, access: &str, refresh: &str) {
	client
		.tokens()
		.update_tokens(&TokenSecret::from(access), Some(&TokenSecret::from(refresh)))
		.expect("Memory writes never fail.");
}

/// Polls until `predicate` holds, failing after two seconds.
pub async fn eventually(mut predicate: impl FnMut() -> bool) {
	let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(2);

	while !predicate() {
		assert!(
			tokio::time::Instant::now() < deadline,
			"Condition should hold within two seconds."
		);

		tokio::time::sleep(std::time::Duration::from_millis(5)).await;
	}
}
