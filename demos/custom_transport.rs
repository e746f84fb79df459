//! Demonstrates plugging an in-process transport into [`AuthClient`] and watching a burst of
//! expired requests share a single refresh.
//!
//! 1. Implement [`HttpTransport`] for a type that answers requests without touching the network.
//! 2. Seed the token store with an expired session and fire several requests at once.
//! 3. Every request is answered after exactly one refresh round-trip.

// std
use std::sync::{
	Arc,
	atomic::{AtomicUsize, Ordering},
};
// crates.io
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use color_eyre::Result;
use url::Url;
// self
use bearer_client::{
	auth::TokenSecret,
	client::AuthClient,
	config::ClientConfig,
	http::{ApiRequest, ApiResponse, HttpTransport, TransportFuture, TransportRequest},
	http_types::StatusCode,
	store::{CredentialStore, MemoryStore},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let store: Arc<dyn CredentialStore> = Arc::new(MemoryStore::default());
	let config = ClientConfig::builder(Url::parse("https://demo.example.com/api")?).build()?;
	let client =
		<AuthClient<MockTransport>>::with_transport(config, store, MockTransport::default())?;

	client.tokens().update_tokens(
		&TokenSecret::from(jwt(r#"{"ip":"203.0.113.9","gen":1}"#)),
		Some(&TokenSecret::from(jwt(r#"{"gen":1}"#))),
	)?;

	let handles: Vec<_> = (1..=4)
		.map(|id| {
			let client = client.clone();

			tokio::spawn(async move {
				client.execute(ApiRequest::get(format!("/reports/{id}"))).await
			})
		})
		.collect();

	for handle in handles {
		let response = handle.await??;

		println!("{} -> {}", response.status, response.text());
	}

	println!(
		"Refresh calls: {}, replays: {}.",
		client.transport().refresh_calls.load(Ordering::Relaxed),
		client.refresh_metrics().replays(),
	);

	Ok(())
}

fn jwt(payload: &str) -> String {
	format!("e30.{}.demo", URL_SAFE_NO_PAD.encode(payload))
}

/// Rejects first-generation tokens and rotates them on the refresh endpoint.
#[derive(Default)]
struct MockTransport {
	refresh_calls: AtomicUsize,
}
impl HttpTransport for MockTransport {
	fn send(&self, request: TransportRequest) -> TransportFuture<'_> {
		Box::pin(async move {
			let path = request.url.path().to_owned();

			if path.ends_with("/refreshUserToken") {
				self.refresh_calls.fetch_add(1, Ordering::Relaxed);

				let body = format!(
					r#"{{"data":{{"access_token":"{}","refresh_token":"{}"}}}}"#,
					jwt(r#"{"ip":"203.0.113.9","gen":2}"#),
					jwt(r#"{"gen":2}"#),
				);

				return Ok(ApiResponse::new(StatusCode::OK, body));
			}

			let fresh = request
				.headers
				.get("authorization")
				.and_then(|value| value.to_str().ok())
				.is_some_and(|value| value.ends_with(&jwt(r#"{"ip":"203.0.113.9","gen":2}"#)));

			if fresh {
				Ok(ApiResponse::new(StatusCode::OK, format!("report at {path}")))
			} else {
				Ok(ApiResponse::new(StatusCode::UNAUTHORIZED, "expired"))
			}
		})
	}
}
