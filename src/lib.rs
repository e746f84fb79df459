//! Bearer-token HTTP client that keeps an access/refresh token pair fresh behind a single-flight
//! refresher, parks colliding requests in a FIFO queue, and replays them once new credentials land.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod obs;
pub mod queue;
pub mod session;
pub mod store;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for tests; enabled via `cfg(test)` or the `test` crate
	//! feature.

	pub use crate::_prelude::*;

	// crates.io
	use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
	// self
	use crate::session::{Notice, SessionHooks};

	/// Encodes an unsigned JWT carrying the provided claims.
	///
	/// Only the payload segment is meaningful; the header and signature are fixed placeholders
	/// because the client never verifies signatures.
	pub fn unsigned_jwt(claims: serde_json::Value) -> String {
		let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
		let payload = URL_SAFE_NO_PAD.encode(claims.to_string());

		format!("{header}.{payload}.signature")
	}

	/// Session hooks that record every side effect for later assertions.
	#[derive(Debug, Default)]
	pub struct RecordingHooks {
		notices: Mutex<Vec<Notice>>,
		redirects: Mutex<Vec<String>>,
		route: Mutex<Option<String>>,
	}
	impl RecordingHooks {
		/// Pretends the application currently shows `route`.
		pub fn at_route(self, route: &str) -> Self {
			*self.route.lock() = Some(route.to_owned());

			self
		}

		/// Returns every notice surfaced so far.
		pub fn notices(&self) -> Vec<Notice> {
			self.notices.lock().clone()
		}

		/// Returns every redirect target, in order.
		pub fn redirects(&self) -> Vec<String> {
			self.redirects.lock().clone()
		}
	}
	impl SessionHooks for RecordingHooks {
		fn notify(&self, notice: &Notice) {
			self.notices.lock().push(notice.clone());
		}

		fn is_at(&self, route: &str) -> bool {
			self.route.lock().as_deref() == Some(route)
		}

		fn redirect(&self, route: &str) {
			self.redirects.lock().push(route.to_owned());
			*self.route.lock() = Some(route.to_owned());
		}
	}
}

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use ::http as http_types;
#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {color_eyre as _, httpmock as _};
