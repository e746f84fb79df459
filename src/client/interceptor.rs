//! Request pipeline: bearer attachment, 401 routing, and queue replay.
//!
//! The branching is expressed as two decision tables, [`request_phase`] and
//! [`response_disposition`], both pure so they can be tested without a transport. The async
//! methods on [`AuthClient`] only act on the decisions.
//!
//! | status | retry | authenticated | disposition       |
//! |--------|-------|---------------|-------------------|
//! | 401    | yes   | any           | `RetryForbidden`  |
//! | 401    | no    | no            | `Unrecoverable`   |
//! | 401    | no    | yes           | `Enqueue`         |
//! | other  | any   | any           | `Continue`        |

// crates.io
use ::http::{StatusCode, header::AUTHORIZATION};
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	client::{
		AuthClient, RefreshState,
		refresh::{Admission, Collision},
	},
	http::{ApiRequest, ApiResponse, HttpTransport, TransportRequest},
	obs::{self, FlowKind, FlowOutcome, FlowSpan, obs_debug},
	session::{self, Notice},
};

/// Decision taken before a request is sent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestPhase {
	/// Attach credentials and send.
	Continue,
	/// A cycle is active; the request must wait in the queue instead of being sent.
	RefreshInProgress,
}

/// Decision taken once a response arrived.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Disposition {
	/// Hand the response (or its status error) to the caller.
	Continue,
	/// Queue the request behind a refresh cycle, starting one if none is active.
	Enqueue,
	/// A replay was rejected again; fail without another refresh.
	RetryForbidden,
	/// No session exists that could be refreshed; sign the user out.
	Unrecoverable,
}

/// Request-phase decision table.
pub fn request_phase(state: RefreshState, is_retry: bool) -> RequestPhase {
	match (state, is_retry) {
		(RefreshState::Refreshing, false) => RequestPhase::RefreshInProgress,
		_ => RequestPhase::Continue,
	}
}

/// Response-phase decision table.
///
/// `authenticated` is only consulted for non-retry 401s.
pub fn response_disposition(status: StatusCode, is_retry: bool, authenticated: bool) -> Disposition {
	if status != StatusCode::UNAUTHORIZED {
		return Disposition::Continue;
	}
	if is_retry {
		return Disposition::RetryForbidden;
	}
	if !authenticated {
		return Disposition::Unrecoverable;
	}

	Disposition::Enqueue
}

impl<T> AuthClient<T>
where
	T: HttpTransport,
{
	/// Sends `request` through the pipeline.
	///
	/// Returns the response for 2xx statuses. Other statuses surface as [`Error::Status`] with
	/// the server's trace identifier. A 401 for an authenticated session is absorbed: the request
	/// waits for the refresh cycle and resolves with the outcome of its replay.
	pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
		const KIND: FlowKind = FlowKind::Request;

		let span = FlowSpan::new(KIND, "execute");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(self.dispatch(request)).await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	/// Sends `request` and deserializes the JSON body of the success response.
	pub async fn execute_json<R>(&self, request: ApiRequest) -> Result<R>
	where
		R: DeserializeOwned,
	{
		self.execute(request).await?.json()
	}

	async fn dispatch(&self, request: ApiRequest) -> Result<ApiResponse> {
		let (request, generation) = match self.refresher.admit(request) {
			Admission::Proceed { request, generation } => (request, generation),
			Admission::Parked(ticket) => {
				obs_debug!("Refresh in progress; request parked.");

				return ticket.await;
			},
		};
		let response = self.send_with_credentials(&request).await?;
		let authenticated =
			response.status == StatusCode::UNAUTHORIZED && self.tokens.is_authenticated();

		match response_disposition(response.status, request.is_retry, authenticated) {
			Disposition::Continue => self.settle(response),
			Disposition::RetryForbidden => Err(self.status_error(&response)),
			Disposition::Unrecoverable => {
				self.sign_out_unauthenticated().await;

				Err(self.status_error(&response))
			},
			Disposition::Enqueue => match self.refresher.collide(request, generation) {
				Collision::Stale(request) => {
					obs_debug!("Credentials rotated since the request was sent; replaying.");

					self.replay(request.into_retry()).await
				},
				Collision::Queued { ticket, leader } => {
					if leader {
						// The failure, if any, also reaches this caller through its ticket.
						let _ = self.drive_refresh_cycle().await;
					}

					ticket.await
				},
			},
		}
	}

	/// Re-issues a queued request with the current credentials. Replays are never re-queued.
	pub(crate) async fn replay(&self, request: ApiRequest) -> Result<ApiResponse> {
		const KIND: FlowKind = FlowKind::Replay;

		let span = FlowSpan::new(KIND, "replay");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async {
				let response = self.send_with_credentials(&request).await?;

				self.settle(response)
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	pub(crate) fn status_error(&self, response: &ApiResponse) -> Error {
		Error::Status {
			status: response.status.as_u16(),
			trace_id: response.header(&self.config.trace_header).map(str::to_owned),
			body: response.text(),
		}
	}

	async fn send_with_credentials(&self, request: &ApiRequest) -> Result<ApiResponse> {
		let mut outgoing =
			TransportRequest::new(request.method.clone(), self.config.resolve(&request.path)?);

		outgoing.headers = request.headers.clone();
		outgoing.body = request.body.clone();
		outgoing.ensure_content_type();

		if let Some(token) = self.tokens.access_token() {
			outgoing.insert_header(AUTHORIZATION, &token.bearer())?;
		}

		Ok(self.transport.send(outgoing).await?)
	}

	fn settle(&self, response: ApiResponse) -> Result<ApiResponse> {
		if response.is_success() { Ok(response) } else { Err(self.status_error(&response)) }
	}

	async fn sign_out_unauthenticated(&self) {
		let notice = Notice::sign_in_required();

		obs_debug!("Unauthorized without a session; signing out.");

		self.tokens.discard();
		self.refresher.reject_queued(&Error::Unauthenticated { reason: notice.message.clone() });

		session::end_session(
			self.hooks.as_ref(),
			notice,
			&self.config.login_route,
			self.config.redirect_grace,
		)
		.await;
	}
}
