//! Single-flight token refresh with queue draining.
//!
//! [`TokenRefresher`] keeps the refresh state and the request queue behind one mutex so that
//! "observe the state, then enqueue" and "observe an empty queue, then go idle" are atomic.
//! The first caller to observe `Idle` on a 401 becomes the leader and drives the cycle through
//! [`AuthClient::refresh`]'s internals; everyone else only parks a ticket. The lock is never held
//! across an `.await`.

// crates.io
use ::http::{HeaderName, Method, header::AUTHORIZATION};
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	client::{AuthClient, RefreshMetrics, RequestPhase, request_phase},
	http::{ApiRequest, HttpTransport, TransportRequest},
	obs::{self, FlowKind, FlowOutcome, FlowSpan, obs_debug, obs_warn},
	queue::{QueueBatch, QueueTicket, QueuedRequestInfo, RequestQueue},
	session::{self, Notice},
};

/// Header carrying the refresh token on refresh calls.
pub const REFRESH_TOKEN_HEADER: &str = "x-refresh-token";

/// Refresh state machine: `Idle -> Refreshing -> Idle`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RefreshState {
	/// No cycle is active.
	#[default]
	Idle,
	/// A cycle is talking to the refresh endpoint or draining the queue.
	Refreshing,
}

/// Result of checking a request in before it reaches the transport.
#[derive(Debug)]
pub(crate) enum Admission {
	/// Send now; `generation` identifies the token pair the request will carry.
	Proceed { request: ApiRequest, generation: u64 },
	/// A cycle is active; the request waits in the queue.
	Parked(QueueTicket),
}

/// Routing of a 401 for an authenticated session.
#[derive(Debug)]
pub(crate) enum Collision {
	/// Queued behind a cycle; `leader` is `true` for the caller that must drive it.
	Queued { ticket: QueueTicket, leader: bool },
	/// The request carried a token that a finished cycle already replaced.
	Stale(ApiRequest),
}

/// Owner of the refresh state and of the queue it drains.
#[derive(Debug, Default)]
pub struct TokenRefresher {
	core: Mutex<RefreshCore>,
}
impl TokenRefresher {
	/// Current state.
	pub fn state(&self) -> RefreshState {
		self.core.lock().state
	}

	/// Returns `true` while a cycle is active.
	pub fn is_refreshing(&self) -> bool {
		self.state() == RefreshState::Refreshing
	}

	/// Number of token pairs stored by completed cycles.
	pub fn generation(&self) -> u64 {
		self.core.lock().generation
	}

	/// Pending requests in replay order.
	pub fn queued(&self) -> Vec<QueuedRequestInfo> {
		self.core.lock().queue.describe()
	}

	pub(crate) fn admit(&self, request: ApiRequest) -> Admission {
		let mut core = self.core.lock();

		match request_phase(core.state, request.is_retry) {
			RequestPhase::RefreshInProgress => Admission::Parked(core.queue.enqueue(request)),
			RequestPhase::Continue => Admission::Proceed { generation: core.generation, request },
		}
	}

	pub(crate) fn collide(&self, request: ApiRequest, sent_generation: u64) -> Collision {
		let mut core = self.core.lock();

		match core.state {
			RefreshState::Refreshing =>
				Collision::Queued { ticket: core.queue.enqueue(request), leader: false },
			RefreshState::Idle if core.generation != sent_generation => Collision::Stale(request),
			RefreshState::Idle => {
				core.state = RefreshState::Refreshing;

				Collision::Queued { ticket: core.queue.enqueue(request), leader: true }
			},
		}
	}

	pub(crate) fn try_begin(&self) -> bool {
		let mut core = self.core.lock();

		if core.state == RefreshState::Refreshing {
			return false;
		}

		core.state = RefreshState::Refreshing;

		true
	}

	pub(crate) fn complete_rotation(&self) {
		self.core.lock().generation += 1;
	}

	/// Hands out the next batch, or returns to `Idle` once nothing is left.
	pub(crate) fn next_batch(&self) -> Option<QueueBatch> {
		let mut core = self.core.lock();

		if core.queue.is_empty() {
			core.state = RefreshState::Idle;

			None
		} else {
			Some(core.queue.take_batch())
		}
	}

	pub(crate) fn fail(&self, error: &Error) {
		let mut core = self.core.lock();

		core.queue.reject_all(error);
		core.state = RefreshState::Idle;
	}

	pub(crate) fn reject_queued(&self, error: &Error) {
		self.core.lock().queue.reject_all(error);
	}
}

#[derive(Debug, Default)]
struct RefreshCore {
	state: RefreshState,
	generation: u64,
	queue: RequestQueue,
}

/// Success body of both refresh endpoints.
#[derive(Debug, Deserialize)]
struct RefreshEnvelope {
	data: RefreshPayload,
}

#[derive(Debug, Deserialize)]
struct RefreshPayload {
	access_token: TokenSecret,
	#[serde(default)]
	refresh_token: Option<TokenSecret>,
}

/// Settles the queue if the future driving a cycle is dropped mid-flight.
struct CycleGuard<'a> {
	refresher: &'a TokenRefresher,
	metrics: &'a RefreshMetrics,
	armed: bool,
}
impl<'a> CycleGuard<'a> {
	fn new(refresher: &'a TokenRefresher, metrics: &'a RefreshMetrics) -> Self {
		Self { refresher, metrics, armed: true }
	}

	fn disarm(mut self) {
		self.armed = false;
	}
}
impl Drop for CycleGuard<'_> {
	fn drop(&mut self) {
		if self.armed {
			obs_warn!("Refresh cycle dropped before settling; rejecting queued requests.");

			self.metrics.record_failure();
			self.refresher.fail(&Error::RefreshAborted);
		}
	}
}

impl<T> AuthClient<T>
where
	T: HttpTransport,
{
	/// Starts a refresh cycle unless one is already active.
	///
	/// Returns immediately with `Ok(())` when another caller is refreshing. Otherwise the call
	/// contacts the refresh endpoint, stores the new pair, and replays every queued request before
	/// returning. On failure the tokens are cleared, the session hooks are told, every queued
	/// request is rejected with the same error, and that error is returned.
	pub async fn refresh(&self) -> Result<()> {
		if !self.refresher.try_begin() {
			obs_debug!("Refresh already in flight; skipping.");

			return Ok(());
		}

		self.drive_refresh_cycle().await
	}

	/// Runs one cycle. The caller must have moved the refresher to `Refreshing`.
	pub(crate) async fn drive_refresh_cycle(&self) -> Result<()> {
		const KIND: FlowKind = FlowKind::Refresh;

		let span = FlowSpan::new(KIND, "drive_refresh_cycle");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let guard = CycleGuard::new(&self.refresher, &self.refresh_metrics);

				self.refresh_metrics.record_attempt();

				match self.rotate_tokens().await {
					Ok(()) => {
						self.refresh_metrics.record_success();

						while let Some(batch) = self.refresher.next_batch() {
							obs_debug!(size = batch.len(), "Replaying queued requests.");

							self.refresh_metrics.record_replays(batch.len());

							batch.resolve_all(|request| self.replay(request)).await;
						}

						guard.disarm();

						Ok(())
					},
					Err(e) => {
						obs_warn!(error = %e, "Token refresh failed; ending session.");

						self.refresh_metrics.record_failure();
						self.tokens.discard();

						session::end_session(
							self.hooks.as_ref(),
							Notice::session_expired(e.trace_id().map(str::to_owned)),
							&self.config.login_route,
							self.config.redirect_grace,
						)
						.await;

						self.refresher.fail(&e);
						guard.disarm();

						Err(e)
					},
				}
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	async fn rotate_tokens(&self) -> Result<()> {
		let endpoints = &self.config.endpoints;
		let path = if self.tokens.is_authenticated() {
			&endpoints.refresh
		} else {
			&endpoints.initialize
		};
		// Missing tokens still send the `Bearer ` prefix.
		let access = self.tokens.access_token().unwrap_or_default();
		let refresh = self.tokens.refresh_token().unwrap_or_default();
		let mut request = TransportRequest::new(Method::GET, self.config.resolve(path)?);

		request.insert_header(AUTHORIZATION, &access.bearer())?;
		request.insert_header(HeaderName::from_static(REFRESH_TOKEN_HEADER), &refresh.bearer())?;
		request.ensure_content_type();

		let response = self.transport.send(request).await?;

		if !response.is_success() {
			return Err(self.status_error(&response));
		}

		let RefreshEnvelope { data } = response.json()?;
		let refresh = data.refresh_token.filter(|token| !token.expose().is_empty());

		self.tokens.update_tokens(&data.access_token, refresh.as_ref())?;
		self.refresher.complete_rotation();

		Ok(())
	}
}
