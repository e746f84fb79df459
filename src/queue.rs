//! FIFO buffer for requests that wait on a refresh cycle.
//!
//! Every [`QueuedRequest`] owns the sending half of a one-shot channel; its caller holds the
//! matching [`QueueTicket`]. Settling consumes the record, so a request can only be resolved or
//! rejected once. Dropping a record without settling it wakes the ticket with
//! [`Error::Abandoned`] instead of leaving the caller suspended.

// std
use std::task::{Context, Poll};
// crates.io
use ::http::Method;
use tokio::sync::oneshot::{self, Receiver, Sender};
// self
use crate::{
	_prelude::*,
	http::{ApiRequest, ApiResponse},
};

/// A request parked until the current refresh cycle settles.
#[derive(Debug)]
pub struct QueuedRequest {
	/// Request as issued by the caller; replayed verbatim apart from the retry marker.
	pub request: ApiRequest,
	responder: Sender<Result<ApiResponse>>,
}
impl QueuedRequest {
	/// Settles the caller's ticket with a successful response.
	pub fn resolve(self, response: ApiResponse) {
		self.settle(Ok(response));
	}

	/// Settles the caller's ticket with a failure.
	pub fn reject(self, error: Error) {
		self.settle(Err(error));
	}

	fn settle(self, result: Result<ApiResponse>) {
		// The caller may have stopped waiting; nothing else observes the outcome.
		let _ = self.responder.send(result);
	}
}

/// Caller-side handle resolving once the queued request is replayed or rejected.
#[derive(Debug)]
pub struct QueueTicket(Receiver<Result<ApiResponse>>);
impl Future for QueueTicket {
	type Output = Result<ApiResponse>;

	fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		Pin::new(&mut self.0).poll(cx).map(|settled| settled.unwrap_or(Err(Error::Abandoned)))
	}
}

/// Diagnostic view of a pending request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueuedRequestInfo {
	/// HTTP method.
	pub method: Method,
	/// Request path or URL as supplied by the caller.
	pub path: String,
}

/// Ordered list of requests waiting on the refresh cycle.
#[derive(Debug, Default)]
pub struct RequestQueue {
	tasks: Vec<QueuedRequest>,
}
impl RequestQueue {
	/// Appends `request` and returns the ticket its caller should await.
	pub fn enqueue(&mut self, request: ApiRequest) -> QueueTicket {
		let (responder, receiver) = oneshot::channel();

		self.tasks.push(QueuedRequest { request, responder });

		QueueTicket(receiver)
	}

	/// Moves every pending request into a batch, leaving the live queue empty.
	///
	/// Requests enqueued after this call start a new batch.
	pub fn take_batch(&mut self) -> QueueBatch {
		QueueBatch(std::mem::take(&mut self.tasks))
	}

	/// Rejects every pending request with a clone of `error` and empties the queue.
	pub fn reject_all(&mut self, error: &Error) {
		self.take_batch().reject_all(error);
	}

	/// Drops every pending request without settling it; their tickets observe
	/// [`Error::Abandoned`].
	pub fn clear(&mut self) {
		self.tasks.clear();
	}

	/// Number of pending requests.
	pub fn len(&self) -> usize {
		self.tasks.len()
	}

	/// Returns `true` when nothing is pending.
	pub fn is_empty(&self) -> bool {
		self.tasks.is_empty()
	}

	/// Lists pending requests in replay order.
	pub fn describe(&self) -> Vec<QueuedRequestInfo> {
		self.tasks
			.iter()
			.map(|task| QueuedRequestInfo {
				method: task.request.method.clone(),
				path: task.request.path.clone(),
			})
			.collect()
	}
}

/// Snapshot of the queue taken at the start of a drain.
#[derive(Debug, Default)]
pub struct QueueBatch(Vec<QueuedRequest>);
impl QueueBatch {
	/// Replays every request in insertion order and settles each ticket with its own outcome.
	///
	/// Replays run one at a time: the next request is issued only after the previous one
	/// settled, which keeps the order observed by the server identical to the enqueue order.
	/// A failed replay only affects its own ticket.
	pub async fn resolve_all<F, Fut>(self, mut replay: F)
	where
		F: FnMut(ApiRequest) -> Fut,
		Fut: Future<Output = Result<ApiResponse>>,
	{
		for task in self.0 {
			let request = task.request.clone().into_retry();
			let result = replay(request).await;

			task.settle(result);
		}
	}

	/// Rejects every request in the batch with a clone of `error`.
	pub fn reject_all(self, error: &Error) {
		for task in self.0 {
			task.reject(error.clone());
		}
	}

	/// Number of requests in the batch.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns `true` when the batch is empty.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}
