//! User-visible side effects raised when a session cannot be recovered.
//!
//! The client never renders anything itself. It hands a [`Notice`] to the application's
//! [`SessionHooks`] and asks it to navigate to the login route once the notice had time to show.

// self
use crate::{
	_prelude::*,
	obs::{obs_debug, obs_warn},
};

/// Placeholder shown when the server did not echo a trace identifier.
pub const MISSING_TRACE_ID: &str = "N/A";

/// Why the session ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NoticeKind {
	/// The refresh endpoint rejected the stored credentials.
	SessionExpired,
	/// A protected call was made without any session to refresh.
	SignInRequired,
}

/// Failure notification handed to [`SessionHooks::notify`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
	/// Failure category.
	pub kind: NoticeKind,
	/// Message meant for the user.
	pub message: String,
	/// Server trace identifier, when the failing response carried one.
	pub trace_id: Option<String>,
}
impl Notice {
	/// Notice raised when a refresh attempt fails.
	pub fn session_expired(trace_id: Option<String>) -> Self {
		Self {
			kind: NoticeKind::SessionExpired,
			message: "Your session has expired, please sign in again".into(),
			trace_id,
		}
	}

	/// Notice raised for a 401 without a refreshable session.
	pub fn sign_in_required() -> Self {
		Self {
			kind: NoticeKind::SignInRequired,
			message: "Please sign in to obtain full access".into(),
			trace_id: None,
		}
	}
}
impl Display for Notice {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self.kind {
			NoticeKind::SessionExpired => write!(
				f,
				"{} ({})",
				self.message,
				self.trace_id.as_deref().unwrap_or(MISSING_TRACE_ID)
			),
			NoticeKind::SignInRequired => f.write_str(&self.message),
		}
	}
}

/// Application callbacks for failure notifications and login redirects.
pub trait SessionHooks
where
	Self: Send + Sync,
{
	/// Surfaces a failure to the user (toast, banner, log line).
	fn notify(&self, notice: &Notice);

	/// Returns `true` when the application already shows `route`.
	fn is_at(&self, route: &str) -> bool {
		let _ = route;

		false
	}

	/// Navigates to `route`.
	fn redirect(&self, route: &str);
}

/// Hooks that only log; the default for headless clients.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingHooks;
impl SessionHooks for TracingHooks {
	fn notify(&self, notice: &Notice) {
		obs_warn!(kind = ?notice.kind, "{notice}");
	}

	fn redirect(&self, route: &str) {
		obs_debug!(route, "Login redirect requested.");
	}
}

/// Notifies, waits `grace` so the notice can render, then redirects unless already there.
pub(crate) async fn end_session(
	hooks: &dyn SessionHooks,
	notice: Notice,
	login_route: &str,
	grace: Duration,
) {
	hooks.notify(&notice);

	if grace.is_positive() {
		tokio::time::sleep(grace.unsigned_abs()).await;
	}
	if !hooks.is_at(login_route) {
		hooks.redirect(login_route);
	}
}
