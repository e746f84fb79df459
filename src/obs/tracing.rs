// self
use crate::{_prelude::*, obs::FlowKind};

/// Emits a `tracing` debug event when the feature is enabled; otherwise only borrows the fields.
macro_rules! obs_debug {
	($($arg:tt)+) => {
		#[cfg(feature = "tracing")]
		{
			::tracing::debug!($($arg)+);
		}
		#[cfg(not(feature = "tracing"))]
		{
			$crate::obs::obs_fields!($($arg)+);
		}
	};
}
pub(crate) use obs_debug;

/// Emits a `tracing` warn event when the feature is enabled; otherwise only borrows the fields.
macro_rules! obs_warn {
	($($arg:tt)+) => {
		#[cfg(feature = "tracing")]
		{
			::tracing::warn!($($arg)+);
		}
		#[cfg(not(feature = "tracing"))]
		{
			$crate::obs::obs_fields!($($arg)+);
		}
	};
}
pub(crate) use obs_warn;

/// Touches every field and message argument of an event so disabled builds see them used.
///
/// Accepts the subset of `tracing` event syntax used in this crate: `name`, `name = value`,
/// `name = %value`, `name = ?value`, followed by a format string and its arguments.
#[cfg_attr(feature = "tracing", allow(unused_macros))]
macro_rules! obs_fields {
	() => {};
	($name:ident = %$value:expr, $($rest:tt)+) => {
		let _ = &$value;
		$crate::obs::obs_fields!($($rest)+);
	};
	($name:ident = ?$value:expr, $($rest:tt)+) => {
		let _ = &$value;
		$crate::obs::obs_fields!($($rest)+);
	};
	($name:ident = $value:expr, $($rest:tt)+) => {
		let _ = &$value;
		$crate::obs::obs_fields!($($rest)+);
	};
	($name:ident, $($rest:tt)+) => {
		let _ = &$name;
		$crate::obs::obs_fields!($($rest)+);
	};
	($message:literal $(, $arg:expr)* $(,)?) => {
		let _ = format_args!($message $(, $arg)*);
	};
}
#[cfg_attr(feature = "tracing", allow(unused_imports))]
pub(crate) use obs_fields;

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedFlow<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedFlow<F> = F;

/// Span wrapping one request, refresh, or replay flow.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl FlowSpan {
	/// Opens a `bearer_client.flow` span for `kind`; `stage` names the call site.
	pub fn new(kind: FlowKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("bearer_client.flow", flow = kind.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Runs `fut` inside the span. No guard is held across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedFlow<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}
