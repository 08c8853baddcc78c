use crate::error::Result;
use crate::observer::Subscription;

/// Something that runs once per `start` and reports completion through `on_end`.
///
/// Every `start` must eventually fire the currently subscribed end callbacks
/// exactly once, unless `stop` pre-empts it. `stop` must be safe to call at
/// any point of the lifecycle, including when nothing is running.
pub trait Action: Send + Sync {
	fn start(&self) -> Result<()>;

	fn stop(&self) -> Result<()>;

	/// Subscribe to completion; `None` drops every existing subscription.
	fn on_end(&self, item: Option<Subscription<()>>) -> Result<()>;

	/// Whether the named method is backed by a real implementation.
	///
	/// Statically typed actions always are. Actions assembled at runtime
	/// override this so their gaps are caught before they are scheduled.
	fn exposes(&self, _method: &str) -> bool {
		true
	}
}

/// An [`Action`] driven from a queue of deferred invocations.
pub trait LazyAction: Action {
	/// Run the oldest queued invocation, failing with `EmptyQueue` if there is none.
	fn next(&self) -> Result<()>;
}
