use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::action::{Action, LazyAction};
use crate::error::{Result, SceneError};
use crate::observer::Subscription;

/// An eager object whose operations can be recorded and replayed.
///
/// Each operation is one variant of `Call`, carrying its own arguments.
pub trait Scriptable: Action {
	type Call: fmt::Debug + Send + 'static;

	/// Name of the operation, as used to select which calls are deferred.
	fn method(call: &Self::Call) -> &'static str;

	/// Run the operation now.
	fn invoke(&self, call: Self::Call) -> Result<()>;
}

/// Turns an eager [`Scriptable`] into a [`LazyAction`].
///
/// Calls whose method is intercepted are queued; everything else is
/// forwarded to the wrapped object immediately. `start`, `stop` and
/// `on_end` always pass straight through, so the wrapped object stays in
/// charge of reporting its own completion.
pub struct LazyDecorator<T: Scriptable> {
	item: Arc<T>,
	methods: HashSet<&'static str>,
	queue: Mutex<VecDeque<T::Call>>,
}

impl<T: Scriptable> LazyDecorator<T> {
	pub fn new<I>(item: T, methods: I) -> Self
	where
		I: IntoIterator<Item = &'static str>,
	{
		Self::wrap(Arc::new(item), methods)
	}

	pub fn wrap<I>(item: Arc<T>, methods: I) -> Self
	where
		I: IntoIterator<Item = &'static str>,
	{
		Self {
			item,
			methods: methods.into_iter().collect(),
			queue: Mutex::new(VecDeque::new()),
		}
	}

	/// Queue the call if its method is intercepted, otherwise run it now.
	///
	/// Returns the decorator so calls can be chained.
	pub fn call(&self, call: T::Call) -> Result<&Self> {
		let method = T::method(&call);
		if self.methods.contains(method) {
			debug!(method, "queued");
			self.queue.lock().push_back(call);
		} else {
			self.item.invoke(call)?;
		}
		Ok(self)
	}

	pub fn intercepts(&self, method: &str) -> bool {
		self.methods.contains(method)
	}

	pub fn pending(&self) -> usize {
		self.queue.lock().len()
	}

	pub fn inner(&self) -> &Arc<T> {
		&self.item
	}
}

impl<T: Scriptable> Action for LazyDecorator<T> {
	fn start(&self) -> Result<()> {
		self.item.start()
	}

	fn stop(&self) -> Result<()> {
		self.item.stop()
	}

	fn on_end(&self, item: Option<Subscription<()>>) -> Result<()> {
		self.item.on_end(item)
	}

	fn exposes(&self, method: &str) -> bool {
		method == "next" || self.item.exposes(method)
	}
}

impl<T: Scriptable> LazyAction for LazyDecorator<T> {
	fn next(&self) -> Result<()> {
		// Release the queue before invoking: the call may complete synchronously
		// and re-enter this decorator through a scene.
		let call = self.queue.lock().pop_front().ok_or(SceneError::EmptyQueue)?;
		debug!(method = T::method(&call), "dequeued");
		self.item.invoke(call)
	}
}

impl<T: Scriptable> fmt::Debug for LazyDecorator<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut methods: Vec<_> = self.methods.iter().copied().collect();
		methods.sort_unstable();
		f.debug_struct("LazyDecorator")
			.field("methods", &methods)
			.field("queue", &*self.queue.lock())
			.finish_non_exhaustive()
	}
}
