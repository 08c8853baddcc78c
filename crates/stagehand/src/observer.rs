use parking_lot::Mutex;
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

/// A registered callback.
///
/// Scope and bound arguments are whatever the closure captures. Two
/// subscriptions are the same subscription only if they share the same
/// allocation, which is what [`Observer::unsubscribe`] compares.
pub struct Subscription<T> {
	callback: Arc<dyn Fn(&T) + Send + Sync>,
}

impl<T> Subscription<T> {
	pub fn new<F>(callback: F) -> Self
	where
		F: Fn(&T) + Send + Sync + 'static,
	{
		Self { callback: Arc::new(callback) }
	}

	pub fn call(&self, payload: &T) {
		(self.callback)(payload);
	}

	pub fn same_as(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.callback, &other.callback)
	}
}

impl<T> Clone for Subscription<T> {
	fn clone(&self) -> Self {
		Self {
			callback: Arc::clone(&self.callback),
		}
	}
}

impl<T> fmt::Debug for Subscription<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Subscription").field("callback", &Arc::as_ptr(&self.callback)).finish()
	}
}

type Subscribers<T> = SmallVec<[Subscription<T>; 4]>;

/// Ordered callback registry with synchronous fan-out.
///
/// Cloning an observer yields another handle onto the same registry.
pub struct Observer<T> {
	items: Arc<Mutex<Subscribers<T>>>,
}

impl<T> Observer<T> {
	pub fn new() -> Self {
		Self {
			items: Arc::new(Mutex::new(SmallVec::new())),
		}
	}

	/// Append a subscription, or clear every subscription when given `None`.
	///
	/// Subscribing the same callback twice registers it twice.
	pub fn subscribe(&self, item: Option<Subscription<T>>) {
		let mut items = self.items.lock();
		match item {
			Some(item) => items.push(item),
			None => items.clear(),
		}
	}

	/// Remove every entry sharing the callback of `item`.
	pub fn unsubscribe(&self, item: &Subscription<T>) {
		self.items.lock().retain(|existing| !existing.same_as(item));
	}

	/// Invoke every subscriber in subscription order.
	///
	/// The list is snapshotted first: subscribers may subscribe, unsubscribe
	/// or clear while firing, and the change applies from the next fire on.
	/// A panicking subscriber unwinds into the caller.
	pub fn fire(&self, payload: &T) {
		let snapshot: Subscribers<T> = self.items.lock().clone();
		for item in &snapshot {
			item.call(payload);
		}
	}

	pub fn len(&self) -> usize {
		self.items.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.items.lock().is_empty()
	}
}

impl<T> Clone for Observer<T> {
	fn clone(&self) -> Self {
		Self {
			items: Arc::clone(&self.items),
		}
	}
}

impl<T> Default for Observer<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T> fmt::Debug for Observer<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Observer").field("subscribers", &self.len()).finish()
	}
}
