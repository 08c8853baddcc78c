//! Actions assembled at runtime from named handlers.
//!
//! Useful when the set of behaviours comes from outside the type system,
//! e.g. a test script or a plugin table. Which methods exist is only known
//! at runtime, so a [`Scene`](crate::Scene) validates them on construction.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::action::{Action, LazyAction};
use crate::error::{Result, SceneError};
use crate::interface::LAZY_ACTION;
use crate::observer::{Observer, Subscription};

/// Handler for one method. It receives the table's end observer so it can
/// report completion, synchronously or later from a spawned task.
pub type Handler = Arc<dyn Fn(&Observer<()>) -> Result<()> + Send + Sync>;

pub struct ActionTable {
	name: String,
	handlers: HashMap<&'static str, Handler>,
	notifies: bool,
	ended: Observer<()>,
}

impl ActionTable {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			handlers: HashMap::new(),
			notifies: true,
			ended: Observer::new(),
		}
	}

	/// Back `method` (`start`, `stop` or `next`) with `handler`.
	pub fn handle<F>(mut self, method: &'static str, handler: F) -> Self
	where
		F: Fn(&Observer<()>) -> Result<()> + Send + Sync + 'static,
	{
		self.handlers.insert(method, Arc::new(handler));
		self
	}

	/// Drop the `on_end` method from this table.
	pub fn without_end_notification(mut self) -> Self {
		self.notifies = false;
		self
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	fn dispatch(&self, method: &'static str) -> Result<()> {
		let handler = self.handlers.get(method).ok_or(SceneError::ContractViolation {
			interface: LAZY_ACTION.name,
			method,
		})?;
		handler(&self.ended)
	}
}

impl Action for ActionTable {
	fn start(&self) -> Result<()> {
		self.dispatch("start")
	}

	fn stop(&self) -> Result<()> {
		self.dispatch("stop")
	}

	fn on_end(&self, item: Option<Subscription<()>>) -> Result<()> {
		if !self.notifies {
			return Err(SceneError::ContractViolation {
				interface: LAZY_ACTION.name,
				method: "on_end",
			});
		}
		self.ended.subscribe(item);
		Ok(())
	}

	fn exposes(&self, method: &str) -> bool {
		if method == "on_end" {
			self.notifies
		} else {
			self.handlers.contains_key(method)
		}
	}
}

impl LazyAction for ActionTable {
	fn next(&self) -> Result<()> {
		self.dispatch("next")
	}
}

impl fmt::Debug for ActionTable {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut methods: Vec<_> = self.handlers.keys().copied().collect();
		methods.sort_unstable();
		f.debug_struct("ActionTable")
			.field("name", &self.name)
			.field("methods", &methods)
			.field("notifies", &self.notifies)
			.finish()
	}
}
