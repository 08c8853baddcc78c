use crate::action::Action;
use crate::error::{Result, SceneError};

/// A named set of methods an object must expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interface {
	pub name: &'static str,
	pub methods: &'static [&'static str],
}

impl Interface {
	pub const fn new(name: &'static str, methods: &'static [&'static str]) -> Self {
		Self { name, methods }
	}

	/// First method of this interface that `object` does not expose.
	pub fn missing_in(&self, object: &dyn Action) -> Option<&'static str> {
		self.methods.iter().copied().find(|method| !object.exposes(method))
	}
}

pub const ACTION: Interface = Interface::new("Action", &["on_end", "start", "stop"]);

pub const LAZY_ACTION: Interface = Interface::new("LazyAction", &["next", "on_end", "start", "stop"]);

/// Check `object` against every interface, in order.
pub fn ensure_implements(object: &dyn Action, interfaces: &[&Interface]) -> Result<()> {
	for interface in interfaces {
		if let Some(method) = interface.missing_in(object) {
			return Err(SceneError::ContractViolation {
				interface: interface.name,
				method,
			});
		}
	}
	Ok(())
}
