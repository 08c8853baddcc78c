//! Capabilities the actions need from whatever hosts the elements.
//!
//! A browser binding, a native accessibility bridge or the in-memory
//! [`VirtualPage`] can all stand behind these traits.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;

use crate::error::{Result, SceneError};
use crate::geometry::{center_of, Position, Size};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
	MouseDown,
	MouseMove,
	MouseUp,
	Click,
	KeyDown,
	KeyPress,
	KeyUp,
}

impl EventKind {
	pub const fn is_pointer(self) -> bool {
		matches!(self, Self::MouseDown | Self::MouseMove | Self::MouseUp | Self::Click)
	}
}

/// A synthetic input event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputEvent {
	pub kind: EventKind,
	pub position: Option<Position>,
	pub key: Option<char>,
}

impl InputEvent {
	pub const fn pointer(kind: EventKind, at: Position) -> Self {
		Self {
			kind,
			position: Some(at),
			key: None,
		}
	}

	pub const fn key(kind: EventKind, key: char) -> Self {
		Self {
			kind,
			position: None,
			key: Some(key),
		}
	}

	/// Pointer events need coordinates, key events need a character.
	pub fn validate(&self) -> Result<()> {
		if self.kind.is_pointer() && self.position.is_none() {
			return Err(SceneError::missing(format!("{:?} requires coordinates", self.kind)));
		}
		if !self.kind.is_pointer() && self.key.is_none() {
			return Err(SceneError::missing(format!("{:?} requires a key", self.kind)));
		}
		Ok(())
	}
}

pub trait Positionable: Send + Sync {
	fn position(&self) -> Position;
	fn set_position(&self, to: Position);
}

pub trait EventTarget: Send + Sync {
	fn dispatch(&self, event: InputEvent) -> Result<()>;
}

pub trait Element: Positionable + EventTarget {
	fn id(&self) -> &str;
	fn size(&self) -> Size;
	fn focus(&self);

	/// View this element as a bare positionable, e.g. to animate it.
	fn into_positionable(self: Arc<Self>) -> Arc<dyn Positionable>;

	fn center(&self) -> Position {
		center_of(self.position(), self.size())
	}
}

pub trait ElementLookup: Send + Sync {
	fn element(&self, id: &str) -> Result<Arc<dyn Element>>;
}

pub trait Page: ElementLookup {
	fn viewport(&self) -> Size;

	/// Create the element that represents the pointer on screen.
	fn create_cursor(&self, size: Size) -> Arc<dyn Element>;
}

// ============================================================================
// In-memory page
// ============================================================================

/// One event as received by an element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dispatched {
	pub target: String,
	pub event: InputEvent,
}

#[derive(Debug, Default)]
struct Journal {
	events: Mutex<Vec<Dispatched>>,
	focused: Mutex<Option<String>>,
}

#[derive(Debug)]
pub struct VirtualElement {
	id: String,
	position: Mutex<Position>,
	size: Size,
	journal: Arc<Journal>,
}

impl Positionable for VirtualElement {
	fn position(&self) -> Position {
		*self.position.lock()
	}

	fn set_position(&self, to: Position) {
		*self.position.lock() = to;
	}
}

impl EventTarget for VirtualElement {
	fn dispatch(&self, event: InputEvent) -> Result<()> {
		event.validate()?;
		trace!(element = %self.id, ?event, "dispatch");
		self.journal.events.lock().push(Dispatched { target: self.id.clone(), event });
		Ok(())
	}
}

impl Element for VirtualElement {
	fn id(&self) -> &str {
		&self.id
	}

	fn size(&self) -> Size {
		self.size
	}

	fn focus(&self) {
		*self.journal.focused.lock() = Some(self.id.clone());
	}

	fn into_positionable(self: Arc<Self>) -> Arc<dyn Positionable> {
		self
	}
}

/// Headless page that records every event it receives.
#[derive(Debug, Clone)]
pub struct VirtualPage {
	viewport: Size,
	elements: Arc<Mutex<HashMap<String, Arc<VirtualElement>>>>,
	journal: Arc<Journal>,
}

impl VirtualPage {
	pub const CURSOR_ID: &'static str = "cursor";

	pub fn new(viewport: Size) -> Self {
		Self {
			viewport,
			elements: Arc::new(Mutex::new(HashMap::new())),
			journal: Arc::new(Journal::default()),
		}
	}

	pub fn add_element(&self, id: impl Into<String>, origin: Position, size: Size) -> Arc<VirtualElement> {
		let id = id.into();
		let element = Arc::new(VirtualElement {
			id: id.clone(),
			position: Mutex::new(origin),
			size,
			journal: Arc::clone(&self.journal),
		});
		self.elements.lock().insert(id, Arc::clone(&element));
		element
	}

	pub fn events(&self) -> Vec<Dispatched> {
		self.journal.events.lock().clone()
	}

	pub fn events_for(&self, id: &str) -> Vec<InputEvent> {
		self.journal.events.lock().iter().filter(|d| d.target == id).map(|d| d.event).collect()
	}

	pub fn clear_events(&self) {
		self.journal.events.lock().clear();
	}

	pub fn focused(&self) -> Option<String> {
		self.journal.focused.lock().clone()
	}
}

impl ElementLookup for VirtualPage {
	fn element(&self, id: &str) -> Result<Arc<dyn Element>> {
		let element = self.elements.lock().get(id).cloned().ok_or_else(|| SceneError::ElementNotFound(id.to_string()))?;
		Ok(element)
	}
}

impl Page for VirtualPage {
	fn viewport(&self) -> Size {
		self.viewport
	}

	fn create_cursor(&self, size: Size) -> Arc<dyn Element> {
		self.add_element(Self::CURSOR_ID, Position::ORIGIN, size)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn lookup_and_journal() {
		let page = VirtualPage::new(Size::new(800, 600));
		page.add_element("button", Position::new(100, 100), Size::new(40, 20));

		let button = page.element("button").unwrap();
		assert_eq!(button.center(), Position::new(120, 110));

		button.dispatch(InputEvent::pointer(EventKind::Click, button.center())).unwrap();
		button.focus();

		assert_eq!(page.events_for("button"), vec![InputEvent::pointer(EventKind::Click, Position::new(120, 110))]);
		assert_eq!(page.focused().as_deref(), Some("button"));
	}

	#[test]
	fn unknown_element_is_reported() {
		let page = VirtualPage::new(Size::new(800, 600));
		assert!(matches!(page.element("nope"), Err(SceneError::ElementNotFound(id)) if id == "nope"));
	}

	#[test]
	fn events_without_required_fields_are_rejected() {
		let page = VirtualPage::new(Size::new(800, 600));
		let field = page.add_element("field", Position::ORIGIN, Size::new(10, 10));

		let pointer = InputEvent {
			kind: EventKind::MouseUp,
			position: None,
			key: None,
		};
		assert!(matches!(field.dispatch(pointer), Err(SceneError::MissingArgument(_))));

		let key = InputEvent {
			kind: EventKind::KeyPress,
			position: None,
			key: None,
		};
		assert!(matches!(field.dispatch(key), Err(SceneError::MissingArgument(_))));
		assert!(page.events().is_empty());
	}
}
