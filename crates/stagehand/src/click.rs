use std::sync::Arc;
use tracing::debug;

use crate::action::Action;
use crate::error::Result;
use crate::observer::{Observer, Subscription};
use crate::page::{Element, ElementLookup, EventKind, EventTarget, InputEvent};

/// A single synthetic click on an element.
pub struct Click {
	el: Arc<dyn Element>,
	ended: Observer<()>,
}

impl Click {
	pub fn new(el: Arc<dyn Element>) -> Self {
		Self { el, ended: Observer::new() }
	}

	pub fn on(page: &dyn ElementLookup, id: &str) -> Result<Self> {
		Ok(Self::new(page.element(id)?))
	}
}

impl Action for Click {
	/// Click the element centre, focus the element and report completion.
	fn start(&self) -> Result<()> {
		let at = self.el.center();
		self.el.dispatch(InputEvent::pointer(EventKind::Click, at))?;
		self.el.focus();
		debug!(element = self.el.id(), %at, "clicked");
		self.ended.fire(&());
		Ok(())
	}

	/// A click is instantaneous; there is nothing to stop.
	fn stop(&self) -> Result<()> {
		Ok(())
	}

	fn on_end(&self, item: Option<Subscription<()>>) -> Result<()> {
		self.ended.subscribe(item);
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::geometry::{Position, Size};
	use crate::page::VirtualPage;
	use parking_lot::Mutex;

	#[test]
	fn clicks_centre_focuses_and_ends() {
		let page = VirtualPage::new(Size::new(640, 480));
		page.add_element("ok", Position::new(10, 10), Size::new(20, 10));

		let click = Click::on(&page, "ok").unwrap();
		let ended = Arc::new(Mutex::new(false));
		let flag = Arc::clone(&ended);
		click.on_end(Some(Subscription::new(move |_| *flag.lock() = true))).unwrap();

		click.start().unwrap();
		assert_eq!(page.events_for("ok"), vec![InputEvent::pointer(EventKind::Click, Position::new(20, 15))]);
		assert_eq!(page.focused().as_deref(), Some("ok"));
		assert!(*ended.lock());
	}
}
