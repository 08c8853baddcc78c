use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Weak};
use tracing::{debug, error, info};

use crate::action::Action;
use crate::anim::{MotionConfig, MoveAnim};
use crate::click::Click;
use crate::error::Result;
use crate::geometry::{Position, Size};
use crate::lazy::{LazyDecorator, Scriptable};
use crate::observer::{Observer, Subscription};
use crate::page::{Element, EventKind, EventTarget, InputEvent, Page, Positionable};

/// Mouse operations, as recorded by a [`LazyDecorator`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum MouseCall {
	Center,
	Click { el: String },
	Drag { el: String, to: Position },
	SetPosition { to: Position },
	MouseDown { el: String, at: Position },
	MouseMove { el: String, at: Position },
	MouseUp { el: String, at: Position },
}

struct MouseInner {
	page: Arc<dyn Page>,
	cursor: Arc<dyn Element>,
	motion: MotionConfig,
	drag_motion: MotionConfig,
	ended: Observer<()>,
	/// Motion in flight, kept so it can be stopped and resumed.
	active: Mutex<Option<MoveAnim>>,
}

/// On-screen pointer that glides to elements before acting on them.
pub struct Mouse {
	inner: Arc<MouseInner>,
}

impl Mouse {
	pub const WIDTH: u32 = 16;
	pub const HEIGHT: u32 = 16;

	/// Create the cursor element at the page origin.
	pub fn new(page: Arc<dyn Page>, motion: MotionConfig, drag_motion: MotionConfig) -> Result<Self> {
		motion.validate()?;
		drag_motion.validate()?;

		let cursor = page.create_cursor(Size::new(Self::WIDTH, Self::HEIGHT));
		cursor.set_position(Position::ORIGIN);

		Ok(Self {
			inner: Arc::new(MouseInner {
				page,
				cursor,
				motion,
				drag_motion,
				ended: Observer::new(),
				active: Mutex::new(None),
			}),
		})
	}

	pub fn cursor(&self) -> &Arc<dyn Element> {
		&self.inner.cursor
	}

	pub fn position(&self) -> Position {
		self.inner.cursor.position()
	}

	pub fn set_position(&self, to: Position) {
		self.inner.cursor.set_position(to);
	}

	/// Put the cursor in the middle of the viewport.
	pub fn center(&self) {
		let viewport = self.inner.page.viewport();
		let x = centered(viewport.width, Self::WIDTH);
		let y = centered(viewport.height, Self::HEIGHT);
		self.set_position(Position::new(x, y));
		info!(at = %self.position(), "cursor centered");
		self.inner.ended.fire(&());
	}

	/// Glide to the element centre, then click it.
	pub fn click(&self, id: &str) -> Result<()> {
		let el = self.inner.page.element(id)?;
		let anim = MoveAnim::new(Arc::clone(&self.inner.cursor).into_positionable(), el.center(), self.inner.motion)?;

		let mouse = Arc::downgrade(&self.inner);
		anim.on_end(Some(Subscription::new(move |_: &()| {
			let Some(mouse) = mouse.upgrade() else { return };
			mouse.settle();
			if let Err(e) = Click::new(Arc::clone(&el)).start() {
				error!(element = el.id(), error = %e, "click failed");
			}
			mouse.ended.fire(&());
		})))?;

		info!(element = id, "gliding to click");
		self.run(anim)
	}

	/// Glide to the element, press, carry it to `to`, release.
	pub fn drag(&self, id: &str, to: Position) -> Result<()> {
		let el = self.inner.page.element(id)?;
		let approach = MoveAnim::new(Arc::clone(&self.inner.cursor).into_positionable(), el.center(), self.inner.motion)?;

		let mouse = Arc::downgrade(&self.inner);
		approach.on_end(Some(Subscription::new(move |_: &()| {
			let Some(mouse) = mouse.upgrade() else { return };
			if let Err(e) = MouseInner::carry(&mouse, &el, to) {
				error!(element = el.id(), error = %e, "drag failed");
				mouse.settle();
				mouse.ended.fire(&());
			}
		})))?;

		info!(element = id, %to, "gliding to drag");
		self.run(approach)
	}

	pub fn mouse_down(&self, id: &str, at: Position) -> Result<()> {
		self.inner.page.element(id)?.dispatch(InputEvent::pointer(EventKind::MouseDown, at))
	}

	pub fn mouse_up(&self, id: &str, at: Position) -> Result<()> {
		self.inner.page.element(id)?.dispatch(InputEvent::pointer(EventKind::MouseUp, at))
	}

	/// Move the cursor to `at` and tell the element about it.
	pub fn mouse_move(&self, id: &str, at: Position) -> Result<()> {
		let el = self.inner.page.element(id)?;
		self.set_position(at);
		el.dispatch(InputEvent::pointer(EventKind::MouseMove, at))
	}

	fn run(&self, anim: MoveAnim) -> Result<()> {
		MouseInner::run(&self.inner, anim)
	}
}

impl MouseInner {
	fn run(this: &Arc<Self>, anim: MoveAnim) -> Result<()> {
		let previous = this.active.lock().replace(anim.clone());
		if let Some(previous) = previous {
			previous.stop()?;
		}
		anim.start()
	}

	fn settle(&self) {
		self.active.lock().take();
	}

	/// Second half of a drag: the cursor is on the element.
	fn carry(this: &Arc<Self>, el: &Arc<dyn Element>, to: Position) -> Result<()> {
		let grab = this.cursor.position();
		el.dispatch(InputEvent::pointer(EventKind::MouseDown, grab))?;

		let origin = el.position();
		let (dx, dy) = (origin.x.saturating_sub(grab.x), origin.y.saturating_sub(grab.y));
		let walk = MoveAnim::new(Arc::clone(&this.cursor).into_positionable(), to, this.drag_motion)?;

		let target = Arc::clone(el);
		walk.on_move(Some(Subscription::new(move |at: &Position| {
			target.set_position(at.offset(dx, dy));
			if let Err(e) = target.dispatch(InputEvent::pointer(EventKind::MouseMove, *at)) {
				error!(element = target.id(), error = %e, "mouse move failed");
			}
		})));

		let target = Arc::clone(el);
		let mouse: Weak<Self> = Arc::downgrade(this);
		walk.on_end(Some(Subscription::new(move |_: &()| {
			let Some(mouse) = mouse.upgrade() else { return };
			mouse.settle();
			let at = mouse.cursor.position();
			if let Err(e) = target.dispatch(InputEvent::pointer(EventKind::MouseUp, at)) {
				error!(element = target.id(), error = %e, "mouse up failed");
			}
			debug!(element = target.id(), %at, "dropped");
			mouse.ended.fire(&());
		})))?;

		Self::run(this, walk)
	}
}

/// Offset that centres an extent of `inner` within `outer`, rounding halves up.
fn centered(outer: u32, inner: u32) -> i32 {
	let free = i64::from(outer) - i64::from(inner);
	i32::try_from((free + 1).div_euclid(2)).unwrap_or(i32::MAX)
}

impl Action for Mouse {
	/// Resume a stopped glide or drag.
	fn start(&self) -> Result<()> {
		let active = self.inner.active.lock().clone();
		match active {
			Some(anim) => anim.start(),
			None => {
				debug!("no motion to resume");
				Ok(())
			}
		}
	}

	/// Halt the current glide or drag without completing it.
	fn stop(&self) -> Result<()> {
		let active = self.inner.active.lock().clone();
		if let Some(anim) = active {
			anim.stop()?;
		}
		Ok(())
	}

	fn on_end(&self, item: Option<Subscription<()>>) -> Result<()> {
		self.inner.ended.subscribe(item);
		Ok(())
	}
}

impl Scriptable for Mouse {
	type Call = MouseCall;

	fn method(call: &MouseCall) -> &'static str {
		match call {
			MouseCall::Center => "center",
			MouseCall::Click { .. } => "click",
			MouseCall::Drag { .. } => "drag",
			MouseCall::SetPosition { .. } => "set_position",
			MouseCall::MouseDown { .. } => "mouse_down",
			MouseCall::MouseMove { .. } => "mouse_move",
			MouseCall::MouseUp { .. } => "mouse_up",
		}
	}

	fn invoke(&self, call: MouseCall) -> Result<()> {
		match call {
			MouseCall::Center => {
				self.center();
				Ok(())
			}
			MouseCall::Click { el } => self.click(&el),
			MouseCall::Drag { el, to } => self.drag(&el, to),
			MouseCall::SetPosition { to } => {
				self.set_position(to);
				Ok(())
			}
			MouseCall::MouseDown { el, at } => self.mouse_down(&el, at),
			MouseCall::MouseMove { el, at } => self.mouse_move(&el, at),
			MouseCall::MouseUp { el, at } => self.mouse_up(&el, at),
		}
	}
}

/// The methods a scripted mouse defers by default.
pub const MOUSE_SCRIPT_METHODS: [&str; 3] = ["center", "click", "drag"];

impl LazyDecorator<Mouse> {
	pub fn center(&self) -> Result<&Self> {
		self.call(MouseCall::Center)
	}

	pub fn click(&self, el: impl Into<String>) -> Result<&Self> {
		self.call(MouseCall::Click { el: el.into() })
	}

	pub fn drag(&self, el: impl Into<String>, to: Position) -> Result<&Self> {
		self.call(MouseCall::Drag { el: el.into(), to })
	}
}
