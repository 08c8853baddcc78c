use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Weak};
use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::action::LazyAction;
use crate::error::{Result, SceneError};
use crate::interface::{ensure_implements, LAZY_ACTION};
use crate::observer::{Observer, Subscription};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneStatus {
	Idle,
	Running,
	Paused,
	Completed,
	Failed,
}

impl SceneStatus {
	pub const fn is_terminal(self) -> bool {
		matches!(self, Self::Completed | Self::Failed)
	}
}

/// Observable snapshot of a scene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneState {
	pub name: String,
	pub status: SceneStatus,
	pub current: Option<usize>,
	pub total: usize,
	pub error: Option<String>,
}

// ============================================================================
// Pure FSM - validates transitions only
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
	Start,
	Stop,
	Finish,
	Fail,
}

fn transition(status: SceneStatus, cmd: Command) -> Result<SceneStatus> {
	use Command::*;
	use SceneStatus::*;

	Ok(match (status, cmd) {
		// Fresh run, rerun, or resume in place
		(Idle | Paused | Completed | Failed, Start) => Running,
		(Running, Start) => return Err(SceneError::AlreadyRunning),

		(Running | Paused, Stop) => Paused,
		(Idle | Completed | Failed, Stop) => status,

		(Running | Paused, Finish) => Completed,
		(Idle | Completed | Failed, Finish) => status,

		(_, Fail) => Failed,
	})
}

// ============================================================================
// Scene
// ============================================================================

struct Cursor {
	status: SceneStatus,
	current: Option<usize>,
	/// Index whose predecessor completed while the scene was paused.
	deferred: Option<usize>,
	/// Set while a launch loop is on the stack.
	launching: bool,
	/// Successor reported while `launching`; the loop picks it up.
	queued: Option<usize>,
	error: Option<String>,
}

struct SceneInner {
	name: String,
	actions: Box<[Arc<dyn LazyAction>]>,
	cursor: Mutex<Cursor>,
	ended: Observer<()>,
	state_tx: watch::Sender<SceneState>,
}

enum Entry {
	Fresh(usize),
	Resume(usize),
	Deferred(usize),
}

/// Runs lazy actions one after another, each started when the previous one
/// reports completion.
///
/// Cloning yields another handle to the same scene.
#[derive(Clone)]
pub struct Scene {
	inner: Arc<SceneInner>,
}

impl Scene {
	/// Build a scene, checking every action against the `LazyAction` interface.
	pub fn new(name: impl Into<String>, actions: Vec<Arc<dyn LazyAction>>) -> Result<Self> {
		for action in &actions {
			ensure_implements(action.as_ref(), &[&LAZY_ACTION])?;
		}

		let name = name.into();
		let total = actions.len();
		let (state_tx, _) = watch::channel(SceneState {
			name: name.clone(),
			status: SceneStatus::Idle,
			current: None,
			total,
			error: None,
		});

		info!(scene = %name, actions = total, "scene created");

		Ok(Self {
			inner: Arc::new(SceneInner {
				name,
				actions: actions.into_boxed_slice(),
				cursor: Mutex::new(Cursor {
					status: SceneStatus::Idle,
					current: None,
					deferred: None,
					launching: false,
					queued: None,
					error: None,
				}),
				ended: Observer::new(),
				state_tx,
			}),
		})
	}

	pub fn name(&self) -> &str {
		&self.inner.name
	}

	pub fn len(&self) -> usize {
		self.inner.actions.len()
	}

	pub fn is_empty(&self) -> bool {
		self.inner.actions.is_empty()
	}

	/// Run from `index` (default 0), or resume the paused action in place.
	///
	/// An out-of-range index fails before anything changes.
	pub fn start(&self, index: Option<usize>) -> Result<()> {
		let entry = {
			let mut cursor = self.inner.cursor.lock();
			let status = transition(cursor.status, Command::Start)?;

			let entry = match (cursor.status, cursor.current) {
				(SceneStatus::Paused, Some(current)) => cursor.deferred.take().map_or(Entry::Resume(current), Entry::Deferred),
				_ => {
					let index = index.unwrap_or(0);
					if index >= self.len() {
						return Err(SceneError::IndexOutOfRange { index, len: self.len() });
					}
					cursor.error = None;
					Entry::Fresh(index)
				}
			};

			cursor.status = status;
			self.publish(&cursor);
			entry
		};

		match entry {
			Entry::Fresh(index) => {
				info!(scene = %self.inner.name, index, "scene started");
				self.run_action(index)
			}
			Entry::Deferred(index) => {
				info!(scene = %self.inner.name, index, "scene resumed at next action");
				self.run_action(index)
			}
			Entry::Resume(index) => {
				info!(scene = %self.inner.name, index, "scene resumed");
				let result = self.inner.actions[index].start();
				if let Err(e) = &result {
					self.fail(index, e);
				}
				result
			}
		}
	}

	/// Pause the scene and stop the active action.
	///
	/// Stopping a scene that never started, already finished, or is already
	/// paused does nothing.
	pub fn stop(&self) -> Result<()> {
		let active = {
			let mut cursor = self.inner.cursor.lock();
			let was = cursor.status;
			cursor.status = transition(was, Command::Stop)?;
			if was == SceneStatus::Running {
				self.publish(&cursor);
				cursor.current
			} else {
				debug!(scene = %self.inner.name, status = ?was, "nothing to stop");
				None
			}
		};

		if let Some(index) = active {
			info!(scene = %self.inner.name, index, "scene paused");
			self.inner.actions[index].stop()?;
		}
		Ok(())
	}

	/// Subscribe to the end of the scene; `None` clears subscriptions.
	pub fn on_end(&self, item: Option<Subscription<()>>) {
		self.inner.ended.subscribe(item);
	}

	pub fn subscribe(&self) -> watch::Receiver<SceneState> {
		self.inner.state_tx.subscribe()
	}

	pub fn state(&self) -> SceneState {
		self.inner.state_tx.borrow().clone()
	}

	pub fn status(&self) -> SceneStatus {
		self.inner.cursor.lock().status
	}

	pub fn current_index(&self) -> Option<usize> {
		self.inner.cursor.lock().current
	}

	/// Wait until the scene completes or fails.
	pub async fn finished(&self) -> SceneState {
		let mut rx = self.subscribe();
		let done = rx.wait_for(|state| state.status.is_terminal()).await.map(|state| state.clone());
		done.unwrap_or_else(|_| self.state())
	}

	fn publish(&self, cursor: &Cursor) {
		self.inner.state_tx.send_replace(SceneState {
			name: self.inner.name.clone(),
			status: cursor.status,
			current: cursor.current,
			total: self.len(),
			error: cursor.error.clone(),
		});
	}

	/// Launch `first`, then every successor that completes synchronously.
	///
	/// Completions that arrive while a launch is on the stack only record the
	/// next index, so a chain of instant actions runs in a loop instead of
	/// nesting one call per action.
	fn run_action(&self, first: usize) -> Result<()> {
		{
			let mut cursor = self.inner.cursor.lock();
			if cursor.launching {
				cursor.queued = Some(first);
				return Ok(());
			}
			cursor.launching = true;
		}

		let mut index = first;
		loop {
			if let Err(e) = self.launch(index) {
				self.fail(index, &e);
				return Err(e);
			}

			let mut cursor = self.inner.cursor.lock();
			let Some(next) = cursor.queued.take() else {
				cursor.launching = false;
				return Ok(());
			};
			match cursor.status {
				SceneStatus::Running => index = next,
				SceneStatus::Paused => {
					cursor.deferred = Some(next);
					cursor.launching = false;
					return Ok(());
				}
				_ => {
					cursor.launching = false;
					return Ok(());
				}
			}
		}
	}

	fn launch(&self, index: usize) -> Result<()> {
		let action = &self.inner.actions[index];
		action.on_end(None)?;

		let scene = Arc::downgrade(&self.inner);
		let next = index + 1;
		let advance = if next < self.len() {
			Subscription::new(move |_: &()| {
				if let Some(scene) = upgrade(&scene) {
					scene.advance(next);
				}
			})
		} else {
			Subscription::new(move |_: &()| {
				if let Some(scene) = upgrade(&scene) {
					scene.finish();
				}
			})
		};
		action.on_end(Some(advance))?;

		{
			let mut cursor = self.inner.cursor.lock();
			cursor.current = Some(index);
			self.publish(&cursor);
		}

		debug!(scene = %self.inner.name, index, "action started");
		action.next()
	}

	fn advance(&self, next: usize) {
		let proceed = {
			let mut cursor = self.inner.cursor.lock();
			match cursor.status {
				SceneStatus::Running if cursor.launching => {
					cursor.queued = Some(next);
					return;
				}
				SceneStatus::Running => true,
				SceneStatus::Paused => {
					cursor.deferred = Some(next);
					false
				}
				_ => false,
			}
		};

		if !proceed {
			debug!(scene = %self.inner.name, next, "advance deferred or ignored");
			return;
		}

		// Failures land in the published state; there is no caller to return them to.
		let _ = self.run_action(next);
	}

	fn finish(&self) {
		let completed = {
			let mut cursor = self.inner.cursor.lock();
			let was = cursor.status;
			match transition(was, Command::Finish) {
				Ok(SceneStatus::Completed) if was != SceneStatus::Completed => {
					cursor.status = SceneStatus::Completed;
					self.publish(&cursor);
					true
				}
				_ => false,
			}
		};

		if completed {
			info!(scene = %self.inner.name, "scene completed");
			self.inner.ended.fire(&());
		}
	}

	fn fail(&self, index: usize, err: &SceneError) {
		let mut cursor = self.inner.cursor.lock();
		if let Ok(status) = transition(cursor.status, Command::Fail) {
			cursor.status = status;
		}
		cursor.error = Some(err.to_string());
		cursor.launching = false;
		cursor.queued = None;
		self.publish(&cursor);
		error!(scene = %self.inner.name, index, error = %err, "scene failed");
	}
}

fn upgrade(scene: &Weak<SceneInner>) -> Option<Scene> {
	scene.upgrade().map(|inner| Scene { inner })
}

impl fmt::Debug for Scene {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let cursor = self.inner.cursor.lock();
		f.debug_struct("Scene")
			.field("name", &self.inner.name)
			.field("actions", &self.len())
			.field("status", &cursor.status)
			.field("current", &cursor.current)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn start_is_rejected_while_running() {
		assert!(matches!(transition(SceneStatus::Running, Command::Start), Err(SceneError::AlreadyRunning)));
		assert_eq!(transition(SceneStatus::Paused, Command::Start).unwrap(), SceneStatus::Running);
		assert_eq!(transition(SceneStatus::Completed, Command::Start).unwrap(), SceneStatus::Running);
	}

	#[test]
	fn stop_is_idempotent_outside_running() {
		for status in [SceneStatus::Idle, SceneStatus::Paused, SceneStatus::Completed, SceneStatus::Failed] {
			assert_eq!(transition(status, Command::Stop).unwrap(), status);
		}
		assert_eq!(transition(SceneStatus::Running, Command::Stop).unwrap(), SceneStatus::Paused);
	}

	#[test]
	fn finish_only_completes_live_scenes() {
		assert_eq!(transition(SceneStatus::Running, Command::Finish).unwrap(), SceneStatus::Completed);
		assert_eq!(transition(SceneStatus::Paused, Command::Finish).unwrap(), SceneStatus::Completed);
		assert_eq!(transition(SceneStatus::Idle, Command::Finish).unwrap(), SceneStatus::Idle);
	}
}
