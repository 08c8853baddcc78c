use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::action::Action;
use crate::error::{Result, SceneError};
use crate::lazy::{LazyDecorator, Scriptable};
use crate::observer::{Observer, Subscription};
use crate::page::{Element, EventKind, EventTarget, InputEvent, Page};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum TypewriterCall {
	Type {
		el: String,
		text: String,
		#[serde(default)]
		interval_ms: Option<u64>,
	},
}

struct Job {
	el: Arc<dyn Element>,
	text: Vec<char>,
	typed: usize,
	interval: Duration,
	run: Option<CancellationToken>,
}

struct TypewriterInner {
	page: Arc<dyn Page>,
	interval_ms: u64,
	ended: Observer<()>,
	job: Mutex<Option<Job>>,
}

/// Types text into an element one key at a time.
pub struct Typewriter {
	inner: Arc<TypewriterInner>,
}

impl Typewriter {
	pub const DEFAULT_INTERVAL_MS: u64 = 300;

	pub fn new(page: Arc<dyn Page>, interval_ms: u64) -> Result<Self> {
		if interval_ms == 0 {
			return Err(SceneError::InvalidConfig("typing interval must be at least 1ms".to_string()));
		}
		Ok(Self {
			inner: Arc::new(TypewriterInner {
				page,
				interval_ms,
				ended: Observer::new(),
				job: Mutex::new(None),
			}),
		})
	}

	/// Focus the element and start typing `text` into it.
	///
	/// Replaces any unfinished text.
	pub fn type_text(&self, id: &str, text: &str, interval_ms: Option<u64>) -> Result<()> {
		if id.is_empty() {
			return Err(SceneError::missing("Node el is required"));
		}
		if text.is_empty() {
			return Err(SceneError::missing("Text is required"));
		}
		let interval_ms = interval_ms.unwrap_or(self.inner.interval_ms);
		if interval_ms == 0 {
			return Err(SceneError::InvalidConfig("typing interval must be at least 1ms".to_string()));
		}

		let el = self.inner.page.element(id)?;
		el.focus();

		let previous = self.inner.job.lock().replace(Job {
			el,
			text: text.chars().collect(),
			typed: 0,
			interval: Duration::from_millis(interval_ms),
			run: None,
		});
		if let Some(token) = previous.and_then(|job| job.run) {
			token.cancel();
		}

		info!(element = id, chars = text.chars().count(), "typing");
		TypewriterInner::resume(&self.inner)
	}

	/// Characters still to be typed.
	pub fn remaining(&self) -> usize {
		self.inner.job.lock().as_ref().map_or(0, |job| job.text.len() - job.typed)
	}
}

impl TypewriterInner {
	fn resume(this: &Arc<Self>) -> Result<()> {
		let handle = Handle::try_current().map_err(|e| SceneError::NoRuntime(e.to_string()))?;

		let (token, period) = {
			let mut job = this.job.lock();
			let Some(job) = job.as_mut() else {
				debug!("nothing to type");
				return Ok(());
			};
			if job.run.is_some() {
				return Ok(());
			}
			let token = CancellationToken::new();
			job.run = Some(token.clone());
			(token, job.interval)
		};

		handle.spawn(Self::run(Arc::clone(this), token, period));
		Ok(())
	}

	fn pause(&self) {
		let token = self.job.lock().as_mut().and_then(|job| job.run.take());
		if let Some(token) = token {
			token.cancel();
			debug!(remaining = self.job.lock().as_ref().map_or(0, |job| job.text.len() - job.typed), "typing paused");
		}
	}

	async fn run(this: Arc<Self>, token: CancellationToken, period: Duration) {
		let mut ticker = interval_at(Instant::now() + period, period);
		ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

		loop {
			tokio::select! {
				biased;

				() = token.cancelled() => break,

				_ = ticker.tick() => {
					let (el, key, done) = {
						let mut guard = this.job.lock();
						if token.is_cancelled() {
							break;
						}
						let Some(job) = guard.as_mut() else { break };
						let key = job.text[job.typed];
						job.typed += 1;
						let done = job.typed >= job.text.len();
						let el = Arc::clone(&job.el);
						if done {
							guard.take();
						}
						(el, key, done)
					};

					for kind in [EventKind::KeyDown, EventKind::KeyPress, EventKind::KeyUp] {
						if let Err(e) = el.dispatch(InputEvent::key(kind, key)) {
							error!(element = el.id(), error = %e, "key event failed");
						}
					}

					if done {
						info!(element = el.id(), "typing finished");
						this.ended.fire(&());
						break;
					}
				}
			}
		}
	}
}

impl Action for Typewriter {
	/// Resume typing where a `stop` left off.
	fn start(&self) -> Result<()> {
		TypewriterInner::resume(&self.inner)
	}

	/// Pause typing; the remaining text is kept for `start`.
	fn stop(&self) -> Result<()> {
		self.inner.pause();
		Ok(())
	}

	fn on_end(&self, item: Option<Subscription<()>>) -> Result<()> {
		self.inner.ended.subscribe(item);
		Ok(())
	}
}

impl Scriptable for Typewriter {
	type Call = TypewriterCall;

	fn method(call: &TypewriterCall) -> &'static str {
		match call {
			TypewriterCall::Type { .. } => "type",
		}
	}

	fn invoke(&self, call: TypewriterCall) -> Result<()> {
		match call {
			TypewriterCall::Type { el, text, interval_ms } => self.type_text(&el, &text, interval_ms),
		}
	}
}

pub const TYPEWRITER_SCRIPT_METHODS: [&str; 1] = ["type"];

impl LazyDecorator<Typewriter> {
	pub fn type_text(&self, el: impl Into<String>, text: impl Into<String>) -> Result<&Self> {
		self.call(TypewriterCall::Type {
			el: el.into(),
			text: text.into(),
			interval_ms: None,
		})
	}
}
