//! Stepped linear cursor motion.
//!
//! The dominant axis advances by a fixed step per tick. The other axis
//! advances by the same step scaled by the slope, with the fractional
//! remainder carried between ticks so shallow diagonals do not drift.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::action::Action;
use crate::error::{Result, SceneError};
use crate::geometry::Position;
use crate::observer::{Observer, Subscription};
use crate::page::Positionable;

/// Step size and tick period of a motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotionConfig {
	/// Pixels per tick along the dominant axis.
	pub step: i32,
	pub interval_ms: u64,
}

impl MotionConfig {
	pub const DEFAULT_STEP: i32 = 4;
	pub const DEFAULT_INTERVAL_MS: u64 = 20;

	pub const fn new(step: i32, interval_ms: u64) -> Self {
		Self { step, interval_ms }
	}

	pub const fn with_step(mut self, step: i32) -> Self {
		self.step = step;
		self
	}

	pub const fn with_interval(mut self, interval_ms: u64) -> Self {
		self.interval_ms = interval_ms;
		self
	}

	pub const fn interval(&self) -> Duration {
		Duration::from_millis(self.interval_ms)
	}

	pub fn validate(&self) -> Result<()> {
		if self.step <= 0 {
			return Err(SceneError::InvalidConfig(format!("motion step must be positive, got {}", self.step)));
		}
		if self.interval_ms == 0 {
			return Err(SceneError::InvalidConfig("motion interval must be at least 1ms".to_string()));
		}
		Ok(())
	}
}

impl Default for MotionConfig {
	fn default() -> Self {
		Self::new(Self::DEFAULT_STEP, Self::DEFAULT_INTERVAL_MS)
	}
}

// ============================================================================
// Path - pure per-tick geometry
// ============================================================================

#[derive(Debug, Clone)]
pub(crate) struct Path {
	start: Position,
	end: Position,
	sign_x: i64,
	sign_y: i64,
	delta_x: i64,
	delta_y: i64,
	step: i64,
	travelled: i64,
	secondary: i64,
	carry: i64,
}

impl Path {
	pub(crate) fn new(start: Position, end: Position, step: i32) -> Self {
		let dx = i64::from(end.x) - i64::from(start.x);
		let dy = i64::from(end.y) - i64::from(start.y);
		Self {
			start,
			end,
			sign_x: if dx < 0 { -1 } else { 1 },
			sign_y: if dy < 0 { -1 } else { 1 },
			delta_x: dx.abs(),
			delta_y: dy.abs(),
			step: i64::from(step),
			travelled: 0,
			secondary: 0,
			carry: 0,
		}
	}

	const fn x_dominant(&self) -> bool {
		self.delta_x >= self.delta_y
	}

	const fn primary_delta(&self) -> i64 {
		if self.x_dominant() {
			self.delta_x
		} else {
			self.delta_y
		}
	}

	const fn secondary_delta(&self) -> i64 {
		if self.x_dominant() {
			self.delta_y
		} else {
			self.delta_x
		}
	}

	pub(crate) const fn arrived(&self) -> bool {
		self.travelled >= self.primary_delta()
	}

	pub(crate) fn current(&self) -> Position {
		let (along_x, along_y) = if self.x_dominant() { (self.travelled, self.secondary) } else { (self.secondary, self.travelled) };
		Position::new(clamp_axis(self.start.x, self.end.x, self.sign_x, along_x), clamp_axis(self.start.y, self.end.y, self.sign_y, along_y))
	}

	/// Move one tick and return the new position.
	///
	/// A zero-length path arrives on its first tick.
	pub(crate) fn advance(&mut self) -> Position {
		let primary = self.primary_delta();
		if primary == 0 {
			return self.end;
		}

		let stride = self.step.min(primary - self.travelled).max(0);
		self.travelled += stride;
		self.carry += stride * self.secondary_delta();
		self.secondary = (self.secondary + self.carry / primary).min(self.secondary_delta());
		self.carry %= primary;

		self.current()
	}

	pub(crate) const fn destination(&self) -> Position {
		self.end
	}
}

/// Offset `start` by `distance` in direction `sign`, never crossing `end`.
fn clamp_axis(start: i32, end: i32, sign: i64, distance: i64) -> i32 {
	let candidate = i64::from(start) + sign * distance;
	let end = i64::from(end);
	let clamped = if sign > 0 { candidate.min(end) } else { candidate.max(end) };
	i32::try_from(clamped).unwrap_or(if sign > 0 { i32::MAX } else { i32::MIN })
}

// ============================================================================
// MoveAnim
// ============================================================================

struct AnimState {
	path: Path,
	run: Option<CancellationToken>,
}

struct AnimInner {
	target: Arc<dyn Positionable>,
	motion: MotionConfig,
	state: Mutex<AnimState>,
	started: Observer<Position>,
	moved: Observer<Position>,
	ended: Observer<()>,
}

/// Animates a positionable target towards a destination, one tick at a time.
///
/// Cloning yields another handle to the same animation.
#[derive(Clone)]
pub struct MoveAnim {
	inner: Arc<AnimInner>,
}

impl MoveAnim {
	pub fn builder() -> MoveAnimBuilder {
		MoveAnimBuilder::default()
	}

	pub fn new(target: Arc<dyn Positionable>, to: Position, motion: MotionConfig) -> Result<Self> {
		Self::builder().target(target).to(to).motion(motion).build()
	}

	/// Subscribe to the start notification, fired with the position at `start`.
	pub fn on_start(&self, item: Option<Subscription<Position>>) {
		self.inner.started.subscribe(item);
	}

	/// Subscribe to per-tick notifications, fired with the new position.
	pub fn on_move(&self, item: Option<Subscription<Position>>) {
		self.inner.moved.subscribe(item);
	}

	pub fn position(&self) -> Position {
		self.inner.state.lock().path.current()
	}

	pub fn destination(&self) -> Position {
		self.inner.state.lock().path.destination()
	}

	pub fn is_running(&self) -> bool {
		self.inner.state.lock().run.is_some()
	}

	pub fn is_finished(&self) -> bool {
		self.inner.state.lock().path.arrived()
	}

	async fn run(inner: Arc<AnimInner>, token: CancellationToken) {
		let period = inner.motion.interval();
		let mut ticker = interval_at(Instant::now() + period, period);
		ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

		loop {
			tokio::select! {
				biased;

				() = token.cancelled() => break,

				_ = ticker.tick() => {
					let (at, arrived) = {
						let mut state = inner.state.lock();
						if token.is_cancelled() {
							break;
						}
						let at = state.path.advance();
						inner.target.set_position(at);
						let arrived = state.path.arrived();
						if arrived {
							state.run = None;
						}
						(at, arrived)
					};

					inner.moved.fire(&at);

					if arrived {
						debug!(%at, "move animation arrived");
						inner.ended.fire(&());
						break;
					}
				}
			}
		}
	}
}

impl Action for MoveAnim {
	/// Begin ticking. The start notification fires before this returns.
	///
	/// Starting a running animation does nothing; starting a stopped one
	/// resumes it from where it stopped.
	fn start(&self) -> Result<()> {
		let handle = Handle::try_current().map_err(|e| SceneError::NoRuntime(e.to_string()))?;

		let token = {
			let mut state = self.inner.state.lock();
			if state.run.is_some() {
				debug!("move animation already running");
				return Ok(());
			}
			let token = CancellationToken::new();
			state.run = Some(token.clone());
			token
		};

		let at = self.inner.target.position();
		debug!(from = %at, to = %self.destination(), "move animation started");
		self.inner.started.fire(&at);

		handle.spawn(Self::run(Arc::clone(&self.inner), token));
		Ok(())
	}

	/// Cancel the pending tick. No further notifications fire.
	fn stop(&self) -> Result<()> {
		if let Some(token) = self.inner.state.lock().run.take() {
			token.cancel();
			debug!("move animation stopped");
		}
		Ok(())
	}

	fn on_end(&self, item: Option<Subscription<()>>) -> Result<()> {
		self.inner.ended.subscribe(item);
		Ok(())
	}
}

impl fmt::Debug for MoveAnim {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let state = self.inner.state.lock();
		f.debug_struct("MoveAnim")
			.field("position", &state.path.current())
			.field("destination", &state.path.destination())
			.field("running", &state.run.is_some())
			.field("motion", &self.inner.motion)
			.finish()
	}
}

#[derive(Default)]
pub struct MoveAnimBuilder {
	target: Option<Arc<dyn Positionable>>,
	to: Option<Position>,
	motion: MotionConfig,
}

impl MoveAnimBuilder {
	pub fn target(mut self, target: Arc<dyn Positionable>) -> Self {
		self.target = Some(target);
		self
	}

	pub const fn to(mut self, to: Position) -> Self {
		self.to = Some(to);
		self
	}

	pub const fn motion(mut self, motion: MotionConfig) -> Self {
		self.motion = motion;
		self
	}

	/// Capture the target's current position as the starting point.
	pub fn build(self) -> Result<MoveAnim> {
		let target = self.target.ok_or_else(|| SceneError::missing("MoveAnim: node is required"))?;
		let to = self.to.ok_or_else(|| SceneError::missing("MoveAnim: destination coordinates are required"))?;
		self.motion.validate()?;

		let path = Path::new(target.position(), to, self.motion.step);
		Ok(MoveAnim {
			inner: Arc::new(AnimInner {
				target,
				motion: self.motion,
				state: Mutex::new(AnimState { path, run: None }),
				started: Observer::new(),
				moved: Observer::new(),
				ended: Observer::new(),
			}),
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicUsize, Ordering};
	use tokio::sync::oneshot;
	use tokio::time::{sleep, timeout};

	struct Dot(Mutex<Position>);

	impl Positionable for Dot {
		fn position(&self) -> Position {
			*self.0.lock()
		}

		fn set_position(&self, to: Position) {
			*self.0.lock() = to;
		}
	}

	fn dot(x: i32, y: i32) -> Arc<Dot> {
		Arc::new(Dot(Mutex::new(Position::new(x, y))))
	}

	fn walk(start: Position, end: Position, step: i32) -> Vec<Position> {
		let mut path = Path::new(start, end, step);
		let mut seen = vec![path.advance()];
		while !path.arrived() {
			seen.push(path.advance());
			assert!(seen.len() < 10_000, "path never arrived");
		}
		seen
	}

	fn end_signal(anim: &MoveAnim) -> oneshot::Receiver<()> {
		let (tx, rx) = oneshot::channel();
		let tx = Mutex::new(Some(tx));
		anim.on_end(Some(Subscription::new(move |_| {
			if let Some(tx) = tx.lock().take() {
				let _ = tx.send(());
			}
		})))
		.unwrap();
		rx
	}

	const FAST: MotionConfig = MotionConfig::new(4, 1);

	#[test]
	fn horizontal_path_is_monotonic_and_exact() {
		let steps = walk(Position::ORIGIN, Position::new(100, 0), 4);
		assert_eq!(steps.len(), 25);
		assert_eq!(*steps.last().unwrap(), Position::new(100, 0));
		assert!(steps.windows(2).all(|w| w[1].x > w[0].x && w[1].x <= 100 && w[1].y == 0));
	}

	#[test]
	fn uneven_step_is_clamped_at_destination() {
		let steps = walk(Position::new(0, 0), Position::new(10, 0), 4);
		assert_eq!(steps, vec![Position::new(4, 0), Position::new(8, 0), Position::new(10, 0)]);
	}

	#[test]
	fn shallow_diagonal_tracks_true_slope() {
		let steps = walk(Position::ORIGIN, Position::new(300, 7), 4);
		assert_eq!(*steps.last().unwrap(), Position::new(300, 7));
		for p in &steps {
			let exact = i64::from(p.x) * 7 / 300;
			assert_eq!(i64::from(p.y), exact, "drifted at {p}");
		}
	}

	#[test]
	fn vertical_and_negative_moves_use_dominant_axis() {
		let steps = walk(Position::new(50, 200), Position::new(40, 0), 4);
		assert_eq!(steps.len(), 50);
		assert_eq!(*steps.last().unwrap(), Position::new(40, 0));
		assert!(steps.windows(2).all(|w| w[1].y < w[0].y && w[1].x <= w[0].x && w[1].x >= 40));
	}

	#[test]
	fn zero_length_path_arrives_on_first_tick() {
		let mut path = Path::new(Position::new(5, 5), Position::new(5, 5), 4);
		assert!(path.arrived());
		assert_eq!(path.advance(), Position::new(5, 5));
	}

	#[test]
	fn builder_requires_target_and_destination() {
		let missing_target = MoveAnim::builder().to(Position::new(1, 1)).build();
		assert!(matches!(missing_target, Err(SceneError::MissingArgument(msg)) if msg.contains("node")));

		let missing_to = MoveAnim::builder().target(dot(0, 0)).build();
		assert!(matches!(missing_to, Err(SceneError::MissingArgument(msg)) if msg.contains("destination")));

		let bad_step = MoveAnim::new(dot(0, 0), Position::new(1, 1), MotionConfig::new(0, 20));
		assert!(matches!(bad_step, Err(SceneError::InvalidConfig(_))));
	}

	#[tokio::test]
	async fn reaches_destination_and_ends_once() {
		let target = dot(0, 0);
		let anim = MoveAnim::new(target.clone(), Position::new(100, 0), FAST).unwrap();

		let moves = Arc::new(Mutex::new(Vec::new()));
		let sink = Arc::clone(&moves);
		anim.on_move(Some(Subscription::new(move |p: &Position| sink.lock().push(*p))));

		let ends = Arc::new(AtomicUsize::new(0));
		let counter = Arc::clone(&ends);
		anim.on_end(Some(Subscription::new(move |_| {
			counter.fetch_add(1, Ordering::SeqCst);
		})))
		.unwrap();
		let done = end_signal(&anim);

		anim.start().unwrap();
		timeout(Duration::from_secs(5), done).await.unwrap().unwrap();
		sleep(Duration::from_millis(20)).await;

		assert_eq!(target.position(), Position::new(100, 0));
		assert_eq!(ends.load(Ordering::SeqCst), 1);
		assert!(!anim.is_running());

		let moves = moves.lock();
		assert_eq!(moves.len(), 25);
		assert!(moves.windows(2).all(|w| w[1].x > w[0].x && w[1].x <= 100));
	}

	#[tokio::test]
	async fn start_notification_is_synchronous() {
		let anim = MoveAnim::new(dot(3, 4), Position::new(30, 4), FAST).unwrap();
		let seen = Arc::new(Mutex::new(None));
		let sink = Arc::clone(&seen);
		anim.on_start(Some(Subscription::new(move |p: &Position| *sink.lock() = Some(*p))));

		anim.start().unwrap();
		assert_eq!(*seen.lock(), Some(Position::new(3, 4)));
		anim.stop().unwrap();
	}

	#[tokio::test]
	async fn zero_length_move_completes_without_hanging() {
		let anim = MoveAnim::new(dot(7, 7), Position::new(7, 7), FAST).unwrap();
		let done = end_signal(&anim);
		anim.start().unwrap();
		timeout(Duration::from_secs(1), done).await.unwrap().unwrap();
	}

	#[tokio::test]
	async fn stop_suppresses_completion_and_start_resumes() {
		let target = dot(0, 0);
		let anim = MoveAnim::new(target.clone(), Position::new(400, 0), MotionConfig::new(4, 5)).unwrap();
		let mut done = end_signal(&anim);

		anim.start().unwrap();
		sleep(Duration::from_millis(30)).await;
		anim.stop().unwrap();
		anim.stop().unwrap();

		let halted = target.position();
		sleep(Duration::from_millis(40)).await;
		assert_eq!(target.position(), halted);
		assert!(halted.x < 400);
		assert!(done.try_recv().is_err());

		anim.start().unwrap();
		timeout(Duration::from_secs(5), done).await.unwrap().unwrap();
		assert_eq!(target.position(), Position::new(400, 0));
	}

	#[test]
	fn start_outside_runtime_is_an_error() {
		let anim = MoveAnim::new(dot(0, 0), Position::new(1, 0), FAST).unwrap();
		assert!(matches!(anim.start(), Err(SceneError::NoRuntime(_))));
	}
}
