use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::action::LazyAction;
use crate::config::Config;
use crate::error::{Result, SceneError};
use crate::geometry::{Position, Size};
use crate::lazy::LazyDecorator;
use crate::mouse::{Mouse, MouseCall, MOUSE_SCRIPT_METHODS};
use crate::page::{Page, VirtualPage};
use crate::scene::Scene;
use crate::typewriter::{Typewriter, TypewriterCall, TYPEWRITER_SCRIPT_METHODS};

/// One scripted step, tagged by `call`.
///
/// Fields are optional on the wire so a malformed step is reported by name
/// instead of as a parse error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum Step {
	Center,
	Click {
		#[serde(default)]
		el: Option<String>,
	},
	Drag {
		#[serde(default)]
		el: Option<String>,
		#[serde(default)]
		to: Option<Position>,
	},
	Type {
		#[serde(default)]
		el: Option<String>,
		#[serde(default)]
		text: Option<String>,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		interval_ms: Option<u64>,
	},
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneScript {
	pub name: String,
	pub steps: Vec<Step>,
}

impl SceneScript {
	pub fn from_json(json: &str) -> Result<Self> {
		Ok(serde_json::from_str(json)?)
	}

	pub fn load(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref();
		let script = Self::from_json(&std::fs::read_to_string(path)?)?;
		info!(path = %path.display(), steps = script.steps.len(), "script loaded");
		Ok(script)
	}

	/// Drag both demo boxes across the page.
	pub fn drag_and_drop_demo() -> Self {
		Self {
			name: "drag&drop demo".to_string(),
			steps: vec![
				Step::Center,
				Step::Drag {
					el: Some("dd".to_string()),
					to: Some(Position::new(300, 200)),
				},
				Step::Drag {
					el: Some("dd2".to_string()),
					to: Some(Position::new(10, 10)),
				},
			],
		}
	}

	/// Search for a country and press the button.
	pub fn search_demo() -> Self {
		Self {
			name: "demo scene".to_string(),
			steps: vec![
				Step::Center,
				Step::Click { el: Some("search".to_string()) },
				Step::Type {
					el: Some("search".to_string()),
					text: Some("Poland".to_string()),
					interval_ms: None,
				},
				Step::Click { el: Some("button1".to_string()) },
			],
		}
	}
}

/// The page the built-in demos expect.
pub fn demo_page(viewport: Size) -> VirtualPage {
	let page = VirtualPage::new(viewport);
	page.add_element("search", Position::new(40, 40), Size::new(240, 24));
	page.add_element("button1", Position::new(300, 40), Size::new(80, 24));
	page.add_element("dd", Position::new(120, 320), Size::new(60, 60));
	page.add_element("dd2", Position::new(640, 480), Size::new(60, 60));
	page
}

enum Actor {
	Mouse(MouseCall),
	Typist(TypewriterCall),
}

/// A page with a scripted mouse and typewriter, ready to compile scenes.
pub struct Stage {
	page: Arc<dyn Page>,
	mouse: Arc<LazyDecorator<Mouse>>,
	typist: Arc<LazyDecorator<Typewriter>>,
}

impl Stage {
	pub fn new(page: Arc<dyn Page>, config: &Config) -> Result<Self> {
		config.validate()?;
		let mouse = Mouse::new(Arc::clone(&page), config.motion(), config.drag_motion())?;
		let typist = Typewriter::new(Arc::clone(&page), config.type_interval_ms)?;

		Ok(Self {
			page,
			mouse: Arc::new(LazyDecorator::new(mouse, MOUSE_SCRIPT_METHODS)),
			typist: Arc::new(LazyDecorator::new(typist, TYPEWRITER_SCRIPT_METHODS)),
		})
	}

	pub fn page(&self) -> &Arc<dyn Page> {
		&self.page
	}

	pub fn mouse(&self) -> &Arc<LazyDecorator<Mouse>> {
		&self.mouse
	}

	pub fn typist(&self) -> &Arc<LazyDecorator<Typewriter>> {
		&self.typist
	}

	/// Queue every step on its actor and return the scene that replays them.
	///
	/// Nothing is queued unless every step is well formed.
	pub fn compile(&self, script: &SceneScript) -> Result<Scene> {
		let calls = script.steps.iter().map(resolve).collect::<Result<Vec<_>>>()?;

		let mouse: Arc<dyn LazyAction> = self.mouse.clone();
		let typist: Arc<dyn LazyAction> = self.typist.clone();

		let mut actions = Vec::with_capacity(calls.len());
		for call in calls {
			match call {
				Actor::Mouse(call) => {
					self.mouse.call(call)?;
					actions.push(Arc::clone(&mouse));
				}
				Actor::Typist(call) => {
					self.typist.call(call)?;
					actions.push(Arc::clone(&typist));
				}
			}
		}

		debug!(scene = %script.name, steps = actions.len(), "script compiled");
		Scene::new(script.name.clone(), actions)
	}
}

fn resolve(step: &Step) -> Result<Actor> {
	Ok(match step.clone() {
		Step::Center => Actor::Mouse(MouseCall::Center),
		Step::Click { el } => Actor::Mouse(MouseCall::Click {
			el: required(el, "click: el is required")?,
		}),
		Step::Drag { el, to } => Actor::Mouse(MouseCall::Drag {
			el: required(el, "drag: el is required")?,
			to: to.ok_or_else(|| SceneError::missing("drag: destination coordinates are required"))?,
		}),
		Step::Type { interval_ms: Some(0), .. } => {
			return Err(SceneError::InvalidConfig("type: interval_ms must be at least 1".to_string()));
		}
		Step::Type { el, text, interval_ms } => Actor::Typist(TypewriterCall::Type {
			el: required(el, "Node el is required")?,
			text: required(text, "Text is required")?,
			interval_ms,
		}),
	})
}

fn required(value: Option<String>, message: &str) -> Result<String> {
	value.filter(|v| !v.is_empty()).ok_or_else(|| SceneError::missing(message))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::page::{ElementLookup, EventKind, Positionable};
	use crate::scene::SceneStatus;
	use std::time::Duration;
	use tokio::time::timeout;

	fn stage() -> (VirtualPage, Stage) {
		let page = demo_page(Size::new(1024, 768));
		let stage = Stage::new(Arc::new(page.clone()), &Config::test()).unwrap();
		(page, stage)
	}

	#[test]
	fn parses_tagged_steps() {
		let script = SceneScript::from_json(
			r#"{
				"name": "json scene",
				"steps": [
					{ "call": "center" },
					{ "call": "click", "el": "search" },
					{ "call": "type", "el": "search", "text": "Poland", "interval_ms": 5 },
					{ "call": "drag", "el": "dd", "to": { "x": 300, "y": 200 } }
				]
			}"#,
		)
		.unwrap();

		assert_eq!(script.steps.len(), 4);
		assert_eq!(
			script.steps[2],
			Step::Type {
				el: Some("search".to_string()),
				text: Some("Poland".to_string()),
				interval_ms: Some(5),
			}
		);
		assert!(matches!(SceneScript::from_json("{\"name\": 1}"), Err(SceneError::Json(_))));
	}

	#[test]
	fn malformed_steps_queue_nothing() {
		let (_, stage) = stage();
		let script = SceneScript::from_json(r#"{ "name": "bad", "steps": [ { "call": "center" }, { "call": "drag", "el": "dd" } ] }"#).unwrap();

		assert!(matches!(stage.compile(&script), Err(SceneError::MissingArgument(_))));
		assert_eq!(stage.mouse().pending(), 0);

		let script = SceneScript::from_json(
			r#"{ "name": "frozen", "steps": [
				{ "call": "click", "el": "search" },
				{ "call": "type", "el": "search", "text": "Poland", "interval_ms": 0 }
			] }"#,
		)
		.unwrap();
		assert!(matches!(stage.compile(&script), Err(SceneError::InvalidConfig(_))));
		assert_eq!(stage.mouse().pending(), 0);
		assert_eq!(stage.typist().pending(), 0);
	}

	#[test]
	fn compile_queues_one_call_per_step() {
		let (_, stage) = stage();
		let scene = stage.compile(&SceneScript::search_demo()).unwrap();

		assert_eq!(scene.len(), 4);
		assert_eq!(stage.mouse().pending(), 3);
		assert_eq!(stage.typist().pending(), 1);
	}

	#[tokio::test]
	async fn drag_and_drop_demo_runs_to_completion() {
		let (page, stage) = stage();
		let scene = stage.compile(&SceneScript::drag_and_drop_demo()).unwrap();

		scene.start(None).unwrap();
		let state = timeout(Duration::from_secs(10), scene.finished()).await.unwrap();

		assert_eq!(state.status, SceneStatus::Completed);
		assert_eq!(stage.mouse().inner().position(), Position::new(10, 10));
		assert_eq!(page.element("dd").unwrap().position(), Position::new(270, 170));
		assert_eq!(page.element("dd2").unwrap().position(), Position::new(-20, -20));
		assert_eq!(stage.mouse().pending(), 0);
	}

	#[tokio::test]
	async fn search_demo_types_into_the_focused_field() {
		let (page, stage) = stage();
		let scene = stage.compile(&SceneScript::search_demo()).unwrap();

		scene.start(None).unwrap();
		let state = timeout(Duration::from_secs(10), scene.finished()).await.unwrap();
		assert_eq!(state.status, SceneStatus::Completed);

		let typed: String = page.events_for("search").iter().filter(|e| e.kind == EventKind::KeyPress).filter_map(|e| e.key).collect();
		assert_eq!(typed, "Poland");
		assert_eq!(page.events_for("button1").iter().filter(|e| e.kind == EventKind::Click).count(), 1);
		assert_eq!(page.focused().as_deref(), Some("button1"));
	}
}
