use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::anim::MotionConfig;
use crate::error::{Result, SceneError};
use crate::geometry::Size;
use crate::typewriter::Typewriter;

#[derive(Parser, Clone, Debug, Serialize, Deserialize)]
#[command(author, version, about = "Play scripted pointer and keyboard scenes", long_about = None)]
pub struct Config {
	#[arg(long, env = "MOVE_STEP", default_value = "4", help = "Pixels travelled per tick while gliding")]
	pub move_step: i32,

	#[arg(long, env = "MOVE_INTERVAL_MS", default_value = "20", help = "Milliseconds between glide ticks")]
	pub move_interval_ms: u64,

	#[arg(long, env = "DRAG_STEP", default_value = "10", help = "Pixels travelled per tick while dragging")]
	pub drag_step: i32,

	#[arg(long, env = "DRAG_INTERVAL_MS", default_value = "40", help = "Milliseconds between drag ticks")]
	pub drag_interval_ms: u64,

	#[arg(long, env = "TYPE_INTERVAL_MS", default_value = "300", help = "Milliseconds between typed characters")]
	pub type_interval_ms: u64,

	#[arg(long, default_value = "1024", help = "Width of the virtual page")]
	pub viewport_width: u32,

	#[arg(long, default_value = "768", help = "Height of the virtual page")]
	pub viewport_height: u32,

	#[arg(long, help = "JSON scene script; the built-in demo runs when omitted")]
	pub script: Option<PathBuf>,
}

impl Config {
	pub fn new() -> Self {
		Self::parse()
	}

	pub const fn motion(&self) -> MotionConfig {
		MotionConfig::new(self.move_step, self.move_interval_ms)
	}

	pub const fn drag_motion(&self) -> MotionConfig {
		MotionConfig::new(self.drag_step, self.drag_interval_ms)
	}

	pub const fn viewport(&self) -> Size {
		Size::new(self.viewport_width, self.viewport_height)
	}

	pub fn validate(&self) -> Result<()> {
		self.motion().validate()?;
		self.drag_motion().validate()?;
		if self.type_interval_ms == 0 {
			return Err(SceneError::InvalidConfig("type interval must be at least 1ms".to_string()));
		}
		Ok(())
	}

	#[cfg(test)]
	pub fn test() -> Self {
		Self {
			move_step: 8,
			move_interval_ms: 1,
			drag_step: 8,
			drag_interval_ms: 1,
			type_interval_ms: 1,
			..Self::default()
		}
	}
}

impl Default for Config {
	fn default() -> Self {
		Self {
			move_step: MotionConfig::DEFAULT_STEP,
			move_interval_ms: MotionConfig::DEFAULT_INTERVAL_MS,
			drag_step: 10,
			drag_interval_ms: 40,
			type_interval_ms: Typewriter::DEFAULT_INTERVAL_MS,
			viewport_width: 1024,
			viewport_height: 768,
			script: None,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_default_config() {
		let config = Config::default();
		assert_eq!(config.motion(), MotionConfig::new(4, 20));
		assert_eq!(config.drag_motion(), MotionConfig::new(10, 40));
		assert_eq!(config.type_interval_ms, 300);
		assert_eq!(config.viewport(), Size::new(1024, 768));
		assert!(config.script.is_none());
		assert!(config.validate().is_ok());
	}

	#[test]
	fn test_config_parser() {
		let args = vec![
			"stagehand",
			"--move-step",
			"6",
			"--move-interval-ms",
			"15",
			"--drag-step",
			"12",
			"--type-interval-ms",
			"50",
			"--viewport-width",
			"800",
			"--script",
			"scene.json",
		];

		let config = Config::try_parse_from(args).unwrap();
		assert_eq!(config.motion(), MotionConfig::new(6, 15));
		assert_eq!(config.drag_step, 12);
		assert_eq!(config.type_interval_ms, 50);
		assert_eq!(config.viewport(), Size::new(800, 768));
		assert_eq!(config.script, Some(PathBuf::from("scene.json")));
	}

	#[test]
	fn test_rejects_zero_step() {
		let config = Config { move_step: 0, ..Config::default() };
		assert!(matches!(config.validate(), Err(SceneError::InvalidConfig(_))));
	}
}
