use serde::{Deserialize, Serialize};
use std::fmt;

/// Screen position in whole pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
	pub x: i32,
	pub y: i32,
}

impl Position {
	pub const ORIGIN: Self = Self { x: 0, y: 0 };

	pub const fn new(x: i32, y: i32) -> Self {
		Self { x, y }
	}

	/// Shift by `(dx, dy)`, saturating at the `i32` bounds.
	pub const fn offset(self, dx: i32, dy: i32) -> Self {
		Self {
			x: self.x.saturating_add(dx),
			y: self.y.saturating_add(dy),
		}
	}
}

impl fmt::Display for Position {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "({}, {})", self.x, self.y)
	}
}

impl From<(i32, i32)> for Position {
	fn from((x, y): (i32, i32)) -> Self {
		Self { x, y }
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
	pub width: u32,
	pub height: u32,
}

impl Size {
	pub const fn new(width: u32, height: u32) -> Self {
		Self { width, height }
	}

	/// Half extents, rounded down.
	pub const fn half(self) -> (i32, i32) {
		((self.width / 2) as i32, (self.height / 2) as i32)
	}
}

/// Centre of a box whose top-left corner sits at `origin`.
pub const fn center_of(origin: Position, size: Size) -> Position {
	let (hw, hh) = size.half();
	origin.offset(hw, hh)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn center_rounds_down_half_extents() {
		assert_eq!(center_of(Position::new(10, 20), Size::new(16, 15)), Position::new(18, 27));
	}

	#[test]
	fn offset_saturates_at_the_edges() {
		assert_eq!(Position::new(i32::MAX - 1, i32::MIN + 1).offset(5, -5), Position::new(i32::MAX, i32::MIN));
		assert_eq!(center_of(Position::new(i32::MAX, 0), Size::new(u32::MAX, 2)), Position::new(i32::MAX, 1));
	}
}
