pub mod action;
pub mod anim;
pub mod click;
pub mod config;
pub mod error;
pub mod geometry;
pub mod interface;
pub mod lazy;
pub mod mouse;
pub mod observer;
pub mod page;
pub mod scene;
pub mod script;
pub mod table;
pub mod typewriter;

pub use action::{Action, LazyAction};
pub use anim::{MotionConfig, MoveAnim, MoveAnimBuilder};
pub use click::Click;
pub use config::Config;
pub use error::{Result, SceneError};
pub use geometry::{Position, Size};
pub use interface::{ensure_implements, Interface, ACTION, LAZY_ACTION};
pub use lazy::{LazyDecorator, Scriptable};
pub use mouse::{Mouse, MouseCall, MOUSE_SCRIPT_METHODS};
pub use observer::{Observer, Subscription};
pub use page::{Element, ElementLookup, EventKind, EventTarget, InputEvent, Page, Positionable, VirtualPage};
pub use scene::{Scene, SceneState, SceneStatus};
pub use script::{demo_page, SceneScript, Stage, Step};
pub use table::ActionTable;
pub use typewriter::{Typewriter, TypewriterCall, TYPEWRITER_SCRIPT_METHODS};
