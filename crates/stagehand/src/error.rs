use thiserror::Error;

pub type Result<T> = std::result::Result<T, SceneError>;

#[derive(Error, Debug)]
pub enum SceneError {
	#[error("object does not implement the {interface} interface. Method {method} was not found")]
	ContractViolation { interface: &'static str, method: &'static str },

	#[error("No more calls in the queue")]
	EmptyQueue,

	#[error("Index {index} is out of range for a scene of {len} actions")]
	IndexOutOfRange { index: usize, len: usize },

	#[error("Missing required argument: {0}")]
	MissingArgument(String),

	#[error("Invalid configuration: {0}")]
	InvalidConfig(String),

	#[error("Scene is already running")]
	AlreadyRunning,

	#[error("Element not found: {0}")]
	ElementNotFound(String),

	#[error("Timed action started outside a tokio runtime: {0}")]
	NoRuntime(String),

	#[error("Script error: {0}")]
	Json(#[from] serde_json::Error),

	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),
}

impl SceneError {
	pub fn missing(argument: impl Into<String>) -> Self {
		Self::MissingArgument(argument.into())
	}
}
