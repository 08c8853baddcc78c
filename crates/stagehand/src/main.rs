use clap::Parser;
use stagehand::{demo_page, Config, SceneScript, SceneStatus, Stage, Subscription};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	tracing_subscriber::registry()
		.with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "stagehand=info".into()))
		.with(tracing_subscriber::fmt::layer())
		.init();

	let config = Config::parse();
	config.validate()?;

	let page = demo_page(config.viewport());
	let stage = Stage::new(Arc::new(page.clone()), &config)?;

	let script = match &config.script {
		Some(path) => SceneScript::load(path)?,
		None => SceneScript::drag_and_drop_demo(),
	};

	let scene = stage.compile(&script)?;
	scene.on_end(Some(Subscription::new(|_| tracing::info!("scene end"))));

	tracing::info!(scene = scene.name(), actions = scene.len(), "starting");
	scene.start(None)?;
	let state = scene.finished().await;

	for event in page.events() {
		tracing::debug!(target_id = %event.target, kind = ?event.event.kind, position = ?event.event.position, key = ?event.event.key, "event");
	}
	tracing::info!(events = page.events().len(), status = ?state.status, "scene finished");

	if state.status == SceneStatus::Failed {
		return Err(state.error.unwrap_or_else(|| "scene failed".to_string()).into());
	}
	Ok(())
}
