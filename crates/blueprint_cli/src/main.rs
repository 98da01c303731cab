//! Blueprint Runner
//!
//! Loads a blueprint file, runs it once for a trigger with the built-in node
//! library, and prints the execution result as JSON.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::Value;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use blueprint_runtime::{
    BlueprintEngine, Event, EventPublisher, MemoryPointStore, NodeRegistry, RuntimeServices,
};
use blueprint_types::{Blueprint, ExecutionResult, ExecutionTrigger};

mod config;

/// Run a blueprint once
#[derive(Parser, Debug)]
#[command(name = "blueprint-run")]
#[command(about = "Execute a blueprint graph for a single trigger", long_about = None)]
struct Args {
    /// Path to the blueprint JSON file
    #[arg(short, long)]
    blueprint: PathBuf,

    /// Trigger kind ("start", "event", ...)
    #[arg(short, long, default_value = "start")]
    trigger: String,

    /// Trigger payload (JSON)
    #[arg(short, long)]
    data: Option<String>,

    /// Event name for an "event" trigger
    #[arg(short, long)]
    event_type: Option<String>,

    /// Engine configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Initial point values: a JSON object of path -> value
    #[arg(long)]
    points: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.json_logs);

    let engine_config = config::load(args.config.as_deref())?;
    let blueprint = load_blueprint(&args.blueprint)?;
    let data = args
        .data
        .as_deref()
        .map(serde_json::from_str::<Value>)
        .transpose()
        .context("Trigger data is not valid JSON")?;

    let points = Arc::new(match &args.points {
        Some(path) => load_points(path)?,
        None => MemoryPointStore::new(),
    });

    let (events, event_rx) = EventPublisher::channel(64);
    let event_log = spawn_event_log(event_rx);

    let services = RuntimeServices::default()
        .with_points(points)
        .with_events(events);

    let registry = Arc::new(NodeRegistry::with_builtins());
    info!(
        "Loaded {} node types in {} categories",
        registry.len(),
        registry.categories().len()
    );

    let engine = BlueprintEngine::new(registry, services).with_config(engine_config);
    info!(blueprint_id = %blueprint.id, name = %blueprint.name, "Blueprint loaded");
    if let Err(errors) = blueprint.validate_functions() {
        for error in errors {
            warn!("{}", error);
        }
    }
    engine.set_blueprint(Arc::new(blueprint));

    let trigger = ExecutionTrigger {
        event_type: args.event_type,
        ..ExecutionTrigger::new(args.trigger, data)
    };
    let result = match engine.execute_blueprint(trigger).await {
        Ok(result) => result,
        Err(e) => {
            warn!("Blueprint execution failed: {}", e);
            ExecutionResult::failed(e.to_string())
        }
    };

    // Dropping the engine drops the last publisher, which ends the event log
    drop(engine);
    if let Err(e) = event_log.await {
        warn!("Event log task failed: {}", e);
    }

    println!("{}", serde_json::to_string_pretty(&result)?);

    if result.error.is_some() {
        std::process::exit(1);
    }
    Ok(())
}

/// Log every published event until the last publisher is dropped.
/// Resolves to the number of events logged.
fn spawn_event_log(mut rx: broadcast::Receiver<Event>) -> JoinHandle<usize> {
    tokio::spawn(async move {
        let mut logged = 0;
        loop {
            match rx.recv().await {
                Ok(event) => {
                    info!(event_type = %event.event_type, source = %event.source, data = %event.data, "Event published");
                    logged += 1;
                }
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Event log fell behind"),
                Err(RecvError::Closed) => break,
            }
        }
        logged
    })
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("blueprint_runtime=info,blueprint_cli=info"));

    // Logs go to stderr so stdout carries only the result
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn load_blueprint(path: &Path) -> Result<Blueprint> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read blueprint {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse blueprint {}", path.display()))
}

fn load_points(path: &Path) -> Result<MemoryPointStore> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read points {}", path.display()))?;
    let points: serde_json::Map<String, Value> = serde_json::from_str(&content)
        .with_context(|| format!("Points file {} must be a JSON object", path.display()))?;
    Ok(MemoryPointStore::with_points(points))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from([
            "blueprint-run",
            "--blueprint",
            "bp.json",
            "--trigger",
            "event",
            "--data",
            "{\"zone\": 1}",
            "--event-type",
            "occupancy/changed",
        ])
        .unwrap();
        assert_eq!(args.blueprint, PathBuf::from("bp.json"));
        assert_eq!(args.trigger, "event");
        assert_eq!(args.event_type.as_deref(), Some("occupancy/changed"));
        assert!(args.points.is_none());
    }

    #[test]
    fn test_load_blueprint_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "id": "bp-1",
                "name": "Hello",
                "nodes": [
                    {{"id": "start", "type": "event/OnStart"}},
                    {{"id": "print", "type": "utility/Print", "config": {{"defaults": {{"message": "hi"}}}}}}
                ],
                "connections": [{{"from": "start.exec", "to": "print.exec"}}]
            }}"#
        )
        .unwrap();

        let blueprint = load_blueprint(file.path()).unwrap();
        assert_eq!(blueprint.id, "bp-1");
        assert_eq!(blueprint.nodes.len(), 2);
        assert_eq!(blueprint.target_of("start", "exec"), Some("print"));
    }

    #[tokio::test]
    async fn test_event_log_drains_before_exit() {
        let (publisher, rx) = EventPublisher::channel(8);
        let log = spawn_event_log(rx);
        publisher.emit(Event::new("alarm/raised", "publish", Value::Null));
        publisher.emit(Event::new("alarm/cleared", "publish", Value::Null));

        drop(publisher);
        assert_eq!(log.await.unwrap(), 2);
    }

    #[test]
    fn test_load_points_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"ahu-1/sat": 55, "ahu-1/mode": "cool"}}"#).unwrap();

        let store = load_points(file.path()).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.get("ahu-1/mode"), Some(Value::from("cool")));

        let mut bad = tempfile::NamedTempFile::new().unwrap();
        write!(bad, "[1, 2]").unwrap();
        assert!(load_points(bad.path()).is_err());
    }
}
