use std::{
    fs,
    path::{Path, PathBuf},
    thread,
    time::{Duration, Instant},
};

use anyhow::{bail, Context, Result};
use pano_graph::{Direction, EnvironmentGraph};
use pano_engine::{
    load_settings_preset, AssetLoader, FileAssetLoader, HeadlessRenderer, NavigationController,
    NavigationEvent, NavigationOutcome, SessionSettings, Viewport,
};
use serde::Serialize;

use crate::cli::Args;

const FRAME: Duration = Duration::from_millis(16);

#[derive(Serialize)]
struct NavigationLogEntry {
    sequence: u32,
    elapsed_ms: u64,
    label: String,
}

#[derive(Serialize, Default)]
struct NavigationLog {
    events: Vec<NavigationLogEntry>,
}

struct EventRecorder {
    started: Instant,
    log: NavigationLog,
}

impl EventRecorder {
    fn new() -> Self {
        Self {
            started: Instant::now(),
            log: NavigationLog::default(),
        }
    }

    fn record(&mut self, label: String) {
        println!("[pano_engine] {label}");
        let sequence = self.log.events.len() as u32;
        self.log.events.push(NavigationLogEntry {
            sequence,
            elapsed_ms: self.started.elapsed().as_millis() as u64,
            label,
        });
    }

    fn outcome(&mut self, outcome: &NavigationOutcome) {
        let label = match outcome {
            NavigationOutcome::Started { target } => format!("navigate.start {target}"),
            NavigationOutcome::Superseded { previous, target } => {
                format!("navigate.supersede {previous} -> {target}")
            }
            NavigationOutcome::AlreadyPending { target } => format!("navigate.pending {target}"),
            NavigationOutcome::AlreadyCurrent { name } => format!("navigate.current {name}"),
            NavigationOutcome::NoEdge { from, direction } => {
                format!("navigate.no_edge {from} {direction}")
            }
            NavigationOutcome::Unresolved => "navigate.unresolved".to_string(),
        };
        self.record(label);
    }

    fn event(&mut self, event: &NavigationEvent) {
        let label = match event {
            NavigationEvent::Arrived { name, status } => match status {
                Some(status) => format!("navigate.arrive {name} ({status})"),
                None => format!("navigate.arrive {name}"),
            },
            NavigationEvent::LoadFailed { target, error } => {
                format!("load.fail {target}: {error}")
            }
            NavigationEvent::Settled { name } => format!("navigate.settle {name}"),
        };
        self.record(label);
    }
}

pub fn execute(args: Args) -> Result<()> {
    let graph = EnvironmentGraph::load(&args.graph)
        .with_context(|| format!("loading location graph {}", args.graph.display()))?;

    let dangling = graph.dangling_edges();
    for edge in &dangling {
        eprintln!(
            "[pano_engine] warning: {} {} -> '{}' is not a declared location",
            edge.from, edge.direction, edge.to
        );
    }
    if args.check {
        println!(
            "{} locations, {} dangling edges, default start {}",
            graph.len(),
            dangling.len(),
            graph.first().name()
        );
        return Ok(());
    }

    let mut settings = SessionSettings::default();
    if let Some(path) = args.settings.as_ref() {
        settings = settings.with_preset(&load_settings_preset(path)?);
    }
    if args.no_transitions {
        settings.transitions.enabled = false;
    }

    let asset_root = args
        .asset_root
        .clone()
        .unwrap_or_else(|| default_asset_root(&args.graph));
    log::info!("resolving assets against {}", asset_root.display());

    let mut renderer = HeadlessRenderer::new(
        settings.camera,
        Viewport::new(1280.0, 720.0),
        settings.indicators,
    );
    let mut controller =
        NavigationController::new(graph, FileAssetLoader::new(asset_root), settings);
    let mut recorder = EventRecorder::new();
    let step_timeout = Duration::from_millis(args.step_timeout_ms);

    let outcome = match args.start.as_deref() {
        Some(name) => controller.navigate_to(name, Instant::now())?,
        None => controller.start(Instant::now())?,
    };
    recorder.outcome(&outcome);
    drive_until_settled(&mut controller, &mut renderer, &mut recorder, step_timeout)?;

    for direction in &args.walk {
        let outcome = step(&mut controller, &mut renderer, *direction)?;
        recorder.outcome(&outcome);
        if !outcome.is_noop() {
            drive_until_settled(&mut controller, &mut renderer, &mut recorder, step_timeout)?;
        }
    }

    match controller.state().current_node() {
        Some(name) => println!("Finished at {name}"),
        None => println!("Finished without arriving anywhere"),
    }

    if let Some(path) = args.event_log_json.as_ref() {
        let json = serde_json::to_string_pretty(&recorder.log)
            .context("serializing navigation event log to JSON")?;
        fs::write(path, &json)
            .with_context(|| format!("writing navigation event log to {}", path.display()))?;
        println!("Saved navigation event log to {}", path.display());
    }

    Ok(())
}

fn default_asset_root(graph_path: &Path) -> PathBuf {
    graph_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Turns towards `direction` and clicks its marker, the way a user would.
/// Falls back to walking the edge directly when no marker is on screen.
fn step<L: AssetLoader>(
    controller: &mut NavigationController<L>,
    renderer: &mut HeadlessRenderer,
    direction: Direction,
) -> Result<NavigationOutcome> {
    renderer.face(direction);
    let outcome = match renderer.screen_position(direction) {
        Some([x, y]) => controller.click(x, y, &*renderer, Instant::now())?,
        None => controller.navigate_direction(direction, Instant::now())?,
    };
    Ok(outcome)
}

fn drive_until_settled<L: AssetLoader>(
    controller: &mut NavigationController<L>,
    renderer: &mut HeadlessRenderer,
    recorder: &mut EventRecorder,
    timeout: Duration,
) -> Result<()> {
    let deadline = Instant::now() + timeout;
    loop {
        for event in controller.tick(Instant::now(), renderer) {
            recorder.event(&event);
        }
        if controller.is_settled() {
            return Ok(());
        }
        if Instant::now() >= deadline {
            bail!(
                "navigation still {} after {} ms",
                controller.state().phase(),
                timeout.as_millis()
            );
        }
        thread::sleep(FRAME);
    }
}
