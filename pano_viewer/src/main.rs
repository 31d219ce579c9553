mod cli;
mod input;
mod viewer;

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Instant,
};

use anyhow::{Context, Result};
use clap::Parser;
use pano_engine::{
    FileAssetLoader, NavigationController, NavigationError, NavigationEvent, NavigationOutcome,
    SessionSettings, load_settings_preset,
};
use pano_graph::EnvironmentGraph;
use pollster::FutureExt;
use wgpu::SurfaceError;
use winit::{
    dpi::PhysicalSize,
    event::{ElementState, Event, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    keyboard::{Key, NamedKey},
    window::WindowBuilder,
};

use cli::Args;
use input::{ORBIT_RADIANS_PER_PIXEL, PointerAction, PointerTracker};
use viewer::ViewerState;

const EXPOSURE_STEP: f32 = 0.1;
const BLUR_STEP: f32 = 0.5;

type Controller = NavigationController<FileAssetLoader>;

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::init();

    let graph = EnvironmentGraph::load(&args.graph)
        .with_context(|| format!("loading location graph {}", args.graph.display()))?;
    for edge in graph.dangling_edges() {
        eprintln!(
            "[pano_viewer] warning: {} {} -> '{}' is not a declared location",
            edge.from, edge.direction, edge.to
        );
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
    println!(
        "Loaded {} locations from {} (assets: {})",
        graph.len(),
        args.graph.display(),
        asset_root.display()
    );
    println!("Click a cone to walk; drag to look around, scroll to zoom.");
    println!("1-9/Tab jump to a location, +/- exposure, [/] blur, Esc quits.");

    let camera = settings.camera;
    let layout = settings.indicators;
    let mut controller = NavigationController::new(graph, FileAssetLoader::new(asset_root), settings);

    let event_loop = EventLoop::new().context("creating winit event loop")?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title("Pano Viewer")
            .with_inner_size(PhysicalSize::new(args.width, args.height))
            .build(&event_loop)
            .context("creating viewer window")?,
    );

    let mut state = ViewerState::new(window, camera, layout).block_on()?;

    let outcome = match args.start.as_deref() {
        Some(name) => controller.navigate_to(name, Instant::now())?,
        None => controller.start(Instant::now())?,
    };
    log_outcome(&outcome);

    let mut pointer = PointerTracker::default();
    let mut title = String::new();

    event_loop
        .run(move |event, target| {
            target.set_control_flow(ControlFlow::Poll);

            match event {
                Event::WindowEvent { window_id, event } if window_id == state.window().id() => {
                    match event {
                        WindowEvent::CloseRequested => target.exit(),
                        WindowEvent::KeyboardInput {
                            event:
                                KeyEvent {
                                    logical_key: Key::Named(NamedKey::Escape),
                                    state: ElementState::Pressed,
                                    ..
                                },
                            ..
                        } => target.exit(),
                        WindowEvent::KeyboardInput {
                            event:
                                KeyEvent {
                                    logical_key,
                                    state: ElementState::Pressed,
                                    ..
                                },
                            ..
                        } => handle_key(&logical_key, &mut controller, &mut state),
                        WindowEvent::CursorMoved { position, .. } => {
                            let (x, y) = (position.x as f32, position.y as f32);
                            match pointer.moved(x, y) {
                                PointerAction::Orbit { dx, dy } => state.camera_mut().orbit(
                                    -dx * ORBIT_RADIANS_PER_PIXEL,
                                    dy * ORBIT_RADIANS_PER_PIXEL,
                                ),
                                _ if !pointer.is_dragging() => state.set_hover(x, y),
                                _ => {}
                            }
                        }
                        WindowEvent::CursorLeft { .. } => {
                            pointer.left();
                            state.clear_hover();
                        }
                        WindowEvent::MouseInput {
                            state: button_state,
                            button: MouseButton::Left,
                            ..
                        } => match button_state {
                            ElementState::Pressed => pointer.pressed(),
                            ElementState::Released => {
                                if let PointerAction::Click { x, y } = pointer.released() {
                                    report(controller.click(x, y, &state, Instant::now()));
                                }
                            }
                        },
                        WindowEvent::MouseWheel { delta, .. } => {
                            let lines = match delta {
                                MouseScrollDelta::LineDelta(_, y) => y,
                                MouseScrollDelta::PixelDelta(position) => {
                                    input::pixels_to_lines(position.y)
                                }
                            };
                            state.camera_mut().zoom(input::scroll_zoom_factor(lines));
                        }
                        WindowEvent::Resized(new_size) => state.resize(new_size),
                        WindowEvent::RedrawRequested => {
                            for event in controller.tick(Instant::now(), &mut state) {
                                log_event(&event);
                            }
                            let next_title = window_title(&controller);
                            if next_title != title {
                                state.window().set_title(&next_title);
                                title = next_title;
                            }
                            match state.render() {
                                Ok(_) => {}
                                Err(SurfaceError::Lost) => state.resize(state.size()),
                                Err(SurfaceError::OutOfMemory) => target.exit(),
                                Err(err) => eprintln!("[pano_viewer] render error: {err:?}"),
                            }
                        }
                        _ => {}
                    }
                }
                Event::AboutToWait => state.window().request_redraw(),
                _ => {}
            }
        })
        .context("running viewer application")?;
    Ok(())
}

fn default_asset_root(graph_path: &Path) -> PathBuf {
    graph_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn handle_key(key: &Key, controller: &mut Controller, state: &mut ViewerState) {
    match key {
        Key::Named(NamedKey::Tab) => {
            let names: Vec<String> = controller.graph().names().map(str::to_string).collect();
            let current = controller
                .state()
                .pending_target()
                .or(controller.state().current_node());
            let next = current
                .and_then(|name| names.iter().position(|candidate| candidate == name))
                .map_or(0, |index| (index + 1) % names.len());
            if let Some(name) = names.get(next) {
                report(controller.navigate_to(name, Instant::now()));
            }
        }
        Key::Character(text) => match text.as_str() {
            "+" | "=" => {
                controller.set_exposure(controller.exposure() + EXPOSURE_STEP);
                println!("[pano_viewer] exposure {:.1}", controller.exposure());
            }
            "-" | "_" => {
                controller.set_exposure(controller.exposure() - EXPOSURE_STEP);
                println!("[pano_viewer] exposure {:.1}", controller.exposure());
            }
            "[" => {
                let level = state.adjust_blur(-BLUR_STEP);
                println!("[pano_viewer] blur level {level:.1}");
            }
            "]" => {
                let level = state.adjust_blur(BLUR_STEP);
                println!("[pano_viewer] blur level {level:.1}");
            }
            digit => {
                let Some(index) = digit
                    .parse::<usize>()
                    .ok()
                    .filter(|index| (1..=9).contains(index))
                else {
                    return;
                };
                let name = controller
                    .graph()
                    .names()
                    .nth(index - 1)
                    .map(str::to_string);
                if let Some(name) = name {
                    report(controller.navigate_to(&name, Instant::now()));
                }
            }
        },
        _ => {}
    }
}

fn report(result: Result<NavigationOutcome, NavigationError>) {
    match result {
        Ok(outcome) => log_outcome(&outcome),
        Err(err) => eprintln!("[pano_viewer] {err}"),
    }
}

fn log_outcome(outcome: &NavigationOutcome) {
    match outcome {
        NavigationOutcome::Started { target } => println!("[pano_viewer] walking to {target}"),
        NavigationOutcome::Superseded { previous, target } => {
            println!("[pano_viewer] walking to {target} instead of {previous}")
        }
        NavigationOutcome::NoEdge { from, direction } => {
            log::debug!("{from} has no {direction} neighbour")
        }
        other => log::debug!("navigation ignored: {other:?}"),
    }
}

fn log_event(event: &NavigationEvent) {
    match event {
        NavigationEvent::Arrived { name, status } => match status {
            Some(status) => println!("[pano_viewer] arrived at {name} ({status})"),
            None => println!("[pano_viewer] arrived at {name}"),
        },
        NavigationEvent::LoadFailed { target, error } => {
            eprintln!("[pano_viewer] could not load {target}: {error}")
        }
        NavigationEvent::Settled { name } => log::debug!("settled at {name}"),
    }
}

fn window_title(controller: &Controller) -> String {
    let state = controller.state();
    let location = state.current_node().unwrap_or("-");
    let mut title = format!("Pano Viewer - {location}");
    if let Some(target) = state.pending_target() {
        title.push_str(&format!(" -> {target} ({})", state.phase()));
        if let Some(progress) = controller
            .telemetry()
            .stats()
            .and_then(|stats| stats.progress())
        {
            title.push_str(&format!(" {:.0}%", progress * 100.0));
        }
    } else if let Some(status) = controller.telemetry().status_label() {
        title.push_str(&format!(" | {status}"));
    }
    title
}
