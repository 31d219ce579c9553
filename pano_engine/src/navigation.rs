//! Moves the viewer between locations.
//!
//! A navigation runs `FadingOut -> Loading -> FadingIn -> Idle`. Requests
//! made mid-way supersede the pending one (last request wins): a running
//! fade-out simply keeps going towards the new target, an in-flight load is
//! dropped and replaced, and a fade-in reverses into a fade-out. Load
//! results carry the generation they were started for, and anything that no
//! longer matches the pending target is discarded.

use std::time::Instant;

use pano_graph::{Direction, EnvironmentGraph, GraphLookupError};
use thiserror::Error;

use crate::camera::{PickHit, PickKind};
use crate::hit::HitClassifier;
use crate::indicators::IndicatorSet;
use crate::loader::{AssetLoader, LoadError, LoadPoll, LoadTicket, LoadedEnvironment};
use crate::renderer::SceneRenderer;
use crate::settings::SessionSettings;
use crate::state::{NavigationPhase, NavigationState};
use crate::telemetry::LoadTelemetry;
use crate::transition::{FadeKind, TransitionScheduler};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavigationError {
    #[error(transparent)]
    UnknownLocation(#[from] GraphLookupError),
}

/// What a navigation request did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationOutcome {
    Started { target: String },
    /// Replaced the pending navigation to `previous`.
    Superseded { previous: String, target: String },
    /// Already heading there; nothing changed.
    AlreadyPending { target: String },
    /// Already there and idle; nothing changed.
    AlreadyCurrent { name: String },
    /// The current location has no edge in that direction.
    NoEdge { from: String, direction: Direction },
    /// The click did not land on a direction marker.
    Unresolved,
}

impl NavigationOutcome {
    pub fn is_noop(&self) -> bool {
        !matches!(
            self,
            NavigationOutcome::Started { .. } | NavigationOutcome::Superseded { .. }
        )
    }
}

/// Things that happened during a [`NavigationController::tick`].
#[derive(Debug)]
pub enum NavigationEvent {
    /// The environment for `name` is now on screen; `status` describes it.
    Arrived {
        name: String,
        status: Option<String>,
    },
    /// The load for `target` failed and the viewer stayed where it was.
    LoadFailed { target: String, error: LoadError },
    /// The fade-in after arriving at `name` finished.
    Settled { name: String },
}

struct InFlightLoad {
    generation: u64,
    target: String,
    ticket: LoadTicket,
}

pub struct NavigationController<L: AssetLoader> {
    graph: EnvironmentGraph,
    loader: L,
    settings: SessionSettings,
    classifier: HitClassifier,
    state: NavigationState,
    transitions: TransitionScheduler,
    /// Fade whose completion advances the phase.
    awaited_fade: Option<u64>,
    in_flight: Option<InFlightLoad>,
    current: Option<LoadedEnvironment>,
    indicators: IndicatorSet,
    telemetry: LoadTelemetry,
}

impl<L: AssetLoader> NavigationController<L> {
    pub fn new(graph: EnvironmentGraph, loader: L, settings: SessionSettings) -> Self {
        let state = NavigationState::new(graph.first().name());
        for edge in graph.dangling_edges() {
            log::warn!(
                "{} {} points at undeclared location '{}'",
                edge.from,
                edge.direction,
                edge.to
            );
        }
        Self {
            classifier: settings.classifier(),
            transitions: TransitionScheduler::new(settings.exposure),
            graph,
            loader,
            settings,
            state,
            awaited_fade: None,
            in_flight: None,
            current: None,
            indicators: IndicatorSet::default(),
            telemetry: LoadTelemetry::default(),
        }
    }

    /// Navigates to the first declared location.
    pub fn start(&mut self, now: Instant) -> Result<NavigationOutcome, NavigationError> {
        let target = self.state.default_target().to_string();
        self.navigate_to(&target, now)
    }

    /// Heads for `name`. Unknown names fail without touching any state.
    pub fn navigate_to(
        &mut self,
        name: &str,
        now: Instant,
    ) -> Result<NavigationOutcome, NavigationError> {
        self.graph.lookup(name)?;

        if self.state.pending_target() == Some(name) {
            return Ok(NavigationOutcome::AlreadyPending {
                target: name.to_string(),
            });
        }

        let phase = self.state.phase();
        if self.state.current_node() == Some(name) {
            match phase {
                NavigationPhase::Idle | NavigationPhase::FadingIn => {
                    return Ok(NavigationOutcome::AlreadyCurrent {
                        name: name.to_string(),
                    });
                }
                NavigationPhase::FadingOut | NavigationPhase::Loading => {
                    // Turning back: the current environment is still loaded,
                    // so just bring it back up.
                    let previous = self.state.abort().unwrap_or_default();
                    self.in_flight = None;
                    self.telemetry.cancel();
                    log::info!("navigation to {previous} cancelled; staying at {name}");
                    self.recover(now);
                    return Ok(NavigationOutcome::Superseded {
                        previous,
                        target: name.to_string(),
                    });
                }
            }
        }

        let previous = self.state.pending_target().map(str::to_string);
        self.state.begin(name);
        log::info!("navigating to {name} (from {phase})");

        match phase {
            NavigationPhase::Idle | NavigationPhase::FadingIn => {
                if self.settings.transitions.enabled && self.current.is_some() {
                    self.state.set_phase(NavigationPhase::FadingOut);
                    self.awaited_fade = Some(
                        self.transitions
                            .fade_out(now, self.settings.transitions.fade_out),
                    );
                } else {
                    self.start_load();
                }
            }
            // The load starts once the running fade-out completes.
            NavigationPhase::FadingOut => {}
            NavigationPhase::Loading => {
                self.in_flight = None;
                self.start_load();
            }
        }

        Ok(match previous {
            Some(previous) => NavigationOutcome::Superseded {
                previous,
                target: name.to_string(),
            },
            None => NavigationOutcome::Started {
                target: name.to_string(),
            },
        })
    }

    /// Follows the current location's edge in `direction`.
    pub fn navigate_direction(
        &mut self,
        direction: Direction,
        now: Instant,
    ) -> Result<NavigationOutcome, NavigationError> {
        let Some(from) = self.state.current_node() else {
            return Ok(NavigationOutcome::Unresolved);
        };
        match self.graph.neighbor_of(from, direction)? {
            Some(target) => {
                let target = target.to_string();
                self.navigate_to(&target, now)
            }
            None => Ok(NavigationOutcome::NoEdge {
                from: from.to_string(),
                direction,
            }),
        }
    }

    /// Navigates if `hit` landed on a direction marker.
    pub fn navigate_hit(
        &mut self,
        hit: Option<PickHit>,
        now: Instant,
    ) -> Result<NavigationOutcome, NavigationError> {
        let direction = hit
            .filter(|hit| hit.kind == PickKind::Indicator)
            .and_then(|hit| self.classifier.classify(hit.point));
        match direction {
            Some(direction) => self.navigate_direction(direction, now),
            None => Ok(NavigationOutcome::Unresolved),
        }
    }

    /// Picks at a window pixel and navigates accordingly.
    pub fn click<R: SceneRenderer + ?Sized>(
        &mut self,
        x: f32,
        y: f32,
        renderer: &R,
        now: Instant,
    ) -> Result<NavigationOutcome, NavigationError> {
        self.navigate_hit(renderer.pick_at(x, y), now)
    }

    /// Advances loads and fades; call once per frame.
    pub fn tick<R: SceneRenderer + ?Sized>(
        &mut self,
        now: Instant,
        renderer: &mut R,
    ) -> Vec<NavigationEvent> {
        let mut events = Vec::new();

        if self.state.phase() == NavigationPhase::Loading {
            self.poll_load(now, renderer, &mut events);
        }

        if let Some(done) = self.transitions.tick(now, renderer) {
            if self.awaited_fade == Some(done.id) {
                self.awaited_fade = None;
                match (done.kind, self.state.phase()) {
                    (FadeKind::Out, NavigationPhase::FadingOut) => self.start_load(),
                    (FadeKind::In, NavigationPhase::FadingIn) => {
                        if let Some(name) = self.state.settle() {
                            log::debug!("settled at {name}");
                            events.push(NavigationEvent::Settled {
                                name: name.to_string(),
                            });
                        }
                    }
                    _ => {}
                }
            }
        }

        events
    }

    fn start_load(&mut self) {
        let Some(target) = self.state.pending_target().map(str::to_string) else {
            self.state.set_phase(NavigationPhase::Idle);
            return;
        };
        let asset_ref = match self.graph.lookup(&target) {
            Ok(node) => node.asset_ref().to_string(),
            Err(err) => {
                log::warn!("dropping navigation: {err}");
                self.state.abort();
                return;
            }
        };

        log::debug!("loading {target} from {asset_ref}");
        self.telemetry.begin(&asset_ref);
        let ticket = self.loader.load(&asset_ref);
        self.in_flight = Some(InFlightLoad {
            generation: self.state.generation(),
            target,
            ticket,
        });
        self.state.set_phase(NavigationPhase::Loading);
    }

    fn poll_load<R: SceneRenderer + ?Sized>(
        &mut self,
        now: Instant,
        renderer: &mut R,
        events: &mut Vec<NavigationEvent>,
    ) {
        let Some(load) = self.in_flight.as_mut() else {
            return;
        };
        let telemetry = &mut self.telemetry;
        let result = match load
            .ticket
            .poll(|transferred, total| telemetry.record_progress(transferred, total))
        {
            LoadPoll::Pending => return,
            LoadPoll::Ready(result) => result,
        };
        let Some(load) = self.in_flight.take() else {
            return;
        };

        if load.generation != self.state.generation()
            || self.state.pending_target() != Some(load.target.as_str())
        {
            log::debug!("discarding stale load result for {}", load.target);
            return;
        }

        match result {
            Ok(environment) => self.arrive(load.target, environment, now, renderer, events),
            Err(error) => {
                log::warn!("could not load {}: {error}", load.target);
                self.state.abort();
                self.telemetry.cancel();
                self.recover(now);
                events.push(NavigationEvent::LoadFailed {
                    target: load.target,
                    error,
                });
            }
        }
    }

    fn arrive<R: SceneRenderer + ?Sized>(
        &mut self,
        target: String,
        environment: LoadedEnvironment,
        now: Instant,
        renderer: &mut R,
        events: &mut Vec<NavigationEvent>,
    ) {
        let indicators = match self.graph.lookup(&target) {
            Ok(node) => IndicatorSet::for_node(node, &self.settings.indicators),
            Err(err) => {
                log::warn!("dropping arrival: {err}");
                self.state.abort();
                return;
            }
        };
        log::info!(
            "arrived at {target}; indicators {}",
            indicators.diff(&self.indicators)
        );

        renderer.set_environment(&environment);
        renderer.set_indicators(&indicators);
        self.telemetry.record_loaded(&environment);
        self.indicators = indicators;
        self.current = Some(environment);
        self.state.arrive();

        events.push(NavigationEvent::Arrived {
            name: target.clone(),
            status: self.telemetry.status_label(),
        });

        if self.settings.transitions.enabled {
            self.state.set_phase(NavigationPhase::FadingIn);
            self.awaited_fade = Some(
                self.transitions
                    .fade_in(now, self.settings.transitions.fade_in),
            );
        } else {
            self.transitions.set_opacity(1.0);
            self.state.settle();
            events.push(NavigationEvent::Settled { name: target });
        }
    }

    /// Brings the current environment back to full opacity while idle.
    fn recover(&mut self, now: Instant) {
        self.awaited_fade = None;
        if self.current.is_none() {
            return;
        }
        if self.settings.transitions.enabled {
            self.transitions
                .fade_in(now, self.settings.transitions.fade_in);
        } else {
            self.transitions.set_opacity(1.0);
        }
    }

    pub fn set_exposure(&mut self, exposure: f32) {
        self.transitions.set_exposure(exposure);
    }

    pub fn exposure(&self) -> f32 {
        self.transitions.exposure()
    }

    /// Idle with no fade running.
    pub fn is_settled(&self) -> bool {
        self.state.is_idle() && !self.transitions.is_active()
    }

    pub fn state(&self) -> &NavigationState {
        &self.state
    }

    pub fn graph(&self) -> &EnvironmentGraph {
        &self.graph
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn transitions(&self) -> &TransitionScheduler {
        &self.transitions
    }

    pub fn current_environment(&self) -> Option<&LoadedEnvironment> {
        self.current.as_ref()
    }

    pub fn indicators(&self) -> &IndicatorSet {
        &self.indicators
    }

    pub fn telemetry(&self) -> &LoadTelemetry {
        &self.telemetry
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    pub fn loader_mut(&mut self) -> &mut L {
        &mut self.loader
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{EquirectTexture, HostLoader};
    use crate::renderer::HeadlessRenderer;
    use std::time::Duration;

    fn graph() -> EnvironmentGraph {
        EnvironmentGraph::from_json_str(
            r#"{
                "A": { "asset": "a.img", "front": "B" },
                "B": { "asset": "b.img", "behind": "A", "left": "C" },
                "C": { "asset": "c.img" }
            }"#,
        )
        .expect("graph parses")
    }

    fn resolve(controller: &mut NavigationController<HostLoader>, asset: &str) {
        let request = controller
            .loader_mut()
            .take_request(asset)
            .expect("load requested");
        request.finish(Ok(LoadedEnvironment::from_texture(
            asset,
            EquirectTexture::solid(4, 2, [90, 90, 90, 255]),
            1_000,
        )));
    }

    #[test]
    fn initial_load_skips_fade_out() {
        let mut controller =
            NavigationController::new(graph(), HostLoader::new(), SessionSettings::default());
        let mut renderer = HeadlessRenderer::default();
        let now = Instant::now();

        assert_eq!(
            controller.start(now),
            Ok(NavigationOutcome::Started {
                target: "A".to_string()
            })
        );
        assert_eq!(controller.state().phase(), NavigationPhase::Loading);
        assert_eq!(controller.loader().history(), ["a.img"]);

        resolve(&mut controller, "a.img");
        let events = controller.tick(now, &mut renderer);
        assert!(matches!(&events[..], [NavigationEvent::Arrived { name, .. }] if name == "A"));
        assert_eq!(controller.state().phase(), NavigationPhase::FadingIn);

        let events = controller.tick(now + Duration::from_secs(3), &mut renderer);
        assert!(matches!(&events[..], [NavigationEvent::Settled { name }] if name == "A"));
        assert!(controller.is_settled());
    }

    #[test]
    fn navigating_to_current_location_is_a_noop() {
        let settings = SessionSettings::default();
        let mut controller = NavigationController::new(graph(), HostLoader::new(), settings);
        let mut renderer = HeadlessRenderer::default();
        let now = Instant::now();
        controller.start(now).expect("start");
        resolve(&mut controller, "a.img");
        controller.tick(now, &mut renderer);
        controller.tick(now + Duration::from_secs(3), &mut renderer);

        assert_eq!(
            controller.navigate_to("A", now),
            Ok(NavigationOutcome::AlreadyCurrent {
                name: "A".to_string()
            })
        );
        assert_eq!(controller.loader().history().len(), 1);
    }

    #[test]
    fn turning_back_during_fade_out_cancels_without_loading() {
        let mut controller =
            NavigationController::new(graph(), HostLoader::new(), SessionSettings::default());
        let mut renderer = HeadlessRenderer::default();
        let now = Instant::now();
        controller.start(now).expect("start");
        resolve(&mut controller, "a.img");
        controller.tick(now, &mut renderer);
        controller.tick(now + Duration::from_secs(3), &mut renderer);

        let later = now + Duration::from_secs(4);
        controller.navigate_to("B", later).expect("B known");
        assert_eq!(controller.state().phase(), NavigationPhase::FadingOut);
        let outcome = controller.navigate_to("A", later).expect("A known");
        assert_eq!(
            outcome,
            NavigationOutcome::Superseded {
                previous: "B".to_string(),
                target: "A".to_string()
            }
        );
        assert_eq!(controller.state().pending_target(), None);
        assert_eq!(controller.state().phase(), NavigationPhase::Idle);
        assert_eq!(controller.loader().history(), ["a.img"]);
    }

    #[test]
    fn missing_edge_reports_no_edge() {
        let mut controller =
            NavigationController::new(graph(), HostLoader::new(), SessionSettings::default());
        let mut renderer = HeadlessRenderer::default();
        let now = Instant::now();
        controller.start(now).expect("start");
        resolve(&mut controller, "a.img");
        controller.tick(now, &mut renderer);

        assert_eq!(
            controller.navigate_direction(Direction::Left, now),
            Ok(NavigationOutcome::NoEdge {
                from: "A".to_string(),
                direction: Direction::Left
            })
        );
    }

    #[test]
    fn backdrop_hits_never_navigate() {
        let mut controller =
            NavigationController::new(graph(), HostLoader::new(), SessionSettings::default());
        let hit = PickHit {
            point: glam::Vec3::new(0.0, -100.0, 200.0),
            kind: PickKind::Backdrop,
        };
        assert_eq!(
            controller.navigate_hit(Some(hit), Instant::now()),
            Ok(NavigationOutcome::Unresolved)
        );
        assert_eq!(controller.navigate_hit(None, Instant::now()), Ok(NavigationOutcome::Unresolved));
    }
}
