use std::time::{Duration, Instant};

use pano_engine::{
    EquirectTexture, HeadlessRenderer, HostLoader, LoadError, LoadedEnvironment,
    NavigationController, NavigationError, NavigationEvent, NavigationOutcome, NavigationPhase,
    RendererCall, SessionSettings,
};
use pano_graph::{Direction, EnvironmentGraph, GraphLookupError};

const TWO_NODES: &str = r#"{
    "A": { "asset": "a.img", "front": "B" },
    "B": { "asset": "b.img", "behind": "A" }
}"#;

struct Harness {
    controller: NavigationController<HostLoader>,
    renderer: HeadlessRenderer,
    clock: Instant,
}

impl Harness {
    fn new(graph: &str, settings: SessionSettings) -> Self {
        let graph = EnvironmentGraph::from_json_str(graph).expect("graph parses");
        let renderer = HeadlessRenderer::new(
            settings.camera,
            pano_engine::Viewport::new(1280.0, 720.0),
            settings.indicators,
        );
        Self {
            controller: NavigationController::new(graph, HostLoader::new(), settings),
            renderer,
            clock: Instant::now(),
        }
    }

    fn advance(&mut self, ms: u64) -> Vec<NavigationEvent> {
        self.clock += Duration::from_millis(ms);
        self.controller.tick(self.clock, &mut self.renderer)
    }

    fn complete(&mut self, asset: &str) {
        let request = self
            .controller
            .loader_mut()
            .take_request(asset)
            .unwrap_or_else(|| panic!("no pending request for {asset}"));
        request.finish(Ok(LoadedEnvironment::from_texture(
            asset,
            EquirectTexture::solid(16, 8, [120, 130, 140, 255]),
            4_096,
        )));
    }

    fn reject(&mut self, asset: &str) {
        let request = self
            .controller
            .loader_mut()
            .take_request(asset)
            .unwrap_or_else(|| panic!("no pending request for {asset}"));
        request.finish(Err(LoadError::Rejected {
            asset: asset.to_string(),
            reason: "404".to_string(),
        }));
    }

    /// Starts at the default location and waits out its fade-in.
    fn settle_at_start(&mut self) {
        let now = self.clock;
        self.controller.start(now).expect("start location exists");
        let asset = self
            .controller
            .graph()
            .first()
            .asset_ref()
            .to_string();
        self.complete(&asset);
        self.advance(0);
        self.advance(5_000);
        assert!(self.controller.is_settled());
    }

    fn click(&mut self, direction: Direction) -> NavigationOutcome {
        self.renderer.face(direction);
        let [x, y] = self
            .renderer
            .screen_position(direction)
            .unwrap_or_else(|| panic!("{direction} marker not on screen"));
        let now = self.clock;
        self.controller
            .click(x, y, &self.renderer, now)
            .expect("click target exists")
    }

    fn current(&self) -> Option<&str> {
        self.controller.state().current_node()
    }

    /// Jumps straight to `name` and waits until the fade-in is done.
    fn visit(&mut self, name: &str) {
        let now = self.clock;
        let outcome = self
            .controller
            .navigate_to(name, now)
            .unwrap_or_else(|err| panic!("cannot visit {name}: {err}"));
        if outcome.is_noop() {
            return;
        }
        self.finish_walk(name);
    }

    /// Waits out the fade-out, serves the target's asset and the fade-in.
    fn finish_walk(&mut self, name: &str) {
        self.advance(600);
        let asset = self
            .controller
            .graph()
            .lookup(name)
            .expect("declared location")
            .asset_ref()
            .to_string();
        self.complete(&asset);
        self.advance(16);
        self.advance(2_100);
        assert!(self.controller.is_settled());
        assert_eq!(self.current(), Some(name));
    }

    fn status(&self) -> Option<String> {
        self.controller.telemetry().status_label()
    }
}

#[test]
fn clicking_front_then_behind_round_trips() {
    let mut harness = Harness::new(TWO_NODES, SessionSettings::default());
    harness.settle_at_start();
    assert_eq!(harness.current(), Some("A"));

    assert_eq!(
        harness.click(Direction::Front),
        NavigationOutcome::Started {
            target: "B".to_string()
        }
    );
    assert_eq!(harness.controller.state().phase(), NavigationPhase::FadingOut);
    // Nothing changes until the load resolves.
    harness.advance(600);
    assert_eq!(harness.controller.state().phase(), NavigationPhase::Loading);
    assert_eq!(harness.current(), Some("A"));

    harness.complete("b.img");
    let events = harness.advance(16);
    assert!(matches!(&events[..], [NavigationEvent::Arrived { name, .. }] if name == "B"));
    assert_eq!(harness.current(), Some("B"));
    harness.advance(2_100);
    assert!(harness.controller.is_settled());

    harness.click(Direction::Behind);
    harness.advance(600);
    harness.complete("a.img");
    harness.advance(16);
    harness.advance(2_100);
    assert_eq!(harness.current(), Some("A"));
    assert_eq!(
        harness.controller.loader().history(),
        ["a.img", "b.img", "a.img"]
    );
}

#[test]
fn unknown_location_changes_nothing() {
    let mut harness = Harness::new(TWO_NODES, SessionSettings::default());
    harness.settle_at_start();
    let before = harness.controller.state().clone();

    let err = harness
        .controller
        .navigate_to("Z", harness.clock)
        .expect_err("Z is not declared");
    assert_eq!(
        err,
        NavigationError::UnknownLocation(GraphLookupError {
            name: "Z".to_string()
        })
    );
    assert_eq!(harness.controller.state(), &before);
    assert_eq!(harness.controller.loader().pending(), 0);
}

#[test]
fn dangling_edge_fails_like_an_unknown_location() {
    let mut harness = Harness::new(
        r#"{ "A": { "asset": "a.img", "front": "Nowhere" } }"#,
        SessionSettings::default(),
    );
    harness.settle_at_start();
    let err = harness
        .controller
        .navigate_direction(Direction::Front, harness.clock)
        .expect_err("edge target is undeclared");
    assert!(matches!(err, NavigationError::UnknownLocation(_)));
    assert!(harness.controller.is_settled());
}

#[test]
fn rejected_load_keeps_previous_location() {
    let mut harness = Harness::new(TWO_NODES, SessionSettings::default());
    harness.settle_at_start();
    let renderer_calls = harness.renderer.calls().len();

    harness
        .controller
        .navigate_to("B", harness.clock)
        .expect("B exists");
    harness.advance(600);
    harness.reject("b.img");
    let events = harness.advance(16);

    assert!(matches!(
        &events[..],
        [NavigationEvent::LoadFailed { target, error: LoadError::Rejected { .. } }] if target == "B"
    ));
    let state = harness.controller.state();
    assert_eq!(state.current_node(), Some("A"));
    assert_eq!(state.phase(), NavigationPhase::Idle);
    assert_eq!(state.pending_target(), None);

    // Only brightness changed; the environment and markers were left alone.
    assert!(harness.renderer.calls()[renderer_calls..]
        .iter()
        .all(|call| matches!(call, RendererCall::Brightness(_))));
    assert_eq!(
        harness.status().as_deref(),
        Some("a.img size : 4.1 kB, Resolution: 16x8")
    );
    harness.advance(2_100);
    assert_eq!(harness.controller.transitions().opacity(), 1.0);
}

#[test]
fn rejected_first_load_leaves_no_location() {
    let mut harness = Harness::new(TWO_NODES, SessionSettings::default());
    harness.controller.start(harness.clock).expect("start");
    harness.reject("a.img");
    let events = harness.advance(16);
    assert!(matches!(&events[..], [NavigationEvent::LoadFailed { .. }]));
    assert_eq!(harness.current(), None);
    assert!(harness.controller.is_settled());
}

#[test]
fn last_request_wins_and_stale_results_are_ignored() {
    let graph = r#"{
        "A": { "asset": "a.img", "front": "B", "left": "C" },
        "B": { "asset": "b.img" },
        "C": { "asset": "c.img" }
    }"#;
    let mut harness = Harness::new(graph, SessionSettings::default());
    harness.settle_at_start();

    harness
        .controller
        .navigate_to("B", harness.clock)
        .expect("B exists");
    harness.advance(600);
    assert_eq!(harness.controller.state().phase(), NavigationPhase::Loading);

    let outcome = harness
        .controller
        .navigate_to("C", harness.clock)
        .expect("C exists");
    assert_eq!(
        outcome,
        NavigationOutcome::Superseded {
            previous: "B".to_string(),
            target: "C".to_string()
        }
    );

    // B finishes first but nobody is listening anymore.
    harness.complete("b.img");
    assert!(harness.advance(16).is_empty());
    assert_eq!(harness.current(), Some("A"));

    harness.complete("c.img");
    let events = harness.advance(16);
    assert!(matches!(&events[..], [NavigationEvent::Arrived { name, .. }] if name == "C"));
    assert_eq!(harness.current(), Some("C"));
}

#[test]
fn supersession_during_fade_out_loads_only_the_latest_target() {
    let graph = r#"{
        "A": { "asset": "a.img", "front": "B", "left": "C" },
        "B": { "asset": "b.img" },
        "C": { "asset": "c.img" }
    }"#;
    let mut harness = Harness::new(graph, SessionSettings::default());
    harness.settle_at_start();

    harness
        .controller
        .navigate_to("B", harness.clock)
        .expect("B exists");
    harness.advance(100);
    harness
        .controller
        .navigate_to("C", harness.clock)
        .expect("C exists");
    harness.advance(600);

    assert_eq!(harness.controller.loader().history(), ["a.img", "c.img"]);
}

#[test]
fn repeated_request_for_pending_target_does_not_reload() {
    let mut harness = Harness::new(TWO_NODES, SessionSettings::default());
    harness.settle_at_start();

    harness
        .controller
        .navigate_to("B", harness.clock)
        .expect("B exists");
    harness.advance(600);
    let again = harness
        .controller
        .navigate_to("B", harness.clock)
        .expect("B exists");
    assert_eq!(
        again,
        NavigationOutcome::AlreadyPending {
            target: "B".to_string()
        }
    );
    assert_eq!(harness.controller.loader().history(), ["a.img", "b.img"]);
}

#[test]
fn fades_land_exactly_on_their_targets() {
    let mut harness = Harness::new(TWO_NODES, SessionSettings::default());
    harness.settle_at_start();
    assert_eq!(harness.controller.transitions().opacity(), 1.0);
    assert!((harness.renderer.brightness() - 0.7).abs() < 1e-6);

    harness
        .controller
        .navigate_to("B", harness.clock)
        .expect("B exists");
    harness.advance(250);
    let midway = harness.controller.transitions().opacity();
    assert!(midway > 0.0 && midway < 1.0);
    harness.advance(250);
    assert_eq!(harness.controller.transitions().opacity(), 0.0);
    assert_eq!(harness.renderer.brightness(), 0.0);
}

#[test]
fn without_transitions_arrival_is_immediate() {
    let mut settings = SessionSettings::default();
    settings.transitions.enabled = false;
    let mut harness = Harness::new(TWO_NODES, settings);
    harness.settle_at_start();

    harness
        .controller
        .navigate_to("B", harness.clock)
        .expect("B exists");
    assert_eq!(harness.controller.state().phase(), NavigationPhase::Loading);
    harness.complete("b.img");
    let events = harness.advance(0);
    assert!(matches!(
        &events[..],
        [NavigationEvent::Arrived { .. }, NavigationEvent::Settled { name }] if name == "B"
    ));
    assert!(harness.controller.is_settled());
    assert!((harness.renderer.brightness() - 0.7).abs() < 1e-6);
}

#[test]
fn arrival_swaps_environment_and_markers_together() {
    let mut harness = Harness::new(TWO_NODES, SessionSettings::default());
    harness.settle_at_start();
    assert_eq!(harness.renderer.environment(), Some("a.img"));
    assert_eq!(harness.renderer.indicators().directions(), vec![Direction::Front]);

    harness.click(Direction::Front);
    harness.advance(600);
    harness.complete("b.img");
    let events = harness.advance(16);

    assert_eq!(harness.renderer.environment(), Some("b.img"));
    assert_eq!(harness.renderer.indicators().directions(), vec![Direction::Behind]);
    match &events[..] {
        [NavigationEvent::Arrived { status, .. }] => assert_eq!(
            status.as_deref(),
            Some("b.img size : 4.1 kB, Resolution: 16x8")
        ),
        other => panic!("unexpected events {other:?}"),
    }
}

#[test]
fn new_target_during_fade_in_fades_out_from_current_opacity() {
    let graph = r#"{
        "A": { "asset": "a.img", "front": "B" },
        "B": { "asset": "b.img", "left": "C" },
        "C": { "asset": "c.img" }
    }"#;
    let mut harness = Harness::new(graph, SessionSettings::default());
    harness.settle_at_start();

    harness.click(Direction::Front);
    harness.advance(600);
    harness.complete("b.img");
    harness.advance(16);
    harness.advance(500);
    assert_eq!(harness.controller.state().phase(), NavigationPhase::FadingIn);
    let midway = harness.controller.transitions().opacity();
    assert!(midway > 0.2 && midway < 0.3, "opacity {midway}");

    let outcome = harness
        .controller
        .navigate_to("C", harness.clock)
        .expect("C exists");
    assert_eq!(
        outcome,
        NavigationOutcome::Started {
            target: "C".to_string()
        }
    );
    assert_eq!(harness.controller.state().phase(), NavigationPhase::FadingOut);

    // Fading out starts where the fade-in stopped, never from full brightness.
    harness.advance(50);
    let fading = harness.controller.transitions().opacity();
    assert!(fading < midway && fading > 0.0, "opacity {fading}");

    harness.advance(100);
    assert_eq!(harness.controller.state().phase(), NavigationPhase::Loading);
    assert_eq!(harness.controller.transitions().opacity(), 0.0);

    harness.complete("c.img");
    let events = harness.advance(16);
    assert!(matches!(&events[..], [NavigationEvent::Arrived { name, .. }] if name == "C"));
    harness.advance(2_100);
    assert_eq!(harness.current(), Some("C"));
    assert_eq!(harness.renderer.environment(), Some("c.img"));
    assert_eq!(harness.controller.transitions().opacity(), 1.0);
    assert_eq!(
        harness.controller.loader().history(),
        ["a.img", "b.img", "c.img"]
    );
}

#[test]
fn turning_back_during_load_ignores_the_late_result() {
    let mut harness = Harness::new(TWO_NODES, SessionSettings::default());
    harness.settle_at_start();
    let label = harness.status();
    assert!(label.is_some());

    harness
        .controller
        .navigate_to("B", harness.clock)
        .expect("B exists");
    harness.advance(600);
    assert_eq!(harness.controller.state().phase(), NavigationPhase::Loading);
    let renderer_calls = harness.renderer.calls().len();

    let outcome = harness
        .controller
        .navigate_to("A", harness.clock)
        .expect("A exists");
    assert_eq!(
        outcome,
        NavigationOutcome::Superseded {
            previous: "B".to_string(),
            target: "A".to_string()
        }
    );
    assert_eq!(harness.controller.state().phase(), NavigationPhase::Idle);
    assert_eq!(harness.controller.state().pending_target(), None);
    assert_eq!(harness.controller.telemetry().stats(), None);

    harness.complete("b.img");
    assert!(harness.advance(16).is_empty());
    assert_eq!(harness.current(), Some("A"));
    assert_eq!(harness.renderer.environment(), Some("a.img"));
    assert!(!harness.renderer.calls()[renderer_calls..]
        .iter()
        .any(|call| matches!(call, RendererCall::Environment { .. })));
    assert_eq!(harness.status(), label);

    harness.advance(2_100);
    assert_eq!(harness.controller.transitions().opacity(), 1.0);
    assert_eq!(harness.controller.loader().history(), ["a.img", "b.img"]);
}

#[test]
fn every_campus_edge_is_walkable_by_clicking() {
    let mut harness = Harness::new(
        include_str!("../../assets/campus.json"),
        SessionSettings::default(),
    );
    harness.settle_at_start();

    let edges: Vec<(String, Direction, String)> = harness
        .controller
        .graph()
        .nodes()
        .flat_map(|node| {
            node.neighbors()
                .map(move |(direction, to)| (node.name().to_string(), direction, to.to_string()))
        })
        .collect();
    for direction in [
        Direction::Front,
        Direction::Behind,
        Direction::Left,
        Direction::Right,
    ] {
        assert!(
            edges.iter().any(|(_, d, _)| *d == direction),
            "campus has no {direction} edge"
        );
    }

    for (from, direction, to) in &edges {
        harness.visit(from);
        assert_eq!(
            harness.click(*direction),
            NavigationOutcome::Started { target: to.clone() },
            "{from} {direction}"
        );
        harness.finish_walk(to);
    }
}
