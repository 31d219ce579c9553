use std::time::{Duration, Instant};

use crate::renderer::SceneRenderer;

pub const DEFAULT_EXPOSURE: f32 = 0.7;
pub const MAX_EXPOSURE: f32 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeKind {
    Out,
    In,
}

impl FadeKind {
    fn target(self) -> f32 {
        match self {
            FadeKind::Out => 0.0,
            FadeKind::In => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionConfig {
    pub fade_out: Duration,
    pub fade_in: Duration,
    /// When false, environments swap instantly at full opacity.
    pub enabled: bool,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            fade_out: Duration::from_millis(500),
            fade_in: Duration::from_millis(2000),
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FadeCompletion {
    pub kind: FadeKind,
    pub id: u64,
}

#[derive(Debug, Clone, Copy)]
struct Fade {
    id: u64,
    kind: FadeKind,
    started_at: Instant,
    duration: Duration,
    from: f32,
}

/// Drives the scene opacity between 0 and 1 over time.
///
/// Only one fade runs at a time; starting another replaces it and continues
/// from the current opacity, taking time proportional to the distance left.
/// The brightness handed to the renderer is `exposure * opacity`, pushed only
/// when it changes.
#[derive(Debug)]
pub struct TransitionScheduler {
    active: Option<Fade>,
    opacity: f32,
    exposure: f32,
    next_id: u64,
    dirty: bool,
}

impl Default for TransitionScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_EXPOSURE)
    }
}

impl TransitionScheduler {
    pub fn new(exposure: f32) -> Self {
        Self {
            active: None,
            opacity: 0.0,
            exposure: exposure.clamp(0.0, MAX_EXPOSURE),
            next_id: 1,
            dirty: true,
        }
    }

    pub fn fade_out(&mut self, now: Instant, duration: Duration) -> u64 {
        self.start(FadeKind::Out, now, duration)
    }

    pub fn fade_in(&mut self, now: Instant, duration: Duration) -> u64 {
        self.start(FadeKind::In, now, duration)
    }

    fn start(&mut self, kind: FadeKind, now: Instant, duration: Duration) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        let remaining = (kind.target() - self.opacity).abs();
        self.active = Some(Fade {
            id,
            kind,
            started_at: now,
            duration: duration.mul_f32(remaining),
            from: self.opacity,
        });
        id
    }

    /// Jumps straight to `opacity`, cancelling any running fade.
    pub fn set_opacity(&mut self, opacity: f32) {
        self.active = None;
        self.update_opacity(opacity.clamp(0.0, 1.0));
    }

    pub fn set_exposure(&mut self, exposure: f32) {
        let exposure = exposure.clamp(0.0, MAX_EXPOSURE);
        if exposure != self.exposure {
            self.exposure = exposure;
            self.dirty = true;
        }
    }

    /// Advances the running fade to `now`. Returns the fade that reached its
    /// end during this call; each fade completes exactly once and finishes on
    /// its exact target value.
    pub fn tick<R: SceneRenderer + ?Sized>(
        &mut self,
        now: Instant,
        renderer: &mut R,
    ) -> Option<FadeCompletion> {
        let mut completion = None;
        if let Some(fade) = self.active {
            let elapsed = now.saturating_duration_since(fade.started_at);
            let target = fade.kind.target();
            if elapsed >= fade.duration {
                self.active = None;
                self.update_opacity(target);
                completion = Some(FadeCompletion {
                    kind: fade.kind,
                    id: fade.id,
                });
            } else {
                let progress = elapsed.as_secs_f32() / fade.duration.as_secs_f32();
                self.update_opacity(fade.from + (target - fade.from) * progress);
            }
        }
        if self.dirty {
            renderer.set_brightness_factor(self.brightness());
            self.dirty = false;
        }
        completion
    }

    fn update_opacity(&mut self, opacity: f32) {
        if opacity != self.opacity {
            self.opacity = opacity;
            self.dirty = true;
        }
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn exposure(&self) -> f32 {
        self.exposure
    }

    pub fn brightness(&self) -> f32 {
        self.exposure * self.opacity
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn active_kind(&self) -> Option<FadeKind> {
        self.active.map(|fade| fade.kind)
    }
}
