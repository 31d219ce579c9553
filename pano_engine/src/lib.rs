//! Navigation and transition engine for panorama walkthroughs.
//!
//! [`NavigationController`] owns the location graph, an [`AssetLoader`] and
//! the fade state, and drives any [`SceneRenderer`] from a per-frame
//! [`tick`](NavigationController::tick).

pub mod camera;
pub mod hit;
pub mod indicators;
pub mod loader;
pub mod navigation;
pub mod renderer;
pub mod settings;
pub mod state;
pub mod telemetry;
pub mod transition;

pub use camera::{CameraProjector, OrbitCamera, PickHit, PickKind, Ray, Viewport};
pub use hit::HitClassifier;
pub use indicators::{Indicator, IndicatorDiff, IndicatorLayout, IndicatorSet};
pub use loader::{
    AssetLoader, EquirectTexture, FileAssetLoader, HostLoader, LoadError, LoadPoll, LoadTicket,
    LoadedEnvironment, ReflectionData, ReflectionLevel,
};
pub use navigation::{NavigationController, NavigationError, NavigationEvent, NavigationOutcome};
pub use renderer::{HeadlessRenderer, RendererCall, SceneRenderer};
pub use settings::{load_settings_preset, SessionSettings, SettingsPreset};
pub use state::{NavigationPhase, NavigationState};
pub use telemetry::{human_file_size, AssetStats, LoadTelemetry};
pub use transition::{FadeKind, TransitionConfig, TransitionScheduler};
