use std::{fs, path::Path, time::Duration};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::camera::OrbitCamera;
use crate::hit::HitClassifier;
use crate::indicators::IndicatorLayout;
use crate::transition::{TransitionConfig, DEFAULT_EXPOSURE, MAX_EXPOSURE};

/// Optional overrides read from a `--settings` JSON file. Anything left out
/// keeps its built-in default.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct SettingsPreset {
    #[serde(default)]
    pub fade_out_ms: Option<u64>,
    #[serde(default)]
    pub fade_in_ms: Option<u64>,
    #[serde(default)]
    pub transitions: Option<bool>,
    #[serde(default)]
    pub exposure: Option<f32>,
    #[serde(default)]
    pub hit_tolerance: Option<f32>,
    #[serde(default)]
    pub indicator_reach: Option<f32>,
    #[serde(default)]
    pub indicator_height: Option<f32>,
    #[serde(default)]
    pub indicator_size: Option<f32>,
    #[serde(default)]
    pub pick_radius: Option<f32>,
    #[serde(default)]
    pub camera_distance: Option<f32>,
    #[serde(default)]
    pub fov_degrees: Option<f32>,
}

pub fn load_settings_preset(path: &Path) -> Result<SettingsPreset> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading settings preset {}", path.display()))?;
    let preset: SettingsPreset = serde_json::from_str(&data)
        .with_context(|| format!("parsing settings preset {}", path.display()))?;
    Ok(preset)
}

/// Tunables for one navigation session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub transitions: TransitionConfig,
    pub exposure: f32,
    pub hit_tolerance: f32,
    pub indicators: IndicatorLayout,
    pub camera: OrbitCamera,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            transitions: TransitionConfig::default(),
            exposure: DEFAULT_EXPOSURE,
            hit_tolerance: 20.0,
            indicators: IndicatorLayout::default(),
            camera: OrbitCamera::default(),
        }
    }
}

impl SessionSettings {
    pub fn with_preset(mut self, preset: &SettingsPreset) -> Self {
        if let Some(ms) = preset.fade_out_ms {
            self.transitions.fade_out = Duration::from_millis(ms);
        }
        if let Some(ms) = preset.fade_in_ms {
            self.transitions.fade_in = Duration::from_millis(ms);
        }
        if let Some(enabled) = preset.transitions {
            self.transitions.enabled = enabled;
        }
        if let Some(exposure) = preset.exposure {
            self.exposure = exposure.clamp(0.0, MAX_EXPOSURE);
        }
        if let Some(tolerance) = preset.hit_tolerance {
            self.hit_tolerance = tolerance.max(0.0);
        }
        if let Some(reach) = preset.indicator_reach {
            self.indicators.reach = reach;
        }
        if let Some(height) = preset.indicator_height {
            self.indicators.height = height;
        }
        if let Some(size) = preset.indicator_size {
            self.indicators.size = size;
        }
        if let Some(radius) = preset.pick_radius {
            self.indicators.pick_radius = radius.max(0.0);
        }
        if let Some(distance) = preset.camera_distance {
            self.camera.distance =
                distance.clamp(self.camera.min_distance, self.camera.max_distance);
        }
        if let Some(fov) = preset.fov_degrees {
            self.camera.fov_y_degrees = fov.clamp(10.0, 120.0);
        }
        self
    }

    /// Classifier whose zones sit on the indicator positions.
    pub fn classifier(&self) -> HitClassifier {
        HitClassifier::new(self.indicators.reach, self.hit_tolerance)
    }
}
