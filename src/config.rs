// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Per-pass configuration.
//!
//! Pass configuration arrives as a nested mapping, one section per pass name.
//! Each section deserializes independently so that a malformed section drops
//! only that pass, and unknown keys inside a section are ignored. Missing keys
//! take the documented defaults.

use serde::Deserialize;
use serde_json::Value;

use crate::color::{Color, ColorMap};
use crate::error::{OverlayError, Result};
use crate::kinematics::Smoothing;
use crate::pose::{
    LEFT_ANKLE, LEFT_ELBOW, LEFT_HIP, LEFT_KNEE, LEFT_SHOULDER, LEFT_WRIST, RIGHT_ANKLE,
    RIGHT_ELBOW, RIGHT_HIP, RIGHT_KNEE, RIGHT_SHOULDER, RIGHT_WRIST,
};

fn default_trail_length() -> usize {
    200
}
fn default_thickness() -> u32 {
    2
}
fn default_white() -> Color {
    Color::WHITE
}
fn default_glow_radius() -> u32 {
    15
}
fn default_glow_intensity() -> f32 {
    0.8
}
fn default_glow_color() -> Color {
    Color::CYAN
}
fn default_min_speed_threshold() -> f32 {
    5.0
}
fn default_vector_scale() -> f32 {
    0.6
}
fn default_velocity_color() -> Color {
    Color::GREEN
}
fn default_acceleration_color() -> Color {
    Color::RED
}
fn default_min_vector_length() -> f32 {
    10.0
}
fn default_max_vector_length() -> f32 {
    100.0
}
fn default_ema_alpha() -> f32 {
    0.3
}
fn default_savgol_window() -> usize {
    5
}
fn default_vector_joints() -> Vec<usize> {
    vec![
        LEFT_SHOULDER,
        RIGHT_SHOULDER,
        LEFT_ELBOW,
        RIGHT_ELBOW,
        LEFT_WRIST,
        RIGHT_WRIST,
        LEFT_HIP,
        RIGHT_HIP,
    ]
}
fn default_heatmap_radius() -> u32 {
    24
}
fn default_heatmap_alpha() -> f32 {
    0.35
}
fn default_max_speed() -> f32 {
    50.0
}
fn default_min_speed() -> f32 {
    2.0
}
fn default_heatmap_joints() -> Vec<usize> {
    vec![
        LEFT_SHOULDER,
        RIGHT_SHOULDER,
        LEFT_ELBOW,
        RIGHT_ELBOW,
        LEFT_WRIST,
        RIGHT_WRIST,
        LEFT_HIP,
        RIGHT_HIP,
        LEFT_KNEE,
        RIGHT_KNEE,
        LEFT_ANKLE,
        RIGHT_ANKLE,
    ]
}
fn default_release_threshold() -> f32 {
    22.0
}
fn default_flash_duration() -> f32 {
    0.5
}
fn default_hud_alpha() -> f32 {
    0.8
}
fn default_panel_color() -> Color {
    Color::BLACK
}
fn default_accent_color() -> Color {
    Color::CYAN
}
fn default_warning_color() -> Color {
    Color::RED
}

/// Trail pass configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrailConfig {
    /// Whether the pass is active.
    pub enabled: bool,
    /// Point-buffer capacity.
    pub max_length: usize,
    /// Line thickness in pixels.
    pub thickness: u32,
    /// Trail color.
    pub color: Color,
    /// Fade older segments by scaling thickness and blending.
    pub fade_alpha: bool,
}

impl Default for TrailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_length: default_trail_length(),
            thickness: default_thickness(),
            color: default_white(),
            fade_alpha: true,
        }
    }
}

/// Glow-trail pass configuration. Extends the trail settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GlowTrailConfig {
    /// Base trail settings.
    #[serde(flatten)]
    pub trail: TrailConfig,
    /// Peak glow stroke radius in pixels.
    pub glow_radius: u32,
    /// Glow blend strength in [0, 1].
    pub glow_intensity: f32,
    /// Glow color.
    pub glow_color: Color,
    /// Gate the glow on recent tracked-point speed.
    pub speed_responsive: bool,
    /// Mean-speed floor (px/s) below which the glow is skipped.
    pub min_speed_threshold: f32,
}

impl Default for GlowTrailConfig {
    fn default() -> Self {
        Self {
            trail: TrailConfig::default(),
            glow_radius: default_glow_radius(),
            glow_intensity: default_glow_intensity(),
            glow_color: default_glow_color(),
            speed_responsive: true,
            min_speed_threshold: default_min_speed_threshold(),
        }
    }
}

/// Vector-field pass configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VectorConfig {
    /// Whether the pass is active.
    pub enabled: bool,
    /// Magnitude-to-pixels scale factor.
    pub scale: f32,
    /// Draw velocity arrows.
    pub show_velocity: bool,
    /// Draw acceleration arrows (dashed).
    pub show_acceleration: bool,
    /// Velocity arrow color.
    pub velocity_color: Color,
    /// Acceleration arrow color.
    pub acceleration_color: Color,
    /// Minimum drawn arrow length in pixels.
    pub min_length: f32,
    /// Maximum drawn arrow length in pixels.
    pub max_length: f32,
    /// Position smoothing mode.
    pub smooth: Smoothing,
    /// EMA smoothing coefficient.
    pub ema_alpha: f32,
    /// Savitzky-Golay window length.
    pub savgol_window: usize,
    /// Joints to draw vectors for.
    pub target_joints: Vec<usize>,
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            scale: default_vector_scale(),
            show_velocity: true,
            show_acceleration: true,
            velocity_color: default_velocity_color(),
            acceleration_color: default_acceleration_color(),
            min_length: default_min_vector_length(),
            max_length: default_max_vector_length(),
            smooth: Smoothing::Ema,
            ema_alpha: default_ema_alpha(),
            savgol_window: default_savgol_window(),
            target_joints: default_vector_joints(),
        }
    }
}

/// Heatmap pass configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HeatmapConfig {
    /// Whether the pass is active.
    pub enabled: bool,
    /// Gaussian splat radius in pixels.
    pub radius: u32,
    /// Blend strength in [0, 1].
    pub alpha: f32,
    /// Scalar color map.
    pub colormap: ColorMap,
    /// Fixed dynamic-range ceiling (speed units).
    pub max_speed: f32,
    /// Dynamic-range floor (speed units).
    pub min_speed: f32,
    /// Raise the ceiling from recent observed speeds.
    pub adaptive_scale: bool,
    /// Position smoothing mode.
    pub smooth: Smoothing,
    /// EMA smoothing coefficient.
    pub ema_alpha: f32,
    /// Savitzky-Golay window length.
    pub savgol_window: usize,
    /// Joints contributing heat.
    pub target_joints: Vec<usize>,
}

impl Default for HeatmapConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            radius: default_heatmap_radius(),
            alpha: default_heatmap_alpha(),
            colormap: ColorMap::default(),
            max_speed: default_max_speed(),
            min_speed: default_min_speed(),
            adaptive_scale: true,
            smooth: Smoothing::Ema,
            ema_alpha: default_ema_alpha(),
            savgol_window: default_savgol_window(),
            target_joints: default_heatmap_joints(),
        }
    }
}

/// HUD pass configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HudConfig {
    /// Whether the pass is active.
    pub enabled: bool,
    /// Draw the metrics panel.
    pub show_metrics: bool,
    /// Draw the circular gauges.
    pub show_gauges: bool,
    /// Draw events and the release flash.
    pub show_events: bool,
    /// Tracked-point speed (physical units) that triggers a release event.
    pub release_speed_threshold: f32,
    /// Flash overlay duration in seconds.
    pub release_flash_duration: f32,
    /// Panel blend strength in [0, 1].
    pub alpha: f32,
    /// Panel fill color.
    pub panel_color: Color,
    /// Body text color.
    pub text_color: Color,
    /// Accent color for highlights and the speed gauge.
    pub accent_color: Color,
    /// Warning color for the flash and near-threshold values.
    pub warning_color: Color,
}

impl Default for HudConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            show_metrics: true,
            show_gauges: true,
            show_events: true,
            release_speed_threshold: default_release_threshold(),
            release_flash_duration: default_flash_duration(),
            alpha: default_hud_alpha(),
            panel_color: default_panel_color(),
            text_color: default_white(),
            accent_color: default_accent_color(),
            warning_color: default_warning_color(),
        }
    }
}

/// Raw pass-configuration mapping: pass name to config section.
///
/// Kept as loose JSON so the registry can deserialize each section on its own
/// and degrade per section instead of rejecting the whole mapping.
#[derive(Debug, Clone, Default)]
pub struct VisualsConfig {
    sections: serde_json::Map<String, Value>,
}

impl VisualsConfig {
    /// Build from a JSON value; must be an object.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(sections) => Ok(Self { sections }),
            other => Err(OverlayError::ConfigError(format!(
                "expected a mapping of pass sections, got {other}"
            ))),
        }
    }

    /// Parse from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_value(serde_json::from_str(json)?)
    }

    /// Look up a pass section by name.
    #[must_use]
    pub fn section(&self, name: &str) -> Option<&Value> {
        self.sections.get(name)
    }

    /// Names of all configured sections.
    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    /// Deserialize one section into a typed config. `None` when the section is
    /// missing; `Err` when it is present but malformed.
    pub fn typed_section<T: serde::de::DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        match self.sections.get(name) {
            None => Ok(None),
            Some(value) => {
                let parsed = serde_json::from_value(value.clone()).map_err(|e| {
                    OverlayError::ConfigError(format!("section '{name}': {e}"))
                })?;
                Ok(Some(parsed))
            }
        }
    }
}
