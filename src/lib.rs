// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

#![allow(clippy::multiple_crate_versions)]

//! # Motion Overlay Library
//!
//! Streaming pose-kinematics engine and composable visual-overlay passes for
//! recorded or live motion sessions.
//!
//! ## Features
//!
//! - **Streaming Kinematics** - Bounded per-joint history with lazy, memoized
//!   velocity, acceleration, and speed derivation
//! - **Selectable Smoothing** - Exponential moving average or Savitzky-Golay
//!   filtering applied before differentiation
//! - **Composable Passes** - Trail, vector field, speed heatmap, metrics HUD,
//!   and glow trail, each independently configured and fault-isolated
//! - **Inference Gating** - Motion-based skipping of redundant pose-provider
//!   calls with bounded staleness
//! - **Physical Units** - Optional pixel-to-meter conversion from a reference
//!   subject height
//!
//! ## Quick Start (Library)
//!
//! ```no_run
//! use motion_overlay::{PoseSample, VisualPipeline, VisualsConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = VisualsConfig::from_json(
//!         r#"{"trail": {"enabled": true}, "hud": {"enabled": true}}"#,
//!     )?;
//!     let mut pipeline = VisualPipeline::from_config(&config);
//!
//!     let frame = image::RgbImage::new(1280, 720);
//!     let sample = PoseSample::empty(); // one sample per frame from the provider
//!     let rendered = pipeline.apply_all(&frame, &sample, 30.0, Some(1.8));
//!     rendered.save("out.png")?;
//!     Ok(())
//! }
//! ```
//!
//! ## CLI Usage
//!
//! ```bash
//! # Replay a recorded session through the configured passes
//! motion-overlay run --source frames/ --landmarks pose.json --config visuals.json
//!
//! # Disable smart skipping and write elsewhere
//! motion-overlay run -s frames/ -l pose.json -c visuals.json -o out/ --smart-skip false
//! ```

// Modules
/// CLI and logging.
pub mod cli;

/// Colors, palettes, and color maps.
pub mod color;

/// Per-pass configuration.
pub mod config;

/// Raster drawing helpers.
pub mod draw;

/// Error types.
pub mod error;

/// Motion-based inference gating.
pub mod gate;

/// Smoothing, differentiation, and the kinematics buffer.
pub mod kinematics;

/// Visual passes and the pipeline.
pub mod passes;

/// Pose landmark types and state adaptation.
pub mod pose;

// Re-exports
pub use color::{Color, ColorMap};
pub use config::{
    GlowTrailConfig, HeatmapConfig, HudConfig, TrailConfig, VectorConfig, VisualsConfig,
};
pub use error::{OverlayError, Result};
pub use gate::InferenceGate;
pub use kinematics::{Kinematics, KinematicsBuffer, Smoothing};
pub use passes::{
    GlowTrailPass, HeatmapPass, HudPass, PassRegistry, TrailPass, VectorFieldPass, VisualPass,
    VisualPipeline,
};
pub use pose::{AdaptedState, Keypoint, PoseSample, NUM_KEYPOINTS};

/// Version of the library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the library.
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
        assert_eq!(VERSION.split('.').count(), 3);
    }

    #[test]
    fn test_name() {
        assert_eq!(NAME, "motion-overlay");
    }
}
