// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Composable visual passes and the pipeline that applies them.
//!
//! A pass is one stateful, independently configurable visual transform.
//! Passes own all of their frame-to-frame state and never share buffers; the
//! pipeline applies them in a fixed order with per-pass fault isolation, so a
//! faulty pass degrades one frame but never aborts the run.

use image::RgbImage;

use crate::config::{GlowTrailConfig, HeatmapConfig, HudConfig, TrailConfig, VectorConfig, VisualsConfig};
use crate::error::Result;
use crate::pose::{AdaptedState, PoseSample};

/// Trail rendering.
pub mod trail;

/// Velocity/acceleration arrows.
pub mod vectors;

/// Speed heatmap.
pub mod heatmap;

/// Metrics HUD.
pub mod hud;

pub use heatmap::HeatmapPass;
pub use hud::HudPass;
pub use trail::{GlowTrailPass, TrailPass};
pub use vectors::VectorFieldPass;

/// One visual transform over a frame.
pub trait VisualPass {
    /// Stable pass name, used in configuration and diagnostics.
    fn name(&self) -> &'static str;

    /// Whether the pass should run.
    fn enabled(&self) -> bool;

    /// Render the pass onto a copy of `frame`. The input frame is never
    /// mutated; on error the pipeline discards this pass's contribution.
    fn apply(&mut self, frame: &RgbImage, state: &AdaptedState) -> Result<RgbImage>;
}

/// Fixed application order. Later passes composite on top of earlier ones;
/// the glow trail runs last so it stays in front.
pub const PASS_ORDER: [&str; 5] = ["trail", "vectors", "heatmap", "hud", "glow_trail"];

/// Builds the active pass list from configuration.
pub struct PassRegistry;

impl PassRegistry {
    /// Build the enabled passes in [`PASS_ORDER`]. Unknown section names and
    /// malformed sections are logged and skipped, never fatal.
    #[must_use]
    pub fn build(config: &VisualsConfig) -> Vec<Box<dyn VisualPass>> {
        let mut passes: Vec<Box<dyn VisualPass>> = Vec::new();

        for name in PASS_ORDER {
            match Self::create(name, config) {
                Ok(Some(pass)) => {
                    if pass.enabled() {
                        crate::verbose!("Enabled visual pass: {name}");
                        passes.push(pass);
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    crate::warn!("Skipping visual pass '{name}': {e}");
                }
            }
        }

        for name in config.section_names() {
            if !PASS_ORDER.contains(&name) {
                crate::warn!("Unknown visual pass: {name}");
            }
        }

        crate::verbose!("Created {} visual passes", passes.len());
        passes
    }

    fn create(name: &str, config: &VisualsConfig) -> Result<Option<Box<dyn VisualPass>>> {
        Ok(match name {
            "trail" => config
                .typed_section::<TrailConfig>(name)?
                .map(|c| Box::new(TrailPass::new(c)) as Box<dyn VisualPass>),
            "vectors" => config
                .typed_section::<VectorConfig>(name)?
                .map(|c| Box::new(VectorFieldPass::new(c)) as Box<dyn VisualPass>),
            "heatmap" => config
                .typed_section::<HeatmapConfig>(name)?
                .map(|c| Box::new(HeatmapPass::new(c)) as Box<dyn VisualPass>),
            "hud" => config
                .typed_section::<HudConfig>(name)?
                .map(|c| Box::new(HudPass::new(c)) as Box<dyn VisualPass>),
            "glow_trail" => config
                .typed_section::<GlowTrailConfig>(name)?
                .map(|c| Box::new(GlowTrailPass::new(c)) as Box<dyn VisualPass>),
            _ => None,
        })
    }
}

/// Applies the active passes to each frame in order.
pub struct VisualPipeline {
    passes: Vec<Box<dyn VisualPass>>,
    frame_index: u64,
}

impl VisualPipeline {
    /// Wrap an explicit pass list.
    #[must_use]
    pub fn new(passes: Vec<Box<dyn VisualPass>>) -> Self {
        Self {
            passes,
            frame_index: 0,
        }
    }

    /// Build the pipeline from configuration via [`PassRegistry`].
    #[must_use]
    pub fn from_config(config: &VisualsConfig) -> Self {
        Self::new(PassRegistry::build(config))
    }

    /// Number of active passes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.passes.len()
    }

    /// Whether no passes are active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    /// Adapt the raw sample once and thread the frame through every pass.
    ///
    /// A pass error is logged with the pass identity and frame index, that
    /// pass's output is discarded for the frame, and the remaining passes
    /// continue from the pre-pass frame. With no passes the input is returned
    /// unchanged.
    pub fn apply_all(
        &mut self,
        frame: &RgbImage,
        sample: &PoseSample,
        fps: f32,
        reference_height: Option<f32>,
    ) -> RgbImage {
        let index = self.frame_index;
        self.frame_index += 1;

        if self.passes.is_empty() {
            return frame.clone();
        }

        let state = AdaptedState::from_sample(
            sample,
            fps,
            reference_height,
            (frame.height(), frame.width()),
        );

        let mut result = frame.clone();
        for pass in &mut self.passes {
            match pass.apply(&result, &state) {
                Ok(next) => result = next,
                Err(e) => {
                    crate::error!("Visual pass '{}' failed on frame {index}: {e}", pass.name());
                }
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OverlayError;
    use crate::pose::RIGHT_WRIST;

    struct FailingPass;

    impl VisualPass for FailingPass {
        fn name(&self) -> &'static str {
            "failing"
        }
        fn enabled(&self) -> bool {
            true
        }
        fn apply(&mut self, _frame: &RgbImage, _state: &AdaptedState) -> Result<RgbImage> {
            Err(OverlayError::PassError("always fails".to_string()))
        }
    }

    struct FillPass;

    impl VisualPass for FillPass {
        fn name(&self) -> &'static str {
            "fill"
        }
        fn enabled(&self) -> bool {
            true
        }
        fn apply(&mut self, frame: &RgbImage, _state: &AdaptedState) -> Result<RgbImage> {
            Ok(RgbImage::from_pixel(
                frame.width(),
                frame.height(),
                image::Rgb([1, 2, 3]),
            ))
        }
    }

    fn wrist_sample() -> PoseSample {
        let mut sample = PoseSample::empty();
        sample.points[RIGHT_WRIST] = Some((10.0, 10.0));
        sample
    }

    #[test]
    fn test_empty_pipeline_returns_input_unchanged() {
        let mut pipeline = VisualPipeline::new(Vec::new());
        let frame = RgbImage::from_pixel(16, 8, image::Rgb([9, 9, 9]));
        let out = pipeline.apply_all(&frame, &wrist_sample(), 30.0, None);
        assert_eq!(out.as_raw(), frame.as_raw());
    }

    #[test]
    fn test_failing_pass_is_isolated() {
        let mut pipeline = VisualPipeline::new(vec![Box::new(FailingPass)]);
        let frame = RgbImage::from_pixel(16, 8, image::Rgb([7, 7, 7]));

        // Faulty pass never changes the frame, and later frames still process
        for _ in 0..3 {
            let out = pipeline.apply_all(&frame, &wrist_sample(), 30.0, None);
            assert_eq!(out.as_raw(), frame.as_raw());
        }
    }

    #[test]
    fn test_failure_does_not_block_later_passes() {
        let mut pipeline =
            VisualPipeline::new(vec![Box::new(FailingPass), Box::new(FillPass)]);
        let frame = RgbImage::new(4, 4);
        let out = pipeline.apply_all(&frame, &wrist_sample(), 30.0, None);
        assert_eq!(out.get_pixel(0, 0).0, [1, 2, 3]);
    }

    #[test]
    fn test_registry_builds_in_fixed_order() {
        let config = VisualsConfig::from_json(
            r#"{
                "glow_trail": {"enabled": true},
                "hud": {"enabled": true},
                "trail": {"enabled": true}
            }"#,
        )
        .unwrap();

        let passes = PassRegistry::build(&config);
        let names: Vec<&str> = passes.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["trail", "hud", "glow_trail"]);
    }

    #[test]
    fn test_registry_skips_disabled_and_unknown() {
        let config = VisualsConfig::from_json(
            r#"{
                "trail": {"enabled": false},
                "laser_grid": {"enabled": true}
            }"#,
        )
        .unwrap();
        let passes = PassRegistry::build(&config);
        assert!(passes.is_empty());
    }

    #[test]
    fn test_registry_drops_only_malformed_section() {
        let config = VisualsConfig::from_json(
            r#"{
                "trail": {"enabled": true, "thickness": "wide"},
                "hud": {"enabled": true}
            }"#,
        )
        .unwrap();
        let passes = PassRegistry::build(&config);
        let names: Vec<&str> = passes.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["hud"]);
    }
}
