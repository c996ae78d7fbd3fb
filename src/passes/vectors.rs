// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Velocity and acceleration arrows drawn per joint.

use image::RgbImage;
use ndarray::Array2;

use crate::config::VectorConfig;
use crate::draw::{draw_arrow_head, draw_dashed_line, draw_thick_line};
use crate::error::Result;
use crate::kinematics::KinematicsBuffer;
use crate::passes::VisualPass;
use crate::pose::{AdaptedState, NUM_KEYPOINTS};

/// Arrow shaft thickness in pixels.
const ARROW_THICKNESS: u32 = 2;

/// Magnitudes below this are treated as stationary.
const MIN_MAGNITUDE: f32 = 1e-6;

/// Scaled length above which a short vector is promoted to `min_length`
/// instead of being dropped.
const PROMOTE_LENGTH: f32 = 5.0;

/// Draws per-joint velocity arrows (solid) and acceleration arrows (dashed).
pub struct VectorFieldPass {
    config: VectorConfig,
    buffer: KinematicsBuffer,
    frame_count: u64,
}

impl VectorFieldPass {
    /// Create the pass from its configuration.
    #[must_use]
    pub fn new(config: VectorConfig) -> Self {
        let buffer = KinematicsBuffer::new(60, config.smooth, config.ema_alpha, config.savgol_window);
        Self {
            config,
            buffer,
            frame_count: 0,
        }
    }

    /// Map a raw vector to its drawn pixel length, or `None` to skip it.
    ///
    /// Vectors scaling below `min_length` are dropped unless they are long
    /// enough to still matter, in which case they are pinned at the minimum so
    /// slow-but-real motion stays visible.
    fn drawn_length(&self, magnitude: f32) -> Option<f32> {
        if magnitude < MIN_MAGNITUDE {
            return None;
        }
        let scaled = magnitude * self.config.scale;
        if scaled < self.config.min_length {
            if scaled > PROMOTE_LENGTH {
                return Some(self.config.min_length);
            }
            return None;
        }
        Some(scaled.min(self.config.max_length))
    }

    fn draw_arrow(
        &self,
        frame: &mut RgbImage,
        origin: (f32, f32),
        vector: (f32, f32),
        color: crate::color::Color,
        dashed: bool,
    ) {
        let magnitude = vector.0.hypot(vector.1);
        let Some(length) = self.drawn_length(magnitude) else {
            return;
        };

        let end = (
            origin.0 + vector.0 / magnitude * length,
            origin.1 + vector.1 / magnitude * length,
        );

        if dashed {
            draw_dashed_line(frame, origin, end, color, ARROW_THICKNESS);
        } else {
            draw_thick_line(frame, origin, end, color, ARROW_THICKNESS);
        }
        draw_arrow_head(frame, origin, end, color, ARROW_THICKNESS);
    }
}

impl VisualPass for VectorFieldPass {
    fn name(&self) -> &'static str {
        "vectors"
    }

    fn enabled(&self) -> bool {
        self.config.enabled
    }

    fn apply(&mut self, frame: &RgbImage, state: &AdaptedState) -> Result<RgbImage> {
        let mut result = frame.clone();
        if !self.enabled() {
            return Ok(result);
        }

        #[allow(clippy::cast_precision_loss)]
        let timestamp = self.frame_count as f64 / f64::from(state.fps.max(1.0));
        self.frame_count += 1;

        let mut positions = Array2::zeros((NUM_KEYPOINTS, 2));
        for (j, kp) in state.points.iter().enumerate() {
            positions[[j, 0]] = kp.x;
            positions[[j, 1]] = kp.y;
        }
        self.buffer.append(positions, timestamp);

        let kin = self.buffer.current().clone();
        for &joint in &self.config.target_joints {
            if joint >= NUM_KEYPOINTS || !state.points[joint].visible() {
                continue;
            }
            let origin = (state.points[joint].x, state.points[joint].y);

            if self.config.show_velocity {
                let v = (
                    kin.velocity[[joint, 0]] * state.px_to_unit,
                    kin.velocity[[joint, 1]] * state.px_to_unit,
                );
                self.draw_arrow(&mut result, origin, v, self.config.velocity_color, false);
            }
            if self.config.show_acceleration {
                let a = (
                    kin.acceleration[[joint, 0]] * state.px_to_unit,
                    kin.acceleration[[joint, 1]] * state.px_to_unit,
                );
                self.draw_arrow(&mut result, origin, a, self.config.acceleration_color, true);
            }
        }

        Ok(result)
    }
}
