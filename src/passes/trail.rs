// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Tracked-point trail passes: plain polyline trail and the speed-responsive
//! glow variant.

use std::collections::VecDeque;

use image::{GrayImage, RgbImage};
use imageproc::filter::gaussian_blur_f32;

use crate::config::{GlowTrailConfig, TrailConfig};
use crate::draw::{additive_glow, blend_weighted, draw_thick_line, draw_thick_line_gray, sigma_for_kernel};
use crate::error::Result;
use crate::passes::VisualPass;
use crate::pose::AdaptedState;

/// Opacity of the faded-trail overlay blend.
const FADE_BLEND: f32 = 0.6;

/// Draws the tracked point's recent path as connected line segments.
pub struct TrailPass {
    config: TrailConfig,
    points: VecDeque<(i32, i32)>,
}

impl TrailPass {
    /// Create the pass from its configuration.
    #[must_use]
    pub fn new(config: TrailConfig) -> Self {
        let capacity = config.max_length + 1;
        Self {
            config,
            points: VecDeque::with_capacity(capacity),
        }
    }

    /// Buffered trail points, oldest first.
    #[must_use]
    pub fn points(&self) -> &VecDeque<(i32, i32)> {
        &self.points
    }

    /// Drop all buffered points.
    pub fn reset(&mut self) {
        self.points.clear();
    }

    fn push_tracked(&mut self, state: &AdaptedState) {
        if let Some(point) = state.tracked_pixel() {
            self.points.push_back(point);
            while self.points.len() > self.config.max_length {
                self.points.pop_front();
            }
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn draw(&self, frame: &mut RgbImage) {
        if self.points.len() < 2 {
            return;
        }

        let n = self.points.len();
        if self.config.fade_alpha {
            // Older segments get thinner on an overlay, then a partial blend
            let mut overlay = frame.clone();
            for i in 1..n {
                let recency = i as f32 / n as f32;
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let thickness = ((self.config.thickness as f32 * recency) as u32).max(1);
                let a = self.points[i - 1];
                let b = self.points[i];
                draw_thick_line(
                    &mut overlay,
                    (a.0 as f32, a.1 as f32),
                    (b.0 as f32, b.1 as f32),
                    self.config.color,
                    thickness,
                );
            }
            blend_weighted(frame, &overlay, FADE_BLEND);
        } else {
            for i in 1..n {
                let a = self.points[i - 1];
                let b = self.points[i];
                draw_thick_line(
                    frame,
                    (a.0 as f32, a.1 as f32),
                    (b.0 as f32, b.1 as f32),
                    self.config.color,
                    self.config.thickness,
                );
            }
        }
    }
}

impl VisualPass for TrailPass {
    fn name(&self) -> &'static str {
        "trail"
    }

    fn enabled(&self) -> bool {
        self.config.enabled
    }

    fn apply(&mut self, frame: &RgbImage, state: &AdaptedState) -> Result<RgbImage> {
        let mut result = frame.clone();
        if !self.enabled() {
            return Ok(result);
        }
        self.push_tracked(state);
        self.draw(&mut result);
        Ok(result)
    }
}

/// Trail with a blurred, additively composited glow that responds to the
/// tracked point's recent speed.
pub struct GlowTrailPass {
    config: GlowTrailConfig,
    trail: TrailPass,
    speed_history: VecDeque<f32>,
}

/// Speed history capacity (frames).
const SPEED_HISTORY_CAP: usize = 30;
/// Speed (px/s) at which the glow reaches full intensity.
const SPEED_SCALE: f32 = 50.0;
/// Minimum buffered points before any glow is drawn.
const MIN_GLOW_POINTS: usize = 5;
/// Number of most recent points the glow covers.
const GLOW_WINDOW: usize = 15;

impl GlowTrailPass {
    /// Create the pass from its configuration.
    #[must_use]
    pub fn new(config: GlowTrailConfig) -> Self {
        let trail = TrailPass::new(config.trail.clone());
        Self {
            config,
            trail,
            speed_history: VecDeque::with_capacity(SPEED_HISTORY_CAP + 1),
        }
    }

    /// Buffered trail points, oldest first.
    #[must_use]
    pub fn points(&self) -> &VecDeque<(i32, i32)> {
        self.trail.points()
    }

    fn push_speed(&mut self, speed: f32) {
        self.speed_history.push_back(speed);
        while self.speed_history.len() > SPEED_HISTORY_CAP {
            self.speed_history.pop_front();
        }
    }

    /// Estimate the tracked point's speed from the last two buffered points.
    /// Called before the base trail appends the current frame's point.
    #[allow(clippy::cast_precision_loss)]
    fn update_speed_history(&mut self, state: &AdaptedState) {
        let points = self.trail.points();
        if state.tracked.is_some() && points.len() >= 2 {
            let a = points[points.len() - 2];
            let b = points[points.len() - 1];
            let dx = (b.0 - a.0) as f32;
            let dy = (b.1 - a.1) as f32;
            let speed = dx.hypot(dy) * state.fps;
            self.push_speed(speed);
        } else {
            self.push_speed(0.0);
        }
    }

    fn recent_mean_speed(&self) -> f32 {
        let window: Vec<f32> = self
            .speed_history
            .iter()
            .rev()
            .take(10)
            .copied()
            .collect();
        if window.is_empty() {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let mean = window.iter().sum::<f32>() / window.len() as f32;
        mean
    }

    fn recent_max_speed(&self) -> f32 {
        self.speed_history
            .iter()
            .rev()
            .take(5)
            .copied()
            .fold(0.0, f32::max)
    }

    #[allow(clippy::cast_precision_loss)]
    fn add_glow(&self, frame: &mut RgbImage) {
        let points = self.trail.points();
        if points.len() < MIN_GLOW_POINTS {
            return;
        }

        if self.config.speed_responsive && self.recent_mean_speed() < self.config.min_speed_threshold
        {
            return;
        }

        let intensity = if self.config.speed_responsive && !self.speed_history.is_empty() {
            (self.recent_max_speed() / SPEED_SCALE).min(1.0)
        } else {
            1.0
        };

        let (width, height) = frame.dimensions();
        let mut mask = GrayImage::new(width, height);

        let window = GLOW_WINDOW.min(points.len());
        let recent: Vec<(i32, i32)> = points.iter().skip(points.len() - window).copied().collect();
        for i in 1..recent.len() {
            let age = i as f32 / recent.len() as f32;
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let thickness = ((self.config.glow_radius as f32 * age * intensity) as u32).max(2);
            let a = recent[i - 1];
            let b = recent[i];
            draw_thick_line_gray(
                &mut mask,
                (a.0 as f32, a.1 as f32),
                (b.0 as f32, b.1 as f32),
                255,
                thickness,
            );
        }

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let mut blur_size = (self.config.glow_radius as f32 * 1.5) as u32;
        if blur_size % 2 == 0 {
            blur_size += 1;
        }
        let blurred = gaussian_blur_f32(&mask, sigma_for_kernel(blur_size));

        additive_glow(
            frame,
            &blurred,
            self.config.glow_color,
            self.config.glow_intensity * intensity,
        );
    }
}

impl VisualPass for GlowTrailPass {
    fn name(&self) -> &'static str {
        "glow_trail"
    }

    fn enabled(&self) -> bool {
        self.config.trail.enabled
    }

    fn apply(&mut self, frame: &RgbImage, state: &AdaptedState) -> Result<RgbImage> {
        if !self.enabled() {
            return Ok(frame.clone());
        }

        // Speed sampled from the points already buffered, before this frame's
        // point is appended by the base trail
        self.update_speed_history(state);

        let mut result = self.trail.apply(frame, state)?;
        if self.trail.points().len() >= 2 {
            self.add_glow(&mut result);
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::{PoseSample, RIGHT_WRIST};

    fn state_with_wrist(x: f32, y: f32) -> AdaptedState {
        let mut sample = PoseSample::empty();
        sample.points[RIGHT_WRIST] = Some((x, y));
        AdaptedState::from_sample(&sample, 30.0, None, (240, 320))
    }

    fn enabled_trail(fade: bool) -> TrailPass {
        TrailPass::new(TrailConfig {
            enabled: true,
            fade_alpha: fade,
            ..TrailConfig::default()
        })
    }

    #[test]
    fn test_trail_buffers_points_in_order() {
        let mut pass = enabled_trail(false);
        let frame = RgbImage::new(320, 240);

        for x in [100.0, 120.0, 140.0] {
            pass.apply(&frame, &state_with_wrist(x, 100.0)).unwrap();
        }

        let points: Vec<(i32, i32)> = pass.points().iter().copied().collect();
        assert_eq!(points, vec![(100, 100), (120, 100), (140, 100)]);
    }

    #[test]
    fn test_trail_draws_once_two_points_exist() {
        let mut pass = enabled_trail(false);
        let frame = RgbImage::new(320, 240);

        let out = pass.apply(&frame, &state_with_wrist(100.0, 100.0)).unwrap();
        assert_eq!(out.as_raw(), frame.as_raw());

        let out = pass.apply(&frame, &state_with_wrist(140.0, 100.0)).unwrap();
        assert!(out.as_raw() != frame.as_raw());
        assert_eq!(out.get_pixel(120, 100).0, [255, 255, 255]);
    }

    #[test]
    fn test_trail_ignores_out_of_bounds_point() {
        let mut pass = enabled_trail(false);
        let frame = RgbImage::new(320, 240);
        pass.apply(&frame, &state_with_wrist(1000.0, 100.0)).unwrap();
        assert!(pass.points().is_empty());
    }

    #[test]
    fn test_trail_buffer_is_capped() {
        let mut pass = TrailPass::new(TrailConfig {
            enabled: true,
            max_length: 3,
            fade_alpha: false,
            ..TrailConfig::default()
        });
        let frame = RgbImage::new(320, 240);
        for x in 0..10 {
            pass.apply(&frame, &state_with_wrist(x as f32 + 10.0, 50.0))
                .unwrap();
        }
        assert_eq!(pass.points().len(), 3);
        assert_eq!(*pass.points().front().unwrap(), (17, 50));
    }

    #[test]
    fn test_disabled_trail_passes_frame_through() {
        let mut pass = TrailPass::new(TrailConfig::default());
        let frame = RgbImage::from_pixel(32, 32, image::Rgb([5, 5, 5]));
        let out = pass.apply(&frame, &state_with_wrist(10.0, 10.0)).unwrap();
        assert_eq!(out.as_raw(), frame.as_raw());
        assert!(pass.points().is_empty());
    }

    #[test]
    fn test_glow_skipped_below_speed_threshold() {
        let mut pass = GlowTrailPass::new(GlowTrailConfig {
            trail: TrailConfig {
                enabled: true,
                fade_alpha: false,
                color: crate::color::Color::BLACK,
                ..TrailConfig::default()
            },
            speed_responsive: true,
            min_speed_threshold: 1e6,
            ..GlowTrailConfig::default()
        });

        let frame = RgbImage::new(320, 240);
        let mut out = frame.clone();
        for x in 0..8 {
            out = pass
                .apply(&frame, &state_with_wrist(x as f32 * 2.0 + 50.0, 50.0))
                .unwrap();
        }
        // Black trail on black frame plus suppressed glow leaves nothing lit
        assert!(out.pixels().all(|p| p.0 == [0, 0, 0]));
    }

    #[test]
    fn test_glow_renders_for_fast_motion() {
        let mut pass = GlowTrailPass::new(GlowTrailConfig {
            trail: TrailConfig {
                enabled: true,
                fade_alpha: false,
                color: crate::color::Color::BLACK,
                ..TrailConfig::default()
            },
            speed_responsive: false,
            ..GlowTrailConfig::default()
        });

        let frame = RgbImage::new(320, 240);
        let mut out = frame.clone();
        for x in 0..8 {
            out = pass
                .apply(&frame, &state_with_wrist(x as f32 * 20.0 + 50.0, 120.0))
                .unwrap();
        }
        // Cyan glow raises green/blue somewhere along the path
        assert!(out.pixels().any(|p| p.0[1] > 0 || p.0[2] > 0));
    }
}
