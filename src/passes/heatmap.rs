// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Speed heatmap: Gaussian splats per fast-moving joint, colorized and
//! blended onto the frame.

use std::collections::VecDeque;

use image::RgbImage;
use ndarray::Array2;

use crate::config::HeatmapConfig;
use crate::error::Result;
use crate::kinematics::KinematicsBuffer;
use crate::passes::VisualPass;
use crate::pose::{AdaptedState, NUM_KEYPOINTS};

/// Frames of per-frame peak speed kept for the adaptive ceiling.
const SPEED_HISTORY_CAP: usize = 60;

/// Headroom multiplier over the observed p90 speed.
const ADAPTIVE_HEADROOM: f32 = 1.2;

/// Renders per-joint speed as soft heat splats.
pub struct HeatmapPass {
    config: HeatmapConfig,
    buffer: KinematicsBuffer,
    peak_speeds: VecDeque<f32>,
    frame_count: u64,
}

impl HeatmapPass {
    /// Create the pass from its configuration.
    #[must_use]
    pub fn new(config: HeatmapConfig) -> Self {
        let buffer = KinematicsBuffer::new(60, config.smooth, config.ema_alpha, config.savgol_window);
        Self {
            config,
            buffer,
            peak_speeds: VecDeque::with_capacity(SPEED_HISTORY_CAP + 1),
            frame_count: 0,
        }
    }

    /// Dynamic-range ceiling: the configured maximum, raised toward recent
    /// observed speeds when adaptive scaling is on.
    fn speed_ceiling(&self) -> f32 {
        if !self.config.adaptive_scale || self.peak_speeds.is_empty() {
            return self.config.max_speed;
        }
        let p90 = percentile(self.peak_speeds.iter().copied(), 0.9);
        self.config.max_speed.max(p90 * ADAPTIVE_HEADROOM)
    }

    fn record_peak(&mut self, peak: f32) {
        if peak > 0.0 {
            self.peak_speeds.push_back(peak);
            while self.peak_speeds.len() > SPEED_HISTORY_CAP {
                self.peak_speeds.pop_front();
            }
        }
    }

    /// Add one joint's Gaussian splat into the heat layer.
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss, clippy::cast_possible_wrap)]
    fn splat(&self, layer: &mut Array2<f32>, center: (f32, f32), strength: f32) {
        let (rows, cols) = layer.dim();
        let radius = self.config.radius as i32;
        let sigma = self.config.radius as f32 / 3.0;
        let denom = 2.0 * sigma * sigma;

        let cx = center.0 as i32;
        let cy = center.1 as i32;

        for dy in -radius..=radius {
            let y = cy + dy;
            if y < 0 || y >= rows as i32 {
                continue;
            }
            for dx in -radius..=radius {
                let x = cx + dx;
                if x < 0 || x >= cols as i32 {
                    continue;
                }
                let dist2 = (dx * dx + dy * dy) as f32;
                let weight = (-dist2 / denom).exp();
                layer[[y as usize, x as usize]] += strength * weight;
            }
        }
    }

    /// Colorize the heat layer and blend it onto the frame at the configured
    /// alpha wherever heat exists. Heat drives the color, not the opacity.
    fn composite(&self, frame: &mut RgbImage, layer: &Array2<f32>) {
        let max = layer.iter().copied().fold(0.0_f32, f32::max);
        if max <= 0.0 {
            return;
        }

        let weight = self.config.alpha.clamp(0.0, 1.0);
        for (x, y, pixel) in frame.enumerate_pixels_mut() {
            let heat = layer[[y as usize, x as usize]] / max;
            if heat <= 0.0 {
                continue;
            }
            let color = self.config.colormap.map(heat);
            let channels = [color.0, color.1, color.2];
            for c in 0..3 {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let blended = (f32::from(channels[c]) * weight
                    + f32::from(pixel.0[c]) * (1.0 - weight))
                    .clamp(0.0, 255.0) as u8;
                pixel.0[c] = blended;
            }
        }
    }
}

impl VisualPass for HeatmapPass {
    fn name(&self) -> &'static str {
        "heatmap"
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

        // The ceiling adapts to the whole body's motion, not just the joints
        // that draw heat
        let mut peak = 0.0_f32;
        for j in 0..kin.speed.len() {
            let speed = kin.speed[j] * state.px_to_unit;
            if speed > 0.0 {
                peak = peak.max(speed);
            }
        }
        self.record_peak(peak);

        let ceiling = self.speed_ceiling();
        let floor = self.config.min_speed;
        let range = (ceiling - floor).max(1e-6);

        let (width, height) = result.dimensions();
        let mut layer = Array2::zeros((height as usize, width as usize));

        for &joint in &self.config.target_joints {
            if joint >= NUM_KEYPOINTS || !state.points[joint].visible() {
                continue;
            }
            let speed = kin.speed[joint] * state.px_to_unit;
            if speed < floor {
                continue;
            }
            let kp = &state.points[joint];
            #[allow(clippy::cast_precision_loss)]
            if kp.x < 0.0 || kp.y < 0.0 || kp.x >= width as f32 || kp.y >= height as f32 {
                continue;
            }
            let strength = ((speed - floor) / range).clamp(0.0, 1.0);
            self.splat(&mut layer, (kp.x, kp.y), strength);
        }

        self.composite(&mut result, &layer);
        Ok(result)
    }
}

/// Linear-interpolated percentile of an unsorted series, `q` in [0, 1].
fn percentile(values: impl Iterator<Item = f32>, q: f32) -> f32 {
    let mut sorted: Vec<f32> = values.collect();
    if sorted.is_empty() {
        return 0.0;
    }
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    #[allow(clippy::cast_precision_loss)]
    let rank = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f32;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let lo = rank.floor() as usize;
    let hi = (lo + 1).min(sorted.len() - 1);
    let frac = rank - rank.floor();
    sorted[lo] * (1.0 - frac) + sorted[hi] * frac
}
