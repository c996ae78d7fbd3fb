// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Metrics HUD: translucent panel, circular gauges, release events with a
//! flash overlay, and a fading event log.

use ab_glyph::FontVec;
use image::RgbImage;
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;
use ndarray::Array2;

use crate::color::Color;
use crate::config::HudConfig;
use crate::draw::{blend_weighted, draw_arc, draw_label, draw_thick_line, load_font};
use crate::error::Result;
use crate::kinematics::{arm_vectors, KinematicsBuffer};
use crate::passes::VisualPass;
use crate::pose::{AdaptedState, LEFT_SHOULDER, NUM_KEYPOINTS, RIGHT_SHOULDER, RIGHT_WRIST};

/// Metrics panel placement and size.
const PANEL_X: i32 = 10;
const PANEL_Y: i32 = 10;
const PANEL_W: u32 = 280;
const PANEL_H: u32 = 120;

/// Seconds an event stays in the log.
const EVENT_TTL: f64 = 5.0;

/// Minimum seconds between release events.
const RELEASE_COOLDOWN: f64 = 1.0;

/// Speed gauge full-scale value.
const SPEED_GAUGE_MAX: f32 = 30.0;

/// Angular gauge full-scale value in degrees.
const ANGULAR_GAUGE_MAX: f32 = 360.0;

/// Fraction of the release threshold at which the speed readout turns to the
/// warning color.
const WARN_FRACTION: f32 = 0.8;

/// Gauge face color.
const GAUGE_FACE: Color = Color(50, 50, 50);

/// Angular gauge accent.
const ORANGE: Color = Color(255, 128, 0);

/// Latest metric values shown on the panel.
#[derive(Debug, Clone, Copy, Default)]
struct HudMetrics {
    wrist_speed: f32,
    max_speed: f32,
    angular_velocity: f32,
    shoulder_separation: Option<f32>,
    body_angle: Option<f32>,
}

/// Draws run metrics, gauges, and release events over the frame.
pub struct HudPass {
    config: HudConfig,
    buffer: KinematicsBuffer,
    font: Option<FontVec>,
    frame_count: u64,
    max_speed: f32,
    last_release: f64,
    flash_until: f64,
    events: Vec<(f64, String)>,
}

impl HudPass {
    /// Create the pass, loading the HUD font (text is skipped if the font is
    /// unavailable).
    #[must_use]
    pub fn new(config: HudConfig) -> Self {
        Self::with_font(config, load_font())
    }

    /// Create the pass with an explicit font.
    #[must_use]
    pub fn with_font(config: HudConfig, font: Option<FontVec>) -> Self {
        Self {
            config,
            buffer: KinematicsBuffer::default(),
            font,
            frame_count: 0,
            max_speed: 0.0,
            last_release: f64::NEG_INFINITY,
            flash_until: f64::NEG_INFINITY,
            events: Vec::new(),
        }
    }

    /// Events currently in the log, oldest first.
    #[must_use]
    pub fn events(&self) -> &[(f64, String)] {
        &self.events
    }

    /// Peak tracked-point speed seen this run, in physical units.
    #[must_use]
    pub fn peak_speed(&self) -> f32 {
        self.max_speed
    }

    fn collect_metrics(&mut self, state: &AdaptedState) -> HudMetrics {
        let kin = self.buffer.current().clone();

        let wrist_speed = if state.points[RIGHT_WRIST].visible() {
            kin.speed[RIGHT_WRIST] * state.px_to_unit
        } else {
            0.0
        };
        self.max_speed = self.max_speed.max(wrist_speed);

        let arms = arm_vectors(&state.points, &kin.velocity, state.px_to_unit);

        let left = &state.points[LEFT_SHOULDER];
        let right = &state.points[RIGHT_SHOULDER];
        let (shoulder_separation, body_angle) = if left.visible() && right.visible() {
            // Shoulder line measured right to left
            let dx = right.x - left.x;
            let dy = right.y - left.y;
            (
                Some(dx.hypot(dy) * state.px_to_unit),
                Some(dy.atan2(dx).to_degrees()),
            )
        } else {
            (None, None)
        };

        HudMetrics {
            wrist_speed,
            max_speed: self.max_speed,
            angular_velocity: arms.right_arm_angular_velocity,
            shoulder_separation,
            body_angle,
        }
    }

    fn update_events(&mut self, metrics: &HudMetrics, timestamp: f64) {
        if metrics.wrist_speed > self.config.release_speed_threshold
            && timestamp - self.last_release > RELEASE_COOLDOWN
        {
            let message = format!("RELEASE! {:.1} m/s", metrics.wrist_speed);
            crate::info!("{message} at t={timestamp:.2}s");
            self.events.push((timestamp, message));
            self.last_release = timestamp;
            self.flash_until = timestamp + f64::from(self.config.release_flash_duration);
        }

        self.events.retain(|(t, _)| timestamp - t <= EVENT_TTL);
    }

    /// Speed readout color: warning once the speed approaches the release
    /// threshold.
    fn speed_color(&self, speed: f32) -> Color {
        if speed > WARN_FRACTION * self.config.release_speed_threshold {
            self.config.warning_color
        } else {
            self.config.text_color
        }
    }

    fn draw_panel(&self, frame: &mut RgbImage, metrics: &HudMetrics) {
        let mut overlay = frame.clone();
        draw_filled_rect_mut(
            &mut overlay,
            Rect::at(PANEL_X, PANEL_Y).of_size(PANEL_W, PANEL_H),
            self.config.panel_color.rgb(),
        );
        blend_weighted(frame, &overlay, self.config.alpha);
        draw_hollow_rect_mut(
            frame,
            Rect::at(PANEL_X, PANEL_Y).of_size(PANEL_W, PANEL_H),
            self.config.accent_color.rgb(),
        );

        let speed_color = self.speed_color(metrics.wrist_speed);

        let mut lines: Vec<(String, Color)> = vec![
            (
                format!("Speed: {:.1} m/s", metrics.wrist_speed),
                speed_color,
            ),
            (
                format!("Max: {:.1} m/s", metrics.max_speed),
                self.config.accent_color,
            ),
            (
                format!("Angular: {:.1} rad/s", metrics.angular_velocity),
                self.config.text_color,
            ),
        ];
        if let Some(sep) = metrics.shoulder_separation {
            lines.push((format!("Shoulders: {sep:.2}"), self.config.text_color));
        }
        if let Some(angle) = metrics.body_angle {
            lines.push((format!("Body angle: {angle:.0} deg"), self.config.text_color));
        }

        let mut y = PANEL_Y + 12;
        for (text, color) in lines {
            draw_label(frame, self.font.as_ref(), &text, PANEL_X + 10, y, 18.0, color);
            y += 22;
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn draw_gauge(
        &self,
        frame: &mut RgbImage,
        center: (i32, i32),
        radius: i32,
        value: f32,
        max_value: f32,
        label: &str,
        color: Color,
    ) {
        draw_filled_circle_mut(frame, center, radius, GAUGE_FACE.rgb());

        let normalized = (value / max_value).clamp(0.0, 1.0);
        let start = -90.0;
        let sweep = 270.0 * normalized;

        if sweep > 0.0 {
            draw_arc(
                frame,
                center,
                (radius - 5) as f32,
                start,
                start + sweep,
                color,
                2,
            );
        }

        // Needle sits at the start mark when the value is zero
        let needle_deg = (start + sweep).to_radians();
        let needle_len = (radius - 10) as f32;
        let end = (
            center.0 as f32 + needle_len * needle_deg.cos(),
            center.1 as f32 + needle_len * needle_deg.sin(),
        );
        draw_thick_line(frame, (center.0 as f32, center.1 as f32), end, color, 2);

        draw_label(
            frame,
            self.font.as_ref(),
            &format!("{value:.1} {label}"),
            center.0 - radius,
            center.1 + radius + 5,
            14.0,
            self.config.text_color,
        );
    }

    #[allow(clippy::cast_possible_wrap)]
    fn draw_gauges(&self, frame: &mut RgbImage, metrics: &HudMetrics) {
        let width = frame.width() as i32;
        self.draw_gauge(
            frame,
            (width - 80, 80),
            50,
            metrics.wrist_speed,
            SPEED_GAUGE_MAX,
            "m/s",
            self.config.accent_color,
        );
        self.draw_gauge(
            frame,
            (width - 80, 180),
            40,
            metrics.angular_velocity.to_degrees().abs(),
            ANGULAR_GAUGE_MAX,
            "deg/s",
            ORANGE,
        );
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap, clippy::cast_precision_loss)]
    fn draw_flash(&self, frame: &mut RgbImage, timestamp: f64) {
        if timestamp >= self.flash_until {
            return;
        }

        let pulse = 0.5 * (1.0 + (timestamp * 20.0).sin()) as f32;
        let overlay = RgbImage::from_pixel(
            frame.width(),
            frame.height(),
            self.config.warning_color.rgb(),
        );
        blend_weighted(frame, &overlay, pulse * 0.3);

        let (w, h) = frame.dimensions();
        let cx = w as i32 / 2;
        let cy = h as i32 / 2;
        if self.font.is_some() {
            draw_filled_rect_mut(
                frame,
                Rect::at(cx - 90, cy - 28).of_size(180, 56),
                Color::BLACK.rgb(),
            );
            draw_label(
                frame,
                self.font.as_ref(),
                "RELEASE!",
                cx - 80,
                cy - 20,
                40.0,
                self.config.warning_color,
            );
        }
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    fn draw_event_log(&self, frame: &mut RgbImage, timestamp: f64) {
        let mut y = frame.height() as i32 - 30;
        for (t, message) in self.events.iter().rev().take(3) {
            let age = (timestamp - t) as f32;
            let fade = (1.0 - age / EVENT_TTL as f32).max(0.0);
            let color = self.config.accent_color.scaled(fade);
            draw_label(frame, self.font.as_ref(), message, 10, y, 16.0, color);
            y -= 25;
        }
    }
}

impl VisualPass for HudPass {
    fn name(&self) -> &'static str {
        "hud"
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

        let metrics = self.collect_metrics(state);
        if self.config.show_events {
            self.update_events(&metrics, timestamp);
        }

        if self.config.show_metrics {
            self.draw_panel(&mut result, &metrics);
        }
        if self.config.show_gauges {
            self.draw_gauges(&mut result, &metrics);
        }
        if self.config.show_events {
            self.draw_flash(&mut result, timestamp);
            self.draw_event_log(&mut result, timestamp);
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::PoseSample;

    fn state_with_wrist(x: f32, fps: f32) -> AdaptedState {
        let mut sample = PoseSample::empty();
        sample.points[RIGHT_WRIST] = Some((x, 120.0));
        AdaptedState::from_sample(&sample, fps, None, (240, 320))
    }

    fn hud(config: HudConfig) -> HudPass {
        HudPass::with_font(config, None)
    }

    #[test]
    fn test_disabled_hud_is_passthrough() {
        let mut pass = hud(HudConfig::default());
        let frame = RgbImage::from_pixel(320, 240, image::Rgb([4, 4, 4]));
        let out = pass.apply(&frame, &state_with_wrist(100.0, 30.0)).unwrap();
        assert_eq!(out.as_raw(), frame.as_raw());
    }

    #[test]
    fn test_panel_blended_into_frame() {
        let mut pass = hud(HudConfig {
            enabled: true,
            show_gauges: false,
            show_events: false,
            panel_color: Color::WHITE,
            ..HudConfig::default()
        });
        let frame = RgbImage::new(320, 240);
        let out = pass.apply(&frame, &state_with_wrist(100.0, 30.0)).unwrap();

        // Inside the panel the black frame brightened; far corner untouched
        assert!(out.get_pixel(100, 60).0[0] > 0);
        assert_eq!(out.get_pixel(319, 239).0, [0, 0, 0]);
    }

    #[test]
    fn test_gauges_rendered_on_right_edge() {
        let mut pass = hud(HudConfig {
            enabled: true,
            show_metrics: false,
            show_events: false,
            ..HudConfig::default()
        });
        let frame = RgbImage::new(320, 240);
        let out = pass.apply(&frame, &state_with_wrist(100.0, 30.0)).unwrap();
        // Inside the speed gauge face at (320-80, 80), away from the needle
        assert_eq!(out.get_pixel(250, 90).0, [50, 50, 50]);
    }

    #[test]
    fn test_release_event_recorded_once_per_cooldown() {
        let mut pass = hud(HudConfig {
            enabled: true,
            show_metrics: false,
            show_gauges: false,
            release_speed_threshold: 5.0,
            ..HudConfig::default()
        });
        let frame = RgbImage::new(320, 240);

        // 30 px/frame at 30 fps is far above threshold in pixel units
        for i in 0..6 {
            #[allow(clippy::cast_precision_loss)]
            let x = 50.0 + i as f32 * 30.0;
            pass.apply(&frame, &state_with_wrist(x, 30.0)).unwrap();
        }

        // All six frames land inside one cooldown window
        assert_eq!(pass.events().len(), 1);
        assert!(pass.events()[0].1.starts_with("RELEASE!"));
        assert!(pass.peak_speed() > 5.0);
    }

    #[test]
    fn test_events_expire() {
        let mut pass = hud(HudConfig {
            enabled: true,
            show_metrics: false,
            show_gauges: false,
            release_speed_threshold: 5.0,
            ..HudConfig::default()
        });
        let frame = RgbImage::new(320, 240);

        // 1 fps makes each frame one second of run time
        for i in 0..3 {
            #[allow(clippy::cast_precision_loss)]
            let x = 50.0 + i as f32 * 30.0;
            pass.apply(&frame, &state_with_wrist(x, 1.0)).unwrap();
        }
        assert!(!pass.events().is_empty());

        for _ in 0..15 {
            pass.apply(&frame, &state_with_wrist(110.0, 1.0)).unwrap();
        }
        assert!(pass.events().is_empty());
    }

    #[test]
    fn test_body_angle_level_shoulders_reads_zero() {
        let mut pass = hud(HudConfig {
            enabled: true,
            ..HudConfig::default()
        });

        let mut sample = PoseSample::empty();
        sample.points[LEFT_SHOULDER] = Some((100.0, 80.0));
        sample.points[RIGHT_SHOULDER] = Some((180.0, 80.0));
        let state = AdaptedState::from_sample(&sample, 30.0, None, (240, 320));
        pass.buffer.append(Array2::zeros((NUM_KEYPOINTS, 2)), 0.0);

        let metrics = pass.collect_metrics(&state);
        assert!(metrics.body_angle.unwrap().abs() < 1e-3);
        assert!((metrics.shoulder_separation.unwrap() - 80.0).abs() < 1e-3);
    }

    #[test]
    fn test_speed_readout_warns_near_threshold() {
        let pass = hud(HudConfig {
            enabled: true,
            release_speed_threshold: 10.0,
            ..HudConfig::default()
        });

        // Warning starts at 80% of the release threshold
        assert_eq!(pass.speed_color(7.9), pass.config.text_color);
        assert_eq!(pass.speed_color(8.1), pass.config.warning_color);
        assert_eq!(pass.speed_color(12.0), pass.config.warning_color);
    }

    #[test]
    fn test_metrics_without_visible_shoulders() {
        let mut pass = hud(HudConfig {
            enabled: true,
            ..HudConfig::default()
        });
        let state = state_with_wrist(100.0, 30.0);
        pass.buffer.append(Array2::zeros((NUM_KEYPOINTS, 2)), 0.0);
        let metrics = pass.collect_metrics(&state);
        assert!(metrics.shoulder_separation.is_none());
        assert!(metrics.body_angle.is_none());
    }
}
