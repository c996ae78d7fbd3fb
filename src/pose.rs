// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Pose landmark types and per-frame state adaptation.
//!
//! The pose-estimation provider is an external collaborator: per frame it
//! returns a fixed-length list of 2-D image-space positions (or a sentinel for
//! joints it could not detect). This module normalizes that raw output into an
//! immutable [`AdaptedState`] carrying the designated tracked point and the
//! pixel-to-physical-unit scale, which every visual pass consumes.

use serde::Deserialize;

/// Number of keypoints in the fixed skeleton layout.
pub const NUM_KEYPOINTS: usize = 33;

/// A joint with confidence below this value is treated as absent.
pub const VISIBILITY_THRESHOLD: f32 = 0.5;

/// Nose keypoint index.
pub const NOSE: usize = 0;
/// Left shoulder keypoint index.
pub const LEFT_SHOULDER: usize = 11;
/// Right shoulder keypoint index.
pub const RIGHT_SHOULDER: usize = 12;
/// Left elbow keypoint index.
pub const LEFT_ELBOW: usize = 13;
/// Right elbow keypoint index.
pub const RIGHT_ELBOW: usize = 14;
/// Left wrist keypoint index.
pub const LEFT_WRIST: usize = 15;
/// Right wrist keypoint index.
pub const RIGHT_WRIST: usize = 16;
/// Left hip keypoint index.
pub const LEFT_HIP: usize = 23;
/// Right hip keypoint index.
pub const RIGHT_HIP: usize = 24;
/// Left knee keypoint index.
pub const LEFT_KNEE: usize = 25;
/// Right knee keypoint index.
pub const RIGHT_KNEE: usize = 26;
/// Left ankle keypoint index.
pub const LEFT_ANKLE: usize = 27;
/// Right ankle keypoint index.
pub const RIGHT_ANKLE: usize = 28;

/// Named body segments (pairs or groups of keypoint indices).
/// Used for per-segment representative speeds.
pub const BODY_SEGMENTS: [(&str, &[usize]); 10] = [
    ("head", &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10]),
    ("torso", &[LEFT_SHOULDER, RIGHT_SHOULDER, LEFT_HIP, RIGHT_HIP]),
    ("left_upper_arm", &[LEFT_SHOULDER, LEFT_ELBOW]),
    ("left_forearm", &[LEFT_ELBOW, LEFT_WRIST]),
    ("right_upper_arm", &[RIGHT_SHOULDER, RIGHT_ELBOW]),
    ("right_forearm", &[RIGHT_ELBOW, RIGHT_WRIST]),
    ("left_thigh", &[LEFT_HIP, LEFT_KNEE]),
    ("left_shin", &[LEFT_KNEE, LEFT_ANKLE]),
    ("right_thigh", &[RIGHT_HIP, RIGHT_KNEE]),
    ("right_shin", &[RIGHT_KNEE, RIGHT_ANKLE]),
];

/// One landmark with its detection confidence.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Keypoint {
    /// Horizontal position in pixels.
    pub x: f32,
    /// Vertical position in pixels.
    pub y: f32,
    /// Detection confidence in [0, 1].
    pub confidence: f32,
}

impl Keypoint {
    /// Create a new keypoint.
    #[must_use]
    pub const fn new(x: f32, y: f32, confidence: f32) -> Self {
        Self { x, y, confidence }
    }

    /// Whether the joint clears the visibility threshold.
    #[must_use]
    pub fn visible(&self) -> bool {
        self.confidence >= VISIBILITY_THRESHOLD
    }
}

/// Raw per-frame provider output: one optional position per joint.
///
/// `None` is the provider's no-detection sentinel for a joint; a frame where
/// the subject was not found at all is simply all-`None`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct PoseSample {
    /// Per-joint positions in image pixel space.
    pub points: Vec<Option<(f32, f32)>>,
}

impl PoseSample {
    /// Create a sample with all joints absent.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            points: vec![None; NUM_KEYPOINTS],
        }
    }

    /// Whether every joint is absent.
    #[must_use]
    pub fn is_absent(&self) -> bool {
        self.points.iter().all(Option::is_none)
    }
}

/// Normalized per-frame state consumed by the visual passes.
///
/// Constructed once per frame from raw provider output plus run-level
/// constants, immutable afterwards. Passes that need history keep their own
/// copies of whatever they consume.
#[derive(Debug, Clone)]
pub struct AdaptedState {
    /// Fixed-size landmark array (x_px, y_px, confidence).
    pub points: [Keypoint; NUM_KEYPOINTS],
    /// The designated tracked point (right wrist), if detected.
    pub tracked: Option<(f32, f32)>,
    /// Frame rate, used to convert per-frame displacement into per-second rates.
    pub fps: f32,
    /// Pixel-to-physical-unit scale factor (1.0 = pixel units).
    pub px_to_unit: f32,
    /// Frame size as (height, width) in pixels.
    pub frame_size: (u32, u32),
}

impl AdaptedState {
    /// Build the per-frame state from a raw provider sample.
    ///
    /// Joints present in the sample get confidence 1.0, absent joints get the
    /// (0, 0) position with confidence 0.0. When `reference_height` (physical
    /// units) is supplied, the pixel scale is estimated from the
    /// shoulder-to-ankle span, taken as roughly 80% of body height.
    #[must_use]
    pub fn from_sample(
        sample: &PoseSample,
        fps: f32,
        reference_height: Option<f32>,
        frame_size: (u32, u32),
    ) -> Self {
        let mut points = [Keypoint::default(); NUM_KEYPOINTS];
        for (i, slot) in points.iter_mut().enumerate() {
            if let Some(Some((x, y))) = sample.points.get(i) {
                *slot = Keypoint::new(*x, *y, 1.0);
            }
        }

        let tracked = sample
            .points
            .get(RIGHT_WRIST)
            .copied()
            .flatten();

        let mut px_to_unit = 1.0;
        if let Some(height) = reference_height {
            if height > 0.0 {
                let shoulder_y = if points[LEFT_SHOULDER].confidence > 0.0 {
                    points[LEFT_SHOULDER].y
                } else {
                    points[RIGHT_SHOULDER].y
                };
                let ankle_y = points[LEFT_ANKLE].y.max(points[RIGHT_ANKLE].y);
                if shoulder_y > 0.0 && ankle_y > 0.0 {
                    let person_px = (ankle_y - shoulder_y).abs();
                    if person_px > 0.0 {
                        px_to_unit = height * 0.8 / person_px;
                    }
                }
            }
        }

        Self {
            points,
            tracked,
            fps,
            px_to_unit,
            frame_size,
        }
    }

    /// Tracked point rounded to integer pixel coordinates, if within bounds.
    #[must_use]
    pub fn tracked_pixel(&self) -> Option<(i32, i32)> {
        let (x, y) = self.tracked?;
        let (h, w) = self.frame_size;
        #[allow(clippy::cast_possible_truncation)]
        let (xi, yi) = (x as i32, y as i32);
        #[allow(clippy::cast_possible_wrap)]
        if xi >= 0 && xi < w as i32 && yi >= 0 && yi < h as i32 {
            Some((xi, yi))
        } else {
            None
        }
    }
}

/// Estimate the pixel-to-physical-unit factor from a full-body span.
///
/// Measures nose to lower ankle. Returns 1.0 (pixel units) when the span is
/// too small to be a credible person height.
#[must_use]
pub fn estimate_physical_scale(state: &AdaptedState, reference_height: f32) -> f32 {
    if reference_height <= 0.0 {
        return 1.0;
    }

    let mut head_y = 0.0;
    #[allow(clippy::cast_precision_loss)]
    let mut ankle_y = state.frame_size.0 as f32;

    if state.points[NOSE].confidence > 0.0 {
        head_y = state.points[NOSE].y;
    }

    let mut valid_ankles = Vec::new();
    for idx in [LEFT_ANKLE, RIGHT_ANKLE] {
        if state.points[idx].confidence > 0.0 {
            valid_ankles.push(state.points[idx].y);
        }
    }
    if let Some(lowest) = valid_ankles.iter().copied().reduce(f32::max) {
        ankle_y = lowest;
    }

    let person_px = (ankle_y - head_y).abs();
    if person_px > 50.0 {
        reference_height / person_px
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_with(points: &[(usize, (f32, f32))]) -> PoseSample {
        let mut sample = PoseSample::empty();
        for (idx, pos) in points {
            sample.points[*idx] = Some(*pos);
        }
        sample
    }

    #[test]
    fn test_adapt_marks_present_joints_visible() {
        let sample = sample_with(&[(RIGHT_WRIST, (120.0, 90.0))]);
        let state = AdaptedState::from_sample(&sample, 30.0, None, (480, 640));

        assert!(state.points[RIGHT_WRIST].visible());
        assert_eq!(state.points[RIGHT_WRIST].x, 120.0);
        assert!(!state.points[NOSE].visible());
        assert_eq!(state.tracked, Some((120.0, 90.0)));
    }

    #[test]
    fn test_adapt_defaults_to_pixel_units() {
        let state =
            AdaptedState::from_sample(&PoseSample::empty(), 30.0, None, (480, 640));
        assert_eq!(state.px_to_unit, 1.0);
        assert!(state.tracked.is_none());
    }

    #[test]
    fn test_adapt_estimates_scale_from_shoulder_ankle_span() {
        let sample = sample_with(&[
            (LEFT_SHOULDER, (300.0, 100.0)),
            (LEFT_ANKLE, (300.0, 420.0)),
            (RIGHT_ANKLE, (310.0, 400.0)),
        ]);
        let state = AdaptedState::from_sample(&sample, 30.0, Some(1.8), (480, 640));

        // 1.8 * 0.8 / 320 px
        let expected = 1.8 * 0.8 / 320.0;
        assert!((state.px_to_unit - expected).abs() < 1e-6);
    }

    #[test]
    fn test_tracked_pixel_rejects_out_of_bounds() {
        let sample = sample_with(&[(RIGHT_WRIST, (700.0, 90.0))]);
        let state = AdaptedState::from_sample(&sample, 30.0, None, (480, 640));
        assert!(state.tracked_pixel().is_none());
    }

    #[test]
    fn test_physical_scale_requires_minimum_span() {
        let sample = sample_with(&[(NOSE, (300.0, 200.0)), (LEFT_ANKLE, (300.0, 230.0))]);
        let state = AdaptedState::from_sample(&sample, 30.0, None, (480, 640));
        // 30 px span is below the 50 px guard
        assert_eq!(estimate_physical_scale(&state, 1.8), 1.0);
    }

    #[test]
    fn test_physical_scale_nose_to_ankle() {
        let sample = sample_with(&[(NOSE, (300.0, 60.0)), (RIGHT_ANKLE, (300.0, 420.0))]);
        let state = AdaptedState::from_sample(&sample, 30.0, None, (480, 640));
        let scale = estimate_physical_scale(&state, 1.8);
        assert!((scale - 1.8 / 360.0).abs() < 1e-6);
    }
}
