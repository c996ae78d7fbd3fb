// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Motion-based inference gating ("smart skip").
//!
//! Pose estimation is the expensive step of the per-frame loop. The gate
//! compares each raw landmark sample against the previous one and decides
//! whether the provider needs to run this frame or whether the caller should
//! reuse the previous result. Absent input always forces inference, so the
//! system can never skip indefinitely while losing a subject that reappears.

use crate::pose::PoseSample;

/// Decides per frame whether the pose provider should run.
#[derive(Debug)]
pub struct InferenceGate {
    /// Squared-pixel mean-displacement threshold.
    pos_threshold: f32,
    /// Forced-infer frames after any real inference.
    min_keep: u32,
    /// Hard cap on consecutive skips.
    max_skip: u32,
    cooldown: u32,
    skipped: u32,
    total_skipped: u64,
    previous: Option<PoseSample>,
}

impl Default for InferenceGate {
    fn default() -> Self {
        Self::new(6.0, 1, 4)
    }
}

impl InferenceGate {
    /// Create a gate with the given thresholds.
    #[must_use]
    pub fn new(pos_threshold: f32, min_keep: u32, max_skip: u32) -> Self {
        Self {
            pos_threshold,
            min_keep,
            max_skip,
            cooldown: 0,
            skipped: 0,
            total_skipped: 0,
            previous: None,
        }
    }

    /// Total frames skipped over the lifetime of the gate.
    #[must_use]
    pub const fn total_skipped(&self) -> u64 {
        self.total_skipped
    }

    /// Mean squared displacement over an every-3rd-joint subsample of joints
    /// present in both the given and the previous sample. Infinity when there
    /// is nothing to compare, which forces inference.
    fn score(&self, sample: &PoseSample) -> f32 {
        if sample.points.is_empty() || sample.is_absent() {
            return f32::INFINITY;
        }
        let Some(previous) = &self.previous else {
            return f32::INFINITY;
        };

        let mut total = 0.0;
        let mut count = 0u32;
        for (i, point) in sample.points.iter().enumerate() {
            if i % 3 != 0 {
                continue;
            }
            let prev = previous.points.get(i).copied().flatten();
            let (Some((px, py)), Some((qx, qy))) = (*point, prev) else {
                continue;
            };
            let dx = px - qx;
            let dy = py - qy;
            total += dx * dx + dy * dy;
            count += 1;
        }
        #[allow(clippy::cast_precision_loss)]
        let denom = count.max(1) as f32;
        total / denom
    }

    /// Decide whether the provider should run for this sample.
    ///
    /// Returns `false` when the caller should reuse the previous analysis
    /// result instead of invoking the provider. Never skips more than
    /// `max_skip` consecutive frames.
    pub fn should_infer(&mut self, sample: &PoseSample) -> bool {
        // Cooldown period forces keeping frames
        if self.cooldown > 0 {
            self.cooldown -= 1;
            self.previous = Some(sample.clone());
            return true;
        }

        let score = self.score(sample);
        if score >= self.pos_threshold || self.skipped >= self.max_skip {
            self.cooldown = self.min_keep;
            self.skipped = 0;
            self.previous = Some(sample.clone());
            true
        } else {
            self.skipped += 1;
            self.total_skipped += 1;
            self.previous = Some(sample.clone());
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_at(x: f32, y: f32) -> PoseSample {
        PoseSample {
            points: (0..33).map(|_| Some((x, y))).collect(),
        }
    }

    #[test]
    fn test_first_call_always_infers() {
        let mut gate = InferenceGate::default();
        assert!(gate.should_infer(&sample_at(100.0, 100.0)));
    }

    #[test]
    fn test_absent_sample_always_infers() {
        let mut gate = InferenceGate::default();
        gate.should_infer(&sample_at(100.0, 100.0));
        // Burn the cooldown frame
        gate.should_infer(&sample_at(100.0, 100.0));
        assert!(gate.should_infer(&PoseSample::empty()));
        assert!(gate.should_infer(&PoseSample::default()));
    }

    #[test]
    fn test_static_scene_skips() {
        let mut gate = InferenceGate::new(6.0, 0, 4);
        assert!(gate.should_infer(&sample_at(100.0, 100.0)));
        assert!(!gate.should_infer(&sample_at(100.5, 100.0)));
        assert_eq!(gate.total_skipped(), 1);
    }

    #[test]
    fn test_large_motion_forces_inference() {
        let mut gate = InferenceGate::new(6.0, 0, 4);
        gate.should_infer(&sample_at(100.0, 100.0));
        assert!(gate.should_infer(&sample_at(110.0, 100.0)));
    }

    #[test]
    fn test_never_skips_more_than_max_skip() {
        let mut gate = InferenceGate::new(6.0, 0, 4);
        assert!(gate.should_infer(&sample_at(100.0, 100.0)));

        let mut consecutive = 0u32;
        let mut max_consecutive = 0u32;
        for _ in 0..30 {
            if gate.should_infer(&sample_at(100.0, 100.0)) {
                consecutive = 0;
            } else {
                consecutive += 1;
                max_consecutive = max_consecutive.max(consecutive);
            }
        }
        assert!(max_consecutive <= 4);
    }

    #[test]
    fn test_infers_within_window_after_first() {
        let mut gate = InferenceGate::new(6.0, 1, 4);
        assert!(gate.should_infer(&sample_at(100.0, 100.0)));

        let mut inferred = false;
        for _ in 0..5 {
            if gate.should_infer(&sample_at(100.01, 100.0)) {
                inferred = true;
            }
        }
        assert!(inferred);
    }

    #[test]
    fn test_cooldown_forces_keep_window() {
        let mut gate = InferenceGate::new(0.0, 2, 4);
        // Threshold 0 means every scored frame infers and re-arms the cooldown
        assert!(gate.should_infer(&sample_at(100.0, 100.0)));
        assert!(gate.should_infer(&sample_at(100.0, 100.0)));
        assert!(gate.should_infer(&sample_at(100.0, 100.0)));
        assert_eq!(gate.total_skipped(), 0);
    }
}
