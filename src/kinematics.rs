// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Streaming kinematics: smoothing filters, numeric differentiation, and the
//! bounded per-joint history buffer.
//!
//! All quantities are derived on demand from a FIFO-capped history of
//! (positions, timestamp) snapshots and memoized until the next frame is
//! appended. Fewer than two buffered frames is not an error: velocity,
//! acceleration, and speed degrade to zero.

use std::collections::VecDeque;

use nalgebra::{DMatrix, DVector};
use ndarray::{Array1, Array2, Array3, Axis};
use serde::Deserialize;

use crate::pose::{
    Keypoint, LEFT_ELBOW, LEFT_SHOULDER, LEFT_WRIST, NUM_KEYPOINTS, RIGHT_ELBOW, RIGHT_SHOULDER,
    RIGHT_WRIST, BODY_SEGMENTS,
};

/// Fallback sampling interval when fewer than two timestamps are buffered.
const DEFAULT_DT: f32 = 1.0 / 30.0;

/// Selectable position-series smoothing applied before differentiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Smoothing {
    /// Exponential moving average.
    #[default]
    Ema,
    /// Savitzky-Golay local polynomial fit.
    Savgol,
    /// No smoothing.
    None,
}

/// Forward-difference derivative of a (samples x dims) series.
///
/// The first sample's derivative is defined as zero. Series shorter than two
/// samples differentiate to all zeros.
#[must_use]
pub fn finite_diff(series: &Array2<f32>, dt: f32) -> Array2<f32> {
    let n = series.nrows();
    let mut diff = Array2::zeros(series.raw_dim());
    if n < 2 {
        return diff;
    }
    for i in 1..n {
        for d in 0..series.ncols() {
            diff[[i, d]] = (series[[i, d]] - series[[i - 1, d]]) / dt;
        }
    }
    diff
}

/// Exponential moving average: `s[0] = x[0]; s[i] = a*x[i] + (1-a)*s[i-1]`.
///
/// `alpha` is clamped to [0.01, 1.0].
#[must_use]
pub fn ema_filter(data: &Array2<f32>, alpha: f32) -> Array2<f32> {
    let n = data.nrows();
    if n == 0 {
        return data.clone();
    }
    let alpha = alpha.clamp(0.01, 1.0);
    let mut filtered = Array2::zeros(data.raw_dim());
    for d in 0..data.ncols() {
        filtered[[0, d]] = data[[0, d]];
        for i in 1..n {
            filtered[[i, d]] = alpha * data[[i, d]] + (1.0 - alpha) * filtered[[i - 1, d]];
        }
    }
    filtered
}

/// Savitzky-Golay smoothing via local least-squares polynomial fits.
///
/// The window is forced odd by incrementing and the polynomial order is capped
/// at `window - 1`. Series shorter than the window pass through unfiltered;
/// edge samples use boundary-clipped windows. Any numerical failure in a fit
/// degrades to the unfiltered input rather than propagating an error.
#[must_use]
pub fn savgol_filter(data: &Array2<f32>, window: usize, order: usize) -> Array2<f32> {
    let n = data.nrows();
    if n < window || window == 0 {
        return data.clone();
    }

    let mut window = window;
    if window % 2 == 0 {
        window += 1;
    }
    if n < window {
        return data.clone();
    }
    let order = order.min(window - 1);
    let half = window / 2;

    let mut out = data.clone();
    for i in 0..n {
        let lo = i.saturating_sub(half);
        let hi = (i + half + 1).min(n);
        let m = hi - lo;
        let ord = order.min(m - 1);

        // Vandermonde design matrix in the window-local time coordinate,
        // so the fitted value at the current sample is the constant term.
        let mut design = DMatrix::<f64>::zeros(m, ord + 1);
        for (row, j) in (lo..hi).enumerate() {
            #[allow(clippy::cast_precision_loss)]
            let t = j as f64 - i as f64;
            let mut p = 1.0;
            for col in 0..=ord {
                design[(row, col)] = p;
                p *= t;
            }
        }

        let svd = design.svd(true, true);
        for d in 0..data.ncols() {
            let rhs = DVector::from_iterator(m, (lo..hi).map(|j| f64::from(data[[j, d]])));
            match svd.solve(&rhs, 1e-10) {
                #[allow(clippy::cast_possible_truncation)]
                Ok(coeffs) => out[[i, d]] = coeffs[0] as f32,
                Err(e) => {
                    crate::warn!("Savitzky-Golay fit failed: {e}");
                    return data.clone();
                }
            }
        }
    }
    out
}

/// Per-joint motion quantities for the most recent buffered frame.
#[derive(Debug, Clone)]
pub struct Kinematics {
    /// Velocity vectors, (joints x 2) in px/s.
    pub velocity: Array2<f32>,
    /// Acceleration vectors, (joints x 2) in px/s^2.
    pub acceleration: Array2<f32>,
    /// Speed magnitudes, (joints,) in px/s.
    pub speed: Array1<f32>,
    /// Latest raw positions, (joints x 2) in px.
    pub positions: Array2<f32>,
}

impl Kinematics {
    fn zeros(joints: usize) -> Self {
        Self {
            velocity: Array2::zeros((joints, 2)),
            acceleration: Array2::zeros((joints, 2)),
            speed: Array1::zeros(joints),
            positions: Array2::zeros((joints, 2)),
        }
    }
}

/// Bounded history of per-joint positions with lazy, memoized kinematics.
///
/// Timestamps are assumed non-decreasing by the caller. Each consumer owns its
/// own buffer instance; passes never share one.
#[derive(Debug)]
pub struct KinematicsBuffer {
    max_length: usize,
    smoothing: Smoothing,
    ema_alpha: f32,
    savgol_window: usize,
    history: VecDeque<(Array2<f32>, f64)>,
    cache: Option<Kinematics>,
}

impl Default for KinematicsBuffer {
    fn default() -> Self {
        Self::new(60, Smoothing::Ema, 0.3, 5)
    }
}

impl KinematicsBuffer {
    /// Create a buffer holding at most `max_length` frames.
    #[must_use]
    pub fn new(max_length: usize, smoothing: Smoothing, ema_alpha: f32, savgol_window: usize) -> Self {
        Self {
            max_length: max_length.max(1),
            smoothing,
            ema_alpha,
            savgol_window,
            history: VecDeque::with_capacity(max_length.max(1) + 1),
            cache: None,
        }
    }

    /// Number of buffered frames.
    #[must_use]
    pub fn len(&self) -> usize {
        self.history.len()
    }

    /// Whether the buffer holds no frames.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Append a frame of (joints x 2) positions. Always succeeds; evicts the
    /// oldest frame when the cap is exceeded and marks the cache dirty.
    pub fn append(&mut self, positions: Array2<f32>, timestamp: f64) {
        self.history.push_back((positions, timestamp));
        if self.history.len() > self.max_length {
            self.history.pop_front();
        }
        self.cache = None;
    }

    /// Kinematics of the most recent frame, computed lazily and memoized
    /// until the next [`append`](Self::append).
    pub fn current(&mut self) -> &Kinematics {
        if self.cache.is_none() {
            self.cache = Some(self.compute());
        }
        self.cache.as_ref().expect("cache populated above")
    }

    fn joint_count(&self) -> usize {
        self.history
            .back()
            .map_or(NUM_KEYPOINTS, |(pos, _)| pos.nrows())
    }

    fn mean_dt(&self) -> f32 {
        if self.history.len() < 2 {
            return DEFAULT_DT;
        }
        let mut total = 0.0;
        let mut count = 0u32;
        let mut prev: Option<f64> = None;
        for (_, ts) in &self.history {
            if let Some(p) = prev {
                total += ts - p;
                count += 1;
            }
            prev = Some(*ts);
        }
        if count == 0 {
            DEFAULT_DT
        } else {
            #[allow(clippy::cast_possible_truncation)]
            let dt = (total / f64::from(count)) as f32;
            dt
        }
    }

    fn smooth(&self, series: &Array2<f32>) -> Array2<f32> {
        match self.smoothing {
            Smoothing::Ema => ema_filter(series, self.ema_alpha),
            Smoothing::Savgol => savgol_filter(series, self.savgol_window, 2),
            Smoothing::None => series.clone(),
        }
    }

    fn compute(&self) -> Kinematics {
        let joints = self.joint_count();
        let frames = self.history.len();
        if frames < 2 {
            let mut result = Kinematics::zeros(joints);
            if let Some((pos, _)) = self.history.back() {
                result.positions = pos.clone();
            }
            return result;
        }

        // Stack into a (frames x joints x 2) series.
        let mut stacked = Array3::zeros((frames, joints, 2));
        for (f, (pos, _)) in self.history.iter().enumerate() {
            for j in 0..joints.min(pos.nrows()) {
                stacked[[f, j, 0]] = pos[[j, 0]];
                stacked[[f, j, 1]] = pos[[j, 1]];
            }
        }

        let dt = self.mean_dt();
        let mut velocity = Array2::zeros((joints, 2));
        let mut acceleration = Array2::zeros((joints, 2));
        let mut speed = Array1::zeros(joints);

        for j in 0..joints {
            let series = stacked.index_axis(Axis(1), j).to_owned();
            let smoothed = self.smooth(&series);
            let vel = finite_diff(&smoothed, dt);
            let acc = finite_diff(&vel, dt);

            let last = frames - 1;
            velocity[[j, 0]] = vel[[last, 0]];
            velocity[[j, 1]] = vel[[last, 1]];
            acceleration[[j, 0]] = acc[[last, 0]];
            acceleration[[j, 1]] = acc[[last, 1]];
            speed[j] = vel[[last, 0]].hypot(vel[[last, 1]]);
        }

        let positions = self
            .history
            .back()
            .map(|(pos, _)| pos.clone())
            .unwrap_or_else(|| Array2::zeros((joints, 2)));

        Kinematics {
            velocity,
            acceleration,
            speed,
            positions,
        }
    }
}

/// Motion of a single joint in physical units.
#[derive(Debug, Clone, Copy, Default)]
pub struct JointMotion {
    /// Position, absent when the joint is below the visibility threshold.
    pub position: Option<(f32, f32)>,
    /// Velocity vector.
    pub velocity: (f32, f32),
    /// Velocity magnitude.
    pub speed: f32,
}

/// Arm-joint motion snapshot plus the coarse right-arm angular-velocity
/// estimate (elbow speed over upper-arm length; a heuristic rate, not a true
/// angular velocity).
#[derive(Debug, Clone, Default)]
pub struct ArmVectors {
    /// Left shoulder motion.
    pub left_shoulder: JointMotion,
    /// Left elbow motion.
    pub left_elbow: JointMotion,
    /// Left wrist motion.
    pub left_wrist: JointMotion,
    /// Right shoulder motion.
    pub right_shoulder: JointMotion,
    /// Right elbow motion.
    pub right_elbow: JointMotion,
    /// Right wrist motion.
    pub right_wrist: JointMotion,
    /// Approximate right-arm angular velocity in rad/s.
    pub right_arm_angular_velocity: f32,
}

/// Compute per-arm-joint motion in physical units from current landmarks and
/// per-joint velocities.
#[must_use]
pub fn arm_vectors(
    points: &[Keypoint; NUM_KEYPOINTS],
    velocity: &Array2<f32>,
    px_to_unit: f32,
) -> ArmVectors {
    let joint = |idx: usize| -> JointMotion {
        let kp = &points[idx];
        if !kp.visible() {
            return JointMotion::default();
        }
        let vel = if idx < velocity.nrows() {
            (velocity[[idx, 0]] * px_to_unit, velocity[[idx, 1]] * px_to_unit)
        } else {
            (0.0, 0.0)
        };
        JointMotion {
            position: Some((kp.x * px_to_unit, kp.y * px_to_unit)),
            velocity: vel,
            speed: vel.0.hypot(vel.1),
        }
    };

    let mut result = ArmVectors {
        left_shoulder: joint(LEFT_SHOULDER),
        left_elbow: joint(LEFT_ELBOW),
        left_wrist: joint(LEFT_WRIST),
        right_shoulder: joint(RIGHT_SHOULDER),
        right_elbow: joint(RIGHT_ELBOW),
        right_wrist: joint(RIGHT_WRIST),
        right_arm_angular_velocity: 0.0,
    };

    if let (Some(shoulder), Some(elbow), Some(wrist)) = (
        result.right_shoulder.position,
        result.right_elbow.position,
        result.right_wrist.position,
    ) {
        let upper_arm = (elbow.0 - shoulder.0, elbow.1 - shoulder.1);
        let forearm = (wrist.0 - elbow.0, wrist.1 - elbow.1);
        let upper_len = upper_arm.0.hypot(upper_arm.1);
        let fore_len = forearm.0.hypot(forearm.1);
        if upper_len > 0.0 && fore_len > 0.0 {
            result.right_arm_angular_velocity = result.right_elbow.speed / upper_len;
        }
    }

    result
}

/// Representative speed per named body segment: the mean speed over the
/// segment's visible joints, 0.0 when none are visible.
#[must_use]
pub fn body_segment_speeds(
    points: &[Keypoint; NUM_KEYPOINTS],
    velocity: &Array2<f32>,
) -> Vec<(&'static str, f32)> {
    BODY_SEGMENTS
        .iter()
        .map(|(name, indices)| {
            let mut total = 0.0;
            let mut count = 0u32;
            for &idx in *indices {
                if idx < velocity.nrows() && points[idx].visible() {
                    total += velocity[[idx, 0]].hypot(velocity[[idx, 1]]);
                    count += 1;
                }
            }
            #[allow(clippy::cast_precision_loss)]
            let mean = if count > 0 { total / count as f32 } else { 0.0 };
            (*name, mean)
        })
        .collect()
}
