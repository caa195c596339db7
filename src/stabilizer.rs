//! Tracking stabilizer: turns a stream of raw, jittery detections into
//! smoothed results with motion, stability and quality grades.
//!
//! All mutable tracking memory lives in [`StabilizerState`]. The scoring
//! steps are free functions over plain values so each one can be tested
//! on its own.

use crate::{
    constants::{
        DEFAULT_CONFIDENCE_ALPHA, DEFAULT_MAX_CONSECUTIVE_FAILURES, DEFAULT_MAX_HISTORY_SIZE,
        FAILURE_PENALTY_FLOOR, FAILURE_PENALTY_PER_FRAME, INCREASE_QUALITY_FAILURE_RATE,
        INCREASE_QUALITY_MIN_SUCCESSES, MIN_HISTORY_FOR_SMOOTHING, MOTION_HISTORY_SIZE,
        MOTION_SLOW_THRESHOLD, POSITION_MEASUREMENT_NOISE, POSITION_PROCESS_NOISE,
        QUALITY_EXCELLENT_THRESHOLD, QUALITY_FAIR_THRESHOLD, QUALITY_GOOD_THRESHOLD,
        REDUCE_QUALITY_FAILURE_RATE, SIZE_MEASUREMENT_NOISE, SIZE_PROCESS_NOISE,
        STABILITY_BASE_FAST, STABILITY_BASE_MEDIUM, STABILITY_BASE_SLOW, STABILITY_BASE_STILL,
        STABILITY_HISTORY_BONUS, STABLE_SCORE_THRESHOLD,
    },
    detection::{BoundingBox, Landmark, RawDetectionResult},
    filters::{exponential::ExponentialMovingAverage, kalman::KalmanFilter},
    movement_detector::{MotionLevel, MovementDetector, Statistics},
    Error,
};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

/// Coarse tracking grade combining stability and confidence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackingQuality {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl TrackingQuality {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Fair => "fair",
            Self::Poor => "poor",
        }
    }
}

impl fmt::Display for TrackingQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Smoothing preset trading responsiveness for smoothness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmoothingStrength {
    Low,
    #[default]
    Medium,
    High,
}

impl SmoothingStrength {
    /// `(max_history_size, confidence_alpha)` for this preset
    #[must_use]
    pub fn params(&self) -> (usize, f64) {
        match self {
            Self::Low => (3, 0.5),
            Self::Medium => (DEFAULT_MAX_HISTORY_SIZE, DEFAULT_CONFIDENCE_ALPHA),
            Self::High => (8, 0.25),
        }
    }
}

impl FromStr for SmoothingStrength {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(Error::InvalidInput(format!("Unknown smoothing strength: {s}"))),
        }
    }
}

/// A detection after filtering, with motion and quality grades
#[derive(Debug, Clone, PartialEq)]
pub struct StabilizedResult {
    pub landmarks: Vec<Landmark>,
    pub bounding_box: BoundingBox,
    /// Smoothed detection confidence
    pub confidence: f64,
    pub processing_time_ms: f64,
    /// Stability in [0, 1]
    pub stability_score: f64,
    /// Always `stability_score > 0.7`
    pub is_stable: bool,
    pub motion_level: MotionLevel,
    pub tracking_quality: TrackingQuality,
}

/// Diagnostics for an adaptive-quality controller
#[derive(Debug, Clone, PartialEq)]
pub struct QualityRecommendations {
    pub should_reduce_quality: bool,
    pub should_increase_quality: bool,
    pub recommendations: Vec<String>,
}

/// Tracking counters exposed to hosts
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingMetrics {
    /// Successful detections over all processed frames, 0 before any frame
    pub success_rate: f64,
    /// Average of the recent motion-magnitude window
    pub average_motion: f64,
    /// Spread of the recent motion-magnitude window, `None` before two detections
    pub motion_stats: Option<Statistics>,
    /// Current landmark history depth
    pub history_size: usize,
    pub consecutive_failures: u32,
    pub processed_frames: u64,
    /// `None` until the first successful detection
    pub time_since_last_success: Option<Duration>,
}

/// Outcome of registering a missed detection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    /// The miss was counted, tracking memory is intact
    Tolerated,
    /// The failure budget was exhausted and the state was reset
    Reset,
}

/// All mutable memory of the stabilizer
#[derive(Debug, Clone)]
pub struct StabilizerState {
    landmark_history: VecDeque<Vec<Landmark>>,
    max_history_size: usize,
    box_filters: [KalmanFilter; 4],
    boxes_seeded: bool,
    confidence_filter: ExponentialMovingAverage,
    movement: MovementDetector,
    previous_box: Option<BoundingBox>,
    consecutive_failures: u32,
    success_count: u64,
    failure_count: u64,
    last_success: Option<Instant>,
}

fn new_box_filters() -> [KalmanFilter; 4] {
    [
        KalmanFilter::new(POSITION_PROCESS_NOISE, POSITION_MEASUREMENT_NOISE, 0.0),
        KalmanFilter::new(POSITION_PROCESS_NOISE, POSITION_MEASUREMENT_NOISE, 0.0),
        KalmanFilter::new(SIZE_PROCESS_NOISE, SIZE_MEASUREMENT_NOISE, 0.0),
        KalmanFilter::new(SIZE_PROCESS_NOISE, SIZE_MEASUREMENT_NOISE, 0.0),
    ]
}

impl StabilizerState {
    #[must_use]
    pub fn new(strength: SmoothingStrength) -> Self {
        let (max_history_size, alpha) = strength.params();
        Self {
            landmark_history: VecDeque::with_capacity(max_history_size),
            max_history_size,
            box_filters: new_box_filters(),
            boxes_seeded: false,
            confidence_filter: ExponentialMovingAverage::new(alpha),
            movement: MovementDetector::new(MOTION_HISTORY_SIZE),
            previous_box: None,
            consecutive_failures: 0,
            success_count: 0,
            failure_count: 0,
            last_success: None,
        }
    }

    /// Clear histories and counters and restart every filter
    pub fn reset(&mut self) {
        self.landmark_history.clear();
        self.movement.reset();
        self.previous_box = None;
        self.consecutive_failures = 0;
        self.success_count = 0;
        self.failure_count = 0;
        self.box_filters = new_box_filters();
        self.boxes_seeded = false;
        self.confidence_filter = ExponentialMovingAverage::new(self.confidence_filter.alpha());
    }

    /// Register a missed detection, resetting once more than `budget` misses occur in a row
    pub fn record_failure(&mut self, budget: u32) -> FailureOutcome {
        self.consecutive_failures += 1;
        self.failure_count += 1;

        if self.consecutive_failures > budget {
            self.reset();
            FailureOutcome::Reset
        } else {
            FailureOutcome::Tolerated
        }
    }

    fn record_success(&mut self, now: Instant) {
        self.consecutive_failures = 0;
        self.success_count += 1;
        self.last_success = Some(now);
    }

    fn push_landmarks(&mut self, landmarks: &[Landmark]) {
        while self.landmark_history.len() >= self.max_history_size {
            self.landmark_history.pop_front();
        }
        self.landmark_history.push_back(landmarks.to_vec());
    }

    fn filter_box(&mut self, raw: &BoundingBox) -> BoundingBox {
        let values = [raw.x_min, raw.y_min, raw.width, raw.height];

        if !self.boxes_seeded {
            for (filter, value) in self.box_filters.iter_mut().zip(values) {
                filter.reset_to(value);
            }
            self.boxes_seeded = true;
        }

        let mut filtered = [0.0; 4];
        let channels = filtered.iter_mut().zip(self.box_filters.iter_mut()).zip(values);
        for ((out, filter), value) in channels {
            *out = filter.filter(value);
        }

        BoundingBox::new(filtered[0], filtered[1], filtered[2], filtered[3])
    }

    fn set_max_history_size(&mut self, size: usize) {
        self.max_history_size = size.max(1);
        while self.landmark_history.len() > self.max_history_size {
            self.landmark_history.pop_front();
        }
    }

    #[must_use]
    pub fn history_size(&self) -> usize {
        self.landmark_history.len()
    }

    #[must_use]
    pub fn max_history_size(&self) -> usize {
        self.max_history_size
    }

    #[must_use]
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    #[must_use]
    pub fn failure_rate(&self) -> f64 {
        let total = self.success_count + self.failure_count;
        if total == 0 {
            0.0
        } else {
            self.failure_count as f64 / total as f64
        }
    }

    #[must_use]
    pub fn confidence_alpha(&self) -> f64 {
        self.confidence_filter.alpha()
    }
}

/// Recency-weighted average of a landmark history, oldest frame first
///
/// Frame `j` of `N` carries weight `j + 1`, normalized by `N(N+1)/2`.
/// Histories shorter than the smoothing minimum return the newest frame
/// unchanged.
#[must_use]
pub fn smooth_landmarks(history: &VecDeque<Vec<Landmark>>) -> Vec<Landmark> {
    let Some(latest) = history.back() else {
        return Vec::new();
    };
    if history.len() < MIN_HISTORY_FOR_SMOOTHING {
        return latest.clone();
    }

    (0..latest.len())
        .map(|i| {
            let mut sum = Landmark::default();
            let mut total_weight = 0.0;
            for (j, frame) in history.iter().enumerate() {
                if let Some(lm) = frame.get(i) {
                    let weight = (j + 1) as f64;
                    sum.x += lm.x * weight;
                    sum.y += lm.y * weight;
                    sum.z += lm.z * weight;
                    total_weight += weight;
                }
            }
            Landmark::new(sum.x / total_weight, sum.y / total_weight, sum.z / total_weight)
        })
        .collect()
}

/// Stability score from motion level, history depth and the consecutive-failure count
///
/// `stabilize` zeroes the failure counter before scoring a detection, so the
/// penalty term only matters to callers scoring a state mid-dropout.
#[must_use]
pub fn stability_score(
    motion: MotionLevel,
    history_len: usize,
    max_history: usize,
    consecutive_failures: u32,
) -> f64 {
    let base = match motion {
        MotionLevel::Still => STABILITY_BASE_STILL,
        MotionLevel::Slow => STABILITY_BASE_SLOW,
        MotionLevel::Medium => STABILITY_BASE_MEDIUM,
        MotionLevel::Fast => STABILITY_BASE_FAST,
    };

    let fill = if max_history == 0 {
        1.0
    } else {
        (history_len as f64 / max_history as f64).min(1.0)
    };
    let mut score = (base + STABILITY_HISTORY_BONUS * fill).min(1.0);

    if consecutive_failures > 0 {
        let penalty = 1.0 - FAILURE_PENALTY_PER_FRAME * f64::from(consecutive_failures);
        score *= penalty.max(FAILURE_PENALTY_FLOOR);
    }

    score
}

/// Grade tracking quality from the stability score and smoothed confidence
#[must_use]
pub fn tracking_quality(stability: f64, confidence: f64) -> TrackingQuality {
    let combined = (stability + confidence) / 2.0;
    if combined >= QUALITY_EXCELLENT_THRESHOLD {
        TrackingQuality::Excellent
    } else if combined >= QUALITY_GOOD_THRESHOLD {
        TrackingQuality::Good
    } else if combined >= QUALITY_FAIR_THRESHOLD {
        TrackingQuality::Fair
    } else {
        TrackingQuality::Poor
    }
}

/// Caller-owned tracking stabilizer
#[derive(Debug, Clone)]
pub struct TrackingStabilizer {
    state: StabilizerState,
    max_consecutive_failures: u32,
}

impl Default for TrackingStabilizer {
    fn default() -> Self {
        Self::new(SmoothingStrength::default(), DEFAULT_MAX_CONSECUTIVE_FAILURES)
    }
}

impl TrackingStabilizer {
    #[must_use]
    pub fn new(strength: SmoothingStrength, max_consecutive_failures: u32) -> Self {
        Self {
            state: StabilizerState::new(strength),
            max_consecutive_failures,
        }
    }

    /// Stabilize one frame's detection; `None` marks a frame without a face
    pub fn stabilize(&mut self, raw: Option<&RawDetectionResult>) -> Option<StabilizedResult> {
        self.stabilize_at(raw, Instant::now())
    }

    /// Same as [`Self::stabilize`] with an explicit frame time
    pub fn stabilize_at(
        &mut self,
        raw: Option<&RawDetectionResult>,
        now: Instant,
    ) -> Option<StabilizedResult> {
        let Some(raw) = raw else {
            if self.state.record_failure(self.max_consecutive_failures) == FailureOutcome::Reset {
                debug!(
                    "No face for more than {} frames, tracking state reset",
                    self.max_consecutive_failures
                );
            }
            return None;
        };

        let state = &mut self.state;
        state.record_success(now);

        state.push_landmarks(&raw.landmarks);
        let landmarks = smooth_landmarks(&state.landmark_history);

        let bounding_box = state.filter_box(&raw.bounding_box);
        let confidence = state.confidence_filter.update(raw.confidence);

        if let Some(previous) = state.previous_box {
            state.movement.update(bounding_box.distance(&previous));
        }
        state.previous_box = Some(bounding_box);
        let motion_level = state.movement.level();

        let stability = stability_score(
            motion_level,
            state.landmark_history.len(),
            state.max_history_size,
            state.consecutive_failures,
        );

        Some(StabilizedResult {
            landmarks,
            bounding_box,
            confidence,
            processing_time_ms: raw.processing_time_ms,
            stability_score: stability,
            is_stable: stability > STABLE_SCORE_THRESHOLD,
            motion_level,
            tracking_quality: tracking_quality(stability, confidence),
        })
    }

    /// Drop all tracking memory
    pub fn reset(&mut self) {
        self.state.reset();
    }

    /// Reconfigure history depth and confidence smoothing
    pub fn set_smoothing_strength(&mut self, strength: SmoothingStrength) {
        let (history, alpha) = strength.params();
        self.state.set_max_history_size(history);
        self.state.confidence_filter.set_alpha(alpha);
        debug!("Smoothing strength set to {strength:?} (history {history}, alpha {alpha})");
    }

    #[must_use]
    pub fn quality_recommendations(&self) -> QualityRecommendations {
        let state = &self.state;
        let failure_rate = state.failure_rate();
        let average_motion = state.movement.average();

        let should_reduce_quality = failure_rate > REDUCE_QUALITY_FAILURE_RATE;
        let should_increase_quality = state.success_count > INCREASE_QUALITY_MIN_SUCCESSES
            && failure_rate < INCREASE_QUALITY_FAILURE_RATE
            && average_motion < MOTION_SLOW_THRESHOLD;

        let mut recommendations = Vec::new();
        if should_reduce_quality {
            recommendations.push(format!(
                "Detection fails on {:.0}% of frames: lower the capture resolution or frame rate",
                failure_rate * 100.0
            ));
        }
        if should_increase_quality {
            recommendations.push(
                "Tracking is stable: capture resolution or effect quality can be raised".into(),
            );
        }
        if state.landmark_history.len() < state.max_history_size {
            recommendations.push(format!(
                "Building tracking history ({}/{} frames)",
                state.landmark_history.len(),
                state.max_history_size
            ));
        }

        QualityRecommendations {
            should_reduce_quality,
            should_increase_quality,
            recommendations,
        }
    }

    #[must_use]
    pub fn metrics(&self) -> TrackingMetrics {
        let state = &self.state;
        let processed_frames = state.success_count + state.failure_count;
        TrackingMetrics {
            success_rate: if processed_frames == 0 {
                0.0
            } else {
                state.success_count as f64 / processed_frames as f64
            },
            average_motion: state.movement.average(),
            motion_stats: state.movement.stats(),
            history_size: state.landmark_history.len(),
            consecutive_failures: state.consecutive_failures,
            processed_frames,
            time_since_last_success: state.last_success.map(|t| t.elapsed()),
        }
    }

    /// Read-only view of the tracking memory
    #[must_use]
    pub fn state(&self) -> &StabilizerState {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(x_min: f64) -> RawDetectionResult {
        RawDetectionResult {
            landmarks: vec![Landmark::new(x_min, 0.3, 0.0), Landmark::new(x_min + 0.4, 0.7, 0.0)],
            bounding_box: BoundingBox::new(x_min, 0.3, 0.4, 0.4),
            confidence: 0.9,
            processing_time_ms: 5.0,
        }
    }

    #[test]
    fn test_weighted_landmark_average() {
        let history: VecDeque<Vec<Landmark>> = [0.0, 1.0, 2.0]
            .iter()
            .map(|&v| vec![Landmark::new(v, v, v)])
            .collect();
        let smoothed = smooth_landmarks(&history);
        // (0*1 + 1*2 + 2*3) / 6
        assert!((smoothed[0].x - 8.0 / 6.0).abs() < 1e-12);
        assert!((smoothed[0].z - 8.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_short_history_passes_through() {
        let history: VecDeque<Vec<Landmark>> =
            [vec![Landmark::new(0.1, 0.1, 0.0)], vec![Landmark::new(0.9, 0.9, 0.0)]].into();
        assert_eq!(smooth_landmarks(&history), vec![Landmark::new(0.9, 0.9, 0.0)]);
    }

    #[test]
    fn test_stability_score_components() {
        assert_eq!(stability_score(MotionLevel::Still, 5, 5, 0), 1.0);
        assert!((stability_score(MotionLevel::Medium, 0, 5, 0) - 0.6).abs() < 1e-12);
        assert!((stability_score(MotionLevel::Slow, 5, 5, 0) - 1.0).abs() < 1e-12);
        assert!((stability_score(MotionLevel::Fast, 5, 5, 2) - 0.4).abs() < 1e-12);
        assert!((stability_score(MotionLevel::Still, 5, 5, 3) - 0.7).abs() < 1e-12);
        // Penalty floors at one half
        assert!((stability_score(MotionLevel::Still, 5, 5, 9) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_tracking_quality_grades() {
        assert_eq!(tracking_quality(1.0, 0.9), TrackingQuality::Excellent);
        assert_eq!(tracking_quality(0.8, 0.6), TrackingQuality::Good);
        assert_eq!(tracking_quality(0.6, 0.4), TrackingQuality::Fair);
        assert_eq!(tracking_quality(0.3, 0.3), TrackingQuality::Poor);
    }

    #[test]
    fn test_failure_budget_transition() {
        let mut state = StabilizerState::new(SmoothingStrength::Medium);
        for _ in 0..10 {
            assert_eq!(state.record_failure(10), FailureOutcome::Tolerated);
        }
        assert_eq!(state.consecutive_failures(), 10);
        assert_eq!(state.record_failure(10), FailureOutcome::Reset);
        assert_eq!(state.consecutive_failures(), 0);
    }

    #[test]
    fn test_no_penalty_after_recovery() {
        let mut stabilizer = TrackingStabilizer::default();
        for _ in 0..5 {
            stabilizer.stabilize(Some(&raw(0.3)));
        }
        stabilizer.stabilize(None);
        stabilizer.stabilize(None);
        let result = stabilizer.stabilize(Some(&raw(0.3))).unwrap();
        assert_eq!(stabilizer.state().consecutive_failures(), 0);
        assert_eq!(result.stability_score, 1.0);
        assert!(result.is_stable);
    }

    #[test]
    fn test_is_stable_matches_score() {
        let mut stabilizer = TrackingStabilizer::default();
        for i in 0..15 {
            let result = stabilizer.stabilize(Some(&raw(0.1 + 0.03 * i as f64))).unwrap();
            assert_eq!(result.is_stable, result.stability_score > 0.7);
        }
    }

    #[test]
    fn test_smoothing_strength_reconfigures() {
        let mut stabilizer = TrackingStabilizer::default();
        for _ in 0..5 {
            stabilizer.stabilize(Some(&raw(0.3)));
        }
        stabilizer.set_smoothing_strength(SmoothingStrength::Low);
        assert_eq!(stabilizer.state().max_history_size(), 3);
        assert_eq!(stabilizer.metrics().history_size, 3);
        assert_eq!(stabilizer.state().confidence_alpha(), 0.5);

        stabilizer.set_smoothing_strength(SmoothingStrength::High);
        assert_eq!(stabilizer.state().max_history_size(), 8);
        assert_eq!(stabilizer.state().confidence_alpha(), 0.25);
    }

    #[test]
    fn test_smoothing_strength_from_str() {
        assert_eq!("HIGH".parse::<SmoothingStrength>().unwrap(), SmoothingStrength::High);
        assert!("extreme".parse::<SmoothingStrength>().is_err());
    }
}
