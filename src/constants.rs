//! Constants used throughout the tracking pipeline

/// Number of landmarks in the dense face mesh topology
pub const NUM_FACE_MESH_LANDMARKS: usize = 468;

/// Kalman process noise for box position channels (xMin, yMin)
pub const POSITION_PROCESS_NOISE: f64 = 0.01;
/// Kalman measurement noise for box position channels
pub const POSITION_MEASUREMENT_NOISE: f64 = 0.1;

/// Kalman process noise for box size channels (width, height)
pub const SIZE_PROCESS_NOISE: f64 = 0.005;
/// Kalman measurement noise for box size channels
pub const SIZE_MEASUREMENT_NOISE: f64 = 0.05;

/// Error covariance a Kalman filter restarts from
pub const KALMAN_INITIAL_COVARIANCE: f64 = 1.0;

/// Confidence EMA alpha at medium smoothing
pub const DEFAULT_CONFIDENCE_ALPHA: f64 = 0.4;

/// Landmark history depth at medium smoothing
pub const DEFAULT_MAX_HISTORY_SIZE: usize = 5;

/// Minimum landmark history depth before weighted smoothing kicks in
pub const MIN_HISTORY_FOR_SMOOTHING: usize = 3;

/// Motion-magnitude history depth
pub const MOTION_HISTORY_SIZE: usize = 10;

/// Consecutive missed detections tolerated before an implicit reset
pub const DEFAULT_MAX_CONSECUTIVE_FAILURES: u32 = 10;

/// Motion thresholds (average 4-D box displacement per frame)
pub const MOTION_STILL_THRESHOLD: f64 = 0.005;
pub const MOTION_SLOW_THRESHOLD: f64 = 0.02;
pub const MOTION_MEDIUM_THRESHOLD: f64 = 0.05;

/// Stability base values per motion level
pub const STABILITY_BASE_STILL: f64 = 1.0;
pub const STABILITY_BASE_SLOW: f64 = 0.85;
pub const STABILITY_BASE_MEDIUM: f64 = 0.6;
pub const STABILITY_BASE_FAST: f64 = 0.3;

/// Maximum bonus granted for a full landmark history
pub const STABILITY_HISTORY_BONUS: f64 = 0.2;

/// Penalty per consecutive failure and the floor it cannot go below
pub const FAILURE_PENALTY_PER_FRAME: f64 = 0.1;
pub const FAILURE_PENALTY_FLOOR: f64 = 0.5;

/// Score above which a result counts as stable
pub const STABLE_SCORE_THRESHOLD: f64 = 0.7;

/// Tracking quality thresholds
pub const QUALITY_EXCELLENT_THRESHOLD: f64 = 0.85;
pub const QUALITY_GOOD_THRESHOLD: f64 = 0.7;
pub const QUALITY_FAIR_THRESHOLD: f64 = 0.5;

/// Adaptive quality recommendation thresholds
pub const REDUCE_QUALITY_FAILURE_RATE: f64 = 0.3;
pub const INCREASE_QUALITY_FAILURE_RATE: f64 = 0.1;
pub const INCREASE_QUALITY_MIN_SUCCESSES: u64 = 30;

/// Confidence reported when the detector does not supply one
pub const DEFAULT_DETECTION_CONFIDENCE: f64 = 0.9;

/// Effect parameters
pub const SMOOTHING_TARGET_GRAY: f64 = 128.0;
pub const SMOOTHING_BLEND_FACTOR: f64 = 0.3;
pub const WHITENING_MAX_OFFSET: f64 = 20.0;
pub const BOTOX_MAX_BLUR_RADIUS: f64 = 2.0;
pub const FILLER_MAX_EXPANSION: f64 = 4.0;
pub const FILLER_MAX_OPACITY: f64 = 0.3;
pub const FILLER_BLUR_RADIUS: f32 = 1.0;

/// FPS reporting window in milliseconds
pub const FPS_WINDOW_MS: f64 = 1000.0;

/// Default target tick rate for headless scheduling
pub const DEFAULT_TARGET_FPS: u32 = 30;
