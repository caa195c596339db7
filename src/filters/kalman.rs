use crate::constants::KALMAN_INITIAL_COVARIANCE;

/// State of a one-dimensional Kalman filter channel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterState {
    /// Process noise
    pub q: f64,
    /// Measurement noise
    pub r: f64,
    /// Current estimate
    pub x: f64,
    /// Error covariance, never negative
    pub p: f64,
    /// Last gain, always within [0, 1]
    pub k: f64,
}

/// Scalar Kalman filter with a constant-position model
#[derive(Debug, Clone)]
pub struct KalmanFilter {
    state: FilterState,
}

impl KalmanFilter {
    /// Create a filter with the given process noise, measurement noise and initial estimate
    #[must_use]
    pub fn new(process_noise: f64, measurement_noise: f64, initial_value: f64) -> Self {
        Self {
            state: FilterState {
                q: process_noise.max(0.0),
                r: measurement_noise.max(0.0),
                x: initial_value,
                p: KALMAN_INITIAL_COVARIANCE,
                k: 0.0,
            },
        }
    }

    /// Predict then update with one measurement, returning the new estimate
    pub fn filter(&mut self, measurement: f64) -> f64 {
        let s = &mut self.state;

        // Predict
        s.p += s.q;

        // Update
        let denominator = s.p + s.r;
        s.k = if denominator > 0.0 { (s.p / denominator).clamp(0.0, 1.0) } else { 1.0 };
        s.x += s.k * (measurement - s.x);
        s.p = (s.p * (1.0 - s.k)).max(0.0);

        s.x
    }

    /// Restart the channel at `value` with unit covariance
    pub fn reset_to(&mut self, value: f64) {
        self.state.x = value;
        self.state.p = KALMAN_INITIAL_COVARIANCE;
        self.state.k = 0.0;
    }

    /// Current estimate
    #[must_use]
    pub fn estimate(&self) -> f64 {
        self.state.x
    }

    /// Snapshot of the full channel state
    #[must_use]
    pub fn state(&self) -> FilterState {
        self.state
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_kalman_converges_to_constant() {
        let mut filter = KalmanFilter::new(0.01, 0.1, 0.0);

        let mut estimate = 0.0;
        let mut previous = 0.0;
        for _ in 0..20 {
            estimate = filter.filter(1.0);
            assert!(estimate >= previous, "estimate must approach monotonically");
            previous = estimate;
        }
        assert!(estimate > 0.95);
    }

    #[test]
    fn test_single_step_matches_equations() {
        let mut filter = KalmanFilter::new(0.01, 0.1, 0.0);
        let x = filter.filter(1.0);

        // p = 1 + 0.01, k = 1.01 / 1.11
        let k = 1.01 / 1.11;
        assert!((x - k).abs() < 1e-12);
        assert!((filter.state().k - k).abs() < 1e-12);
        assert!((filter.state().p - 1.01 * (1.0 - k)).abs() < 1e-12);
    }

    #[test]
    fn test_reset_to_value() {
        let mut filter = KalmanFilter::new(0.01, 0.1, 0.0);
        for _ in 0..5 {
            filter.filter(3.0);
        }
        filter.reset_to(7.0);
        assert_eq!(filter.estimate(), 7.0);
        assert_eq!(filter.state().p, 1.0);

        // Identical measurement leaves a seeded estimate untouched
        assert_eq!(filter.filter(7.0), 7.0);
    }

    #[test]
    fn test_lower_noise_ratio_converges_faster() {
        let mut responsive = KalmanFilter::new(0.1, 0.1, 0.0);
        let mut sluggish = KalmanFilter::new(0.001, 0.1, 0.0);
        for _ in 0..5 {
            responsive.filter(1.0);
            sluggish.filter(1.0);
        }
        assert!(responsive.estimate() > sluggish.estimate());
    }

    proptest! {
        #[test]
        fn prop_covariance_and_gain_stay_bounded(
            q in 0.0..1.0f64,
            r in 0.0..1.0f64,
            measurements in prop::collection::vec(-100.0..100.0f64, 1..50)
        ) {
            let mut filter = KalmanFilter::new(q, r, 0.0);
            for m in measurements {
                filter.filter(m);
                let state = filter.state();
                prop_assert!(state.p >= 0.0);
                prop_assert!((0.0..=1.0).contains(&state.k));
            }
        }
    }
}
