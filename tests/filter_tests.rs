//! Tests for the scalar smoothing filters

use live_ar_preview::filters::{exponential::ExponentialMovingAverage, kalman::KalmanFilter};

#[test]
fn test_kalman_converges_to_constant_measurement() {
    let mut filter = KalmanFilter::new(0.01, 0.1, 0.0);

    let mut estimate = 0.0;
    for _ in 0..20 {
        estimate = filter.filter(1.0);
    }

    assert!(estimate > 0.95, "estimate {estimate} did not converge");
    assert!(estimate <= 1.0);
}

#[test]
fn test_kalman_covariance_settles() {
    let mut filter = KalmanFilter::new(0.01, 0.1, 0.0);
    for _ in 0..200 {
        filter.filter(0.5);
    }

    // Steady state of p = (p + q) * r / (p + q + r)
    let state = filter.state();
    let expected = (-0.01 + (0.01f64 * 0.01 + 4.0 * 0.01 * 0.1).sqrt()) / 2.0;
    assert!((state.p - expected).abs() < 1e-9, "p = {}", state.p);
    assert!((filter.estimate() - 0.5).abs() < 1e-6);
}

#[test]
fn test_ema_first_call_identity_and_blend() {
    let mut ema = ExponentialMovingAverage::new(0.3);
    assert_eq!(ema.update(10.0), 10.0);
    assert_eq!(ema.update(0.0), 7.0);
}

#[test]
fn test_ema_alpha_change_keeps_value() {
    let mut ema = ExponentialMovingAverage::new(0.5);
    ema.update(4.0);
    ema.set_alpha(1.0);

    assert_eq!(ema.value(), Some(4.0));
    assert_eq!(ema.update(2.0), 2.0);
}

#[test]
#[should_panic(expected = "Alpha must be in (0, 1]")]
fn test_ema_zero_alpha() {
    let _ = ExponentialMovingAverage::new(0.0);
}

#[test]
#[should_panic(expected = "Alpha must be in (0, 1]")]
fn test_ema_too_large_alpha() {
    let _ = ExponentialMovingAverage::new(1.5);
}

#[test]
fn test_reset_restarts_channels() {
    let mut kalman = KalmanFilter::new(0.01, 0.1, 0.0);
    let mut ema = ExponentialMovingAverage::new(0.4);
    for _ in 0..5 {
        kalman.filter(3.0);
        ema.update(3.0);
    }
    assert!(kalman.estimate() > 0.0);

    kalman.reset_to(-3.0);
    ema.clear();

    assert_eq!(kalman.filter(-3.0), -3.0);
    assert_eq!(ema.update(-3.0), -3.0);
}
