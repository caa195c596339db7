/// Exponential moving average over a single scalar channel
#[derive(Debug, Clone)]
pub struct ExponentialMovingAverage {
    alpha: f64,
    value: Option<f64>,
}

impl ExponentialMovingAverage {
    pub fn new(alpha: f64) -> Self {
        assert!(alpha > 0.0 && alpha <= 1.0, "Alpha must be in (0, 1]");
        Self { alpha, value: None }
    }

    /// Blend `value` into the running average; the first call passes it through
    pub fn update(&mut self, value: f64) -> f64 {
        let smoothed = match self.value {
            Some(previous) => self.alpha * value + (1.0 - self.alpha) * previous,
            None => value,
        };
        self.value = Some(smoothed);
        smoothed
    }

    /// Current smoothed value, `None` until the first update
    #[must_use]
    pub fn value(&self) -> Option<f64> {
        self.value
    }

    #[must_use]
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Change the blend factor, keeping the current value
    pub fn set_alpha(&mut self, alpha: f64) {
        assert!(alpha > 0.0 && alpha <= 1.0, "Alpha must be in (0, 1]");
        self.alpha = alpha;
    }

    pub fn clear(&mut self) {
        self.value = None;
    }
}
