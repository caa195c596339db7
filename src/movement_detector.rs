//! Motion classification for the tracked face box.
//!
//! Keeps a short window of inter-frame box displacements and buckets the
//! window average into a coarse motion level.

use crate::constants::{
    MOTION_HISTORY_SIZE, MOTION_MEDIUM_THRESHOLD, MOTION_SLOW_THRESHOLD, MOTION_STILL_THRESHOLD,
};
use std::collections::VecDeque;
use std::fmt;

/// Coarse motion bucket derived from averaged box displacement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MotionLevel {
    Still,
    Slow,
    Medium,
    Fast,
}

impl MotionLevel {
    /// Bucket an average displacement magnitude
    #[must_use]
    pub fn classify(average_motion: f64) -> Self {
        if average_motion < MOTION_STILL_THRESHOLD {
            Self::Still
        } else if average_motion < MOTION_SLOW_THRESHOLD {
            Self::Slow
        } else if average_motion < MOTION_MEDIUM_THRESHOLD {
            Self::Medium
        } else {
            Self::Fast
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Still => "still",
            Self::Slow => "slow",
            Self::Medium => "medium",
            Self::Fast => "fast",
        }
    }
}

impl fmt::Display for MotionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Movement detector over a sliding window of displacement magnitudes
#[derive(Debug, Clone)]
pub struct MovementDetector {
    window_size: usize,
    history: VecDeque<f64>,
}

impl Default for MovementDetector {
    fn default() -> Self {
        Self::new(MOTION_HISTORY_SIZE)
    }
}

impl MovementDetector {
    /// Create a new movement detector
    #[must_use]
    pub fn new(window_size: usize) -> Self {
        let window_size = window_size.max(1);
        Self {
            window_size,
            history: VecDeque::with_capacity(window_size),
        }
    }

    /// Record one displacement magnitude and classify the updated window
    pub fn update(&mut self, magnitude: f64) -> MotionLevel {
        if self.history.len() >= self.window_size {
            self.history.pop_front();
        }
        self.history.push_back(magnitude);

        self.level()
    }

    /// Mean displacement over the window, 0 when empty
    #[must_use]
    pub fn average(&self) -> f64 {
        if self.history.is_empty() {
            return 0.0;
        }
        self.history.iter().sum::<f64>() / self.history.len() as f64
    }

    /// Motion level of the current window
    #[must_use]
    pub fn level(&self) -> MotionLevel {
        MotionLevel::classify(self.average())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.history.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Get current window statistics
    #[must_use]
    pub fn stats(&self) -> Option<Statistics> {
        if self.history.is_empty() {
            return None;
        }
        Some(Self::calculate_stats(&self.history))
    }

    /// Reset the detector
    pub fn reset(&mut self) {
        self.history.clear();
    }

    /// Calculate statistics for a data window
    fn calculate_stats(data: &VecDeque<f64>) -> Statistics {
        let n = data.len() as f64;
        let mean = data.iter().sum::<f64>() / n;

        let variance = data.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;

        let std_dev = variance.sqrt();

        let min = data.iter().copied().fold(f64::INFINITY, f64::min);
        let max = data.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let range = max - min;

        Statistics {
            mean,
            std_dev,
            min,
            max,
            range,
        }
    }
}

/// Statistical summary of a data window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Statistics {
    /// Mean value of the data
    pub mean: f64,
    /// Standard deviation of the data
    pub std_dev: f64,
    /// Minimum value in the window
    pub min: f64,
    /// Maximum value in the window
    pub max: f64,
    /// Range (max - min) of the data
    pub range: f64,
}
