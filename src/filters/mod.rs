//! Scalar smoothing filters for noisy tracking channels.
//!
//! Each filter instance owns the state of exactly one scalar channel
//! (a bounding-box edge, a confidence stream). The tracking stabilizer
//! composes several of them per frame.

/// One-dimensional Kalman filter
pub mod kalman;

/// Exponential moving average for responsive smoothing
pub mod exponential;
