//! Live AR preview pipeline with temporally stabilized face tracking.
//!
//! The crate turns noisy per-frame face-landmark detections into smoothed,
//! confidence-weighted tracking results and composites cosmetic preview
//! effects onto a live frame stream:
//! - Scalar signal filters (Kalman and exponential moving average)
//! - A tracking stabilizer combining landmark history, box filtering,
//!   motion classification and failure recovery
//! - A preview session that drives capture, detection, stabilization and
//!   effect compositing one cooperative tick at a time
//!
//! # Examples
//!
//! ## Stabilizing detections
//!
//! ```no_run
//! use live_ar_preview::detection::{BoundingBox, Landmark, RawDetectionResult};
//! use live_ar_preview::stabilizer::{SmoothingStrength, TrackingStabilizer};
//!
//! let mut stabilizer = TrackingStabilizer::new(SmoothingStrength::Medium, 10);
//!
//! let raw = RawDetectionResult {
//!     landmarks: vec![Landmark::new(0.4, 0.3, 0.0), Landmark::new(0.6, 0.7, 0.0)],
//!     bounding_box: BoundingBox::new(0.4, 0.3, 0.2, 0.4),
//!     confidence: 0.92,
//!     processing_time_ms: 4.0,
//! };
//!
//! if let Some(result) = stabilizer.stabilize(Some(&raw)) {
//!     println!(
//!         "stability {:.2} ({}), motion {}",
//!         result.stability_score, result.tracking_quality, result.motion_level
//!     );
//! }
//!
//! // A frame without a face
//! stabilizer.stabilize(None);
//! println!("{:?}", stabilizer.metrics());
//! ```
//!
//! ## Running a headless preview
//!
//! ```no_run
//! use live_ar_preview::{
//!     config::SessionConfig,
//!     detection::ReplayDetector,
//!     effects::{EffectConfig, EffectType},
//!     session::{PreviewSession, SessionCallbacks},
//!     surface::{ImageSurface, StillImageSource},
//! };
//!
//! # fn main() -> live_ar_preview::Result<()> {
//! let source = StillImageSource::from_file("face.png")?;
//! let detector = ReplayDetector::from_file("face.yaml")?;
//!
//! let callbacks = SessionCallbacks::new()
//!     .on_fps_update(|fps| println!("{fps} fps"))
//!     .on_error(|e| eprintln!("{e}"));
//!
//! let mut session = PreviewSession::new(Box::new(source), Some(Box::new(detector)))
//!     .with_callbacks(callbacks);
//! session.add_effect(EffectConfig::new(EffectType::Whitening, 0.5));
//!
//! session.start(Box::new(ImageSurface::new()), SessionConfig::default())?;
//! session.run(Some(60));
//! let png = session.capture_frame();
//! session.stop();
//! # let _ = png;
//! # Ok(())
//! # }
//! ```

/// Face-landmark detector interface and detection geometry
pub mod detection;

/// Face orientation estimated from landmark geometry
pub mod pose_estimation;

/// Signal filtering algorithms for smoothing tracking values
pub mod filters;

/// Motion classification over recent bounding-box displacement
pub mod movement_detector;

/// Temporal stabilization of face tracking results
pub mod stabilizer;

/// Pixel-space cosmetic preview effects
pub mod effects;

/// Capture-source and output-surface capabilities
pub mod surface;

/// Preview session and render loop
pub mod session;

/// Region helpers and numeric conversions
pub mod utils;

/// Error types and result handling
pub mod error;

/// Constants used throughout the pipeline
pub mod constants;

/// Configuration management
pub mod config;

pub use error::{Error, Result};
