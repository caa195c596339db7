//! Preview session: owns the capture source and output surface and runs
//! the per-tick pipeline capture → detect → stabilize → composite → present.
//!
//! Ticks are cooperative and never overlap. Hosts with a display-refresh
//! callback call [`PreviewSession::tick`] from it; headless hosts use
//! [`PreviewSession::run`], which ticks on a fixed interval.

use crate::{
    config::SessionConfig,
    constants::{DEFAULT_DETECTION_CONFIDENCE, FPS_WINDOW_MS},
    detection::{
        bounding_box_from_landmarks, BoundingBox, FaceLandmarks, Landmark, LandmarkDetector,
        RawDetectionResult,
    },
    effects::{apply_effects, EffectConfig, EffectList, EffectType},
    pose_estimation::{estimate_face_angles, FaceAngles, LandmarkIndices},
    stabilizer::{StabilizedResult, TrackingStabilizer},
    surface::{FrameSink, FrameSource},
    Error, Result,
};
use image::{DynamicImage, ImageOutputFormat};
use log::{debug, info, trace, warn};
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Per-frame face tracking result delivered to hosts
#[derive(Debug, Clone, PartialEq)]
pub struct FaceTrackingResult {
    /// Raw normalized landmarks from the detector
    pub landmarks: Vec<Landmark>,
    /// Face box in surface pixels, stabilized when the stabilizer is enabled
    pub bounding_box: BoundingBox,
    pub confidence: f64,
    pub timestamp_ms: f64,
    pub processing_time_ms: f64,
    pub angles: Option<FaceAngles>,
    /// Stabilizer output in normalized coordinates
    pub stabilized: Option<StabilizedResult>,
}

type FaceCallback = Box<dyn FnMut(&FaceTrackingResult)>;
type FpsCallback = Box<dyn FnMut(f64)>;
type ErrorCallback = Box<dyn FnMut(&Error)>;

/// Host callbacks
#[derive(Default)]
pub struct SessionCallbacks {
    on_face_detected: Option<FaceCallback>,
    on_fps_update: Option<FpsCallback>,
    on_error: Option<ErrorCallback>,
}

impl SessionCallbacks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn on_face_detected(mut self, f: impl FnMut(&FaceTrackingResult) + 'static) -> Self {
        self.on_face_detected = Some(Box::new(f));
        self
    }

    #[must_use]
    pub fn on_fps_update(mut self, f: impl FnMut(f64) + 'static) -> Self {
        self.on_fps_update = Some(Box::new(f));
        self
    }

    #[must_use]
    pub fn on_error(mut self, f: impl FnMut(&Error) + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }

    fn face_detected(&mut self, result: &FaceTrackingResult) {
        if let Some(cb) = &mut self.on_face_detected {
            cb(result);
        }
    }

    fn fps_update(&mut self, fps: f64) {
        if let Some(cb) = &mut self.on_fps_update {
            cb(fps);
        }
    }

    fn error(&mut self, err: &Error) {
        if let Some(cb) = &mut self.on_error {
            cb(err);
        }
    }
}

/// Rolling frames-per-second counter reporting once per elapsed second
#[derive(Debug, Clone)]
pub struct FpsCounter {
    frames: u32,
    window_start: Instant,
    fps: f64,
}

impl FpsCounter {
    #[must_use]
    pub fn new(now: Instant) -> Self {
        Self {
            frames: 0,
            window_start: now,
            fps: 0.0,
        }
    }

    /// Count one frame; returns the new rate when a full window has elapsed
    pub fn tick(&mut self, now: Instant) -> Option<f64> {
        self.frames += 1;
        let elapsed_ms = now.saturating_duration_since(self.window_start).as_secs_f64() * 1000.0;
        if elapsed_ms < FPS_WINDOW_MS {
            return None;
        }

        self.fps = (f64::from(self.frames) * 1000.0 / elapsed_ms).round();
        self.frames = 0;
        self.window_start = now;
        Some(self.fps)
    }

    /// Last reported rate
    #[must_use]
    pub fn fps(&self) -> f64 {
        self.fps
    }
}

/// Cooperative cancellation flag, cloneable across threads
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Resources held between `start` and `stop`
struct SessionState {
    surface: Box<dyn FrameSink>,
    config: SessionConfig,
    fps: FpsCounter,
    started_at: Instant,
    frame_count: u64,
    last_result: Option<FaceTrackingResult>,
}

/// Caller-owned live preview session
pub struct PreviewSession {
    source: Box<dyn FrameSource>,
    detector: Option<Box<dyn LandmarkDetector>>,
    stabilizer: TrackingStabilizer,
    effects: EffectList,
    callbacks: SessionCallbacks,
    landmark_indices: LandmarkIndices,
    stop_handle: StopHandle,
    state: Option<SessionState>,
}

impl PreviewSession {
    /// Create a stopped session over `source`; `detector` is required only for face tracking
    #[must_use]
    pub fn new(source: Box<dyn FrameSource>, detector: Option<Box<dyn LandmarkDetector>>) -> Self {
        Self {
            source,
            detector,
            stabilizer: TrackingStabilizer::default(),
            effects: EffectList::new(),
            callbacks: SessionCallbacks::new(),
            landmark_indices: LandmarkIndices::default(),
            stop_handle: StopHandle::default(),
            state: None,
        }
    }

    #[must_use]
    pub fn with_callbacks(mut self, callbacks: SessionCallbacks) -> Self {
        self.callbacks = callbacks;
        self
    }

    #[must_use]
    pub fn with_stabilizer(mut self, stabilizer: TrackingStabilizer) -> Self {
        self.stabilizer = stabilizer;
        self
    }

    /// Override the landmark indices used for face-angle estimation
    #[must_use]
    pub fn with_landmark_indices(mut self, indices: LandmarkIndices) -> Self {
        self.landmark_indices = indices;
        self
    }

    /// Acquire the capture device, size `surface` and start the session
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the capture device
    /// or surface cannot be prepared, or the detector fails to initialize.
    /// Everything acquired so far is released before returning.
    pub fn start(&mut self, surface: Box<dyn FrameSink>, config: SessionConfig) -> Result<()> {
        self.start_at(surface, config, Instant::now())
    }

    /// Same as [`Self::start`] with an explicit start time
    pub fn start_at(
        &mut self,
        surface: Box<dyn FrameSink>,
        config: SessionConfig,
        now: Instant,
    ) -> Result<()> {
        self.release_if_stopped();
        if self.is_running() {
            warn!("Preview session is already running, ignoring start");
            return Ok(());
        }

        match self.acquire(surface, &config) {
            Ok(surface) => {
                let (width, height) = surface.dimensions();
                info!(
                    "Preview session started at {width}x{height} (tracking: {}, effects: {})",
                    config.enable_face_tracking, config.enable_ar_effects
                );
                self.stop_handle = StopHandle::default();
                self.state = Some(SessionState {
                    surface,
                    config,
                    fps: FpsCounter::new(now),
                    started_at: now,
                    frame_count: 0,
                    last_result: None,
                });
                Ok(())
            }
            Err(e) => {
                self.source.release();
                Err(e)
            }
        }
    }

    fn acquire(
        &mut self,
        mut surface: Box<dyn FrameSink>,
        config: &SessionConfig,
    ) -> Result<Box<dyn FrameSink>> {
        config.validate()?;

        self.source.open(&config.video_constraints())?;
        let (width, height) = self.source.dimensions();
        if width == 0 || height == 0 {
            return Err(Error::CaptureUnavailable(
                "Capture stream reports no resolution".to_string(),
            ));
        }
        surface.resize(width, height)?;

        if config.enable_face_tracking {
            let detector = self
                .detector
                .as_mut()
                .ok_or_else(|| {
                    Error::DetectorInit("Face tracking enabled without a detector".to_string())
                })?;
            detector.initialize().map_err(|e| match e {
                Error::DetectorInit(_) => e,
                other => Error::DetectorInit(other.to_string()),
            })?;
        }

        Ok(surface)
    }

    /// Cancel ticking, release the capture device and clear the surface
    ///
    /// Safe to call any number of times.
    pub fn stop(&mut self) {
        self.stop_handle.stop();
        if let Some(mut state) = self.state.take() {
            state.surface.clear();
            info!("Preview session stopped after {} frames", state.frame_count);
        }
        self.source.release();
    }

    /// Finish a stop requested through a [`StopHandle`]
    fn release_if_stopped(&mut self) {
        if self.stop_handle.is_stopped() && self.state.is_some() {
            self.stop();
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state.is_some() && !self.stop_handle.is_stopped()
    }

    /// Handle that stops [`Self::run`] from another thread
    #[must_use]
    pub fn stop_handle(&self) -> StopHandle {
        self.stop_handle.clone()
    }

    /// Run one loop iteration now
    pub fn tick(&mut self) {
        self.tick_at(Instant::now());
    }

    /// Run one loop iteration at `now`
    ///
    /// Errors from the loop body go to the error callback; the session
    /// keeps running.
    pub fn tick_at(&mut self, now: Instant) {
        self.release_if_stopped();
        if !self.is_running() {
            return;
        }

        if let Err(e) = self.render_frame(now) {
            warn!("Render tick failed: {e}");
            self.callbacks.error(&e);
        }
    }

    /// Tick on a fixed interval derived from `target_fps` until stopped
    ///
    /// With `max_ticks` set, returns after that many ticks and leaves the
    /// session running.
    pub fn run(&mut self, max_ticks: Option<u64>) {
        let Some(target_fps) = self.state.as_ref().map(|s| s.config.target_fps.max(1)) else {
            warn!("Preview session is not running");
            return;
        };
        let interval = Duration::from_secs_f64(1.0 / f64::from(target_fps));
        let mut ticks = 0u64;

        while self.is_running() && max_ticks.map_or(true, |max| ticks < max) {
            let tick_start = Instant::now();
            self.tick_at(tick_start);
            ticks += 1;

            if let Some(remaining) = interval.checked_sub(tick_start.elapsed()) {
                std::thread::sleep(remaining);
            }
        }

        self.release_if_stopped();
    }

    fn render_frame(&mut self, now: Instant) -> Result<()> {
        let Self {
            source,
            detector,
            stabilizer,
            effects,
            callbacks,
            landmark_indices,
            state,
            ..
        } = self;
        let Some(state) = state.as_mut() else {
            return Err(Error::SessionError("Session is not running".to_string()));
        };

        let timestamp_ms = now.saturating_duration_since(state.started_at).as_secs_f64() * 1000.0;
        let ready = source.is_ready();
        let frame = source.current_frame()?;
        state.surface.draw_frame(frame)?;
        state.frame_count += 1;

        if state.config.enable_face_tracking && ready {
            if let Some(detector) = detector.as_mut() {
                let started = Instant::now();
                let face = match detector.detect_for_video(frame, timestamp_ms) {
                    Ok(output) => output.faces.into_iter().next(),
                    Err(e) => {
                        trace!("Detector failed at {timestamp_ms:.1}ms: {e}");
                        None
                    }
                };
                let processing_time_ms = started.elapsed().as_secs_f64() * 1000.0;

                let raw = face.and_then(|f| raw_detection(f, processing_time_ms));
                let stabilized = if state.config.stabilize {
                    stabilizer.stabilize_at(raw.as_ref(), now)
                } else {
                    None
                };

                if let Some(raw) = raw {
                    let (width, height) = state.surface.dimensions();
                    let (w, h) = (f64::from(width), f64::from(height));
                    let bbox = stabilized.as_ref().map_or(raw.bounding_box, |s| s.bounding_box);
                    let angles =
                        estimate_face_angles(&raw.landmarks, landmark_indices, (w, h)).ok();

                    let result = FaceTrackingResult {
                        bounding_box: bbox.scaled(w, h),
                        confidence: raw.confidence,
                        timestamp_ms,
                        processing_time_ms: raw.processing_time_ms,
                        angles,
                        stabilized,
                        landmarks: raw.landmarks,
                    };
                    callbacks.face_detected(&result);
                    state.last_result = Some(result);
                }
            }
        }

        if state.config.enable_ar_effects && !effects.is_empty() {
            if let Some(last) = &state.last_result {
                let mut pixels = state.surface.read_pixels()?;
                apply_effects(&mut pixels, &last.bounding_box, effects.as_slice());
                state.surface.write_pixels(&pixels)?;
            }
        }

        if let Some(fps) = state.fps.tick(now) {
            debug!("{fps:.0} fps");
            callbacks.fps_update(fps);
        }

        Ok(())
    }

    pub fn add_effect(&mut self, effect: EffectConfig) {
        self.effects.add(effect);
    }

    pub fn remove_effect(&mut self, effect_type: EffectType) {
        self.effects.remove(effect_type);
    }

    /// Set an effect's intensity, clamped to [0, 1]
    pub fn update_effect_intensity(&mut self, effect_type: EffectType, intensity: f64) {
        if !self.effects.update_intensity(effect_type, intensity) {
            debug!("No active {effect_type} effect to update");
        }
    }

    pub fn clear_effects(&mut self) {
        self.effects.clear();
    }

    #[must_use]
    pub fn effects(&self) -> &EffectList {
        &self.effects
    }

    /// Encode the current surface as PNG; `None` when not running or on failure
    #[must_use]
    pub fn capture_frame(&self) -> Option<Vec<u8>> {
        let state = self.state.as_ref()?;
        let encoded = state.surface.read_pixels().and_then(|pixels| {
            let mut bytes = Vec::new();
            DynamicImage::ImageRgba8(pixels)
                .write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)?;
            Ok(bytes)
        });

        match encoded {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!("Failed to capture frame: {e}");
                None
            }
        }
    }

    #[must_use]
    pub fn last_result(&self) -> Option<&FaceTrackingResult> {
        self.state.as_ref().and_then(|s| s.last_result.as_ref())
    }

    /// Frames drawn since the session started
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.state.as_ref().map_or(0, |s| s.frame_count)
    }

    /// Last reported frame rate
    #[must_use]
    pub fn current_fps(&self) -> f64 {
        self.state.as_ref().map_or(0.0, |s| s.fps.fps())
    }

    #[must_use]
    pub fn stabilizer(&self) -> &TrackingStabilizer {
        &self.stabilizer
    }

    pub fn stabilizer_mut(&mut self) -> &mut TrackingStabilizer {
        &mut self.stabilizer
    }

    /// Whether the capture device is currently held
    #[must_use]
    pub fn is_capture_active(&self) -> bool {
        self.source.is_active()
    }
}

impl Drop for PreviewSession {
    fn drop(&mut self) {
        self.stop();
    }
}

fn raw_detection(face: FaceLandmarks, processing_time_ms: f64) -> Option<RawDetectionResult> {
    let bounding_box = bounding_box_from_landmarks(&face.landmarks)?;
    let confidence = face.confidence.unwrap_or(DEFAULT_DETECTION_CONFIDENCE).clamp(0.0, 1.0);
    Some(RawDetectionResult {
        landmarks: face.landmarks,
        bounding_box,
        confidence,
        processing_time_ms,
    })
}
