//! Detection data model and the landmark-detector seam.
//!
//! The face-landmark model itself is an external collaborator. This module
//! defines what it hands back per frame and the geometry derived from it.

use crate::{Error, Result};
use image::RgbaImage;
use nalgebra::Vector4;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A face landmark normalized to the frame dimensions
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
}

impl Landmark {
    #[must_use]
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Axis-aligned face rectangle, normalized or pixel-space depending on the caller
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x_min: f64,
    pub y_min: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    #[must_use]
    pub fn new(x_min: f64, y_min: f64, width: f64, height: f64) -> Self {
        Self { x_min, y_min, width, height }
    }

    /// The box as a 4-D vector `(x_min, y_min, width, height)`
    #[must_use]
    pub fn as_vector(&self) -> Vector4<f64> {
        Vector4::new(self.x_min, self.y_min, self.width, self.height)
    }

    /// Euclidean distance between two boxes in `(x_min, y_min, width, height)` space
    #[must_use]
    pub fn distance(&self, other: &Self) -> f64 {
        (self.as_vector() - other.as_vector()).norm()
    }

    /// Scale a normalized box into a `width x height` pixel space
    #[must_use]
    pub fn scaled(&self, width: f64, height: f64) -> Self {
        Self {
            x_min: self.x_min * width,
            y_min: self.y_min * height,
            width: self.width * width,
            height: self.height * height,
        }
    }
}

/// Integer pixel rectangle; the compositor clips it to the buffer it draws on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Raw per-frame output of the detector for one face
#[derive(Debug, Clone, PartialEq)]
pub struct RawDetectionResult {
    pub landmarks: Vec<Landmark>,
    pub bounding_box: BoundingBox,
    /// Detection confidence in [0, 1]
    pub confidence: f64,
    pub processing_time_ms: f64,
}

/// Landmarks of one detected face as returned by a detector
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FaceLandmarks {
    pub landmarks: Vec<Landmark>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

/// Detector output for one frame
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DetectionOutput {
    #[serde(default)]
    pub faces: Vec<FaceLandmarks>,
}

/// Face-landmark detector collaborator
///
/// Errors returned from [`LandmarkDetector::detect_for_video`] are treated as
/// per-frame soft failures by the session; errors from
/// [`LandmarkDetector::initialize`] are fatal.
pub trait LandmarkDetector {
    /// Prepare the detector (load the model, warm up)
    fn initialize(&mut self) -> Result<()> {
        Ok(())
    }

    /// Detect faces in `frame` captured at `timestamp_ms`
    fn detect_for_video(&mut self, frame: &RgbaImage, timestamp_ms: f64) -> Result<DetectionOutput>;
}

/// Bounding box spanning the min/max extent of `landmarks`
///
/// Returns `None` for an empty landmark set.
#[must_use]
pub fn bounding_box_from_landmarks(landmarks: &[Landmark]) -> Option<BoundingBox> {
    let first = landmarks.first()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);

    for lm in &landmarks[1..] {
        min_x = min_x.min(lm.x);
        min_y = min_y.min(lm.y);
        max_x = max_x.max(lm.x);
        max_y = max_y.max(lm.y);
    }

    Some(BoundingBox::new(min_x, min_y, max_x - min_x, max_y - min_y))
}

/// Detector that replays recorded landmark sets, cycling through them
pub struct ReplayDetector {
    frames: Vec<DetectionOutput>,
    cursor: usize,
}

impl ReplayDetector {
    #[must_use]
    pub fn new(frames: Vec<DetectionOutput>) -> Self {
        Self { frames, cursor: 0 }
    }

    /// Load recorded detections from a YAML list of `{ faces: [...] }` entries
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let frames: Vec<DetectionOutput> = serde_yaml::from_str(&content)?;
        Ok(Self::new(frames))
    }
}

impl LandmarkDetector for ReplayDetector {
    fn initialize(&mut self) -> Result<()> {
        if self.frames.is_empty() {
            return Err(Error::DetectorInit("replay source contains no frames".to_string()));
        }
        self.cursor = 0;
        Ok(())
    }

    fn detect_for_video(
        &mut self,
        _frame: &RgbaImage,
        _timestamp_ms: f64,
    ) -> Result<DetectionOutput> {
        let output = self
            .frames
            .get(self.cursor)
            .cloned()
            .ok_or_else(|| Error::Detection("replay source exhausted".to_string()))?;
        self.cursor = (self.cursor + 1) % self.frames.len();
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounding_box_from_landmarks() {
        let landmarks = vec![
            Landmark::new(0.2, 0.3, 0.0),
            Landmark::new(0.6, 0.1, 0.0),
            Landmark::new(0.4, 0.7, 0.1),
        ];
        let bbox = bounding_box_from_landmarks(&landmarks).unwrap();
        assert!((bbox.x_min - 0.2).abs() < 1e-12);
        assert!((bbox.y_min - 0.1).abs() < 1e-12);
        assert!((bbox.width - 0.4).abs() < 1e-12);
        assert!((bbox.height - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_bounding_box_empty() {
        assert!(bounding_box_from_landmarks(&[]).is_none());
    }

    #[test]
    fn test_box_distance() {
        let a = BoundingBox::new(0.0, 0.0, 0.5, 0.5);
        let b = BoundingBox::new(0.3, 0.4, 0.5, 0.5);
        assert!((a.distance(&b) - 0.5).abs() < 1e-12);
        assert_eq!(a.distance(&a), 0.0);
    }

    #[test]
    fn test_box_scaled() {
        let bbox = BoundingBox::new(0.25, 0.5, 0.5, 0.25).scaled(640.0, 480.0);
        assert_eq!(bbox, BoundingBox::new(160.0, 240.0, 320.0, 120.0));
    }

    #[test]
    fn test_replay_detector_cycles() {
        let face = FaceLandmarks {
            landmarks: vec![Landmark::new(0.5, 0.5, 0.0)],
            confidence: Some(0.8),
        };
        let frames = vec![
            DetectionOutput { faces: vec![face] },
            DetectionOutput::default(),
        ];
        let mut detector = ReplayDetector::new(frames);
        detector.initialize().unwrap();

        let frame = RgbaImage::new(4, 4);
        assert_eq!(detector.detect_for_video(&frame, 0.0).unwrap().faces.len(), 1);
        assert!(detector.detect_for_video(&frame, 16.0).unwrap().faces.is_empty());
        assert_eq!(detector.detect_for_video(&frame, 32.0).unwrap().faces.len(), 1);
    }

    #[test]
    fn test_replay_detector_empty_fails_init() {
        let mut detector = ReplayDetector::new(Vec::new());
        assert!(matches!(detector.initialize(), Err(Error::DetectorInit(_))));
    }

    #[test]
    fn test_detection_output_yaml() {
        let yaml = concat!(
            "- faces:\n",
            "    - landmarks:\n",
            "        - { x: 0.1, y: 0.2 }\n",
            "        - { x: 0.3, y: 0.4, z: 0.01 }\n",
            "- faces: []\n",
        );
        let frames: Vec<DetectionOutput> = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].faces[0].landmarks.len(), 2);
        assert_eq!(frames[0].faces[0].landmarks[0].z, 0.0);
        assert_eq!(frames[0].faces[0].confidence, None);
    }
}
