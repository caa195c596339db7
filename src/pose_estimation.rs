//! Coarse face-angle estimation from dense face-mesh landmarks.
//!
//! Angles come from simple landmark geometry rather than a full `PnP`
//! solve: eye-corner line for roll, nose offset against the eye midpoint
//! for yaw and nose height between forehead and chin for pitch. The
//! landmark indices are tied to the 468-point mesh topology and can be
//! overridden for other detectors.

use crate::{detection::Landmark, Error, Result};
use nalgebra::Vector2;

/// Nose height (forehead = 0, chin = 1) of a level, frontal face
const NEUTRAL_PITCH_RATIO: f64 = 0.5;

/// Landmark indices the estimator reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LandmarkIndices {
    pub left_eye_outer: usize,
    pub right_eye_outer: usize,
    pub nose_tip: usize,
    pub chin: usize,
    pub forehead: usize,
}

impl Default for LandmarkIndices {
    fn default() -> Self {
        Self {
            left_eye_outer: 33,
            right_eye_outer: 263,
            nose_tip: 1,
            chin: 152,
            forehead: 10,
        }
    }
}

impl LandmarkIndices {
    fn max_index(&self) -> usize {
        [self.left_eye_outer, self.right_eye_outer, self.nose_tip, self.chin, self.forehead]
            .into_iter()
            .max()
            .unwrap_or(0)
    }
}

/// Head orientation in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FaceAngles {
    /// Positive when the face turns towards the image's right edge
    pub yaw: f64,
    /// Positive when the face tilts up
    pub pitch: f64,
    /// Angle of the eye line against the horizontal
    pub roll: f64,
}

/// Estimate yaw, pitch and roll from one face's landmarks
///
/// `scale` maps normalized coordinates to pixel space so the geometry is
/// not distorted by the frame's aspect ratio; pass `(1.0, 1.0)` for
/// landmarks that are already in pixels.
///
/// # Errors
///
/// Returns an error if the landmark set does not contain every index in
/// `indices`, or if the eye corners or forehead/chin coincide.
pub fn estimate_face_angles(
    landmarks: &[Landmark],
    indices: &LandmarkIndices,
    scale: (f64, f64),
) -> Result<FaceAngles> {
    if landmarks.len() <= indices.max_index() {
        return Err(Error::InvalidInput(format!(
            "Face-angle estimation needs at least {} landmarks, got {}",
            indices.max_index() + 1,
            landmarks.len()
        )));
    }

    let point = |i: usize| Vector2::new(landmarks[i].x * scale.0, landmarks[i].y * scale.1);

    let left_eye = point(indices.left_eye_outer);
    let right_eye = point(indices.right_eye_outer);
    let nose = point(indices.nose_tip);
    let chin = point(indices.chin);
    let forehead = point(indices.forehead);

    let eye_line = right_eye - left_eye;
    let eye_distance = eye_line.norm();
    let face_height = chin.y - forehead.y;
    if eye_distance <= f64::EPSILON || face_height.abs() <= f64::EPSILON {
        return Err(Error::InvalidInput("Degenerate face geometry".to_string()));
    }

    let roll = eye_line.y.atan2(eye_line.x).to_degrees();

    let eye_mid = (left_eye + right_eye) * 0.5;
    let yaw_ratio = ((nose.x - eye_mid.x) / (eye_distance * 0.5)).clamp(-1.0, 1.0);
    let yaw = yaw_ratio.asin().to_degrees();

    let nose_ratio = (nose.y - forehead.y) / face_height;
    let pitch_ratio = ((NEUTRAL_PITCH_RATIO - nose_ratio) * 2.0).clamp(-1.0, 1.0);
    let pitch = pitch_ratio.asin().to_degrees();

    Ok(FaceAngles { yaw, pitch, roll })
}
