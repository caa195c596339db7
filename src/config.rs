//! Configuration management for the live AR preview pipeline

use crate::{
    constants::{DEFAULT_MAX_CONSECUTIVE_FAILURES, DEFAULT_TARGET_FPS},
    effects::EffectConfig,
    stabilizer::SmoothingStrength,
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Tracking stabilizer configuration
    pub stabilizer: StabilizerConfig,

    /// Preview session configuration
    pub session: SessionConfig,

    /// Effects active when the session starts, in application order
    pub effects: Vec<EffectConfig>,
}

/// Tracking stabilizer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilizerConfig {
    /// Smoothing preset (history depth and confidence alpha)
    pub smoothing: SmoothingStrength,

    /// Consecutive missed detections tolerated before tracking state is reset
    pub max_consecutive_failures: u32,
}

/// Camera facing mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    #[default]
    User,
    Environment,
}

/// Quality tier of the preview
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    Low,
    #[default]
    Medium,
    High,
}

/// Capture constraints handed to the frame source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConstraints {
    pub ideal_width: u32,
    pub max_width: u32,
    pub ideal_height: u32,
    pub max_height: u32,
    pub ideal_frame_rate: u32,
    pub max_frame_rate: u32,
    pub facing_mode: FacingMode,
}

/// Preview session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Explicit capture constraints; when absent they follow `quality`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video: Option<VideoConstraints>,

    /// Run the landmark detector every tick
    pub enable_face_tracking: bool,

    /// Composite active effects onto the surface
    pub enable_ar_effects: bool,

    /// Tick rate for hosts without a display-refresh callback
    pub target_fps: u32,

    /// Quality tier
    pub quality: QualityTier,

    /// Feed detections through the tracking stabilizer
    pub stabilize: bool,
}

impl Default for StabilizerConfig {
    fn default() -> Self {
        Self {
            smoothing: SmoothingStrength::Medium,
            max_consecutive_failures: DEFAULT_MAX_CONSECUTIVE_FAILURES,
        }
    }
}

impl VideoConstraints {
    /// Constraint preset for a quality tier
    #[must_use]
    pub fn for_quality(tier: QualityTier) -> Self {
        let (ideal, max) = match tier {
            QualityTier::Low => ((640, 480, 24), (1280, 720, 30)),
            QualityTier::Medium => ((1280, 720, 30), (1920, 1080, 30)),
            QualityTier::High => ((1920, 1080, 30), (1920, 1080, 60)),
        };
        Self {
            ideal_width: ideal.0,
            max_width: max.0,
            ideal_height: ideal.1,
            max_height: max.1,
            ideal_frame_rate: ideal.2,
            max_frame_rate: max.2,
            facing_mode: FacingMode::User,
        }
    }
}

impl Default for VideoConstraints {
    fn default() -> Self {
        Self::for_quality(QualityTier::Medium)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            video: None,
            enable_face_tracking: true,
            enable_ar_effects: true,
            target_fps: DEFAULT_TARGET_FPS,
            quality: QualityTier::Medium,
            stabilize: true,
        }
    }
}

impl SessionConfig {
    /// Constraints handed to the capture source
    #[must_use]
    pub fn video_constraints(&self) -> VideoConstraints {
        self.video
            .clone()
            .unwrap_or_else(|| VideoConstraints::for_quality(self.quality))
    }

    /// Validate session settings
    pub fn validate(&self) -> Result<()> {
        if self.target_fps == 0 {
            return Err(Error::ConfigError("Target FPS must be greater than 0".to_string()));
        }

        let video = self.video_constraints();
        let pairs = [
            ("width", video.ideal_width, video.max_width),
            ("height", video.ideal_height, video.max_height),
            ("frame rate", video.ideal_frame_rate, video.max_frame_rate),
        ];
        for (name, ideal, max) in pairs {
            if ideal == 0 || max == 0 {
                return Err(Error::ConfigError(format!("Video {name} must be greater than 0")));
            }
            if ideal > max {
                return Err(Error::ConfigError(format!(
                    "Ideal video {name} ({ideal}) exceeds maximum ({max})"
                )));
            }
        }

        Ok(())
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;

        serde_yaml::from_str(&content)
            .map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))
    }

    /// Save configuration to a YAML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.stabilizer.max_consecutive_failures == 0 {
            return Err(Error::ConfigError(
                "Failure budget must be greater than 0".to_string(),
            ));
        }

        self.session.validate()?;

        for effect in &self.effects {
            if !(0.0..=1.0).contains(&effect.intensity) {
                return Err(Error::ConfigError(format!(
                    "Intensity of {} must be between 0.0 and 1.0",
                    effect.effect_type
                )));
            }
        }

        Ok(())
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Live AR Preview Configuration

# Tracking stabilizer
stabilizer:
  smoothing: medium            # low | medium | high
  max_consecutive_failures: 10

# Preview session
session:
  quality: medium              # low | medium | high, picks the capture preset
  # Explicit capture constraints override the quality preset
  # video:
  #   ideal_width: 1280
  #   max_width: 1920
  #   ideal_height: 720
  #   max_height: 1080
  #   ideal_frame_rate: 30
  #   max_frame_rate: 30
  #   facing_mode: user        # user | environment
  enable_face_tracking: true
  enable_ar_effects: true
  target_fps: 30
  stabilize: true

# Effects applied in order
effects:
  - type: smoothing
    intensity: 0.5
  - type: botoxSim
    intensity: 0.3
    target_areas: [forehead]
"#;
