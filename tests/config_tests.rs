//! Configuration file loading tests

use live_ar_preview::{
    config::{Config, QualityTier, SessionConfig, VideoConstraints},
    effects::{EffectConfig, EffectType},
    stabilizer::SmoothingStrength,
    Error,
};
use std::path::PathBuf;

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("live-ar-preview-{}-{name}", std::process::id()))
}

#[test]
fn test_config_file_round_trip() {
    let mut config = Config::default();
    config.stabilizer.smoothing = SmoothingStrength::High;
    config.session.quality = QualityTier::Low;
    config.effects.push(EffectConfig::new(EffectType::FillerSim, 0.25));

    let path = temp_path("round-trip.yaml");
    config.to_file(&path).unwrap();
    let loaded = Config::from_file(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(loaded.stabilizer.smoothing, SmoothingStrength::High);
    assert_eq!(loaded.session.quality, QualityTier::Low);
    assert!(loaded.session.video.is_none());
    let video = loaded.session.video_constraints();
    assert_eq!(video.ideal_width, 640);
    assert_eq!(video.max_frame_rate, 30);
    assert_eq!(loaded.effects, config.effects);
    assert!(loaded.validate().is_ok());
}

#[test]
fn test_missing_config_file_is_io_error() {
    let err = Config::from_file(temp_path("does-not-exist.yaml")).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}

#[test]
fn test_malformed_config_is_config_error() {
    let path = temp_path("malformed.yaml");
    std::fs::write(&path, "session:\n  target_fps: fast\n").unwrap();
    let err = Config::from_file(&path).unwrap_err();
    std::fs::remove_file(&path).ok();

    assert!(matches!(err, Error::ConfigError(_)));
}

#[test]
fn test_effect_names_in_yaml() {
    let yaml = concat!(
        "effects:\n",
        "  - type: laserSim\n    intensity: 0.1\n",
        "  - type: whitening\n    intensity: 1.0\n    target_areas: [cheeks, chin]\n",
    );
    let config: Config = serde_yaml::from_str(yaml).unwrap();

    assert_eq!(config.effects[0].effect_type, EffectType::LaserSim);
    let areas = config.effects[1].target_areas.as_ref().unwrap();
    assert_eq!(areas.len(), 2);
}

#[test]
fn test_quality_presets() {
    let high = VideoConstraints::for_quality(QualityTier::High);
    assert_eq!((high.ideal_width, high.ideal_height), (1920, 1080));
    assert_eq!(high.max_frame_rate, 60);

    let session = SessionConfig::default();
    assert_eq!(session.video_constraints(), VideoConstraints::for_quality(QualityTier::Medium));
    assert_eq!(session.target_fps, 30);
    assert!(session.stabilize);
}

#[test]
fn test_explicit_video_survives_round_trip() {
    let mut config = Config::default();
    config.session.quality = QualityTier::High;
    config.session.video = Some(VideoConstraints::for_quality(QualityTier::Low));

    let path = temp_path("explicit-video.yaml");
    config.to_file(&path).unwrap();
    let loaded = Config::from_file(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(loaded.session.video_constraints(), VideoConstraints::for_quality(QualityTier::Low));
}
