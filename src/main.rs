//! Headless live AR preview: replays recorded landmarks over a still frame,
//! runs the stabilized tracking and effect pipeline and saves the result.

use anyhow::{Context, Result};
use clap::Parser;
use live_ar_preview::{
    config::{Config, EXAMPLE_CONFIG},
    detection::ReplayDetector,
    effects::EffectConfig,
    session::{PreviewSession, SessionCallbacks},
    stabilizer::{SmoothingStrength, TrackingStabilizer},
    surface::{ImageSurface, StillImageSource},
};
use log::{debug, info, warn};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Still image served as the live frame
    #[arg(short, long, required_unless_present = "print_example_config")]
    image: Option<PathBuf>,

    /// Recorded detector output (YAML list of frames)
    #[arg(short, long, required_unless_present = "print_example_config")]
    landmarks: Option<PathBuf>,

    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    config: Option<PathBuf>,

    /// Effect to apply, as type:intensity (repeatable)
    #[arg(short, long = "effect")]
    effects: Vec<EffectConfig>,

    /// Number of render ticks to run
    #[arg(short = 'n', long, default_value = "60")]
    frames: u64,

    /// Where to save the final composited frame (PNG)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Smoothing strength override (low, medium, high)
    #[arg(short, long)]
    smoothing: Option<SmoothingStrength>,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,

    /// Print an example configuration file and exit
    #[arg(long)]
    print_example_config: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    if args.print_example_config {
        print!("{EXAMPLE_CONFIG}");
        return Ok(());
    }

    info!("Live AR Preview");

    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            match Config::from_file(path) {
                Ok(cfg) => cfg,
                Err(e) => {
                    warn!("Failed to load config file: {e}. Using defaults.");
                    Config::default()
                }
            }
        }
        None => Config::default(),
    };
    if let Some(smoothing) = args.smoothing {
        config.stabilizer.smoothing = smoothing;
    }
    config.effects.extend(args.effects);
    config.validate().context("Invalid configuration")?;

    let (Some(image), Some(landmarks)) = (&args.image, &args.landmarks) else {
        anyhow::bail!("--image and --landmarks are required");
    };
    let source = StillImageSource::from_file(image)
        .with_context(|| format!("Failed to load {}", image.display()))?;
    let detector = ReplayDetector::from_file(landmarks)
        .with_context(|| format!("Failed to load {}", landmarks.display()))?;

    let callbacks = SessionCallbacks::new()
        .on_face_detected(|result| {
            debug!(
                "Face at ({:.0}, {:.0}) {:.0}x{:.0}, confidence {:.2}",
                result.bounding_box.x_min,
                result.bounding_box.y_min,
                result.bounding_box.width,
                result.bounding_box.height,
                result.confidence
            );
        })
        .on_fps_update(|fps| info!("{fps:.0} fps"))
        .on_error(|e| warn!("Preview error: {e}"));

    let stabilizer = TrackingStabilizer::new(
        config.stabilizer.smoothing,
        config.stabilizer.max_consecutive_failures,
    );
    let mut session = PreviewSession::new(Box::new(source), Some(Box::new(detector)))
        .with_callbacks(callbacks)
        .with_stabilizer(stabilizer);
    for effect in config.effects {
        session.add_effect(effect);
    }

    session
        .start(Box::new(ImageSurface::new()), config.session)
        .context("Failed to start preview session")?;
    session.run(Some(args.frames));

    if let Some(result) = session.last_result().and_then(|r| r.stabilized.as_ref()) {
        info!(
            "Tracking {} (stability {:.2}, motion {})",
            result.tracking_quality, result.stability_score, result.motion_level
        );
    }
    let metrics = session.stabilizer().metrics();
    info!(
        "Processed {} frames, success rate {:.0}%",
        metrics.processed_frames,
        metrics.success_rate * 100.0
    );
    for recommendation in session.stabilizer().quality_recommendations().recommendations {
        info!("Recommendation: {recommendation}");
    }

    if let Some(output) = &args.output {
        let png = session.capture_frame().context("Failed to capture frame")?;
        std::fs::write(output, png)
            .with_context(|| format!("Failed to write {}", output.display()))?;
        info!("Saved frame to {}", output.display());
    }

    session.stop();
    Ok(())
}
