//! Error types for the live AR preview library.

use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// File I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decoding, encoding or buffer operation failed
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// YAML (de)serialization failed
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The capture device could not be acquired
    #[error("Capture device unavailable: {0}")]
    CaptureUnavailable(String),

    /// The output surface could not be prepared or accessed
    #[error("Output surface unavailable: {0}")]
    SurfaceUnavailable(String),

    /// The landmark detector failed to initialize
    #[error("Detector initialization error: {0}")]
    DetectorInit(String),

    /// A single detection call failed
    #[error("Detection error: {0}")]
    Detection(String),

    /// Invalid input parameters provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Session lifecycle or render loop error
    #[error("Session error: {0}")]
    SessionError(String),
}

/// Convenience type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::DetectorInit("model missing".to_string());
        assert_eq!(err.to_string(), "Detector initialization error: model missing");

        let err = Error::CaptureUnavailable("permission denied".to_string());
        assert!(err.to_string().contains("permission denied"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
