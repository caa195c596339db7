//! Capture-source and output-surface capabilities.
//!
//! The session only needs a source that yields decoded RGBA frames with
//! their native size and readiness, and a raster sink it can draw into and
//! read pixels back from. In-memory implementations are provided for
//! headless hosts.

use crate::{config::VideoConstraints, Error, Result};
use image::{imageops, RgbaImage};
use log::{debug, info};
use std::path::Path;

/// Live video frame source
pub trait FrameSource {
    /// Acquire the capture device honoring `constraints`
    fn open(&mut self, constraints: &VideoConstraints) -> Result<()>;

    /// Whether enough frame data is decoded to run detection
    fn is_ready(&self) -> bool;

    /// Native `(width, height)` of the stream
    fn dimensions(&self) -> (u32, u32);

    /// The current decoded frame
    fn current_frame(&mut self) -> Result<&RgbaImage>;

    /// Stop every track and drop the device binding; repeated calls are no-ops
    fn release(&mut self);

    /// Whether the capture device is currently held
    fn is_active(&self) -> bool;
}

/// Raster output surface
pub trait FrameSink {
    /// Size the surface in pixels
    fn resize(&mut self, width: u32, height: u32) -> Result<()>;

    fn dimensions(&self) -> (u32, u32);

    /// Draw a frame scaled to the surface
    fn draw_frame(&mut self, frame: &RgbaImage) -> Result<()>;

    /// Copy of the surface's pixel buffer
    fn read_pixels(&self) -> Result<RgbaImage>;

    /// Replace the surface's pixel buffer; dimensions must match
    fn write_pixels(&mut self, pixels: &RgbaImage) -> Result<()>;

    /// Clear the surface to transparent black
    fn clear(&mut self);
}

/// In-memory RGBA output surface
#[derive(Debug, Clone, Default)]
pub struct ImageSurface {
    buffer: RgbaImage,
}

impl ImageSurface {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Borrow the current pixels
    #[must_use]
    pub fn pixels(&self) -> &RgbaImage {
        &self.buffer
    }
}

impl FrameSink for ImageSurface {
    fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(Error::SurfaceUnavailable(format!(
                "Cannot size surface to {width}x{height}"
            )));
        }
        self.buffer = RgbaImage::new(width, height);
        Ok(())
    }

    fn dimensions(&self) -> (u32, u32) {
        self.buffer.dimensions()
    }

    fn draw_frame(&mut self, frame: &RgbaImage) -> Result<()> {
        let (width, height) = self.buffer.dimensions();
        if width == 0 || height == 0 {
            return Err(Error::SurfaceUnavailable("Surface has not been sized".to_string()));
        }

        if frame.dimensions() == (width, height) {
            self.buffer.copy_from_slice(frame.as_raw());
        } else {
            self.buffer = imageops::resize(frame, width, height, imageops::FilterType::Triangle);
        }
        Ok(())
    }

    fn read_pixels(&self) -> Result<RgbaImage> {
        Ok(self.buffer.clone())
    }

    fn write_pixels(&mut self, pixels: &RgbaImage) -> Result<()> {
        if pixels.dimensions() != self.buffer.dimensions() {
            return Err(Error::SurfaceUnavailable(format!(
                "Pixel buffer is {:?}, surface is {:?}",
                pixels.dimensions(),
                self.buffer.dimensions()
            )));
        }
        self.buffer.copy_from_slice(pixels.as_raw());
        Ok(())
    }

    fn clear(&mut self) {
        for px in self.buffer.pixels_mut() {
            px.0 = [0, 0, 0, 0];
        }
    }
}

/// Frame source that serves a single still image as a live stream
pub struct StillImageSource {
    image: RgbaImage,
    frame: Option<RgbaImage>,
}

impl StillImageSource {
    #[must_use]
    pub fn new(image: RgbaImage) -> Self {
        Self { image, frame: None }
    }

    /// Decode an image file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading still frame from {}", path.display());
        Ok(Self::new(image::open(path)?.to_rgba8()))
    }
}

impl FrameSource for StillImageSource {
    fn open(&mut self, constraints: &VideoConstraints) -> Result<()> {
        let (width, height) = self.image.dimensions();
        if width == 0 || height == 0 {
            return Err(Error::CaptureUnavailable("Source image is empty".to_string()));
        }

        // Fit within the maximum resolution, keeping the aspect ratio
        let scale = (f64::from(constraints.max_width) / f64::from(width))
            .min(f64::from(constraints.max_height) / f64::from(height))
            .min(1.0);

        let frame = if scale < 1.0 {
            let (w, h) = fit_dimensions(width, height, scale);
            debug!("Scaling still frame from {width}x{height} to {w}x{h}");
            imageops::resize(&self.image, w, h, imageops::FilterType::Triangle)
        } else {
            self.image.clone()
        };

        self.frame = Some(frame);
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.frame.is_some()
    }

    fn dimensions(&self) -> (u32, u32) {
        self.frame.as_ref().map_or((0, 0), RgbaImage::dimensions)
    }

    fn current_frame(&mut self) -> Result<&RgbaImage> {
        self.frame
            .as_ref()
            .ok_or_else(|| Error::CaptureUnavailable("Source is not open".to_string()))
    }

    fn release(&mut self) {
        self.frame = None;
    }

    fn is_active(&self) -> bool {
        self.frame.is_some()
    }
}

fn fit_dimensions(width: u32, height: u32, scale: f64) -> (u32, u32) {
    use crate::utils::safe_cast::f64_to_u32_clamp;
    (
        f64_to_u32_clamp((f64::from(width) * scale).round(), 1, width),
        f64_to_u32_clamp((f64::from(height) * scale).round(), 1, height),
    )
}
