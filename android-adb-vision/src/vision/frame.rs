//! Captured device frames

use super::region::Region;
use crate::adb::ImageCapture;
use crate::error::{VisionError, VisionResult};
use image::{GrayImage, RgbaImage};
use std::path::Path;

/// One captured snapshot of the device display. Immutable once built.
#[derive(Debug, Clone)]
pub struct Frame {
    image: RgbaImage,
    region: Region,
    index: u64,
    capture_ms: u128,
}

impl Frame {
    /// Decode a transport capture into a frame covering the full screen
    pub fn from_capture(capture: &ImageCapture) -> VisionResult<Self> {
        let decoded = image::load_from_memory(&capture.bytes).map_err(|e| VisionError::BadFrame {
            description: format!(
                "capture #{} ({} bytes) could not be decoded: {e}",
                capture.index,
                capture.bytes.len()
            ),
        })?;
        let mut frame = Self::from_image(decoded.to_rgba8())?;
        frame.index = capture.index;
        frame.capture_ms = capture.duration_ms;
        Ok(frame)
    }

    pub fn from_image(image: RgbaImage) -> VisionResult<Self> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(VisionError::BadFrame {
                description: format!("empty {width}x{height} frame"),
            });
        }
        Ok(Self {
            image,
            region: Region::full_screen(width, height),
            index: 0,
            capture_ms: 0,
        })
    }

    /// The screen area this frame covers
    pub fn region(&self) -> Region {
        self.region
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn width(&self) -> u32 {
        self.region.width
    }

    pub fn height(&self) -> u32 {
        self.region.height
    }

    /// Sequence number reported by the transport
    pub fn index(&self) -> u64 {
        self.index
    }

    /// How long the transport took to deliver the bitmap
    pub fn capture_ms(&self) -> u128 {
        self.capture_ms
    }

    /// Grayscale copy used for matching
    pub fn to_luma(&self) -> GrayImage {
        image::imageops::grayscale(&self.image)
    }

    pub fn save_png(&self, path: impl AsRef<Path>) -> VisionResult<()> {
        let path = path.as_ref();
        self.image
            .save_with_format(path, image::ImageFormat::Png)
            .map_err(|source| VisionError::ImageWrite {
                path: path.to_path_buf(),
                source,
            })
    }
}
