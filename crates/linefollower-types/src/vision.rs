use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::{LineFollowerError, Result};

/// Integer pixel coordinate in image space (x grows right, y grows down).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelPoint {
    pub x: i32,
    pub y: i32,
}

impl PixelPoint {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// One captured camera image.
///
/// The buffer is row-major and tightly packed: RGB for three channels, RGBA
/// for four. A frame is never mutated after capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    channels: u8,
    data: Vec<u8>,
}

impl Frame {
    pub fn new(width: u32, height: u32, channels: u8, data: Vec<u8>) -> Result<Self> {
        if !matches!(channels, 3 | 4) {
            return Err(LineFollowerError::Vision(format!(
                "unsupported channel count {channels}; expected 3 or 4"
            )));
        }
        let expected = width as usize * height as usize * channels as usize;
        if data.len() != expected {
            return Err(LineFollowerError::Vision(format!(
                "frame buffer holds {} bytes, expected {expected} for {width}x{height}x{channels}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    pub fn from_rgb(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        Self::new(width, height, 3, data)
    }

    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        Self::new(width, height, 4, data)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// RGB triple at `(x, y)`; the alpha channel of RGBA frames is dropped.
    pub fn rgb_at(&self, x: u32, y: u32) -> [u8; 3] {
        let stride = self.channels as usize;
        let offset = (y as usize * self.width as usize + x as usize) * stride;
        [
            self.data[offset],
            self.data[offset + 1],
            self.data[offset + 2],
        ]
    }
}

/// Geometry of the line selected in the search region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineDetection {
    /// Center of the minimum-area rectangle, truncated toward zero.
    pub centroid: PixelPoint,
    /// Rectangle corners, ordered around the rectangle.
    pub bounding_shape: [PixelPoint; 4],
    /// Foreground pixel count of the selected component.
    pub area: usize,
}

/// Output of the frame processor for a single frame.
#[derive(Debug, Clone)]
pub struct DetectionResult {
    /// Full-frame inverted threshold image, present whether or not a line was found.
    pub mask: GrayImage,
    pub line: Option<LineDetection>,
}

impl DetectionResult {
    pub fn found(&self) -> bool {
        self.line.is_some()
    }

    pub fn centroid(&self) -> Option<PixelPoint> {
        self.line.as_ref().map(|line| line.centroid)
    }
}
