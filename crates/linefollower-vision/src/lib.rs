//! Line detection on camera frames.
//!
//! [`FrameProcessor::process`] turns a frame into a [`DetectionResult`]:
//! luminance, inverted fixed threshold, external connected components in the
//! forward search region, largest component, minimum-area rectangle. It has
//! no side effects and is safe to call from any thread.

mod components;
pub mod geometry;
pub mod overlay;

use image::{GrayImage, Luma};
use linefollower_types::{
    config::VisionConfig,
    vision::{DetectionResult, Frame, LineDetection},
};
use tracing::trace;

use crate::{
    components::{external_components, Component},
    geometry::{convex_hull, min_area_rect},
};

pub use overlay::{frame_to_rgb, render_debug_frame, OverlayContext};

/// Mask value for pixels at or below the threshold.
pub const FOREGROUND: u8 = 255;
pub const BACKGROUND: u8 = 0;

/// Stateless line detector configured with the threshold and search region.
#[derive(Debug, Clone, Copy)]
pub struct FrameProcessor {
    threshold_value: u8,
    search_height_ratio: u32,
}

impl FrameProcessor {
    pub fn new(config: &VisionConfig) -> Self {
        Self {
            threshold_value: config.threshold_value,
            search_height_ratio: config.search_height_ratio.max(1),
        }
    }

    pub fn threshold_value(&self) -> u8 {
        self.threshold_value
    }

    /// Exclusive bottom row of the search region for a frame of `height` rows.
    pub fn search_bottom(&self, height: u32) -> u32 {
        height / self.search_height_ratio
    }

    pub fn process(&self, frame: &Frame) -> DetectionResult {
        let mask = threshold_mask(frame, self.threshold_value);
        let line = detect_line(&mask, self.search_bottom(frame.height()));
        DetectionResult { mask, line }
    }
}

/// ITU-R BT.601 luma in 14-bit fixed point, rounded.
pub fn luminance(rgb: [u8; 3]) -> u8 {
    let [r, g, b] = rgb.map(u32::from);
    ((r * 4899 + g * 9617 + b * 1868 + 8192) >> 14) as u8
}

/// Inverted binary threshold: luminance `<= threshold` becomes foreground.
pub fn threshold_mask(frame: &Frame, threshold: u8) -> GrayImage {
    let stride = frame.channels() as usize;
    let pixels: Vec<u8> = frame
        .data()
        .chunks_exact(stride)
        .map(|px| {
            if luminance([px[0], px[1], px[2]]) <= threshold {
                FOREGROUND
            } else {
                BACKGROUND
            }
        })
        .collect();
    GrayImage::from_raw(frame.width(), frame.height(), pixels)
        .unwrap_or_else(|| GrayImage::from_pixel(frame.width(), frame.height(), Luma([BACKGROUND])))
}

/// Select the largest external component in rows `[0, search_bottom)`.
///
/// Ties on area go to the component whose first pixel comes first in
/// row-major order.
pub fn detect_line(mask: &GrayImage, search_bottom: u32) -> Option<LineDetection> {
    let components = external_components(mask, search_bottom);
    trace!(count = components.len(), search_bottom, "components in search region");

    let mut largest: Option<&Component> = None;
    for component in &components {
        if largest.map_or(true, |best| component.area > best.area) {
            largest = Some(component);
        }
    }
    let selected = largest?;

    let hull = convex_hull(selected.hull_candidates());
    let rect = min_area_rect(&hull)?;
    trace!(
        order = selected.order,
        area = selected.area,
        center_x = rect.center.0,
        center_y = rect.center.1,
        "selected line component"
    );

    Some(LineDetection {
        centroid: rect.center_point(),
        bounding_shape: rect.corner_points(),
        area: selected.area,
    })
}
