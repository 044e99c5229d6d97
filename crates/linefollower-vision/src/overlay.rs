//! Debug overlay drawn on top of the camera frame for the monitor.
//!
//! Purely cosmetic: nothing here feeds back into control.

use image::{Rgb, RgbImage};
use linefollower_types::{
    control::{ControlMode, MotorCommand},
    vision::{DetectionResult, Frame, PixelPoint},
};

const SEARCH_REGION_COLOR: Rgb<u8> = Rgb([255, 255, 0]);
const BOUNDING_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const MARKER_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const TEXT_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const TEXT_BACKDROP: Rgb<u8> = Rgb([0, 0, 0]);

const GLYPH_ADVANCE: i32 = 6;
const MARKER_RADIUS: i32 = 5;

/// Per-cycle values shown in the overlay besides the detection itself.
#[derive(Debug, Clone, Copy)]
pub struct OverlayContext {
    pub threshold_value: u8,
    pub search_bottom: u32,
    pub mode: ControlMode,
}

/// Copy the frame into an RGB image, dropping alpha if present.
pub fn frame_to_rgb(frame: &Frame) -> RgbImage {
    let (width, height) = (frame.width(), frame.height());
    let data = if frame.channels() == 3 {
        frame.data().to_vec()
    } else {
        frame
            .data()
            .chunks_exact(frame.channels() as usize)
            .flat_map(|px| [px[0], px[1], px[2]])
            .collect()
    };
    RgbImage::from_raw(width, height, data).unwrap_or_else(|| RgbImage::new(width, height))
}

/// Compose the annotated frame published as the live view.
pub fn render_debug_frame(
    frame: &Frame,
    detection: &DetectionResult,
    command: &MotorCommand,
    ctx: &OverlayContext,
) -> RgbImage {
    let mut image = frame_to_rgb(frame);
    let width = image.width() as i32;

    if ctx.search_bottom > 0 {
        draw_rectangle(
            &mut image,
            0,
            0,
            width - 1,
            ctx.search_bottom as i32 - 1,
            SEARCH_REGION_COLOR,
        );
    }

    let header = format!(
        "THRESHOLD: {} | MODE: {}",
        ctx.threshold_value,
        ctx.mode.as_str()
    );
    draw_text_box(&mut image, 4, 4, &header);

    match &detection.line {
        Some(line) => {
            draw_polygon(&mut image, &line.bounding_shape, BOUNDING_COLOR);
            fill_circle(&mut image, line.centroid, MARKER_RADIUS, MARKER_COLOR);
            let center = PixelPoint::new(width / 2, line.centroid.y);
            draw_thick_line(&mut image, center, line.centroid, MARKER_COLOR);
            if let Some(error) = command.error {
                draw_text_box(&mut image, 4, 14, &format!("ERROR: {error:.1}"));
            }
        }
        None => draw_text_box(&mut image, 4, 14, "NO LINE"),
    }

    image
}

fn put(image: &mut RgbImage, x: i32, y: i32, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < image.width() && (y as u32) < image.height() {
        image.put_pixel(x as u32, y as u32, color);
    }
}

fn draw_rectangle(
    image: &mut RgbImage,
    left: i32,
    top: i32,
    right: i32,
    bottom: i32,
    color: Rgb<u8>,
) {
    for x in left..=right {
        put(image, x, top, color);
        put(image, x, bottom, color);
    }
    for y in top..=bottom {
        put(image, left, y, color);
        put(image, right, y, color);
    }
}

fn fill_rect(image: &mut RgbImage, left: i32, top: i32, right: i32, bottom: i32, color: Rgb<u8>) {
    for y in top..=bottom {
        for x in left..=right {
            put(image, x, y, color);
        }
    }
}

fn draw_line(image: &mut RgbImage, from: PixelPoint, to: PixelPoint, color: Rgb<u8>) {
    let (mut x, mut y) = (from.x, from.y);
    let dx = (to.x - from.x).abs();
    let dy = -(to.y - from.y).abs();
    let sx = if from.x < to.x { 1 } else { -1 };
    let sy = if from.y < to.y { 1 } else { -1 };
    let mut err = dx + dy;
    loop {
        put(image, x, y, color);
        if x == to.x && y == to.y {
            break;
        }
        let doubled = 2 * err;
        if doubled >= dy {
            err += dy;
            x += sx;
        }
        if doubled <= dx {
            err += dx;
            y += sy;
        }
    }
}

fn draw_thick_line(image: &mut RgbImage, from: PixelPoint, to: PixelPoint, color: Rgb<u8>) {
    draw_line(image, from, to, color);
    draw_line(
        image,
        PixelPoint::new(from.x, from.y + 1),
        PixelPoint::new(to.x, to.y + 1),
        color,
    );
}

fn draw_polygon(image: &mut RgbImage, corners: &[PixelPoint; 4], color: Rgb<u8>) {
    for i in 0..corners.len() {
        let next = corners[(i + 1) % corners.len()];
        draw_thick_line(image, corners[i], next, color);
    }
}

fn fill_circle(image: &mut RgbImage, center: PixelPoint, radius: i32, color: Rgb<u8>) {
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= radius * radius {
                put(image, center.x + dx, center.y + dy, color);
            }
        }
    }
}

fn draw_text_box(image: &mut RgbImage, x: i32, y: i32, text: &str) {
    let text_width = text.chars().count() as i32 * GLYPH_ADVANCE;
    fill_rect(image, x - 1, y - 1, x + text_width, y + 7, TEXT_BACKDROP);
    draw_label(image, x, y, text, TEXT_COLOR);
}

fn draw_label(image: &mut RgbImage, mut x: i32, y: i32, text: &str, color: Rgb<u8>) {
    for ch in text.chars().flat_map(|c| c.to_uppercase()) {
        if let Some(glyph) = glyph_bits(ch) {
            for (row, pattern) in glyph.iter().enumerate() {
                for col in 0..5 {
                    if (pattern >> (4 - col)) & 1 == 1 {
                        put(image, x + col, y + row as i32, color);
                    }
                }
            }
        }
        x += GLYPH_ADVANCE;
    }
}

fn glyph_bits(ch: char) -> Option<[u8; 7]> {
    let bits = match ch {
        'A' => [0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'D' => [0b11100, 0b10010, 0b10001, 0b10001, 0b10001, 0b10010, 0b11100],
        'E' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b11111],
        'H' => [0b10001, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'I' => [0b01110, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        'L' => [0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b11111],
        'M' => [0b10001, 0b11011, 0b10101, 0b10101, 0b10001, 0b10001, 0b10001],
        'N' => [0b10001, 0b11001, 0b10101, 0b10011, 0b10001, 0b10001, 0b10001],
        'O' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'R' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10100, 0b10010, 0b10001],
        'S' => [0b01111, 0b10000, 0b10000, 0b01110, 0b00001, 0b00001, 0b11110],
        'T' => [0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100],
        'U' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        '0' => [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110],
        '1' => [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        '2' => [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111],
        '3' => [0b11110, 0b00001, 0b00001, 0b01110, 0b00001, 0b00001, 0b11110],
        '4' => [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010],
        '5' => [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110],
        '6' => [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110],
        '7' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000],
        '8' => [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110],
        '9' => [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100],
        ':' => [0, 0b01100, 0b01100, 0, 0b01100, 0b01100, 0],
        '-' => [0, 0, 0, 0b11111, 0, 0, 0],
        '.' => [0, 0, 0, 0, 0, 0b01100, 0b01100],
        '|' => [0b00100; 7],
        ' ' => [0; 7],
        _ => return None,
    };
    Some(bits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GrayImage;
    use linefollower_types::vision::LineDetection;

    fn grey_frame(width: u32, height: u32, channels: u8) -> Frame {
        let len = (width * height) as usize * channels as usize;
        Frame::new(width, height, channels, vec![128; len]).expect("frame")
    }

    fn context() -> OverlayContext {
        OverlayContext {
            threshold_value: 127,
            search_bottom: 30,
            mode: ControlMode::Auto,
        }
    }

    #[test]
    fn rgba_frames_convert_to_rgb() {
        let frame = grey_frame(4, 3, 4);
        let rgb = frame_to_rgb(&frame);
        assert_eq!(rgb.dimensions(), (4, 3));
        assert_eq!(rgb.get_pixel(2, 2), &Rgb([128, 128, 128]));
    }

    #[test]
    fn search_region_outline_is_drawn() {
        let frame = grey_frame(80, 60, 3);
        let detection = DetectionResult {
            mask: GrayImage::new(80, 60),
            line: None,
        };
        let image = render_debug_frame(&frame, &detection, &MotorCommand::STOP, &context());
        assert_eq!(image.get_pixel(79, 29), &SEARCH_REGION_COLOR);
        assert_eq!(image.get_pixel(40, 29), &SEARCH_REGION_COLOR);
        assert_eq!(image.get_pixel(40, 45), &Rgb([128, 128, 128]));
    }

    #[test]
    fn centroid_marker_and_shape_are_drawn() {
        let frame = grey_frame(80, 60, 3);
        let detection = DetectionResult {
            mask: GrayImage::new(80, 60),
            line: Some(LineDetection {
                centroid: PixelPoint::new(60, 40),
                bounding_shape: [
                    PixelPoint::new(55, 30),
                    PixelPoint::new(65, 30),
                    PixelPoint::new(65, 50),
                    PixelPoint::new(55, 50),
                ],
                area: 150,
            }),
        };
        let command = MotorCommand::new(70, 30, Some(-20.0));
        let image = render_debug_frame(&frame, &detection, &command, &context());
        assert_eq!(image.get_pixel(60, 40), &MARKER_COLOR);
        assert_eq!(image.get_pixel(55, 38), &BOUNDING_COLOR);
        assert_eq!(image.get_pixel(45, 40), &MARKER_COLOR);
    }

    #[test]
    fn drawing_outside_image_is_clipped() {
        let mut image = RgbImage::new(10, 10);
        draw_line(
            &mut image,
            PixelPoint::new(-5, -5),
            PixelPoint::new(20, 20),
            MARKER_COLOR,
        );
        fill_circle(&mut image, PixelPoint::new(0, 0), 4, MARKER_COLOR);
        assert_eq!(image.get_pixel(9, 9), &MARKER_COLOR);
    }
}
