use async_trait::async_trait;
use linefollower_types::{vision::Frame, Result};
use tracing::info;

use crate::{camera_error, Camera, CameraSettings, FramePacer};

const BACKGROUND_LEVEL: u8 = 220;
const LINE_LEVEL: u8 = 30;
const LINE_HALF_WIDTH: f64 = 8.0;
const PHASE_STEP: f64 = 0.15;

/// Software camera rendering a dark track on a light floor.
///
/// The track sweeps left and right and tilts over time so every steering
/// zone gets exercised.
pub struct SyntheticCamera {
    settings: Option<CameraSettings>,
    started: bool,
    frame_index: u64,
    pacer: FramePacer,
}

impl SyntheticCamera {
    pub fn new() -> Self {
        Self {
            settings: None,
            started: false,
            frame_index: 0,
            pacer: FramePacer::default(),
        }
    }
}

impl Default for SyntheticCamera {
    fn default() -> Self {
        Self::new()
    }
}

/// Render frame number `frame_index` of the synthetic track.
pub fn render_track(width: u32, height: u32, channels: u8, frame_index: u64) -> Vec<u8> {
    let phase = frame_index as f64 * PHASE_STEP;
    let center = width as f64 / 2.0 + (width as f64 / 4.0) * phase.sin();
    let slope = 0.3 * (phase * 0.7).cos();
    let mid_row = height as f64 / 2.0;

    let mut data = Vec::with_capacity(width as usize * height as usize * channels as usize);
    for y in 0..height {
        let track_x = center + (y as f64 - mid_row) * slope;
        for x in 0..width {
            let level = if (x as f64 - track_x).abs() <= LINE_HALF_WIDTH {
                LINE_LEVEL
            } else {
                BACKGROUND_LEVEL
            };
            data.extend_from_slice(&[level, level, level]);
            if channels == 4 {
                data.push(u8::MAX);
            }
        }
    }
    data
}

#[async_trait]
impl Camera for SyntheticCamera {
    async fn configure(&mut self, settings: CameraSettings) -> Result<()> {
        info!(
            "Configuring synthetic camera {}x{} {:?} @ {} fps",
            settings.resolution.0, settings.resolution.1, settings.pixel_format, settings.frame_rate
        );
        self.settings = Some(settings);
        Ok(())
    }

    async fn start(&mut self) -> Result<()> {
        if self.settings.is_none() {
            return Err(camera_error("synthetic camera started before configure"));
        }
        self.started = true;
        self.pacer.reset();
        Ok(())
    }

    async fn capture_frame(&mut self) -> Result<Frame> {
        let settings = match (self.started, self.settings) {
            (true, Some(settings)) => settings,
            _ => return Err(camera_error("synthetic camera is not running")),
        };
        self.pacer.wait(settings.frame_interval()).await;

        let (width, height) = settings.resolution;
        let channels = settings.pixel_format.channels();
        let data = render_track(width, height, channels, self.frame_index);
        self.frame_index += 1;
        Frame::new(width, height, channels, data)
    }

    async fn stop(&mut self) -> Result<()> {
        info!("Stopping synthetic camera after {} frames", self.frame_index);
        self.started = false;
        Ok(())
    }
}
