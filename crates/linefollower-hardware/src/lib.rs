//! Camera and drive-motor abstraction layer.
//!
//! The capture loop only talks to these traits. Real drivers (libcamera,
//! PWM motor HATs) plug in behind them; the software implementations here
//! let the full system run and be tested without hardware.

mod replay;
mod synthetic;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use linefollower_types::{
    config::{CameraConfig, PixelFormat},
    vision::Frame,
    LineFollowerError, Result,
};
use tokio::time::{sleep_until, Duration, Instant};
use tracing::{debug, info};

pub use replay::ReplayCamera;
pub use synthetic::{render_track, SyntheticCamera};

/// Capture parameters handed to [`Camera::configure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraSettings {
    pub resolution: (u32, u32),
    pub pixel_format: PixelFormat,
    pub frame_rate: u32,
}

impl CameraSettings {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.frame_rate.max(1) as f64)
    }
}

impl From<&CameraConfig> for CameraSettings {
    fn from(config: &CameraConfig) -> Self {
        Self {
            resolution: (config.width, config.height),
            pixel_format: config.pixel_format,
            frame_rate: config.fps,
        }
    }
}

#[async_trait]
pub trait Camera: Send + Sync {
    async fn configure(&mut self, settings: CameraSettings) -> Result<()>;
    async fn start(&mut self) -> Result<()>;
    /// Block until the next frame is available.
    async fn capture_frame(&mut self) -> Result<Frame>;
    async fn stop(&mut self) -> Result<()>;
}

#[async_trait]
impl<T: Camera + ?Sized> Camera for Box<T> {
    async fn configure(&mut self, settings: CameraSettings) -> Result<()> {
        (**self).configure(settings).await
    }

    async fn start(&mut self) -> Result<()> {
        (**self).start().await
    }

    async fn capture_frame(&mut self) -> Result<Frame> {
        (**self).capture_frame().await
    }

    async fn stop(&mut self) -> Result<()> {
        (**self).stop().await
    }
}

/// Aggregated drive counters.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DriveMetrics {
    pub last_command: Option<(i32, i32)>,
    pub commands_sent: u64,
}

#[async_trait]
pub trait MotorDriver: Send + Sync {
    /// Apply signed speeds to the left and right wheels.
    async fn drive(&mut self, left: i32, right: i32) -> Result<()>;

    async fn stop(&mut self) -> Result<()> {
        self.drive(0, 0).await
    }

    fn metrics(&self) -> DriveMetrics;
}

/// Motor driver that records and logs commands instead of actuating anything.
#[derive(Debug, Clone, Default)]
pub struct LoggingMotorDriver {
    metrics: Arc<Mutex<DriveMetrics>>,
}

impl LoggingMotorDriver {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MotorDriver for LoggingMotorDriver {
    async fn drive(&mut self, left: i32, right: i32) -> Result<()> {
        debug!(left, right, "drive command");
        let mut metrics = self
            .metrics
            .lock()
            .map_err(|_| motor_error("failed to lock drive metrics"))?;
        metrics.last_command = Some((left, right));
        metrics.commands_sent += 1;
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        info!("Stopping drive motors");
        self.drive(0, 0).await
    }

    fn metrics(&self) -> DriveMetrics {
        self.metrics.lock().map(|m| m.clone()).unwrap_or_default()
    }
}

/// Paces frame delivery to the configured frame rate.
#[derive(Debug, Default)]
pub(crate) struct FramePacer {
    next_due: Option<Instant>,
}

impl FramePacer {
    pub(crate) async fn wait(&mut self, interval: Duration) {
        let now = Instant::now();
        if let Some(due) = self.next_due {
            if due > now {
                sleep_until(due).await;
            }
        }
        let base = self.next_due.map_or(now, |due| due.max(now));
        self.next_due = Some(base + interval);
    }

    pub(crate) fn reset(&mut self) {
        self.next_due = None;
    }
}

/// Generate an error aligned with camera semantics.
pub fn camera_error(message: impl Into<String>) -> LineFollowerError {
    LineFollowerError::Camera(message.into())
}

pub fn motor_error(message: impl Into<String>) -> LineFollowerError {
    LineFollowerError::Motor(message.into())
}
