use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{LineFollowerError, Result};

/// Pixel layout requested from the camera driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PixelFormat {
    #[default]
    #[serde(rename = "RGB888")]
    Rgb888,
    #[serde(rename = "XRGB8888")]
    Xrgb8888,
}

impl PixelFormat {
    pub fn channels(self) -> u8 {
        match self {
            PixelFormat::Rgb888 => 3,
            PixelFormat::Xrgb8888 => 4,
        }
    }
}

/// Which camera implementation the binary wires in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraSource {
    #[default]
    Synthetic,
    Replay,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub width: u32,
    pub height: u32,
    pub pixel_format: PixelFormat,
    pub fps: u32,
    pub source: CameraSource,
    pub replay_dir: Option<String>,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            width: 320,
            height: 240,
            pixel_format: PixelFormat::Rgb888,
            fps: 10,
            source: CameraSource::Synthetic,
            replay_dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    pub threshold_value: u8,
    pub search_height_ratio: u32,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            threshold_value: 127,
            search_height_ratio: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    pub straight_speed: i32,
    pub turn_speed_slow: i32,
    pub turn_speed_fast: i32,
    pub error_tolerance: f64,
    /// Largest absolute speed accepted from a manual override.
    pub max_speed: i32,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            straight_speed: 50,
            turn_speed_slow: 30,
            turn_speed_fast: 70,
            error_tolerance: 10.0,
            max_speed: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub bind_addr: String,
    pub port: u16,
    pub jpeg_quality: u8,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0".into(),
            port: 8000,
            jpeg_quality: 80,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpsConfig {
    pub log_level: String,
}

impl Default for OpsConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Pause between capture cycles.
    pub loop_delay_ms: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self { loop_delay_ms: 10 }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LineFollowerConfig {
    pub camera: CameraConfig,
    pub vision: VisionConfig,
    pub control: ControlConfig,
    pub network: NetworkConfig,
    pub ops: OpsConfig,
    pub orchestrator: OrchestratorConfig,
}

impl LineFollowerConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref).map_err(|err| {
            LineFollowerError::Configuration(format!(
                "unable to read config file {}: {err}",
                path_ref.display()
            ))
        })?;
        toml::from_str(&contents).map_err(|err| {
            LineFollowerError::Configuration(format!(
                "failed to parse config file {}: {err}",
                path_ref.display()
            ))
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(LineFollowerError::Configuration(
                "camera.width and camera.height must be greater than zero".into(),
            ));
        }
        if self.camera.fps == 0 {
            return Err(LineFollowerError::Configuration(
                "camera.fps must be greater than zero".into(),
            ));
        }
        if self.vision.search_height_ratio == 0 {
            return Err(LineFollowerError::Configuration(
                "vision.search_height_ratio must be at least 1".into(),
            ));
        }
        let control = &self.control;
        if !control.error_tolerance.is_finite() || control.error_tolerance < 0.0 {
            return Err(LineFollowerError::Configuration(
                "control.error_tolerance must be a non-negative number".into(),
            ));
        }
        if control.max_speed <= 0 {
            return Err(LineFollowerError::Configuration(
                "control.max_speed must be greater than zero".into(),
            ));
        }
        for (name, speed) in [
            ("straight_speed", control.straight_speed),
            ("turn_speed_slow", control.turn_speed_slow),
            ("turn_speed_fast", control.turn_speed_fast),
        ] {
            if speed.abs() > control.max_speed {
                return Err(LineFollowerError::Configuration(format!(
                    "control.{name} ({speed}) exceeds control.max_speed ({})",
                    control.max_speed
                )));
            }
        }
        if self.network.port == 0 {
            return Err(LineFollowerError::Configuration(
                "network.port must be a valid port (>0)".into(),
            ));
        }
        if !(1..=100).contains(&self.network.jpeg_quality) {
            return Err(LineFollowerError::Configuration(
                "network.jpeg_quality must be between 1 and 100".into(),
            ));
        }
        Ok(())
    }
}
