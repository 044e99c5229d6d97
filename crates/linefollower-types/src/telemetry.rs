use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::control::{ControlMode, MotorCommand};

/// Wall-clock format used for the metrics `timestamp` field (`HH:MM:SS.mmm`).
pub const TIMESTAMP_FORMAT: &str = "%H:%M:%S%.3f";

/// Per-cycle metrics record served as JSON by the monitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub line_position: Option<i32>,
    pub error: Option<f64>,
    pub left_speed: i32,
    pub right_speed: i32,
    pub timestamp: Option<String>,
    pub threshold_value: u8,
    pub control_mode: ControlMode,
}

impl Metrics {
    /// Record exposed before the capture loop publishes anything.
    pub fn initial(threshold_value: u8) -> Self {
        Self {
            line_position: None,
            error: None,
            left_speed: 0,
            right_speed: 0,
            timestamp: None,
            threshold_value,
            control_mode: ControlMode::Auto,
        }
    }

    pub fn from_cycle(
        line_position: Option<i32>,
        command: &MotorCommand,
        threshold_value: u8,
        control_mode: ControlMode,
        at: DateTime<Local>,
    ) -> Self {
        Self {
            line_position,
            error: command.error,
            left_speed: command.left_speed,
            right_speed: command.right_speed,
            timestamp: Some(at.format(TIMESTAMP_FORMAT).to_string()),
            threshold_value,
            control_mode,
        }
    }
}
