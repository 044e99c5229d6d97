use std::fmt;

use serde::{Deserialize, Serialize};

/// Who is driving the motors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlMode {
    #[default]
    Auto,
    Manual,
}

impl ControlMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ControlMode::Auto => "auto",
            ControlMode::Manual => "manual",
        }
    }
}

impl fmt::Display for ControlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operator-selected control mode plus the speeds used in manual mode.
///
/// The manual pair is ignored while `mode` is [`ControlMode::Auto`] and may
/// hold whatever the operator last sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ControlState {
    pub mode: ControlMode,
    pub manual_left_speed: i32,
    pub manual_right_speed: i32,
}

impl ControlState {
    pub fn manual(left: i32, right: i32) -> Self {
        Self {
            mode: ControlMode::Manual,
            manual_left_speed: left,
            manual_right_speed: right,
        }
    }
}

/// Operator request accepted by the monitoring interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlUpdate {
    /// Hand control back to the line follower; the manual pair is kept as-is.
    Auto,
    Manual { left: i32, right: i32 },
}

impl ControlState {
    /// State after applying `update` to `self`.
    pub fn apply(self, update: ControlUpdate) -> ControlState {
        match update {
            ControlUpdate::Auto => ControlState {
                mode: ControlMode::Auto,
                ..self
            },
            ControlUpdate::Manual { left, right } => ControlState::manual(left, right),
        }
    }
}

/// Wheel speeds for one cycle, with the steering error that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MotorCommand {
    pub left_speed: i32,
    pub right_speed: i32,
    pub error: Option<f64>,
}

impl MotorCommand {
    pub const STOP: MotorCommand = MotorCommand {
        left_speed: 0,
        right_speed: 0,
        error: None,
    };

    pub fn new(left_speed: i32, right_speed: i32, error: Option<f64>) -> Self {
        Self {
            left_speed,
            right_speed,
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_serializes_lowercase() {
        let json = serde_json::to_string(&ControlMode::Manual).expect("serialize");
        assert_eq!(json, "\"manual\"");
        let parsed: ControlMode = serde_json::from_str("\"auto\"").expect("parse");
        assert_eq!(parsed, ControlMode::Auto);
    }

    #[test]
    fn default_state_is_auto() {
        let state = ControlState::default();
        assert_eq!(state.mode, ControlMode::Auto);
        assert_eq!(ControlState::manual(5, -5).manual_right_speed, -5);
    }

    #[test]
    fn switching_to_auto_keeps_stale_manual_pair() {
        let manual = ControlState::default().apply(ControlUpdate::Manual { left: 40, right: -20 });
        assert_eq!(manual, ControlState::manual(40, -20));
        let auto = manual.apply(ControlUpdate::Auto);
        assert_eq!(auto.mode, ControlMode::Auto);
        assert_eq!(auto.manual_left_speed, 40);
        assert_eq!(auto.manual_right_speed, -20);
    }
}
