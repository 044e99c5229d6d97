//! Steering control law: detection + control state in, wheel speeds out.

use linefollower_types::{
    config::ControlConfig,
    control::{ControlMode, ControlState, MotorCommand},
    vision::DetectionResult,
};
use tracing::trace;

/// Maps a detection to a motor command.
pub trait SteeringPolicy: Send + Sync {
    fn command(
        &self,
        frame_width: u32,
        detection: &DetectionResult,
        state: &ControlState,
    ) -> MotorCommand;
}

/// Three-zone bang-bang controller: straight inside the tolerance band,
/// fixed slow/fast wheel pair outside it.
///
/// Manual mode passes the operator's speeds through untouched. In auto mode a
/// missing line stops both wheels.
#[derive(Debug, Clone)]
pub struct BangBangController {
    config: ControlConfig,
}

impl BangBangController {
    pub fn new(config: ControlConfig) -> Self {
        Self { config }
    }
}

impl SteeringPolicy for BangBangController {
    fn command(
        &self,
        frame_width: u32,
        detection: &DetectionResult,
        state: &ControlState,
    ) -> MotorCommand {
        if state.mode == ControlMode::Manual {
            return MotorCommand::new(state.manual_left_speed, state.manual_right_speed, None);
        }

        let Some(centroid) = detection.centroid() else {
            trace!("no line in search region; stopping");
            return MotorCommand::STOP;
        };

        let error = steering_error(frame_width, centroid.x);
        let cfg = &self.config;
        let (left, right) = if error.abs() < cfg.error_tolerance {
            (cfg.straight_speed, cfg.straight_speed)
        } else if error > 0.0 {
            (cfg.turn_speed_slow, cfg.turn_speed_fast)
        } else {
            (cfg.turn_speed_fast, cfg.turn_speed_slow)
        };
        MotorCommand::new(left, right, Some(error))
    }
}

/// Signed offset of the line from the image center; positive when the line
/// is left of center.
pub fn steering_error(frame_width: u32, line_x: i32) -> f64 {
    frame_width as f64 / 2.0 - line_x as f64
}
