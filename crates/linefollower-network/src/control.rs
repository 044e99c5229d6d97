use linefollower_types::control::ControlUpdate;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Why a `POST /control` payload was refused.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ControlRejection {
    #[error("malformed control payload: {0}")]
    Malformed(String),
    #[error("unknown mode {0:?}, expected \"auto\" or \"manual\"")]
    UnknownMode(String),
    #[error("manual mode requires a numeric {0}")]
    MissingSpeed(&'static str),
    #[error("{field} {value} is outside [-{max_speed}, {max_speed}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        max_speed: i32,
    },
}

#[derive(Debug, Deserialize)]
struct ControlRequest {
    mode: String,
    left_speed: Option<Value>,
    right_speed: Option<Value>,
}

/// Parse and validate a control request body.
///
/// Speeds are only inspected for manual mode; they are rounded to the nearest
/// integer and must lie within `max_speed` in magnitude.
pub fn parse_control_request(
    body: &[u8],
    max_speed: i32,
) -> Result<ControlUpdate, ControlRejection> {
    let request: ControlRequest = serde_json::from_slice(body)
        .map_err(|err| ControlRejection::Malformed(err.to_string()))?;

    match request.mode.as_str() {
        "auto" => Ok(ControlUpdate::Auto),
        "manual" => {
            let left = speed("left_speed", request.left_speed.as_ref(), max_speed)?;
            let right = speed("right_speed", request.right_speed.as_ref(), max_speed)?;
            Ok(ControlUpdate::Manual { left, right })
        }
        _ => Err(ControlRejection::UnknownMode(request.mode)),
    }
}

fn speed(field: &'static str, value: Option<&Value>, max_speed: i32) -> Result<i32, ControlRejection> {
    let value = value
        .and_then(Value::as_f64)
        .ok_or(ControlRejection::MissingSpeed(field))?;
    let rounded = value.round();
    if rounded.abs() > f64::from(max_speed) {
        return Err(ControlRejection::OutOfRange {
            field,
            value,
            max_speed,
        });
    }
    Ok(rounded as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> Result<ControlUpdate, ControlRejection> {
        parse_control_request(body.as_bytes(), 100)
    }

    #[test]
    fn manual_request_with_speeds() {
        assert_eq!(
            parse(r#"{"mode":"manual","left_speed":40,"right_speed":-20}"#),
            Ok(ControlUpdate::Manual { left: 40, right: -20 })
        );
    }

    #[test]
    fn fractional_speeds_are_rounded() {
        assert_eq!(
            parse(r#"{"mode":"manual","left_speed":39.6,"right_speed":-20.4}"#),
            Ok(ControlUpdate::Manual { left: 40, right: -20 })
        );
    }

    #[test]
    fn auto_ignores_speeds() {
        assert_eq!(parse(r#"{"mode":"auto"}"#), Ok(ControlUpdate::Auto));
        assert_eq!(
            parse(r#"{"mode":"auto","left_speed":"fast","right_speed":999}"#),
            Ok(ControlUpdate::Auto)
        );
    }

    #[test]
    fn rejects_bad_payloads() {
        assert!(matches!(parse("not json"), Err(ControlRejection::Malformed(_))));
        assert!(matches!(parse(r#"{"left_speed":1}"#), Err(ControlRejection::Malformed(_))));
        assert_eq!(
            parse(r#"{"mode":"turbo"}"#),
            Err(ControlRejection::UnknownMode("turbo".into()))
        );
        assert_eq!(
            parse(r#"{"mode":"manual","left_speed":10}"#),
            Err(ControlRejection::MissingSpeed("right_speed"))
        );
        assert_eq!(
            parse(r#"{"mode":"manual","left_speed":"10","right_speed":10}"#),
            Err(ControlRejection::MissingSpeed("left_speed"))
        );
    }

    #[test]
    fn speed_limit_applies_after_rounding() {
        assert_eq!(
            parse(r#"{"mode":"manual","left_speed":100.4,"right_speed":-100}"#),
            Ok(ControlUpdate::Manual { left: 100, right: -100 })
        );
        assert!(matches!(
            parse(r#"{"mode":"manual","left_speed":0,"right_speed":-100.6}"#),
            Err(ControlRejection::OutOfRange { field: "right_speed", .. })
        ));
    }
}
