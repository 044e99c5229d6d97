use std::sync::{atomic::AtomicBool, Arc};

use actix_web::{test, web, App};
use async_trait::async_trait;
use linefollower_control::BangBangController;
use linefollower_hardware::{camera_error, Camera, CameraSettings, LoggingMotorDriver, MotorDriver};
use linefollower_network::{configure_routes, MonitorState};
use linefollower_ops::TelemetryStore;
use linefollower_orchestrator::{CaptureLoop, LoopRunner};
use linefollower_types::{config::LineFollowerConfig, vision::Frame, Result};
use serde_json::Value;

/// Serves the same centred-line frame a fixed number of times.
struct ScriptedCamera {
    remaining: usize,
}

#[async_trait]
impl Camera for ScriptedCamera {
    async fn configure(&mut self, _settings: CameraSettings) -> Result<()> {
        Ok(())
    }

    async fn start(&mut self) -> Result<()> {
        Ok(())
    }

    async fn capture_frame(&mut self) -> Result<Frame> {
        if self.remaining == 0 {
            return Err(camera_error("script exhausted"));
        }
        self.remaining -= 1;
        let mut data = Vec::with_capacity(80 * 60 * 3);
        for _y in 0..60 {
            for x in 0..80u32 {
                let level = if (38..=41).contains(&x) { 15 } else { 240 };
                data.extend_from_slice(&[level, level, level]);
            }
        }
        Frame::from_rgb(80, 60, data)
    }

    async fn stop(&mut self) -> Result<()> {
        Ok(())
    }
}

fn capture_loop(
    store: TelemetryStore,
    frames: usize,
) -> CaptureLoop<ScriptedCamera, LoggingMotorDriver, BangBangController> {
    let mut config = LineFollowerConfig::default();
    config.camera.width = 80;
    config.camera.height = 60;
    config.orchestrator.loop_delay_ms = 0;
    CaptureLoop::new(
        &config,
        ScriptedCamera { remaining: frames },
        LoggingMotorDriver::new(),
        BangBangController::new(config.control.clone()),
        store,
    )
}

#[actix_web::test]
async fn manual_override_reaches_metrics_after_next_cycle() {
    let store = TelemetryStore::new(127);
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(MonitorState::new(store.clone(), 80, 100)))
            .configure(configure_routes),
    )
    .await;
    let mut capture = capture_loop(store.clone(), 2);
    capture.boot().await.expect("boot");

    let report = capture.run_cycle().await.expect("auto cycle");
    assert_eq!(report.command.left_speed, 50);

    let req = test::TestRequest::post()
        .uri("/control")
        .set_payload(r#"{"mode":"manual","left_speed":40,"right_speed":-20}"#)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());

    // Metrics still describe the last completed cycle until the loop runs again.
    let req = test::TestRequest::get().uri("/metrics").to_request();
    let before: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(before["control_mode"], "auto");

    capture.run_cycle().await.expect("manual cycle");

    let req = test::TestRequest::get().uri("/metrics").to_request();
    let metrics: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(metrics["control_mode"], "manual");
    assert_eq!(metrics["left_speed"], 40);
    assert_eq!(metrics["right_speed"], -20);
    assert_eq!(metrics["error"], Value::Null);
    assert_eq!(metrics["line_position"], 39);
    assert_eq!(capture.motors().metrics().last_command, Some((40, -20)));

    let req = test::TestRequest::get().uri("/frame?42").to_request();
    let frame = test::call_and_read_body(&app, req).await;
    assert_eq!(&frame[..2], &[0xFF, 0xD8]);
}

#[actix_web::test]
async fn switching_back_to_auto_resumes_steering() {
    let store = TelemetryStore::new(127);
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(MonitorState::new(store.clone(), 80, 100)))
            .configure(configure_routes),
    )
    .await;
    let mut capture = capture_loop(store.clone(), 3);

    for payload in [
        r#"{"mode":"manual","left_speed":-60,"right_speed":60}"#,
        r#"{"mode":"auto"}"#,
    ] {
        let req = test::TestRequest::post()
            .uri("/control")
            .set_payload(payload)
            .to_request();
        assert!(test::call_service(&app, req).await.status().is_success());
    }

    // Three frames then the script runs dry; the loop must stop the wheels.
    let result = capture.run(Arc::new(AtomicBool::new(false))).await;
    assert!(result.is_err());
    assert_eq!(capture.cycles(), 3);

    let metrics = store.metrics();
    assert_eq!(metrics.left_speed, 50);
    assert_eq!(metrics.right_speed, 50);
    assert_eq!(capture.motors().metrics().last_command, Some((0, 0)));
}
