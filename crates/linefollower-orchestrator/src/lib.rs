//! Capture loop coordinating camera, frame processor, control law, telemetry
//! store, and drive motors.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use async_trait::async_trait;
use chrono::Local;
use linefollower_control::SteeringPolicy;
use linefollower_hardware::{Camera, CameraSettings, MotorDriver};
use linefollower_ops::TelemetryStore;
use linefollower_types::{
    config::LineFollowerConfig, control::MotorCommand, telemetry::Metrics, Result,
};
use linefollower_vision::{render_debug_frame, FrameProcessor, OverlayContext};
use tokio::time::{sleep, Duration};
use tracing::{debug, error, info, warn};

/// What one cycle decided.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleReport {
    pub line_position: Option<i32>,
    pub command: MotorCommand,
}

pub struct CaptureLoop<C, M, P>
where
    C: Camera,
    M: MotorDriver,
    P: SteeringPolicy,
{
    camera: C,
    motors: M,
    policy: P,
    processor: FrameProcessor,
    store: TelemetryStore,
    camera_settings: CameraSettings,
    loop_delay: Duration,
    cycles: u64,
}

impl<C, M, P> CaptureLoop<C, M, P>
where
    C: Camera,
    M: MotorDriver,
    P: SteeringPolicy,
{
    pub fn new(
        config: &LineFollowerConfig,
        camera: C,
        motors: M,
        policy: P,
        store: TelemetryStore,
    ) -> Self {
        Self {
            camera,
            motors,
            policy,
            processor: FrameProcessor::new(&config.vision),
            store,
            camera_settings: CameraSettings::from(&config.camera),
            loop_delay: Duration::from_millis(config.orchestrator.loop_delay_ms),
            cycles: 0,
        }
    }

    pub async fn boot(&mut self) -> Result<()> {
        self.camera.configure(self.camera_settings).await?;
        self.camera.start().await?;
        info!(
            "Capture loop booted: {}x{} @ {} fps, threshold {}",
            self.camera_settings.resolution.0,
            self.camera_settings.resolution.1,
            self.camera_settings.frame_rate,
            self.processor.threshold_value()
        );
        Ok(())
    }

    /// Sense, decide, publish, and actuate once.
    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        let frame = self.camera.capture_frame().await?;
        let detection = self.processor.process(&frame);
        let state = self.store.control_state();
        let command = self.policy.command(frame.width(), &detection, &state);

        let threshold_value = self.processor.threshold_value();
        let overlay = render_debug_frame(
            &frame,
            &detection,
            &command,
            &OverlayContext {
                threshold_value,
                search_bottom: self.processor.search_bottom(frame.height()),
                mode: state.mode,
            },
        );
        let line_position = detection.centroid().map(|c| c.x);

        self.store.publish_mask(detection.mask);
        self.store.publish_debug_frame(overlay);
        self.store.publish_metrics(Metrics::from_cycle(
            line_position,
            &command,
            threshold_value,
            state.mode,
            Local::now(),
        ));

        self.motors
            .drive(command.left_speed, command.right_speed)
            .await?;

        self.cycles += 1;
        debug!(
            cycle = self.cycles,
            mode = %state.mode,
            line = ?line_position,
            left = command.left_speed,
            right = command.right_speed,
            "cycle complete"
        );
        Ok(CycleReport {
            line_position,
            command,
        })
    }

    /// Stop the motors, then the camera. Both are attempted even if the first fails.
    pub async fn shutdown(&mut self) -> Result<()> {
        let motors = self.motors.stop().await;
        if let Err(err) = &motors {
            warn!("Failed to stop motors: {err}");
        }
        let camera = self.camera.stop().await;
        if let Err(err) = &camera {
            warn!("Failed to stop camera: {err}");
        }
        info!("Capture loop stopped after {} cycles", self.cycles);
        motors.and(camera)
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn motors(&self) -> &M {
        &self.motors
    }

    pub fn store(&self) -> &TelemetryStore {
        &self.store
    }
}

#[async_trait]
pub trait LoopRunner {
    /// Run cycles until `shutdown` is raised or a cycle fails.
    async fn run(&mut self, shutdown: Arc<AtomicBool>) -> Result<()>;
}

#[async_trait]
impl<C, M, P> LoopRunner for CaptureLoop<C, M, P>
where
    C: Camera,
    M: MotorDriver,
    P: SteeringPolicy,
{
    async fn run(&mut self, shutdown: Arc<AtomicBool>) -> Result<()> {
        info!("Capture loop running");
        let outcome = loop {
            if shutdown.load(Ordering::SeqCst) {
                info!("Shutdown requested");
                break Ok(());
            }
            if let Err(err) = self.run_cycle().await {
                error!("Capture loop failed: {err}");
                break Err(err);
            }
            sleep(self.loop_delay).await;
        };
        let stopped = self.shutdown().await;
        outcome.and(stopped)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;
    use linefollower_control::BangBangController;
    use linefollower_hardware::{camera_error, LoggingMotorDriver};
    use linefollower_types::{
        control::{ControlMode, ControlUpdate},
        vision::Frame,
    };

    /// Camera replaying a fixed list of frames, then failing.
    struct ScriptedCamera {
        frames: VecDeque<Frame>,
        configured: Option<CameraSettings>,
        started: bool,
        stopped: Arc<AtomicBool>,
    }

    impl ScriptedCamera {
        fn new(frames: Vec<Frame>) -> Self {
            Self {
                frames: frames.into(),
                configured: None,
                started: false,
                stopped: Arc::new(AtomicBool::new(false)),
            }
        }
    }

    #[async_trait]
    impl Camera for ScriptedCamera {
        async fn configure(&mut self, settings: CameraSettings) -> Result<()> {
            self.configured = Some(settings);
            Ok(())
        }

        async fn start(&mut self) -> Result<()> {
            self.started = true;
            Ok(())
        }

        async fn capture_frame(&mut self) -> Result<Frame> {
            self.frames
                .pop_front()
                .ok_or_else(|| camera_error("script exhausted"))
        }

        async fn stop(&mut self) -> Result<()> {
            self.stopped.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    /// 64x48 light frame with a full-height dark stripe over columns `x0..=x1`.
    fn stripe_frame(x0: u32, x1: u32) -> Frame {
        let mut data = Vec::with_capacity(64 * 48 * 3);
        for _y in 0..48 {
            for x in 0..64u32 {
                let level = if (x0..=x1).contains(&x) { 20 } else { 230 };
                data.extend_from_slice(&[level, level, level]);
            }
        }
        Frame::from_rgb(64, 48, data).expect("frame")
    }

    fn config() -> LineFollowerConfig {
        let mut config = LineFollowerConfig::default();
        config.camera.width = 64;
        config.camera.height = 48;
        config.orchestrator.loop_delay_ms = 0;
        config
    }

    fn capture_loop(
        frames: Vec<Frame>,
    ) -> CaptureLoop<ScriptedCamera, LoggingMotorDriver, BangBangController> {
        let config = config();
        CaptureLoop::new(
            &config,
            ScriptedCamera::new(frames),
            LoggingMotorDriver::new(),
            BangBangController::new(config.control.clone()),
            TelemetryStore::new(config.vision.threshold_value),
        )
    }

    #[tokio::test]
    async fn boot_configures_and_starts_camera() {
        let mut capture = capture_loop(Vec::new());
        capture.boot().await.expect("boot");
        assert!(capture.camera.started);
        let settings = capture.camera.configured.expect("configured");
        assert_eq!(settings.resolution, (64, 48));
    }

    #[tokio::test]
    async fn cycle_publishes_telemetry_and_drives() {
        let mut capture = capture_loop(vec![stripe_frame(30, 33), stripe_frame(4, 7)]);
        capture.boot().await.expect("boot");

        let straight = capture.run_cycle().await.expect("cycle");
        assert_eq!(straight.line_position, Some(31));
        assert_eq!((straight.command.left_speed, straight.command.right_speed), (50, 50));

        let turn = capture.run_cycle().await.expect("cycle");
        assert_eq!((turn.command.left_speed, turn.command.right_speed), (30, 70));
        assert_eq!(capture.motors().metrics().last_command, Some((30, 70)));

        let snapshot = capture.store().snapshot();
        assert_eq!(snapshot.debug_frame.expect("frame").dimensions(), (64, 48));
        assert_eq!(snapshot.mask.expect("mask").get_pixel(5, 40).0[0], 255);
        let metrics = snapshot.metrics;
        assert_eq!(metrics.line_position, Some(5));
        assert_eq!(metrics.error, Some(27.0));
        assert_eq!(metrics.left_speed, 30);
        assert_eq!(metrics.control_mode, ControlMode::Auto);
        assert!(metrics.timestamp.is_some());
        assert_eq!(capture.cycles(), 2);
    }

    #[tokio::test]
    async fn lost_line_stops_wheels_in_auto() {
        let mut capture = capture_loop(vec![stripe_frame(100, 100)]);
        let report = capture.run_cycle().await.expect("cycle");
        assert_eq!(report.line_position, None);
        assert_eq!(report.command, MotorCommand::STOP);
        assert_eq!(capture.store().metrics().line_position, None);
    }

    #[tokio::test]
    async fn manual_override_applies_on_next_cycle() {
        let mut capture = capture_loop(vec![stripe_frame(30, 33)]);
        capture
            .store()
            .set_control_state(ControlUpdate::Manual { left: 40, right: -20 });
        let report = capture.run_cycle().await.expect("cycle");
        assert_eq!(report.command, MotorCommand::new(40, -20, None));
        // The line is still reported even though it does not steer.
        assert_eq!(report.line_position, Some(31));
        assert_eq!(capture.store().metrics().control_mode, ControlMode::Manual);
    }

    #[tokio::test]
    async fn run_honours_shutdown_and_stops_hardware() {
        let mut capture = capture_loop(vec![stripe_frame(30, 33)]);
        let camera_stopped = capture.camera.stopped.clone();
        let shutdown = Arc::new(AtomicBool::new(true));
        capture.run(shutdown).await.expect("run");
        assert_eq!(capture.cycles(), 0);
        assert!(camera_stopped.load(Ordering::SeqCst));
        assert_eq!(capture.motors().metrics().last_command, Some((0, 0)));
    }

    #[tokio::test]
    async fn camera_failure_is_fatal_after_stopping_hardware() {
        let mut capture = capture_loop(vec![stripe_frame(4, 7), stripe_frame(4, 7)]);
        let camera_stopped = capture.camera.stopped.clone();
        let result = capture.run(Arc::new(AtomicBool::new(false))).await;
        assert!(result.is_err());
        assert_eq!(capture.cycles(), 2);
        assert!(camera_stopped.load(Ordering::SeqCst));
        assert_eq!(capture.motors().metrics().last_command, Some((0, 0)));
    }
}
