use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use anyhow::{anyhow, Result};
use clap::{Parser, ValueEnum};
use linefollower_control::BangBangController;
use linefollower_hardware::{Camera, LoggingMotorDriver, ReplayCamera, SyntheticCamera};
use linefollower_network::{spawn_monitor_server, MonitorState};
use linefollower_ops::{init_tracing, TelemetryStore};
use linefollower_orchestrator::{CaptureLoop, LoopRunner};
use linefollower_types::config::{CameraConfig, CameraSource, LineFollowerConfig};
use tracing::{error, info};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CameraArg {
    Synthetic,
    Replay,
}

impl From<CameraArg> for CameraSource {
    fn from(arg: CameraArg) -> Self {
        match arg {
            CameraArg::Synthetic => CameraSource::Synthetic,
            CameraArg::Replay => CameraSource::Replay,
        }
    }
}

/// Camera-guided line follower with a live HTTP monitor.
#[derive(Debug, Parser)]
#[command(name = "linefollower", version)]
struct Cli {
    /// TOML configuration file.
    #[arg(long, env = "LINEFOLLOWER_CONFIG", default_value = "configs/dev.toml")]
    config: PathBuf,
    /// Monitoring interface port.
    #[arg(long)]
    port: Option<u16>,
    /// Binary threshold (0-255); darker pixels count as line.
    #[arg(long)]
    threshold: Option<u8>,
    #[arg(long, value_enum)]
    camera: Option<CameraArg>,
    /// Directory of PNG/JPEG frames for the replay camera.
    #[arg(long)]
    replay_dir: Option<String>,
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn apply_overrides(&self, config: &mut LineFollowerConfig) {
        if let Some(port) = self.port {
            config.network.port = port;
        }
        if let Some(threshold) = self.threshold {
            config.vision.threshold_value = threshold;
        }
        if let Some(camera) = self.camera {
            config.camera.source = camera.into();
        }
        if let Some(dir) = &self.replay_dir {
            config.camera.replay_dir = Some(dir.clone());
        }
        if let Some(level) = &self.log_level {
            config.ops.log_level = level.clone();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = load_config(&cli.config);
    cli.apply_overrides(&mut config);
    config.validate()?;

    if let Err(err) = init_tracing(&config.ops) {
        eprintln!("{err}");
    }

    let store = TelemetryStore::new(config.vision.threshold_value);
    let server = spawn_monitor_server(
        &config.network,
        MonitorState::new(
            store.clone(),
            config.network.jpeg_quality,
            config.control.max_speed,
        ),
    )?;

    let camera = match build_camera(&config.camera) {
        Ok(camera) => camera,
        Err(err) => {
            server.stop();
            return Err(err);
        }
    };
    let mut capture = CaptureLoop::new(
        &config,
        camera,
        LoggingMotorDriver::new(),
        BangBangController::new(config.control.clone()),
        store,
    );

    let shutdown = Arc::new(AtomicBool::new(false));
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, stopping after the current cycle");
            signal.store(true, Ordering::SeqCst);
        }
    });

    let result = match capture.boot().await {
        Ok(()) => capture.run(shutdown).await,
        Err(err) => {
            error!("Boot failed: {err}");
            let _ = capture.shutdown().await;
            Err(err)
        }
    };
    server.stop();
    result?;
    Ok(())
}

fn build_camera(config: &CameraConfig) -> Result<Box<dyn Camera>> {
    match config.source {
        CameraSource::Synthetic => Ok(Box::new(SyntheticCamera::new())),
        CameraSource::Replay => {
            let dir = config
                .replay_dir
                .as_deref()
                .ok_or_else(|| anyhow!("camera.source = \"replay\" requires camera.replay_dir"))?;
            Ok(Box::new(ReplayCamera::new(dir)))
        }
    }
}

fn load_config(path: &Path) -> LineFollowerConfig {
    match LineFollowerConfig::from_file(path) {
        Ok(cfg) => {
            if let Err(err) = cfg.validate() {
                eprintln!(
                    "Invalid config in '{}': {err}. Falling back to internal defaults.",
                    path.display()
                );
                LineFollowerConfig::default()
            } else {
                cfg
            }
        }
        Err(err) => {
            eprintln!(
                "Failed to load config from '{}': {err}. Falling back to internal defaults.",
                path.display()
            );
            LineFollowerConfig::default()
        }
    }
}
