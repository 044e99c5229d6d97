use std::path::{Path, PathBuf};

use async_trait::async_trait;
use image::imageops::FilterType;
use linefollower_types::{config::PixelFormat, vision::Frame, Result};
use tracing::{debug, info};

use crate::{camera_error, Camera, CameraSettings, FramePacer};

const SUPPORTED_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Camera replaying still images from a directory, in file-name order, looping.
///
/// Images whose size differs from the configured resolution are resized.
pub struct ReplayCamera {
    dir: PathBuf,
    settings: Option<CameraSettings>,
    files: Vec<PathBuf>,
    cursor: usize,
    pacer: FramePacer,
}

impl ReplayCamera {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            settings: None,
            files: Vec::new(),
            cursor: 0,
            pacer: FramePacer::default(),
        }
    }

    fn list_images(dir: &Path) -> Result<Vec<PathBuf>> {
        let entries = std::fs::read_dir(dir).map_err(|err| {
            camera_error(format!("unable to read replay dir {}: {err}", dir.display()))
        })?;
        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                    .unwrap_or(false)
            })
            .collect();
        files.sort();
        Ok(files)
    }

    fn load(path: &Path, settings: &CameraSettings) -> Result<Frame> {
        let img = image::open(path)
            .map_err(|err| camera_error(format!("failed to decode {}: {err}", path.display())))?;
        let (width, height) = settings.resolution;
        let img = if (img.width(), img.height()) != (width, height) {
            debug!(
                "Resizing {} from {}x{} to {}x{}",
                path.display(),
                img.width(),
                img.height(),
                width,
                height
            );
            img.resize_exact(width, height, FilterType::Triangle)
        } else {
            img
        };
        match settings.pixel_format {
            PixelFormat::Rgb888 => Frame::from_rgb(width, height, img.to_rgb8().into_raw()),
            PixelFormat::Xrgb8888 => Frame::from_rgba(width, height, img.to_rgba8().into_raw()),
        }
    }
}

#[async_trait]
impl Camera for ReplayCamera {
    async fn configure(&mut self, settings: CameraSettings) -> Result<()> {
        self.settings = Some(settings);
        Ok(())
    }

    async fn start(&mut self) -> Result<()> {
        if self.settings.is_none() {
            return Err(camera_error("replay camera started before configure"));
        }
        let files = Self::list_images(&self.dir)?;
        if files.is_empty() {
            return Err(camera_error(format!(
                "no png/jpeg images found in {}",
                self.dir.display()
            )));
        }
        info!(
            "Replay camera streaming {} images from {}",
            files.len(),
            self.dir.display()
        );
        self.files = files;
        self.cursor = 0;
        self.pacer.reset();
        Ok(())
    }

    async fn capture_frame(&mut self) -> Result<Frame> {
        let Some(settings) = self.settings else {
            return Err(camera_error("replay camera is not configured"));
        };
        if self.files.is_empty() {
            return Err(camera_error("replay camera is not running"));
        }
        self.pacer.wait(settings.frame_interval()).await;

        let path = self.files[self.cursor].clone();
        self.cursor = (self.cursor + 1) % self.files.len();
        tokio::task::spawn_blocking(move || Self::load(&path, &settings))
            .await
            .map_err(|err| camera_error(format!("replay decode task failed: {err}")))?
    }

    async fn stop(&mut self) -> Result<()> {
        info!("Stopping replay camera");
        self.files.clear();
        Ok(())
    }
}
