//! Operational helpers: logging setup and the shared telemetry store.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use image::{GrayImage, RgbImage};
use linefollower_types::{
    config::OpsConfig,
    control::{ControlState, ControlUpdate},
    telemetry::Metrics,
    LineFollowerError, Result,
};
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

pub fn init_tracing(config: &OpsConfig) -> Result<()> {
    let filter = EnvFilter::try_new(config.log_level.clone())
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|err| LineFollowerError::Ops(format!("failed to create log filter: {err}")))?;

    fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|err| LineFollowerError::Ops(format!("tracing init error: {err}")))?;
    Ok(())
}

/// One independently guarded value. Writers replace it whole, readers clone it.
#[derive(Debug)]
struct Slot<T> {
    value: Mutex<T>,
}

impl<T: Clone> Slot<T> {
    fn new(value: T) -> Self {
        Self {
            value: Mutex::new(value),
        }
    }

    // Values are only ever replaced whole, so a poisoned guard still holds a
    // complete value.
    fn lock(&self) -> MutexGuard<'_, T> {
        self.value.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, value: T) {
        let previous = std::mem::replace(&mut *self.lock(), value);
        drop(previous);
    }

    fn read(&self) -> T {
        self.lock().clone()
    }

    fn update(&self, f: impl FnOnce(T) -> T) -> T {
        let mut guard = self.lock();
        let next = f(guard.clone());
        *guard = next.clone();
        next
    }
}

#[derive(Debug)]
struct Groups {
    debug_frame: Slot<Option<Arc<RgbImage>>>,
    mask: Slot<Option<Arc<GrayImage>>>,
    metrics: Slot<Metrics>,
    control: Slot<ControlState>,
}

/// Latest published telemetry plus the operator control state.
///
/// Cloning is cheap and every clone refers to the same store. The capture
/// loop is the only writer of the image and metrics groups; the monitoring
/// interface is the only writer of the control state.
#[derive(Debug, Clone)]
pub struct TelemetryStore {
    groups: Arc<Groups>,
}

/// The three telemetry groups, each read under its own guard.
#[derive(Debug, Clone)]
pub struct TelemetrySnapshot {
    pub debug_frame: Option<Arc<RgbImage>>,
    pub mask: Option<Arc<GrayImage>>,
    pub metrics: Metrics,
}

impl TelemetryStore {
    pub fn new(threshold_value: u8) -> Self {
        Self {
            groups: Arc::new(Groups {
                debug_frame: Slot::new(None),
                mask: Slot::new(None),
                metrics: Slot::new(Metrics::initial(threshold_value)),
                control: Slot::new(ControlState::default()),
            }),
        }
    }

    pub fn publish_debug_frame(&self, frame: RgbImage) {
        self.groups.debug_frame.publish(Some(Arc::new(frame)));
    }

    pub fn publish_mask(&self, mask: GrayImage) {
        self.groups.mask.publish(Some(Arc::new(mask)));
    }

    pub fn publish_metrics(&self, metrics: Metrics) {
        self.groups.metrics.publish(metrics);
    }

    /// Latest annotated frame, `None` before the first cycle.
    pub fn debug_frame(&self) -> Option<Arc<RgbImage>> {
        self.groups.debug_frame.read()
    }

    pub fn mask(&self) -> Option<Arc<GrayImage>> {
        self.groups.mask.read()
    }

    pub fn metrics(&self) -> Metrics {
        self.groups.metrics.read()
    }

    pub fn control_state(&self) -> ControlState {
        self.groups.control.read()
    }

    /// Apply an operator request in a single critical section.
    pub fn set_control_state(&self, update: ControlUpdate) -> ControlState {
        let state = self.groups.control.update(|current| current.apply(update));
        debug!(
            mode = %state.mode,
            left = state.manual_left_speed,
            right = state.manual_right_speed,
            "control state updated"
        );
        state
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            debug_frame: self.debug_frame(),
            mask: self.mask(),
            metrics: self.metrics(),
        }
    }
}
