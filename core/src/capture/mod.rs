//! Two-frame acquisition: the state machine fed by the vision stream, the
//! logical timer queue behind the inter-frame nudge, crop persistence and the
//! event loop that drives them.

pub mod driver;
pub mod machine;
pub mod scheduler;
pub mod session;
pub mod store;

pub use driver::run_capture;
pub use machine::{CaptureStateMachine, FrameDecision};
pub use scheduler::{TimerQueue, TimerTask};
pub use session::{CapturePhase, CaptureSession};
pub use store::{FrameStore, PngFrameStore, SavedFrame};

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::detection_log::LogError;
use crate::prelude::{StageError, StageResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Normalized `y1` a detection must pass before frame 1 is taken.
    pub trigger_y: f64,
    pub pause_secs: f64,
    pub nudge_secs: f64,
    pub multi_capture: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            trigger_y: 0.4,
            pause_secs: 1.0,
            nudge_secs: 1.5,
            multi_capture: false,
        }
    }
}

impl CaptureConfig {
    pub fn validate(&self) -> StageResult<()> {
        if !self.trigger_y.is_finite() {
            return Err(StageError::Config(format!(
                "capture trigger must be finite, got {}",
                self.trigger_y
            )));
        }
        for (name, value) in [("pause", self.pause_secs), ("nudge", self.nudge_secs)] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(StageError::Config(format!(
                    "capture {name} must be a finite value >= 0, got {value}"
                )));
            }
        }
        Ok(())
    }

    pub fn pause(&self) -> Duration {
        Duration::try_from_secs_f64(self.pause_secs.max(0.0)).unwrap_or_default()
    }

    pub fn nudge(&self) -> Duration {
        Duration::try_from_secs_f64(self.nudge_secs.max(0.0)).unwrap_or_default()
    }
}

#[derive(thiserror::Error, Debug)]
pub enum CaptureError {
    #[error("frame store failure: {0}")]
    Store(String),
    #[error("image encoding failed: {0}")]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Log(#[from] LogError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Config(#[from] StageError),
}
