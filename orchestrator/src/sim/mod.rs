//! Offline stand-ins for the belt, camera, OCR engine and arm, so the whole
//! pipeline can run without hardware.

pub mod arm;
pub mod belt;
pub mod ocr;
pub mod render;

use chipsortcore::capture::{FrameStore, PngFrameStore};
use chipsortcore::interfaces::FrameEvent;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::generator::scenario::{build_batch, ScenarioConfig, SimChip};
use crate::workflow::runner::LineCollaborators;
use arm::SimArm;
use belt::{SimBelt, SimDelay, SimMotor};
use ocr::SimOcr;
use render::{spawn_frame_source, MAX_CHIPS};

/// A seeded batch of chips on a simulated belt.
pub struct SimulatedLine {
    chips: Arc<Vec<SimChip>>,
    belt: SimBelt,
    frame_period: Duration,
}

impl SimulatedLine {
    pub fn new(config: &ScenarioConfig) -> anyhow::Result<Self> {
        anyhow::ensure!(
            config.chip_count <= MAX_CHIPS,
            "the simulated camera tells at most {MAX_CHIPS} chips apart"
        );
        anyhow::ensure!(config.belt_speed > 0.0, "belt speed must be > 0");
        Ok(Self {
            chips: Arc::new(build_batch(config)?),
            belt: SimBelt::new(config.belt_speed),
            frame_period: Duration::from_millis(50),
        })
    }

    pub fn chips(&self) -> &[SimChip] {
        &self.chips
    }

    pub fn belt(&self) -> &SimBelt {
        &self.belt
    }
}

impl LineCollaborators for SimulatedLine {
    type Motor = SimMotor;
    type Ocr = SimOcr;
    type Arm = SimArm;
    type Delay = SimDelay;

    fn motor(&self) -> SimMotor {
        SimMotor::new(self.belt.clone())
    }

    fn frame_store(&self, save_folder: &Path) -> Box<dyn FrameStore + Send> {
        Box::new(PngFrameStore::new(save_folder))
    }

    fn frame_source(&self) -> mpsc::Receiver<FrameEvent> {
        spawn_frame_source(self.chips.clone(), self.belt.clone(), self.frame_period)
    }

    fn ocr(&self) -> SimOcr {
        SimOcr::new(self.chips.clone())
    }

    fn arm(&self) -> SimArm {
        SimArm::default()
    }

    fn delay(&self) -> SimDelay {
        SimDelay::new(self.belt.clone())
    }
}
