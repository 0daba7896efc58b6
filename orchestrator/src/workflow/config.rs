use anyhow::Context;
use chipsortcore::capture::CaptureConfig;
use chipsortcore::geometry::ArmConfig;
use chipsortcore::prelude::StageConfig;
use chipsortcore::processing::{BeltConfig, OcrStageConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::generator::scenario::ScenarioConfig;

pub const DETECTION_LOG_NAME: &str = "latest_detection.txt";
pub const REQUEST_FILE_NAME: &str = "chip_request_input.txt";
pub const MULTI_CAPTURE_FLAG_NAME: &str = "multi_capture.flag";

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub save_folder: PathBuf,
    pub detection_log: PathBuf,
    pub circuits_file: PathBuf,
    pub request_file: PathBuf,
    /// Presence of this file requests a second frame.
    pub multi_capture_flag: PathBuf,
    pub capture: CaptureConfig,
    pub ocr: OcrStageConfig,
    pub belt: BeltConfig,
    pub arm: ArmConfig,
    pub scenario: ScenarioConfig,
    pub bridge_port: u16,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self::from_args(PathBuf::from("captures"), PathBuf::from("demos/circuits.txt"))
    }
}

impl WorkflowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workflow config {}", path_ref.display()))?;
        let config: WorkflowConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing workflow config {}", path_ref.display()))?;
        Ok(config)
    }

    /// Every run file lives in the save folder; the circuit table is shared.
    pub fn from_args(save_folder: PathBuf, circuits_file: PathBuf) -> Self {
        Self {
            detection_log: save_folder.join(DETECTION_LOG_NAME),
            request_file: save_folder.join(REQUEST_FILE_NAME),
            multi_capture_flag: save_folder.join(MULTI_CAPTURE_FLAG_NAME),
            save_folder,
            circuits_file,
            capture: CaptureConfig::default(),
            ocr: OcrStageConfig::default(),
            belt: BeltConfig::default(),
            arm: ArmConfig::default(),
            scenario: ScenarioConfig::default(),
            bridge_port: 9000,
        }
    }

    pub fn to_stage_config(&self) -> StageConfig {
        StageConfig {
            detection_log: self.detection_log.clone(),
            circuits_file: self.circuits_file.clone(),
            request_file: self.request_file.clone(),
        }
    }

    pub fn multi_capture_requested(&self) -> bool {
        self.capture.multi_capture || self.multi_capture_flag.exists()
    }

    /// Creates or removes the multi-capture flag file.
    pub fn set_multi_capture_flag(&self, enabled: bool) -> anyhow::Result<()> {
        let flag = &self.multi_capture_flag;
        if enabled {
            if let Some(parent) = flag.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
            fs::write(flag, b"")
                .with_context(|| format!("writing multi-capture flag {}", flag.display()))?;
        } else if flag.exists() {
            fs::remove_file(flag)
                .with_context(|| format!("removing multi-capture flag {}", flag.display()))?;
        }
        Ok(())
    }
}
