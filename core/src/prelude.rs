use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::interfaces::CollaboratorError;

/// File locations shared by every stage of one sorting run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageConfig {
    pub detection_log: PathBuf,
    pub circuits_file: PathBuf,
    pub request_file: PathBuf,
}

/// Summary produced by each stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StageReport {
    pub stage: String,
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub notes: Vec<String>,
}

impl StageReport {
    pub fn new(stage: &str) -> Self {
        Self {
            stage: stage.to_string(),
            ..Default::default()
        }
    }
}

/// Common error type for stage execution.
#[derive(thiserror::Error, Debug)]
pub enum StageError {
    #[error("input missing: {0}")]
    InputMissing(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("collaborator failure: {0}")]
    Collaborator(#[from] CollaboratorError),
    #[error("internal failure: {0}")]
    Internal(String),
}

impl StageError {
    /// Only missing input stops a run; everything else is recorded per item.
    pub fn is_fatal(&self) -> bool {
        matches!(self, StageError::InputMissing(_) | StageError::Io(_))
    }
}

pub type StageResult<T> = Result<T, StageError>;

/// Trait describing the downstream stages sequenced after vision capture.
pub trait PipelineStage {
    fn name(&self) -> &'static str;
    fn initialize(&mut self, config: &StageConfig) -> StageResult<()>;
    fn execute(&mut self) -> StageResult<StageReport>;
    fn cleanup(&mut self);
}
