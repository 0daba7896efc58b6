//! Capability interfaces for the collaborators the core drives but does not own.

pub mod delay;
pub mod kinematics;
pub mod motor;
pub mod ocr;
pub mod vision;

pub use delay::{Delay, ThreadDelay};
pub use kinematics::{ArmPose, KinematicsController};
pub use motor::{MotorDriver, SysfsGpioMotor};
pub use ocr::{AlignedCrop, OcrEngine};
pub use vision::{BoundingBox, Detection, FrameEvent};

/// Failure reported by an external collaborator.
#[derive(thiserror::Error, Debug)]
pub enum CollaboratorError {
    #[error("actuation failed: {0}")]
    Actuation(String),
    #[error("pose {pose} unreachable: {reason}")]
    Unreachable { pose: ArmPose, reason: String },
    #[error("recognition failed: {0}")]
    Recognition(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type CollaboratorResult<T> = Result<T, CollaboratorError>;
