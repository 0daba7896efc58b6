use serde::{Deserialize, Serialize};
use std::fmt;

use super::CollaboratorResult;

/// Target for the arm: a workspace point plus the wrist pitch `theta0_4`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArmPose {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub theta0_4: f64,
}

impl ArmPose {
    pub fn new(x: f64, y: f64, z: f64, theta0_4: f64) -> Self {
        Self { x, y, z, theta0_4 }
    }
}

impl fmt::Display for ArmPose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({:.2}, {:.2}, {:.2}) θ0-4={:.1}",
            self.x, self.y, self.z, self.theta0_4
        )
    }
}

/// Inverse-kinematics and actuation collaborator. Every call returns once the
/// motion has completed.
pub trait KinematicsController {
    fn move_to(&mut self, pose: &ArmPose) -> CollaboratorResult<()>;
    fn set_gripper(&mut self, steps: i32) -> CollaboratorResult<()>;
    fn close_gripper(&mut self) -> CollaboratorResult<()>;
    fn open_gripper(&mut self) -> CollaboratorResult<()>;
    fn rest(&mut self) -> CollaboratorResult<()>;
}
