use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::bearing::{bearing, drop_bearing};
use crate::interfaces::ArmPose;
use crate::prelude::{StageError, StageResult};

/// Drop location for one circuit slot: workspace point plus the part's
/// desired absolute orientation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DropTarget {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub theta_deg: f64,
}

impl DropTarget {
    pub fn new(x: f64, y: f64, z: f64, theta_deg: f64) -> Self {
        Self { x, y, z, theta_deg }
    }
}

/// Actuator and motion constants for the arm.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArmConfig {
    /// Gripper steps for a half turn of yaw.
    pub steps_per_half_turn: f64,
    pub pick_approach_z: f64,
    pub pick_grasp_z: f64,
    pub pick_theta0_4: f64,
    pub drop_theta0_4: f64,
    /// Height above the drop point the arm descends from.
    pub drop_clearance: f64,
    /// Drop-off zero reference between the raw bearing and gripper yaw.
    pub drop_zero_offset_deg: f64,
    pub home: ArmPose,
    pub reject_bin: DropTarget,
    pub grip_settle_secs: f64,
    pub release_settle_secs: f64,
}

impl Default for ArmConfig {
    fn default() -> Self {
        Self {
            steps_per_half_turn: 512.0,
            pick_approach_z: 25.0,
            pick_grasp_z: 21.0,
            pick_theta0_4: -90.0,
            drop_theta0_4: -95.0,
            drop_clearance: 15.0,
            drop_zero_offset_deg: 90.0,
            home: ArmPose::new(10.0, 0.0, 25.0, 0.0),
            reject_bin: DropTarget::new(-10.0, -15.0, 12.0, 0.0),
            grip_settle_secs: 3.5,
            release_settle_secs: 2.5,
        }
    }
}

impl ArmConfig {
    pub fn validate(&self) -> StageResult<()> {
        if !(self.steps_per_half_turn.is_finite() && self.steps_per_half_turn > 0.0) {
            return Err(StageError::Config(format!(
                "gripper steps per half turn must be > 0, got {}",
                self.steps_per_half_turn
            )));
        }
        for (name, value) in [
            ("grip settle", self.grip_settle_secs),
            ("release settle", self.release_settle_secs),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(StageError::Config(format!(
                    "{name} time must be a finite value >= 0, got {value}"
                )));
            }
        }
        Ok(())
    }

    pub fn grip_settle(&self) -> Duration {
        Duration::from_secs_f64(self.grip_settle_secs)
    }

    pub fn release_settle(&self) -> Duration {
        Duration::from_secs_f64(self.release_settle_secs)
    }
}

/// Converts a yaw angle into gripper steps: `round(angle / 180 * steps_per_half_turn)`.
pub fn angle_to_steps(angle_deg: f64, steps_per_half_turn: f64) -> i32 {
    (angle_deg / 180.0 * steps_per_half_turn).round() as i32
}

/// Motion sequence for picking a part.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PickPlan {
    pub approach: ArmPose,
    pub grasp: ArmPose,
    pub home: ArmPose,
    pub bearing_deg: f64,
    pub gripper_angle_deg: f64,
    pub gripper_steps: i32,
}

/// Motion sequence for releasing a part.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DropPlan {
    pub approach: ArmPose,
    pub release: ArmPose,
    pub home: ArmPose,
    pub raw_bearing_deg: f64,
    pub gripper_angle_deg: f64,
    pub gripper_steps: i32,
}

/// Pick at `(x, y)` in arm space: approach from above, descend to the grasp
/// band, yaw the gripper to `bearing(x, y) + offset`.
pub fn pick_pose(x: f64, y: f64, offset_deg: f64, config: &ArmConfig) -> PickPlan {
    let bearing_deg = bearing(x, y);
    let gripper_angle_deg = bearing_deg + offset_deg;
    PickPlan {
        approach: ArmPose::new(x, y, config.pick_approach_z, config.pick_theta0_4),
        grasp: ArmPose::new(x, y, config.pick_grasp_z, config.pick_theta0_4),
        home: config.home,
        bearing_deg,
        gripper_angle_deg,
        gripper_steps: angle_to_steps(gripper_angle_deg, config.steps_per_half_turn),
    }
}

/// Drop at `(x, y, z)` so the part ends up at `desired_angle_deg` in absolute
/// terms.
///
/// `delta = (raw - 90) + desired`; at or left of the base (`x <= 0`) the yaw is
/// `raw + delta`, right of it `raw - delta`, then wrapped to `[0, 360)`.
/// The asymmetric branch is kept as measured on the rig.
pub fn drop_pose(
    x: f64,
    y: f64,
    z: f64,
    desired_angle_deg: f64,
    config: &ArmConfig,
) -> DropPlan {
    let raw = drop_bearing(x, y);
    let zero_offset = raw - config.drop_zero_offset_deg;
    let delta = zero_offset + desired_angle_deg;
    let combined = if x <= 0.0 { raw + delta } else { raw - delta };
    let gripper_angle_deg = combined.rem_euclid(360.0);
    DropPlan {
        approach: ArmPose::new(x, y, z + config.drop_clearance, config.drop_theta0_4),
        release: ArmPose::new(x, y, z, config.drop_theta0_4),
        home: config.home,
        raw_bearing_deg: raw,
        gripper_angle_deg,
        gripper_steps: angle_to_steps(gripper_angle_deg, config.steps_per_half_turn),
    }
}
