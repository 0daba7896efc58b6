use chipsortcore::interfaces::{ArmPose, CollaboratorError, CollaboratorResult, KinematicsController};
use log::debug;

/// Arm stand-in with an annular reach envelope around its base.
pub struct SimArm {
    min_reach: f64,
    max_reach: f64,
    moves: usize,
    gripper_steps: i32,
    holding: bool,
}

impl SimArm {
    pub fn new(min_reach: f64, max_reach: f64) -> Self {
        Self {
            min_reach,
            max_reach,
            moves: 0,
            gripper_steps: 0,
            holding: false,
        }
    }

    #[cfg(test)]
    pub fn moves(&self) -> usize {
        self.moves
    }

    #[cfg(test)]
    pub fn gripper_steps(&self) -> i32 {
        self.gripper_steps
    }

    #[cfg(test)]
    pub fn is_holding(&self) -> bool {
        self.holding
    }
}

impl Default for SimArm {
    fn default() -> Self {
        Self::new(4.0, 30.0)
    }
}

impl KinematicsController for SimArm {
    fn move_to(&mut self, pose: &ArmPose) -> CollaboratorResult<()> {
        let radius = pose.x.hypot(pose.y);
        if radius < self.min_reach || radius > self.max_reach {
            return Err(CollaboratorError::Unreachable {
                pose: *pose,
                reason: format!(
                    "radius {radius:.2} outside {:.1}..{:.1}",
                    self.min_reach, self.max_reach
                ),
            });
        }
        self.moves += 1;
        debug!("sim arm -> {pose}");
        Ok(())
    }

    fn set_gripper(&mut self, steps: i32) -> CollaboratorResult<()> {
        self.gripper_steps = steps;
        Ok(())
    }

    fn close_gripper(&mut self) -> CollaboratorResult<()> {
        self.holding = true;
        debug!(
            "sim arm grips at {} steps after {} moves",
            self.gripper_steps, self.moves
        );
        Ok(())
    }

    fn open_gripper(&mut self) -> CollaboratorResult<()> {
        if !self.holding {
            debug!("sim arm opened an empty gripper");
        }
        self.holding = false;
        Ok(())
    }

    fn rest(&mut self) -> CollaboratorResult<()> {
        self.gripper_steps = 0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poses_outside_the_envelope_are_unreachable() {
        let mut arm = SimArm::default();
        assert!(arm.move_to(&ArmPose::new(18.5, 0.0, 25.0, -90.0)).is_ok());
        assert!(matches!(
            arm.move_to(&ArmPose::new(1.0, 1.0, 25.0, -90.0)),
            Err(CollaboratorError::Unreachable { .. })
        ));
        assert!(arm.move_to(&ArmPose::new(40.0, 0.0, 25.0, -90.0)).is_err());
        assert_eq!(arm.moves(), 1);
    }

    #[test]
    fn gripper_state_follows_commands() {
        let mut arm = SimArm::default();
        arm.set_gripper(-128).unwrap();
        arm.close_gripper().unwrap();
        assert!(arm.is_holding());
        assert_eq!(arm.gripper_steps(), -128);
        arm.open_gripper().unwrap();
        arm.rest().unwrap();
        assert!(!arm.is_holding());
        assert_eq!(arm.gripper_steps(), 0);
    }
}
