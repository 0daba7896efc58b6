//! Detector-to-arm geometry: coordinate transform, skew normalization,
//! bearings and the pick/drop plans built from them.

pub mod bearing;
pub mod pose;
pub mod transform;

pub use bearing::{bearing, drop_bearing};
pub use pose::{angle_to_steps, drop_pose, pick_pose, ArmConfig, DropPlan, DropTarget, PickPlan};
pub use transform::{frame_to_arm, skew_to_pickup_offset};
