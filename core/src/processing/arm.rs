use log::warn;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

use super::belt::{run_belt, BeltConfig};
use super::load_detection_log;
use crate::catalog::CircuitTable;
use crate::detection_log::{DetectionRecord, FrameIndex};
use crate::geometry::{
    drop_pose, frame_to_arm, pick_pose, skew_to_pickup_offset, ArmConfig, DropPlan, DropTarget,
    PickPlan,
};
use crate::interfaces::{CollaboratorError, CollaboratorResult, Delay, KinematicsController, MotorDriver};
use crate::prelude::{PipelineStage, StageConfig, StageError, StageReport, StageResult};
use crate::telemetry::{AuditTrail, StageMetrics};

/// Where a picked part is released.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Destination {
    Slot { circuit: String, part: String },
    RejectBin { reason: String },
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Slot { circuit, part } => write!(f, "{circuit}/{part}"),
            Destination::RejectBin { reason } => write!(f, "reject bin ({reason})"),
        }
    }
}

/// Full motion plan for one record, computed without touching hardware.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordPlan {
    pub frame_index: FrameIndex,
    pub sequence_index: usize,
    pub arm_xy: (f64, f64),
    pub pickup_offset_deg: f64,
    pub pick: PickPlan,
    pub destination: Destination,
    pub target: DropTarget,
    pub drop: DropPlan,
}

fn drop_target_for(
    record: &DetectionRecord,
    table: &CircuitTable,
    config: &ArmConfig,
) -> (Destination, DropTarget) {
    let reject = |reason: String| (Destination::RejectBin { reason }, config.reject_bin);
    let Some(part) = record.mapped_part.as_deref() else {
        return reject("no mapped part".into());
    };
    let source = record.requested_source.clone().reconcile(table);
    let Some(circuit) = source.circuit_name() else {
        return reject(format!("{part} was requested without a circuit"));
    };
    match table.drop_target(circuit, part) {
        Some(target) => (
            Destination::Slot {
                circuit: circuit.to_string(),
                part: part.to_uppercase(),
            },
            target,
        ),
        None => reject(format!("{circuit} has no slot for {part}")),
    }
}

/// Pick and drop plans for one record: detector centroid to arm space, skew
/// to pickup offset, then the circuit slot or the reject bin.
pub fn plan_record(record: &DetectionRecord, table: &CircuitTable, config: &ArmConfig) -> RecordPlan {
    let (x, y) = frame_to_arm(record.centroid.0, record.centroid.1);
    let pickup_offset_deg = skew_to_pickup_offset(record.rotation_angle_deg);
    let pick = pick_pose(x, y, pickup_offset_deg, config);
    let (destination, target) = drop_target_for(record, table, config);
    let drop = drop_pose(target.x, target.y, target.z, target.theta_deg, config);
    RecordPlan {
        frame_index: record.frame_index,
        sequence_index: record.sequence_index,
        arm_xy: (x, y),
        pickup_offset_deg,
        pick,
        destination,
        target,
        drop,
    }
}

/// Picks every recorded part off the belt and releases it into its slot.
pub struct ArmStage<K: KinematicsController, M: MotorDriver, D: Delay> {
    arm: K,
    belt: M,
    delay: D,
    config: ArmConfig,
    belt_config: BeltConfig,
    stage: Option<StageConfig>,
    metrics: StageMetrics,
    audit: AuditTrail,
}

impl<K: KinematicsController, M: MotorDriver, D: Delay> ArmStage<K, M, D> {
    pub fn new(arm: K, belt: M, delay: D, config: ArmConfig, belt_config: BeltConfig) -> Self {
        Self {
            arm,
            belt,
            delay,
            config,
            belt_config,
            stage: None,
            metrics: StageMetrics::new(),
            audit: AuditTrail::new("arm"),
        }
    }

    pub fn arm(&self) -> &K {
        &self.arm
    }

    fn execute_pick(&mut self, pick: &PickPlan) -> CollaboratorResult<()> {
        self.arm.set_gripper(pick.gripper_steps)?;
        self.arm.move_to(&pick.approach)?;
        self.arm.move_to(&pick.grasp)?;
        self.arm.close_gripper()?;
        self.delay.wait(self.config.grip_settle());
        self.arm.move_to(&pick.approach)?;
        self.arm.move_to(&pick.home)
    }

    fn execute_drop(&mut self, drop: &DropPlan) -> CollaboratorResult<()> {
        self.arm.set_gripper(drop.gripper_steps)?;
        self.arm.move_to(&drop.approach)?;
        self.arm.move_to(&drop.release)?;
        self.arm.open_gripper()?;
        self.delay.wait(self.config.release_settle());
        self.arm.move_to(&drop.home)?;
        self.arm.rest()
    }

    fn handle_record(&mut self, record: &DetectionRecord, table: &CircuitTable, report: &mut StageReport) {
        let plan = plan_record(record, table, &self.config);
        self.audit.record(&format!(
            "frame {} record {}: pick at ({:.2}, {:.2}) bearing {:.2}° offset {:.2}° -> {} steps",
            plan.frame_index,
            plan.sequence_index,
            plan.arm_xy.0,
            plan.arm_xy.1,
            plan.pick.bearing_deg,
            plan.pickup_offset_deg,
            plan.pick.gripper_steps,
        ));
        match &plan.destination {
            Destination::RejectBin { reason } => self.audit.flag(&format!(
                "frame {} record {}: to reject bin, {reason}",
                plan.frame_index, plan.sequence_index
            )),
            Destination::Slot { .. } => self.audit.record(&format!(
                "frame {} record {}: drop at {} raw bearing {:.2}° yaw {:.2}° -> {} steps",
                plan.frame_index,
                plan.sequence_index,
                plan.destination,
                plan.drop.raw_bearing_deg,
                plan.drop.gripper_angle_deg,
                plan.drop.gripper_steps,
            )),
        }

        let outcome = self
            .execute_pick(&plan.pick)
            .and_then(|()| self.execute_drop(&plan.drop));
        match outcome {
            Ok(()) => self.metrics.record_processed(),
            Err(err) => {
                if let Err(rest_err) = self.arm.rest() {
                    warn!("arm failed to return to rest: {rest_err}");
                }
                match err {
                    CollaboratorError::Unreachable { .. } => {
                        self.audit.flag(&format!(
                            "frame {} record {}: skipped, {err}",
                            plan.frame_index, plan.sequence_index
                        ));
                        self.metrics.record_skipped();
                    }
                    _ => {
                        warn!(
                            "frame {} record {}: arm failure: {err}",
                            plan.frame_index, plan.sequence_index
                        );
                        self.metrics.record_failed();
                    }
                }
                report.notes.push(format!(
                    "frame {} record {}: {err}",
                    plan.frame_index, plan.sequence_index
                ));
            }
        }
    }
}

impl<K: KinematicsController, M: MotorDriver, D: Delay> PipelineStage for ArmStage<K, M, D> {
    fn name(&self) -> &'static str {
        "arm"
    }

    fn initialize(&mut self, config: &StageConfig) -> StageResult<()> {
        self.config.validate()?;
        self.belt_config.validate()?;
        self.stage = Some(config.clone());
        self.metrics.reset();
        Ok(())
    }

    fn execute(&mut self) -> StageResult<StageReport> {
        let stage = self
            .stage
            .clone()
            .ok_or_else(|| StageError::Internal("stage not initialized".into()))?;
        let log = load_detection_log(&stage.detection_log)?;
        let table = CircuitTable::load_or_empty(&stage.circuits_file);
        let mut report = StageReport::new(self.name());

        let (first, second): (Vec<_>, Vec<_>) = log
            .records
            .iter()
            .partition(|record| record.frame_index == FrameIndex::First);

        for record in &first {
            self.handle_record(record, &table, &mut report);
        }
        if !second.is_empty() {
            let nudge = Duration::from_secs_f64(self.belt_config.inter_frame_nudge_secs);
            self.audit.record(&format!(
                "advancing belt {:.2}s for frame 2",
                self.belt_config.inter_frame_nudge_secs
            ));
            if let Err(err) = run_belt(&mut self.belt, &mut self.delay, nudge, self.belt_config.settle()) {
                warn!("inter-frame nudge failed: {err}");
                report.notes.push(format!("inter-frame nudge: {err}"));
            }
            for record in &second {
                self.handle_record(record, &table, &mut report);
            }
        }

        self.metrics.fill(&mut report);
        Ok(report)
    }

    fn cleanup(&mut self) {
        if let Err(err) = self.arm.rest() {
            warn!("arm failed to rest during cleanup: {err}");
        }
        self.stage = None;
    }
}
