use log::warn;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::interfaces::{CollaboratorResult, Delay, MotorDriver};
use crate::prelude::{PipelineStage, StageConfig, StageError, StageReport, StageResult};
use crate::telemetry::AuditTrail;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BeltConfig {
    /// Belt run that carries parts from the camera to the arm.
    pub transfer_secs: f64,
    pub settle_secs: f64,
    /// Belt run between the frame-1 and frame-2 picks.
    pub inter_frame_nudge_secs: f64,
}

impl Default for BeltConfig {
    fn default() -> Self {
        Self {
            transfer_secs: 9.25,
            settle_secs: 1.0,
            inter_frame_nudge_secs: 1.0,
        }
    }
}

impl BeltConfig {
    pub fn validate(&self) -> StageResult<()> {
        let positive = |value: f64| value.is_finite() && value > 0.0;
        if !positive(self.transfer_secs) {
            return Err(StageError::Config(format!(
                "belt transfer duration must be > 0, got {}",
                self.transfer_secs
            )));
        }
        if !positive(self.inter_frame_nudge_secs) {
            return Err(StageError::Config(format!(
                "inter-frame nudge must be > 0, got {}",
                self.inter_frame_nudge_secs
            )));
        }
        if !(self.settle_secs.is_finite() && self.settle_secs >= 0.0) {
            return Err(StageError::Config(format!(
                "belt settle time must be >= 0, got {}",
                self.settle_secs
            )));
        }
        Ok(())
    }

    pub fn settle(&self) -> Duration {
        Duration::from_secs_f64(self.settle_secs.max(0.0))
    }
}

/// Runs the belt for `run`, then always switches it off and waits `settle`.
pub fn run_belt<M: MotorDriver + ?Sized, D: Delay + ?Sized>(
    motor: &mut M,
    delay: &mut D,
    run: Duration,
    settle: Duration,
) -> CollaboratorResult<()> {
    let started = motor.motor_on();
    if started.is_ok() {
        delay.wait(run);
    }
    let stopped = motor.motor_off();
    delay.wait(settle);
    started?;
    stopped
}

/// Carries the captured batch from the camera to the arm.
pub struct BeltStage<M: MotorDriver, D: Delay> {
    motor: M,
    delay: D,
    config: BeltConfig,
    initialized: bool,
    audit: AuditTrail,
}

impl<M: MotorDriver, D: Delay> BeltStage<M, D> {
    pub fn new(motor: M, delay: D, config: BeltConfig) -> Self {
        Self {
            motor,
            delay,
            config,
            initialized: false,
            audit: AuditTrail::new("belt"),
        }
    }
}

impl<M: MotorDriver, D: Delay> PipelineStage for BeltStage<M, D> {
    fn name(&self) -> &'static str {
        "belt"
    }

    fn initialize(&mut self, _config: &StageConfig) -> StageResult<()> {
        self.config.validate()?;
        self.initialized = true;
        Ok(())
    }

    fn execute(&mut self) -> StageResult<StageReport> {
        if !self.initialized {
            return Err(StageError::Internal("stage not initialized".into()));
        }
        let mut report = StageReport::new(self.name());
        let run = Duration::from_secs_f64(self.config.transfer_secs);
        self.audit
            .record(&format!("transferring for {:.2}s", self.config.transfer_secs));
        match run_belt(&mut self.motor, &mut self.delay, run, self.config.settle()) {
            Ok(()) => report.processed = 1,
            Err(err) => {
                warn!("belt transfer failed: {err}");
                report.failed = 1;
                report.notes.push(err.to_string());
            }
        }
        Ok(report)
    }

    fn cleanup(&mut self) {
        if let Err(err) = self.motor.motor_off() {
            warn!("belt motor off during cleanup failed: {err}");
        }
        self.initialized = false;
    }
}
