use anyhow::Context;
use chipsortcore::capture::{run_capture, CaptureSession, CaptureStateMachine, FrameStore};
use chipsortcore::catalog::RequestedSource;
use chipsortcore::detection_log::{DetectionLogReader, DetectionLogWriter, DetectionRecord};
use chipsortcore::interfaces::{Delay, FrameEvent, KinematicsController, MotorDriver, OcrEngine};
use chipsortcore::prelude::{PipelineStage, StageConfig, StageReport};
use chipsortcore::processing::{ArmStage, BeltStage, OcrStage};
use log::{info, warn};
use serde::Serialize;
use std::path::Path;
use tokio::runtime::Builder as TokioBuilder;
use tokio::sync::mpsc;

use crate::workflow::config::WorkflowConfig;

/// Everything a run needs from the physical line.
pub trait LineCollaborators {
    type Motor: MotorDriver + Send + 'static;
    type Ocr: OcrEngine;
    type Arm: KinematicsController;
    type Delay: Delay;

    fn motor(&self) -> Self::Motor;
    fn frame_store(&self, save_folder: &Path) -> Box<dyn FrameStore + Send>;
    /// Called from inside the capture runtime.
    fn frame_source(&self) -> mpsc::Receiver<FrameEvent>;
    fn ocr(&self) -> Self::Ocr;
    fn arm(&self) -> Self::Arm;
    fn delay(&self) -> Self::Delay;
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub frame_status: String,
    pub request: String,
    pub reports: Vec<StageReport>,
    pub records: Vec<DetectionRecord>,
}

#[derive(Clone)]
pub struct Runner {
    config: WorkflowConfig,
}

impl Runner {
    pub fn new(config: WorkflowConfig) -> Self {
        Self { config }
    }

    /// Vision, frame check, OCR, belt transfer, arm. The belt is switched off
    /// if any step aborts the run.
    pub fn execute<L: LineCollaborators>(&self, line: &L) -> anyhow::Result<RunSummary> {
        let result = self.run_stages(line);
        if result.is_err() {
            if let Err(err) = line.motor().motor_off() {
                warn!("failed to stop belt after aborted run: {err}");
            }
        }
        result
    }

    fn run_stages<L: LineCollaborators>(&self, line: &L) -> anyhow::Result<RunSummary> {
        let stage_config = self.config.to_stage_config();
        let request = RequestedSource::read_request_file(&self.config.request_file)
            .context("reading request file")?;
        info!("request: {request}");

        let session = self.capture(line).context("running vision stage")?;
        info!("vision finished in phase '{}'", session.phase());
        anyhow::ensure!(
            session.have_frame1,
            "vision stage never captured frame 1, so this run has no detection log"
        );

        let log = DetectionLogReader::read(&self.config.detection_log)
            .context("detection log not found after vision stage")?;
        let frame_status = log.frame_status().to_string();
        println!("Detection file status: {frame_status}");

        let mut reports = Vec::new();
        let mut ocr = OcrStage::new(line.ocr(), self.config.ocr.clone());
        reports.push(run_stage(&mut ocr, &stage_config)?);

        let mut belt = BeltStage::new(line.motor(), line.delay(), self.config.belt.clone());
        reports.push(run_stage(&mut belt, &stage_config)?);

        let mut arm = ArmStage::new(
            line.arm(),
            line.motor(),
            line.delay(),
            self.config.arm.clone(),
            self.config.belt.clone(),
        );
        reports.push(run_stage(&mut arm, &stage_config)?);

        let records = DetectionLogReader::read(&self.config.detection_log)
            .context("re-reading detection log")?
            .records;
        Ok(RunSummary {
            frame_status,
            request: request.to_string(),
            reports,
            records,
        })
    }

    fn capture<L: LineCollaborators>(&self, line: &L) -> anyhow::Result<CaptureSession> {
        let runtime = TokioBuilder::new_multi_thread()
            .enable_all()
            .build()
            .context("creating runtime for capture")?;
        let mut machine = CaptureStateMachine::new(
            self.config.capture.clone(),
            Box::new(line.motor()),
            line.frame_store(&self.config.save_folder),
            DetectionLogWriter::new(&self.config.detection_log),
        );
        let session = CaptureSession::new(self.config.multi_capture_requested());
        let session = runtime.block_on(async {
            let frames = line.frame_source();
            run_capture(&mut machine, session, frames).await
        })?;
        Ok(session)
    }
}

/// Initialize, execute, clean up. Fatal stage errors abort the run; any
/// other stage error is reported and the run continues.
fn run_stage<S: PipelineStage>(stage: &mut S, config: &StageConfig) -> anyhow::Result<StageReport> {
    let name = stage.name();
    stage
        .initialize(config)
        .with_context(|| format!("initializing {name} stage"))?;
    let result = stage.execute();
    stage.cleanup();
    match result {
        Ok(report) => {
            println!(
                "{name}: processed {}, skipped {}, failed {}",
                report.processed, report.skipped, report.failed
            );
            Ok(report)
        }
        Err(err) if err.is_fatal() => Err(err).with_context(|| format!("executing {name} stage")),
        Err(err) => {
            warn!("{name} stage failed: {err}");
            let mut report = StageReport::new(name);
            report.failed = 1;
            report.notes.push(err.to_string());
            Ok(report)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::scenario::ScenarioConfig;
    use crate::sim::SimulatedLine;
    use std::fs;
    use tempfile::tempdir;

    fn config(dir: &Path, multi_capture: bool) -> WorkflowConfig {
        let circuits = dir.join("circuits.txt");
        fs::write(
            &circuits,
            "CIRCUIT1 = [\n  \"1. SN74185AN (20, 5, 12, 0)\",\n  \"2. LM745 (-15, 10, 12.5, 90)\",\n]\n",
        )
        .unwrap();
        let mut cfg = WorkflowConfig::from_args(dir.to_path_buf(), circuits);
        cfg.capture.multi_capture = multi_capture;
        cfg.capture.pause_secs = 0.1;
        // about four frames of belt travel
        cfg.capture.nudge_secs = 0.2;
        cfg.scenario = ScenarioConfig {
            seed: 3,
            chip_count: 2,
            chips_per_row: 2,
            chip_size: 0.2,
            belt_speed: 2.0,
            noise: 0.0,
            parts: vec!["SN74185AN".into(), "LM745".into()],
            ..Default::default()
        };
        cfg
    }

    #[test]
    fn offline_line_runs_every_stage() {
        let dir = tempdir().unwrap();
        let cfg = config(dir.path(), false);
        RequestedSource::circuit("CIRCUIT1")
            .write_request_file(&cfg.request_file)
            .unwrap();
        let line = SimulatedLine::new(&cfg.scenario).unwrap();
        let summary = Runner::new(cfg.clone()).execute(&line).unwrap();

        assert_eq!(summary.frame_status, "Frame1 only");
        assert_eq!(summary.request, "CIRCUIT1");
        let names: Vec<_> = summary.reports.iter().map(|r| r.stage.as_str()).collect();
        assert_eq!(names, ["ocr", "belt", "arm"]);
        assert_eq!(summary.records.len(), 2);
        for record in &summary.records {
            assert_eq!(record.mapped_part, record.best_known_part);
            assert_eq!(record.match_ratio, 1.0);
        }
        assert!(!line.belt().is_running());
        assert!(dir.path().join("chip.png").exists());
    }

    #[test]
    fn two_frame_run_records_both_frames() {
        let dir = tempdir().unwrap();
        let mut cfg = config(dir.path(), true);
        cfg.scenario.chip_count = 4;
        let line = SimulatedLine::new(&cfg.scenario).unwrap();
        let summary = Runner::new(cfg).execute(&line).unwrap();
        assert_eq!(summary.frame_status, "Frame1+2");
        assert_eq!(summary.request, "None");
        assert!(dir.path().join("chip2.png").exists());
        assert!(summary.records.iter().all(|record| record.mapped_part.is_none()));
    }

    #[test]
    fn missing_log_aborts_the_run() {
        let dir = tempdir().unwrap();
        let mut cfg = config(dir.path(), false);
        // nothing ever crosses the trigger line
        cfg.capture.trigger_y = 2.0;
        cfg.detection_log = dir.path().join("never_written.txt");
        let line = SimulatedLine::new(&cfg.scenario).unwrap();
        let err = Runner::new(cfg).execute(&line).unwrap_err();
        assert!(format!("{err:#}").contains("detection log"));
        assert!(!line.belt().is_running());
    }

    #[test]
    fn second_run_without_trigger_does_not_reuse_first_log() {
        let dir = tempdir().unwrap();
        let mut cfg = config(dir.path(), false);
        let line = SimulatedLine::new(&cfg.scenario).unwrap();
        let first = Runner::new(cfg.clone()).execute(&line).unwrap();
        assert_eq!(first.records.len(), 2);

        cfg.capture.trigger_y = 2.0;
        let line = SimulatedLine::new(&cfg.scenario).unwrap();
        let err = Runner::new(cfg.clone()).execute(&line).unwrap_err();
        assert!(format!("{err:#}").contains("never captured frame 1"));
        assert!(!cfg.detection_log.exists());
        assert!(!line.belt().is_running());
    }
}
