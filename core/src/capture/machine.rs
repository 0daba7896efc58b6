use log::{debug, warn};
use std::time::Duration;

use super::scheduler::{TimerQueue, TimerTask};
use super::session::CaptureSession;
use super::store::FrameStore;
use super::{CaptureConfig, CaptureError};
use crate::detection_log::{Crop, DetectionLogWriter, FrameGroup, FrameIndex};
use crate::interfaces::{FrameEvent, MotorDriver};
use crate::telemetry::AuditTrail;

/// What the vision pipeline should do after a frame has been handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameDecision {
    Continue,
    Stop,
}

/// Decides when frames are taken and drives the belt between them.
///
/// Frame 1 is taken once a detection has travelled past `trigger_y`. With
/// multi-capture the belt then pauses, nudges and stops on the timer queue,
/// and the first frame after that is taken as frame 2 with no position test.
pub struct CaptureStateMachine {
    config: CaptureConfig,
    motor: Box<dyn MotorDriver + Send>,
    store: Box<dyn FrameStore + Send>,
    writer: DetectionLogWriter,
    audit: AuditTrail,
}

impl CaptureStateMachine {
    pub fn new(
        config: CaptureConfig,
        motor: Box<dyn MotorDriver + Send>,
        store: Box<dyn FrameStore + Send>,
        writer: DetectionLogWriter,
    ) -> Self {
        Self {
            config,
            motor,
            store,
            writer,
            audit: AuditTrail::new("vision"),
        }
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    pub fn writer(&self) -> &DetectionLogWriter {
        &self.writer
    }

    pub fn on_frame(
        &mut self,
        session: &mut CaptureSession,
        event: &FrameEvent,
        now: Duration,
        timers: &mut TimerQueue,
    ) -> Result<FrameDecision, CaptureError> {
        if session.is_finished() {
            return Ok(FrameDecision::Stop);
        }
        if !event.has_valid_dimensions() {
            debug!("dropping frame with invalid dimensions {}x{}", event.width, event.height);
            return Ok(FrameDecision::Continue);
        }

        if !session.have_frame1 {
            let triggered = event
                .detections
                .iter()
                .any(|detection| detection.bbox.y1 > self.config.trigger_y);
            if !triggered {
                return Ok(FrameDecision::Continue);
            }

            self.set_motor(false);
            let group = self.persist(FrameIndex::First, event)?;
            self.writer.start_run(&group)?;
            session.have_frame1 = true;
            self.audit.record(&format!(
                "frame 1 captured with {} detection(s) at {:.2}s",
                group.crops.len(),
                now.as_secs_f64()
            ));

            if session.multi_capture_requested {
                session.need_frame2 = true;
                timers.schedule(now + self.config.pause(), TimerTask::StartNudge);
                return Ok(FrameDecision::Continue);
            }
            session.finish();
            return Ok(FrameDecision::Stop);
        }

        if session.ready_frame2 && !session.did_frame2 {
            let group = self.persist(FrameIndex::Second, event)?;
            self.writer.append_frame(&group)?;
            session.did_frame2 = true;
            session.finish();
            self.audit.record(&format!(
                "frame 2 captured with {} detection(s) at {:.2}s",
                group.crops.len(),
                now.as_secs_f64()
            ));
            return Ok(FrameDecision::Stop);
        }

        Ok(FrameDecision::Continue)
    }

    pub fn on_timer(
        &mut self,
        session: &mut CaptureSession,
        task: TimerTask,
        now: Duration,
        timers: &mut TimerQueue,
    ) {
        if session.is_finished() || !session.need_frame2 || session.ready_frame2 {
            return;
        }
        match task {
            TimerTask::StartNudge => {
                self.set_motor(true);
                timers.schedule(now + self.config.nudge(), TimerTask::StopNudge);
            }
            TimerTask::StopNudge => {
                self.set_motor(false);
                session.ready_frame2 = true;
                debug!("nudge complete at {:.2}s, waiting for frame 2", now.as_secs_f64());
            }
        }
    }

    /// Starts the belt carrying the batch under the camera.
    pub fn start_belt(&mut self) {
        self.set_motor(true);
    }

    /// Stops the belt once capture has ended, however it ended.
    pub fn stop_belt(&mut self) {
        self.set_motor(false);
    }

    fn set_motor(&mut self, on: bool) {
        let result = if on {
            self.motor.motor_on()
        } else {
            self.motor.motor_off()
        };
        if let Err(err) = result {
            warn!("belt motor {} failed: {}", if on { "on" } else { "off" }, err);
        }
    }

    fn persist(&mut self, frame: FrameIndex, event: &FrameEvent) -> Result<FrameGroup, CaptureError> {
        let mut boxes = Vec::with_capacity(event.detections.len());
        for detection in &event.detections {
            if detection.bbox.covers_pixels(event.width, event.height) {
                boxes.push(detection.bbox);
            } else {
                self.audit.flag(&format!(
                    "frame {frame}: skipping detection {} with no pixel area",
                    detection.bbox
                ));
            }
        }
        let saved = self.store.save_frame(frame, event, &boxes)?;
        let crops: Vec<Crop> = saved
            .crop_paths
            .into_iter()
            .zip(boxes)
            .enumerate()
            .map(|(offset, (crop_image_path, bbox))| Crop {
                full_image_path: saved.full_image_path.clone(),
                crop_image_path,
                frame_index: frame,
                sequence_index: offset + 1,
                bbox,
            })
            .collect();
        if crops.is_empty() {
            self.audit.record(&format!("frame {frame}: no detections, full frame only"));
        }
        Ok(FrameGroup {
            frame_index: frame,
            full_image_path: Some(saved.full_image_path),
            crops,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::detection_log::naming::{crop_file_name, full_frame_file_name};
    use crate::detection_log::DetectionLogReader;
    use crate::capture::store::{PngFrameStore, SavedFrame};
    use crate::interfaces::{BoundingBox, CollaboratorError, CollaboratorResult, Detection};
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};
    use tempfile::tempdir;

    /// Motor that records every level it was asked for.
    #[derive(Clone, Default)]
    pub(crate) struct RecordingMotor {
        pub levels: Arc<Mutex<Vec<bool>>>,
        pub fail: bool,
    }

    impl MotorDriver for RecordingMotor {
        fn motor_on(&mut self) -> CollaboratorResult<()> {
            self.levels.lock().unwrap().push(true);
            if self.fail {
                return Err(CollaboratorError::Actuation("line stuck".into()));
            }
            Ok(())
        }

        fn motor_off(&mut self) -> CollaboratorResult<()> {
            self.levels.lock().unwrap().push(false);
            if self.fail {
                return Err(CollaboratorError::Actuation("line stuck".into()));
            }
            Ok(())
        }
    }

    /// Store that only hands out names.
    pub(crate) struct NamingStore {
        pub folder: PathBuf,
    }

    impl FrameStore for NamingStore {
        fn save_frame(
            &mut self,
            frame: FrameIndex,
            _event: &FrameEvent,
            boxes: &[BoundingBox],
        ) -> Result<SavedFrame, CaptureError> {
            Ok(SavedFrame {
                full_image_path: self.folder.join(full_frame_file_name(frame)),
                crop_paths: (1..=boxes.len())
                    .map(|index| self.folder.join(crop_file_name(frame, index)))
                    .collect(),
            })
        }
    }

    pub(crate) fn frame_with(y1: &[f64]) -> FrameEvent {
        let detections = y1
            .iter()
            .map(|&y| Detection {
                label: "chip".into(),
                bbox: BoundingBox::new(0.2, y, 0.4, (y + 0.1).min(1.0)),
                confidence: 0.9,
            })
            .collect();
        FrameEvent::new(640, 480, detections)
    }

    pub(crate) fn machine(
        dir: &std::path::Path,
        motor: RecordingMotor,
        multi_capture: bool,
    ) -> CaptureStateMachine {
        CaptureStateMachine::new(
            CaptureConfig {
                multi_capture,
                ..Default::default()
            },
            Box::new(motor),
            Box::new(NamingStore {
                folder: dir.to_path_buf(),
            }),
            DetectionLogWriter::new(dir.join("latest_detection.txt")),
        )
    }

    fn secs(value: f64) -> Duration {
        Duration::from_secs_f64(value)
    }

    #[test]
    fn low_detections_never_trigger() {
        let dir = tempdir().unwrap();
        let motor = RecordingMotor::default();
        let mut sm = machine(dir.path(), motor.clone(), false);
        let mut session = CaptureSession::new(false);
        let mut timers = TimerQueue::new();
        for y in [0.0, 0.1, 0.39, 0.4] {
            let decision = sm
                .on_frame(&mut session, &frame_with(&[y]), secs(0.0), &mut timers)
                .unwrap();
            assert_eq!(decision, FrameDecision::Continue);
        }
        assert!(!session.have_frame1);
        assert!(motor.levels.lock().unwrap().is_empty());
        assert!(!dir.path().join("latest_detection.txt").exists());
    }

    #[test]
    fn single_capture_stops_after_frame_one() {
        let dir = tempdir().unwrap();
        let motor = RecordingMotor::default();
        let mut sm = machine(dir.path(), motor.clone(), false);
        let mut session = CaptureSession::new(false);
        let mut timers = TimerQueue::new();

        let decision = sm
            .on_frame(&mut session, &frame_with(&[0.2, 0.45]), secs(0.5), &mut timers)
            .unwrap();
        assert_eq!(decision, FrameDecision::Stop);
        assert!(session.is_finished());
        assert!(timers.is_empty());
        assert_eq!(*motor.levels.lock().unwrap(), vec![false]);

        let log = DetectionLogReader::read(dir.path().join("latest_detection.txt")).unwrap();
        assert_eq!(log.crops.len(), 2);
        assert_eq!(log.frame_status(), "Frame1 only");
    }

    #[test]
    fn frame_two_waits_for_pause_and_nudge() {
        let dir = tempdir().unwrap();
        let motor = RecordingMotor::default();
        let mut sm = machine(dir.path(), motor.clone(), true);
        let mut session = CaptureSession::new(true);
        let mut timers = TimerQueue::new();

        sm.on_frame(&mut session, &frame_with(&[0.5]), secs(0.0), &mut timers)
            .unwrap();
        assert_eq!(timers.next_due(), Some(secs(1.0)));

        // frames during the pause and the nudge are ignored
        for t in [0.1, 0.5, 0.99] {
            let decision = sm
                .on_frame(&mut session, &frame_with(&[0.9]), secs(t), &mut timers)
                .unwrap();
            assert_eq!(decision, FrameDecision::Continue);
        }
        let task = timers.pop_due(secs(1.0)).unwrap();
        sm.on_timer(&mut session, task, secs(1.0), &mut timers);
        assert_eq!(timers.next_due(), Some(secs(2.5)));
        for t in [1.2, 2.0, 2.49] {
            let decision = sm
                .on_frame(&mut session, &frame_with(&[]), secs(t), &mut timers)
                .unwrap();
            assert_eq!(decision, FrameDecision::Continue);
        }
        assert!(!session.did_frame2);

        let task = timers.pop_due(secs(2.5)).unwrap();
        sm.on_timer(&mut session, task, secs(2.5), &mut timers);
        assert!(session.ready_frame2);
        assert_eq!(*motor.levels.lock().unwrap(), vec![false, true, false]);

        // accepted without the position test, even with nothing detected
        let decision = sm
            .on_frame(&mut session, &frame_with(&[]), secs(2.6), &mut timers)
            .unwrap();
        assert_eq!(decision, FrameDecision::Stop);
        assert!(session.did_frame2);

        let log = DetectionLogReader::read(dir.path().join("latest_detection.txt")).unwrap();
        assert_eq!(log.frame_status(), "Frame1+2");
        assert_eq!(log.empty_frames, vec![FrameIndex::Second]);
    }

    #[test]
    fn latch_discards_late_frames_and_timers() {
        let dir = tempdir().unwrap();
        let motor = RecordingMotor::default();
        let mut sm = machine(dir.path(), motor.clone(), false);
        let mut session = CaptureSession::new(false);
        let mut timers = TimerQueue::new();
        sm.on_frame(&mut session, &frame_with(&[0.5]), secs(0.0), &mut timers)
            .unwrap();
        let before = std::fs::read_to_string(dir.path().join("latest_detection.txt")).unwrap();

        let decision = sm
            .on_frame(&mut session, &frame_with(&[0.8]), secs(0.1), &mut timers)
            .unwrap();
        assert_eq!(decision, FrameDecision::Stop);
        sm.on_timer(&mut session, TimerTask::StartNudge, secs(1.0), &mut timers);
        assert_eq!(*motor.levels.lock().unwrap(), vec![false]);
        let after = std::fs::read_to_string(dir.path().join("latest_detection.txt")).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn motor_failure_does_not_block_transitions() {
        let dir = tempdir().unwrap();
        let motor = RecordingMotor {
            fail: true,
            ..Default::default()
        };
        let mut sm = machine(dir.path(), motor, true);
        let mut session = CaptureSession::new(true);
        let mut timers = TimerQueue::new();
        sm.on_frame(&mut session, &frame_with(&[0.5]), secs(0.0), &mut timers)
            .unwrap();
        while let Some(due) = timers.next_due() {
            let task = timers.pop_due(due).unwrap();
            sm.on_timer(&mut session, task, due, &mut timers);
        }
        assert!(session.ready_frame2);
    }

    #[test]
    fn invalid_frames_are_no_ops() {
        let dir = tempdir().unwrap();
        let mut sm = machine(dir.path(), RecordingMotor::default(), false);
        let mut session = CaptureSession::new(false);
        let mut timers = TimerQueue::new();
        let mut event = frame_with(&[0.9]);
        event.width = 0;
        let decision = sm
            .on_frame(&mut session, &event, secs(0.0), &mut timers)
            .unwrap();
        assert_eq!(decision, FrameDecision::Continue);
        assert!(!session.have_frame1);
    }

    #[test]
    fn flat_box_is_skipped_and_the_rest_persisted() {
        let dir = tempdir().unwrap();
        let motor = RecordingMotor::default();
        let mut sm = CaptureStateMachine::new(
            CaptureConfig::default(),
            Box::new(motor.clone()),
            Box::new(PngFrameStore::new(dir.path())),
            DetectionLogWriter::new(dir.path().join("latest_detection.txt")),
        );
        let detection = |bbox: BoundingBox| Detection {
            label: "chip".into(),
            bbox,
            confidence: 0.9,
        };
        let event = FrameEvent::new(
            40,
            20,
            vec![
                detection(BoundingBox::new(0.2, 0.5, 0.4, 0.7)),
                detection(BoundingBox::new(0.6, 0.5, 0.6, 0.7)),
            ],
        )
        .with_pixels(vec![90; 40 * 20 * 3]);
        let mut session = CaptureSession::new(false);
        let mut timers = TimerQueue::new();

        let decision = sm
            .on_frame(&mut session, &event, secs(0.0), &mut timers)
            .unwrap();
        assert_eq!(decision, FrameDecision::Stop);
        assert!(session.have_frame1);
        assert_eq!(*motor.levels.lock().unwrap(), vec![false]);

        let log = DetectionLogReader::read(dir.path().join("latest_detection.txt")).unwrap();
        assert_eq!(log.crops.len(), 1);
        assert_eq!(log.crops[0].sequence_index, 1);
        assert!(dir.path().join(crop_file_name(FrameIndex::First, 1)).exists());
        assert!(!dir.path().join(crop_file_name(FrameIndex::First, 2)).exists());
    }
}
