//! Downstream stages sequenced after vision capture. Each one re-reads the
//! detection log, which is the only handoff between them.

pub mod arm;
pub mod belt;
pub mod ocr;

pub use arm::{plan_record, ArmStage, Destination, RecordPlan};
pub use belt::{run_belt, BeltConfig, BeltStage};
pub use ocr::{OcrStage, OcrStageConfig};

use std::path::Path;

use crate::detection_log::{DetectionLogReader, LogError, ParsedLog};
use crate::prelude::{StageError, StageResult};

impl From<LogError> for StageError {
    fn from(err: LogError) -> Self {
        match err {
            LogError::Missing(path) => {
                StageError::InputMissing(format!("detection log {}", path.display()))
            }
            LogError::Io { source, .. } => StageError::Io(source),
        }
    }
}

/// Reads the log a stage starts from. An absent or blank log stops the run;
/// a log whose frames simply had no detections does not.
pub fn load_detection_log(path: &Path) -> StageResult<ParsedLog> {
    let log = DetectionLogReader::read(path)?;
    if log.is_blank() {
        return Err(StageError::InputMissing(format!(
            "detection log {} holds no frames",
            path.display()
        )));
    }
    if log.malformed > 0 {
        log::warn!(
            "{}: skipped {} malformed block(s)",
            path.display(),
            log.malformed
        );
    }
    Ok(log)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn absent_and_blank_logs_are_missing_input() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("latest_detection.txt");
        let err = load_detection_log(&path).unwrap_err();
        assert!(matches!(err, StageError::InputMissing(_)));
        assert!(err.is_fatal());

        fs::write(&path, "\n\n").unwrap();
        assert!(matches!(
            load_detection_log(&path),
            Err(StageError::InputMissing(_))
        ));
    }

    #[test]
    fn frames_without_detections_are_not_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("latest_detection.txt");
        fs::write(&path, "FRAME=1\nNo detections found\n\n").unwrap();
        let log = load_detection_log(&path).unwrap();
        assert!(log.crops.is_empty());
    }
}
