use log::debug;
use std::fmt::Write as _;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::model::{DetectionRecord, FrameGroup};
use super::{
    LogError, ANGLE_KEY, CLOSEST_PART_KEY, COORDINATES_KEY, CROP_KEY, FRAME_HEADER_KEY, FRAME_KEY,
    MAPPED_PART_KEY, MATCH_RATIO_KEY, MIDDLE_POINT_KEY, NO_DETECTIONS_MARKER, ORIENTATION_KEY,
    RAW_TEXT_KEY, RECORD_DELIMITER, REQUESTED_KEY,
};

/// Formats a frame header plus its crop blocks, each ended by a blank line.
pub fn format_frame_group(group: &FrameGroup) -> String {
    let mut block = format!("{FRAME_HEADER_KEY}={}\n", group.frame_index);
    if group.crops.is_empty() {
        let _ = write!(block, "{NO_DETECTIONS_MARKER}\n\n");
        return block;
    }
    for crop in &group.crops {
        let _ = writeln!(
            block,
            "{CROP_KEY}: {},{}",
            crop.full_image_path.display(),
            crop.crop_image_path.display()
        );
        let _ = write!(block, "{COORDINATES_KEY}: {}\n\n", crop.bbox);
    }
    block
}

/// Formats one record block, terminated by the record delimiter.
pub fn format_record(record: &DetectionRecord) -> String {
    let or_none = |value: &Option<String>| value.clone().unwrap_or_else(|| "None".to_string());
    let mut block = String::new();
    let _ = writeln!(block, "{FRAME_KEY}: {}", record.frame_index);
    let _ = writeln!(
        block,
        "{}. {RAW_TEXT_KEY}: {}",
        record.sequence_index,
        record.raw_ocr_text.replace('\n', " ")
    );
    let _ = writeln!(block, "{ANGLE_KEY}: {:.2}°", record.rotation_angle_deg);
    let _ = writeln!(
        block,
        "{MIDDLE_POINT_KEY}: ({:.6}, {:.6})",
        record.centroid.0, record.centroid.1
    );
    let _ = writeln!(block, "{CLOSEST_PART_KEY}: {}", or_none(&record.best_known_part));
    let _ = writeln!(block, "{MATCH_RATIO_KEY}: {:.2}", record.match_ratio);
    let _ = writeln!(block, "{REQUESTED_KEY}: {}", record.requested_source);
    let _ = writeln!(block, "{MAPPED_PART_KEY}: {}", or_none(&record.mapped_part));
    if let Some(orientation) = record.orientation {
        let _ = writeln!(block, "{ORIENTATION_KEY}: {}", orientation);
    }
    let _ = write!(block, "{RECORD_DELIMITER}\n\n");
    block
}

/// Single producer of the detection log. Each block is rendered in memory
/// and handed to the file in one write, so readers never see half a block
/// from a healthy writer.
#[derive(Debug, Clone)]
pub struct DetectionLogWriter {
    path: PathBuf,
}

impl DetectionLogWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Removes the previous run's log so a run that never captures frame 1
    /// leaves no log behind. Returns whether a log was removed.
    pub fn discard(&self) -> Result<bool, LogError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!("discarded previous log {}", self.path.display());
                Ok(true)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(LogError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Starts a new run: the log is truncated and the first frame written.
    pub fn start_run(&self, group: &FrameGroup) -> Result<(), LogError> {
        self.write_block(&format_frame_group(group), true)
    }

    pub fn append_frame(&self, group: &FrameGroup) -> Result<(), LogError> {
        self.write_block(&format_frame_group(group), false)
    }

    pub fn append_record(&self, record: &DetectionRecord) -> Result<(), LogError> {
        self.write_block(&format_record(record), false)
    }

    fn write_block(&self, block: &str, truncate: bool) -> Result<(), LogError> {
        let io_error = |source: std::io::Error| LogError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
        let mut options = OpenOptions::new();
        options.create(true);
        if truncate {
            options.write(true).truncate(true);
        } else {
            options.append(true);
        }
        let mut file = options.open(&self.path).map_err(io_error)?;
        file.write_all(block.as_bytes()).map_err(io_error)?;
        debug!("appended {} bytes to {}", block.len(), self.path.display());
        Ok(())
    }
}
