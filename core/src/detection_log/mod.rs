//! The detection log: the append-only text record shared by the vision, OCR
//! and arm stages.
//!
//! Two schema generations are accepted. Legacy files hold a single crop block
//! with numbered OCR fields appended to it. Current files group crop blocks
//! under `FRAME=<n>` headers and append one dashed-delimited record block per
//! recognized crop.

pub mod dedup;
pub mod model;
pub mod naming;
pub mod reader;
pub mod writer;

pub use dedup::{CentroidDeduper, DEFAULT_DEDUP_THRESHOLD};
pub use model::{Crop, DetectionRecord, FrameGroup, FrameIndex};
pub use naming::infer_frame_from_paths;
pub use reader::{DetectionLogReader, ParsedLog, SchemaGeneration};
pub use writer::DetectionLogWriter;

use std::path::PathBuf;

pub const FRAME_HEADER_KEY: &str = "FRAME";
pub const CROP_KEY: &str = "Cropped Photo Location";
pub const COORDINATES_KEY: &str = "Coordinates of the Detection Box";
pub const NO_DETECTIONS_MARKER: &str = "No detections found";
pub const RECORD_DELIMITER: &str = "-----------------------------------";

pub const FRAME_KEY: &str = "Frame";
pub const RAW_TEXT_KEY: &str = "Raw OCR Text";
pub const ANGLE_KEY: &str = "Angle of error";
pub const MIDDLE_POINT_KEY: &str = "Chip Middle Point";
pub const CLOSEST_PART_KEY: &str = "Closest known part";
pub const MATCH_RATIO_KEY: &str = "Match ratio";
pub const REQUESTED_KEY: &str = "Requested Part(s)";
pub const MAPPED_PART_KEY: &str = "Match parts for mapping";
pub const ORIENTATION_KEY: &str = "Orientation";

#[derive(thiserror::Error, Debug)]
pub enum LogError {
    #[error("detection log {0} not found")]
    Missing(PathBuf),
    #[error("detection log io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
