use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::catalog::{Orientation, RequestedSource};
use crate::interfaces::BoundingBox;

/// Which capture of the batch a crop belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FrameIndex {
    First,
    Second,
}

impl FrameIndex {
    pub fn number(self) -> u8 {
        match self {
            FrameIndex::First => 1,
            FrameIndex::Second => 2,
        }
    }

    pub fn from_number(value: u64) -> Option<Self> {
        match value {
            1 => Some(FrameIndex::First),
            2 => Some(FrameIndex::Second),
            _ => None,
        }
    }
}

impl fmt::Display for FrameIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// A saved crop of one detection, immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Crop {
    pub full_image_path: PathBuf,
    pub crop_image_path: PathBuf,
    pub frame_index: FrameIndex,
    /// 1-based position within its frame.
    pub sequence_index: usize,
    pub bbox: BoundingBox,
}

impl Crop {
    pub fn centroid(&self) -> (f64, f64) {
        self.bbox.centroid()
    }
}

/// Everything persisted for one captured frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameGroup {
    pub frame_index: FrameIndex,
    /// Full frame path when nothing was detected.
    pub full_image_path: Option<PathBuf>,
    pub crops: Vec<Crop>,
}

/// Recognition result appended once OCR has run on a crop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionRecord {
    pub frame_index: FrameIndex,
    pub sequence_index: usize,
    pub raw_ocr_text: String,
    pub rotation_angle_deg: f64,
    pub centroid: (f64, f64),
    pub best_known_part: Option<String>,
    pub match_ratio: f64,
    pub requested_source: RequestedSource,
    pub mapped_part: Option<String>,
    pub orientation: Option<Orientation>,
}
