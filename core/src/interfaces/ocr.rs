use std::path::{Path, PathBuf};

use super::CollaboratorResult;

/// Result of the external alignment step: the measured skew and the
/// crop rendered upright and turned by a half turn.
#[derive(Debug, Clone)]
pub struct AlignedCrop {
    pub rotation_angle_deg: f64,
    pub upright: PathBuf,
    pub flipped: PathBuf,
}

/// Text recognition collaborator. The core only hands over image paths.
pub trait OcrEngine {
    fn align(&mut self, crop_path: &Path) -> CollaboratorResult<AlignedCrop>;
    fn read_text(&mut self, image_path: &Path) -> CollaboratorResult<String>;
}
