//! File naming shared by the crop store and the legacy frame inference.

use std::path::Path;

use super::model::FrameIndex;

const SECOND_FULL_MARKER: &str = "chip2";
const SECOND_CROP_MARKER: &str = "_2_";

pub fn full_frame_file_name(frame: FrameIndex) -> String {
    match frame {
        FrameIndex::First => "chip.png".to_string(),
        FrameIndex::Second => "chip2.png".to_string(),
    }
}

pub fn crop_file_name(frame: FrameIndex, sequence_index: usize) -> String {
    match frame {
        FrameIndex::First => format!("chip_cropped_{sequence_index}.png"),
        FrameIndex::Second => format!("chip_cropped_2_{sequence_index}.png"),
    }
}

/// Frame of a crop listed without a `FRAME=` header.
///
/// This is a heuristic over file names: a full frame named `chip2…` or a crop
/// named `…_2_…` belongs to frame 2, anything else to frame 1.
pub fn infer_frame_from_paths(full_image_path: &Path, crop_image_path: &Path) -> FrameIndex {
    let base_name = |path: &Path| {
        path.file_name()
            .map(|name| name.to_string_lossy().to_lowercase())
            .unwrap_or_default()
    };
    if base_name(full_image_path).contains(SECOND_FULL_MARKER)
        || base_name(crop_image_path).contains(SECOND_CROP_MARKER)
    {
        FrameIndex::Second
    } else {
        FrameIndex::First
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_names_follow_frame_markers() {
        assert_eq!(full_frame_file_name(FrameIndex::Second), "chip2.png");
        assert_eq!(crop_file_name(FrameIndex::First, 3), "chip_cropped_3.png");
        assert_eq!(crop_file_name(FrameIndex::Second, 1), "chip_cropped_2_1.png");
    }

    #[test]
    fn inference_reads_either_path() {
        let infer = |full: &str, crop: &str| infer_frame_from_paths(Path::new(full), Path::new(crop));
        assert_eq!(infer("/s/chip2.png", "/s/chip_cropped_1.png"), FrameIndex::Second);
        assert_eq!(infer("/s/chip.png", "/s/chip_cropped_2_1.png"), FrameIndex::Second);
        assert_eq!(infer("/s/chip.png", "/s/chip_cropped_1.png"), FrameIndex::First);
        assert_eq!(infer("", ""), FrameIndex::First);
    }

    #[test]
    fn inference_only_looks_at_file_names() {
        let full = Path::new("/runs/chip2_archive/chip.png");
        let crop = Path::new("/runs/_2_/chip_cropped.png");
        assert_eq!(infer_frame_from_paths(full, crop), FrameIndex::First);
    }
}
