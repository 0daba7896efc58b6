use image::{imageops, RgbImage};
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

use super::CaptureError;
use crate::detection_log::naming::{crop_file_name, full_frame_file_name};
use crate::detection_log::FrameIndex;
use crate::interfaces::{BoundingBox, FrameEvent};

/// Paths written for one captured frame. `crop_paths[i]` belongs to the
/// i-th box handed to the store and carries sequence index `i + 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedFrame {
    pub full_image_path: PathBuf,
    pub crop_paths: Vec<PathBuf>,
}

/// Persists a full frame and its detection crops for the downstream stages.
pub trait FrameStore {
    fn save_frame(
        &mut self,
        frame: FrameIndex,
        event: &FrameEvent,
        boxes: &[BoundingBox],
    ) -> Result<SavedFrame, CaptureError>;
}

/// Writes PNG files into a save folder from the RGB buffer carried by the
/// frame event.
pub struct PngFrameStore {
    folder: PathBuf,
}

impl PngFrameStore {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
        }
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    fn frame_image(event: &FrameEvent) -> Result<RgbImage, CaptureError> {
        let pixels = event
            .pixels
            .as_ref()
            .ok_or_else(|| CaptureError::Store("frame carries no pixel buffer".into()))?;
        RgbImage::from_raw(event.width, event.height, pixels.to_vec()).ok_or_else(|| {
            CaptureError::Store(format!(
                "buffer of {} bytes does not fit {}x{}",
                pixels.len(),
                event.width,
                event.height
            ))
        })
    }

    fn save_crop(
        &self,
        image: &RgbImage,
        frame: FrameIndex,
        sequence_index: usize,
        bbox: &BoundingBox,
    ) -> Result<PathBuf, CaptureError> {
        let (width, height) = image.dimensions();
        let (x, y, crop_width, crop_height) = bbox.to_pixel_rect(width, height);
        if crop_width == 0 || crop_height == 0 {
            return Err(CaptureError::Store(format!(
                "detection {bbox} covers no pixels of the frame"
            )));
        }
        let path = self.folder.join(crop_file_name(frame, sequence_index));
        imageops::crop_imm(image, x, y, crop_width, crop_height)
            .to_image()
            .save(&path)?;
        debug!("saved crop {} of frame {} to {}", sequence_index, frame, path.display());
        Ok(path)
    }
}

impl FrameStore for PngFrameStore {
    fn save_frame(
        &mut self,
        frame: FrameIndex,
        event: &FrameEvent,
        boxes: &[BoundingBox],
    ) -> Result<SavedFrame, CaptureError> {
        let image = Self::frame_image(event)?;
        fs::create_dir_all(&self.folder)?;
        let full_image_path = self.folder.join(full_frame_file_name(frame));
        image.save(&full_image_path)?;
        debug!("saved frame {} to {}", frame, full_image_path.display());

        let crop_paths = boxes
            .iter()
            .enumerate()
            .map(|(offset, bbox)| self.save_crop(&image, frame, offset + 1, bbox))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(SavedFrame {
            full_image_path,
            crop_paths,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn gradient(width: u32, height: u32) -> FrameEvent {
        let mut pixels = Vec::with_capacity((width * height * 3) as usize);
        for y in 0..height {
            for x in 0..width {
                pixels.extend_from_slice(&[x as u8, y as u8, 0]);
            }
        }
        FrameEvent::new(width, height, Vec::new()).with_pixels(pixels)
    }

    #[test]
    fn crops_use_naming_convention_and_box_size() {
        let dir = tempdir().unwrap();
        let mut store = PngFrameStore::new(dir.path());
        let event = gradient(40, 20);
        let boxes = [
            BoundingBox::new(0.25, 0.5, 0.75, 1.0),
            BoundingBox::new(0.0, 0.0, 0.5, 0.5),
        ];

        let saved = store.save_frame(FrameIndex::Second, &event, &boxes).unwrap();
        assert_eq!(saved.full_image_path.file_name().unwrap(), "chip2.png");
        assert_eq!(saved.crop_paths.len(), 2);
        assert_eq!(saved.crop_paths[0].file_name().unwrap(), "chip_cropped_2_1.png");
        assert_eq!(saved.crop_paths[1].file_name().unwrap(), "chip_cropped_2_2.png");

        let first = image::open(&saved.crop_paths[0]).unwrap().to_rgb8();
        assert_eq!(first.dimensions(), (20, 10));
        assert_eq!(first.get_pixel(0, 0).0, [10, 10, 0]);
        let second = image::open(&saved.crop_paths[1]).unwrap().to_rgb8();
        assert_eq!(second.dimensions(), (20, 10));
        assert_eq!(second.get_pixel(3, 4).0, [3, 4, 0]);
    }

    #[test]
    fn frame_without_pixels_is_rejected() {
        let dir = tempdir().unwrap();
        let mut store = PngFrameStore::new(dir.path());
        let event = FrameEvent::new(4, 4, Vec::new());
        assert!(matches!(
            store.save_frame(FrameIndex::First, &event, &[]),
            Err(CaptureError::Store(_))
        ));
    }
}
