use chipsortcore::interfaces::{AlignedCrop, CollaboratorError, CollaboratorResult, OcrEngine};
use image::{imageops, RgbImage};
use log::debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::render::chip_id_from_shade;
use crate::generator::scenario::SimChip;

/// OCR stand-in that recognizes chips from their rendered shade and reads
/// their printed text only when the orientation mark is upper-left.
pub struct SimOcr {
    chips: Arc<Vec<SimChip>>,
}

fn recognition_error(path: &Path, err: impl std::fmt::Display) -> CollaboratorError {
    CollaboratorError::Recognition(format!("{}: {err}", path.display()))
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default();
    path.with_file_name(format!("{stem}_{suffix}.png"))
}

impl SimOcr {
    pub fn new(chips: Arc<Vec<SimChip>>) -> Self {
        Self { chips }
    }

    fn open(path: &Path) -> CollaboratorResult<RgbImage> {
        image::open(path)
            .map(|image| image.to_rgb8())
            .map_err(|err| recognition_error(path, err))
    }

    fn identify(&self, path: &Path, image: &RgbImage) -> CollaboratorResult<&SimChip> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(recognition_error(path, "empty image"));
        }
        let shade = image.get_pixel(width / 2, height / 2).0[0];
        chip_id_from_shade(shade)
            .and_then(|id| self.chips.iter().find(|chip| chip.id == id))
            .ok_or_else(|| recognition_error(path, "no chip in crop"))
    }
}

impl OcrEngine for SimOcr {
    fn align(&mut self, crop_path: &Path) -> CollaboratorResult<AlignedCrop> {
        let image = Self::open(crop_path)?;
        let chip = self.identify(crop_path, &image)?;
        let upright = sibling(crop_path, "0");
        let flipped = sibling(crop_path, "180");
        image
            .save(&upright)
            .map_err(|err| recognition_error(&upright, err))?;
        imageops::rotate180(&image)
            .save(&flipped)
            .map_err(|err| recognition_error(&flipped, err))?;
        Ok(AlignedCrop {
            rotation_angle_deg: chip.skew_deg,
            upright,
            flipped,
        })
    }

    fn read_text(&mut self, image_path: &Path) -> CollaboratorResult<String> {
        let image = Self::open(image_path)?;
        let chip = self.identify(image_path, &image)?;
        let (width, height) = image.dimensions();
        let readable = image.get_pixel(width / 4, height / 4).0[1] > 128;
        let text = if readable {
            chip.printed_text.clone()
        } else {
            chip.printed_text.chars().rev().collect()
        };
        debug!("sim ocr {} -> '{}'", image_path.display(), text);
        Ok(text)
    }
}
