use chipsortcore::interfaces::{Detection, FrameEvent};
use image::{Rgb, RgbImage};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time;

use super::belt::SimBelt;
use crate::generator::scenario::SimChip;

pub const FRAME_WIDTH: u32 = 320;
pub const FRAME_HEIGHT: u32 = 240;

const BACKGROUND: Rgb<u8> = Rgb([16, 16, 16]);
const ID_BASE: u8 = 60;
const ID_STEP: u8 = 12;
/// Distinct chip ids the red channel can carry.
pub const MAX_CHIPS: usize = 16;

/// Red channel value identifying a chip in rendered frames.
pub fn chip_shade(id: usize) -> u8 {
    ID_BASE + (id % MAX_CHIPS) as u8 * ID_STEP
}

pub fn chip_id_from_shade(red: u8) -> Option<usize> {
    let offset = red.checked_sub(ID_BASE)?;
    (offset % ID_STEP == 0).then(|| (offset / ID_STEP) as usize)
}

/// Renders the belt at `travel` and reports every chip fully in view.
///
/// Chips carry a bright orientation mark in their upper-left quarter, or in
/// the lower-right one when they lie upside down.
pub fn render_frame(chips: &[SimChip], travel: f64) -> FrameEvent {
    let mut image = RgbImage::from_pixel(FRAME_WIDTH, FRAME_HEIGHT, BACKGROUND);
    let mut detections = Vec::new();
    for chip in chips {
        let bbox = chip.bbox_at(travel);
        if bbox.y1 < 0.0 || bbox.y2 > 1.0 {
            continue;
        }
        let (left, top, width, height) = bbox.to_pixel_rect(FRAME_WIDTH, FRAME_HEIGHT);
        let shade = chip_shade(chip.id);
        for dy in 0..height {
            for dx in 0..width {
                let upper_left = dx < width / 2 && dy < height / 2;
                let lower_right = dx >= width / 2 && dy >= height / 2;
                let marked = if chip.flipped { lower_right } else { upper_left };
                let green = if marked { 255 } else { 0 };
                image.put_pixel(left + dx, top + dy, Rgb([shade, green, 0]));
            }
        }
        detections.push(Detection {
            label: "chip".into(),
            bbox,
            confidence: 0.9,
        });
    }
    FrameEvent::new(FRAME_WIDTH, FRAME_HEIGHT, detections).with_pixels(image.into_raw())
}

/// Streams frames from the camera over the simulated belt until every chip
/// has left the view or the receiver is dropped.
pub fn spawn_frame_source(
    chips: Arc<Vec<SimChip>>,
    belt: SimBelt,
    period: Duration,
) -> mpsc::Receiver<FrameEvent> {
    let (tx, rx) = mpsc::channel(8);
    let exit_travel = chips
        .iter()
        .map(|chip| 1.0 - chip.y)
        .fold(0.0_f64, f64::max);
    tokio::spawn(async move {
        let mut ticker = time::interval(period);
        loop {
            ticker.tick().await;
            belt.advance(period);
            if tx.send(render_frame(&chips, belt.travel())).await.is_err() {
                break;
            }
            if belt.travel() > exit_travel {
                break;
            }
        }
    });
    rx
}
