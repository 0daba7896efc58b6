use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Detection box as reported by the vision pipeline, either normalized to
/// `[0, 1]` or in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BoundingBox {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Boxes whose far corner lies inside the unit square are normalized.
    pub fn is_normalized(&self) -> bool {
        self.x2 <= 1.0 && self.y2 <= 1.0
    }

    pub fn centroid(&self) -> (f64, f64) {
        ((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }

    /// Pixel rectangle `(x, y, width, height)` clamped to a `width` x `height` frame.
    pub fn to_pixel_rect(&self, width: u32, height: u32) -> (u32, u32, u32, u32) {
        let (x1, y1, x2, y2) = if self.is_normalized() {
            (
                self.x1 * width as f64,
                self.y1 * height as f64,
                self.x2 * width as f64,
                self.y2 * height as f64,
            )
        } else {
            (self.x1, self.y1, self.x2, self.y2)
        };
        let clamp = |v: f64, max: u32| -> u32 { v.max(0.0).min(max as f64) as u32 };
        let (left, top) = (clamp(x1, width), clamp(y1, height));
        let (right, bottom) = (clamp(x2, width), clamp(y2, height));
        (
            left,
            top,
            right.saturating_sub(left),
            bottom.saturating_sub(top),
        )
    }

    /// False for boxes that clamp to an empty rectangle of the frame.
    pub fn covers_pixels(&self, width: u32, height: u32) -> bool {
        let (_, _, w, h) = self.to_pixel_rect(width, height);
        w > 0 && h > 0
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}) -> ({}, {})",
            self.x1, self.y1, self.x2, self.y2
        )
    }
}

/// One object observed in one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub label: String,
    pub bbox: BoundingBox,
    pub confidence: f64,
}

/// A frame pushed by the vision pipeline together with its detections.
///
/// `pixels` holds packed RGB8 data when the pipeline hands over the buffer;
/// replayed and simulated frames carry detections only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameEvent {
    pub width: u32,
    pub height: u32,
    #[serde(skip)]
    pub pixels: Option<Arc<Vec<u8>>>,
    pub detections: Vec<Detection>,
}

impl FrameEvent {
    pub fn new(width: u32, height: u32, detections: Vec<Detection>) -> Self {
        Self {
            width,
            height,
            pixels: None,
            detections,
        }
    }

    pub fn with_pixels(mut self, pixels: Vec<u8>) -> Self {
        self.pixels = Some(Arc::new(pixels));
        self
    }

    /// Frames without usable dimensions, or whose buffer does not match them,
    /// are dropped by the capture machine.
    pub fn has_valid_dimensions(&self) -> bool {
        if self.width == 0 || self.height == 0 {
            return false;
        }
        match &self.pixels {
            Some(buffer) => buffer.len() == self.width as usize * self.height as usize * 3,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_box_scales_to_frame() {
        let bbox = BoundingBox::new(0.25, 0.5, 0.75, 1.0);
        assert!(bbox.is_normalized());
        assert_eq!(bbox.to_pixel_rect(200, 100), (50, 50, 100, 50));
        assert!(bbox.covers_pixels(200, 100));
        assert!(!BoundingBox::new(0.6, 0.5, 0.6, 0.7).covers_pixels(40, 20));
    }

    #[test]
    fn pixel_box_is_clamped() {
        let bbox = BoundingBox::new(-10.0, 20.0, 400.0, 90.0);
        assert!(!bbox.is_normalized());
        assert_eq!(bbox.to_pixel_rect(320, 240), (0, 20, 320, 70));
    }

    #[test]
    fn frame_dimensions_are_checked_against_buffer() {
        assert!(!FrameEvent::new(0, 10, vec![]).has_valid_dimensions());
        assert!(FrameEvent::new(2, 2, vec![]).has_valid_dimensions());
        assert!(FrameEvent::new(2, 2, vec![])
            .with_pixels(vec![0; 12])
            .has_valid_dimensions());
        assert!(!FrameEvent::new(2, 2, vec![])
            .with_pixels(vec![0; 11])
            .has_valid_dimensions());
    }
}
