//! Coordination core for the chip-sorting line.
//!
//! Vision capture, OCR and the arm never talk to each other directly: the
//! capture machine writes crops into the detection log, the OCR stage appends
//! recognition records to it, and the arm stage plans its motions from those
//! records. Hardware and recognition engines sit behind the traits in
//! [`interfaces`].

pub mod capture;
pub mod catalog;
pub mod detection_log;
pub mod geometry;
pub mod interfaces;
pub mod math;
pub mod prelude;
pub mod processing;
pub mod telemetry;

pub use prelude::{PipelineStage, StageConfig, StageError, StageReport, StageResult};
