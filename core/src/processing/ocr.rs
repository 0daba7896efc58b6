use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::load_detection_log;
use crate::catalog::{default_known_parts, select_orientation, CircuitTable, RequestedSource};
use crate::detection_log::{
    CentroidDeduper, Crop, DetectionLogWriter, DetectionRecord, DEFAULT_DEDUP_THRESHOLD,
};
use crate::interfaces::OcrEngine;
use crate::prelude::{PipelineStage, StageConfig, StageError, StageReport, StageResult};
use crate::telemetry::{AuditTrail, StageMetrics};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrStageConfig {
    pub dedup_threshold: f64,
    /// Catalog every OCR reading is matched against.
    pub known_parts: Vec<String>,
}

impl Default for OcrStageConfig {
    fn default() -> Self {
        Self {
            dedup_threshold: DEFAULT_DEDUP_THRESHOLD,
            known_parts: default_known_parts(),
        }
    }
}

/// Recognizes every crop in the log and appends one record per crop.
pub struct OcrStage<E: OcrEngine> {
    engine: E,
    config: OcrStageConfig,
    stage: Option<StageConfig>,
    metrics: StageMetrics,
    audit: AuditTrail,
}

/// The request as it applies to this run.
struct Scope {
    source: RequestedSource,
    parts: BTreeSet<String>,
}

impl<E: OcrEngine> OcrStage<E> {
    pub fn new(engine: E, config: OcrStageConfig) -> Self {
        Self {
            engine,
            config,
            stage: None,
            metrics: StageMetrics::new(),
            audit: AuditTrail::new("ocr"),
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    fn load_scope(stage: &StageConfig) -> StageResult<Scope> {
        let table = CircuitTable::load_or_empty(&stage.circuits_file);
        let source = RequestedSource::read_request_file(&stage.request_file)
            .map_err(|err| StageError::Config(err.to_string()))?
            .reconcile(&table);
        let parts = source.resolve(&table);
        Ok(Scope { source, parts })
    }

    fn recognize(&mut self, crop: &Crop, scope: &Scope) -> StageResult<DetectionRecord> {
        let aligned = self.engine.align(&crop.crop_image_path)?;
        let upright = self.engine.read_text(&aligned.upright)?;
        let flipped = self.engine.read_text(&aligned.flipped)?;
        let choice = select_orientation(
            upright.trim().to_string(),
            flipped.trim().to_string(),
            &self.config.known_parts,
        );

        let best_known_part = choice.matched.part.clone();
        let mapped_part = best_known_part
            .as_ref()
            .filter(|part| scope.parts.contains(&part.to_uppercase()))
            .cloned();

        self.audit.record(&format!(
            "frame {} crop {}: read '{}' at {}, closest {} ({:.2}), skew {:.2}°, mapped {}",
            crop.frame_index,
            crop.sequence_index,
            choice.text,
            choice.orientation,
            best_known_part.as_deref().unwrap_or("none"),
            choice.matched.score,
            aligned.rotation_angle_deg,
            mapped_part.as_deref().unwrap_or("none"),
        ));

        Ok(DetectionRecord {
            frame_index: crop.frame_index,
            sequence_index: crop.sequence_index,
            raw_ocr_text: choice.text,
            rotation_angle_deg: aligned.rotation_angle_deg,
            centroid: crop.centroid(),
            best_known_part,
            match_ratio: choice.matched.score,
            requested_source: scope.source.clone(),
            mapped_part,
            orientation: Some(choice.orientation),
        })
    }
}

impl<E: OcrEngine> PipelineStage for OcrStage<E> {
    fn name(&self) -> &'static str {
        "ocr"
    }

    fn initialize(&mut self, config: &StageConfig) -> StageResult<()> {
        if self.config.known_parts.is_empty() {
            return Err(StageError::Config("known-parts catalog is empty".into()));
        }
        self.stage = Some(config.clone());
        self.metrics.reset();
        Ok(())
    }

    fn execute(&mut self) -> StageResult<StageReport> {
        let stage = self
            .stage
            .clone()
            .ok_or_else(|| StageError::Internal("stage not initialized".into()))?;

        let log = load_detection_log(&stage.detection_log)?;
        let scope = Self::load_scope(&stage)?;
        self.audit.record(&format!(
            "request {} admits {} part(s)",
            scope.source,
            scope.parts.len()
        ));

        let writer = DetectionLogWriter::new(&stage.detection_log);
        let mut dedup = CentroidDeduper::new(self.config.dedup_threshold);
        let mut report = StageReport::new(self.name());

        for crop in &log.crops {
            let (x, y) = crop.centroid();
            if !dedup.accept((x, y)) {
                self.audit.flag(&format!(
                    "frame {} crop {} at ({:.4}, {:.4}) repeats an earlier chip; skipped",
                    crop.frame_index, crop.sequence_index, x, y
                ));
                self.metrics.record_skipped();
                continue;
            }
            match self.recognize(crop, &scope) {
                Ok(record) => {
                    writer.append_record(&record)?;
                    self.metrics.record_processed();
                }
                Err(StageError::Collaborator(err)) => {
                    warn!(
                        "frame {} crop {}: recognition failed: {err}",
                        crop.frame_index, crop.sequence_index
                    );
                    report.notes.push(format!(
                        "{}: {err}",
                        crop.crop_image_path.display()
                    ));
                    self.metrics.record_failed();
                }
                Err(err) => return Err(err),
            }
        }

        self.metrics.fill(&mut report);
        Ok(report)
    }

    fn cleanup(&mut self) {
        self.stage = None;
    }
}
