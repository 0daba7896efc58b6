use std::sync::Mutex;

use crate::prelude::StageReport;

/// Per-stage counters, shared between a stage and whoever reports on it.
pub struct StageMetrics {
    inner: Mutex<Counters>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl StageMetrics {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Counters::default()),
        }
    }

    pub fn record_processed(&self) {
        if let Ok(mut counters) = self.inner.lock() {
            counters.processed += 1;
        }
    }

    pub fn record_skipped(&self) {
        if let Ok(mut counters) = self.inner.lock() {
            counters.skipped += 1;
        }
    }

    pub fn record_failed(&self) {
        if let Ok(mut counters) = self.inner.lock() {
            counters.failed += 1;
        }
    }

    pub fn snapshot(&self) -> Counters {
        self.inner
            .lock()
            .map(|counters| *counters)
            .unwrap_or_default()
    }

    pub fn reset(&self) {
        if let Ok(mut counters) = self.inner.lock() {
            *counters = Counters::default();
        }
    }

    /// Copies the counters into `report`.
    pub fn fill(&self, report: &mut StageReport) {
        let counters = self.snapshot();
        report.processed = counters.processed;
        report.skipped = counters.skipped;
        report.failed = counters.failed;
    }
}

impl Default for StageMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_fill_report() {
        let metrics = StageMetrics::new();
        metrics.record_processed();
        metrics.record_processed();
        metrics.record_skipped();
        metrics.record_failed();
        let mut report = StageReport::new("ocr");
        metrics.fill(&mut report);
        assert_eq!((report.processed, report.skipped, report.failed), (2, 1, 1));
        metrics.reset();
        assert_eq!(metrics.snapshot(), Counters::default());
    }
}
