/// Default Chebyshev distance under which two centroids are the same chip.
pub const DEFAULT_DEDUP_THRESHOLD: f64 = 0.01;

/// Drops records whose centroid repeats one already seen in this pass.
#[derive(Debug, Clone)]
pub struct CentroidDeduper {
    threshold: f64,
    seen: Vec<(f64, f64)>,
}

impl Default for CentroidDeduper {
    fn default() -> Self {
        Self::new(DEFAULT_DEDUP_THRESHOLD)
    }
}

impl CentroidDeduper {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            seen: Vec::new(),
        }
    }

    /// Returns `true` and remembers the point when it is new.
    pub fn accept(&mut self, point: (f64, f64)) -> bool {
        let duplicate = self.seen.iter().any(|&(x, y)| {
            (x - point.0).abs() < self.threshold && (y - point.1).abs() < self.threshold
        });
        if !duplicate {
            self.seen.push(point);
        }
        !duplicate
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn near_points_collapse() {
        let mut dedup = CentroidDeduper::default();
        assert!(dedup.accept((0.200, 0.500)));
        assert!(!dedup.accept((0.209, 0.505)));
        assert!(dedup.accept((0.220, 0.500)));
        assert_eq!(dedup.len(), 2);
    }

    #[test]
    fn one_axis_far_is_distinct() {
        let mut dedup = CentroidDeduper::new(0.01);
        assert!(dedup.accept((0.5, 0.5)));
        assert!(dedup.accept((0.5, 0.52)));
    }
}
