pub mod audit;
pub mod metrics;

pub use audit::{AuditTrail, AUDIT_TARGET};
pub use metrics::{Counters, StageMetrics};
