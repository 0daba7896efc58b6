use log::{info, warn};

/// Log target every routing decision is written under.
pub const AUDIT_TARGET: &str = "chipsort::audit";

/// Writes the decisions of one stage (match scores, chosen orientation,
/// computed angles, fallbacks) so a misrouted part can be traced afterwards.
#[derive(Debug, Clone, Copy)]
pub struct AuditTrail {
    stage: &'static str,
}

impl AuditTrail {
    pub fn new(stage: &'static str) -> Self {
        Self { stage }
    }

    pub fn stage(&self) -> &'static str {
        self.stage
    }

    pub fn record(&self, message: &str) {
        info!(target: AUDIT_TARGET, "[{}] {}", self.stage, message);
    }

    /// Decisions that deviate from the normal route (reject bin, skips).
    pub fn flag(&self, message: &str) {
        warn!(target: AUDIT_TARGET, "[{}] {}", self.stage, message);
    }
}
