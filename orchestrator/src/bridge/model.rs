use serde::{Deserialize, Serialize};

use chipsortcore::catalog::RequestedSource;

use crate::workflow::runner::RunSummary;

/// What the status bridge serves: the last run plus a free-form status line.
#[derive(Debug, Clone, Serialize, Default)]
pub struct StatusModel {
    pub status: String,
    pub summary: RunSummary,
}

impl StatusModel {
    pub fn from_summary(summary: RunSummary) -> Self {
        Self {
            status: "run complete".to_string(),
            summary,
        }
    }
}

/// Body of `POST /request`. A circuit wins over a part list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestUpdate {
    pub circuit: Option<String>,
    pub parts: Option<String>,
}

impl RequestUpdate {
    pub fn into_source(self) -> RequestedSource {
        match (self.circuit, self.parts) {
            (Some(circuit), _) if !circuit.trim().is_empty() => RequestedSource::circuit(circuit.trim()),
            (_, Some(parts)) => RequestedSource::parts_from_list(&parts),
            _ => RequestedSource::None,
        }
    }
}
