use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::Path;

use super::{CatalogError, CircuitTable};

const CIRCUIT_KEY: &str = "REQUESTED CIRCUIT:";
const PART_KEY: &str = "REQUESTED PART:";

/// What the operator asked the line to sort for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RequestedSource {
    Circuit(String),
    Parts(Vec<String>),
    #[default]
    None,
}

impl RequestedSource {
    pub fn circuit(name: &str) -> Self {
        RequestedSource::Circuit(name.trim().to_uppercase())
    }

    /// Comma separated manual list; blank entries are dropped and the
    /// sentinel `none` means nothing was requested.
    pub fn parts_from_list(list: &str) -> Self {
        let parts: Vec<String> = list
            .split(',')
            .map(|part| part.trim().to_uppercase())
            .filter(|part| !part.is_empty())
            .collect();
        if parts.is_empty() || (parts.len() == 1 && parts[0] == "NONE") {
            RequestedSource::None
        } else {
            RequestedSource::Parts(parts)
        }
    }

    /// Reads back the `Requested Part(s):` value written into a detection
    /// record. Values naming a `CIRCUIT…` are circuits, the rest part lists.
    pub fn from_log_value(value: &str) -> Self {
        let value = value.trim();
        if value.to_uppercase().starts_with("CIRCUIT") && !value.contains(',') {
            RequestedSource::circuit(value)
        } else {
            RequestedSource::parts_from_list(value)
        }
    }

    /// Promotes a single-entry part list that names a circuit in `table`.
    pub fn reconcile(self, table: &CircuitTable) -> Self {
        match self {
            RequestedSource::Parts(parts) if parts.len() == 1 && table.contains_circuit(&parts[0]) => {
                RequestedSource::circuit(&parts[0])
            }
            other => other,
        }
    }

    /// Upper-cased part names the request admits.
    pub fn resolve(&self, table: &CircuitTable) -> BTreeSet<String> {
        match self {
            RequestedSource::Circuit(name) => table.parts(name),
            RequestedSource::Parts(parts) => parts.iter().cloned().collect(),
            RequestedSource::None => BTreeSet::new(),
        }
    }

    pub fn circuit_name(&self) -> Option<&str> {
        match self {
            RequestedSource::Circuit(name) => Some(name),
            _ => None,
        }
    }

    /// Parses a request file. A circuit line wins over a part line.
    pub fn parse_request_file(text: &str) -> Self {
        let mut circuit = None;
        let mut parts = RequestedSource::None;
        for line in text.lines() {
            let line = line.trim();
            let upper = line.to_uppercase();
            if upper.starts_with(CIRCUIT_KEY) {
                let name = line.get(CIRCUIT_KEY.len()..).unwrap_or("").trim();
                if !name.is_empty() {
                    circuit = Some(RequestedSource::circuit(name));
                }
            } else if upper.starts_with(PART_KEY) {
                parts = RequestedSource::parts_from_list(line.get(PART_KEY.len()..).unwrap_or(""));
            }
        }
        circuit.unwrap_or(parts)
    }

    /// A missing request file means no request.
    pub fn read_request_file<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let path_ref = path.as_ref();
        match fs::read_to_string(path_ref) {
            Ok(text) => Ok(Self::parse_request_file(&text)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(RequestedSource::None),
            Err(source) => Err(CatalogError::Read {
                path: path_ref.display().to_string(),
                source,
            }),
        }
    }

    pub fn write_request_file<P: AsRef<Path>>(&self, path: P) -> Result<(), CatalogError> {
        let path_ref = path.as_ref();
        let line = match self {
            RequestedSource::Circuit(name) => format!("Requested Circuit: {name}"),
            RequestedSource::Parts(_) | RequestedSource::None => format!("Requested Part: {self}"),
        };
        let write = || -> std::io::Result<()> {
            if let Some(parent) = path_ref.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path_ref, line)
        };
        write().map_err(|source| CatalogError::Write {
            path: path_ref.display().to_string(),
            source,
        })
    }
}

impl fmt::Display for RequestedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestedSource::Circuit(name) => write!(f, "{name}"),
            RequestedSource::Parts(parts) => write!(f, "{}", parts.join(", ")),
            RequestedSource::None => write!(f, "None"),
        }
    }
}
