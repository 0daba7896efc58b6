use log::{debug, warn};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use super::CatalogError;
use crate::geometry::DropTarget;

fn circuit_block_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)\b([A-Z][A-Z0-9_]*)\s*=\s*\[([^\]]*)\]").expect("valid circuit pattern")
    })
}

fn part_entry_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\d+\.\s*([^()]+?)\s*\(\s*([-\d.,\s]+)\)").expect("valid part pattern")
    })
}

/// Drop slots per circuit: `circuit -> part -> target`. Names are upper-cased.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CircuitTable {
    circuits: BTreeMap<String, BTreeMap<String, DropTarget>>,
}

impl CircuitTable {
    /// Parses entries of the form `NAME = ["1. PART (x, y, z, theta)", ...]`.
    /// Entries without four numeric coordinates are skipped.
    pub fn parse(text: &str) -> Self {
        let mut circuits = BTreeMap::new();
        for block in circuit_block_pattern().captures_iter(text) {
            let name = block[1].to_uppercase();
            let mut parts = BTreeMap::new();
            for entry in part_entry_pattern().captures_iter(&block[2]) {
                let part = entry[1].trim().trim_matches('"').trim().to_uppercase();
                let numbers: Result<Vec<f64>, _> = entry[2]
                    .split(',')
                    .map(|value| value.trim().parse::<f64>())
                    .collect();
                match numbers.as_deref() {
                    Ok([x, y, z, theta]) => {
                        parts.insert(part, DropTarget::new(*x, *y, *z, *theta));
                    }
                    _ => warn!("circuit {name}: ignoring entry for {part} with coordinates '{}'", &entry[2]),
                }
            }
            debug!("circuit {name}: {} drop slots", parts.len());
            circuits.insert(name, parts);
        }
        Self { circuits }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let path_ref = path.as_ref();
        let text = fs::read_to_string(path_ref).map_err(|source| CatalogError::Read {
            path: path_ref.display().to_string(),
            source,
        })?;
        Ok(Self::parse(&text))
    }

    /// Missing or unreadable tables behave like a table with no circuits.
    pub fn load_or_empty<P: AsRef<Path>>(path: P) -> Self {
        Self::load(path).unwrap_or_else(|err| {
            warn!("{err}; continuing without circuit table");
            Self::default()
        })
    }

    pub fn circuit_names(&self) -> impl Iterator<Item = &str> {
        self.circuits.keys().map(String::as_str)
    }

    pub fn contains_circuit(&self, circuit: &str) -> bool {
        self.circuits.contains_key(&circuit.to_uppercase())
    }

    /// Part names of a circuit; unknown circuits yield an empty set.
    pub fn parts(&self, circuit: &str) -> BTreeSet<String> {
        self.circuits
            .get(&circuit.to_uppercase())
            .map(|parts| parts.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn drop_target(&self, circuit: &str, part: &str) -> Option<DropTarget> {
        self.circuits
            .get(&circuit.to_uppercase())
            .and_then(|parts| parts.get(&part.to_uppercase()))
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const TABLE: &str = r#"
CIRCUIT1 = [
    "1. SN74185AN (20, 5, 12, 0)",
    "2. LM745 (-15, 10, 12.5, 90)",
]
circuit2 = [
    "1. DM7414N (12, -8, 12, 30)",
    "2. BROKEN ENTRY (1, 2)",
]
"#;

    #[test]
    fn parses_circuits_and_drop_targets() {
        let table = CircuitTable::parse(TABLE);
        assert_eq!(table.circuit_names().collect::<Vec<_>>(), vec!["CIRCUIT1", "CIRCUIT2"]);
        assert_eq!(
            table.drop_target("circuit1", "lm745"),
            Some(DropTarget::new(-15.0, 10.0, 12.5, 90.0))
        );
        assert_eq!(
            table.parts("CIRCUIT1").into_iter().collect::<Vec<_>>(),
            vec!["LM745".to_string(), "SN74185AN".to_string()]
        );
    }

    #[test]
    fn malformed_entries_and_unknown_circuits_are_empty() {
        let table = CircuitTable::parse(TABLE);
        assert_eq!(table.parts("CIRCUIT2").len(), 1);
        assert!(table.parts("CIRCUIT9").is_empty());
        assert!(table.drop_target("CIRCUIT9", "LM745").is_none());
    }

    #[test]
    fn load_reads_file_and_missing_file_is_empty() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(TABLE.as_bytes()).unwrap();
        let table = CircuitTable::load(temp.path()).unwrap();
        assert!(table.contains_circuit("circuit2"));

        assert!(CircuitTable::load("/nonexistent/Circuits.txt").is_err());
        assert_eq!(
            CircuitTable::load_or_empty("/nonexistent/Circuits.txt"),
            CircuitTable::default()
        );
    }
}
