//! Known-part catalog matching, circuit drop tables and requested sources.

pub mod circuits;
pub mod matcher;
pub mod request;
pub mod speech;

pub use circuits::CircuitTable;
pub use matcher::{best_match, select_orientation, MatchResult, Orientation, OrientationChoice};
pub use request::RequestedSource;
pub use speech::{compact_spelled_tokens, match_spoken_request, SPEECH_MATCH_THRESHOLD};

/// Parts the line knows how to recognize when no catalog is configured.
pub const DEFAULT_KNOWN_PARTS: &[&str] = &[
    "P8436 DM74S240N",
    "SN74LS5IN M18034",
    "LM745",
    "SN74185AN",
    "SN7414N",
    "M73AF LF 356BN",
    "DM7414N",
];

pub fn default_known_parts() -> Vec<String> {
    DEFAULT_KNOWN_PARTS.iter().map(|part| part.to_string()).collect()
}

#[derive(thiserror::Error, Debug)]
pub enum CatalogError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
