use anyhow::Context;
use chipsortcore::catalog::{
    compact_spelled_tokens, match_spoken_request, CircuitTable, RequestedSource,
    SPEECH_MATCH_THRESHOLD,
};
use chipsortcore::detection_log::{DetectionLogReader, LogError};

use super::config::WorkflowConfig;

/// Joins a letter-by-letter dictation into chip names: `next` separates
/// chips and `stop` ends the dictation.
pub fn spelled_transcript(raw: &str) -> String {
    let mut names = Vec::new();
    let mut phrase: Vec<&str> = Vec::new();
    for word in raw.split_whitespace() {
        match word.to_lowercase().as_str() {
            "next" | "stop" => {
                if !phrase.is_empty() {
                    names.push(compact_spelled_tokens(&phrase.join(" ")));
                    phrase.clear();
                }
                if word.eq_ignore_ascii_case("stop") {
                    break;
                }
            }
            _ => phrase.push(word),
        }
    }
    if !phrase.is_empty() {
        names.push(compact_spelled_tokens(&phrase.join(" ")));
    }
    names.join(", ")
}

/// Turns a spoken transcript into a request. A recognized circuit name wins
/// over part names, as in the request file.
pub fn request_from_speech(
    transcript: &str,
    known_parts: &[String],
    table: &CircuitTable,
) -> RequestedSource {
    let mut candidates: Vec<String> = known_parts.to_vec();
    candidates.extend(table.circuit_names().map(str::to_string));
    let matched = match_spoken_request(transcript, &candidates, SPEECH_MATCH_THRESHOLD);

    if let Some(circuit) = matched.iter().find(|name| table.contains_circuit(name)) {
        return RequestedSource::circuit(circuit);
    }
    RequestedSource::parts_from_list(&matched.join(","))
}

/// The request recorded by the previous run's log, if any.
pub fn recall_previous_request(config: &WorkflowConfig) -> anyhow::Result<Option<RequestedSource>> {
    match DetectionLogReader::read(&config.detection_log) {
        Ok(log) => Ok(log
            .last_requested_source()
            .cloned()
            .filter(|source| *source != RequestedSource::None)),
        Err(LogError::Missing(_)) => Ok(None),
        Err(err) => Err(err).context("reading previous request from detection log"),
    }
}
