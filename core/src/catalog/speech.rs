use log::info;

use super::matcher::best_match;
use crate::telemetry::AUDIT_TARGET;

/// Minimum score for a spoken word to count as a request.
pub const SPEECH_MATCH_THRESHOLD: f64 = 0.50;

const DIGIT_WORDS: &[(&str, char)] = &[
    ("zero", '0'),
    ("one", '1'),
    ("two", '2'),
    ("three", '3'),
    ("four", '4'),
    ("five", '5'),
    ("six", '6'),
    ("seven", '7'),
    ("eight", '8'),
    ("nine", '9'),
];

/// Joins spelled-out letters and digit words into one token,
/// e.g. `"s n seven four"` -> `"SN74"`.
pub fn compact_spelled_tokens(phrase: &str) -> String {
    phrase
        .split_whitespace()
        .map(|token| {
            let lower = token.to_lowercase();
            DIGIT_WORDS
                .iter()
                .find(|(word, _)| *word == lower)
                .map(|(_, digit)| digit.to_string())
                .unwrap_or(lower)
        })
        .collect::<String>()
        .to_uppercase()
}

/// Matches each word of a transcript against `candidates` (parts and circuit
/// names). Words scoring at least the threshold contribute their candidate
/// once, in the order first heard.
pub fn match_spoken_request<S: AsRef<str>>(
    transcript: &str,
    candidates: &[S],
    threshold: f64,
) -> Vec<String> {
    let normalized = transcript.replace(',', " ").replace(" and ", " ");
    let mut matched: Vec<String> = Vec::new();
    for word in normalized.split_whitespace() {
        let result = best_match(word, candidates);
        if let Some(part) = result.part {
            if result.score >= threshold && !matched.contains(&part) {
                info!(target: AUDIT_TARGET, "spoken '{word}' matched {part} (score {:.2})", result.score);
                matched.push(part);
            }
        }
    }
    matched
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spelled_tokens_are_compacted() {
        assert_eq!(compact_spelled_tokens("s n seven four one four n"), "SN7414N");
        assert_eq!(compact_spelled_tokens("L m Seven"), "LM7");
    }

    #[test]
    fn transcript_words_match_once_above_threshold() {
        let candidates = ["LM745", "SN7414N", "CIRCUIT1"];
        let matched = match_spoken_request(
            "lm745 and sn7414n, LM745 banana circuit1",
            &candidates,
            SPEECH_MATCH_THRESHOLD,
        );
        assert_eq!(matched, vec!["LM745", "SN7414N", "CIRCUIT1"]);
    }

    #[test]
    fn weak_matches_are_dropped() {
        let candidates = ["SN74185AN"];
        assert!(match_spoken_request("hello", &candidates, SPEECH_MATCH_THRESHOLD).is_empty());
    }
}
