use serde::{Deserialize, Serialize};
use std::fmt;

use crate::math::similarity_ratio;

/// Best catalog candidate for a piece of OCR text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub part: Option<String>,
    pub score: f64,
}

impl MatchResult {
    pub fn none() -> Self {
        Self {
            part: None,
            score: 0.0,
        }
    }
}

/// Returns the highest scoring candidate for `text`.
///
/// A candidate must beat the current best strictly, so ties go to the
/// candidate listed first and a catalog that scores zero everywhere yields
/// no part.
pub fn best_match<S: AsRef<str>>(text: &str, candidates: &[S]) -> MatchResult {
    let mut best = MatchResult::none();
    for candidate in candidates {
        let candidate = candidate.as_ref();
        let score = similarity_ratio(text, candidate);
        if score > best.score {
            best = MatchResult {
                part: Some(candidate.to_string()),
                score,
            };
        }
    }
    best
}

/// Which of the two renderings of a crop was read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Orientation {
    #[default]
    Upright,
    Flipped,
}

impl Orientation {
    pub fn degrees(self) -> u16 {
        match self {
            Orientation::Upright => 0,
            Orientation::Flipped => 180,
        }
    }

    pub fn from_degrees(value: u16) -> Option<Self> {
        match value {
            0 => Some(Orientation::Upright),
            180 => Some(Orientation::Flipped),
            _ => None,
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrientationChoice {
    pub orientation: Orientation,
    pub text: String,
    pub matched: MatchResult,
}

/// Picks the rendering whose text matches the full catalog better; equal
/// scores keep the upright reading.
pub fn select_orientation<S: AsRef<str>>(
    upright_text: String,
    flipped_text: String,
    catalog: &[S],
) -> OrientationChoice {
    let upright = best_match(&upright_text, catalog);
    let flipped = best_match(&flipped_text, catalog);
    if flipped.score > upright.score {
        OrientationChoice {
            orientation: Orientation::Flipped,
            text: flipped_text,
            matched: flipped,
        }
    } else {
        OrientationChoice {
            orientation: Orientation::Upright,
            text: upright_text,
            matched: upright,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::default_known_parts;

    #[test]
    fn best_match_is_case_insensitive() {
        let result = best_match("sn7414n", &default_known_parts());
        assert_eq!(result.part.as_deref(), Some("SN7414N"));
        assert_eq!(result.score, 1.0);
    }

    #[test]
    fn best_match_tolerates_ocr_noise() {
        let result = best_match("SN74I85AN", &default_known_parts());
        assert_eq!(result.part.as_deref(), Some("SN74185AN"));
        assert!(result.score > 0.8);
    }

    #[test]
    fn ties_keep_first_seen_candidate() {
        let candidates = ["AB", "BA"];
        let result = best_match("A", &candidates);
        assert_eq!(result.part.as_deref(), Some("AB"));
    }

    #[test]
    fn no_overlap_reports_none_with_zero_score() {
        let result = best_match("###", &default_known_parts());
        assert_eq!(result, MatchResult::none());
        let empty: [&str; 0] = [];
        assert_eq!(best_match("LM745", &empty), MatchResult::none());
    }

    #[test]
    fn flipped_reading_wins_only_on_higher_score() {
        let catalog = default_known_parts();
        let choice = select_orientation("N4147NS".into(), "SN7414N".into(), &catalog);
        assert_eq!(choice.orientation, Orientation::Flipped);
        assert_eq!(choice.text, "SN7414N");

        let tie = select_orientation("LM745".into(), "LM745".into(), &catalog);
        assert_eq!(tie.orientation, Orientation::Upright);
    }

    #[test]
    fn orientation_degrees_round_trip() {
        assert_eq!(Orientation::from_degrees(180), Some(Orientation::Flipped));
        assert_eq!(Orientation::from_degrees(90), None);
        assert_eq!(Orientation::Upright.to_string(), "0°");
    }
}
