use chipsortcore::catalog::DEFAULT_KNOWN_PARTS;
use chipsortcore::interfaces::BoundingBox;
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Layout of the synthetic batch placed on the simulated belt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub seed: u64,
    pub chip_count: usize,
    pub chips_per_row: usize,
    /// Normalized chip edge length.
    pub chip_size: f64,
    /// Gap between rows along the belt, in frame heights.
    pub row_spacing: f64,
    /// Frame heights travelled per second while the belt runs.
    pub belt_speed: f64,
    pub flip_probability: f64,
    /// Per-character chance of an OCR look-alike substitution.
    pub noise: f64,
    pub parts: Vec<String>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            chip_count: 4,
            chips_per_row: 4,
            chip_size: 0.12,
            row_spacing: 0.45,
            belt_speed: 0.4,
            flip_probability: 0.3,
            noise: 0.1,
            parts: DEFAULT_KNOWN_PARTS.iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// One chip of the batch at belt travel zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimChip {
    pub id: usize,
    pub part: String,
    /// What the OCR engine reads from the upright rendering.
    pub printed_text: String,
    pub x: f64,
    pub y: f64,
    pub size: f64,
    pub skew_deg: f64,
    pub flipped: bool,
}

impl SimChip {
    pub fn bbox_at(&self, travel: f64) -> BoundingBox {
        let top = self.y + travel;
        BoundingBox::new(self.x, top, self.x + self.size, top + self.size)
    }
}

const LOOK_ALIKES: &[(char, char)] = &[('1', 'I'), ('0', 'O'), ('5', 'S'), ('8', 'B')];

fn smudge(text: &str, noise: f64, rng: &mut StdRng) -> String {
    text.chars()
        .map(|c| {
            let swap = LOOK_ALIKES.iter().find_map(|&(a, b)| {
                if c == a {
                    Some(b)
                } else if c == b {
                    Some(a)
                } else {
                    None
                }
            });
            match swap {
                Some(other) if rng.gen_bool(noise.clamp(0.0, 1.0)) => other,
                _ => c,
            }
        })
        .collect()
}

/// Builds the batch: rows of chips upstream of the camera, the first row just
/// above the top edge of the frame.
pub fn build_batch(config: &ScenarioConfig) -> anyhow::Result<Vec<SimChip>> {
    anyhow::ensure!(!config.parts.is_empty(), "scenario needs at least one part name");
    anyhow::ensure!(config.chips_per_row > 0, "scenario needs at least one chip per row");
    anyhow::ensure!(
        config.chip_size > 0.0 && config.chip_size * config.chips_per_row as f64 <= 1.0,
        "chips of size {} do not fit {} per row",
        config.chip_size,
        config.chips_per_row
    );

    let mut rng = StdRng::seed_from_u64(config.seed);
    let lane = 1.0 / config.chips_per_row as f64;
    let mut chips = Vec::with_capacity(config.chip_count);
    for id in 0..config.chip_count {
        let row = id / config.chips_per_row;
        let column = id % config.chips_per_row;
        let part = config
            .parts
            .choose(&mut rng)
            .cloned()
            .unwrap_or_default();
        let slack = (lane - config.chip_size).max(0.0);
        let x = column as f64 * lane + rng.gen_range(0.0..=slack);
        let y = -config.chip_size - 0.02 - row as f64 * config.row_spacing - rng.gen_range(0.0..0.04);
        let skew_deg = if rng.gen_bool(0.2) {
            rng.gen_range(-0.9..0.9)
        } else {
            rng.gen_range(-30.0..120.0)
        };
        chips.push(SimChip {
            id,
            printed_text: smudge(&part, config.noise, &mut rng),
            part,
            x,
            y,
            size: config.chip_size,
            skew_deg,
            flipped: rng.gen_bool(config.flip_probability.clamp(0.0, 1.0)),
        });
    }
    Ok(chips)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_is_reproducible_per_seed() {
        let config = ScenarioConfig {
            seed: 11,
            chip_count: 6,
            ..Default::default()
        };
        let a = build_batch(&config).unwrap();
        let b = build_batch(&config).unwrap();
        assert_eq!(a.len(), 6);
        for (left, right) in a.iter().zip(&b) {
            assert_eq!(left.part, right.part);
            assert_eq!(left.x, right.x);
            assert_eq!(left.flipped, right.flipped);
        }
    }

    #[test]
    fn chips_start_above_the_frame_inside_their_lane() {
        let config = ScenarioConfig {
            chip_count: 8,
            ..Default::default()
        };
        for chip in build_batch(&config).unwrap() {
            let bbox = chip.bbox_at(0.0);
            assert!(bbox.y2 < 0.0);
            assert!(bbox.x1 >= 0.0 && bbox.x2 <= 1.0 + 1e-9);
        }
    }

    #[test]
    fn noiseless_text_is_the_part_name() {
        let config = ScenarioConfig {
            noise: 0.0,
            ..Default::default()
        };
        for chip in build_batch(&config).unwrap() {
            assert_eq!(chip.printed_text, chip.part);
        }
    }

    #[test]
    fn oversized_chips_are_rejected() {
        let config = ScenarioConfig {
            chip_size: 0.3,
            ..Default::default()
        };
        assert!(build_batch(&config).is_err());
    }
}
