use log::warn;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use super::model::{Crop, DetectionRecord, FrameIndex};
use super::naming::infer_frame_from_paths;
use super::{
    LogError, ANGLE_KEY, CLOSEST_PART_KEY, COORDINATES_KEY, CROP_KEY, FRAME_KEY, MAPPED_PART_KEY,
    MATCH_RATIO_KEY, MIDDLE_POINT_KEY, NO_DETECTIONS_MARKER, ORIENTATION_KEY, RAW_TEXT_KEY,
    REQUESTED_KEY,
};
use crate::catalog::{Orientation, RequestedSource};
use crate::interfaces::BoundingBox;

fn frame_header_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)^\s*FRAME\s*=\s*(\d+)\s*$").expect("valid header pattern"))
}

fn coordinates_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^\(\s*([-+0-9.eE]+)\s*,\s*([-+0-9.eE]+)\s*\)\s*->\s*\(\s*([-+0-9.eE]+)\s*,\s*([-+0-9.eE]+)\s*\)$",
        )
        .expect("valid coordinates pattern")
    })
}

fn field_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\s*(?:(\d+)\.\s*)?([^:]+?)\s*:\s?(.*)$").expect("valid field pattern"))
}

/// Which layout a log was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaGeneration {
    /// Nothing recognizable in the file.
    Empty,
    /// No `FRAME=` headers; frames inferred from file names.
    Legacy,
    /// Explicit `FRAME=<n>` headers.
    Current,
}

/// One unit of the log, before it is folded into [`ParsedLog`].
#[derive(Debug, Clone, PartialEq)]
enum Block {
    FrameHeader(Option<FrameIndex>),
    NoDetections,
    Fields(Vec<Field>),
}

#[derive(Debug, Clone, PartialEq)]
struct Field {
    ordinal: Option<usize>,
    key: String,
    value: String,
}

/// Everything recovered from a detection log.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedLog {
    pub schema: SchemaGeneration,
    pub crops: Vec<Crop>,
    pub records: Vec<DetectionRecord>,
    /// Frames captured without any detection.
    pub empty_frames: Vec<FrameIndex>,
    /// Blocks that could not be interpreted and were skipped.
    pub malformed: usize,
}

impl ParsedLog {
    pub fn is_blank(&self) -> bool {
        self.crops.is_empty() && self.records.is_empty() && self.empty_frames.is_empty()
    }

    pub fn crops_by_frame(&self) -> BTreeMap<FrameIndex, Vec<&Crop>> {
        let mut frames: BTreeMap<FrameIndex, Vec<&Crop>> = BTreeMap::new();
        for crop in &self.crops {
            frames.entry(crop.frame_index).or_default().push(crop);
        }
        frames
    }

    pub fn frames_present(&self) -> BTreeSet<FrameIndex> {
        self.crops
            .iter()
            .map(|crop| crop.frame_index)
            .chain(self.records.iter().map(|record| record.frame_index))
            .chain(self.empty_frames.iter().copied())
            .collect()
    }

    /// `Frame1+2`, `Frame1 only` or `no Frame markers`.
    pub fn frame_status(&self) -> &'static str {
        let frames = self.frames_present();
        match (
            frames.contains(&FrameIndex::First),
            frames.contains(&FrameIndex::Second),
        ) {
            (true, true) => "Frame1+2",
            (true, false) => "Frame1 only",
            _ => "no Frame markers",
        }
    }

    /// Request recorded by the most recent record, for recalling it next run.
    pub fn last_requested_source(&self) -> Option<&RequestedSource> {
        self.records.last().map(|record| &record.requested_source)
    }
}

/// Tolerant reader for both schema generations.
pub struct DetectionLogReader;

impl DetectionLogReader {
    pub fn read<P: AsRef<Path>>(path: P) -> Result<ParsedLog, LogError> {
        let path_ref = path.as_ref();
        match fs::read_to_string(path_ref) {
            Ok(text) => Ok(Self::parse(&text)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(LogError::Missing(path_ref.to_path_buf()))
            }
            Err(source) => Err(LogError::Io {
                path: path_ref.to_path_buf(),
                source,
            }),
        }
    }

    pub fn parse(text: &str) -> ParsedLog {
        let mut log = ParsedLog {
            schema: SchemaGeneration::Empty,
            crops: Vec::new(),
            records: Vec::new(),
            empty_frames: Vec::new(),
            malformed: 0,
        };
        let mut saw_header = false;
        let mut current_frame: Option<FrameIndex> = None;
        let mut crop_counts: HashMap<FrameIndex, usize> = HashMap::new();
        let mut record_counts: HashMap<FrameIndex, usize> = HashMap::new();

        for block in split_blocks(text) {
            match block {
                Block::FrameHeader(frame) => {
                    saw_header = true;
                    if frame.is_none() {
                        warn!("detection log: frame header outside 1..=2 ignored");
                        log.malformed += 1;
                    }
                    current_frame = frame;
                }
                Block::NoDetections => {
                    log.empty_frames.push(current_frame.unwrap_or(FrameIndex::First));
                }
                Block::Fields(fields) => {
                    let fields = FieldSet::new(fields);
                    let mut understood = false;

                    let mut crop_frame = None;
                    if let Some(location) = fields.get(CROP_KEY) {
                        match parse_crop(location, fields.get(COORDINATES_KEY), current_frame) {
                            Some((full, crop_path, bbox, frame)) => {
                                let count = crop_counts.entry(frame).or_insert(0);
                                *count += 1;
                                log.crops.push(Crop {
                                    full_image_path: full,
                                    crop_image_path: crop_path,
                                    frame_index: frame,
                                    sequence_index: *count,
                                    bbox,
                                });
                                crop_frame = Some((frame, *count));
                                understood = true;
                            }
                            None => {
                                warn!("detection log: crop block without usable coordinates skipped");
                                log.malformed += 1;
                                continue;
                            }
                        }
                    }

                    if fields.get(MIDDLE_POINT_KEY).is_some() || fields.get(ANGLE_KEY).is_some() {
                        match parse_record(&fields, current_frame, crop_frame, &record_counts) {
                            Some(record) => {
                                *record_counts.entry(record.frame_index).or_insert(0) += 1;
                                log.records.push(record);
                                understood = true;
                            }
                            None => {
                                warn!("detection log: incomplete detection record skipped");
                                log.malformed += 1;
                                continue;
                            }
                        }
                    }

                    if !understood {
                        warn!("detection log: unrecognized block skipped");
                        log.malformed += 1;
                    }
                }
            }
        }

        log.schema = if saw_header {
            SchemaGeneration::Current
        } else if log.is_blank() {
            SchemaGeneration::Empty
        } else {
            SchemaGeneration::Legacy
        };
        log
    }
}

/// Splits text into blocks. Blank and delimiter lines end a block; a frame
/// header is a block of its own.
fn split_blocks(text: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut pending: Vec<Field> = Vec::new();
    let mut pending_invalid = false;

    let flush = |pending: &mut Vec<Field>, invalid: &mut bool, blocks: &mut Vec<Block>| {
        if !pending.is_empty() || *invalid {
            if *invalid {
                // a line without `key: value` taints the whole block
                blocks.push(Block::Fields(Vec::new()));
            } else {
                blocks.push(Block::Fields(std::mem::take(pending)));
            }
        }
        pending.clear();
        *invalid = false;
    };

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || is_delimiter(trimmed) {
            flush(&mut pending, &mut pending_invalid, &mut blocks);
            continue;
        }
        if let Some(caps) = frame_header_pattern().captures(trimmed) {
            flush(&mut pending, &mut pending_invalid, &mut blocks);
            let frame = caps[1].parse::<u64>().ok().and_then(FrameIndex::from_number);
            blocks.push(Block::FrameHeader(frame));
            continue;
        }
        if trimmed.eq_ignore_ascii_case(NO_DETECTIONS_MARKER) {
            flush(&mut pending, &mut pending_invalid, &mut blocks);
            blocks.push(Block::NoDetections);
            continue;
        }
        match field_pattern().captures(trimmed) {
            Some(caps) => pending.push(Field {
                ordinal: caps.get(1).and_then(|m| m.as_str().parse().ok()),
                key: caps[2].trim().to_lowercase(),
                value: caps[3].trim().to_string(),
            }),
            None => pending_invalid = true,
        }
    }
    flush(&mut pending, &mut pending_invalid, &mut blocks);
    blocks
}

fn is_delimiter(line: &str) -> bool {
    line.len() >= 3 && line.chars().all(|c| c == '-')
}

struct FieldSet {
    fields: Vec<Field>,
}

impl FieldSet {
    fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    fn find(&self, key: &str) -> Option<&Field> {
        let key = key.to_lowercase();
        self.fields.iter().find(|field| field.key == key)
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.find(key).map(|field| field.value.as_str())
    }
}

fn parse_crop(
    location: &str,
    coordinates: Option<&str>,
    current_frame: Option<FrameIndex>,
) -> Option<(PathBuf, PathBuf, BoundingBox, FrameIndex)> {
    let (full, crop) = location.split_once(',')?;
    let (full, crop) = (PathBuf::from(full.trim()), PathBuf::from(crop.trim()));
    let caps = coordinates_pattern().captures(coordinates?.trim())?;
    let value = |i: usize| caps[i].parse::<f64>().ok();
    let bbox = BoundingBox::new(value(1)?, value(2)?, value(3)?, value(4)?);
    let frame = current_frame.unwrap_or_else(|| infer_frame_from_paths(&full, &crop));
    Some((full, crop, bbox, frame))
}

fn parse_point(value: &str) -> Option<(f64, f64)> {
    let inner = value.trim().strip_prefix('(')?.strip_suffix(')')?;
    let (x, y) = inner.split_once(',')?;
    Some((x.trim().parse().ok()?, y.trim().parse().ok()?))
}

fn optional_name(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|name| !name.is_empty() && !name.eq_ignore_ascii_case("none"))
        .map(str::to_string)
}

/// Builds a record; the middle point and angle are required, everything else
/// falls back to its empty value.
///
/// The `Raw OCR Text` ordinal is a crop index only in blocks that carry a
/// `Frame:` field. Older blocks number every field, so there the index comes
/// from the crop the block belongs to, or from the record's position within
/// its frame.
fn parse_record(
    fields: &FieldSet,
    current_frame: Option<FrameIndex>,
    crop_frame: Option<(FrameIndex, usize)>,
    record_counts: &HashMap<FrameIndex, usize>,
) -> Option<DetectionRecord> {
    let centroid = parse_point(fields.get(MIDDLE_POINT_KEY)?)?;
    let rotation_angle_deg = fields
        .get(ANGLE_KEY)?
        .trim_end_matches('°')
        .trim()
        .parse::<f64>()
        .ok()?;

    let frame_field = fields.get(FRAME_KEY);
    let frame_index = match frame_field {
        Some(value) => FrameIndex::from_number(value.trim().parse().ok()?)?,
        None => crop_frame
            .map(|(frame, _)| frame)
            .or(current_frame)
            .unwrap_or(FrameIndex::First),
    };
    let raw_text = fields.find(RAW_TEXT_KEY);
    let sequence_index = raw_text
        .and_then(|field| field.ordinal)
        .filter(|_| frame_field.is_some())
        .or(crop_frame.map(|(_, index)| index))
        .unwrap_or_else(|| record_counts.get(&frame_index).copied().unwrap_or(0) + 1);

    Some(DetectionRecord {
        frame_index,
        sequence_index,
        raw_ocr_text: raw_text.map(|field| field.value.clone()).unwrap_or_default(),
        rotation_angle_deg,
        centroid,
        best_known_part: optional_name(fields.get(CLOSEST_PART_KEY)),
        match_ratio: fields
            .get(MATCH_RATIO_KEY)
            .and_then(|value| value.parse().ok())
            .unwrap_or(0.0),
        requested_source: fields
            .get(REQUESTED_KEY)
            .map(RequestedSource::from_log_value)
            .unwrap_or_default(),
        mapped_part: optional_name(fields.get(MAPPED_PART_KEY)),
        orientation: fields
            .get(ORIENTATION_KEY)
            .and_then(|value| value.trim_end_matches('°').trim().parse().ok())
            .and_then(Orientation::from_degrees),
    })
}
