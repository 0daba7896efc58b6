use anyhow::Context;
use chipsortcore::catalog::CircuitTable;
use chipsortcore::processing::{load_detection_log, plan_record, RecordPlan};

use crate::workflow::config::WorkflowConfig;

/// Motion plans for every record of an existing detection log. Nothing is
/// moved.
pub fn plan_detection_log(config: &WorkflowConfig) -> anyhow::Result<Vec<RecordPlan>> {
    let log = load_detection_log(&config.detection_log)
        .with_context(|| format!("loading {}", config.detection_log.display()))?;
    let table = CircuitTable::load_or_empty(&config.circuits_file);
    Ok(log
        .records
        .iter()
        .map(|record| plan_record(record, &table, &config.arm))
        .collect())
}

pub fn render_plans(plans: &[RecordPlan], as_json: bool) -> anyhow::Result<String> {
    if as_json {
        return serde_json::to_string_pretty(plans).context("serializing record plans");
    }
    let mut out = String::new();
    for plan in plans {
        out.push_str(&format!(
            "Frame {} #{} at arm ({:.2}, {:.2}) -> {}\n",
            plan.frame_index.number(),
            plan.sequence_index,
            plan.arm_xy.0,
            plan.arm_xy.1,
            plan.destination
        ));
        out.push_str(&format!(
            "  pick: approach {} grasp {} offset {:.2} deg, gripper {} steps\n",
            plan.pick.approach, plan.pick.grasp, plan.pickup_offset_deg, plan.pick.gripper_steps
        ));
        out.push_str(&format!(
            "  drop: approach {} release {}, gripper {} steps\n",
            plan.drop.approach, plan.drop.release, plan.drop.gripper_steps
        ));
    }
    if plans.is_empty() {
        out.push_str("No records to plan.\n");
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chipsortcore::catalog::RequestedSource;
    use chipsortcore::detection_log::{DetectionLogWriter, DetectionRecord, FrameGroup, FrameIndex};
    use chipsortcore::processing::Destination;
    use std::fs;
    use tempfile::tempdir;

    fn record(sequence_index: usize, mapped: Option<&str>) -> DetectionRecord {
        DetectionRecord {
            frame_index: FrameIndex::First,
            sequence_index,
            raw_ocr_text: "LM745".into(),
            rotation_angle_deg: 12.0,
            centroid: (0.4, 0.6),
            best_known_part: Some("LM745".into()),
            match_ratio: 1.0,
            requested_source: RequestedSource::circuit("CIRCUIT1"),
            mapped_part: mapped.map(str::to_string),
            orientation: None,
        }
    }

    #[test]
    fn plans_follow_log_order_and_destinations() {
        let dir = tempdir().unwrap();
        let circuits = dir.path().join("circuits.txt");
        fs::write(&circuits, "CIRCUIT1 = [\n  \"1. LM745 (-15, 10, 12.5, 90)\",\n]\n").unwrap();
        let config = WorkflowConfig::from_args(dir.path().to_path_buf(), circuits);
        let writer = DetectionLogWriter::new(&config.detection_log);
        writer
            .start_run(&FrameGroup {
                frame_index: FrameIndex::First,
                full_image_path: None,
                crops: vec![],
            })
            .unwrap();
        writer.append_record(&record(1, Some("LM745"))).unwrap();
        writer.append_record(&record(2, None)).unwrap();

        let plans = plan_detection_log(&config).unwrap();
        assert_eq!(plans.len(), 2);
        assert_eq!(
            plans[0].destination,
            Destination::Slot {
                circuit: "CIRCUIT1".into(),
                part: "LM745".into()
            }
        );
        assert!(matches!(plans[1].destination, Destination::RejectBin { .. }));

        let text = render_plans(&plans, false).unwrap();
        assert!(text.contains("CIRCUIT1/LM745"));
        let json = render_plans(&plans, true).unwrap();
        assert!(json.contains("\"RejectBin\""));
    }

    #[test]
    fn missing_log_is_reported() {
        let dir = tempdir().unwrap();
        let config = WorkflowConfig::from_args(dir.path().to_path_buf(), dir.path().join("circuits.txt"));
        assert!(plan_detection_log(&config).is_err());
    }
}
