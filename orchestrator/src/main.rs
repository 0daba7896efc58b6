use anyhow::Context;
use bridge::bridge::{bind_address, StatusBridge};
use chipsortcore::catalog::{CircuitTable, RequestedSource};
use clap::Parser;
use sim::SimulatedLine;
use std::path::PathBuf;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use workflow::config::WorkflowConfig;
use workflow::plan::{plan_detection_log, render_plans};
use workflow::request::{recall_previous_request, request_from_speech, spelled_transcript};
use workflow::runner::{RunSummary, Runner};

mod bridge;
mod generator;
mod sim;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Chip-sorting line stage sequencer")]
struct Args {
    /// Run one batch through the simulated belt line
    #[arg(long, default_value_t = false)]
    offline: bool,
    /// Load a workflow config from YAML
    #[arg(long)]
    workflow: Option<PathBuf>,
    #[arg(long, default_value = "captures")]
    save_folder: PathBuf,
    #[arg(long, default_value = "demos/circuits.txt")]
    circuits: PathBuf,
    /// Request every part of a circuit
    #[arg(long)]
    circuit: Option<String>,
    /// Request a comma-separated part list
    #[arg(long)]
    parts: Option<String>,
    /// Request from a spoken transcript
    #[arg(long)]
    spoken: Option<String>,
    /// Request from a letter-by-letter dictation ("next" between chips)
    #[arg(long)]
    spelled: Option<String>,
    /// Reuse the request recorded by the previous run
    #[arg(long, default_value_t = false)]
    recall: bool,
    /// Capture a second frame after the belt nudge
    #[arg(long)]
    multi_capture: Option<bool>,
    /// Seed for the simulated batch
    #[arg(long)]
    seed: Option<u64>,
    /// Print pick/drop plans for the current detection log without moving anything
    #[arg(long, default_value_t = false)]
    plan: bool,
    /// Emit plans and summaries as JSON
    #[arg(long, default_value_t = false)]
    json: bool,
    /// Keep the status bridge alive after the run
    #[arg(long, default_value_t = false)]
    serve: bool,
}

fn requested_source(args: &Args, config: &WorkflowConfig) -> anyhow::Result<Option<RequestedSource>> {
    if let Some(circuit) = &args.circuit {
        return Ok(Some(RequestedSource::circuit(circuit)));
    }
    if let Some(parts) = &args.parts {
        return Ok(Some(RequestedSource::parts_from_list(parts)));
    }
    let transcript = match (&args.spoken, &args.spelled) {
        (Some(spoken), _) => Some(spoken.clone()),
        (None, Some(spelled)) => Some(spelled_transcript(spelled)),
        (None, None) => None,
    };
    if let Some(transcript) = transcript {
        let table = CircuitTable::load_or_empty(&config.circuits_file);
        return Ok(Some(request_from_speech(&transcript, &config.ocr.known_parts, &table)));
    }
    if args.recall {
        let previous = recall_previous_request(config)?;
        if previous.is_none() {
            println!("No previous request found; running without one.");
        }
        return Ok(previous);
    }
    Ok(None)
}

fn print_summary(summary: &RunSummary, as_json: bool) -> anyhow::Result<()> {
    if as_json {
        println!(
            "{}",
            serde_json::to_string_pretty(summary).context("serializing run summary")?
        );
        return Ok(());
    }
    println!(
        "Offline run -> frames {}, request {}, records {}",
        summary.frame_status,
        summary.request,
        summary.records.len()
    );
    for record in &summary.records {
        println!(
            "  frame {} #{}: '{}' -> {} ({:.2})",
            record.frame_index.number(),
            record.sequence_index,
            record.raw_ocr_text,
            record.mapped_part.as_deref().unwrap_or("unmapped"),
            record.match_ratio
        );
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut workflow_config = if let Some(path) = &args.workflow {
        WorkflowConfig::load(path)?
    } else {
        WorkflowConfig::from_args(args.save_folder.clone(), args.circuits.clone())
    };
    if let Some(seed) = args.seed {
        workflow_config.scenario.seed = seed;
    }
    if let Some(enabled) = args.multi_capture {
        workflow_config.set_multi_capture_flag(enabled)?;
    }

    if let Some(request) = requested_source(&args, &workflow_config)? {
        request
            .write_request_file(&workflow_config.request_file)
            .context("writing request file")?;
        println!("Request: {request}");
    }

    let status_bridge = if args.serve {
        Some(StatusBridge::start(
            bind_address(workflow_config.bridge_port),
            workflow_config.request_file.clone(),
        )?)
    } else {
        None
    };

    if args.offline {
        let line = SimulatedLine::new(&workflow_config.scenario)?;
        println!(
            "Simulated batch: {} chip(s), seed {}",
            line.chips().len(),
            workflow_config.scenario.seed
        );
        let runner = Runner::new(workflow_config.clone());
        let summary = runner.execute(&line).context("offline run failed")?;
        print_summary(&summary, args.json)?;
        if let Some(bridge) = &status_bridge {
            bridge.publish(&summary);
        }
    }

    if args.plan {
        let plans = plan_detection_log(&workflow_config)?;
        print!("{}", render_plans(&plans, args.json)?);
    }

    if let Some(bridge) = &status_bridge {
        bridge.publish_status(&format!(
            "HTTP bridge on {} (Ctrl+C to stop)...",
            bridge.address()
        ));
        let runtime = TokioBuilder::new_current_thread()
            .enable_all()
            .build()
            .context("creating runtime for signal handling")?;
        runtime.block_on(async {
            signal::ctrl_c().await.context("awaiting Ctrl+C to exit")?;
            Ok::<(), anyhow::Error>(())
        })?;
    }

    Ok(())
}
