use anyhow::Context;
use clap::Parser;
use generator::scene::SceneConfig;
use report::{ReportWriter, SessionEvent};
use std::path::PathBuf;
use workflow::config::WorkflowConfig;
use workflow::runner::Runner;
use workflow::session::Session;
use workflow::source::{FileSource, Frame, SyntheticSource};

mod generator;
mod report;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Offline trunk detection session driver")]
struct Args {
    /// Load a workflow config from YAML
    #[arg(long)]
    workflow: Option<PathBuf>,
    /// Recorded scan frame, one raw frame per file (repeatable)
    #[arg(long = "scan")]
    scans: Vec<PathBuf>,
    /// Recorded height packet, one raw packet per file (repeatable)
    #[arg(long = "height")]
    heights: Vec<PathBuf>,
    /// Number of synthetic scan/height cycles to generate
    #[arg(long, default_value_t = 0)]
    synthetic: u64,
    /// Scene description for synthetic cycles
    #[arg(long)]
    scene: Option<PathBuf>,
    /// Override the scene seed
    #[arg(long)]
    seed: Option<u64>,
    /// JSON-lines report, appended to
    #[arg(long, default_value = "tools/data/session_report.jsonl")]
    report: PathBuf,
    #[arg(long, default_value_t = 20.0)]
    min_range: f64,
    #[arg(long, default_value_t = 4000.0)]
    max_range: f64,
    #[arg(long, default_value_t = 100.0)]
    eps: f64,
    #[arg(long, default_value_t = 5)]
    min_points: usize,
    #[arg(long, default_value_t = 50.0)]
    min_radius: f64,
    #[arg(long, default_value_t = 500.0)]
    max_radius: f64,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let workflow_config = if let Some(path) = &args.workflow {
        WorkflowConfig::load(path)?
    } else {
        let config = WorkflowConfig::from_args(
            args.min_range,
            args.max_range,
            args.eps,
            args.min_points,
            args.min_radius,
            args.max_radius,
        );
        config.validate().context("validating command-line thresholds")?;
        config
    };

    let mut session = Session::new(Runner::new(workflow_config.clone()));
    let mut report = ReportWriter::open(&args.report)?;

    let recorded = FileSource::new(args.scans, args.heights);
    run_source(&mut session, &mut report, recorded)?;

    if args.synthetic > 0 {
        let mut scene = match &args.scene {
            Some(path) => SceneConfig::load(path)?,
            None => SceneConfig::default(),
        };
        if let Some(seed) = args.seed {
            scene.seed = seed;
        }
        let synthetic = SyntheticSource::new(scene, workflow_config, args.synthetic);
        run_source(&mut session, &mut report, synthetic)?;
    }

    let metrics = session.metrics();
    report.write(&SessionEvent::summary(
        metrics,
        session.last_detections().len(),
    ))?;

    println!(
        "Session -> cycles {}, failed {}, detections {}, scan cycles with trunks {}, height samples {}",
        metrics.processed,
        metrics.errors,
        metrics.detections,
        session.history().len(),
        session.heights().len()
    );
    if let Some(record) = session.history().last() {
        println!(
            "Last scan with trunks: cycle {} ({} detections)",
            record.cycle,
            record.detections.len()
        );
    }
    for detection in session.last_detections() {
        println!(
            "  trunk at ({:.0}, {:.0}) mm, diameter {:.0} mm",
            detection.center.x, detection.center.y, detection.diameter
        );
    }

    Ok(())
}

fn run_source(
    session: &mut Session,
    report: &mut ReportWriter,
    source: impl Iterator<Item = anyhow::Result<Frame>>,
) -> anyhow::Result<()> {
    for frame in source {
        let event = session.ingest(frame);
        report.write(&event)?;
    }
    Ok(())
}
