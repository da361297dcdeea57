//! `proctor-monitor` watches a webcam (or a directory of frames) and ends the
//! session after repeated disallowed objects.

use std::fs::File;
use std::io::LineWriter;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use proctor_core::detector::{DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_IOU_THRESHOLD};
use proctor_core::report::session_report_file_name;
use proctor_core::{AllowList, FaceLandmarker, MeshLandmarker, YoloDetector};
use proctor_hw::{Camera, ImageDirSource};
use tracing_subscriber::EnvFilter;

mod monitor;
mod overlay;

use monitor::{MonitorOptions, StopReason};

#[derive(Parser)]
#[command(name = "proctor-monitor", about = "Live exam monitor with a violation limit")]
struct Cli {
    /// V4L2 capture device
    #[arg(long, default_value = "/dev/video0")]
    device: String,

    /// Replay image files from this directory instead of the camera
    #[arg(long)]
    frames_dir: Option<PathBuf>,

    /// Object detector ONNX model
    #[arg(long, default_value = "models/yolov5s.onnx")]
    detector_model: PathBuf,

    /// Face landmark ONNX model; face signals fall back to defaults when absent
    #[arg(long)]
    landmark_model: Option<PathBuf>,

    #[arg(long, default_value_t = DEFAULT_CONFIDENCE_THRESHOLD)]
    confidence: f32,

    #[arg(long, default_value_t = DEFAULT_IOU_THRESHOLD)]
    iou: f32,

    /// Comma-separated object labels that do not count as cheating
    #[arg(long, default_value = "person")]
    allow: String,

    /// Violating frames before the exam is terminated
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u32).range(1..))]
    max_violations: u32,

    /// Stop after this many frames
    #[arg(long)]
    max_frames: Option<u64>,

    #[arg(long, default_value = "reports")]
    reports_dir: PathBuf,

    #[arg(long, default_value = "violations")]
    violations_dir: PathBuf,

    /// Do not save annotated violation frames
    #[arg(long)]
    no_snapshots: bool,

    /// Do not echo report lines to stdout
    #[arg(long)]
    quiet: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    std::fs::create_dir_all(&cli.reports_dir)
        .with_context(|| format!("failed to create {}", cli.reports_dir.display()))?;
    if !cli.no_snapshots {
        std::fs::create_dir_all(&cli.violations_dir)
            .with_context(|| format!("failed to create {}", cli.violations_dir.display()))?;
    }

    let mut detector = YoloDetector::load(&cli.detector_model, cli.confidence, cli.iou)?;
    tracing::info!(path = %cli.detector_model.display(), "object detector loaded");

    let mut landmarker = match &cli.landmark_model {
        Some(path) => {
            let mesh = MeshLandmarker::load(path)?;
            tracing::info!(path = %path.display(), "face landmarker loaded");
            Some(mesh)
        }
        None => {
            tracing::warn!("no landmark model given; face signals stay at their defaults");
            None
        }
    };

    let report_path = cli
        .reports_dir
        .join(session_report_file_name(&Local::now()));
    let file = File::create(&report_path)
        .with_context(|| format!("failed to create {}", report_path.display()))?;
    let mut report = LineWriter::new(file);
    tracing::info!(path = %report_path.display(), "session report opened");

    let opts = MonitorOptions {
        allow: AllowList::parse(&cli.allow),
        max_violations: cli.max_violations,
        max_frames: cli.max_frames,
        snapshot_dir: (!cli.no_snapshots).then(|| cli.violations_dir.clone()),
        echo: !cli.quiet,
    };
    let landmarker = landmarker.as_mut().map(|m| m as &mut dyn FaceLandmarker);

    let summary = match &cli.frames_dir {
        Some(dir) => {
            let mut source = ImageDirSource::open(dir)?;
            monitor::run(&mut source, &mut detector, landmarker, &mut report, &opts)?
        }
        None => {
            let mut camera = Camera::open(&cli.device)?;
            tracing::info!(
                device = %cli.device,
                width = camera.width,
                height = camera.height,
                fourcc = %camera.fourcc,
                "camera streaming"
            );
            monitor::run(&mut camera, &mut detector, landmarker, &mut report, &opts)?
        }
    };

    match summary.reason {
        StopReason::Terminated => tracing::warn!(
            frames = summary.frames,
            violations = summary.violations,
            report = %report_path.display(),
            "exam terminated"
        ),
        StopReason::SourceExhausted | StopReason::FrameLimit => tracing::info!(
            frames = summary.frames,
            violations = summary.violations,
            reason = ?summary.reason,
            report = %report_path.display(),
            "monitor stopped"
        ),
    }
    Ok(())
}
