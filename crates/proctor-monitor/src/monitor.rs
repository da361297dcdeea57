//! The monitor loop: one frame in, one report line out, until the source
//! ends or the violation limit is reached.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;
use image::RgbImage;
use proctor_core::report::TERMINATION_NOTICE;
use proctor_core::{
    AllowList, DetectorError, FaceLandmarker, FaceSignals, FrameSource, LandmarkerError,
    ObjectDetector, ReportLine, Verdict,
};
use thiserror::Error;

use crate::overlay;

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("frame source error: {0}")]
    Source(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("detector error: {0}")]
    Detector(#[from] DetectorError),
    #[error("landmarker error: {0}")]
    Landmarker(#[from] LandmarkerError),
    #[error("report write failed: {0}")]
    Report(#[from] std::io::Error),
}

pub struct MonitorOptions {
    pub allow: AllowList,
    /// The session ends once this many frames contained a disallowed object.
    pub max_violations: u32,
    /// Stop after this many frames, if set.
    pub max_frames: Option<u64>,
    /// Save annotated violation frames here, if set.
    pub snapshot_dir: Option<PathBuf>,
    /// Echo each report line to stdout.
    pub echo: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    SourceExhausted,
    FrameLimit,
    Terminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorSummary {
    pub frames: u64,
    pub violations: u32,
    pub reason: StopReason,
}

/// Run the monitor until the source ends, the frame cap is hit, or the
/// violation limit is reached.
///
/// Every frame is mirrored before analysis so that overlays match what the
/// candidate sees. A frame counts as at most one violation, however many
/// disallowed objects it contains. A snapshot that cannot be saved is logged
/// and skipped.
pub fn run<S, W>(
    source: &mut S,
    detector: &mut dyn ObjectDetector,
    landmarker: Option<&mut dyn FaceLandmarker>,
    report: &mut W,
    opts: &MonitorOptions,
) -> Result<MonitorSummary, MonitorError>
where
    S: FrameSource,
    W: Write,
{
    let mut landmarker = landmarker;
    let mut frames = 0u64;
    let mut violations = 0u32;

    loop {
        if opts.max_frames.is_some_and(|max| frames >= max) {
            return Ok(MonitorSummary {
                frames,
                violations,
                reason: StopReason::FrameLimit,
            });
        }

        let Some(raw) = source
            .next_frame()
            .map_err(|e| MonitorError::Source(Box::new(e)))?
        else {
            return Ok(MonitorSummary {
                frames,
                violations,
                reason: StopReason::SourceExhausted,
            });
        };
        frames += 1;

        let mut frame = image::imageops::flip_horizontal(&raw);

        let face = match landmarker.as_deref_mut() {
            Some(l) => l.landmarks(&frame)?,
            None => None,
        };
        let detections = detector.detect(&frame)?;

        let verdict = Verdict::from_labels(detections.iter().map(|d| d.label.as_str()), &opts.allow);
        let signals = face
            .as_ref()
            .map(FaceSignals::from_mesh)
            .unwrap_or_default();

        let flagged = verdict.is_flagged();
        overlay::annotate(&mut frame, face.as_ref(), &detections, &opts.allow, flagged);

        if let Verdict::Flagged(label) = &verdict {
            violations += 1;
            tracing::warn!(frame = frames, label = %label, violations, "disallowed object in frame");
        }

        let line = ReportLine::new(&Local::now(), signals, verdict);
        writeln!(report, "{line}")?;
        if opts.echo {
            println!("{line}");
        }

        if let (true, Some(dir)) = (flagged, &opts.snapshot_dir) {
            save_snapshot(&frame, dir, frames);
        }

        if violations >= opts.max_violations {
            report.write_all(TERMINATION_NOTICE.as_bytes())?;
            report.flush()?;
            tracing::warn!(violations, "exam terminated due to repeated cheating");
            if opts.echo {
                println!("Exam Terminated due to repeated cheating.");
            }
            return Ok(MonitorSummary {
                frames,
                violations,
                reason: StopReason::Terminated,
            });
        }
    }
}

fn save_snapshot(frame: &RgbImage, dir: &Path, frame_no: u64) {
    let path = dir.join(format!(
        "violation_{}_{frame_no:05}.png",
        Local::now().format("%Y%m%d_%H%M%S")
    ));
    match frame.save(&path) {
        Ok(()) => tracing::debug!(path = %path.display(), "violation snapshot saved"),
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to save violation snapshot"),
    }
}
