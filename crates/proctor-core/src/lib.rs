//! Detection pipeline shared by the proctor server and the standalone monitor.
//!
//! The two pretrained models are opaque collaborators behind the
//! [`ObjectDetector`] and [`FaceLandmarker`] traits. Everything built on top
//! of their outputs (face heuristics, the allow-list verdict, report lines)
//! is plain data in, plain data out.

use image::RgbImage;

pub mod clock;
pub mod detector;
pub mod heuristics;
pub mod landmarker;
pub mod payload;
pub mod report;
pub mod verdict;

pub use detector::{DetectorError, YoloDetector};
pub use heuristics::{Blink, FaceSignals, HeadPose, Mouth};
pub use landmarker::{LandmarkerError, MeshLandmarker};
pub use report::ReportLine;
pub use verdict::{AllowList, Verdict};

/// A single object recognised in a frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// Class label, e.g. `"person"` or `"cell phone"`.
    pub label: String,
    /// Objectness × class score.
    pub confidence: f32,
    /// Bounding box `[x1, y1, x2, y2]` in source-frame pixels.
    pub bbox: [f32; 4],
}

/// A facial landmark in normalised image space (`[0, 1]` on both axes).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
}

/// Landmarks for one detected face, indexed by face-mesh point number.
#[derive(Debug, Clone, Default)]
pub struct FaceMesh {
    pub points: Vec<Landmark>,
}

impl FaceMesh {
    pub fn point(&self, index: usize) -> Option<Landmark> {
        self.points.get(index).copied()
    }
}

/// Recognises objects in a frame. Results are ordered by descending confidence.
pub trait ObjectDetector: Send {
    fn detect(&mut self, frame: &RgbImage) -> Result<Vec<Detection>, DetectorError>;
}

/// Produces the face mesh of the most prominent face, if any.
pub trait FaceLandmarker: Send {
    fn landmarks(&mut self, frame: &RgbImage) -> Result<Option<FaceMesh>, LandmarkerError>;
}

/// A stream of frames. `Ok(None)` means the stream is exhausted.
pub trait FrameSource {
    type Error: std::error::Error + Send + Sync + 'static;

    fn next_frame(&mut self) -> Result<Option<RgbImage>, Self::Error>;
}
