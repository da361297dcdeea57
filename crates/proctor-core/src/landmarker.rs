//! Face-mesh landmark model on ONNX Runtime.
//!
//! Expects the 468-point face-mesh export: a `1×3×192×192` RGB input in
//! `[0, 1]`, a first output of `468 × 3` coordinates in input pixels and a
//! second output holding the face-presence logit.

use std::path::Path;

use image::{imageops::FilterType, RgbImage};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use thiserror::Error;

use crate::{FaceLandmarker, FaceMesh, Landmark};

pub const MESH_INPUT_SIZE: u32 = 192;
pub const MESH_POINTS: usize = 468;
/// Minimum face-presence probability to accept a mesh.
pub const DEFAULT_PRESENCE_THRESHOLD: f32 = 0.5;

#[derive(Error, Debug)]
pub enum LandmarkerError {
    #[error("failed to load landmark model {path}: {message}")]
    Load { path: String, message: String },
    #[error("landmark inference failed: {0}")]
    Inference(String),
    #[error("landmark output has {0} values, expected at least {expected}", expected = MESH_POINTS * 3)]
    OutputSize(usize),
}

/// Convert the raw coordinate output into a normalised mesh.
///
/// The input image is stretched to the square model input, so dividing by
/// the input size yields coordinates normalised to the original frame.
pub fn mesh_from_output(coords: &[f32]) -> Result<FaceMesh, LandmarkerError> {
    if coords.len() < MESH_POINTS * 3 {
        return Err(LandmarkerError::OutputSize(coords.len()));
    }
    let size = MESH_INPUT_SIZE as f32;
    let points = coords
        .chunks_exact(3)
        .take(MESH_POINTS)
        .map(|p| Landmark {
            x: p[0] / size,
            y: p[1] / size,
        })
        .collect();
    Ok(FaceMesh { points })
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

pub struct MeshLandmarker {
    session: Session,
    presence_threshold: f32,
}

impl MeshLandmarker {
    pub fn load(path: &Path) -> Result<Self, LandmarkerError> {
        let load_err = |e: &dyn std::fmt::Display| LandmarkerError::Load {
            path: path.display().to_string(),
            message: e.to_string(),
        };
        let builder = Session::builder().map_err(|e| load_err(&e))?;
        let builder = builder
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| load_err(&e))?;
        let session = builder.commit_from_file(path).map_err(|e| load_err(&e))?;

        Ok(Self {
            session,
            presence_threshold: DEFAULT_PRESENCE_THRESHOLD,
        })
    }
}

impl FaceLandmarker for MeshLandmarker {
    fn landmarks(&mut self, frame: &RgbImage) -> Result<Option<FaceMesh>, LandmarkerError> {
        let resized =
            image::imageops::resize(frame, MESH_INPUT_SIZE, MESH_INPUT_SIZE, FilterType::Triangle);
        let plane = (MESH_INPUT_SIZE * MESH_INPUT_SIZE) as usize;
        let mut data = vec![0.0f32; 3 * plane];
        for (i, pixel) in resized.pixels().enumerate() {
            for c in 0..3 {
                data[c * plane + i] = pixel[c] as f32 / 255.0;
            }
        }

        let input = Tensor::from_array((
            vec![1i64, 3, MESH_INPUT_SIZE as i64, MESH_INPUT_SIZE as i64],
            data,
        ))
        .map_err(|e| LandmarkerError::Inference(e.to_string()))?;

        let outputs = self
            .session
            .run(ort::inputs![input])
            .map_err(|e| LandmarkerError::Inference(e.to_string()))?;

        if outputs.len() > 1 {
            let (_, presence) = outputs[1]
                .try_extract_tensor::<f32>()
                .map_err(|e| LandmarkerError::Inference(e.to_string()))?;
            let score = presence.first().copied().map(sigmoid).unwrap_or(0.0);
            if score < self.presence_threshold {
                tracing::trace!(score, "no face present");
                return Ok(None);
            }
        }

        let (_, coords) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| LandmarkerError::Inference(e.to_string()))?;
        mesh_from_output(coords).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mesh_normalised_by_input_size() {
        let mut coords = vec![0.0f32; MESH_POINTS * 3];
        coords[3] = 96.0; // point 1 x
        coords[4] = 48.0; // point 1 y
        let mesh = mesh_from_output(&coords).unwrap();
        assert_eq!(mesh.points.len(), MESH_POINTS);
        assert_eq!(mesh.point(1), Some(Landmark { x: 0.5, y: 0.25 }));
    }

    #[test]
    fn test_short_output_rejected() {
        let err = mesh_from_output(&[0.0; 30]).unwrap_err();
        assert!(matches!(err, LandmarkerError::OutputSize(30)));
    }

    #[test]
    fn test_sigmoid() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-6);
        assert!(sigmoid(10.0) > 0.99);
        assert!(sigmoid(-10.0) < 0.01);
    }
}
