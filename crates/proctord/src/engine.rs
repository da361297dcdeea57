use image::RgbImage;
use proctor_core::{
    Detection, DetectorError, FaceLandmarker, FaceMesh, LandmarkerError, ObjectDetector,
};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("detector error: {0}")]
    Detector(#[from] DetectorError),
    #[error("landmarker error: {0}")]
    Landmarker(#[from] LandmarkerError),
    #[error("engine thread exited")]
    ChannelClosed,
}

/// What the models saw in one frame.
#[derive(Debug, Clone, Default)]
pub struct FrameAnalysis {
    /// Detections ordered by descending confidence.
    pub detections: Vec<Detection>,
    /// Face mesh of the most prominent face; `None` when no face model is
    /// loaded or no face was found.
    pub face: Option<FaceMesh>,
}

impl FrameAnalysis {
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.detections.iter().map(|d| d.label.as_str())
    }
}

/// Messages sent from HTTP handlers to the engine thread.
enum EngineRequest {
    Analyze {
        frame: RgbImage,
        reply: oneshot::Sender<Result<FrameAnalysis, EngineError>>,
    },
}

/// Clone-safe handle to the engine thread.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineRequest>,
}

impl EngineHandle {
    /// Run object detection (and face landmarks, if loaded) on one frame.
    pub async fn analyze(&self, frame: RgbImage) -> Result<FrameAnalysis, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::Analyze {
                frame,
                reply: reply_tx,
            })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)?
    }
}

/// Spawn the engine on a dedicated OS thread.
///
/// The models are loaded by the caller and moved onto the thread, which owns
/// them for the lifetime of the process. Requests are served one at a time.
pub fn spawn_engine(
    mut detector: Box<dyn ObjectDetector>,
    mut landmarker: Option<Box<dyn FaceLandmarker>>,
) -> std::io::Result<EngineHandle> {
    let (tx, mut rx) = mpsc::channel::<EngineRequest>(8);

    std::thread::Builder::new()
        .name("proctor-engine".into())
        .spawn(move || {
            tracing::info!(
                landmarks = landmarker.is_some(),
                "engine thread started"
            );
            while let Some(req) = rx.blocking_recv() {
                match req {
                    EngineRequest::Analyze { frame, reply } => {
                        let result = run_analyze(&frame, detector.as_mut(), &mut landmarker);
                        let _ = reply.send(result);
                    }
                }
            }
            tracing::info!("engine thread exiting");
        })?;

    Ok(EngineHandle { tx })
}

fn run_analyze(
    frame: &RgbImage,
    detector: &mut dyn ObjectDetector,
    landmarker: &mut Option<Box<dyn FaceLandmarker>>,
) -> Result<FrameAnalysis, EngineError> {
    let detections = detector.detect(frame)?;
    let face = match landmarker {
        Some(landmarker) => landmarker.landmarks(frame)?,
        None => None,
    };

    tracing::debug!(
        width = frame.width(),
        height = frame.height(),
        detections = detections.len(),
        face = face.is_some(),
        "frame analysed"
    );

    Ok(FrameAnalysis { detections, face })
}
