use axum::{extract::State, Json};
use proctor_core::payload::decode_frame;
use proctor_core::{clock, Blink, FaceSignals, HeadPose, Mouth, ReportLine, Verdict};
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::config::FaceSignalMode;
use crate::error::AppError;

const UNKNOWN_USER: &str = "unknown";

#[derive(Deserialize)]
pub struct DetectRequest {
    /// Opaque client id; browsers send either a string or a number.
    #[serde(default)]
    user_id: Option<serde_json::Value>,
    /// `data:image/...;base64,<payload>`
    #[serde(default)]
    image: Option<String>,
}

impl DetectRequest {
    fn user_key(&self) -> String {
        match &self.user_id {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => UNKNOWN_USER.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DetectResponse {
    pub cheating: Verdict,
    pub blink: Blink,
    pub mouth: Mouth,
    pub head_pose: HeadPose,
}

/// Analyse one webcam frame, log the outcome to the user's report, and
/// return it.
pub async fn detect_cheating(
    State(state): State<AppState>,
    Json(req): Json<DetectRequest>,
) -> Result<Json<DetectResponse>, AppError> {
    let user_id = req.user_key();
    let image = req
        .image
        .ok_or_else(|| AppError::BadRequest("missing image".to_string()))?;
    let frame = decode_frame(&image)?;

    let analysis = state.engine.analyze(frame).await?;
    let verdict = Verdict::from_labels(analysis.labels(), &state.allowed_objects);

    let now = chrono::Local::now();
    let signals = match state.face_signals {
        FaceSignalMode::Clock => clock::signals_at(now.timestamp().max(0) as u64),
        FaceSignalMode::Landmarks => analysis
            .face
            .as_ref()
            .map(FaceSignals::from_mesh)
            .unwrap_or_default(),
    };

    if let Verdict::Flagged(label) = &verdict {
        tracing::warn!(user = %user_id, label = %label, "disallowed object in frame");
    }

    let line = ReportLine::new(&now, signals, verdict.clone());
    state.reports.append(&user_id, &line).await?;

    Ok(Json(DetectResponse {
        cheating: verdict,
        blink: signals.blink,
        mouth: signals.mouth,
        head_pose: signals.head_pose,
    }))
}
