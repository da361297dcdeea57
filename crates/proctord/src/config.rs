use std::net::SocketAddr;
use std::path::PathBuf;

use proctor_core::detector::{DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_IOU_THRESHOLD};
use proctor_core::AllowList;

/// Where the blink/mouth/head-pose fields of `/detect_cheating` come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaceSignalMode {
    /// Derived from the wall clock; no face model is loaded.
    Clock,
    /// Derived from the face-mesh model and landmark heuristics.
    Landmarks,
}

impl FaceSignalMode {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "clock" => Some(Self::Clock),
            "landmarks" => Some(Self::Landmarks),
            _ => None,
        }
    }
}

/// Server configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Listen address (default: 127.0.0.1:5000).
    pub bind: SocketAddr,
    /// Path to the SQLite database file.
    pub db_path: PathBuf,
    /// Directory holding per-user report logs.
    pub reports_dir: PathBuf,
    /// Directory for violation snapshots. Created at startup.
    pub violations_dir: PathBuf,
    /// Directory containing ONNX model files.
    pub model_dir: PathBuf,
    /// Object detector model file name, relative to `model_dir`.
    pub detector_model: String,
    /// Face-mesh model file name, relative to `model_dir`.
    pub landmark_model: String,
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    /// Object labels that never count as cheating.
    pub allowed_objects: AllowList,
    pub face_signals: FaceSignalMode,
    /// Maximum request body size; frames arrive as base64 JSON.
    pub body_limit_bytes: usize,
    pub request_timeout_secs: u64,
}

impl Config {
    /// Load configuration from `PROCTOR_*` environment variables with defaults.
    pub fn from_env() -> Self {
        let bind = env_parse("PROCTOR_BIND", SocketAddr::from(([127, 0, 0, 1], 5000)));

        let face_signals = match std::env::var("PROCTOR_FACE_SIGNALS") {
            Ok(v) => FaceSignalMode::parse(&v).unwrap_or_else(|| {
                tracing::warn!(value = %v, "unknown PROCTOR_FACE_SIGNALS, using clock");
                FaceSignalMode::Clock
            }),
            Err(_) => FaceSignalMode::Clock,
        };

        Self {
            bind,
            db_path: env_path("PROCTOR_DB_PATH", "exam_system.db"),
            reports_dir: env_path("PROCTOR_REPORTS_DIR", "reports"),
            violations_dir: env_path("PROCTOR_VIOLATIONS_DIR", "violations"),
            model_dir: env_path("PROCTOR_MODEL_DIR", "models"),
            detector_model: std::env::var("PROCTOR_DETECTOR_MODEL")
                .unwrap_or_else(|_| "yolov5s.onnx".to_string()),
            landmark_model: std::env::var("PROCTOR_LANDMARK_MODEL")
                .unwrap_or_else(|_| "face_landmark.onnx".to_string()),
            confidence_threshold: env_parse(
                "PROCTOR_CONFIDENCE_THRESHOLD",
                DEFAULT_CONFIDENCE_THRESHOLD,
            ),
            iou_threshold: env_parse("PROCTOR_IOU_THRESHOLD", DEFAULT_IOU_THRESHOLD),
            allowed_objects: std::env::var("PROCTOR_ALLOWED_OBJECTS")
                .map(|v| AllowList::parse(&v))
                .unwrap_or_default(),
            face_signals,
            body_limit_bytes: env_parse("PROCTOR_BODY_LIMIT_BYTES", 10 * 1024 * 1024),
            request_timeout_secs: env_parse("PROCTOR_REQUEST_TIMEOUT_SECS", 30),
        }
    }

    pub fn detector_model_path(&self) -> PathBuf {
        self.model_dir.join(&self.detector_model)
    }

    pub fn landmark_model_path(&self) -> PathBuf {
        self.model_dir.join(&self.landmark_model)
    }
}

fn env_path(key: &str, default: &str) -> PathBuf {
    std::env::var(key)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(default))
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_face_signal_mode_parse() {
        assert_eq!(FaceSignalMode::parse("clock"), Some(FaceSignalMode::Clock));
        assert_eq!(
            FaceSignalMode::parse(" Landmarks "),
            Some(FaceSignalMode::Landmarks)
        );
        assert_eq!(FaceSignalMode::parse("mediapipe"), None);
    }

    #[test]
    fn test_env_parse_falls_back_on_garbage() {
        std::env::set_var("PROCTOR_TEST_ENV_PARSE_U64", "not-a-number");
        assert_eq!(env_parse("PROCTOR_TEST_ENV_PARSE_U64", 7u64), 7);
        std::env::set_var("PROCTOR_TEST_ENV_PARSE_U64", "12");
        assert_eq!(env_parse("PROCTOR_TEST_ENV_PARSE_U64", 7u64), 12);
    }
}
