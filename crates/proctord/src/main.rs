use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::DefaultBodyLimit;
use proctor_core::{FaceLandmarker, MeshLandmarker, YoloDetector};
use tower_http::{
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
    LatencyUnit,
};
use tracing::Level;
use tracing_subscriber::EnvFilter;

mod config;
mod engine;
mod error;
mod exam;
mod pages;
mod reports;
mod routes;
mod session;
mod store;

use config::{Config, FaceSignalMode};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::info!("proctord starting");
    let config = Config::from_env();

    for dir in [&config.reports_dir, &config.violations_dir] {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }

    let store = store::ExamStore::open(&config.db_path)
        .await
        .with_context(|| format!("failed to open database {}", config.db_path.display()))?;
    tracing::info!(
        path = %config.db_path.display(),
        users = store.count_users().await?,
        "database ready"
    );

    // Models load synchronously so a missing file fails startup, not the first request.
    let detector = YoloDetector::load(
        &config.detector_model_path(),
        config.confidence_threshold,
        config.iou_threshold,
    )?;
    tracing::info!(path = %config.detector_model_path().display(), "object detector loaded");

    let landmarker: Option<Box<dyn FaceLandmarker>> = match config.face_signals {
        FaceSignalMode::Landmarks => {
            let mesh = MeshLandmarker::load(&config.landmark_model_path())?;
            tracing::info!(path = %config.landmark_model_path().display(), "face landmarker loaded");
            Some(Box::new(mesh))
        }
        FaceSignalMode::Clock => {
            tracing::warn!("face signals derived from the clock; set PROCTOR_FACE_SIGNALS=landmarks to analyse faces");
            None
        }
    };

    let engine = engine::spawn_engine(Box::new(detector), landmarker)
        .context("failed to spawn engine thread")?;

    let state = routes::AppState {
        store,
        engine,
        reports: reports::ReportLog::new(&config.reports_dir),
        allowed_objects: Arc::new(config.allowed_objects.clone()),
        face_signals: config.face_signals,
    };

    let app = routes::router(state)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(config.body_limit_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.request_timeout_secs,
        )))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .latency_unit(LatencyUnit::Millis),
                ),
        );

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    tracing::info!(addr = %config.bind, "proctord ready");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("proctord shutting down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
