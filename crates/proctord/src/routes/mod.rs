use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use proctor_core::AllowList;
use tower_sessions::{cookie::SameSite, MemoryStore, SessionManagerLayer};

use crate::config::FaceSignalMode;
use crate::engine::EngineHandle;
use crate::reports::ReportLog;
use crate::store::ExamStore;

mod auth;
mod detect;
mod exam;


/// Services shared by all request handlers, built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub store: ExamStore,
    pub engine: EngineHandle,
    pub reports: ReportLog,
    pub allowed_objects: Arc<AllowList>,
    pub face_signals: FaceSignalMode,
}

/// All routes with an in-memory cookie session layer.
pub fn router(state: AppState) -> Router {
    let sessions = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(false)
        .with_same_site(SameSite::Lax);

    Router::new()
        .route("/", get(auth::home))
        .route("/register", get(auth::register_form).post(auth::register))
        .route("/login", get(auth::login_form).post(auth::login))
        .route("/logout", get(auth::logout))
        .route("/admin", get(exam::admin_dashboard).post(exam::add_question))
        .route("/exam", get(exam::exam_page))
        .route("/submit_exam", post(exam::submit_exam))
        .route("/detect_cheating", post(detect::detect_cheating))
        .layer(sessions)
        .with_state(state)
}
