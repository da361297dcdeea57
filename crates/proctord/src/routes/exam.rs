use std::collections::HashMap;

use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;
use tower_sessions::Session;

use super::AppState;
use crate::error::AppError;
use crate::exam;
use crate::pages;
use crate::session;
use crate::store::{NewQuestion, Role};

#[derive(Deserialize)]
pub struct QuestionForm {
    question: String,
    option1: String,
    option2: String,
    option3: String,
    option4: String,
    correct_answer: String,
}

impl QuestionForm {
    fn validate(self) -> Result<NewQuestion, AppError> {
        let correct = self.correct_answer.trim();
        if !matches!(correct, "1" | "2" | "3" | "4") {
            return Err(AppError::BadRequest(format!(
                "correct_answer must be 1-4, got {:?}",
                self.correct_answer
            )));
        }
        Ok(NewQuestion {
            question: self.question,
            options: [self.option1, self.option2, self.option3, self.option4],
            correct_answer: correct.to_string(),
        })
    }
}

pub async fn admin_dashboard(
    State(state): State<AppState>,
    session: Session,
) -> Result<Response, AppError> {
    if session::require_role(&session, Role::Admin).await?.is_none() {
        return Ok(Redirect::to("/").into_response());
    }
    let questions = state.store.list_questions().await?;
    Ok(pages::admin_dashboard(&questions).into_response())
}

pub async fn add_question(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<QuestionForm>,
) -> Result<Response, AppError> {
    let Some(admin) = session::require_role(&session, Role::Admin).await? else {
        return Ok(Redirect::to("/").into_response());
    };

    let id = state.store.add_question(form.validate()?).await?;
    tracing::info!(question = id, admin = admin.user_id, "question added");

    let questions = state.store.list_questions().await?;
    Ok(pages::admin_dashboard(&questions).into_response())
}

pub async fn exam_page(
    State(state): State<AppState>,
    session: Session,
) -> Result<Response, AppError> {
    if session::require_role(&session, Role::Student).await?.is_none() {
        return Ok(Redirect::to("/").into_response());
    }
    let questions = state.store.list_questions().await?;
    Ok(pages::exam(&questions).into_response())
}

pub async fn submit_exam(
    State(state): State<AppState>,
    session: Session,
    Form(answers): Form<HashMap<String, String>>,
) -> Result<Response, AppError> {
    let Some(student) = session::require_role(&session, Role::Student).await? else {
        return Ok(Redirect::to("/").into_response());
    };

    let questions = state.store.list_questions().await?;
    let result = exam::score(&questions, &answers);
    tracing::info!(
        user = student.user_id,
        score = result.score,
        total = result.total,
        "exam submitted"
    );

    Ok(pages::result(result).into_response())
}
