use axum::{
    extract::State,
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;
use tower_sessions::Session;

use super::AppState;
use crate::error::AppError;
use crate::pages;
use crate::session;
use crate::store::Role;

#[derive(Deserialize)]
pub struct Registration {
    username: String,
    password: String,
    role: String,
}

#[derive(Deserialize)]
pub struct Credentials {
    username: String,
    password: String,
}

pub async fn home() -> Html<String> {
    pages::home()
}

pub async fn register_form() -> Html<String> {
    pages::register()
}

pub async fn register(
    State(state): State<AppState>,
    Form(form): Form<Registration>,
) -> Result<Redirect, AppError> {
    let role: Role = form
        .role
        .parse()
        .map_err(|role| AppError::BadRequest(format!("unknown role: {role}")))?;

    let id = state
        .store
        .create_user(&form.username, &form.password, role)
        .await?;
    tracing::info!(user = id, username = %form.username, %role, "user registered");

    Ok(Redirect::to("/login"))
}

pub async fn login_form() -> Html<String> {
    pages::login()
}

/// On a match, start the session and send the user to their role's page.
/// Otherwise show the login form again.
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(creds): Form<Credentials>,
) -> Result<Response, AppError> {
    let Some(user) = state
        .store
        .find_user(&creds.username, &creds.password)
        .await?
    else {
        tracing::debug!(username = %creds.username, "login failed");
        return Ok(pages::login().into_response());
    };

    session::sign_in(&session, &user).await?;
    tracing::info!(user = user.id, role = %user.role, "login");

    let target = match user.role {
        Role::Admin => "/admin",
        Role::Student => "/exam",
    };
    Ok(Redirect::to(target).into_response())
}

pub async fn logout(session: Session) -> Result<Redirect, AppError> {
    session::sign_out(&session).await?;
    Ok(Redirect::to("/"))
}
