use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::store::{Role, User};

/// Key under which the authenticated user is stored in the session.
pub const SESSION_USER_KEY: &str = "user";

/// The authenticated user, as carried between requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub user_id: i64,
    pub role: Role,
}

impl From<&User> for SessionUser {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            role: user.role,
        }
    }
}

/// Start an authenticated session. The session id is rotated on login.
pub async fn sign_in(session: &Session, user: &User) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(SESSION_USER_KEY, SessionUser::from(user)).await
}

pub async fn current_user(
    session: &Session,
) -> Result<Option<SessionUser>, tower_sessions::session::Error> {
    session.get::<SessionUser>(SESSION_USER_KEY).await
}

/// The current user, only if they hold `role`.
pub async fn require_role(
    session: &Session,
    role: Role,
) -> Result<Option<SessionUser>, tower_sessions::session::Error> {
    Ok(current_user(session).await?.filter(|u| u.role == role))
}

pub async fn sign_out(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}
