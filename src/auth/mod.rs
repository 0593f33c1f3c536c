use axum::{routing::post, Router};
use chrono::{DateTime, SubsecRound, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{db, models::Presence, AppResult, AppState};

mod login;
mod register;

pub use login::login;
pub use register::{register_user, NewUser};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register::register))
        .route("/login", post(login::login_handler))
}

/// Sets a user's status and stamps last-seen with the current time.
/// Returns the stamp, or `None` when the user does not exist.
pub(crate) async fn set_presence(
    db_pool: &SqlitePool,
    user_id: Uuid,
    presence: &Presence,
) -> AppResult<Option<DateTime<Utc>>> {
    let now = Utc::now().trunc_subsecs(6);
    let result = sqlx::query("UPDATE users SET status=?, last_seen=? WHERE id=?")
        .bind(presence.as_str())
        .bind(db::micros(now))
        .bind(user_id.to_string())
        .execute(db_pool)
        .await?;
    Ok((result.rows_affected() == 1).then_some(now))
}
