use axum::{debug_handler, extract::{rejection::JsonRejection, State}, Json};
use serde::Deserialize;
use sqlx::{FromRow, SqlitePool};

use crate::{db::UserRow, models::{Presence, User}, AppError, AppResult};

use super::set_presence;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LoginRequest {
    #[serde(alias = "mobile_number")]
    pub(crate) mobile_number: String,
    pub(crate) password: String,
}

#[derive(FromRow)]
struct Credentials {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

/// Checks a mobile number and password. A successful login marks the user online.
pub async fn login(db_pool: &SqlitePool, mobile_number: &str, password: &str) -> AppResult<User> {
    let invalid = || AppError::Auth("invalid credentials".into());

    let Some(Credentials { user, password_hash }) = sqlx::query_as::<_, Credentials>(
        "SELECT id,name,mobile_number,avatar,status,last_seen,password_hash FROM users WHERE mobile_number=?",
    )
        .bind(mobile_number.trim())
        .fetch_optional(db_pool)
        .await?
    else {
        return Err(invalid());
    };

    if !bcrypt::verify(password, &password_hash)? {
        tracing::debug!(user_id = %user.id, "password mismatch");
        return Err(invalid());
    }

    let mut user = User::try_from(user)?;
    if let Some(last_seen) = set_presence(db_pool, user.id, &Presence::Online).await? {
        user.status = Presence::Online;
        user.last_seen = last_seen;
    }

    tracing::info!(user_id = %user.id, "user logged in");
    Ok(user)
}

#[debug_handler]
pub(crate) async fn login_handler(
    State(db_pool): State<SqlitePool>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<Json<User>> {
    let Json(LoginRequest { mobile_number, password }) = body?;
    Ok(Json(login(&db_pool, &mobile_number, &password).await?))
}
