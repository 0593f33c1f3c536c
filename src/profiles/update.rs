use axum::{debug_handler, extract::{rejection::JsonRejection, State}, Json};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{AppError, AppResult};

#[derive(Debug, Deserialize)]
pub(crate) struct ProfileUpdate {
    id: Uuid,
    name: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct Updated {
    success: bool,
}

pub async fn update_profile(db_pool: &SqlitePool, user_id: Uuid, name: &str) -> AppResult<()> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("name is required".into()));
    }

    let result = sqlx::query("UPDATE users SET name=? WHERE id=?")
        .bind(name)
        .bind(user_id.to_string())
        .execute(db_pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("user {user_id} does not exist")));
    }
    Ok(())
}

#[debug_handler]
pub(crate) async fn put_profile(
    State(db_pool): State<SqlitePool>,
    body: Result<Json<ProfileUpdate>, JsonRejection>,
) -> AppResult<Json<Updated>> {
    let Json(ProfileUpdate { id, name }) = body?;
    update_profile(&db_pool, id, &name).await?;
    Ok(Json(Updated { success: true }))
}
