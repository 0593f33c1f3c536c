use axum::{debug_handler, extract::{rejection::QueryRejection, Query, State}, Json};
use serde::Deserialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{db::{UserRow, USER_COLUMNS}, models::User, AppResult};

/// Everyone except `exclude`, by name.
pub async fn list_users(db_pool: &SqlitePool, exclude: Option<Uuid>) -> AppResult<Vec<User>> {
    let rows: Vec<UserRow> = sqlx::query_as(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id IS NOT ? ORDER BY name, id"
    ))
        .bind(exclude.map(|id| id.to_string()))
        .fetch_all(db_pool)
        .await?;

    rows.into_iter().map(User::try_from).collect()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UsersQuery {
    #[serde(alias = "current_user_id")]
    current_user_id: Option<Uuid>,
}

#[debug_handler]
pub(crate) async fn get_users(
    State(db_pool): State<SqlitePool>,
    query: Result<Query<UsersQuery>, QueryRejection>,
) -> AppResult<Json<Vec<User>>> {
    let Query(UsersQuery { current_user_id }) = query?;
    Ok(Json(list_users(&db_pool, current_user_id).await?))
}
