use std::sync::Arc;

use axum::{debug_handler, extract::{rejection::JsonRejection, State}, http::StatusCode, Json};
use chrono::{SubsecRound, Utc};
use serde::Deserialize;
use sqlx::SqlitePool;
use url::Url;
use uuid::Uuid;

use crate::{config::Config, db, models::{Presence, User}, AppError, AppResult};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub name: String,
    #[serde(alias = "mobile_number")]
    pub mobile_number: String,
    pub password: String,
}

fn avatar_url(base: &str, name: &str) -> AppResult<String> {
    let url = Url::parse_with_params(base, &[("seed", name)]).map_err(anyhow::Error::from)?;
    Ok(url.into())
}

fn required(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    Ok(())
}

pub async fn register_user(
    db_pool: &SqlitePool,
    config: &Config,
    NewUser { name, mobile_number, password }: NewUser,
) -> AppResult<User> {
    required("name", &name)?;
    required("mobile number", &mobile_number)?;
    required("password", &password)?;

    let name = name.trim().to_owned();
    let mobile_number = mobile_number.trim().to_owned();
    let password_hash = bcrypt::hash(&password, config.password_cost)?;

    let user = User {
        id: Uuid::now_v7(),
        avatar: avatar_url(&config.avatar_base_url, &name)?,
        name,
        mobile_number,
        status: Presence::Online,
        last_seen: Utc::now().trunc_subsecs(6),
    };

    let inserted = sqlx::query(
        "INSERT INTO users (id,name,mobile_number,password_hash,avatar,status,last_seen) VALUES (?,?,?,?,?,?,?)",
    )
        .bind(user.id.to_string())
        .bind(&user.name)
        .bind(&user.mobile_number)
        .bind(password_hash)
        .bind(&user.avatar)
        .bind(user.status.as_str())
        .bind(db::micros(user.last_seen))
        .execute(db_pool)
        .await;

    match inserted {
        Ok(_) => {
            tracing::info!(user_id = %user.id, "registered user");
            Ok(user)
        }
        Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
            Err(AppError::Conflict("mobile number already registered".into()))
        }
        Err(err) => Err(err.into()),
    }
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn register(
    State(db_pool): State<SqlitePool>,
    State(config): State<Arc<Config>>,
    body: Result<Json<NewUser>, JsonRejection>,
) -> AppResult<(StatusCode, Json<User>)> {
    let Json(new_user) = body?;
    let user = register_user(&db_pool, &config, new_user).await?;
    Ok((StatusCode::CREATED, Json(user)))
}
