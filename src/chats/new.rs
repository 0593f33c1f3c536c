use axum::{debug_handler, extract::{rejection::JsonRejection, State}, http::StatusCode, Json};
use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use uuid::Uuid;

use crate::{db::ChatRow, models::Chat, AppError, AppResult};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewChat {
    pub participants: Vec<Uuid>,
    #[serde(default)]
    pub is_group: bool,
    pub group_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Existing(Chat),
    Created(Chat),
}

impl Resolution {
    pub fn chat(&self) -> &Chat {
        match self {
            Resolution::Existing(chat) | Resolution::Created(chat) => chat,
        }
    }

    pub fn into_chat(self) -> Chat {
        match self {
            Resolution::Existing(chat) | Resolution::Created(chat) => chat,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Resolution::Created(_))
    }
}

/// Key shared by both orderings of a direct pair.
fn direct_key(a: Uuid, b: Uuid) -> String {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    format!("{lo}:{hi}")
}

fn dedup(ids: Vec<Uuid>) -> Vec<Uuid> {
    let mut out: Vec<Uuid> = Vec::with_capacity(ids.len());
    for id in ids {
        if !out.contains(&id) {
            out.push(id);
        }
    }
    out
}

async fn count_users(db_pool: &SqlitePool, ids: &[Uuid]) -> AppResult<usize> {
    let mut query: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT COUNT(*) FROM users WHERE id IN (");
    let mut separated = query.separated(",");
    for id in ids {
        separated.push_bind(id.to_string());
    }
    separated.push_unseparated(")");

    let (count,): (i64,) = query.build_query_as().fetch_one(db_pool).await?;
    Ok(count as usize)
}

async fn load_participants(conn: &mut SqliteConnection, chat_id: &str) -> AppResult<Vec<Uuid>> {
    let rows: Vec<(String,)> = sqlx::query_as("SELECT user_id FROM participants WHERE chat_id=? ORDER BY rowid")
        .bind(chat_id)
        .fetch_all(conn)
        .await?;
    rows.into_iter()
        .map(|(id,)| Uuid::parse_str(&id).map_err(AppError::from))
        .collect()
}

/// Returns the chat satisfying `request`, creating it when needed.
///
/// A direct chat is looked up by its unordered pair and created at most once;
/// groups are always new. The chat row and its participant rows are written in
/// one transaction, and the `direct_key` uniqueness constraint settles races
/// between two members creating the same direct chat at once.
pub async fn resolve_or_create(
    db_pool: &SqlitePool,
    NewChat { participants, is_group, group_name }: NewChat,
) -> AppResult<Resolution> {
    let participants = dedup(participants);

    let (group_name, key) = if is_group {
        if participants.len() < 2 {
            return Err(AppError::Validation("a group chat needs at least two participants".into()));
        }
        let name = group_name
            .map(|name| name.trim().to_owned())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| AppError::Validation("a group chat needs a name".into()))?;
        (Some(name), None)
    } else {
        let &[a, b] = participants.as_slice() else {
            return Err(AppError::Validation("a direct chat needs exactly two distinct participants".into()));
        };
        (None, Some(direct_key(a, b)))
    };

    if count_users(db_pool, &participants).await? != participants.len() {
        return Err(AppError::Validation("unknown participant".into()));
    }

    let chat_id = Uuid::now_v7();
    let mut tx = db_pool.begin().await?;

    let inserted = sqlx::query(
        "INSERT INTO chats (id,is_group,group_name,group_avatar,direct_key) VALUES (?,?,?,NULL,?) \
         ON CONFLICT(direct_key) DO NOTHING",
    )
        .bind(chat_id.to_string())
        .bind(is_group)
        .bind(&group_name)
        .bind(&key)
        .execute(&mut *tx)
        .await?
        .rows_affected() == 1;

    if !inserted {
        let row: ChatRow = sqlx::query_as("SELECT id,is_group,group_name,group_avatar FROM chats WHERE direct_key=?")
            .bind(&key)
            .fetch_one(&mut *tx)
            .await?;
        let members = load_participants(&mut *tx, &row.id).await?;
        tx.commit().await?;

        let chat = row.into_chat(members)?;
        tracing::debug!(chat_id = %chat.id, "direct chat already exists");
        return Ok(Resolution::Existing(chat));
    }

    for user_id in &participants {
        sqlx::query("INSERT INTO participants (chat_id,user_id) VALUES (?,?)")
            .bind(chat_id.to_string())
            .bind(user_id.to_string())
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;

    tracing::info!(%chat_id, is_group, members = participants.len(), "created chat");
    Ok(Resolution::Created(Chat {
        id: chat_id,
        is_group,
        group_name,
        group_avatar: None,
        participants,
    }))
}

#[debug_handler]
pub(crate) async fn new_chat(
    State(db_pool): State<SqlitePool>,
    body: Result<Json<NewChat>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Chat>)> {
    let Json(request) = body?;
    let resolution = resolve_or_create(&db_pool, request).await?;
    let status = if resolution.is_created() { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(resolution.into_chat())))
}
