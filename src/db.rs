use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::{sqlite::{SqliteConnectOptions, SqlitePoolOptions}, FromRow, SqlitePool};
use uuid::Uuid;

use crate::{models::{Chat, Message, MessageStatus, Presence, User}, AppError, AppResult};

// unique: users.mobile_number
// unique: chats.direct_key, "min:max" of the two member ids, NULL for groups
// unique: participants (chat_id, user_id)
const SCHEMA: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        mobile_number TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        avatar TEXT NOT NULL,
        status TEXT NOT NULL,
        last_seen INTEGER NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS chats (
        id TEXT PRIMARY KEY,
        is_group INTEGER NOT NULL,
        group_name TEXT,
        group_avatar TEXT,
        direct_key TEXT UNIQUE
    )"#,
    r#"CREATE TABLE IF NOT EXISTS participants (
        chat_id TEXT NOT NULL REFERENCES chats(id),
        user_id TEXT NOT NULL REFERENCES users(id),
        PRIMARY KEY (chat_id, user_id)
    )"#,
    "CREATE INDEX IF NOT EXISTS participants_user ON participants (user_id)",
    r#"CREATE TABLE IF NOT EXISTS messages (
        id TEXT PRIMARY KEY,
        chat_id TEXT NOT NULL REFERENCES chats(id),
        sender_id TEXT NOT NULL REFERENCES users(id),
        content TEXT NOT NULL,
        type TEXT NOT NULL,
        status TEXT NOT NULL,
        timestamp INTEGER NOT NULL
    )"#,
    "CREATE INDEX IF NOT EXISTS messages_chat_time ON messages (chat_id, timestamp)",
];

/// Opens a pool. Connections are never recycled, which keeps `sqlite::memory:`
/// databases alive for the life of the pool.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    SqlitePoolOptions::new()
        .max_connections(max_connections)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
}

pub async fn init_schema(db_pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(db_pool).await?;
    }
    Ok(())
}

pub(crate) fn micros(timestamp: DateTime<Utc>) -> i64 {
    timestamp.timestamp_micros()
}

pub(crate) fn from_micros(micros: i64) -> AppResult<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_micros(micros)
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("timestamp {micros} out of range")))
}

#[derive(Debug, FromRow)]
pub(crate) struct UserRow {
    pub id: String,
    pub name: String,
    pub mobile_number: String,
    pub avatar: String,
    pub status: String,
    pub last_seen: i64,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> AppResult<User> {
        Ok(User {
            id: Uuid::parse_str(&row.id)?,
            name: row.name,
            mobile_number: row.mobile_number,
            avatar: row.avatar,
            status: Presence::from(row.status),
            last_seen: from_micros(row.last_seen)?,
        })
    }
}

pub(crate) const USER_COLUMNS: &str = "id,name,mobile_number,avatar,status,last_seen";

#[derive(Debug, FromRow)]
pub(crate) struct ChatRow {
    pub id: String,
    pub is_group: bool,
    pub group_name: Option<String>,
    pub group_avatar: Option<String>,
}

impl ChatRow {
    pub fn into_chat(self, participants: Vec<Uuid>) -> AppResult<Chat> {
        Ok(Chat {
            id: Uuid::parse_str(&self.id)?,
            is_group: self.is_group,
            group_name: self.group_name,
            group_avatar: self.group_avatar,
            participants,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct MessageRow {
    pub id: String,
    pub chat_id: String,
    pub sender_id: String,
    pub content: String,
    #[sqlx(rename = "type")]
    pub kind: String,
    pub timestamp: i64,
}

pub(crate) const MESSAGE_COLUMNS: &str = "id,chat_id,sender_id,content,type,timestamp";

impl TryFrom<MessageRow> for Message {
    type Error = AppError;

    fn try_from(row: MessageRow) -> AppResult<Message> {
        Ok(Message {
            id: Uuid::parse_str(&row.id)?,
            chat_id: Uuid::parse_str(&row.chat_id)?,
            sender_id: Uuid::parse_str(&row.sender_id)?,
            content: row.content,
            kind: row.kind.parse().map_err(anyhow::Error::from)?,
            status: MessageStatus::Sent,
            timestamp: from_micros(row.timestamp)?,
        })
    }
}

pub(crate) async fn chat_exists(db_pool: &SqlitePool, chat_id: Uuid) -> AppResult<bool> {
    Ok(sqlx::query("SELECT 1 FROM chats WHERE id=?")
        .bind(chat_id.to_string())
        .fetch_optional(db_pool)
        .await?
        .is_some())
}

pub(crate) async fn user_exists(db_pool: &SqlitePool, user_id: Uuid) -> AppResult<bool> {
    Ok(sqlx::query("SELECT 1 FROM users WHERE id=?")
        .bind(user_id.to_string())
        .fetch_optional(db_pool)
        .await?
        .is_some())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn schema_is_idempotent() {
        let db_pool = testing::memory_pool().await;
        init_schema(&db_pool).await.unwrap();

        let (tables,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sqlite_master WHERE type='table'")
            .fetch_one(&db_pool)
            .await
            .unwrap();
        assert_eq!(tables, 4);
    }

    #[test]
    fn micros_round_trip_keeps_precision() {
        let now = Utc::now();
        let back = from_micros(micros(now)).unwrap();
        assert_eq!(micros(back), micros(now));
    }
}
