use std::sync::Arc;

use axum::{debug_handler, extract::{rejection::{JsonRejection, QueryRejection}, Query, State}, Json};
use chrono::Utc;
use serde::Deserialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    db::{self, MessageRow, MESSAGE_COLUMNS},
    models::{Message, MessageStatus, MessageType},
    rooms::{Rooms, ServerEvent},
    AppError, AppResult,
};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessage {
    #[serde(alias = "chat_id")]
    pub chat_id: Uuid,
    #[serde(alias = "sender_id")]
    pub sender_id: Uuid,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: MessageType,
}

/// Persists a message, then pushes it to every live subscriber of its chat.
///
/// Nothing is pushed unless the insert succeeded. Subscribers that have gone
/// away are skipped; they do not affect delivery to the rest of the room.
///
/// History order follows the stored timestamps. Live pushes from two
/// concurrent sends to one chat may arrive in either order.
pub async fn send_msg(
    db_pool: &SqlitePool,
    rooms: &Rooms,

    SendMessage { chat_id, sender_id, content, kind }: SendMessage,
) -> AppResult<Message> {
    if content.trim().is_empty() {
        return Err(AppError::Validation("message content is empty".into()));
    }
    if !db::chat_exists(db_pool, chat_id).await? {
        return Err(AppError::NotFound(format!("chat {chat_id} does not exist")));
    }
    if !db::user_exists(db_pool, sender_id).await? {
        return Err(AppError::NotFound(format!("user {sender_id} does not exist")));
    }

    let id = Uuid::now_v7();
    // Never earlier than the chat's latest message, so history order is send order.
    let (timestamp,): (i64,) = sqlx::query_as(
        "INSERT INTO messages (id,chat_id,sender_id,content,type,status,timestamp) \
         VALUES (?,?,?,?,?,'sent',MAX(?,COALESCE((SELECT MAX(timestamp)+1 FROM messages WHERE chat_id=?),0))) \
         RETURNING timestamp",
    )
        .bind(id.to_string())
        .bind(chat_id.to_string())
        .bind(sender_id.to_string())
        .bind(&content)
        .bind(kind.as_str())
        .bind(db::micros(Utc::now()))
        .bind(chat_id.to_string())
        .fetch_one(db_pool)
        .await?;

    let message = Message {
        id,
        chat_id,
        sender_id,
        content,
        kind,
        status: MessageStatus::Sent,
        timestamp: db::from_micros(timestamp)?,
    };

    let subscribers = rooms.subscribers_of(chat_id);
    let mut delivered = 0;
    for conn in &subscribers {
        if conn.push(ServerEvent::NewMessage(message.clone())) {
            delivered += 1;
        } else {
            tracing::debug!(conn_id = %conn.id(), "dropping message for closed connection");
        }
    }
    tracing::debug!(message_id = %id, %chat_id, delivered, subscribers = subscribers.len(), "dispatched message");

    Ok(message)
}

/// History of a chat, oldest first.
pub async fn list_messages(db_pool: &SqlitePool, chat_id: Uuid) -> AppResult<Vec<Message>> {
    if !db::chat_exists(db_pool, chat_id).await? {
        return Err(AppError::NotFound(format!("chat {chat_id} does not exist")));
    }

    let rows: Vec<MessageRow> = sqlx::query_as(&format!(
        "SELECT {MESSAGE_COLUMNS} FROM messages WHERE chat_id=? ORDER BY timestamp ASC"
    ))
        .bind(chat_id.to_string())
        .fetch_all(db_pool)
        .await?;

    rows.into_iter().map(Message::try_from).collect()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MessagesQuery {
    #[serde(alias = "chat_id")]
    chat_id: Uuid,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn post_message(
    State(db_pool): State<SqlitePool>,
    State(rooms): State<Arc<Rooms>>,
    body: Result<Json<SendMessage>, JsonRejection>,
) -> AppResult<Json<Message>> {
    let Json(request) = body?;
    Ok(Json(send_msg(&db_pool, &rooms, request).await?))
}

#[debug_handler]
pub(crate) async fn get_messages(
    State(db_pool): State<SqlitePool>,
    query: Result<Query<MessagesQuery>, QueryRejection>,
) -> AppResult<Json<Vec<Message>>> {
    let Query(MessagesQuery { chat_id }) = query?;
    Ok(Json(list_messages(&db_pool, chat_id).await?))
}
