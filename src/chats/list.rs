use std::{cmp::Reverse, collections::HashMap};

use axum::{debug_handler, extract::{rejection::QueryRejection, Query, State}, Json};
use serde::Deserialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    db::{ChatRow, MessageRow, MESSAGE_COLUMNS},
    models::{Chat, ChatSummary, Message},
    AppResult,
};

const MY_CHATS: &str = "SELECT chat_id FROM participants WHERE user_id=?";

/// Every chat `user_id` takes part in, with members and latest message.
///
/// Chats with the newest activity come first; chats without messages follow,
/// ordered by id. A user with no chats gets an empty list.
pub async fn list_chats_for_user(db_pool: &SqlitePool, user_id: Uuid) -> AppResult<Vec<ChatSummary>> {
    let user_id = user_id.to_string();

    let chats: Vec<ChatRow> = sqlx::query_as(&format!(
        "SELECT id,is_group,group_name,group_avatar FROM chats WHERE id IN ({MY_CHATS})"
    ))
        .bind(&user_id)
        .fetch_all(db_pool)
        .await?;
    if chats.is_empty() {
        return Ok(Vec::new());
    }

    let members: Vec<(String, String)> = sqlx::query_as(&format!(
        "SELECT chat_id,user_id FROM participants WHERE chat_id IN ({MY_CHATS}) ORDER BY rowid"
    ))
        .bind(&user_id)
        .fetch_all(db_pool)
        .await?;

    let messages: Vec<MessageRow> = sqlx::query_as(&format!(
        "SELECT {MESSAGE_COLUMNS} FROM messages WHERE chat_id IN ({MY_CHATS})"
    ))
        .bind(&user_id)
        .fetch_all(db_pool)
        .await?;

    let mut by_chat: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for (chat_id, member) in members {
        by_chat
            .entry(Uuid::parse_str(&chat_id)?)
            .or_default()
            .push(Uuid::parse_str(&member)?);
    }

    let chats = chats
        .into_iter()
        .map(|row| {
            let id = Uuid::parse_str(&row.id)?;
            row.into_chat(by_chat.remove(&id).unwrap_or_default())
        })
        .collect::<AppResult<Vec<Chat>>>()?;
    let messages = messages
        .into_iter()
        .map(Message::try_from)
        .collect::<AppResult<Vec<Message>>>()?;

    Ok(summarize(chats, messages))
}

/// Folds chats and their messages into summaries. The input order of
/// `messages` does not matter: the latest message is the true maximum.
pub fn summarize(chats: Vec<Chat>, messages: Vec<Message>) -> Vec<ChatSummary> {
    let mut latest: HashMap<Uuid, Message> = HashMap::new();
    for message in messages {
        match latest.get(&message.chat_id) {
            Some(current) if (current.timestamp, current.id) >= (message.timestamp, message.id) => {}
            _ => {
                latest.insert(message.chat_id, message);
            }
        }
    }

    let mut summaries: Vec<ChatSummary> = chats
        .into_iter()
        .map(|chat| ChatSummary {
            last_message: latest.remove(&chat.id),
            id: chat.id,
            is_group: chat.is_group,
            group_name: chat.group_name,
            group_avatar: chat.group_avatar,
            participants: chat.participants,
            unread_count: 0,
        })
        .collect();

    summaries.sort_by_key(|summary| {
        (
            Reverse(summary.last_message.as_ref().map(|m| m.timestamp)),
            summary.id,
        )
    });
    summaries
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ChatsQuery {
    #[serde(alias = "user_id")]
    user_id: Uuid,
}

#[debug_handler]
pub(crate) async fn get_chats(
    State(db_pool): State<SqlitePool>,
    query: Result<Query<ChatsQuery>, QueryRejection>,
) -> AppResult<Json<Vec<ChatSummary>>> {
    let Query(ChatsQuery { user_id }) = query?;
    Ok(Json(list_chats_for_user(&db_pool, user_id).await?))
}
