use std::sync::Arc;

use axum::{
    debug_handler,
    extract::{
        rejection::QueryRejection,
        ws::{rejection::WebSocketUpgradeRejection, Message as Frame, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{auth::set_presence, chats, models::Presence, AppError, AppResult};

use super::{ClientEvent, Connection, Rooms, ServerEvent};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WsQuery {
    #[serde(alias = "user_id")]
    user_id: Option<Uuid>,
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn chat_ws(
    State(db_pool): State<SqlitePool>,
    State(rooms): State<Arc<Rooms>>,
    query: Result<Query<WsQuery>, QueryRejection>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> AppResult<Response> {
    let Query(WsQuery { user_id }) = query?;
    let ws = ws?;
    Ok(ws.on_upgrade(move |socket| serve(socket, db_pool, rooms, user_id)))
}

async fn serve(socket: WebSocket, db_pool: SqlitePool, rooms: Arc<Rooms>, user_id: Option<Uuid>) {
    let (conn, mut rx) = Connection::new(user_id);
    rooms.register(&conn);
    tracing::info!(conn_id = %conn.id(), ?user_id, "connection opened");

    if let Some(user_id) = user_id {
        sync_presence(&db_pool, &rooms, user_id).await;
    }

    let (mut sender, mut receiver) = socket.split();

    let mut forward_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let Ok(text) = serde_json::to_string(&event) else {
                continue;
            };
            if sender.send(Frame::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    loop {
        tokio::select! {
            frame = receiver.next() => {
                let Some(Ok(frame)) = frame else {
                    break;
                };
                match frame {
                    Frame::Text(text) => handle_frame(&db_pool, &rooms, &conn, text.as_str()).await,
                    Frame::Close(_) => break,
                    _ => {}
                }
            }
            _ = &mut forward_task => break,
        }
    }

    forward_task.abort();
    rooms.unsubscribe(conn.id());
    tracing::info!(conn_id = %conn.id(), "connection closed");

    if let Some(user_id) = user_id {
        sync_presence(&db_pool, &rooms, user_id).await;
    }
}

/// Stores the status the registry implies right now: online while any of the
/// user's connections is registered, offline otherwise. Every registry change
/// is followed by a call, and calls run one at a time, so the last write
/// reflects the last change even when a reconnect overlaps a disconnect.
async fn sync_presence(db_pool: &SqlitePool, rooms: &Rooms, user_id: Uuid) {
    let _gate = rooms.presence_gate().await;
    let presence = if rooms.is_user_connected(user_id) { Presence::Online } else { Presence::Offline };
    mark(db_pool, user_id, presence).await;
}

async fn handle_frame(db_pool: &SqlitePool, rooms: &Rooms, conn: &Connection, text: &str) {
    let result = match serde_json::from_str::<ClientEvent>(text) {
        Ok(event) => handle_event(db_pool, rooms, conn, event).await,
        Err(err) => Err(AppError::Validation(format!("malformed event: {err}"))),
    };
    if let Err(err) = result {
        tracing::debug!(conn_id = %conn.id(), error = %err, "rejected client event");
        conn.push(ServerEvent::from(&err));
    }
}

async fn handle_event(db_pool: &SqlitePool, rooms: &Rooms, conn: &Connection, event: ClientEvent) -> AppResult<()> {
    match event {
        ClientEvent::Join { chat_id } => {
            // TODO: check the connection's user against the chat's participants once sockets carry real auth
            if rooms.subscribe(conn, chat_id) {
                tracing::debug!(conn_id = %conn.id(), %chat_id, "joined room");
            }
            conn.push(ServerEvent::Joined { chat_id });
        }
        ClientEvent::SendMessage(request) => {
            chats::send_msg(db_pool, rooms, request).await?;
        }
    }
    Ok(())
}

async fn mark(db_pool: &SqlitePool, user_id: Uuid, presence: Presence) {
    match set_presence(db_pool, user_id, &presence).await {
        Ok(Some(_)) => {}
        Ok(None) => tracing::debug!(%user_id, "presence for unknown user ignored"),
        Err(err) => tracing::warn!(%user_id, error = %err, "failed to update presence"),
    }
}
