//! Live room membership.
//!
//! A room is the fan-out scope of one chat. It is keyed by chat id and is
//! independent of the persisted participant list: any live connection that
//! joins a chat's room receives that chat's new messages until it disconnects.
//! Membership is runtime-only and starts empty with every process.

mod events;
mod ws;

use std::collections::{HashMap, HashSet};

use axum::{routing::get, Router};
use parking_lot::RwLock;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::AppState;

pub use events::{ClientEvent, ServerEvent};

pub type ConnectionId = Uuid;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::chat_ws))
}

/// Handle to one live transport session. Cheap to clone; every clone pushes
/// into the same outbound queue.
#[derive(Clone, Debug)]
pub struct Connection {
    id: ConnectionId,
    user_id: Option<Uuid>,
    tx: mpsc::UnboundedSender<ServerEvent>,
}

impl Connection {
    pub fn new(user_id: Option<Uuid>) -> (Self, mpsc::UnboundedReceiver<ServerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                id: Uuid::now_v7(),
                user_id,
                tx,
            },
            rx,
        )
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.user_id
    }

    /// Queues an event for the socket. Returns `false` once the receiving side
    /// is gone; the event is dropped.
    pub fn push(&self, event: ServerEvent) -> bool {
        self.tx.send(event).is_ok()
    }
}

#[derive(Default)]
struct Membership {
    connections: HashMap<ConnectionId, Connection>,
    rooms: HashMap<Uuid, HashSet<ConnectionId>>,
    joined: HashMap<ConnectionId, HashSet<Uuid>>,
}

/// Process-wide registry of which connection listens to which chat.
///
/// Every read and write goes through one lock, so a `subscribers_of` snapshot
/// never observes a half-applied subscribe or unsubscribe.
#[derive(Default)]
pub struct Rooms {
    inner: RwLock<Membership>,
    presence: tokio::sync::Mutex<()>,
}

impl Rooms {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a live connection without joining any room.
    pub fn register(&self, conn: &Connection) {
        self.inner
            .write()
            .connections
            .entry(conn.id)
            .or_insert_with(|| conn.clone());
    }

    /// Adds `conn` to the room of `chat_id`. Idempotent; returns `true` only
    /// when the subscription is new.
    pub fn subscribe(&self, conn: &Connection, chat_id: Uuid) -> bool {
        let mut inner = self.inner.write();
        inner
            .connections
            .entry(conn.id)
            .or_insert_with(|| conn.clone());
        inner.joined.entry(conn.id).or_default().insert(chat_id);
        inner.rooms.entry(chat_id).or_default().insert(conn.id)
    }

    /// Drops the connection from every room it joined. Unknown ids are a no-op.
    pub fn unsubscribe(&self, conn_id: ConnectionId) -> Option<Connection> {
        let mut inner = self.inner.write();
        if let Some(chat_ids) = inner.joined.remove(&conn_id) {
            for chat_id in chat_ids {
                if let Some(members) = inner.rooms.get_mut(&chat_id) {
                    members.remove(&conn_id);
                    if members.is_empty() {
                        inner.rooms.remove(&chat_id);
                    }
                }
            }
        }
        inner.connections.remove(&conn_id)
    }

    pub fn subscribers_of(&self, chat_id: Uuid) -> Vec<Connection> {
        let inner = self.inner.read();
        let Some(members) = inner.rooms.get(&chat_id) else {
            return Vec::new();
        };
        members
            .iter()
            .filter_map(|conn_id| inner.connections.get(conn_id))
            .cloned()
            .collect()
    }

    pub fn is_user_connected(&self, user_id: Uuid) -> bool {
        self.inner
            .read()
            .connections
            .values()
            .any(|conn| conn.user_id == Some(user_id))
    }

    /// Held while a user's stored presence is brought in line with the
    /// registry. Writes made under it land in the order they were decided.
    pub async fn presence_gate(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.presence.lock().await
    }

    pub fn connection_count(&self) -> usize {
        self.inner.read().connections.len()
    }
}
