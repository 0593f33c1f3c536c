mod list;
mod msg;
mod new;

use axum::{routing::get, Router};

use crate::AppState;

pub use list::{list_chats_for_user, summarize};
pub use msg::{list_messages, send_msg, SendMessage};
pub use new::{resolve_or_create, NewChat, Resolution};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/chats", get(list::get_chats).post(new::new_chat))
        .route("/messages", get(msg::get_messages).post(msg::post_message))
}
