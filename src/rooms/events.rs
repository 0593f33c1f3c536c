use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{chats::SendMessage, models::Message, AppError};

/// Frames a client may send over the socket.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    Join {
        #[serde(alias = "chat_id")]
        chat_id: Uuid,
    },
    SendMessage(SendMessage),
}

/// Frames pushed to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    Joined { chat_id: Uuid },
    NewMessage(Message),
    Error { kind: String, message: String },
}

impl From<&AppError> for ServerEvent {
    fn from(err: &AppError) -> Self {
        ServerEvent::Error {
            kind: err.kind().to_owned(),
            message: err.public_message(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::models::MessageType;

    #[test]
    fn join_accepts_both_spellings() {
        let chat_id = Uuid::now_v7();
        for data in [json!({ "chatId": chat_id }), json!({ "chat_id": chat_id })] {
            let event: ClientEvent = serde_json::from_value(json!({ "event": "join", "data": data })).unwrap();
            assert_eq!(event, ClientEvent::Join { chat_id });
        }
    }

    #[test]
    fn send_message_frame() {
        let chat_id = Uuid::now_v7();
        let sender_id = Uuid::now_v7();
        let event: ClientEvent = serde_json::from_value(json!({
            "event": "send_message",
            "data": { "chatId": chat_id, "senderId": sender_id, "content": "hey", "type": "text" },
        }))
        .unwrap();
        let ClientEvent::SendMessage(send) = event else {
            panic!("expected send_message");
        };
        assert_eq!(send.chat_id, chat_id);
        assert_eq!(send.kind, MessageType::Text);
    }

    #[test]
    fn server_frames_are_tagged() {
        let chat_id = Uuid::now_v7();
        let value = serde_json::to_value(ServerEvent::Joined { chat_id }).unwrap();
        assert_eq!(value, json!({ "event": "joined", "data": { "chatId": chat_id } }));

        let value = serde_json::to_value(ServerEvent::from(&AppError::NotFound("chat".into()))).unwrap();
        assert_eq!(value["event"], "error");
        assert_eq!(value["data"]["kind"], "not_found_error");
    }
}
