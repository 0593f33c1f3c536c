//! Wire-level types. Everything here serializes with camelCase field names.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Presence of a user: `online`, `offline`, or any free-text status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum Presence {
    Online,
    Offline,
    Custom(String),
}

impl Presence {
    pub fn as_str(&self) -> &str {
        match self {
            Presence::Online => "online",
            Presence::Offline => "offline",
            Presence::Custom(status) => status,
        }
    }
}

impl From<String> for Presence {
    fn from(status: String) -> Self {
        match status.as_str() {
            "online" => Presence::Online,
            "offline" => Presence::Offline,
            _ => Presence::Custom(status),
        }
    }
}

impl From<Presence> for String {
    fn from(presence: Presence) -> Self {
        presence.as_str().to_owned()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub mobile_number: String,
    pub avatar: String,
    pub status: Presence,
    pub last_seen: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Text,
    Image,
    Video,
    Audio,
    System,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        use MessageType::*;
        match self {
            Text => "text",
            Image => "image",
            Video => "video",
            Audio => "audio",
            System => "system",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown message type {0:?}")]
pub struct UnknownMessageType(pub String);

impl FromStr for MessageType {
    type Err = UnknownMessageType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use MessageType::*;
        Ok(match s {
            "text" => Text,
            "image" => Image,
            "video" => Video,
            "audio" => Audio,
            "system" => System,
            other => return Err(UnknownMessageType(other.to_owned())),
        })
    }
}

/// Delivery status. Only `sent` is ever produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Sent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: MessageType,
    pub status: MessageStatus,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub id: Uuid,
    pub is_group: bool,
    pub group_name: Option<String>,
    pub group_avatar: Option<String>,
    pub participants: Vec<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSummary {
    pub id: Uuid,
    pub is_group: bool,
    pub group_name: Option<String>,
    pub group_avatar: Option<String>,
    pub participants: Vec<Uuid>,
    pub unread_count: u32,
    pub last_message: Option<Message>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn presence_keeps_free_text() {
        let busy: Presence = serde_json::from_value(json!("busy")).unwrap();
        assert_eq!(busy, Presence::Custom("busy".into()));
        assert_eq!(serde_json::to_value(Presence::Online).unwrap(), json!("online"));
        assert_eq!(Presence::from("offline".to_owned()), Presence::Offline);
    }

    #[test]
    fn message_uses_wire_names() {
        let msg = Message {
            id: Uuid::now_v7(),
            chat_id: Uuid::now_v7(),
            sender_id: Uuid::now_v7(),
            content: "hi".into(),
            kind: MessageType::Text,
            status: MessageStatus::Sent,
            timestamp: Utc::now(),
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "text");
        assert_eq!(value["status"], "sent");
        assert_eq!(value["chatId"], msg.chat_id.to_string());
        assert!(value.get("kind").is_none());
    }

    #[test]
    fn message_type_parses_store_values() {
        assert_eq!("audio".parse::<MessageType>().unwrap(), MessageType::Audio);
        assert!("sticker".parse::<MessageType>().is_err());
    }
}
