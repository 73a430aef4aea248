//! Wire types shared by the API client and the UI
//!
//! Field names follow the backend's JSON (camelCase). The client never keeps
//! these around longer than one screen; every navigation re-fetches them.

use serde::{Deserialize, Serialize};

/// A story session as listed by `GET /api/chats`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub request: String,
    #[serde(default)]
    pub last_message: Option<String>,
    #[serde(default)]
    pub last_updated: Option<String>,
    #[serde(default)]
    pub messages_count: Option<u64>,
}

impl Chat {
    pub fn message_count(&self) -> u64 {
        self.messages_count.unwrap_or(0)
    }
}

/// One transcript entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub sender: Sender,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_dice_result: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl Message {
    pub fn new(sender: Sender, content: impl Into<String>) -> Self {
        Self {
            sender,
            content: content.into(),
            is_dice_result: None,
            timestamp: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Sender::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Sender::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Sender::System, content)
    }
}

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
    System,
}

/// Body of `POST /api/chats`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewChat {
    pub id: String,
    pub title: String,
    pub request: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct OutgoingMessage<'a> {
    pub message: &'a str,
}

/// `{reply}` returned by the start and message endpoints
#[derive(Debug, Deserialize)]
pub(crate) struct Reply {
    pub reply: String,
}
