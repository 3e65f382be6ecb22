//! langreport: a Slack bot that collects language reports and serves them over HTTP.

pub mod api;
pub mod bot;
pub mod config;
pub mod db;
pub mod directory;
pub mod display;
pub mod error;
pub mod events;
pub mod logging;
pub mod messaging;
pub mod notify;
pub mod report;
pub mod responses;

pub use error::{Error, Result};

use serde::{Deserialize, Serialize};

/// Outbound message to the chat platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutboundResponse {
    Text(String),
    /// Block Kit message with a plain-text fallback.
    RichMessage {
        /// Used for notifications and when the blocks can't be rendered.
        text: String,
        /// Raw Block Kit JSON. The Slack adapter deserialises these at send time.
        blocks: Vec<serde_json::Value>,
    },
}

impl OutboundResponse {
    /// The plain-text part of the message.
    pub fn text(&self) -> &str {
        match self {
            OutboundResponse::Text(text) => text,
            OutboundResponse::RichMessage { text, .. } => text,
        }
    }
}

/// A workspace member as listed by the platform directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryUser {
    pub id: String,
    pub username: Option<String>,
    pub real_name: Option<String>,
    pub email: Option<String>,
    pub deleted: bool,
    pub is_bot: bool,
}
