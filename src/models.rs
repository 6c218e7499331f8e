//! Core data models used throughout Knowledge Garden.
//!
//! These types represent the canonical messages that flow from the export
//! normalizer into the session corpus and out through search and rendering.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Assistant platform a message was exported from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Platform {
    #[serde(rename = "chatgpt")]
    ChatExport,
}

/// Normalized author role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
    System,
    Unknown,
}

impl Speaker {
    /// Map a platform role string to a speaker. Unrecognized roles are `Unknown`.
    pub fn from_role(role: Option<&str>) -> Self {
        match role {
            Some("user") | Some("human") => Speaker::User,
            Some("assistant") | Some("gpt") => Speaker::Assistant,
            Some("system") => Speaker::System,
            _ => Speaker::Unknown,
        }
    }

    /// Parse a user-supplied filter value (`user`, `assistant`, `system`, `unknown`).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Some(Speaker::User),
            "assistant" => Some(Speaker::Assistant),
            "system" => Some(Speaker::System),
            "unknown" => Some(Speaker::Unknown),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Speaker::User => "user",
            Speaker::Assistant => "assistant",
            Speaker::System => "system",
            Speaker::Unknown => "unknown",
        }
    }

    /// Display label used by the text and HTML renderers.
    pub fn label(&self) -> &'static str {
        match self {
            Speaker::User => "User",
            Speaker::Assistant => "Assistant",
            Speaker::System => "System",
            Speaker::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized, platform-independent chat message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalMessage {
    pub platform: Platform,
    pub speaker: Speaker,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub conversation_id: String,
    pub conversation_title: String,
    /// Zero-based position within the conversation's extracted order.
    pub message_index: usize,
    /// Untouched raw message, kept for diagnostics only.
    #[serde(skip)]
    pub original: serde_json::Value,
}

/// Grouping context for one conversation while it is being normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationContext {
    pub id: String,
    pub title: String,
    /// Raw conversation creation time (`create_time` or `created_at`), if present.
    pub create_time: Option<serde_json::Value>,
}
