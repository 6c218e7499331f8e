//! Per-conversation summaries for `kg recent`.
//!
//! Messages are grouped by conversation id. Each summary carries previews of
//! the first user and first assistant message (by timestamp), the latest
//! timestamp and the message count. Conversations with neither a user nor an
//! assistant message are left out. Summaries are ordered newest first.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

use crate::models::{CanonicalMessage, Speaker};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub conversation_id: String,
    pub title: String,
    pub user_message: String,
    pub assistant_message: String,
    pub latest: DateTime<Utc>,
    pub message_count: usize,
}

pub fn summarize(corpus: &[CanonicalMessage], preview_chars: usize) -> Vec<ConversationSummary> {
    let mut order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, Vec<&CanonicalMessage>> = HashMap::new();
    for message in corpus {
        let id = message.conversation_id.as_str();
        groups
            .entry(id)
            .or_insert_with(|| {
                order.push(id);
                Vec::new()
            })
            .push(message);
    }

    let mut summaries: Vec<ConversationSummary> = order
        .into_iter()
        .filter_map(|id| {
            let mut messages = groups.remove(id)?;
            messages.sort_by_key(|m| m.timestamp);

            let user = messages.iter().find(|m| m.speaker == Speaker::User);
            let assistant = messages.iter().find(|m| m.speaker == Speaker::Assistant);
            if user.is_none() && assistant.is_none() {
                return None;
            }

            Some(ConversationSummary {
                conversation_id: id.to_string(),
                title: messages[0].conversation_title.clone(),
                user_message: user.map(|m| preview(&m.text, preview_chars)).unwrap_or_default(),
                assistant_message: assistant
                    .map(|m| preview(&m.text, preview_chars))
                    .unwrap_or_default(),
                latest: messages.iter().map(|m| m.timestamp).max()?,
                message_count: messages.len(),
            })
        })
        .collect();

    summaries.sort_by(|a, b| b.latest.cmp(&a.latest));
    summaries
}

/// First `max_chars` characters, with `...` appended when cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}
