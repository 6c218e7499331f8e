//! Export normalization: raw export text → canonical message sequence.
//!
//! Accepts either `{ "conversations": [...] }` or a bare `[...]` of
//! conversations. For each conversation, in source order, the id, title and
//! creation time are resolved through [`crate::fields`], messages are pulled
//! out by [`crate::extract`] and normalized by [`crate::normalize`].
//! Output is the concatenation across conversations; nothing is reordered
//! across conversation boundaries.
//!
//! Any other top-level JSON shape yields an empty sequence rather than an
//! error. The [`NormalizeReport`] records that case and how many messages
//! were skipped.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::GardenError;
use crate::extract;
use crate::fields::{
    self, CONVERSATION_CREATE_TIME, CONVERSATION_ID, CONVERSATION_LIST, CONVERSATION_TITLE,
};
use crate::models::{CanonicalMessage, ConversationContext};
use crate::normalize::normalize_message;
use crate::traits::{InputShape, NormalizeReport, Normalized, Normalizer};

/// Normalize an export, discarding the report.
///
/// Fails only when `raw_text` is not valid JSON.
pub fn normalize_export(raw_text: &str) -> Result<Vec<CanonicalMessage>, GardenError> {
    normalize_export_at(raw_text, Utc::now()).map(|n| n.messages)
}

/// Normalize an export with an explicit processing instant.
///
/// `now` stamps messages that carry no time of their own and whose
/// conversation has none either. One instant is used for the whole run.
pub fn normalize_export_at(raw_text: &str, now: DateTime<Utc>) -> Result<Normalized, GardenError> {
    let data = parse_json(raw_text)?;

    let (shape, conversations) = locate_conversations(&data);
    let mut report = NormalizeReport {
        shape,
        ..Default::default()
    };
    let mut messages = Vec::new();

    if shape == InputShape::Unrecognized {
        warn!(
            kind = value_kind(&data),
            "export has neither a conversations list nor a top-level list"
        );
    }

    for (conv_index, conversation) in conversations.iter().enumerate() {
        let context = conversation_context(conversation, conv_index);
        if !conversation.is_object() {
            warn!(index = conv_index, "conversation entry is not an object");
        }

        let raw_messages = extract::extract_messages(conversation);
        debug!(
            conversation = %context.id,
            raw = raw_messages.len(),
            "normalizing conversation"
        );
        report.conversations += 1;
        report.raw_messages += raw_messages.len();

        for (index, raw) in raw_messages.into_iter().enumerate() {
            match normalize_message(raw, &context, index, now) {
                Ok(message) => messages.push(message),
                Err(reason) => {
                    report.skipped += 1;
                    warn!(
                        conversation = %context.id,
                        index,
                        %reason,
                        "skipping message"
                    );
                }
            }
        }
    }

    dismantle(data);

    info!(
        messages = messages.len(),
        conversations = report.conversations,
        skipped = report.skipped,
        "export normalized"
    );

    Ok(Normalized { messages, report })
}

/// Parse export text with no nesting limit.
///
/// Node trees nest two levels per message, so long conversations exceed
/// serde_json's default depth. `serde_stacker` grows the stack on the heap
/// as parsing descends.
fn parse_json(raw_text: &str) -> Result<Value, GardenError> {
    let mut de = serde_json::Deserializer::from_str(raw_text);
    de.disable_recursion_limit();
    let value = Value::deserialize(serde_stacker::Deserializer::new(&mut de)).map_err(parse_error)?;
    if let Err(e) = de.end() {
        dismantle(value);
        return Err(parse_error(e));
    }
    Ok(value)
}

fn parse_error(e: serde_json::Error) -> GardenError {
    GardenError::Parse {
        normalizer: ExportNormalizer::NAME.to_string(),
        detail: e.to_string(),
    }
}

/// Drop a value without recursing through its nesting.
fn dismantle(value: Value) {
    let mut stack = vec![value];
    while let Some(value) = stack.pop() {
        match value {
            Value::Array(items) => stack.extend(items),
            Value::Object(map) => stack.extend(map.into_iter().map(|(_, v)| v)),
            _ => {}
        }
    }
}

/// Find the conversation list: a `conversations` array, else a bare array.
pub fn locate_conversations(data: &Value) -> (InputShape, &[Value]) {
    if let Some(list) = fields::first_present(data, CONVERSATION_LIST).and_then(Value::as_array) {
        return (InputShape::ConversationsField, list);
    }
    if let Some(list) = data.as_array() {
        return (InputShape::BareList, list);
    }
    (InputShape::Unrecognized, &[])
}

/// Resolve id, title and creation time, synthesizing the first two.
pub fn conversation_context(conversation: &Value, index: usize) -> ConversationContext {
    ConversationContext {
        id: fields::first_label(conversation, CONVERSATION_ID)
            .unwrap_or_else(|| format!("conv_{}", index)),
        title: fields::first_label(conversation, CONVERSATION_TITLE)
            .unwrap_or_else(|| format!("Conversation {}", index + 1)),
        create_time: fields::first_present(conversation, CONVERSATION_CREATE_TIME).cloned(),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// [`Normalizer`] for JSON chat exports.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExportNormalizer;

impl ExportNormalizer {
    pub const NAME: &'static str = "chat-export";
}

impl Normalizer for ExportNormalizer {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "JSON chat export (conversations list, node mapping or node tree)"
    }

    fn handles(&self, file_name: &str) -> bool {
        let lower = file_name.to_ascii_lowercase();
        lower.ends_with(".json") || lower.contains("conversations.json")
    }

    fn normalize(&self, raw: &str) -> Result<Normalized, GardenError> {
        normalize_export_at(raw, Utc::now())
    }
}
