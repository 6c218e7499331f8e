//! Conversation extraction: raw message containers → ordered raw messages.
//!
//! A conversation stores its messages in one of three shapes:
//!
//! | Shape | Field | Order |
//! |-------|-------|-------|
//! | Flat list | `messages` | as given |
//! | Node map | `mapping` | sorted by `create_time` |
//! | Node tree | `current_node` | pre-order walk, then sorted by `create_time` |
//!
//! Map and tree storage carry no chronological order of their own, so both
//! are sorted after collection. The sort is stable and treats a missing
//! `create_time` as `0`, so undated messages come first in collection order.

use serde_json::{Map, Value};
use tracing::debug;

use crate::normalize::epoch_seconds;

/// The message container found on a conversation.
#[derive(Debug, Clone, Copy)]
pub enum MessageContainer<'a> {
    Flat(&'a [Value]),
    Mapping(&'a Map<String, Value>),
    Tree(&'a Value),
    Missing,
}

impl MessageContainer<'_> {
    pub fn kind(&self) -> &'static str {
        match self {
            MessageContainer::Flat(_) => "messages",
            MessageContainer::Mapping(_) => "mapping",
            MessageContainer::Tree(_) => "current_node",
            MessageContainer::Missing => "none",
        }
    }
}

/// Resolve which container a conversation uses. First match wins:
/// a `messages` list, then a `mapping` object, then a `current_node` object.
pub fn resolve_container(conversation: &Value) -> MessageContainer<'_> {
    if let Some(list) = conversation.get("messages").and_then(Value::as_array) {
        return MessageContainer::Flat(list);
    }
    if let Some(map) = conversation.get("mapping").and_then(Value::as_object) {
        return MessageContainer::Mapping(map);
    }
    if let Some(root) = conversation.get("current_node").filter(|v| v.is_object()) {
        return MessageContainer::Tree(root);
    }
    MessageContainer::Missing
}

/// Return the conversation's raw messages in extraction order.
pub fn extract_messages(conversation: &Value) -> Vec<&Value> {
    let container = resolve_container(conversation);
    let messages = match container {
        MessageContainer::Flat(list) => list.iter().collect(),
        MessageContainer::Mapping(map) => {
            let mut messages: Vec<&Value> = map.values().filter_map(node_message).collect();
            sort_by_create_time(&mut messages);
            messages
        }
        MessageContainer::Tree(root) => {
            let mut messages = walk_tree(root);
            sort_by_create_time(&mut messages);
            messages
        }
        MessageContainer::Missing => Vec::new(),
    };
    debug!(
        shape = container.kind(),
        count = messages.len(),
        "extracted raw messages"
    );
    messages
}

fn node_message(node: &Value) -> Option<&Value> {
    node.get("message").filter(|m| !m.is_null())
}

/// Depth-first, node before children, siblings in the order given.
fn walk_tree(root: &Value) -> Vec<&Value> {
    let mut messages = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if let Some(message) = node_message(node) {
            messages.push(message);
        }
        if let Some(children) = node.get("children").and_then(Value::as_array) {
            stack.extend(children.iter().rev().filter(|c| c.is_object()));
        }
    }
    messages
}

/// Creation time used for ordering: epoch seconds from a number or a numeric
/// string, read the same way the normalizer reads it. Anything else sorts as `0`.
pub fn sort_key(message: &Value) -> f64 {
    message
        .get("create_time")
        .and_then(epoch_seconds)
        .unwrap_or(0.0)
}

fn sort_by_create_time(messages: &mut [&Value]) {
    messages.sort_by(|a, b| sort_key(a).total_cmp(&sort_key(b)));
}
