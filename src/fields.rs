//! Ordered fallback accessors for export fields.
//!
//! Exports name the same datum differently (`id` vs `conversation_id`,
//! `role` vs `author.role`). Each field is an explicit list of JSON paths,
//! tried in order; the first *present* value wins. "Present" follows the
//! exporting app's notion of truthiness: `null`, `false`, `0` and `""` are
//! treated as absent.

use serde_json::Value;

/// A path of object keys, e.g. `&["author", "role"]`.
pub type FieldPath = &'static [&'static str];

pub const CONVERSATION_LIST: &[FieldPath] = &[&["conversations"]];
pub const CONVERSATION_ID: &[FieldPath] = &[&["id"], &["conversation_id"]];
pub const CONVERSATION_TITLE: &[FieldPath] = &[&["title"], &["conversation_title"]];
pub const CONVERSATION_CREATE_TIME: &[FieldPath] = &[&["create_time"], &["created_at"]];

pub const MESSAGE_ROLE: &[FieldPath] = &[&["role"], &["author", "role"]];
pub const MESSAGE_CREATE_TIME: &[FieldPath] = &[&["create_time"]];
pub const MESSAGE_TIMESTAMP: &[FieldPath] = &[&["timestamp"]];

/// Follow `path` through nested objects.
pub fn lookup<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |current, key| current.get(*key))
}

/// Whether a value counts as supplied.
pub fn is_present(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => false,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

/// First present value among `fields`.
pub fn first_present<'a>(value: &'a Value, fields: &[FieldPath]) -> Option<&'a Value> {
    fields
        .iter()
        .filter_map(|path| lookup(value, path))
        .find(|v| is_present(v))
}

/// First present value rendered as a label: strings verbatim, numbers via
/// their JSON representation. Other value kinds are skipped.
pub fn first_label(value: &Value, fields: &[FieldPath]) -> Option<String> {
    fields
        .iter()
        .filter_map(|path| lookup(value, path))
        .filter(|v| is_present(v))
        .find_map(|v| match v {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
}
