//! Message normalization: one raw message → one [`CanonicalMessage`].
//!
//! Every field is resolved through a fallback chain:
//!
//! - **speaker**: `role`, then `author.role`, mapped by [`Speaker::from_role`].
//! - **text**: string `content`, `content.parts` joined by `\n`, string `text`,
//!   `text.parts` joined by `\n`; first non-empty wins, else `""`.
//! - **timestamp**: `create_time` (epoch seconds), `timestamp` (an instant
//!   string), the conversation's creation time, then the processing instant.
//!
//! A message that cannot be normalized yields a [`MessageSkip`] instead of
//! failing the batch.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

use crate::error::MessageSkip;
use crate::fields::{self, MESSAGE_CREATE_TIME, MESSAGE_ROLE, MESSAGE_TIMESTAMP};
use crate::models::{CanonicalMessage, ConversationContext, Platform, Speaker};

/// Normalize a single raw message.
///
/// `now` is the processing instant, used only when neither the message nor
/// its conversation carries a time.
pub fn normalize_message(
    raw: &Value,
    conversation: &ConversationContext,
    index: usize,
    now: DateTime<Utc>,
) -> Result<CanonicalMessage, MessageSkip> {
    if !raw.is_object() {
        return Err(MessageSkip::NotAnObject);
    }

    Ok(CanonicalMessage {
        platform: Platform::ChatExport,
        speaker: Speaker::from_role(
            fields::first_present(raw, MESSAGE_ROLE).and_then(Value::as_str),
        ),
        text: resolve_text(raw),
        timestamp: resolve_timestamp(raw, conversation, now)?,
        conversation_id: conversation.id.clone(),
        conversation_title: conversation.title.clone(),
        message_index: index,
        original: raw.clone(),
    })
}

/// Resolve the message body. Never fails; an unusable body is `""`.
pub fn resolve_text(raw: &Value) -> String {
    ["content", "text"]
        .iter()
        .filter_map(|field| text_from(raw.get(*field)?))
        .find(|text| !text.is_empty())
        .unwrap_or_default()
}

fn text_from(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Object(obj) => obj.get("parts")?.as_array().map(|parts| join_parts(parts)),
        _ => None,
    }
}

/// Join content parts with newlines. Strings are kept verbatim, scalars are
/// stringified, `null` contributes an empty line, and structured parts
/// contribute their `text` field or are dropped.
fn join_parts(parts: &[Value]) -> String {
    parts
        .iter()
        .filter_map(|part| match part {
            Value::String(s) => Some(s.clone()),
            Value::Null => Some(String::new()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Object(obj) => obj.get("text").and_then(Value::as_str).map(str::to_string),
            Value::Array(_) => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn resolve_timestamp(
    raw: &Value,
    conversation: &ConversationContext,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, MessageSkip> {
    if let Some(value) = fields::first_present(raw, MESSAGE_CREATE_TIME) {
        return from_epoch_seconds(value).ok_or_else(|| invalid("create_time", value));
    }
    if let Some(value) = fields::first_present(raw, MESSAGE_TIMESTAMP) {
        return parse_instant(value).ok_or_else(|| invalid("timestamp", value));
    }
    if let Some(value) = conversation.create_time.as_ref().filter(|v| fields::is_present(v)) {
        return from_epoch_seconds(value)
            .or_else(|| parse_instant(value))
            .ok_or_else(|| invalid("conversation.create_time", value));
    }
    Ok(now)
}

fn invalid(field: &'static str, value: &Value) -> MessageSkip {
    MessageSkip::InvalidTimestamp {
        field,
        value: value.to_string(),
    }
}

/// Convert epoch seconds (a number or a numeric string) to an instant.
/// Fractional seconds are kept to millisecond precision.
pub fn from_epoch_seconds(value: &Value) -> Option<DateTime<Utc>> {
    let secs = epoch_seconds(value)?;
    DateTime::from_timestamp_millis((secs * 1000.0).round() as i64)
}

/// Epoch seconds as a finite float, from a number or a numeric string.
pub fn epoch_seconds(value: &Value) -> Option<f64> {
    let secs = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    secs.is_finite().then_some(secs)
}

/// Parse a ready-made instant: RFC 3339, a naive `YYYY-MM-DD[ T]HH:MM:SS`
/// (taken as UTC), a bare `YYYY-MM-DD`, or a number of epoch milliseconds.
pub fn parse_instant(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => DateTime::from_timestamp_millis(n.as_f64()?.round() as i64),
        Value::String(s) => parse_instant_str(s.trim()),
        _ => None,
    }
}

fn parse_instant_str(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn ctx() -> ConversationContext {
        ConversationContext {
            id: "c1".to_string(),
            title: "T".to_string(),
            create_time: None,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()
    }

    fn norm(raw: Value) -> CanonicalMessage {
        normalize_message(&raw, &ctx(), 0, now()).unwrap()
    }

    #[test]
    fn test_basic_message() {
        let msg = norm(json!({"role": "user", "content": "Hello world", "create_time": 1000}));
        assert_eq!(msg.platform, Platform::ChatExport);
        assert_eq!(msg.speaker, Speaker::User);
        assert_eq!(msg.text, "Hello world");
        assert_eq!(msg.conversation_id, "c1");
        assert_eq!(msg.conversation_title, "T");
        assert_eq!(msg.message_index, 0);
        assert_eq!(msg.timestamp, Utc.timestamp_opt(1000, 0).unwrap());
        assert_eq!(msg.original["content"], "Hello world");
    }

    #[test]
    fn test_speaker_mapping() {
        let cases = [
            ("user", Speaker::User),
            ("human", Speaker::User),
            ("assistant", Speaker::Assistant),
            ("gpt", Speaker::Assistant),
            ("system", Speaker::System),
            ("tool", Speaker::Unknown),
            ("User", Speaker::Unknown),
        ];
        for (role, expected) in cases {
            assert_eq!(norm(json!({"role": role})).speaker, expected, "role {}", role);
        }
        assert_eq!(norm(json!({})).speaker, Speaker::Unknown);
        assert_eq!(
            norm(json!({"author": {"role": "assistant"}})).speaker,
            Speaker::Assistant
        );
    }

    #[test]
    fn test_non_string_role_is_unknown() {
        let msg = norm(json!({"role": 7, "author": {"role": "system"}}));
        assert_eq!(msg.speaker, Speaker::Unknown);
        // A falsy role still falls through to author.role.
        let msg = norm(json!({"role": "", "author": {"role": "system"}}));
        assert_eq!(msg.speaker, Speaker::System);
    }

    #[test]
    fn test_parts_joined_with_newline() {
        let msg = norm(json!({"content": {"content_type": "text", "parts": ["a", "b"]}}));
        assert_eq!(msg.text, "a\nb");
    }

    #[test]
    fn test_text_fallback_order() {
        assert_eq!(norm(json!({"content": "", "text": "alt"})).text, "alt");
        assert_eq!(norm(json!({"content": {"parts": []}, "text": "alt"})).text, "alt");
        assert_eq!(norm(json!({"text": {"parts": ["x", "y"]}})).text, "x\ny");
        assert_eq!(norm(json!({"content": "main", "text": "alt"})).text, "main");
    }

    #[test]
    fn test_missing_text_is_empty_not_skip() {
        assert_eq!(norm(json!({"role": "user"})).text, "");
        assert_eq!(norm(json!({"content": 5})).text, "");
    }

    #[test]
    fn test_structured_parts() {
        let msg = norm(json!({"content": {"parts": ["a", null, 3, {"text": "t"}, {"asset": "img"}]}}));
        assert_eq!(msg.text, "a\n\n3\nt");
    }

    #[test]
    fn test_timestamp_fractional_seconds() {
        let msg = norm(json!({"create_time": 1700000000.25}));
        assert_eq!(msg.timestamp.timestamp_millis(), 1_700_000_000_250);
    }

    #[test]
    fn test_timestamp_from_string_field() {
        let msg = norm(json!({"timestamp": "2024-03-01T12:00:00Z"}));
        assert_eq!(msg.timestamp, Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap());

        let msg = norm(json!({"timestamp": "2024-03-01 08:30:00"}));
        assert_eq!(msg.timestamp, Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).unwrap());
    }

    #[test]
    fn test_create_time_wins_over_timestamp() {
        let msg = norm(json!({"create_time": 1000, "timestamp": "2024-03-01T12:00:00Z"}));
        assert_eq!(msg.timestamp.timestamp(), 1000);
    }

    #[test]
    fn test_zero_create_time_falls_through() {
        let msg = norm(json!({"create_time": 0, "timestamp": "2024-03-01T12:00:00Z"}));
        assert_eq!(msg.timestamp, Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_conversation_time_fallback() {
        let conv = ConversationContext {
            create_time: Some(json!(5000)),
            ..ctx()
        };
        let msg = normalize_message(&json!({"role": "user"}), &conv, 3, now()).unwrap();
        assert_eq!(msg.timestamp.timestamp(), 5000);
        assert_eq!(msg.message_index, 3);

        let conv = ConversationContext {
            create_time: Some(json!("2023-05-05T00:00:00Z")),
            ..ctx()
        };
        let msg = normalize_message(&json!({}), &conv, 0, now()).unwrap();
        assert_eq!(msg.timestamp, Utc.with_ymd_and_hms(2023, 5, 5, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_processing_instant_fallback() {
        assert_eq!(norm(json!({"role": "user"})).timestamp, now());
    }

    #[test]
    fn test_skip_non_object() {
        for raw in [json!(null), json!("text"), json!([1, 2]), json!(3)] {
            assert_eq!(
                normalize_message(&raw, &ctx(), 0, now()),
                Err(MessageSkip::NotAnObject)
            );
        }
    }

    #[test]
    fn test_skip_invalid_timestamp() {
        let err = normalize_message(&json!({"timestamp": "not a date"}), &ctx(), 0, now())
            .unwrap_err();
        assert!(matches!(
            err,
            MessageSkip::InvalidTimestamp { field: "timestamp", .. }
        ));

        let err = normalize_message(&json!({"create_time": 1e300}), &ctx(), 0, now()).unwrap_err();
        assert!(matches!(
            err,
            MessageSkip::InvalidTimestamp { field: "create_time", .. }
        ));
    }

    #[test]
    fn test_parse_instant_variants() {
        assert_eq!(
            parse_instant(&json!("2024-01-02")),
            Some(Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap())
        );
        assert_eq!(
            parse_instant(&json!("2024-01-02T03:04:05+02:00")),
            Some(Utc.with_ymd_and_hms(2024, 1, 2, 1, 4, 5).unwrap())
        );
        assert_eq!(
            parse_instant(&json!(1_000_000)),
            Some(Utc.timestamp_opt(1000, 0).unwrap())
        );
        assert_eq!(parse_instant(&json!(true)), None);
    }

    #[test]
    fn test_from_epoch_seconds_numeric_string() {
        assert_eq!(
            from_epoch_seconds(&json!("1000")),
            Some(Utc.timestamp_opt(1000, 0).unwrap())
        );
        assert_eq!(from_epoch_seconds(&json!("soon")), None);
        assert_eq!(epoch_seconds(&json!(" 2.5 ")), Some(2.5));
        assert_eq!(epoch_seconds(&json!("inf")), None);
    }
}
