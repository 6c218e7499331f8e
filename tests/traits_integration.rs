//! Integration tests for the `Normalizer` extension point.
//!
//! A custom normalizer registered next to the built-in chat-export one must
//! flow through file routing, session loading, search and rendering exactly
//! like the built-in importer does.

use chrono::{TimeZone, Utc};
use knowledge_garden::config::OutputFormat;
use knowledge_garden::error::GardenError;
use knowledge_garden::models::{CanonicalMessage, Platform, Speaker};
use knowledge_garden::render::render_outcome;
use knowledge_garden::search::SearchFilter;
use knowledge_garden::session::{Guidance, SearchOutcome, Session};
use knowledge_garden::summary::summarize;
use knowledge_garden::traits::{NormalizeReport, Normalized, Normalizer, NormalizerRegistry};
use std::fs;
use tempfile::TempDir;

// ─── Test Normalizer ────────────────────────────────────────────────

/// Reads `Speaker: text` lines; blank lines separate conversations.
struct TranscriptNormalizer;

impl Normalizer for TranscriptNormalizer {
    fn name(&self) -> &str {
        "transcript"
    }

    fn description(&self) -> &str {
        "Plain-text transcripts (Speaker: text)"
    }

    fn handles(&self, file_name: &str) -> bool {
        file_name.to_ascii_lowercase().ends_with(".txt")
    }

    fn normalize(&self, raw: &str) -> Result<Normalized, GardenError> {
        let mut messages = Vec::new();
        let mut report = NormalizeReport::default();
        for (conv_index, block) in raw.split("\n\n").enumerate() {
            report.conversations += 1;
            for (index, line) in block.lines().filter(|l| !l.trim().is_empty()).enumerate() {
                report.raw_messages += 1;
                let Some((who, text)) = line.split_once(':') else {
                    report.skipped += 1;
                    continue;
                };
                messages.push(CanonicalMessage {
                    platform: Platform::ChatExport,
                    speaker: Speaker::from_role(Some(who.trim().to_lowercase().as_str())),
                    text: text.trim().to_string(),
                    timestamp: Utc
                        .with_ymd_and_hms(2024, 1, 1 + conv_index as u32, 9, index as u32, 0)
                        .unwrap(),
                    conversation_id: format!("t{}", conv_index),
                    conversation_title: format!("Transcript {}", conv_index + 1),
                    message_index: index,
                    original: serde_json::Value::String(line.to_string()),
                });
            }
        }
        Ok(Normalized { messages, report })
    }
}

fn registry() -> NormalizerRegistry {
    let mut registry = NormalizerRegistry::with_defaults();
    registry.register(Box::new(TranscriptNormalizer));
    registry
}

const TRANSCRIPT: &str = "User: how do I read a file in rust\n\
Assistant: use std::fs::read_to_string\n\
garbage line without a speaker\n\
\n\
User: what about tokio\n\
Assistant: tokio::fs::read_to_string is the async version";

const EXPORT: &str = r#"{"conversations":[{"id":"j1","title":"JSON one","messages":[
    {"role":"user","content":"read a file in rust please","create_time":1700000000}
]}]}"#;

// ─── Tests ──────────────────────────────────────────────────────────

#[test]
fn test_registry_routes_by_file_name() {
    let registry = registry();
    assert_eq!(registry.list().len(), 2);
    assert_eq!(registry.for_file("notes.TXT").unwrap().name(), "transcript");
    assert_eq!(
        registry.for_file("conversations.json").unwrap().name(),
        "chat-export"
    );
    match registry.for_file("export.csv") {
        Err(GardenError::UnsupportedFormat { supported, .. }) => {
            assert_eq!(supported, vec!["chat-export", "transcript"]);
        }
        other => panic!("expected UnsupportedFormat, got {:?}", other.map(|n| n.name())),
    }
}

#[test]
fn test_custom_normalizer_through_session() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("chat.txt");
    fs::write(&path, TRANSCRIPT).unwrap();

    let mut session = Session::new();
    let summary = session.load_path(&registry(), &path).unwrap();
    assert_eq!(summary.normalizer, "transcript");
    assert_eq!(summary.messages, 4);
    assert_eq!(summary.conversations, 2);
    assert_eq!(summary.report.skipped, 1);

    let filter = SearchFilter::from_args(Some("assistant"), None, None, None).unwrap();
    match session.search("READ_TO_STRING", &filter) {
        SearchOutcome::Results { messages, .. } => {
            let ids: Vec<&str> = messages.iter().map(|m| m.conversation_id.as_str()).collect();
            assert_eq!(ids, vec!["t0", "t1"]);
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(session.stats().searches, 1);
}

#[test]
fn test_switching_formats_replaces_corpus() {
    let tmp = TempDir::new().unwrap();
    let txt = tmp.path().join("chat.txt");
    let json = tmp.path().join("conversations.json");
    fs::write(&txt, TRANSCRIPT).unwrap();
    fs::write(&json, EXPORT).unwrap();

    let registry = registry();
    let mut session = Session::new();
    session.load_path(&registry, &txt).unwrap();
    session.load_path(&registry, &json).unwrap();

    assert_eq!(session.corpus().len(), 1);
    match session.search("rust file", &SearchFilter::default()) {
        SearchOutcome::Results { messages, .. } => {
            assert_eq!(messages.len(), 1);
            assert_eq!(messages[0].conversation_title, "JSON one");
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[test]
fn test_guidance_then_results_rendered() {
    let mut session = Session::new();
    let before = session.search("rust", &SearchFilter::default());
    assert!(matches!(before, SearchOutcome::Guidance(Guidance::NoCorpus)));
    let text = render_outcome(&before, OutputFormat::Text, 200).unwrap();
    assert_eq!(text.trim(), Guidance::NoCorpus.message());

    session
        .load(&TranscriptNormalizer, TRANSCRIPT)
        .unwrap();
    let outcome = session.search("tokio", &SearchFilter::default());
    let html = render_outcome(&outcome, OutputFormat::Html, 200).unwrap();
    assert!(html.contains("what about <mark>tokio</mark>"));
    assert!(html.contains("<mark>tokio</mark>::fs::read_to_string"));
}

#[test]
fn test_summaries_over_custom_corpus() {
    let mut session = Session::new();
    session.load(&TranscriptNormalizer, TRANSCRIPT).unwrap();
    let summaries = summarize(session.corpus(), 10);
    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0].conversation_id, "t1");
    assert_eq!(summaries[0].user_message, "what about...");
    assert_eq!(summaries[1].assistant_message, "use std::f...");
}
