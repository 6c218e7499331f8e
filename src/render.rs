//! Presentation of search results and guidance.
//!
//! Three formats: plain text for the terminal, an HTML fragment with matched
//! terms wrapped in `<mark>`, and JSON. Message text and titles are always
//! escaped before they reach HTML; highlighting is computed on the raw text
//! and escaping applied per segment, so a term can never split an entity.

use anyhow::Result;
use serde::Serialize;
use std::ops::Range;

use crate::config::OutputFormat;
use crate::models::CanonicalMessage;
use crate::search::parse_terms;
use crate::session::{Guidance, SearchOutcome};
use crate::summary::{preview, ConversationSummary};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Byte ranges of `text` covered by any of the lowercase `terms`.
///
/// Matching is case-insensitive. Overlapping and adjacent ranges are merged
/// and the result is sorted.
pub fn match_ranges(text: &str, terms: &[String]) -> Vec<Range<usize>> {
    // Lowercasing can change byte lengths, so keep the original span of the
    // char that produced each lowercase byte.
    let mut lower = String::with_capacity(text.len());
    let mut spans: Vec<Range<usize>> = Vec::with_capacity(text.len());
    for (start, c) in text.char_indices() {
        let end = start + c.len_utf8();
        for l in c.to_lowercase() {
            lower.push(l);
            for _ in 0..l.len_utf8() {
                spans.push(start..end);
            }
        }
    }
    // Search lowercases whole strings, where a word-final Σ becomes ς. The
    // per-char pass always yields σ; both are two bytes, so the spans hold.
    let whole = text.to_lowercase();
    if whole.len() == lower.len() {
        lower = whole;
    }

    let mut ranges: Vec<Range<usize>> = Vec::new();
    for term in terms.iter().filter(|t| !t.is_empty()) {
        let mut from = 0;
        while let Some(pos) = lower[from..].find(term.as_str()) {
            let s = from + pos;
            let e = s + term.len();
            ranges.push(spans[s].start..spans[e - 1].end);
            from = s + lower[s..].chars().next().map_or(1, char::len_utf8);
        }
    }

    ranges.sort_by_key(|r| r.start);
    let mut merged: Vec<Range<usize>> = Vec::with_capacity(ranges.len());
    for range in ranges {
        match merged.last_mut() {
            Some(last) if range.start <= last.end => last.end = last.end.max(range.end),
            _ => merged.push(range),
        }
    }
    merged
}

/// Escape `text` and wrap every match of the query's terms in `<mark>`.
pub fn highlight_html(text: &str, query: &str) -> String {
    let terms = parse_terms(query);
    let mut out = String::with_capacity(text.len() + 16);
    let mut cursor = 0;
    for range in match_ranges(text, &terms) {
        out.push_str(&escape_html(&text[cursor..range.start]));
        out.push_str("<mark>");
        out.push_str(&escape_html(&text[range.clone()]));
        out.push_str("</mark>");
        cursor = range.end;
    }
    out.push_str(&escape_html(&text[cursor..]));
    out
}

pub fn no_results_message(query: &str) -> String {
    format!("No messages match \"{}\".", query)
}

pub fn render_guidance_text(guidance: Guidance) -> String {
    format!("{}\n", guidance.message())
}

pub fn render_guidance_html(guidance: Guidance) -> String {
    format!(
        "<div class=\"empty-state\"><p>{}</p></div>\n",
        escape_html(guidance.message())
    )
}

/// Terminal listing: one header line per result and an indented snippet.
pub fn render_text(query: &str, results: &[&CanonicalMessage], snippet_chars: usize) -> String {
    if results.is_empty() {
        return format!("{}\n", no_results_message(query));
    }

    let mut out = format!(
        "{} result{} for \"{}\"\n",
        results.len(),
        if results.len() == 1 { "" } else { "s" },
        query
    );
    for message in results {
        out.push('\n');
        out.push_str(&format!(
            "[{}] {} | {}\n",
            message.timestamp.format(TIME_FORMAT),
            message.speaker.label(),
            message.conversation_title
        ));
        let snippet = preview(&message.text, snippet_chars);
        for line in snippet.lines() {
            out.push_str("    ");
            out.push_str(line);
            out.push('\n');
        }
    }
    out
}

/// HTML fragment with one `result-item` block per message.
pub fn render_html(query: &str, results: &[&CanonicalMessage]) -> String {
    if results.is_empty() {
        return format!(
            "<div class=\"empty-state\"><p>{}</p></div>\n",
            escape_html(&no_results_message(query))
        );
    }

    let mut out = String::new();
    out.push_str("<div class=\"search-results\">\n");
    out.push_str(&format!(
        "<div class=\"results-header\"><h3>Results for \"{}\" ({})</h3></div>\n",
        escape_html(query),
        results.len()
    ));
    for message in results {
        out.push_str(&format!(
            concat!(
                "<div class=\"result-item\">\n",
                "  <div class=\"result-header\">",
                "<span class=\"speaker-label speaker-{}\">{}</span> ",
                "<span class=\"timestamp\">{}</span></div>\n",
                "  <div class=\"result-content\">{}</div>\n",
                "  <div class=\"result-meta\"><span class=\"conversation-title\">{}</span></div>\n",
                "</div>\n"
            ),
            message.speaker.as_str(),
            message.speaker.label(),
            message.timestamp.format(TIME_FORMAT),
            highlight_html(&message.text, query),
            escape_html(&message.conversation_title),
        ));
    }
    out.push_str("</div>\n");
    out
}

#[derive(Serialize)]
struct JsonResults<'a> {
    query: &'a str,
    total: usize,
    results: &'a [&'a CanonicalMessage],
}

pub fn render_json(query: &str, results: &[&CanonicalMessage]) -> Result<String> {
    let body = JsonResults {
        query,
        total: results.len(),
        results,
    };
    Ok(serde_json::to_string_pretty(&body)?)
}

/// Render a [`SearchOutcome`] in the requested format.
pub fn render_outcome(
    outcome: &SearchOutcome<'_>,
    format: OutputFormat,
    snippet_chars: usize,
) -> Result<String> {
    match (outcome, format) {
        (SearchOutcome::Guidance(g), OutputFormat::Text) => Ok(render_guidance_text(*g)),
        (SearchOutcome::Guidance(g), OutputFormat::Html) => Ok(render_guidance_html(*g)),
        (SearchOutcome::Guidance(g), OutputFormat::Json) => Ok(serde_json::to_string_pretty(
            &serde_json::json!({ "guidance": g.message() }),
        )?),
        (SearchOutcome::Results { query, messages }, OutputFormat::Text) => {
            Ok(render_text(query, messages, snippet_chars))
        }
        (SearchOutcome::Results { query, messages }, OutputFormat::Html) => {
            Ok(render_html(query, messages))
        }
        (SearchOutcome::Results { query, messages }, OutputFormat::Json) => {
            render_json(query, messages)
        }
    }
}

/// Listing for `kg recent`.
pub fn render_summaries_text(summaries: &[ConversationSummary]) -> String {
    if summaries.is_empty() {
        return "No conversations.\n".to_string();
    }
    let mut out = String::new();
    for s in summaries {
        out.push_str(&format!(
            "[{}] {} ({} messages)\n",
            s.latest.format(TIME_FORMAT),
            s.title,
            s.message_count
        ));
        if !s.user_message.is_empty() {
            out.push_str(&format!("    User:      {}\n", one_line(&s.user_message)));
        }
        if !s.assistant_message.is_empty() {
            out.push_str(&format!("    Assistant: {}\n", one_line(&s.assistant_message)));
        }
    }
    out
}

fn one_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Platform, Speaker};
    use chrono::{TimeZone, Utc};

    fn msg(text: &str, title: &str) -> CanonicalMessage {
        CanonicalMessage {
            platform: Platform::ChatExport,
            speaker: Speaker::User,
            text: text.to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).unwrap(),
            conversation_id: "c1".to_string(),
            conversation_title: title.to_string(),
            message_index: 0,
            original: serde_json::Value::Null,
        }
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_match_ranges_merge() {
        let terms = vec!["ab".to_string(), "bc".to_string()];
        assert_eq!(match_ranges("xABCx abx", &terms), vec![1..4, 6..8]);
    }

    #[test]
    fn test_match_ranges_overlapping_occurrences() {
        assert_eq!(match_ranges("aaa", &["aa".to_string()]), vec![0..3]);
    }

    #[test]
    fn test_match_ranges_length_changing_lowercase() {
        // 'İ' lowercases to two chars ("i" + combining dot).
        let text = "İstanbul";
        let ranges = match_ranges(text, &["stan".to_string()]);
        assert_eq!(&text[ranges[0].clone()], "stan");
    }

    #[test]
    fn test_highlight_word_final_sigma() {
        assert_eq!(highlight_html("ΟΔΟΣ", "ΟΔΟΣ"), "<mark>ΟΔΟΣ</mark>");
        assert_eq!(
            highlight_html("ΟΔΟΣ ΣΟΦΙΑΣ", "οδος"),
            "<mark>ΟΔΟΣ</mark> ΣΟΦΙΑΣ"
        );
        let text = "ΟΔΟΣ";
        let ranges = match_ranges(text, &parse_terms("οδοσ"));
        assert!(ranges.is_empty());
        assert!(crate::search::matches_all(&parse_terms("ΟΔΟΣ"), text));
    }

    #[test]
    fn test_highlight_escapes_around_marks() {
        assert_eq!(
            highlight_html("Use <Vec> & vec!", "vec"),
            "Use &lt;<mark>Vec</mark>&gt; &amp; <mark>vec</mark>!"
        );
    }

    #[test]
    fn test_highlight_cannot_break_entities() {
        assert_eq!(highlight_html("a < b", "lt"), "a &lt; b");
    }

    #[test]
    fn test_render_text() {
        let m = msg("line one\nline two", "Notes");
        let out = render_text("line", &[&m], 200);
        assert!(out.starts_with("1 result for \"line\""));
        assert!(out.contains("[2024-03-09 14:05] User | Notes"));
        assert!(out.contains("    line one\n    line two\n"));
    }

    #[test]
    fn test_render_text_truncates_snippet() {
        let m = msg("abcdefghij", "T");
        assert!(render_text("abc", &[&m], 4).contains("    abcd...\n"));
    }

    #[test]
    fn test_no_results() {
        assert_eq!(render_text("zzz", &[], 200), "No messages match \"zzz\".\n");
        assert!(render_html("<q>", &[]).contains("&quot;&lt;q&gt;&quot;"));
    }

    #[test]
    fn test_render_html_escapes_title_and_query() {
        let m = msg("hello <b>", "<script>");
        let out = render_html("hello", &[&m]);
        assert!(out.contains("<mark>hello</mark> &lt;b&gt;"));
        assert!(out.contains("&lt;script&gt;"));
        assert!(!out.contains("<script>"));
        assert!(out.contains("class=\"result-item\""));
    }

    #[test]
    fn test_render_json() {
        let m = msg("hello", "T");
        let out = render_json("hello", &[&m]).unwrap();
        let v: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(v["total"], 1);
        assert_eq!(v["results"][0]["speaker"], "user");
        assert_eq!(v["results"][0]["platform"], "chatgpt");
        assert_eq!(v["results"][0]["conversationTitle"], "T");
        assert!(v["results"][0].get("original").is_none());
    }

    #[test]
    fn test_render_outcome_dispatch() {
        let m = msg("hello", "T");
        let results = SearchOutcome::Results {
            query: "hello".to_string(),
            messages: vec![&m],
        };
        assert!(render_outcome(&results, OutputFormat::Html, 200)
            .unwrap()
            .contains("<mark>hello</mark>"));
        let guidance = SearchOutcome::Guidance(Guidance::NoCorpus);
        let json: serde_json::Value =
            serde_json::from_str(&render_outcome(&guidance, OutputFormat::Json, 200).unwrap())
                .unwrap();
        assert_eq!(json["guidance"], Guidance::NoCorpus.message());
    }

    #[test]
    fn test_summaries_text() {
        let summary = ConversationSummary {
            conversation_id: "c1".to_string(),
            title: "Rust".to_string(),
            user_message: "How do\nlifetimes work?".to_string(),
            assistant_message: String::new(),
            latest: Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).unwrap(),
            message_count: 3,
        };
        let out = render_summaries_text(&[summary]);
        assert!(out.contains("[2024-03-09 14:05] Rust (3 messages)"));
        assert!(out.contains("User:      How do lifetimes work?"));
        assert!(!out.contains("Assistant:"));
        assert_eq!(render_summaries_text(&[]), "No conversations.\n");
    }

    #[test]
    fn test_guidance() {
        assert!(render_guidance_text(Guidance::NoCorpus).contains("Load a chat export"));
        assert!(render_guidance_html(Guidance::EmptyQuery).contains("empty-state"));
    }
}
