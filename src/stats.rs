//! Corpus statistics.
//!
//! A quick summary of what is loaded: message and conversation counts,
//! searches run in this session, and a per-speaker breakdown. Used by
//! `kg stats` and `kg load`.

use serde::Serialize;

use crate::models::{CanonicalMessage, Speaker};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CorpusStats {
    pub messages: usize,
    pub conversations: usize,
    pub searches: usize,
    pub by_speaker: Vec<SpeakerCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpeakerCount {
    pub speaker: Speaker,
    pub messages: usize,
}

const SPEAKERS: [Speaker; 4] = [
    Speaker::User,
    Speaker::Assistant,
    Speaker::System,
    Speaker::Unknown,
];

pub fn compute(corpus: &[CanonicalMessage], searches: usize) -> CorpusStats {
    let mut conversations: Vec<&str> = corpus.iter().map(|m| m.conversation_id.as_str()).collect();
    conversations.sort_unstable();
    conversations.dedup();

    let by_speaker = SPEAKERS
        .iter()
        .map(|&speaker| SpeakerCount {
            speaker,
            messages: corpus.iter().filter(|m| m.speaker == speaker).count(),
        })
        .filter(|c| c.messages > 0)
        .collect();

    CorpusStats {
        messages: corpus.len(),
        conversations: conversations.len(),
        searches,
        by_speaker,
    }
}

/// Render stats as the plain-text block printed by `kg stats`.
pub fn format_stats(stats: &CorpusStats) -> String {
    let mut out = String::new();
    out.push_str("Knowledge Garden Corpus Stats\n");
    out.push_str("=============================\n\n");
    out.push_str(&format!("  Messages:      {}\n", stats.messages));
    out.push_str(&format!("  Conversations: {}\n", stats.conversations));
    out.push_str(&format!("  Searches:      {}\n", stats.searches));

    if !stats.by_speaker.is_empty() {
        out.push_str("\n  By speaker:\n");
        out.push_str(&format!("  {:<12} {:>8} {:>6}\n", "SPEAKER", "MESSAGES", "SHARE"));
        out.push_str(&format!("  {}\n", "-".repeat(28)));
        for c in &stats.by_speaker {
            out.push_str(&format!(
                "  {:<12} {:>8} {:>5}%\n",
                c.speaker.as_str(),
                c.messages,
                (c.messages * 100) / stats.messages.max(1)
            ));
        }
    }
    out
}
