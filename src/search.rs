//! Keyword search over the session corpus.
//!
//! Matching is boolean: the query is lowercased and split on whitespace into
//! a set of terms, and a message matches when **every** term is a substring
//! of its lowercased text. No stemming, no word boundaries, no scoring.
//! Results keep corpus order.
//!
//! There is no index. Each search is a linear scan, which is fine for a
//! single user's export (hundreds to a few thousand messages).
//!
//! [`SearchFilter`] narrows matches further by speaker and date range and can
//! cap the result count; filtering never reorders.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use serde::Serialize;

use crate::models::{CanonicalMessage, Speaker};

/// Optional constraints applied after term matching.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchFilter {
    /// Only messages from this speaker.
    pub speaker: Option<Speaker>,
    /// Only messages on or after this UTC date.
    pub since: Option<NaiveDate>,
    /// Only messages on or before this UTC date.
    pub until: Option<NaiveDate>,
    /// Keep at most this many results (the first ones in corpus order).
    pub limit: Option<usize>,
}

impl SearchFilter {
    /// Build a filter from CLI-style strings (`YYYY-MM-DD` dates).
    pub fn from_args(
        speaker: Option<&str>,
        since: Option<&str>,
        until: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Self> {
        let speaker = match speaker {
            Some(s) => Some(Speaker::parse(s).with_context(|| {
                format!(
                    "Unknown speaker '{}'. Use user, assistant, system, or unknown.",
                    s
                )
            })?),
            None => None,
        };
        let since = since.map(parse_date).transpose()?;
        let until = until.map(parse_date).transpose()?;

        if let (Some(s), Some(u)) = (since, until) {
            if s > u {
                bail!("--since ({}) is after --until ({})", s, u);
            }
        }
        if limit == Some(0) {
            bail!("--limit must be >= 1");
        }

        Ok(Self {
            speaker,
            since,
            until,
            limit,
        })
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn accepts(&self, message: &CanonicalMessage) -> bool {
        if let Some(speaker) = self.speaker {
            if message.speaker != speaker {
                return false;
            }
        }
        let day = message.timestamp.date_naive();
        if let Some(since) = self.since {
            if day < since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if day > until {
                return false;
            }
        }
        true
    }
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", s))
}

/// Split a query into its distinct lowercase terms, in first-seen order.
pub fn parse_terms(query: &str) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    for term in query.to_lowercase().split_whitespace() {
        if !terms.iter().any(|t| t == term) {
            terms.push(term.to_string());
        }
    }
    terms
}

/// Whether `text` contains every term (terms must already be lowercase).
pub fn matches_all(terms: &[String], text: &str) -> bool {
    let text = text.to_lowercase();
    terms.iter().all(|term| text.contains(term.as_str()))
}

/// Return the messages whose text contains every query term, in corpus order.
///
/// An empty (or all-whitespace) query or an empty corpus yields no results.
pub fn search<'a>(query: &str, corpus: &'a [CanonicalMessage]) -> Vec<&'a CanonicalMessage> {
    search_filtered(query, corpus, &SearchFilter::default())
}

/// [`search`] with speaker, date and limit constraints.
pub fn search_filtered<'a>(
    query: &str,
    corpus: &'a [CanonicalMessage],
    filter: &SearchFilter,
) -> Vec<&'a CanonicalMessage> {
    let terms = parse_terms(query);
    if terms.is_empty() || corpus.is_empty() {
        return Vec::new();
    }

    let matched = corpus
        .iter()
        .filter(|m| matches_all(&terms, &m.text))
        .filter(|m| filter.accepts(m));

    match filter.limit {
        Some(limit) => matched.take(limit).collect(),
        None => matched.collect(),
    }
}
