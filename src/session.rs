//! Session state: the loaded corpus and the searches run against it.
//!
//! A [`Session`] is owned by the caller and passed by reference; there is no
//! global corpus. Loading a file replaces the corpus wholesale and only after
//! normalization succeeds, so a failed load keeps the previous corpus.
//!
//! The corpus is an immutable shared snapshot ([`Corpus`]). Replacement swaps
//! the snapshot; anyone holding the old one (a pending live search, say) keeps
//! reading a complete sequence.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::ops::Deref;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::error::GardenError;
use crate::loader;
use crate::models::CanonicalMessage;
use crate::search::{search_filtered, SearchFilter};
use crate::stats::{self, CorpusStats};
use crate::traits::{NormalizeReport, Normalizer, NormalizerRegistry};

/// Immutable, cheaply clonable message sequence.
#[derive(Debug, Clone)]
pub struct Corpus(Arc<[CanonicalMessage]>);

impl Corpus {
    pub fn new(messages: Vec<CanonicalMessage>) -> Self {
        Self(messages.into())
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn messages(&self) -> &[CanonicalMessage] {
        &self.0
    }

    /// Number of distinct conversation ids.
    pub fn conversation_count(&self) -> usize {
        self.0
            .iter()
            .map(|m| m.conversation_id.as_str())
            .collect::<HashSet<_>>()
            .len()
    }
}

impl Default for Corpus {
    fn default() -> Self {
        Self::empty()
    }
}

impl Deref for Corpus {
    type Target = [CanonicalMessage];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// One executed search.
#[derive(Debug, Clone)]
pub struct SearchRecord {
    pub query: String,
    pub at: DateTime<Utc>,
    pub filter: SearchFilter,
    pub results: usize,
}

/// What to show instead of results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guidance {
    /// Nothing loaded yet.
    NoCorpus,
    /// Corpus loaded but the query is blank.
    EmptyQuery,
}

impl Guidance {
    pub fn message(&self) -> &'static str {
        match self {
            Guidance::NoCorpus => "Load a chat export before searching.",
            Guidance::EmptyQuery => "Enter a keyword to start searching.",
        }
    }
}

/// Result of [`Session::search`].
#[derive(Debug)]
pub enum SearchOutcome<'a> {
    Guidance(Guidance),
    Results {
        query: String,
        messages: Vec<&'a CanonicalMessage>,
    },
}

/// Summary of a successful load.
#[derive(Debug, Clone)]
pub struct LoadSummary {
    pub normalizer: String,
    pub messages: usize,
    pub conversations: usize,
    pub report: NormalizeReport,
}

#[derive(Debug, Default)]
pub struct Session {
    corpus: Corpus,
    history: Vec<SearchRecord>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize `raw` and replace the corpus with the result.
    pub fn load(&mut self, normalizer: &dyn Normalizer, raw: &str) -> Result<LoadSummary, GardenError> {
        let normalized = normalizer.normalize(raw)?;
        self.replace(normalized.messages);

        let summary = LoadSummary {
            normalizer: normalizer.name().to_string(),
            messages: self.corpus.len(),
            conversations: self.corpus.conversation_count(),
            report: normalized.report,
        };
        info!(
            normalizer = %summary.normalizer,
            messages = summary.messages,
            conversations = summary.conversations,
            "corpus replaced"
        );
        Ok(summary)
    }

    /// Read `path`, pick a normalizer by file name and load it.
    pub fn load_path(
        &mut self,
        registry: &NormalizerRegistry,
        path: &Path,
    ) -> Result<LoadSummary, GardenError> {
        let normalizer = registry.for_file(&loader::file_name(path))?;
        let raw = loader::read_as_text(path)?;
        self.load(normalizer, &raw)
    }

    /// Swap in a new corpus.
    pub fn replace(&mut self, messages: Vec<CanonicalMessage>) {
        self.corpus = Corpus::new(messages);
    }

    pub fn is_loaded(&self) -> bool {
        !self.corpus.is_empty()
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    /// A handle on the current corpus that outlives later replacements.
    pub fn snapshot(&self) -> Corpus {
        self.corpus.clone()
    }

    /// Run a search, or return guidance when there is nothing to search.
    pub fn search(&mut self, query: &str, filter: &SearchFilter) -> SearchOutcome<'_> {
        if !self.is_loaded() {
            return SearchOutcome::Guidance(Guidance::NoCorpus);
        }
        let query = query.trim();
        if query.is_empty() {
            return SearchOutcome::Guidance(Guidance::EmptyQuery);
        }

        let messages = search_filtered(query, &self.corpus, filter);
        self.history.push(SearchRecord {
            query: query.to_string(),
            at: Utc::now(),
            filter: filter.clone(),
            results: messages.len(),
        });

        SearchOutcome::Results {
            query: query.to_string(),
            messages,
        }
    }

    pub fn history(&self) -> &[SearchRecord] {
        &self.history
    }

    pub fn stats(&self) -> CorpusStats {
        stats::compute(&self.corpus, self.history.len())
    }
}
