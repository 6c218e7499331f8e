//! Normalizer extension point.
//!
//! Every importer turns raw file text into an ordered sequence of
//! [`CanonicalMessage`]s, or fails. The JSON chat-export importer is the
//! built-in implementation; plain-text or tabular importers plug in as
//! parallel implementations of the same trait.
//!
//! ```text
//! ┌───────────────────────────────────────┐
//! │          NormalizerRegistry           │
//! │  ┌─────────────┐   ┌───────────────┐  │
//! │  │ chat-export │   │ custom (Rust) │  │
//! │  │   (.json)   │   │               │  │
//! │  └─────────────┘   └───────────────┘  │
//! └──────────────────┬────────────────────┘
//!                    ▼
//!           Session::load() → corpus
//! ```
//!
//! # Usage
//!
//! ```rust
//! use knowledge_garden::traits::NormalizerRegistry;
//!
//! let registry = NormalizerRegistry::with_defaults();
//! let normalizer = registry.for_file("conversations.json").unwrap();
//! assert_eq!(normalizer.name(), "chat-export");
//! ```

use crate::error::GardenError;
use crate::export::ExportNormalizer;
use crate::models::CanonicalMessage;
use serde::Serialize;

/// Which top-level layout the input had.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputShape {
    /// An object carrying a `conversations` list.
    #[default]
    ConversationsField,
    /// A bare list of conversations.
    BareList,
    /// Valid input of no known layout; produces no messages.
    Unrecognized,
}

impl InputShape {
    pub fn describe(&self) -> &'static str {
        match self {
            InputShape::ConversationsField => "object with a conversations list",
            InputShape::BareList => "list of conversations",
            InputShape::Unrecognized => "unrecognized (no conversations found)",
        }
    }
}

/// Counters collected during one normalization run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizeReport {
    pub shape: InputShape,
    /// Conversations visited, including ones that produced no messages.
    pub conversations: usize,
    /// Raw messages found by extraction.
    pub raw_messages: usize,
    /// Raw messages that could not be normalized.
    pub skipped: usize,
}

/// Result of a successful normalization.
#[derive(Debug, Clone)]
pub struct Normalized {
    pub messages: Vec<CanonicalMessage>,
    pub report: NormalizeReport,
}

/// An importer from one file format into canonical messages.
///
/// # Example
///
/// ```rust
/// use knowledge_garden::error::GardenError;
/// use knowledge_garden::traits::{Normalized, NormalizeReport, Normalizer};
///
/// pub struct EmptyNormalizer;
///
/// impl Normalizer for EmptyNormalizer {
///     fn name(&self) -> &str { "empty" }
///     fn description(&self) -> &str { "Accepts .empty files and yields nothing" }
///     fn handles(&self, file_name: &str) -> bool { file_name.ends_with(".empty") }
///
///     fn normalize(&self, _raw: &str) -> Result<Normalized, GardenError> {
///         Ok(Normalized { messages: vec![], report: NormalizeReport::default() })
///     }
/// }
/// ```
pub trait Normalizer: Send + Sync {
    /// Short identifier, e.g. `"chat-export"`.
    fn name(&self) -> &str;

    /// One-line description for `kg` output.
    fn description(&self) -> &str;

    /// Whether this normalizer accepts a file with the given name.
    fn handles(&self, file_name: &str) -> bool;

    /// Convert raw file text into canonical messages.
    ///
    /// Fails only when the text cannot be read as this format at all;
    /// individual bad records are skipped and counted in the report.
    fn normalize(&self, raw: &str) -> Result<Normalized, GardenError>;
}

/// Registry of normalizers, consulted in registration order.
pub struct NormalizerRegistry {
    normalizers: Vec<Box<dyn Normalizer>>,
}

impl NormalizerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            normalizers: Vec::new(),
        }
    }

    /// Registry with the built-in chat-export normalizer.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(ExportNormalizer));
        registry
    }

    pub fn register(&mut self, normalizer: Box<dyn Normalizer>) {
        self.normalizers.push(normalizer);
    }

    pub fn list(&self) -> &[Box<dyn Normalizer>] {
        &self.normalizers
    }

    /// First normalizer that accepts `file_name`.
    pub fn for_file(&self, file_name: &str) -> Result<&dyn Normalizer, GardenError> {
        self.normalizers
            .iter()
            .find(|n| n.handles(file_name))
            .map(|n| n.as_ref())
            .ok_or_else(|| GardenError::UnsupportedFormat {
                file_name: file_name.to_string(),
                supported: self.normalizers.iter().map(|n| n.name().to_string()).collect(),
            })
    }
}

impl Default for NormalizerRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
