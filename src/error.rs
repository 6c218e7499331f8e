//! Typed errors surfaced by the library.
//!
//! Internal plumbing and the CLI use `anyhow`; callers of the library see
//! these `thiserror` types so they can tell a broken export apart from a
//! missing file.

use std::path::PathBuf;

/// Errors that abort processing of a whole file.
#[derive(Debug, thiserror::Error)]
pub enum GardenError {
    /// The export text is not valid JSON.
    #[error("Failed to parse {normalizer} export: {detail}")]
    Parse {
        normalizer: String,
        detail: String,
    },

    /// The file could not be read as UTF-8 text.
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No registered normalizer accepts this file.
    #[error("Unsupported file format: {file_name}. Supported: {}", supported.join(", "))]
    UnsupportedFormat {
        file_name: String,
        supported: Vec<String>,
    },
}

/// Why a single raw message was discarded.
///
/// A skip never aborts the batch; the export normalizer counts it and moves
/// on to the next message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MessageSkip {
    #[error("raw message is not an object")]
    NotAnObject,

    #[error("field `{field}` does not hold a valid instant: {value}")]
    InvalidTimestamp { field: &'static str, value: String },
}
