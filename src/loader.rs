//! Reading export files as text.

use std::path::Path;

use tracing::warn;

use crate::error::GardenError;

const UTF8_BOM: &[u8] = b"\xef\xbb\xbf";

/// Read a file as UTF-8 text, dropping a leading byte-order mark.
///
/// Invalid byte sequences are replaced with U+FFFD rather than failing the
/// load; only a failed read is an error.
pub fn read_as_text(path: &Path) -> Result<String, GardenError> {
    let bytes = std::fs::read(path).map_err(|source| GardenError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(&bytes[..]);
    match std::str::from_utf8(body) {
        Ok(text) => Ok(text.to_string()),
        Err(e) => {
            warn!(
                path = %path.display(),
                offset = e.valid_up_to(),
                "file is not valid UTF-8; invalid bytes replaced"
            );
            Ok(String::from_utf8_lossy(body).into_owned())
        }
    }
}

/// File name used to pick a normalizer; falls back to the full path.
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}
