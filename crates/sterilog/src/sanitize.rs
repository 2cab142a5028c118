//! Keeps directory layouts out of span attributes.
//!
//! Report folders on clinic machines often carry patient or staff names, so
//! only the last path component is recorded.

use std::path::Path;

/// Returns the last component of `path`, or `<unknown>` when there is none.
pub fn redact_path(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string()
}
