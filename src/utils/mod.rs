//! Utilities for path collection, file names and sizes.

use crate::{Result, error::PdfSpliceError};
use std::path::PathBuf;

/// Expand multiple glob patterns into filesystem paths.
///
/// Accepts anything iterable with items that convert to `&str`, e.g.:
/// `&[&str]`, `Vec<String>`, or `Vec<&str>`.
///
/// Patterns are expanded in the order given; matches of one pattern come
/// back sorted. A pattern without glob metacharacters is passed through as
/// a plain path so that a missing file is reported by the reader.
///
/// Errors:
/// - Propagates `glob` parse errors.
/// - Fails if a glob pattern matches nothing.
pub fn collect_paths_for_patterns<T>(patterns: T) -> Result<Vec<PathBuf>>
where
    T: IntoIterator,
    T::Item: AsRef<str>,
{
    let mut resolved_paths = Vec::new();

    for pattern in patterns.into_iter() {
        let paths = collect_paths_for_pattern(pattern)?;
        resolved_paths.extend(paths);
    }

    Ok(resolved_paths)
}

/// Expand a single glob pattern into filesystem paths.
fn collect_paths_for_pattern<P: AsRef<str>>(pattern: P) -> Result<Vec<PathBuf>> {
    let pattern = pattern.as_ref();
    if !pattern.contains(['*', '?', '[']) {
        return Ok(vec![PathBuf::from(pattern)]);
    }

    let paths = glob::glob(pattern).map_err(|err| {
        PdfSpliceError::invalid_config(format!("Invalid pattern '{pattern}': {err}"))
    })?;

    let mut resolved_paths = Vec::new();
    for entry in paths {
        let path = entry.map_err(|err| PdfSpliceError::other(err.to_string()))?;
        if path.is_file() {
            resolved_paths.push(path);
        }
    }

    if resolved_paths.is_empty() {
        return Err(PdfSpliceError::invalid_config(format!(
            "No files match pattern '{pattern}'"
        )));
    }

    resolved_paths.sort();
    Ok(resolved_paths)
}

/// Reduce an upload name to a safe file name.
///
/// Whitespace runs become `_`, every character outside `[A-Za-z0-9._-]` is
/// dropped and leading or trailing dots and underscores are trimmed. The
/// result may be empty.
pub fn sanitize_file_name(name: &str) -> String {
    // Keep only the last path component.
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);

    let joined = base.split_whitespace().collect::<Vec<_>>().join("_");
    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();

    kept.trim_matches(['.', '_']).to_string()
}

/// Format file size as human-readable string.
pub fn format_file_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{size} bytes")
    }
}
