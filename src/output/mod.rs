//! Output formatting and display for pdfsplice.
//!
//! This module handles all user-facing CLI output:
//! - Formatted status messages
//! - Error and warning display
//! - Per-document summaries
//! - Quiet and verbose modes
//!
//! Diagnostics for operators (request handling in `serve` mode) go through
//! `tracing` instead.

pub mod formatter;

pub use formatter::{MessageLevel, OutputFormatter};

use serde::Serialize;
use std::path::PathBuf;

use crate::io::WriteStatistics;
use crate::utils::format_file_size;

/// What `info` reports about one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    /// Path of the document.
    pub path: PathBuf,

    /// Number of pages.
    pub page_count: usize,

    /// Declared PDF version.
    pub version: String,

    /// File size in bytes.
    pub file_size: u64,
}

impl DocumentSummary {
    /// One-line description, e.g. `a.pdf: 3 page(s), PDF 1.7, 12.00 KB`.
    pub fn describe(&self) -> String {
        format!(
            "{}: {} page(s), PDF {}, {}",
            self.path.display(),
            self.page_count,
            self.version,
            format_file_size(self.file_size)
        )
    }
}

/// Report a written output file.
pub fn display_write_statistics(
    formatter: &OutputFormatter,
    page_count: usize,
    stats: &WriteStatistics,
) {
    formatter.success(&format!(
        "Wrote {} ({} page(s), {})",
        stats.output_path.display(),
        page_count,
        stats.format_file_size()
    ));
    formatter.detail("Write time", &format!("{:.2}s", stats.write_time.as_secs_f64()));
}

/// Report the documents inspected by `info`.
pub fn display_document_summaries(formatter: &OutputFormatter, summaries: &[DocumentSummary]) {
    for (idx, summary) in summaries.iter().enumerate() {
        formatter.list_item(idx + 1, &summary.describe());
    }

    if summaries.len() > 1 {
        let pages: usize = summaries.iter().map(|s| s.page_count).sum();
        let size: u64 = summaries.iter().map(|s| s.file_size).sum();
        formatter.info(&format!(
            "Total: {} document(s), {} page(s), {}",
            summaries.len(),
            pages,
            format_file_size(size)
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_describe_summary() {
        let summary = DocumentSummary {
            path: PathBuf::from("a.pdf"),
            page_count: 3,
            version: "1.7".to_string(),
            file_size: 12 * 1024,
        };
        assert_eq!(summary.describe(), "a.pdf: 3 page(s), PDF 1.7, 12.00 KB");
    }

    #[test]
    fn test_summary_serializes_camel_case() {
        let summary = DocumentSummary {
            path: PathBuf::from("a.pdf"),
            page_count: 1,
            version: "1.4".to_string(),
            file_size: 10,
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["pageCount"], 1);
        assert_eq!(json["fileSize"], 10);
    }

    #[test]
    fn test_display_helpers_respect_quiet() {
        let formatter = OutputFormatter::quiet();
        let stats = WriteStatistics {
            write_time: Duration::from_millis(5),
            file_size: 100,
            output_path: PathBuf::from("out.pdf"),
        };
        display_write_statistics(&formatter, 2, &stats);
        display_document_summaries(&formatter, &[]);
    }
}
