//! Error types for pdfsplice.
//!
//! Every failure the assembly core can produce is a variant of
//! [`PdfSpliceError`]. Boundary layers (the JSON protocol and the CLI) map
//! the variants to status codes and exit codes, so the categories stay
//! distinguishable all the way out.
//!
//! # Error Categories
//!
//! - **Request errors**: too few documents, bad page selections, unknown cache keys
//! - **Document errors**: bytes that do not parse as a PDF
//! - **Boundary errors**: oversized uploads, bad file names, malformed requests
//! - **I/O errors**: cache storage and output files

use std::io;
use std::path::PathBuf;

use crate::pages::MAX_REPORTED_PAGES;

/// Result type alias for pdfsplice operations.
pub type Result<T> = std::result::Result<T, PdfSpliceError>;

/// Main error type for pdfsplice operations.
#[derive(Debug, thiserror::Error)]
pub enum PdfSpliceError {
    /// Fewer than two documents were supplied to a merge.
    #[error("At least 2 files are required to merge, got {count}")]
    InvalidInputCount {
        /// Number of documents that were supplied.
        count: usize,
    },

    /// The supplied bytes do not parse as a PDF document.
    #[error("Failed to read PDF '{label}'\n  Reason: {reason}")]
    UnreadableDocument {
        /// Name or position of the offending document.
        label: String,
        /// Parser failure description.
        reason: String,
    },

    /// A split referenced an unknown, expired or already consumed cache key.
    #[error("PDF not found: {key}\n  Hint: analyze the document again, cached uploads are single use")]
    CacheKeyNotFound {
        /// The key that was looked up.
        key: String,
    },

    /// The page selection is empty or contains pages outside `[1, page_count]`.
    #[error("{}", describe_selection(invalid, *omitted, *page_count))]
    InvalidPageSelection {
        /// Smallest offending page numbers, ascending, at most
        /// [`MAX_REPORTED_PAGES`]. Empty when nothing was selected.
        invalid: Vec<i64>,
        /// Offending pages left out of `invalid`.
        omitted: u64,
        /// Page count of the document the selection was checked against.
        page_count: usize,
    },

    /// Input file could not be read from disk.
    #[error("Cannot access file: {}\n  Reason: {source}", path.display())]
    FileNotAccessible {
        /// Path to the inaccessible file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Upload name does not carry a `.pdf` extension.
    #[error("Invalid file: {name}\n  Only .pdf files are accepted")]
    InvalidFileName {
        /// The rejected file name.
        name: String,
    },

    /// Upload exceeds the configured size limit.
    #[error("File too large: {size} bytes (limit is {limit} bytes)")]
    UploadTooLarge {
        /// Size of the rejected upload.
        size: usize,
        /// Configured limit.
        limit: usize,
    },

    /// The request envelope could not be understood.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// What was wrong with the request.
        message: String,
    },

    /// The cache storage backend failed.
    #[error("Cache storage failure for '{key}'\n  Reason: {source}")]
    CacheStorage {
        /// Key being accessed.
        key: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Writing the output file failed.
    #[error("Failed to write output: {}\n  Reason: {source}", path.display())]
    FailedToWrite {
        /// Path being written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Output file already exists and overwrite is not allowed.
    #[error(
        "Output file already exists: {}\n  Use --force to overwrite or choose a different output path",
        path.display()
    )]
    OutputExists {
        /// Path to the existing output file.
        path: PathBuf,
    },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Description of what's wrong with the configuration.
        message: String,
    },

    /// User cancelled the operation.
    #[error("Operation cancelled by user")]
    Cancelled,

    /// Generic I/O error.
    #[error("I/O error: {source}")]
    Io {
        /// Underlying I/O error.
        #[from]
        source: io::Error,
    },

    /// Generic error with a custom message.
    #[error("{message}")]
    Other {
        /// Error message.
        message: String,
    },
}

fn describe_selection(invalid: &[i64], omitted: u64, page_count: usize) -> String {
    if invalid.is_empty() {
        return "No valid pages selected".to_string();
    }

    let mut pages = invalid
        .iter()
        .map(i64::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    if omitted > 0 {
        pages.push_str(&format!(" and {omitted} more"));
    }

    format!("Invalid pages: {pages} (document has {page_count} page(s), valid pages are 1-{page_count})")
}

impl From<lopdf::Error> for PdfSpliceError {
    fn from(err: lopdf::Error) -> Self {
        Self::unreadable("document", err.to_string())
    }
}

impl PdfSpliceError {
    /// Create an UnreadableDocument error.
    pub fn unreadable(label: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnreadableDocument {
            label: label.into(),
            reason: reason.into(),
        }
    }

    /// Create a CacheKeyNotFound error.
    pub fn key_not_found(key: impl Into<String>) -> Self {
        Self::CacheKeyNotFound { key: key.into() }
    }

    /// Create an InvalidPageSelection error from ascending offending pages.
    ///
    /// Only the first [`MAX_REPORTED_PAGES`] are kept; the rest are counted.
    pub fn invalid_pages(mut invalid: Vec<i64>, page_count: usize) -> Self {
        let omitted = invalid.len().saturating_sub(MAX_REPORTED_PAGES) as u64;
        invalid.truncate(MAX_REPORTED_PAGES);

        Self::InvalidPageSelection {
            invalid,
            omitted,
            page_count,
        }
    }

    /// Create an InvalidRequest error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Create a CacheStorage error.
    pub fn cache_storage(key: impl Into<String>, source: io::Error) -> Self {
        Self::CacheStorage {
            key: key.into(),
            source,
        }
    }

    /// Create an OutputExists error.
    pub fn output_exists(path: PathBuf) -> Self {
        Self::OutputExists { path }
    }

    /// Create an InvalidConfig error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create an Other error with a custom message.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// Stable name of the error category, as reported by the protocol.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInputCount { .. } => "InvalidInputCount",
            Self::UnreadableDocument { .. } => "UnreadableDocument",
            Self::CacheKeyNotFound { .. } => "CacheKeyNotFound",
            Self::InvalidPageSelection { .. } => "InvalidPageSelection",
            Self::FileNotAccessible { .. } => "FileNotAccessible",
            Self::InvalidFileName { .. } => "InvalidFileName",
            Self::UploadTooLarge { .. } => "UploadTooLarge",
            Self::InvalidRequest { .. } => "InvalidRequest",
            Self::CacheStorage { .. } => "CacheStorage",
            Self::FailedToWrite { .. } => "FailedToWrite",
            Self::OutputExists { .. } => "OutputExists",
            Self::InvalidConfig { .. } => "InvalidConfig",
            Self::Cancelled => "Cancelled",
            Self::Io { .. } => "Io",
            Self::Other { .. } => "Other",
        }
    }

    /// Check if the caller caused this error and can fix it by changing the request.
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }

    /// HTTP-style status code a boundary layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidInputCount { .. } => 400,
            Self::InvalidPageSelection { .. } => 400,
            Self::InvalidFileName { .. } => 400,
            Self::InvalidRequest { .. } => 400,
            Self::CacheKeyNotFound { .. } => 404,
            Self::UploadTooLarge { .. } => 413,
            Self::UnreadableDocument { .. } => 422,
            _ => 500,
        }
    }

    /// Get the process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidInputCount { .. } => 1,
            Self::InvalidPageSelection { .. } => 1,
            Self::InvalidConfig { .. } => 1,
            Self::InvalidRequest { .. } => 1,
            Self::FileNotAccessible { .. } => 2,
            Self::InvalidFileName { .. } => 2,
            Self::CacheKeyNotFound { .. } => 2,
            Self::UploadTooLarge { .. } => 2,
            Self::UnreadableDocument { .. } => 3,
            Self::OutputExists { .. } => 4,
            Self::CacheStorage { .. } => 5,
            Self::FailedToWrite { .. } => 5,
            Self::Io { .. } => 5,
            Self::Cancelled => 130, // Standard exit code for SIGINT
            Self::Other { .. } => 1,
        }
    }
}
