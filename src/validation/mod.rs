//! Upload validation for pdfsplice.
//!
//! Boundary checks applied to uploads before any PDF parsing:
//! - Size limit on the decoded bytes
//! - `.pdf` extension on named uploads
//! - `%PDF-` header sniffing
//!
//! These checks reject obviously wrong input cheaply; the parser remains the
//! authority on whether a document is readable.
//!
//! # Examples
//!
//! ```
//! use pdfsplice::io::Upload;
//! use pdfsplice::validation::UploadValidator;
//!
//! let validator = UploadValidator::new(1024);
//! let upload = Upload::named("notes.txt", b"%PDF-1.7".to_vec());
//! assert!(validator.validate(&upload).is_err());
//! ```

use crate::config::ServiceConfig;
use crate::error::{PdfSpliceError, Result};
use crate::io::Upload;

/// Marker every PDF file starts with.
const PDF_HEADER: &[u8] = b"%PDF-";

/// How far into the file the header may appear. Readers tolerate leading
/// garbage up to this offset.
const HEADER_SEARCH_WINDOW: usize = 1024;

/// Validates uploads against the boundary policies.
#[derive(Debug, Clone)]
pub struct UploadValidator {
    max_upload_bytes: usize,
    require_pdf_extension: bool,
}

impl UploadValidator {
    /// Create a validator with the given size limit that requires `.pdf`
    /// names.
    pub fn new(max_upload_bytes: usize) -> Self {
        Self {
            max_upload_bytes,
            require_pdf_extension: true,
        }
    }

    /// Create a validator from service configuration.
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self {
            max_upload_bytes: config.max_upload_bytes,
            require_pdf_extension: config.require_pdf_extension,
        }
    }

    /// Accept names without a `.pdf` extension.
    pub fn allow_any_extension(mut self) -> Self {
        self.require_pdf_extension = false;
        self
    }

    /// Configured size limit in bytes.
    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    /// Check an upload.
    ///
    /// # Errors
    ///
    /// - [`PdfSpliceError::UploadTooLarge`] if the bytes exceed the limit
    /// - [`PdfSpliceError::InvalidFileName`] if a name is given without a
    ///   `.pdf` extension
    /// - [`PdfSpliceError::UnreadableDocument`] if the bytes are empty or carry
    ///   no PDF header
    pub fn validate(&self, upload: &Upload) -> Result<()> {
        self.validate_at(upload, 0)
    }

    /// Check the upload at `position` of a multi-document request, so that
    /// unnamed uploads are reported by position.
    ///
    /// # Errors
    ///
    /// Same as [`UploadValidator::validate`].
    pub fn validate_at(&self, upload: &Upload, position: usize) -> Result<()> {
        self.check_size(upload.bytes.len())?;

        if self.require_pdf_extension
            && let Some(name) = &upload.name
        {
            check_file_name(name)?;
        }

        check_header(upload, position)
    }

    /// Check a size against the limit without holding the bytes.
    ///
    /// # Errors
    ///
    /// Returns [`PdfSpliceError::UploadTooLarge`] if `size` exceeds the limit.
    pub fn check_size(&self, size: usize) -> Result<()> {
        if size > self.max_upload_bytes {
            return Err(PdfSpliceError::UploadTooLarge {
                size,
                limit: self.max_upload_bytes,
            });
        }
        Ok(())
    }
}

/// Whether a file name carries the `.pdf` extension, ignoring case.
pub fn is_pdf_file_name(name: &str) -> bool {
    name.rsplit_once('.')
        .is_some_and(|(stem, ext)| !stem.is_empty() && ext.eq_ignore_ascii_case("pdf"))
}

fn check_file_name(name: &str) -> Result<()> {
    if is_pdf_file_name(name) {
        Ok(())
    } else {
        Err(PdfSpliceError::InvalidFileName {
            name: name.to_string(),
        })
    }
}

fn check_header(upload: &Upload, position: usize) -> Result<()> {
    let label = upload.label(position);

    if upload.bytes.is_empty() {
        return Err(PdfSpliceError::unreadable(label, "file is empty"));
    }

    let window = &upload.bytes[..upload.bytes.len().min(HEADER_SEARCH_WINDOW)];
    if window
        .windows(PDF_HEADER.len())
        .any(|candidate| candidate == PDF_HEADER)
    {
        Ok(())
    } else {
        Err(PdfSpliceError::unreadable(label, "missing %PDF- header"))
    }
}
