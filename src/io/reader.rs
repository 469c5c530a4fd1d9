//! PDF reading and loading operations.
//!
//! Uploaded bytes become a [`SourceDocument`]: the immutable bytes, the
//! parsed `lopdf` object graph and a lazily resolved page list. Source
//! documents are only ever read from; assembly copies pages out of them.
//!
//! [`PdfReader`] loads files from disk for the CLI, concurrently and in
//! input order.
//!
//! # Examples
//!
//! ```no_run
//! use pdfsplice::io::reader::PdfReader;
//! use std::path::PathBuf;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let reader = PdfReader::new();
//! let paths = vec![PathBuf::from("a.pdf"), PathBuf::from("b.pdf")];
//! let uploads = reader.read_all(&paths, 4).await?;
//! # Ok(())
//! # }
//! ```

use lopdf::{Document, ObjectId};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::error::{PdfSpliceError, Result};
use crate::merge::{DocumentBuilder, PageSource};

/// Raw document bytes handed over by a boundary layer.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Upload {
    /// Original file name, if the boundary layer knows it.
    pub name: Option<String>,

    /// Document bytes.
    pub bytes: Vec<u8>,
}

impl Upload {
    /// Create an upload without a file name.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { name: None, bytes }
    }

    /// Create an upload carrying its original file name.
    pub fn named(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: Some(name.into()),
            bytes,
        }
    }

    /// Human readable label used in error messages.
    pub fn label(&self, position: usize) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("document {}", position + 1))
    }
}

impl fmt::Debug for Upload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Upload")
            .field("name", &self.name)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

/// A parsed, immutable PDF document.
pub struct SourceDocument {
    label: String,
    bytes: Vec<u8>,
    document: Document,
    page_ids: OnceLock<Vec<ObjectId>>,
}

impl SourceDocument {
    /// Parse document bytes.
    ///
    /// # Errors
    ///
    /// Returns [`PdfSpliceError::UnreadableDocument`] if the bytes are not a
    /// PDF `lopdf` can open.
    pub fn from_bytes(label: impl Into<String>, bytes: Vec<u8>) -> Result<Self> {
        let label = label.into();
        let document = Document::load_mem(&bytes)
            .map_err(|err| PdfSpliceError::unreadable(label.clone(), err.to_string()))?;

        Ok(Self {
            label,
            bytes,
            document,
            page_ids: OnceLock::new(),
        })
    }

    /// Parse an upload, labelling it by name or by its position in a request.
    pub fn from_upload(upload: Upload, position: usize) -> Result<Self> {
        let label = upload.label(position);
        Self::from_bytes(label, upload.bytes)
    }

    /// The original bytes, untouched.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Give the original bytes back, dropping the parsed document.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// The parsed object graph.
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Page object ids in page tree order, resolved on first use.
    fn page_ids(&self) -> &[ObjectId] {
        self.page_ids
            .get_or_init(|| self.document.get_pages().into_values().collect())
    }

    /// Object id of a 1-based page number.
    pub fn page_id(&self, page: u32) -> Option<ObjectId> {
        let index = usize::try_from(page).ok()?.checked_sub(1)?;
        self.page_ids().get(index).copied()
    }
}

impl PageSource for SourceDocument {
    fn label(&self) -> &str {
        &self.label
    }

    fn version(&self) -> &str {
        &self.document.version
    }

    fn page_count(&self) -> usize {
        self.page_ids().len()
    }

    fn copy_page_to(&self, page: u32, builder: &mut DocumentBuilder) -> Result<()> {
        let page_id = self.page_id(page).ok_or_else(|| {
            PdfSpliceError::invalid_pages(vec![i64::from(page)], self.page_count())
        })?;

        builder
            .append_page(&self.document, page_id)
            .map_err(|err| match err {
                PdfSpliceError::UnreadableDocument { reason, .. } => {
                    PdfSpliceError::unreadable(self.label.clone(), reason)
                }
                other => other,
            })
    }
}

impl fmt::Debug for SourceDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceDocument")
            .field("label", &self.label)
            .field("bytes", &self.bytes.len())
            .field("version", &self.document.version)
            .field("objects", &self.document.objects.len())
            .finish()
    }
}

/// Loads PDF files from disk.
#[derive(Debug, Clone, Default)]
pub struct PdfReader;

impl PdfReader {
    /// Create a new PDF reader.
    pub fn new() -> Self {
        Self
    }

    /// Read a file into an [`Upload`] named after the file.
    ///
    /// The bytes are not parsed here; parsing happens in the service so that
    /// file input and protocol input go through the same path.
    ///
    /// # Errors
    ///
    /// Returns [`PdfSpliceError::FileNotAccessible`] if the file cannot be read.
    pub async fn read(&self, path: &Path) -> Result<Upload> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| PdfSpliceError::FileNotAccessible {
                path: path.to_path_buf(),
                source,
            })?;

        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Upload::named(name, bytes))
    }

    /// Read several files concurrently, keeping input order.
    ///
    /// # Arguments
    ///
    /// * `paths` - Files to read
    /// * `workers` - Maximum number of reads in flight
    ///
    /// # Errors
    ///
    /// Fails on the first file that cannot be read.
    pub async fn read_all(&self, paths: &[PathBuf], workers: usize) -> Result<Vec<Upload>> {
        use futures::stream::{self, StreamExt, TryStreamExt};

        let workers = workers.max(1);

        stream::iter(paths.iter().map(|path| self.read(path)))
            .buffered(workers)
            .try_collect()
            .await
    }
}
