//! JSON request protocol.
//!
//! One request is one JSON object selecting an action; document bytes travel
//! as base64 strings:
//!
//! ```text
//! {"action":"merge","files":[{"name":"a.pdf","data":"<base64>"}, ...]}
//! {"action":"analyze","file":{"name":"a.pdf","data":"<base64>"}}
//! {"action":"split","key":"<key>","pages":"1,3,5-8"}
//! {"action":"cleanup","key":"<key>"}
//! ```
//!
//! Every request yields exactly one [`Response`] carrying an HTTP-style
//! status. Failures never escape as Rust errors; they become error responses
//! naming the error kind.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{PdfSpliceError, Result};
use crate::merge::AssembledDocument;
use crate::pages::PageSet;
use crate::service::{Analysis, PageRequest, PdfService, Upload};
use crate::validation::UploadValidator;

/// Content type of PDF payload responses.
pub const CONTENT_TYPE_PDF: &str = "application/pdf";

/// Content type of every other response.
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Download name of merged documents.
pub const MERGED_FILENAME: &str = "merged.pdf";

/// Suggested download name for extracted pages, e.g. `split_pages_1_3_5.pdf`.
pub fn split_filename(pages: &PageSet) -> String {
    let joined = pages
        .iter()
        .map(|page| page.to_string())
        .collect::<Vec<_>>()
        .join("_");

    format!("split_pages_{joined}.pdf")
}

/// A document inside a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilePayload {
    /// Original file name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Base64 encoded bytes.
    pub data: String,
}

impl FilePayload {
    /// Encode document bytes.
    pub fn encode(name: Option<String>, bytes: &[u8]) -> Self {
        Self {
            name,
            data: STANDARD.encode(bytes),
        }
    }
}

/// Pages of a split request: a range expression or a list of numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PagesField {
    /// Range expression such as `"1,3,5-8"`.
    Spec(String),
    /// Explicit page numbers.
    List(Vec<i64>),
}

impl From<PagesField> for PageRequest {
    fn from(field: PagesField) -> Self {
        match field {
            PagesField::Spec(spec) => PageRequest::Spec(spec),
            PagesField::List(pages) => PageRequest::Pages(pages),
        }
    }
}

/// A protocol request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum Request {
    /// Merge every page of the files, in order.
    Merge {
        /// Documents to merge.
        files: Vec<FilePayload>,
    },
    /// Count pages and cache the document.
    Analyze {
        /// Document to analyze.
        file: FilePayload,
    },
    /// Extract pages from a cached document.
    Split {
        /// Key returned by `analyze`.
        #[serde(alias = "filename")]
        key: String,
        /// Pages to extract.
        pages: PagesField,
    },
    /// Remove a cached document.
    Cleanup {
        /// Key returned by `analyze`.
        #[serde(alias = "filename")]
        key: String,
    },
}

impl Request {
    /// Name of the action, for logging.
    pub fn action(&self) -> &'static str {
        match self {
            Self::Merge { .. } => "merge",
            Self::Analyze { .. } => "analyze",
            Self::Split { .. } => "split",
            Self::Cleanup { .. } => "cleanup",
        }
    }
}

/// A protocol response.
///
/// Fields that do not apply to a response are omitted from its JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    /// HTTP-style status code.
    pub status: u16,

    /// Content type of the payload.
    pub content_type: String,

    /// Suggested download name of a PDF payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,

    /// Page count of the produced or analyzed document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_count: Option<usize>,

    /// Base64 encoded PDF payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,

    /// Cache key of an analyzed document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    /// Whether a cleanup removed an entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub removed: Option<bool>,

    /// Error kind, e.g. `CacheKeyNotFound`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// Error message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    fn json(status: u16) -> Self {
        Self {
            status,
            content_type: CONTENT_TYPE_JSON.to_string(),
            filename: None,
            page_count: None,
            data: None,
            key: None,
            removed: None,
            kind: None,
            error: None,
        }
    }

    /// A PDF payload.
    pub fn pdf(filename: impl Into<String>, document: &AssembledDocument) -> Self {
        Self {
            content_type: CONTENT_TYPE_PDF.to_string(),
            filename: Some(filename.into()),
            page_count: Some(document.page_count),
            data: Some(STANDARD.encode(&document.bytes)),
            ..Self::json(200)
        }
    }

    /// The result of an analysis.
    pub fn analysis(analysis: &Analysis) -> Self {
        Self {
            page_count: Some(analysis.page_count),
            key: Some(analysis.key.to_string()),
            ..Self::json(200)
        }
    }

    /// The result of a cleanup.
    pub fn removed(removed: bool) -> Self {
        Self {
            removed: Some(removed),
            ..Self::json(200)
        }
    }

    /// An error.
    pub fn error(err: &PdfSpliceError) -> Self {
        Self {
            kind: Some(err.kind().to_string()),
            error: Some(err.to_string()),
            ..Self::json(err.status_code())
        }
    }

    /// Whether the status is a success.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the PDF payload, if any.
    ///
    /// # Errors
    ///
    /// Returns [`PdfSpliceError::InvalidRequest`] if the payload is not valid
    /// base64.
    pub fn decode_data(&self) -> Result<Option<Vec<u8>>> {
        self.data
            .as_deref()
            .map(|data| decode_base64(data, "data"))
            .transpose()
    }
}

fn decode_base64(data: &str, field: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(data.trim())
        .map_err(|err| {
            PdfSpliceError::invalid_request(format!("Field '{field}' is not valid base64: {err}"))
        })
}

/// Executes protocol requests against a [`PdfService`].
///
/// Cloning is cheap; clones share the service.
#[derive(Debug, Clone)]
pub struct RequestHandler {
    service: Arc<PdfService>,
    validator: UploadValidator,
}

impl RequestHandler {
    /// Create a handler for a shared service.
    pub fn new(service: Arc<PdfService>) -> Self {
        let validator = UploadValidator::from_config(service.config());
        Self { service, validator }
    }

    /// The underlying service.
    pub fn service(&self) -> &Arc<PdfService> {
        &self.service
    }

    /// Parse and execute one JSON request.
    pub fn handle_json(&self, input: &str) -> Response {
        match serde_json::from_str::<Request>(input) {
            Ok(request) => self.handle(request),
            Err(err) => {
                let err = PdfSpliceError::invalid_request(err.to_string());
                tracing::warn!("rejected malformed request: {err}");
                Response::error(&err)
            }
        }
    }

    /// Execute one request.
    ///
    /// PDF work is CPU bound; async callers should run this on a blocking
    /// thread.
    pub fn handle(&self, request: Request) -> Response {
        let action = request.action();

        match self.dispatch(request) {
            Ok(response) => {
                tracing::info!(
                    "{action} succeeded: status={} pages={:?}",
                    response.status,
                    response.page_count
                );
                response
            }
            Err(err) if err.is_client_error() => {
                tracing::warn!("{action} rejected: {err}");
                Response::error(&err)
            }
            Err(err) => {
                tracing::error!("{action} failed: {err}");
                Response::error(&err)
            }
        }
    }

    fn dispatch(&self, request: Request) -> Result<Response> {
        match request {
            Request::Merge { files } => {
                let uploads = files
                    .into_iter()
                    .map(|file| self.decode_upload(file))
                    .collect::<Result<Vec<_>>>()?;
                tracing::debug!("merging {} documents", uploads.len());

                let merged = self.service.merge(uploads)?;
                Ok(Response::pdf(MERGED_FILENAME, &merged))
            }
            Request::Analyze { file } => {
                let upload = self.decode_upload(file)?;
                tracing::debug!("analyzing {} bytes", upload.bytes.len());

                let analysis = self.service.analyze(upload)?;
                Ok(Response::analysis(&analysis))
            }
            Request::Split { key, pages } => {
                tracing::debug!("splitting {key}");

                let extraction = self.service.split(&key, pages.into())?;
                Ok(Response::pdf(
                    split_filename(&extraction.pages),
                    &extraction.document,
                ))
            }
            Request::Cleanup { key } => {
                let removed = self.service.cleanup(&key)?;
                Ok(Response::removed(removed))
            }
        }
    }

    /// Decode a payload, refusing oversized data before allocating for it.
    fn decode_upload(&self, file: FilePayload) -> Result<Upload> {
        let significant = file.data.trim().trim_end_matches('=').len();
        self.validator.check_size(significant * 3 / 4)?;

        let bytes = decode_base64(&file.data, "data")?;
        Ok(Upload {
            name: file.name,
            bytes,
        })
    }
}
