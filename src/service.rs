//! Request orchestration.
//!
//! [`PdfService`] implements the three logical operations on top of the
//! upload cache and the assembly engine:
//!
//! - `merge`: concatenate every page of two or more uploads, in order
//! - `analyze`: count the pages of an upload and cache it under a fresh key
//! - `split`: consume a cached upload and extract the requested pages
//!
//! plus `cleanup` for explicit removal of a cached upload. Boundary layers
//! (the JSON protocol and the CLI) translate their input into these calls.
//! The service itself does not log; callers decide what to report.
//!
//! # Examples
//!
//! ```no_run
//! use pdfsplice::config::ServiceConfig;
//! use pdfsplice::service::{PageRequest, PdfService, Upload};
//!
//! # fn example(bytes: Vec<u8>) -> pdfsplice::Result<()> {
//! let service = PdfService::new(ServiceConfig::default())?;
//!
//! let analysis = service.analyze(Upload::named("report.pdf", bytes))?;
//! println!("{} pages", analysis.page_count);
//!
//! let extraction = service.split(analysis.key.as_str(), PageRequest::spec("1,3-4"))?;
//! println!("extracted pages {}", extraction.pages);
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};

use crate::cache::{CacheKey, DocumentCache};
use crate::config::ServiceConfig;
use crate::error::{PdfSpliceError, Result};
use crate::io::SourceDocument;
use crate::merge::{AssembledDocument, AssemblyEngine, AssemblySource, PageSelection, PageSource};
use crate::pages::PageSet;
use crate::validation::UploadValidator;

pub use crate::io::Upload;

/// Fewest documents a merge accepts.
pub const MIN_MERGE_INPUTS: usize = 2;

/// Result of analyzing an upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    /// Number of pages in the upload.
    pub page_count: usize,

    /// Key under which the upload is cached for a later split.
    pub key: CacheKey,
}

/// Pages requested by a split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageRequest {
    /// Range expression such as `"1,3,5-8"`, parsed leniently.
    Spec(String),
    /// Explicit page numbers.
    Pages(Vec<i64>),
}

impl PageRequest {
    /// Request pages by range expression.
    pub fn spec(spec: impl Into<String>) -> Self {
        Self::Spec(spec.into())
    }

    /// Normalize the request into a page set for a `page_count` page document.
    ///
    /// Range expressions are clipped to the document before expansion, so a
    /// short expression cannot select billions of pages.
    fn into_page_set(self, page_count: usize) -> Result<PageSet> {
        match self {
            Self::Spec(spec) => PageSet::parse_bounded(&spec, page_count),
            Self::Pages(pages) => Ok(pages.into_iter().collect()),
        }
    }
}

/// Result of a split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    /// The new document.
    pub document: AssembledDocument,

    /// The normalized pages that were extracted, ascending.
    pub pages: PageSet,
}

/// Orchestrates merge, analyze and split requests.
///
/// The service is `Send + Sync`; share it between request handlers through
/// an `Arc`.
#[derive(Debug)]
pub struct PdfService {
    cache: DocumentCache,
    engine: AssemblyEngine,
    validator: UploadValidator,
    config: ServiceConfig,
}

impl PdfService {
    /// Create a service with the cache described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache backend cannot be opened.
    pub fn new(config: ServiceConfig) -> Result<Self> {
        let cache = config.build_cache()?;
        Ok(Self::with_cache(config, cache))
    }

    /// Create a service over an existing cache.
    pub fn with_cache(config: ServiceConfig, cache: DocumentCache) -> Self {
        Self {
            cache,
            engine: AssemblyEngine::new(),
            validator: UploadValidator::from_config(&config),
            config,
        }
    }

    /// The service configuration.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// The upload cache.
    pub fn cache(&self) -> &DocumentCache {
        &self.cache
    }

    /// Merge every page of the uploads into one document, in upload order.
    ///
    /// # Errors
    ///
    /// - [`PdfSpliceError::InvalidInputCount`] with fewer than two uploads
    /// - [`PdfSpliceError::UnreadableDocument`] naming the first upload that
    ///   does not parse
    /// - boundary errors from upload validation
    pub fn merge(&self, uploads: Vec<Upload>) -> Result<AssembledDocument> {
        if uploads.len() < MIN_MERGE_INPUTS {
            return Err(PdfSpliceError::InvalidInputCount {
                count: uploads.len(),
            });
        }

        let sources = uploads
            .into_iter()
            .enumerate()
            .map(|(position, upload)| self.open(upload, position))
            .collect::<Result<Vec<_>>>()?;

        let all = PageSelection::All;
        let plan: Vec<AssemblySource<'_>> = sources
            .iter()
            .map(|source| AssemblySource::new(source, &all))
            .collect();

        self.engine.assemble(&plan)
    }

    /// Count the pages of an upload and cache it for a later split.
    ///
    /// # Errors
    ///
    /// Returns [`PdfSpliceError::UnreadableDocument`] if the upload does not
    /// parse, a boundary error from upload validation, or a cache error.
    pub fn analyze(&self, upload: Upload) -> Result<Analysis> {
        let name = upload.name.clone();
        let source = self.open(upload, 0)?;
        let page_count = source.page_count();

        let bytes = source.into_bytes();
        let key = match name.as_deref() {
            Some(name) => self.cache.put_named(name, bytes)?,
            None => self.cache.put(bytes)?,
        };

        Ok(Analysis { page_count, key })
    }

    /// Extract pages from a cached upload, consuming the cache entry.
    ///
    /// The entry is removed before the pages are checked; a failed split
    /// requires a new `analyze`.
    ///
    /// # Errors
    ///
    /// - [`PdfSpliceError::CacheKeyNotFound`] if the key is unknown, expired
    ///   or already used
    /// - [`PdfSpliceError::InvalidPageSelection`] if no page is selected or
    ///   any page is outside the document
    pub fn split(&self, key: &str, pages: PageRequest) -> Result<Extraction> {
        let bytes = self.cache.get_and_remove(key)?;
        let source = SourceDocument::from_bytes(key, bytes)?;

        let pages = pages.into_page_set(source.page_count())?;
        if pages.is_empty() {
            return Err(PdfSpliceError::invalid_pages(Vec::new(), source.page_count()));
        }

        let selection = PageSelection::from(pages.clone());
        let document = self
            .engine
            .assemble(&[AssemblySource::new(&source, &selection)])?;

        Ok(Extraction { document, pages })
    }

    /// Remove a cached upload. Returns whether one was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache storage fails.
    pub fn cleanup(&self, key: &str) -> Result<bool> {
        self.cache.delete(key)
    }

    /// Evict uploads older than the configured TTL.
    ///
    /// Returns the number of evicted entries; zero when no TTL is set.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache storage fails.
    pub fn evict_expired(&self) -> Result<usize> {
        match self.config.cache_ttl {
            Some(ttl) => self.cache.evict_older_than(ttl),
            None => Ok(0),
        }
    }

    /// Drop every cached upload.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache storage fails.
    pub fn shutdown(&self) -> Result<usize> {
        self.cache.clear()
    }

    fn open(&self, upload: Upload, position: usize) -> Result<SourceDocument> {
        self.validator.validate_at(&upload, position)?;
        SourceDocument::from_upload(upload, position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{Document, Object, Stream, dictionary};

    fn pdf_bytes(pages: usize) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let kids: Vec<Object> = (1..=pages)
            .map(|page| {
                let content = format!("BT ({page}) Tj ET");
                let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
                doc.add_object(dictionary! {
                    "Type" => "Page",
                    "Parent" => pages_id,
                    "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                    "Contents" => content_id,
                })
                .into()
            })
            .collect();

        doc.objects.insert(
            pages_id,
            dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => pages as i64,
            }
            .into(),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        buffer
    }

    fn service() -> PdfService {
        PdfService::new(ServiceConfig::default()).unwrap()
    }

    #[test]
    fn test_merge_requires_two_uploads() {
        let err = service()
            .merge(vec![Upload::named("a.pdf", pdf_bytes(1))])
            .unwrap_err();
        assert!(matches!(err, PdfSpliceError::InvalidInputCount { count: 1 }));
    }

    #[test]
    fn test_merge_names_unreadable_upload() {
        let err = service()
            .merge(vec![
                Upload::named("a.pdf", pdf_bytes(1)),
                Upload::named("b.pdf", b"%PDF-1.4 but not really".to_vec()),
            ])
            .unwrap_err();
        assert!(matches!(
            err,
            PdfSpliceError::UnreadableDocument { ref label, .. } if label == "b.pdf"
        ));
    }

    #[test]
    fn test_merge_counts_pages() {
        let merged = service()
            .merge(vec![Upload::new(pdf_bytes(2)), Upload::new(pdf_bytes(3))])
            .unwrap();
        assert_eq!(merged.page_count, 5);
    }

    #[test]
    fn test_analyze_caches_upload() {
        let service = service();
        let analysis = service
            .analyze(Upload::named("report.pdf", pdf_bytes(4)))
            .unwrap();

        assert_eq!(analysis.page_count, 4);
        assert!(analysis.key.as_str().ends_with("_report.pdf"));
        assert_eq!(service.cache().len().unwrap(), 1);
    }

    #[test]
    fn test_analyze_unreadable_is_not_cached() {
        let service = service();
        assert!(service.analyze(Upload::new(b"garbage".to_vec())).is_err());
        assert!(service.cache().is_empty().unwrap());
    }

    #[test]
    fn test_split_is_single_use() {
        let service = service();
        let analysis = service.analyze(Upload::new(pdf_bytes(3))).unwrap();

        let extraction = service
            .split(analysis.key.as_str(), PageRequest::spec("3,1"))
            .unwrap();
        assert_eq!(extraction.document.page_count, 2);
        assert_eq!(extraction.pages.as_slice(), &[1, 3]);

        let err = service
            .split(analysis.key.as_str(), PageRequest::spec("1"))
            .unwrap_err();
        assert!(matches!(err, PdfSpliceError::CacheKeyNotFound { .. }));
    }

    #[test]
    fn test_split_out_of_range_consumes_entry() {
        let service = service();
        let analysis = service.analyze(Upload::new(pdf_bytes(5))).unwrap();

        let err = service
            .split(analysis.key.as_str(), PageRequest::spec("1,10"))
            .unwrap_err();
        assert!(matches!(
            err,
            PdfSpliceError::InvalidPageSelection { ref invalid, page_count: 5, .. } if invalid == &[10]
        ));
        assert!(service.cache().is_empty().unwrap());
    }

    #[test]
    fn test_split_huge_range_is_rejected_quickly() {
        let service = service();
        let analysis = service.analyze(Upload::new(pdf_bytes(1))).unwrap();

        let started = std::time::Instant::now();
        let err = service
            .split(analysis.key.as_str(), PageRequest::spec("1-4000000000"))
            .unwrap_err();

        assert!(started.elapsed() < std::time::Duration::from_secs(1));
        match &err {
            PdfSpliceError::InvalidPageSelection {
                invalid,
                omitted,
                page_count: 1,
            } => {
                assert_eq!(invalid.first(), Some(&2));
                assert_eq!(invalid.len(), crate::pages::MAX_REPORTED_PAGES);
                assert_eq!(*omitted, 4_000_000_000 - 1 - invalid.len() as u64);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().len() < 200);
    }

    #[test]
    fn test_split_empty_selection() {
        let service = service();
        let analysis = service.analyze(Upload::new(pdf_bytes(2))).unwrap();

        let err = service
            .split(analysis.key.as_str(), PageRequest::spec("abc, 5-2"))
            .unwrap_err();
        assert!(matches!(
            err,
            PdfSpliceError::InvalidPageSelection { ref invalid, .. } if invalid.is_empty()
        ));
    }

    #[test]
    fn test_split_with_explicit_pages() {
        let service = service();
        let analysis = service.analyze(Upload::new(pdf_bytes(4))).unwrap();

        let extraction = service
            .split(analysis.key.as_str(), PageRequest::Pages(vec![4, 2, 2]))
            .unwrap();
        assert_eq!(extraction.pages.as_slice(), &[2, 4]);
        assert_eq!(extraction.document.page_count, 2);
    }

    #[test]
    fn test_cleanup_and_shutdown() {
        let service = service();
        let first = service.analyze(Upload::new(pdf_bytes(1))).unwrap();
        service.analyze(Upload::new(pdf_bytes(1))).unwrap();

        assert!(service.cleanup(first.key.as_str()).unwrap());
        assert!(!service.cleanup(first.key.as_str()).unwrap());
        assert_eq!(service.shutdown().unwrap(), 1);
    }

    #[test]
    fn test_evict_expired_without_ttl_keeps_entries() {
        let service = service();
        service.analyze(Upload::new(pdf_bytes(1))).unwrap();
        assert_eq!(service.evict_expired().unwrap(), 0);
        assert_eq!(service.cache().len().unwrap(), 1);
    }

    #[test]
    fn test_analysis_serializes_camel_case() {
        let analysis = Analysis {
            page_count: 3,
            key: CacheKey::from("k"),
        };
        let json = serde_json::to_value(&analysis).unwrap();
        assert_eq!(json, serde_json::json!({"pageCount": 3, "key": "k"}));
    }

    #[test]
    fn test_service_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PdfService>();
    }
}
