//! Integration tests for merge, analyze and split through the service.

use pdfsplice::PdfSpliceError;
use pdfsplice::config::{CacheBackend, ServiceConfig};
use pdfsplice::service::{PageRequest, PdfService, Upload};
use rstest::rstest;

use crate::common::{every_page_is_self_contained, page_content, page_contents, tagged_pdf};

fn service() -> PdfService {
    PdfService::new(ServiceConfig::default()).unwrap()
}

#[test]
fn test_merge_keeps_every_page_in_order() {
    let merged = service()
        .merge(vec![
            Upload::named("a.pdf", tagged_pdf("A", 2)),
            Upload::named("b.pdf", tagged_pdf("B", 3)),
        ])
        .unwrap();

    assert_eq!(merged.page_count, 5);
    assert_eq!(
        page_contents(&merged.bytes),
        vec![
            page_content("A", 1),
            page_content("A", 2),
            page_content("B", 1),
            page_content("B", 2),
            page_content("B", 3),
        ]
    );
    assert!(every_page_is_self_contained(&merged.bytes));
}

#[test]
fn test_merge_same_document_twice() {
    let bytes = tagged_pdf("A", 1);
    let merged = service()
        .merge(vec![Upload::named("a.pdf", bytes.clone()), Upload::named("a.pdf", bytes)])
        .unwrap();

    assert_eq!(
        page_contents(&merged.bytes),
        vec![page_content("A", 1), page_content("A", 1)]
    );
}

#[test]
fn test_merge_rejects_non_pdf_name() {
    let err = service()
        .merge(vec![
            Upload::named("a.pdf", tagged_pdf("A", 1)),
            Upload::named("notes.txt", tagged_pdf("B", 1)),
        ])
        .unwrap_err();

    assert!(matches!(err, PdfSpliceError::InvalidFileName { ref name } if name == "notes.txt"));
    assert_eq!(err.status_code(), 400);
}

#[test]
fn test_analyze_then_split_extracts_requested_pages() {
    let service = service();
    let analysis = service
        .analyze(Upload::named("report.pdf", tagged_pdf("R", 5)))
        .unwrap();
    assert_eq!(analysis.page_count, 5);
    assert!(analysis.key.as_str().ends_with("_report.pdf"));

    let extraction = service
        .split(analysis.key.as_str(), PageRequest::spec("5, 1-2, 2"))
        .unwrap();

    assert_eq!(extraction.pages.as_slice(), &[1, 2, 5]);
    assert_eq!(extraction.document.page_count, 3);
    assert_eq!(
        page_contents(&extraction.document.bytes),
        vec![page_content("R", 1), page_content("R", 2), page_content("R", 5)]
    );
    assert!(every_page_is_self_contained(&extraction.document.bytes));
}

#[rstest]
#[case(1)]
#[case(4)]
#[case(9)]
fn test_split_full_range_keeps_every_page(#[case] pages: usize) {
    let service = service();
    let source = tagged_pdf("F", pages);
    let analysis = service.analyze(Upload::new(source.clone())).unwrap();

    let extraction = service
        .split(analysis.key.as_str(), PageRequest::spec(format!("1-{pages}")))
        .unwrap();

    assert_eq!(extraction.document.page_count, pages);
    assert_eq!(extraction.pages.len(), pages);
    assert_eq!(page_contents(&extraction.document.bytes), page_contents(&source));
    assert!(every_page_is_self_contained(&extraction.document.bytes));
}

#[test]
fn test_split_is_single_use() {
    let service = service();
    let analysis = service.analyze(Upload::new(tagged_pdf("R", 2))).unwrap();

    service
        .split(analysis.key.as_str(), PageRequest::spec("1"))
        .unwrap();
    let err = service
        .split(analysis.key.as_str(), PageRequest::spec("1"))
        .unwrap_err();

    assert!(matches!(err, PdfSpliceError::CacheKeyNotFound { .. }));
    assert_eq!(err.status_code(), 404);
}

#[test]
fn test_failed_split_consumes_entry() {
    let service = service();
    let analysis = service.analyze(Upload::new(tagged_pdf("R", 5))).unwrap();

    let err = service
        .split(analysis.key.as_str(), PageRequest::spec("1,10"))
        .unwrap_err();
    match &err {
        PdfSpliceError::InvalidPageSelection {
            invalid,
            page_count,
            ..
        } => {
            assert_eq!(invalid, &vec![10]);
            assert_eq!(*page_count, 5);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.status_code(), 400);
    assert!(err.to_string().contains("10"));

    let err = service
        .split(analysis.key.as_str(), PageRequest::spec("1"))
        .unwrap_err();
    assert!(matches!(err, PdfSpliceError::CacheKeyNotFound { .. }));
}

#[rstest]
#[case("")]
#[case("abc")]
#[case("3-1")]
#[case("0")]
fn test_split_without_valid_pages(#[case] pages: &str) {
    let service = service();
    let analysis = service.analyze(Upload::new(tagged_pdf("R", 3))).unwrap();

    let err = service
        .split(analysis.key.as_str(), PageRequest::spec(pages))
        .unwrap_err();
    assert!(matches!(err, PdfSpliceError::InvalidPageSelection { .. }));
}

#[test]
fn test_cleanup_removes_cached_upload() {
    let service = service();
    let analysis = service.analyze(Upload::new(tagged_pdf("R", 1))).unwrap();

    assert!(service.cleanup(analysis.key.as_str()).unwrap());
    assert!(!service.cleanup(analysis.key.as_str()).unwrap());
    assert!(service.cache().is_empty().unwrap());
}

#[test]
fn test_directory_backed_service() {
    let dir = tempfile::tempdir().unwrap();
    let service = PdfService::new(ServiceConfig {
        cache_backend: CacheBackend::Directory(dir.path().join("uploads")),
        ..Default::default()
    })
    .unwrap();

    let analysis = service
        .analyze(Upload::named("scan.pdf", tagged_pdf("S", 4)))
        .unwrap();
    assert!(dir.path().join("uploads").join(analysis.key.as_str()).exists());

    let extraction = service
        .split(analysis.key.as_str(), PageRequest::Pages(vec![4, 3]))
        .unwrap();
    assert_eq!(
        page_contents(&extraction.document.bytes),
        vec![page_content("S", 3), page_content("S", 4)]
    );
    assert!(!dir.path().join("uploads").join(analysis.key.as_str()).exists());
}

#[test]
fn test_shutdown_drops_cached_uploads() {
    let service = service();
    service.analyze(Upload::new(tagged_pdf("A", 1))).unwrap();
    service.analyze(Upload::new(tagged_pdf("B", 1))).unwrap();

    assert_eq!(service.shutdown().unwrap(), 2);
    assert!(service.cache().is_empty().unwrap());
}
