//! Integration tests for reading inputs from and writing outputs to disk.

use pdfsplice::PdfSpliceError;
use pdfsplice::config::ServiceConfig;
use pdfsplice::io::{PdfReader, PdfWriter};
use pdfsplice::service::PdfService;
use pdfsplice::utils::collect_paths_for_patterns;

use crate::common::{page_content, page_contents, tagged_pdf, write_fixture};

#[tokio::test]
async fn test_merge_files_matched_by_glob() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path(), "02.pdf", &tagged_pdf("B", 1));
    write_fixture(dir.path(), "01.pdf", &tagged_pdf("A", 2));

    let pattern = format!("{}/*.pdf", dir.path().display());
    let paths = collect_paths_for_patterns(&[pattern]).unwrap();
    assert_eq!(paths.len(), 2);

    let uploads = PdfReader::new().read_all(&paths, 2).await.unwrap();
    let merged = PdfService::new(ServiceConfig::default())
        .unwrap()
        .merge(uploads)
        .unwrap();

    let output = dir.path().join("merged.pdf");
    let stats = PdfWriter::new().save(merged.bytes, &output).await.unwrap();
    assert_eq!(stats.output_path, output);
    assert!(stats.file_size > 0);

    let written = std::fs::read(&output).unwrap();
    assert_eq!(
        page_contents(&written),
        vec![page_content("A", 1), page_content("A", 2), page_content("B", 1)]
    );
}

#[tokio::test]
async fn test_missing_input_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.pdf");

    let err = PdfReader::new().read(&missing).await.unwrap_err();
    assert!(matches!(err, PdfSpliceError::FileNotAccessible { ref path, .. } if path == &missing));
    assert_eq!(err.exit_code(), 2);
}
