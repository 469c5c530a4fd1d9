//! Integration tests for concurrent use of one service.

use pdfsplice::PdfSpliceError;
use pdfsplice::cache::{DirectoryStore, DocumentCache};
use pdfsplice::config::ServiceConfig;
use pdfsplice::service::{PageRequest, PdfService, Upload};
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use crate::common::tagged_pdf;

const WORKERS: usize = 12;

fn memory_service() -> Arc<PdfService> {
    Arc::new(PdfService::new(ServiceConfig::default()).unwrap())
}

fn directory_service(dir: &tempfile::TempDir) -> Arc<PdfService> {
    let cache = DocumentCache::new(DirectoryStore::open(dir.path()).unwrap());
    Arc::new(PdfService::with_cache(ServiceConfig::default(), cache))
}

fn analyze_in_parallel(service: &Arc<PdfService>) -> Vec<String> {
    let handles: Vec<_> = (0..WORKERS)
        .map(|_| {
            let service = Arc::clone(service);
            thread::spawn(move || {
                service
                    .analyze(Upload::named("same.pdf", tagged_pdf("S", 2)))
                    .unwrap()
                    .key
                    .to_string()
            })
        })
        .collect();

    handles.into_iter().map(|h| h.join().unwrap()).collect()
}

fn race_splits(service: &Arc<PdfService>, key: &str) -> (usize, usize) {
    let handles: Vec<_> = (0..WORKERS)
        .map(|_| {
            let service = Arc::clone(service);
            let key = key.to_string();
            thread::spawn(move || service.split(&key, PageRequest::spec("1")))
        })
        .collect();

    let mut wins = 0;
    let mut misses = 0;
    for handle in handles {
        match handle.join().unwrap() {
            Ok(_) => wins += 1,
            Err(PdfSpliceError::CacheKeyNotFound { .. }) => misses += 1,
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
    (wins, misses)
}

#[test]
fn test_parallel_analyze_yields_distinct_keys_in_memory() {
    let service = memory_service();
    let keys = analyze_in_parallel(&service);

    let unique: HashSet<_> = keys.iter().collect();
    assert_eq!(unique.len(), WORKERS);
    assert_eq!(service.cache().len().unwrap(), WORKERS);
}

#[test]
fn test_parallel_analyze_yields_distinct_keys_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let service = directory_service(&dir);
    let keys = analyze_in_parallel(&service);

    let unique: HashSet<_> = keys.iter().collect();
    assert_eq!(unique.len(), WORKERS);
    assert_eq!(service.cache().len().unwrap(), WORKERS);
}

#[test]
fn test_one_split_wins_in_memory() {
    let service = memory_service();
    let key = service.analyze(Upload::new(tagged_pdf("R", 3))).unwrap().key;

    assert_eq!(race_splits(&service, key.as_str()), (1, WORKERS - 1));
}

#[test]
fn test_one_split_wins_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let service = directory_service(&dir);
    let key = service.analyze(Upload::new(tagged_pdf("R", 3))).unwrap().key;

    assert_eq!(race_splits(&service, key.as_str()), (1, WORKERS - 1));
    assert!(service.cache().is_empty().unwrap());
}

#[test]
fn test_parallel_merges_are_independent() {
    let service = memory_service();

    let handles: Vec<_> = (1..=6)
        .map(|n| {
            let service = Arc::clone(&service);
            thread::spawn(move || {
                service
                    .merge(vec![
                        Upload::new(tagged_pdf("A", n)),
                        Upload::new(tagged_pdf("B", 1)),
                    ])
                    .unwrap()
                    .page_count
            })
        })
        .collect();

    let counts: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(counts, vec![2, 3, 4, 5, 6, 7]);
}
