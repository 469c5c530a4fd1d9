//! # pdfsplice
//!
//! Merge PDF documents, or extract a selection of pages from one, by copying
//! pages between documents without decoding their content.
//!
//! ## Features
//!
//! - **Page range parsing**: `"1,3,5-8"` style selections, lenient or strict
//! - **Page-level assembly**: pages copied with their resources, in any order
//! - **Analyze, then split**: uploads cached under single-use keys
//! - **Pluggable cache storage**: in memory or in a directory
//! - **JSON protocol**: merge/analyze/split/cleanup requests with base64 payloads
//!
//! ## Quick Start
//!
//! ```no_run
//! use pdfsplice::config::ServiceConfig;
//! use pdfsplice::service::{PageRequest, PdfService, Upload};
//!
//! # fn example(a: Vec<u8>, b: Vec<u8>) -> pdfsplice::Result<()> {
//! let service = PdfService::new(ServiceConfig::default())?;
//!
//! let merged = service.merge(vec![Upload::named("a.pdf", a.clone()), Upload::named("b.pdf", b)])?;
//! println!("merged {} pages", merged.page_count);
//!
//! let analysis = service.analyze(Upload::named("a.pdf", a))?;
//! let extraction = service.split(analysis.key.as_str(), PageRequest::spec("1-2"))?;
//! println!("extracted pages {}", extraction.pages);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`pages`]: page range parsing
//! - [`cache`]: single-use upload cache
//! - [`merge`]: page copying and document assembly
//! - [`service`]: merge, analyze and split orchestration
//! - [`protocol`] and [`serve`]: JSON request boundary
//! - [`io`], [`validation`], [`config`], [`output`], [`cli`]: CLI support

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod io;
pub mod merge;
pub mod output;
pub mod pages;
pub mod protocol;
pub mod serve;
pub mod service;
pub mod utils;
pub mod validation;

pub use error::{PdfSpliceError, Result};

/// Version of the pdfsplice library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the pdfsplice library.
pub const NAME: &str = env!("CARGO_PKG_NAME");
