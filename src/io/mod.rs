//! PDF input and output.
//!
//! - [`reader`]: parsing uploaded bytes into a [`SourceDocument`] and loading
//!   files from disk
//! - [`writer`]: writing assembled documents to disk

pub mod reader;
pub mod writer;

pub use reader::{PdfReader, SourceDocument, Upload};
pub use writer::{PdfWriter, WriteStatistics};
