//! Document assembly.
//!
//! This module builds new PDF documents out of pages of existing ones:
//! - [`builder`]: page copying between `lopdf` documents
//! - [`engine`]: selection validation and ordered assembly
//!
//! Merging and extraction are the same operation here. A merge selects
//! every page of several sources, an extraction selects some pages of one.

pub mod builder;
pub mod engine;

pub use builder::{DocumentBuilder, PageSource};
pub use engine::{AssembledDocument, AssemblyEngine, AssemblySource, PageSelection};
