//! Assembly of new documents from page selections.
//!
//! The engine takes an ordered list of sources, each with a selection of
//! pages, and produces one document holding exactly those pages in exactly
//! that order. Every selection is validated before the first page is copied,
//! so an assembly either succeeds as a whole or produces nothing.

use std::collections::BTreeSet;

use crate::error::{PdfSpliceError, Result};
use crate::merge::builder::{DocumentBuilder, PageSource};
use crate::pages::{PageSet, page_in_range};

/// PDF version used when no source declares a usable one.
const DEFAULT_VERSION: &str = "1.7";

/// Which pages of a source to copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageSelection {
    /// Every page, in page order.
    All,
    /// The listed 1-based pages, in the listed order.
    Pages(Vec<i64>),
}

impl From<PageSet> for PageSelection {
    fn from(set: PageSet) -> Self {
        Self::Pages(set.as_slice().to_vec())
    }
}

/// One source of an assembly and the pages to take from it.
#[derive(Clone, Copy)]
pub struct AssemblySource<'a> {
    /// Document to copy from.
    pub source: &'a dyn PageSource,
    /// Pages to copy.
    pub selection: &'a PageSelection,
}

impl<'a> AssemblySource<'a> {
    /// Pair a source with a selection.
    pub fn new(source: &'a dyn PageSource, selection: &'a PageSelection) -> Self {
        Self { source, selection }
    }
}

/// A newly assembled PDF.
#[derive(Clone, PartialEq, Eq)]
pub struct AssembledDocument {
    /// Serialized document.
    pub bytes: Vec<u8>,

    /// Number of pages in the document.
    pub page_count: usize,
}

impl std::fmt::Debug for AssembledDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssembledDocument")
            .field("bytes", &self.bytes.len())
            .field("page_count", &self.page_count)
            .finish()
    }
}

/// Builds documents by copying pages out of sources.
#[derive(Debug, Clone, Default)]
pub struct AssemblyEngine;

impl AssemblyEngine {
    /// Create a new assembly engine.
    pub fn new() -> Self {
        Self
    }

    /// Assemble a document from the given sources.
    ///
    /// Sources are concatenated in list order; within a source, pages are
    /// copied in selection order (the engine does not sort).
    ///
    /// # Errors
    ///
    /// Returns [`PdfSpliceError::InvalidPageSelection`] if any explicit page
    /// falls outside its source, or if the assembly would contain no page.
    /// Returns [`PdfSpliceError::UnreadableDocument`] if a page cannot be
    /// copied.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use pdfsplice::io::SourceDocument;
    /// # use pdfsplice::merge::{AssemblyEngine, AssemblySource, PageSelection};
    /// # fn example(a: SourceDocument, b: SourceDocument) -> pdfsplice::Result<()> {
    /// let all = PageSelection::All;
    /// let first_two = PageSelection::Pages(vec![1, 2]);
    /// let assembled = AssemblyEngine::new().assemble(&[
    ///     AssemblySource::new(&a, &first_two),
    ///     AssemblySource::new(&b, &all),
    /// ])?;
    /// println!("{} pages", assembled.page_count);
    /// # Ok(())
    /// # }
    /// ```
    pub fn assemble(&self, sources: &[AssemblySource<'_>]) -> Result<AssembledDocument> {
        let plan = Self::plan(sources)?;

        let mut builder = DocumentBuilder::new(&Self::output_version(sources));
        for (source, pages) in sources.iter().zip(&plan) {
            builder.begin_source();
            for &page in pages {
                source.source.copy_page_to(page, &mut builder)?;
            }
        }

        let page_count = builder.page_count();
        let bytes = builder.finish()?;

        Ok(AssembledDocument { bytes, page_count })
    }

    /// Resolve and validate every selection before anything is copied.
    fn plan(sources: &[AssemblySource<'_>]) -> Result<Vec<Vec<u32>>> {
        let mut plan = Vec::with_capacity(sources.len());

        for entry in sources {
            let page_count = entry.source.page_count();

            let pages = match entry.selection {
                PageSelection::All => (1..=page_count)
                    .map(|page| u32::try_from(page).map_err(|_| too_many_pages(entry)))
                    .collect::<Result<Vec<_>>>()?,
                PageSelection::Pages(pages) => {
                    let invalid: BTreeSet<i64> = pages
                        .iter()
                        .copied()
                        .filter(|&page| !page_in_range(page, page_count))
                        .collect();

                    if !invalid.is_empty() {
                        return Err(PdfSpliceError::invalid_pages(
                            invalid.into_iter().collect(),
                            page_count,
                        ));
                    }

                    pages
                        .iter()
                        .map(|&page| u32::try_from(page).map_err(|_| too_many_pages(entry)))
                        .collect::<Result<Vec<_>>>()?
                }
            };

            plan.push(pages);
        }

        if plan.iter().all(Vec::is_empty) {
            let page_count = sources.first().map_or(0, |entry| entry.source.page_count());
            return Err(PdfSpliceError::invalid_pages(Vec::new(), page_count));
        }

        Ok(plan)
    }

    /// Highest declared version among the sources.
    fn output_version(sources: &[AssemblySource<'_>]) -> String {
        sources
            .iter()
            .map(|entry| entry.source.version())
            .filter_map(|version| {
                let (major, minor) = version.trim().split_once('.')?;
                Some((major.parse::<u8>().ok()?, minor.parse::<u8>().ok()?))
            })
            .max()
            .map(|(major, minor)| format!("{major}.{minor}"))
            .unwrap_or_else(|| DEFAULT_VERSION.to_string())
    }
}

fn too_many_pages(entry: &AssemblySource<'_>) -> PdfSpliceError {
    PdfSpliceError::unreadable(entry.source.label(), "page count exceeds supported range")
}
