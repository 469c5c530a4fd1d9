//! Page selection parsing.
//!
//! A page range expression is what a person types into a "pages to extract"
//! box: comma separated page numbers and inclusive ranges.
//!
//! - `"5"` - single page
//! - `"1-5"` - range of pages (inclusive)
//! - `"1,3,5"` - multiple individual pages
//! - `"1-5, 10-15"` - combination of ranges, whitespace is ignored
//!
//! Parsing yields a [`PageSet`]: ascending, duplicate free, 1-based page
//! numbers. The lenient parser skips tokens it cannot read instead of
//! failing; [`PageSet::strict_parse`] rejects the whole expression.
//! Neither checks page numbers against a document; that happens when a
//! selection is assembled.
//!
//! Both expand ranges in full. Untrusted input that already knows its
//! document goes through [`PageSet::parse_bounded`], which clips ranges to the
//! document before expanding them.

use std::collections::BTreeSet;
use std::fmt;

use crate::error::{PdfSpliceError, Result};

/// Most offending pages an invalid selection lists by number.
pub const MAX_REPORTED_PAGES: usize = 10;

/// Normalized set of 1-based page numbers in ascending order.
///
/// Values are plain integers: `0` can appear (it is syntactically a page
/// number) and is rejected downstream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageSet {
    pages: Vec<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Single(i64),
    Range(i64, i64),
}

impl Token {
    fn parse(token: &str) -> Option<Self> {
        match token.split_once('-') {
            Some((start, end)) => {
                let start = start.trim().parse::<u64>().ok()?;
                let end = end.trim().parse::<u64>().ok()?;
                let (start, end) = (i64::try_from(start).ok()?, i64::try_from(end).ok()?);
                (start <= end).then_some(Self::Range(start, end))
            }
            None => {
                let page = token.parse::<u64>().ok()?;
                i64::try_from(page).ok().map(Self::Single)
            }
        }
    }
}

impl PageSet {
    /// Parse a page range expression, skipping malformed tokens.
    ///
    /// # Examples
    ///
    /// ```
    /// use pdfsplice::pages::PageSet;
    ///
    /// let pages = PageSet::parse("1,3,5-8");
    /// assert_eq!(pages.as_slice(), &[1, 3, 5, 6, 7, 8]);
    ///
    /// let pages = PageSet::parse("2-1,4,abc");
    /// assert_eq!(pages.as_slice(), &[4]);
    /// ```
    pub fn parse(spec: &str) -> Self {
        let mut pages = BTreeSet::new();

        for token in spec.split(',').map(str::trim) {
            match Token::parse(token) {
                Some(Token::Single(page)) => {
                    pages.insert(page);
                }
                Some(Token::Range(start, end)) => pages.extend(start..=end),
                None => continue,
            }
        }

        Self {
            pages: pages.into_iter().collect(),
        }
    }

    /// Parse a page range expression, failing on the first malformed token.
    ///
    /// Empty tokens (`"1,,2"`, trailing commas) are malformed here. An
    /// entirely empty expression still yields an empty set.
    ///
    /// # Errors
    ///
    /// Returns [`PdfSpliceError::InvalidRequest`] naming the token that could
    /// not be read.
    pub fn strict_parse(spec: &str) -> Result<Self> {
        Self::check_strict(spec)?;
        Ok(Self::parse(spec))
    }

    /// Check that every token of a page range expression is well formed,
    /// without expanding anything.
    ///
    /// # Errors
    ///
    /// Same as [`PageSet::strict_parse`].
    pub fn check_strict(spec: &str) -> Result<()> {
        if spec.trim().is_empty() {
            return Ok(());
        }

        for token in spec.split(',').map(str::trim) {
            if Token::parse(token).is_none() {
                return Err(PdfSpliceError::invalid_request(format!(
                    "Invalid page token '{token}'. Expected a page number like '3' or a range like '1-5'"
                )));
            }
        }

        Ok(())
    }

    /// Parse a page range expression leniently for a `page_count` page
    /// document.
    ///
    /// Tokens are read as by [`PageSet::parse`], but every range is clipped
    /// to `[1, page_count]` before it is expanded; the parts outside are kept
    /// as spans. Work and memory are bounded by the page count and the
    /// length of the expression, never by the numbers in it.
    ///
    /// # Examples
    ///
    /// ```
    /// use pdfsplice::pages::PageSet;
    ///
    /// let pages = PageSet::parse_bounded("3, 1-2", 5).unwrap();
    /// assert_eq!(pages.as_slice(), &[1, 2, 3]);
    ///
    /// let err = PageSet::parse_bounded("1-4000000000", 2).unwrap_err();
    /// assert!(err.to_string().contains("3, 4, 5"));
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`PdfSpliceError::InvalidPageSelection`] if any selected page
    /// is outside the document. It lists the smallest offenders and counts
    /// the rest.
    pub fn parse_bounded(spec: &str, page_count: usize) -> Result<Self> {
        let last = i64::try_from(page_count).unwrap_or(i64::MAX);
        let mut pages = BTreeSet::new();
        let mut outside = Vec::new();

        for token in spec.split(',').map(str::trim).filter_map(Token::parse) {
            let (start, end) = match token {
                Token::Single(page) => (page, page),
                Token::Range(start, end) => (start, end),
            };

            if start < 1 {
                outside.push((start, end.min(0)));
            }
            if end > last {
                outside.push((start.max(last.saturating_add(1)), end));
            }

            let (first, final_page) = (start.max(1), end.min(last));
            if first <= final_page {
                pages.extend(first..=final_page);
            }
        }

        if !outside.is_empty() {
            let (invalid, omitted) = summarize_spans(outside);
            return Err(PdfSpliceError::InvalidPageSelection {
                invalid,
                omitted,
                page_count,
            });
        }

        Ok(Self {
            pages: pages.into_iter().collect(),
        })
    }

    /// Number of pages in the set.
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Whether the set selects no page at all.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Check if a page number is part of the set.
    pub fn contains(&self, page: i64) -> bool {
        self.pages.binary_search(&page).is_ok()
    }

    /// Iterate over the page numbers in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = i64> + '_ {
        self.pages.iter().copied()
    }

    /// The page numbers as an ascending slice.
    pub fn as_slice(&self) -> &[i64] {
        &self.pages
    }

    /// Page numbers that fall outside `[1, page_count]`.
    pub fn out_of_range(&self, page_count: usize) -> Vec<i64> {
        self.iter()
            .filter(|&page| !page_in_range(page, page_count))
            .collect()
    }
}

/// Merge inclusive spans, list their first [`MAX_REPORTED_PAGES`] pages and
/// count the rest.
fn summarize_spans(mut spans: Vec<(i64, i64)>) -> (Vec<i64>, u64) {
    spans.sort_unstable();

    let mut merged: Vec<(i64, i64)> = Vec::with_capacity(spans.len());
    for (start, end) in spans {
        match merged.last_mut() {
            Some((_, last_end)) if start <= last_end.saturating_add(1) => {
                *last_end = (*last_end).max(end);
            }
            _ => merged.push((start, end)),
        }
    }

    let mut listed = Vec::with_capacity(MAX_REPORTED_PAGES);
    let mut omitted: u64 = 0;
    for (start, end) in merged {
        let size = end.abs_diff(start).saturating_add(1);
        let room = (MAX_REPORTED_PAGES - listed.len()) as u64;
        let take = size.min(room);

        listed.extend((start..=end).take(take as usize));
        omitted = omitted.saturating_add(size - take);
    }

    (listed, omitted)
}

/// Whether `page` addresses an existing page of a `page_count` page document.
pub(crate) fn page_in_range(page: i64, page_count: usize) -> bool {
    page >= 1 && usize::try_from(page).is_ok_and(|page| page <= page_count)
}

impl FromIterator<i64> for PageSet {
    /// Normalize an explicit page list (sorted, deduplicated).
    fn from_iter<I: IntoIterator<Item = i64>>(iter: I) -> Self {
        let pages: BTreeSet<i64> = iter.into_iter().collect();
        Self {
            pages: pages.into_iter().collect(),
        }
    }
}

impl fmt::Display for PageSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, page) in self.pages.iter().enumerate() {
            if idx > 0 {
                f.write_str(",")?;
            }
            write!(f, "{page}")?;
        }
        Ok(())
    }
}
