//! Shared fixtures for the integration tests.
//!
//! Fixtures are generated with lopdf instead of checked in: every page draws
//! its own label, so tests can tell exactly which pages ended up where.

#![allow(dead_code)]

use lopdf::{Document, Object, Stream, dictionary};
use std::path::{Path, PathBuf};

/// Build a PDF whose pages draw `"<tag> <n>"`.
///
/// Fonts and the media box live on the page tree node, so copied pages only
/// render correctly if inherited attributes travel with them.
pub fn tagged_pdf(tag: &str, pages: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let kids: Vec<Object> = (1..=pages)
        .map(|page| {
            let content = page_content(tag, page);
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
            doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
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
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
        }
        .into(),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("Failed to serialize fixture");
    bytes
}

/// Content stream of page `page` of a [`tagged_pdf`] fixture.
pub fn page_content(tag: &str, page: usize) -> String {
    format!("BT /F1 24 Tf 72 700 Td ({tag} {page}) Tj ET")
}

/// Decoded content of every page, in page order.
pub fn page_contents(bytes: &[u8]) -> Vec<String> {
    let doc = Document::load_mem(bytes).expect("Output is not a PDF");
    doc.get_pages()
        .into_values()
        .map(|id| {
            let content = doc.get_page_content(id).expect("Page has no content");
            String::from_utf8(content).expect("Content is not UTF-8")
        })
        .collect()
}

/// Whether every page carries its own `Resources` and `MediaBox`.
pub fn every_page_is_self_contained(bytes: &[u8]) -> bool {
    let doc = Document::load_mem(bytes).expect("Output is not a PDF");
    doc.get_pages().into_values().all(|id| {
        doc.get_dictionary(id)
            .map(|page| page.has(b"Resources") && page.has(b"MediaBox"))
            .unwrap_or(false)
    })
}

/// Write a fixture into `dir` and return its path.
pub fn write_fixture(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).expect("Failed to write fixture");
    path
}
