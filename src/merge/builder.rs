//! Page-level copying between documents.
//!
//! [`DocumentBuilder`] owns the document under construction. Pages are
//! appended one at a time from any number of source documents; every object
//! a page references is deep-copied under a fresh object id, so sources never
//! collide and are never modified.
//!
//! Content streams are copied as-is: the stream dictionary is remapped, the
//! encoded bytes are not touched.

use lopdf::{Dictionary, Document, Object, ObjectId, dictionary};
use std::collections::HashMap;

use crate::error::{PdfSpliceError, Result};

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE_ATTRIBUTES: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Guards against cyclic `Parent` chains in malformed files.
const MAX_TREE_DEPTH: usize = 64;

/// A document pages can be copied out of.
///
/// The assembly engine only talks to sources through this interface; it
/// never looks at page content.
pub trait PageSource {
    /// Name used in error messages.
    fn label(&self) -> &str;

    /// PDF version of the source, e.g. `"1.7"`.
    fn version(&self) -> &str;

    /// Number of pages in the source.
    fn page_count(&self) -> usize;

    /// Append a copy of the 1-based `page` to `builder`.
    fn copy_page_to(&self, page: u32, builder: &mut DocumentBuilder) -> Result<()>;
}

/// A new PDF document assembled page by page.
pub struct DocumentBuilder {
    document: Document,
    pages_id: ObjectId,
    kids: Vec<ObjectId>,
    /// Source object id to copied object id, for the current source.
    copied: HashMap<ObjectId, ObjectId>,
}

impl DocumentBuilder {
    /// Create an empty builder producing a document of the given PDF version.
    pub fn new(version: &str) -> Self {
        let mut document = Document::with_version(version);
        let pages_id = document.new_object_id();

        Self {
            document,
            pages_id,
            kids: Vec::new(),
            copied: HashMap::new(),
        }
    }

    /// Start copying from another source document.
    ///
    /// Objects shared between pages of one source are copied once; object
    /// ids of different sources are unrelated, so the id map is reset here.
    pub fn begin_source(&mut self) {
        self.copied.clear();
    }

    /// Number of pages appended so far.
    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    /// Append a copy of the page `page_id` of `source`.
    ///
    /// # Errors
    ///
    /// Returns [`PdfSpliceError::UnreadableDocument`] if `page_id` does not
    /// resolve to a page dictionary.
    pub fn append_page(&mut self, source: &Document, page_id: ObjectId) -> Result<()> {
        let page = source
            .get_object(page_id)
            .and_then(Object::as_dict)
            .map_err(|err| {
                PdfSpliceError::unreadable("document", format!("page {page_id:?}: {err}"))
            })?;

        let mut flattened = page.clone();
        flattened.remove(b"Parent");
        for key in INHERITABLE_ATTRIBUTES {
            if !flattened.has(key)
                && let Some(value) = inherited_attribute(source, page, key)
            {
                flattened.set(key.to_vec(), value.clone());
            }
        }

        // Reserve the id first so annotations pointing back at their page
        // resolve to the copy.
        let new_page_id = self.document.new_object_id();
        self.copied.entry(page_id).or_insert(new_page_id);

        let mut copy = self.copy_dictionary(source, &flattened);
        copy.set("Parent", Object::Reference(self.pages_id));

        self.document
            .objects
            .insert(new_page_id, Object::Dictionary(copy));
        self.kids.push(new_page_id);

        Ok(())
    }

    /// Finish the page tree and serialize the document.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn finish(mut self) -> Result<Vec<u8>> {
        let kids: Vec<Object> = self.kids.iter().map(|&id| Object::Reference(id)).collect();
        let count = self.kids.len() as i64;

        self.document.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );

        let catalog_id = self.document.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.document.trailer.set("Root", catalog_id);

        let mut buffer = Vec::new();
        self.document
            .save_to(&mut buffer)
            .map_err(|err| PdfSpliceError::other(format!("Failed to write PDF: {err}")))?;

        Ok(buffer)
    }

    fn copy_object(&mut self, source: &Document, object: &Object) -> Object {
        match object {
            Object::Reference(id) => self.copy_reference(source, *id),
            Object::Dictionary(dict) => Object::Dictionary(self.copy_dictionary(source, dict)),
            Object::Array(items) => Object::Array(
                items
                    .iter()
                    .map(|item| self.copy_object(source, item))
                    .collect(),
            ),
            Object::Stream(stream) => {
                let mut stream = stream.clone();
                stream.dict = self.copy_dictionary(source, &stream.dict);
                Object::Stream(stream)
            }
            other => other.clone(),
        }
    }

    fn copy_dictionary(&mut self, source: &Document, dict: &Dictionary) -> Dictionary {
        let mut copy = Dictionary::new();
        for (key, value) in dict.iter() {
            copy.set(key.clone(), self.copy_object(source, value));
        }
        copy
    }

    fn copy_reference(&mut self, source: &Document, id: ObjectId) -> Object {
        if let Some(&copied) = self.copied.get(&id) {
            return Object::Reference(copied);
        }

        // Dangling references read as null.
        let Ok(target) = source.get_object(id) else {
            return Object::Null;
        };

        // Pages that are not part of the output, and the source page tree
        // itself, stay behind.
        if is_page_tree_node(target) {
            return Object::Null;
        }

        let new_id = self.document.new_object_id();
        self.copied.insert(id, new_id);

        let copy = self.copy_object(source, target);
        self.document.objects.insert(new_id, copy);

        Object::Reference(new_id)
    }
}

fn is_page_tree_node(object: &Object) -> bool {
    let Ok(dict) = object.as_dict() else {
        return false;
    };

    matches!(
        dict.get(b"Type").and_then(Object::as_name),
        Ok(b"Page") | Ok(b"Pages")
    )
}

fn inherited_attribute<'a>(
    source: &'a Document,
    page: &'a Dictionary,
    key: &[u8],
) -> Option<&'a Object> {
    let mut node = page;

    for _ in 0..MAX_TREE_DEPTH {
        let parent_id = node.get(b"Parent").and_then(Object::as_reference).ok()?;
        node = source
            .get_object(parent_id)
            .and_then(Object::as_dict)
            .ok()?;

        if let Ok(value) = node.get(key) {
            return Some(value);
        }
    }

    None
}
