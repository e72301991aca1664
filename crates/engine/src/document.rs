//! Document plumbing shared across the engine
//!
//! Thin helpers over the lopdf object graph: page lookup by zero-based
//! index, inherited page-tree attributes, and reference chasing.

use lopdf::{Document, Object, ObjectId};

/// Number of pages in the document.
pub fn page_count(doc: &Document) -> u32 {
    doc.get_pages().len() as u32
}

/// Resolve a zero-based page index to its page object id, or `None`
/// when the index does not resolve (out of range, or the page tree
/// shrank since the index was taken).
pub fn page_object_id(doc: &Document, page_index: u32) -> Option<ObjectId> {
    doc.get_pages().get(&(page_index + 1)).copied()
}

/// Whether the document can be mutated in place. Encrypted documents
/// are rejected wholesale rather than round-tripped through decryption.
pub fn is_editable(doc: &Document) -> bool {
    doc.trailer.get(b"Encrypt").is_err()
}

/// Follow a reference to its target object; non-references pass through.
pub fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        _ => Some(obj),
    }
}

/// Look up a page attribute, walking `/Parent` links for inheritable
/// entries (`MediaBox`, `CropBox`, `Rotate`, `Resources`).
pub fn inherited_page_attr<'a>(
    doc: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Option<&'a Object> {
    let mut current = page_id;
    // Bounded walk: malformed documents can cycle their parent links.
    for _ in 0..64 {
        let dict = doc.get_dictionary(current).ok()?;
        if let Ok(value) = dict.get(key) {
            return resolve(doc, value);
        }
        match dict.get(b"Parent") {
            Ok(Object::Reference(parent)) => current = *parent,
            _ => return None,
        }
    }
    None
}
