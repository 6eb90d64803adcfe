//! Building a new document out of pages copied from a source document.

use std::collections::HashSet;

use lopdf::{Dictionary, Document as LopdfDocument, Object, ObjectId};

use super::SourceDocument;
use crate::error::{Error, Result};

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Catalog entries carried into the output. Everything else (outlines, named
/// destinations, forms) can point at pages that are no longer present.
const KEPT_CATALOG_KEYS: [&[u8]; 5] = [
    b"Type",
    b"Pages",
    b"Lang",
    b"ViewerPreferences",
    b"PageLayout",
];

/// Guards against cyclic `/Parent` chains in damaged files.
const MAX_TREE_DEPTH: usize = 64;

/// What to do with page indices past the end of the source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PagePolicy {
    /// Fail the output with [`Error::PageOutOfRange`]
    #[default]
    Strict,
    /// Drop missing pages and keep the rest
    SkipMissing,
}

impl PagePolicy {
    /// Apply the policy to zero-based indices for a document of `page_count` pages.
    pub fn resolve(self, indices: &[usize], page_count: usize) -> Result<Vec<usize>> {
        match self {
            PagePolicy::Strict => {
                if let Some(&bad) = indices.iter().find(|&&i| i >= page_count) {
                    return Err(Error::PageOutOfRange {
                        page: bad + 1,
                        page_count,
                    });
                }
                Ok(indices.to_vec())
            }
            PagePolicy::SkipMissing => {
                let kept: Vec<usize> = indices
                    .iter()
                    .copied()
                    .filter(|&i| i < page_count)
                    .collect();
                if kept.len() != indices.len() {
                    log::warn!(
                        "skipped {} page(s) past the end of a {}-page document",
                        indices.len() - kept.len(),
                        page_count
                    );
                }
                Ok(kept)
            }
        }
    }
}

/// A newly assembled document, serialized once with [`OutputDocument::into_bytes`].
#[derive(Debug)]
pub struct OutputDocument {
    doc: LopdfDocument,
    page_count: usize,
}

impl OutputDocument {
    /// Number of pages in the output.
    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// Serialize to PDF bytes.
    pub fn into_bytes(mut self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        self.doc.save_to(&mut buffer)?;
        Ok(buffer)
    }
}

/// Copy the pages at `indices` (zero-based, in order, duplicates allowed)
/// into a new document.
///
/// Every index must be in range; apply a [`PagePolicy`] first to filter.
pub fn assemble(source: &SourceDocument, indices: &[usize]) -> Result<OutputDocument> {
    let page_count = source.page_count();
    let page_ids = indices
        .iter()
        .map(|&i| {
            source.page_id(i).ok_or(Error::PageOutOfRange {
                page: i + 1,
                page_count,
            })
        })
        .collect::<Result<Vec<ObjectId>>>()?;

    let mut doc = source.lopdf().clone();
    let root_id = doc.trailer.get(b"Root")?.as_reference()?;
    let pages_id = doc.get_dictionary(root_id)?.get(b"Pages")?.as_reference()?;

    // Flatten the tree: every copied page hangs directly off the root node,
    // carrying whatever it used to inherit from intermediate nodes.
    let mut kids = Vec::with_capacity(page_ids.len());
    let mut placed: HashSet<ObjectId> = HashSet::new();
    for page_id in page_ids {
        let mut page = doc.get_dictionary(page_id)?.clone();
        for (key, value) in inherited_attributes(&doc, page_id)? {
            page.set(key, value);
        }
        page.set("Parent", Object::Reference(pages_id));

        let id = if placed.insert(page_id) {
            doc.objects.insert(page_id, Object::Dictionary(page));
            page_id
        } else {
            doc.add_object(page)
        };
        kids.push(Object::Reference(id));
    }

    let count = kids.len();
    let pages = doc.get_object_mut(pages_id)?.as_dict_mut()?;
    pages.set("Kids", Object::Array(kids));
    pages.set("Count", Object::Integer(count as i64));
    pages.remove(b"Parent");

    let catalog = doc.get_dictionary(root_id)?;
    let trimmed: Dictionary = catalog
        .iter()
        .filter(|(key, _)| KEPT_CATALOG_KEYS.contains(&key.as_slice()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    doc.objects.insert(root_id, Object::Dictionary(trimmed));

    doc.prune_objects();

    Ok(OutputDocument {
        doc,
        page_count: count,
    })
}

/// Collect inheritable attributes a page does not define itself.
fn inherited_attributes(doc: &LopdfDocument, page_id: ObjectId) -> Result<Vec<(Vec<u8>, Object)>> {
    let page = doc.get_dictionary(page_id)?;
    let mut found: Vec<(Vec<u8>, Object)> = Vec::new();
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();

    for _ in 0..MAX_TREE_DEPTH {
        let Some(node_id) = parent else { break };
        let Ok(node) = doc.get_dictionary(node_id) else {
            break;
        };
        for key in INHERITABLE {
            if page.has(key) || found.iter().any(|(k, _)| k.as_slice() == key) {
                continue;
            }
            if let Ok(value) = node.get(key) {
                found.push((key.to_vec(), value.clone()));
            }
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }

    Ok(found)
}
