use crate::error::{FolioError, Result};
use lopdf::{Document, Object, ObjectId};
use std::path::{Path, PathBuf};

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Guards against cyclic `Parent` chains in malformed files.
const MAX_TREE_DEPTH: usize = 64;

pub struct PdfDocument {
    pub doc: Document,
    pub path: PathBuf,
}

impl PdfDocument {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(FolioError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let doc = Document::load(path).map_err(|e| FolioError::pdf(path, e))?;
        Ok(PdfDocument {
            doc,
            path: path.to_path_buf(),
        })
    }

    pub fn page_count(&self) -> u32 {
        self.doc.get_pages().len() as u32
    }

    /// Page object IDs in page order; position `i` is page index `i`.
    pub fn page_ids(&self) -> Vec<ObjectId> {
        // get_pages is keyed by 1-based page number, so values come out in order
        self.doc.get_pages().into_values().collect()
    }

    /// Build a new document holding exactly `page_ids`, in the given order.
    ///
    /// The source document is left untouched. Objects only reachable from
    /// dropped pages are pruned from the copy.
    pub fn extract_pages(&self, page_ids: &[ObjectId]) -> Result<Document> {
        let mut new_doc = self.doc.clone();
        set_page_tree(&mut new_doc, page_ids)?;

        // Outlines point at pages that may no longer exist and would keep
        // them alive through pruning.
        new_doc.catalog_mut()?.remove(b"Outlines");
        new_doc.prune_objects();

        Ok(new_doc)
    }
}

/// Root `Pages` node of a document.
pub fn pages_root(doc: &Document) -> Result<ObjectId> {
    Ok(doc.catalog()?.get(b"Pages")?.as_reference()?)
}

/// Copy attributes the page inherits from its ancestors onto the page itself,
/// so it can be re-parented without changing how it renders.
pub fn materialize_inherited(doc: &mut Document, page_id: ObjectId) -> Result<()> {
    let mut inherited = Vec::new();
    {
        let page = doc.get_dictionary(page_id)?;
        let mut missing: Vec<&[u8]> = INHERITABLE
            .iter()
            .copied()
            .filter(|key| !page.has(*key))
            .collect();
        let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
        let mut depth = 0;

        while let Some(node_id) = parent {
            if missing.is_empty() || depth >= MAX_TREE_DEPTH {
                break;
            }
            let node = doc.get_dictionary(node_id)?;
            missing.retain(|key| match node.get(*key) {
                Ok(value) => {
                    inherited.push((key.to_vec(), value.clone()));
                    false
                }
                Err(_) => true,
            });
            parent = node.get(b"Parent").and_then(Object::as_reference).ok();
            depth += 1;
        }
    }

    let page = doc.get_dictionary_mut(page_id)?;
    for (key, value) in inherited {
        page.set(key, value);
    }
    Ok(())
}

/// Replace the document's page tree with a flat one holding `page_ids`.
pub fn set_page_tree(doc: &mut Document, page_ids: &[ObjectId]) -> Result<()> {
    let pages_id = pages_root(doc)?;

    for &page_id in page_ids {
        materialize_inherited(doc, page_id)?;
        doc.get_dictionary_mut(page_id)?
            .set("Parent", Object::Reference(pages_id));
    }

    let pages = doc.get_dictionary_mut(pages_id)?;
    let kids: Vec<Object> = page_ids.iter().map(|&id| Object::Reference(id)).collect();
    pages.set("Kids", Object::Array(kids));
    pages.set("Count", Object::Integer(page_ids.len() as i64));
    Ok(())
}
