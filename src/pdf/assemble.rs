use super::document::materialize_inherited;
use super::source::PageSource;
use crate::error::Result;
use lopdf::{dictionary, Document, Object, ObjectId};
use tracing::debug;

/// Builds one output document by appending whole sources in call order.
pub struct Assembler {
    doc: Document,
    pages_id: ObjectId,
    page_ids: Vec<ObjectId>,
    sources: usize,
}

impl Assembler {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => Vec::<Object>::new(),
                "Count" => 0,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        Assembler {
            doc,
            pages_id,
            page_ids: Vec::new(),
            sources: 0,
        }
    }

    /// Append every page of `source`, in its own order, after the pages
    /// already collected. Returns the number of pages appended.
    pub fn append(&mut self, source: PageSource) -> Result<u32> {
        let origin = source.path().to_path_buf();
        let mut doc = source.into_pdf().doc;

        doc.renumber_objects_with(self.doc.max_id + 1);
        let incoming: Vec<ObjectId> = doc.get_pages().into_values().collect();
        for &page_id in &incoming {
            materialize_inherited(&mut doc, page_id)?;
        }

        self.doc.max_id = self.doc.max_id.max(doc.max_id);
        self.doc.objects.extend(doc.objects);

        // The source's own catalog and page tree nodes come along but become
        // unreachable once the pages point at our root; finish() prunes them.
        for &page_id in &incoming {
            self.doc
                .get_dictionary_mut(page_id)?
                .set("Parent", Object::Reference(self.pages_id));
        }
        self.page_ids.extend_from_slice(&incoming);
        self.sources += 1;

        let pages = self.doc.get_dictionary_mut(self.pages_id)?;
        let kids: Vec<Object> = self.page_ids.iter().map(|&id| Object::Reference(id)).collect();
        pages.set("Kids", Object::Array(kids));
        pages.set("Count", Object::Integer(self.page_ids.len() as i64));

        debug!(
            "appended {} page(s) from {} ({} total)",
            incoming.len(),
            origin.display(),
            self.page_ids.len()
        );
        Ok(incoming.len() as u32)
    }

    pub fn page_count(&self) -> u32 {
        self.page_ids.len() as u32
    }

    pub fn source_count(&self) -> usize {
        self.sources
    }

    /// Drop objects nothing references any more and hand out the document.
    pub fn finish(mut self) -> Document {
        self.doc.prune_objects();
        self.doc.renumber_objects();
        self.doc
    }
}

impl Default for Assembler {
    fn default() -> Self {
        Self::new()
    }
}
