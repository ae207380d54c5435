//! PDF page concatenation using lopdf
//!
//! Based on the lopdf merge example:
//! https://github.com/J-F-Liu/lopdf/blob/main/examples/merge.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use lopdf::{Dictionary, Document, Object, ObjectId};

use crate::error::{Error, Result};

/// Concatenate the certificate's pages with each challan's pages, in order.
///
/// The resulting page sequence is exactly [certificate pages] followed by
/// [challans[0] pages], ..., [challans[n-1] pages], with no reordering,
/// deduplication, or page drops. The merged document is returned in memory;
/// persisting it is the output writer's job.
///
/// Any source that cannot be opened or decoded (including a zero-page
/// document) fails with `CorruptDocument` naming that source, leaving other
/// jobs unaffected.
pub fn merge_documents(certificate: &Path, challans: &[PathBuf]) -> Result<Document> {
    let mut documents = vec![load_document(certificate)?];
    for path in challans {
        documents.push(load_document(path)?);
    }

    // Renumber every source into one id space, keeping page order
    let mut max_id = 1;
    let mut page_ids: Vec<ObjectId> = Vec::new();
    let mut objects: BTreeMap<ObjectId, Object> = BTreeMap::new();

    for mut doc in documents {
        doc.renumber_objects_with(max_id);
        max_id = doc.max_id + 1;

        let pages = doc.get_pages();
        page_ids.extend(pages.into_values());

        objects.extend(doc.objects);
    }

    let mut merged = Document::with_version("1.5");
    merged.objects.extend(objects);

    // new_object_id() must not collide with ids we just imported
    merged.max_id = max_id - 1;

    let pages_id = merged.new_object_id();

    let kids: Vec<Object> = page_ids.iter().map(|&id| Object::Reference(id)).collect();

    let mut pages_object = Dictionary::new();
    pages_object.set("Type", Object::Name(b"Pages".to_vec()));
    pages_object.set("Count", Object::Integer(page_ids.len() as i64));
    pages_object.set("Kids", Object::Array(kids));

    let catalog_id = merged.new_object_id();
    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));

    merged.objects.insert(catalog_id, Object::Dictionary(catalog));
    merged.objects.insert(pages_id, Object::Dictionary(pages_object));

    merged.trailer.set("Root", Object::Reference(catalog_id));

    // Re-parent every page under the new pages node
    for &page_id in &page_ids {
        if let Ok(Object::Dictionary(ref mut dict)) = merged.get_object_mut(page_id) {
            dict.set("Parent", Object::Reference(pages_id));
        }
    }

    merged.compress();

    Ok(merged)
}

fn load_document(path: &Path) -> Result<Document> {
    let doc = Document::load(path).map_err(|e| Error::CorruptDocument {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;

    if doc.get_pages().is_empty() {
        return Err(Error::CorruptDocument {
            path: path.to_path_buf(),
            detail: "document has no pages".to_string(),
        });
    }

    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_source_is_corrupt_document() {
        let err = merge_documents(Path::new("nonexistent.pdf"), &[]).unwrap_err();
        match err {
            Error::CorruptDocument { path, .. } => {
                assert_eq!(path, Path::new("nonexistent.pdf"));
            }
            other => panic!("expected CorruptDocument, got {other:?}"),
        }
    }

    #[test]
    fn garbage_source_is_corrupt_document() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("garbage.pdf");
        std::fs::write(&path, b"not a pdf at all").unwrap();

        let err = merge_documents(&path, &[]).unwrap_err();
        assert!(matches!(err, Error::CorruptDocument { .. }));
    }

    // Page-order and page-count properties are covered end-to-end in
    // tests/batch.rs against generated documents.
}
