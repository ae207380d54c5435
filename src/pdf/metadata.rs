//! PDF page counting

use std::path::Path;

use lopdf::{Document, Object};

use crate::error::{Error, Result};

/// Count pages by reading the Count field from the Pages dictionary.
/// More reliable than get_pages() for nested page trees.
fn count_from_catalog(doc: &Document) -> std::result::Result<usize, String> {
    let catalog_ref = doc
        .trailer
        .get(b"Root")
        .map_err(|_| "no Root in trailer".to_string())?;

    let catalog_id = match catalog_ref {
        Object::Reference(id) => *id,
        _ => return Err("Root is not a reference".to_string()),
    };

    let catalog = doc.get_object(catalog_id).map_err(|e| e.to_string())?;
    let catalog_dict = catalog.as_dict().map_err(|e| e.to_string())?;

    let pages_ref = catalog_dict
        .get(b"Pages")
        .map_err(|_| "no Pages in catalog".to_string())?;
    let pages_id = match pages_ref {
        Object::Reference(id) => *id,
        _ => return Err("Pages is not a reference".to_string()),
    };

    let pages_dict = doc
        .get_object(pages_id)
        .and_then(Object::as_dict)
        .map_err(|e| e.to_string())?;

    let count = pages_dict
        .get(b"Count")
        .and_then(Object::as_i64)
        .map_err(|_| "no Count in Pages".to_string())?;

    Ok(count as usize)
}

/// Count the number of pages in a PDF file
pub fn count_pages(path: &Path) -> Result<usize> {
    let doc = Document::load(path).map_err(|e| Error::CorruptDocument {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;

    count_from_catalog(&doc).map_err(|detail| Error::CorruptDocument {
        path: path.to_path_buf(),
        detail,
    })
}
