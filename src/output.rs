//! Merged document persistence
//!
//! Writes go to a temporary sibling first and are renamed into place, so an
//! interrupted run never leaves a half-written file under the final name. An
//! existing file from a prior run is overwritten: re-running the batch with
//! unchanged inputs is idempotent.

use std::fs;
use std::path::Path;

use lopdf::Document;

use crate::error::{Error, Result};

/// Persist a merged document under its final output path.
///
/// No retries: a failure surfaces as `WriteFailed` for this job alone.
pub fn write_document(doc: &mut Document, path: &Path) -> Result<()> {
    let tmp = path.with_extension("pdf.part");

    let saved = doc.save(&tmp).map(|_| ()).map_err(|e| Error::WriteFailed {
        path: path.to_path_buf(),
        source: std::io::Error::other(e.to_string()),
    });

    if let Err(e) = saved {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }

    fs::rename(&tmp, path).map_err(|source| {
        let _ = fs::remove_file(&tmp);
        Error::WriteFailed {
            path: path.to_path_buf(),
            source,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Object};
    use tempfile::TempDir;

    fn one_page_doc() -> Document {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
        });
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc
    }

    #[test]
    fn writes_and_overwrites_without_leaving_temp_files() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("out.pdf");

        write_document(&mut one_page_doc(), &path).unwrap();
        assert!(path.exists());

        // Overwrite from a prior run is allowed
        write_document(&mut one_page_doc(), &path).unwrap();

        let leftovers: Vec<_> = std::fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, vec!["out.pdf"]);
    }

    #[test]
    fn unwritable_target_is_write_failed() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("absent").join("out.pdf");

        let err = write_document(&mut one_page_doc(), &path).unwrap_err();
        assert!(matches!(err, Error::WriteFailed { .. }));
    }
}
