//! Mapping file reading
//!
//! Loads the tabular mapping file into raw rows of trimmed text cells. All
//! interpretation of those rows (header detection, key extraction) lives in
//! [`crate::mapping`]; this module is only the seam to the file format.

use std::path::Path;

use crate::error::{Error, Result};

/// Read the mapping file into raw rows of cells.
///
/// Rows may be ragged (differing cell counts); cells are trimmed but otherwise
/// untouched. An unreadable file is fatal to the batch.
pub fn read_rows(path: &Path) -> Result<Vec<Vec<String>>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|source| Error::MappingUnreadable {
            path: path.to_path_buf(),
            source,
        })?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|source| Error::MappingUnreadable {
            path: path.to_path_buf(),
            source,
        })?;
        rows.push(record.iter().map(|cell| cell.trim().to_string()).collect());
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn reads_ragged_rows_and_trims_cells() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "map.csv", "cert_A , chal_1, chal_2\ncert_B\n");

        let rows = read_rows(&path).unwrap();
        assert_eq!(
            rows,
            vec![
                vec!["cert_A".to_string(), "chal_1".to_string(), "chal_2".to_string()],
                vec!["cert_B".to_string()],
            ]
        );
    }

    #[test]
    fn missing_file_is_fatal() {
        let dir = TempDir::new().unwrap();
        let result = read_rows(&dir.path().join("nope.csv"));
        assert!(matches!(result, Err(Error::MappingUnreadable { .. })));
    }
}
