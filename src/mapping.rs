//! Mapping row parsing
//!
//! Turns raw spreadsheet rows into [`MappingRecord`]s: the first cell names
//! the certificate, every following non-empty cell names a challan, in order.
//! Pure functions only; the filesystem is never touched here.

use crate::error::{Error, Result};
use crate::resolve::DEFAULT_EXTENSIONS;

/// One spreadsheet row: a certificate key and its ordered challan keys.
///
/// Duplicate challan keys are preserved; a challan may legitimately appear
/// twice in the same merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingRecord {
    /// 1-based row number in the mapping file, for diagnostics
    pub row: usize,
    pub certificate_key: String,
    pub challan_keys: Vec<String>,
}

/// Parse raw rows into mapping records, one result per data row.
///
/// Fully blank rows are skipped. The first row is skipped when it looks like
/// a header (see [`looks_like_header`]). A row whose certificate cell is
/// blank while other cells are not yields `Err(MalformedMapping)`; the
/// ambiguity is flagged, never silently dropped.
pub fn parse_rows(rows: &[Vec<String>]) -> Vec<Result<MappingRecord>> {
    let mut records = Vec::new();

    for (index, cells) in rows.iter().enumerate() {
        let row = index + 1;

        if cells.iter().all(|cell| cell.is_empty()) {
            continue;
        }
        if index == 0 && looks_like_header(cells) {
            continue;
        }

        let certificate = cells.first().map(String::as_str).unwrap_or("");
        if certificate.is_empty() {
            records.push(Err(Error::MalformedMapping {
                row,
                detail: "certificate cell is blank but the row is not".to_string(),
            }));
            continue;
        }

        let challan_keys = cells[1..]
            .iter()
            .filter(|cell| !cell.is_empty())
            .cloned()
            .collect();

        records.push(Ok(MappingRecord {
            row,
            certificate_key: certificate.to_string(),
            challan_keys,
        }));
    }

    records
}

/// Heuristic header check: every non-empty cell contains interior whitespace
/// and none carries a recognized document extension. Column titles like
/// "Employee Name" or "Challan Number" qualify; filename keys never do.
pub fn looks_like_header(cells: &[String]) -> bool {
    let mut saw_any = false;
    for cell in cells.iter().filter(|cell| !cell.is_empty()) {
        saw_any = true;
        let lowered = cell.to_lowercase();
        if DEFAULT_EXTENSIONS
            .iter()
            .any(|ext| lowered.ends_with(&format!(".{ext}")))
        {
            return false;
        }
        if !cell.trim().contains(char::is_whitespace) {
            return false;
        }
    }
    saw_any
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn parses_certificate_and_ordered_challans() {
        let rows = vec![row(&["cert_A", "chal_1", "chal_2"])];
        let records = parse_rows(&rows);

        assert_eq!(records.len(), 1);
        let record = records[0].as_ref().unwrap();
        assert_eq!(record.certificate_key, "cert_A");
        assert_eq!(record.challan_keys, vec!["chal_1", "chal_2"]);
        assert_eq!(record.row, 1);
    }

    #[test]
    fn preserves_duplicate_challans() {
        let rows = vec![row(&["cert_A", "chal_1", "chal_1"])];
        let records = parse_rows(&rows);
        let record = records[0].as_ref().unwrap();
        assert_eq!(record.challan_keys, vec!["chal_1", "chal_1"]);
    }

    #[test]
    fn empty_challan_list_is_valid() {
        let rows = vec![row(&["cert_A"])];
        let records = parse_rows(&rows);
        assert!(records[0].as_ref().unwrap().challan_keys.is_empty());
    }

    #[test]
    fn skips_blank_rows() {
        let rows = vec![row(&["", "", ""]), row(&["cert_A"]), row(&[])];
        let records = parse_rows(&rows);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].as_ref().unwrap().row, 2);
    }

    #[test]
    fn skips_header_row() {
        let rows = vec![
            row(&["Employee Name", "Challan Number"]),
            row(&["cert_A", "chal_1"]),
        ];
        let records = parse_rows(&rows);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].as_ref().unwrap().certificate_key, "cert_A");
    }

    #[test]
    fn first_row_with_filename_keys_is_data() {
        let rows = vec![row(&["cert_A.pdf", "chal_1"])];
        let records = parse_rows(&rows);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].as_ref().unwrap().certificate_key, "cert_A.pdf");
    }

    #[test]
    fn blank_certificate_with_challans_is_malformed() {
        let rows = vec![row(&["", "chal_1"])];
        let records = parse_rows(&rows);
        assert!(matches!(
            records[0],
            Err(Error::MalformedMapping { row: 1, .. })
        ));
    }

    #[test]
    fn interior_empty_cells_are_skipped_but_order_kept() {
        let rows = vec![row(&["cert_A", "", "chal_2", "", "chal_1"])];
        let records = parse_rows(&rows);
        let record = records[0].as_ref().unwrap();
        assert_eq!(record.challan_keys, vec!["chal_2", "chal_1"]);
    }
}
