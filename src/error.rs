//! Error types for the challan-merge library

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the challan-merge library
///
/// Every variant except `MappingUnreadable` and `DirectoryUnreadable` is
/// job-local: it fails exactly one mapping row and the batch continues.
#[derive(Error, Debug)]
pub enum Error {
    /// Mapping row with a blank certificate cell but non-blank challan cells
    #[error("row {row}: {detail}")]
    MalformedMapping { row: usize, detail: String },

    /// A key matched no file in its directory
    #[error("no file matching '{key}' in {}", .dir.display())]
    MissingFile { key: String, dir: PathBuf },

    /// A key matched more than one file in its directory
    #[error("'{key}' matches {} files in {} ({})", .candidates.len(), .dir.display(), .candidates.join(", "))]
    AmbiguousMatch {
        key: String,
        dir: PathBuf,
        candidates: Vec<String>,
    },

    /// A source document could not be opened or decoded
    #[error("cannot read document {}: {detail}", .path.display())]
    CorruptDocument { path: PathBuf, detail: String },

    /// Persisting a merged document failed
    #[error("cannot write {}: {source}", .path.display())]
    WriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Two mapping rows resolved to the same output file
    #[error("output {} already claimed by '{earlier_key}' (this row: '{key}')", .path.display())]
    DuplicateOutput {
        path: PathBuf,
        key: String,
        earlier_key: String,
    },

    /// The mapping file could not be read at startup (fatal)
    #[error("cannot read mapping file {}: {source}", .path.display())]
    MappingUnreadable { path: PathBuf, source: csv::Error },

    /// An input or output directory was unusable at startup (fatal)
    #[error("cannot access directory {}: {source}", .dir.display())]
    DirectoryUnreadable {
        dir: PathBuf,
        source: std::io::Error,
    },
}

impl Error {
    /// Short stable label used in batch summary lines
    pub fn kind(&self) -> &'static str {
        match self {
            Error::MalformedMapping { .. } => "malformed mapping",
            Error::MissingFile { .. } => "missing file",
            Error::AmbiguousMatch { .. } => "ambiguous match",
            Error::CorruptDocument { .. } => "corrupt document",
            Error::WriteFailed { .. } => "write failed",
            Error::DuplicateOutput { .. } => "duplicate output",
            Error::MappingUnreadable { .. } => "mapping unreadable",
            Error::DirectoryUnreadable { .. } => "directory unreadable",
        }
    }

    /// True for errors that abort the whole batch rather than a single job
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::MappingUnreadable { .. } | Error::DirectoryUnreadable { .. }
        )
    }
}
