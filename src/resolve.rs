//! Filename resolution against the certificate and challan directories
//!
//! Matching is case-insensitive and tolerant of extension variants: a key
//! `chal_1`, `chal_1.pdf` or `CHAL_1.PDF` all name the same file. A key
//! matching no file or more than one file fails the whole record: resolution
//! is all-or-nothing, so no partial job can reach the merge engine.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::mapping::MappingRecord;

/// Extension variants recognized when normalizing keys and listing files
pub const DEFAULT_EXTENSIONS: &[&str] = &["pdf"];

/// A fully resolved merge job: every key bound to a concrete file path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedJob {
    pub certificate: PathBuf,
    pub challans: Vec<PathBuf>,
    pub output: PathBuf,
}

/// Flat listing of one directory, indexed case-insensitively by file stem.
///
/// Subdirectories are not recursed into. Only files whose extension is in the
/// recognized set are indexed.
#[derive(Debug)]
pub struct DirectoryIndex {
    dir: PathBuf,
    by_stem: HashMap<String, Vec<PathBuf>>,
}

impl DirectoryIndex {
    /// Scan a directory. An unlistable directory is fatal to the batch.
    pub fn scan(dir: &Path, extensions: &[&str]) -> Result<Self> {
        let mut by_stem: HashMap<String, Vec<PathBuf>> = HashMap::new();

        for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| Error::DirectoryUnreadable {
                dir: dir.to_path_buf(),
                source: e
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("directory walk failed")),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let ext = path
                .extension()
                .map(|ext| ext.to_string_lossy().to_lowercase());
            let recognized = ext
                .as_deref()
                .is_some_and(|ext| extensions.contains(&ext));
            if !recognized {
                continue;
            }
            if let Some(stem) = path.file_stem() {
                by_stem
                    .entry(stem.to_string_lossy().to_lowercase())
                    .or_default()
                    .push(path.to_path_buf());
            }
        }

        // Candidate order must not depend on readdir order
        for candidates in by_stem.values_mut() {
            candidates.sort();
        }

        Ok(Self {
            dir: dir.to_path_buf(),
            by_stem,
        })
    }

    /// Number of indexed files
    pub fn len(&self) -> usize {
        self.by_stem.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_stem.is_empty()
    }

    /// Resolve one key to exactly one file
    pub fn lookup(&self, key: &str, extensions: &[&str]) -> Result<&Path> {
        let stem = normalize_key(key, extensions);
        match self.by_stem.get(&stem).map(Vec::as_slice) {
            None | Some([]) => Err(Error::MissingFile {
                key: key.to_string(),
                dir: self.dir.clone(),
            }),
            Some([path]) => Ok(path),
            Some(candidates) => Err(Error::AmbiguousMatch {
                key: key.to_string(),
                dir: self.dir.clone(),
                candidates: candidates
                    .iter()
                    .map(|p| p.file_name().unwrap_or_default().to_string_lossy().into_owned())
                    .collect(),
            }),
        }
    }
}

/// Trim, lowercase, and strip one recognized extension from a key
pub fn normalize_key(key: &str, extensions: &[&str]) -> String {
    let lowered = key.trim().to_lowercase();
    for ext in extensions {
        if let Some(stem) = lowered.strip_suffix(&format!(".{ext}")) {
            return stem.to_string();
        }
    }
    lowered
}

/// Binds mapping records to files in the two input directories.
pub struct Resolver {
    certificates: DirectoryIndex,
    challans: DirectoryIndex,
    output_dir: PathBuf,
    output_suffix: Option<String>,
    extensions: Vec<String>,
}

impl Resolver {
    pub fn new(
        certificates: DirectoryIndex,
        challans: DirectoryIndex,
        output_dir: PathBuf,
        output_suffix: Option<String>,
    ) -> Self {
        Self {
            certificates,
            challans,
            output_dir,
            output_suffix,
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Override the recognized extension set (lowercase, without dots)
    pub fn with_extensions(mut self, extensions: &[String]) -> Self {
        self.extensions = extensions.iter().map(|ext| ext.to_lowercase()).collect();
        self
    }

    /// Resolve every key of a record, all-or-nothing.
    ///
    /// The first failing key fails the record; no partial job is produced.
    pub fn resolve(&self, record: &MappingRecord) -> Result<ResolvedJob> {
        let extensions: Vec<&str> = self.extensions.iter().map(String::as_str).collect();

        let certificate = self
            .certificates
            .lookup(&record.certificate_key, &extensions)?
            .to_path_buf();

        let mut challans = Vec::with_capacity(record.challan_keys.len());
        for key in &record.challan_keys {
            challans.push(self.challans.lookup(key, &extensions)?.to_path_buf());
        }

        let output = self.output_dir.join(output_name(&certificate, self.output_suffix.as_deref()));

        Ok(ResolvedJob {
            certificate,
            challans,
            output,
        })
    }
}

/// Output filename: the certificate's own name, with an optional suffix
/// inserted before the extension.
fn output_name(certificate: &Path, suffix: Option<&str>) -> String {
    let name = certificate
        .file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .into_owned();
    let Some(suffix) = suffix.filter(|s| !s.is_empty()) else {
        return name;
    };
    match (certificate.file_stem(), certificate.extension()) {
        (Some(stem), Some(ext)) => format!(
            "{}{}.{}",
            stem.to_string_lossy(),
            suffix,
            ext.to_string_lossy()
        ),
        _ => format!("{name}{suffix}"),
    }
}
