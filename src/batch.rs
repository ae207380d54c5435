//! Batch orchestration
//!
//! Drives every mapping row through load → resolve → merge → write and
//! collects one [`JobOutcome`] per row. Failure isolation is the point: a
//! job's failure is recorded on its own outcome and never stops the batch.
//! Only an unreadable mapping file or directory aborts the run.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::thread;

use crossbeam_channel::bounded;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::mapping::{self, MappingRecord};
use crate::output::write_document;
use crate::pdf::merge_documents;
use crate::resolve::{DirectoryIndex, ResolvedJob, Resolver, DEFAULT_EXTENSIONS};
use crate::sheet;

/// Everything the batch needs, passed explicitly. No ambient state.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub certificate_dir: PathBuf,
    pub challan_dir: PathBuf,
    pub mapping_path: PathBuf,
    pub output_dir: PathBuf,
    /// Optional suffix inserted before the output extension, e.g. "_combined"
    pub output_suffix: Option<String>,
    /// Recognized document extensions (lowercase, no dots)
    pub extensions: Vec<String>,
    /// Worker thread count; defaults to the number of CPUs
    pub workers: Option<usize>,
}

impl BatchConfig {
    pub fn new(
        certificate_dir: PathBuf,
        challan_dir: PathBuf,
        mapping_path: PathBuf,
        output_dir: PathBuf,
    ) -> Self {
        Self {
            certificate_dir,
            challan_dir,
            mapping_path,
            output_dir,
            output_suffix: None,
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            workers: None,
        }
    }
}

/// Lifecycle of one mapping row. Advances monotonically left to right, or
/// terminates at `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    /// Parsed, not yet resolved
    Pending,
    /// All keys bound to files
    Resolved,
    /// Merge finished, write pending
    Merged,
    /// Output persisted
    Written,
    Failed,
}

/// Terminal state and diagnostic for one mapping row.
#[derive(Debug)]
pub struct JobOutcome {
    /// 1-based row in the mapping file
    pub row: usize,
    /// Absent only when the row was malformed beyond extracting a record
    pub record: Option<MappingRecord>,
    pub job: Option<ResolvedJob>,
    pub status: JobStatus,
    pub error: Option<Error>,
}

impl JobOutcome {
    fn resolved(record: MappingRecord, job: ResolvedJob) -> Self {
        Self {
            row: record.row,
            record: Some(record),
            job: Some(job),
            status: JobStatus::Resolved,
            error: None,
        }
    }

    fn failed_record(record: MappingRecord, error: Error) -> Self {
        Self {
            row: record.row,
            record: Some(record),
            job: None,
            status: JobStatus::Failed,
            error: Some(error),
        }
    }

    fn malformed(row: usize, error: Error) -> Self {
        Self {
            row,
            record: None,
            job: None,
            status: JobStatus::Failed,
            error: Some(error),
        }
    }

    fn fail(&mut self, error: Error) {
        self.status = JobStatus::Failed;
        self.error = Some(error);
    }

    /// User-facing identifier: the certificate key, or the row number when
    /// the row never yielded one.
    pub fn label(&self) -> String {
        match &self.record {
            Some(record) => record.certificate_key.clone(),
            None => format!("row {}", self.row),
        }
    }
}

/// One outcome per mapping row, in row order.
#[derive(Debug)]
pub struct BatchSummary {
    pub outcomes: Vec<JobOutcome>,
}

impl BatchSummary {
    pub fn written(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == JobStatus::Written)
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == JobStatus::Failed)
            .count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &JobOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.status == JobStatus::Failed)
    }
}

/// Run the whole batch. `Err` only on fatal startup conditions; job-level
/// failures live on the returned outcomes.
pub fn run_batch(config: &BatchConfig) -> Result<BatchSummary> {
    info!(
        mapping = %config.mapping_path.display(),
        certificates = %config.certificate_dir.display(),
        challans = %config.challan_dir.display(),
        output = %config.output_dir.display(),
        "starting batch"
    );

    let rows = sheet::read_rows(&config.mapping_path)?;
    let parsed = mapping::parse_rows(&rows);

    let extensions: Vec<&str> = config.extensions.iter().map(String::as_str).collect();
    let certificates = DirectoryIndex::scan(&config.certificate_dir, &extensions)?;
    let challans = DirectoryIndex::scan(&config.challan_dir, &extensions)?;
    info!(
        certificates = certificates.len(),
        challans = challans.len(),
        rows = parsed.len(),
        "indexed input directories"
    );

    fs::create_dir_all(&config.output_dir).map_err(|source| Error::DirectoryUnreadable {
        dir: config.output_dir.clone(),
        source,
    })?;

    let resolver = Resolver::new(
        certificates,
        challans,
        config.output_dir.clone(),
        config.output_suffix.clone(),
    )
    .with_extensions(&config.extensions);

    // Resolution runs sequentially: the output-name registry must see rows in
    // order so the first claimant of a name wins deterministically.
    let mut outcomes: Vec<JobOutcome> = Vec::with_capacity(parsed.len());
    let mut claimed: HashMap<String, String> = HashMap::new();
    let mut runnable: Vec<(usize, ResolvedJob)> = Vec::new();

    for parsed_row in parsed {
        match parsed_row {
            Err(error) => {
                warn!(%error, "mapping row rejected");
                let row = match &error {
                    Error::MalformedMapping { row, .. } => *row,
                    _ => 0,
                };
                outcomes.push(JobOutcome::malformed(row, error));
            }
            Ok(record) => match resolver.resolve(&record) {
                Ok(job) => {
                    let name = job
                        .output
                        .file_name()
                        .map(|n| n.to_string_lossy().to_lowercase())
                        .unwrap_or_default();
                    if let Some(earlier_key) = claimed.get(&name) {
                        let error = Error::DuplicateOutput {
                            path: job.output.clone(),
                            key: record.certificate_key.clone(),
                            earlier_key: earlier_key.clone(),
                        };
                        warn!(%error, "output name collision");
                        outcomes.push(JobOutcome::failed_record(record, error));
                    } else {
                        claimed.insert(name, record.certificate_key.clone());
                        runnable.push((outcomes.len(), job.clone()));
                        outcomes.push(JobOutcome::resolved(record, job));
                    }
                }
                Err(error) => {
                    warn!(key = %record.certificate_key, %error, "row did not resolve");
                    outcomes.push(JobOutcome::failed_record(record, error));
                }
            },
        }
    }

    let workers = config
        .workers
        .unwrap_or_else(num_cpus::get)
        .clamp(1, runnable.len().max(1));
    for (index, result) in execute_jobs(runnable, workers) {
        match result {
            Ok(()) => {
                let outcome = &mut outcomes[index];
                outcome.status = JobStatus::Written;
                info!(key = %outcome.label(), "merged output written");
            }
            Err(error) => {
                warn!(key = %outcomes[index].label(), %error, "job failed");
                outcomes[index].fail(error);
            }
        }
    }

    let summary = BatchSummary { outcomes };
    info!(
        written = summary.written(),
        failed = summary.failed(),
        "batch complete"
    );
    Ok(summary)
}

/// Merge then persist one resolved job.
fn run_job(job: &ResolvedJob) -> Result<()> {
    debug!(
        certificate = %job.certificate.display(),
        challans = job.challans.len(),
        "merging"
    );
    let mut doc = merge_documents(&job.certificate, &job.challans)?;
    write_document(&mut doc, &job.output)
}

/// Fan resolved jobs out over a fixed pool of worker threads.
///
/// Results carry the job's outcome index, so collection order does not
/// matter: every job is reported exactly once no matter which worker
/// finishes first. Jobs never share mutable state: distinct output paths
/// are guaranteed by the registry in `run_batch`.
fn execute_jobs(jobs: Vec<(usize, ResolvedJob)>, workers: usize) -> Vec<(usize, Result<()>)> {
    if jobs.is_empty() {
        return Vec::new();
    }
    if workers <= 1 || jobs.len() == 1 {
        return jobs
            .into_iter()
            .map(|(index, job)| (index, run_job(&job)))
            .collect();
    }

    let (job_tx, job_rx) = bounded::<(usize, ResolvedJob)>(jobs.len());
    let (result_tx, result_rx) = bounded::<(usize, Result<()>)>(jobs.len());
    for item in jobs {
        // Channel is sized to hold every job; send cannot block here
        let _ = job_tx.send(item);
    }
    drop(job_tx);

    thread::scope(|scope| {
        for _ in 0..workers {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            scope.spawn(move || {
                while let Ok((index, job)) = job_rx.recv() {
                    let result = run_job(&job);
                    if result_tx.send((index, result)).is_err() {
                        break;
                    }
                }
            });
        }
        drop(job_rx);
        drop(result_tx);

        result_rx.iter().collect()
    })
}
