use std::path::PathBuf;

use serde::Serialize;

use crate::pipeline::families::DocumentFamily;

/// A document excluded from the output, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedDocument {
    /// Filename with the patient key replaced by its token.
    pub filename: String,
    pub reason: String,
}

/// Summary of one batch run, printed by the CLI as JSON.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub family: DocumentFamily,
    pub documents_seen: usize,
    /// Documents that produced at least one record.
    pub succeeded: usize,
    /// Documents read fine but without the family's anchor.
    pub skipped: usize,
    pub failed: Vec<FailedDocument>,
    /// Filenames carrying no patient code; their rows are `UNIDENTIFIED`.
    pub needs_review: Vec<String>,
    pub subjects: usize,
    pub records_written: usize,
    pub duration_ms: u64,
    pub output_path: PathBuf,
}

impl BatchReport {
    pub fn new(family: DocumentFamily, documents_seen: usize, output_path: PathBuf) -> Self {
        Self {
            family,
            documents_seen,
            succeeded: 0,
            skipped: 0,
            failed: Vec::new(),
            needs_review: Vec::new(),
            subjects: 0,
            records_written: 0,
            duration_ms: 0,
            output_path,
        }
    }

    /// Every document seen is counted exactly once.
    pub fn is_balanced(&self) -> bool {
        self.succeeded + self.skipped + self.failed.len() == self.documents_seen
    }
}
