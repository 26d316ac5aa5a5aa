//! BatchRunner: directory in, one CSV out.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;

use super::report::{BatchReport, FailedDocument};
use super::BatchError;
use crate::config::ParserConfig;
use crate::pipeline::assemble::{AssessmentRecord, RecordTable};
use crate::pipeline::document::{DocumentLoader, LoadError, LopdfLoader};
use crate::pipeline::families::{build_extractor, DocumentFamily, FamilyExtractor};
use crate::pseudonym::{PseudonymContext, SubjectId};

/// What happened to one input file.
enum DocumentOutcome {
    Extracted {
        filename: String,
        subject: SubjectId,
        records: Vec<AssessmentRecord>,
    },
    Failed(FailedDocument),
}

/// One family, one loader, one pseudonym context for the whole run.
pub struct BatchRunner {
    loader: Box<dyn DocumentLoader>,
    extractor: Box<dyn FamilyExtractor>,
    pseudonyms: PseudonymContext,
}

impl BatchRunner {
    pub fn new(
        loader: Box<dyn DocumentLoader>,
        extractor: Box<dyn FamilyExtractor>,
        pseudonyms: PseudonymContext,
    ) -> Self {
        Self {
            loader,
            extractor,
            pseudonyms,
        }
    }

    /// PDF loader, the family's extractor and a fresh pseudonym context.
    pub fn from_config(family: DocumentFamily, config: &ParserConfig) -> Result<Self, BatchError> {
        let extractor = build_extractor(family, config)?;
        let pseudonyms = PseudonymContext::from_config(config)?;
        Ok(Self::new(Box::new(LopdfLoader), extractor, pseudonyms))
    }

    pub fn family(&self) -> DocumentFamily {
        self.extractor.family()
    }

    /// Process every PDF in `input_dir` and write the family's CSV.
    ///
    /// `output` may be a file path or an existing directory, in which case
    /// the family's default file name is used inside it.
    pub fn run(&self, input_dir: &Path, output: &Path) -> Result<BatchReport, BatchError> {
        let start = Instant::now();
        let family = self.family();
        let files = list_documents(input_dir)?;
        let output_path = resolve_output(output, family)?;

        tracing::info!(
            family = %family,
            documents = files.len(),
            input = %input_dir.display(),
            "Batch started"
        );

        // Indexed parallel collect keeps sorted filename order.
        let outcomes: Vec<DocumentOutcome> = files.par_iter().map(|path| self.process_isolated(path)).collect();

        let mut report = BatchReport::new(family, files.len(), output_path.clone());
        let mut records = Vec::new();
        for outcome in outcomes {
            match outcome {
                DocumentOutcome::Extracted {
                    filename,
                    subject,
                    records: produced,
                } => {
                    if !subject.is_identified() {
                        report.needs_review.push(filename);
                    }
                    if produced.is_empty() {
                        report.skipped += 1;
                    } else {
                        report.succeeded += 1;
                        records.extend(produced);
                    }
                }
                DocumentOutcome::Failed(failed) => report.failed.push(failed),
            }
        }

        let table = RecordTable::build(&self.extractor.columns(), self.extractor.open_schema(), &records);
        table.write_csv_file(&output_path)?;

        report.records_written = table.len();
        report.subjects = self.pseudonyms.subjects_seen();
        report.duration_ms = start.elapsed().as_millis() as u64;

        tracing::info!(
            family = %family,
            succeeded = report.succeeded,
            skipped = report.skipped,
            failed = report.failed.len(),
            needs_review = report.needs_review.len(),
            records = report.records_written,
            duration_ms = report.duration_ms,
            output = %output_path.display(),
            "Batch complete"
        );

        Ok(report)
    }

    /// Resolve, load and extract one file.
    pub fn process_document(&self, path: &Path) -> Result<(SubjectId, Vec<AssessmentRecord>), LoadError> {
        let (subject, label) = self.identify(path);
        let _span = tracing::info_span!("document", file = %label).entered();
        self.extract(path, subject, label)
    }

    /// Subject of a file and the masked name used for it from here on.
    fn identify(&self, path: &Path) -> (SubjectId, String) {
        let filename = file_name(path);
        let subject = self.pseudonyms.resolve(&filename);
        let label = self.pseudonyms.masked_filename(&filename, &subject);
        (subject, label)
    }

    fn extract(
        &self,
        path: &Path,
        subject: SubjectId,
        label: String,
    ) -> Result<(SubjectId, Vec<AssessmentRecord>), LoadError> {
        let mut document = self.loader.load(path)?;
        document.filename = label;
        let extracted = self.extractor.extract(&document);
        let records = self
            .extractor
            .assembler()
            .assemble(extracted, &subject, &document.filename);
        tracing::debug!(
            pages = document.page_count(),
            records = records.len(),
            "Document processed"
        );
        Ok((subject, records))
    }

    /// `process_document` with errors and panics contained to this file.
    fn process_isolated(&self, path: &Path) -> DocumentOutcome {
        let (subject, label) = self.identify(path);
        let _span = tracing::info_span!("document", file = %label).entered();
        let result = catch_unwind(AssertUnwindSafe(|| self.extract(path, subject, label.clone())));

        let reason = match result {
            Ok(Ok((subject, records))) => {
                return DocumentOutcome::Extracted {
                    filename: label,
                    subject,
                    records,
                };
            }
            Ok(Err(e)) => e.to_string(),
            Err(payload) => format!("panic during extraction: {}", panic_message(payload.as_ref())),
        };

        tracing::error!(reason = %reason, "Document failed, excluded from output");
        DocumentOutcome::Failed(FailedDocument {
            filename: label,
            reason,
        })
    }
}

/// Build the runner from configuration and process one directory.
pub fn process(
    input_dir: &Path,
    output: &Path,
    family: DocumentFamily,
    config: &ParserConfig,
) -> Result<BatchReport, BatchError> {
    BatchRunner::from_config(family, config)?.run(input_dir, output)
}

/// Visible `.pdf` files (any case) directly inside `dir`, sorted by name.
fn list_documents(dir: &Path) -> Result<Vec<PathBuf>, BatchError> {
    if !dir.exists() {
        return Err(BatchError::InputMissing(dir.to_path_buf()));
    }
    if !dir.is_dir() {
        return Err(BatchError::NotADirectory(dir.to_path_buf()));
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let name = file_name(&path);
        let is_pdf = path
            .extension()
            .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case("pdf"));
        if path.is_file() && is_pdf && !name.starts_with('.') {
            files.push(path);
        }
    }
    files.sort_by_key(|path| file_name(path));
    Ok(files)
}

fn resolve_output(output: &Path, family: DocumentFamily) -> Result<PathBuf, BatchError> {
    if output.is_dir() {
        return Ok(output.join(family.default_output_name()));
    }
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(output.to_path_buf())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
