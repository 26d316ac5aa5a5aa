//! Batch Orchestrator.
//!
//! Runs one document family over every PDF in a directory:
//! ```text
//! list → (load → resolve subject → extract → assemble) per file → CSV
//! ```
//! Files are processed in parallel and their rows concatenated in sorted
//! filename order. Every per-file failure, panics included, stays inside
//! that file's outcome; only an unusable input directory or output file
//! fails the run.

pub mod report;
pub mod runner;

pub use report::{BatchReport, FailedDocument};
pub use runner::{process, BatchRunner};

use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("Input directory does not exist: {0}")]
    InputMissing(PathBuf),

    #[error("Input path is not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}
