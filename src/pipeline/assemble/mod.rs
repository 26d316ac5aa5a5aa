//! Record Assembler / Consolidator.
//!
//! Turns the field sets a family extractor produced for one document into
//! `AssessmentRecord`s: renames fields to output columns, applies
//! consolidation lookups and per-column value rules, and tags every record
//! with its subject. Records from all documents are then laid out into one
//! `RecordTable` with a stable column schema and written as CSV.

pub mod consolidate;
pub mod identity;
pub mod record;
pub mod table;

pub use consolidate::ConsolidationMap;
pub use identity::{fingerprint, QuestionIdentity};
pub use record::{AssessmentRecord, ColumnRule, Consolidation, PostStep, RecordAssembler};
pub use table::{RecordTable, GROUP_IDENTIFIER};
