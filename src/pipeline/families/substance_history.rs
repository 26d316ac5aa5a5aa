//! Substance use history: one record per substance row in the history
//! table, with a use flag and a consolidated pattern of use.

use regex::Regex;

use super::{DocumentFamily, FamilyExtractor, FieldSet};
use crate::config::{ConfigError, SubstanceHistoryConfig};
use crate::pipeline::assemble::{ConsolidationMap, RecordAssembler};
use crate::pipeline::document::{detect_grids, Cell, SourceDocument};
use crate::pipeline::rules::{Field, FieldValue};
use crate::pipeline::section::{locate_until, roman_heading, Anchor};

/// Table columns by position.
const POSITIONAL: [&str; 7] = [
    "substance",
    "first_used",
    "last_used",
    "frequency_duration",
    "amount",
    "method",
    "pattern_of_use",
];

pub struct SubstanceHistoryExtractor {
    anchor: Anchor,
    terminator: Regex,
    assembler: RecordAssembler,
}

impl SubstanceHistoryExtractor {
    pub fn new(config: &SubstanceHistoryConfig) -> Result<Self, ConfigError> {
        let terminator = Regex::new(&config.terminator)
            .map_err(ConfigError::pattern("substance_history.terminator"))?;
        let assembler = RecordAssembler::new().consolidate(
            "pattern_of_use",
            "pattern_of_use_consolidated",
            ConsolidationMap::new(&config.pattern_of_use),
        );
        Ok(Self {
            anchor: Anchor::literal(&config.anchor),
            terminator,
            assembler,
        })
    }
}

/// Used when either date column holds something other than blank or `NA`.
fn use_flag(first_used: Option<&str>, last_used: Option<&str>) -> i64 {
    let used = |cell: Option<&str>| cell.is_some_and(|s| !s.is_empty() && !s.eq_ignore_ascii_case("NA"));
    i64::from(used(first_used) || used(last_used))
}

fn row_fields(row: &[Cell]) -> Option<FieldSet> {
    let cell = |i: usize| {
        row.get(i)
            .and_then(|c| c.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    };
    cell(0)?;

    let mut fields: FieldSet = POSITIONAL
        .iter()
        .enumerate()
        .map(|(i, name)| Field::new(*name, FieldValue::from(cell(i).map(str::to_string))))
        .collect();
    fields.push(Field::new("use_flag", FieldValue::Integer(use_flag(cell(1), cell(2)))));
    Some(fields)
}

impl FamilyExtractor for SubstanceHistoryExtractor {
    fn family(&self) -> DocumentFamily {
        DocumentFamily::SubstanceHistory
    }

    fn columns(&self) -> Vec<String> {
        ["substance", "use_flag", "pattern_of_use", "pattern_of_use_consolidated"]
            .iter()
            .map(|c| c.to_string())
            .collect()
    }

    fn extract(&self, document: &SourceDocument) -> Vec<FieldSet> {
        let text = document.full_text();
        let terminator = roman_heading(Some(self.terminator.clone()));
        let Some(section) = locate_until(&text, &self.anchor, terminator) else {
            tracing::warn!(file = %document.filename, "Substance use history section not found");
            return Vec::new();
        };

        let mut rows = Vec::new();
        for grid in detect_grids(section) {
            let width = grid.header().map_or(0, <[Cell]>::len);
            if width < POSITIONAL.len() {
                tracing::warn!(
                    file = %document.filename,
                    columns = width,
                    expected = POSITIONAL.len(),
                    "Substance table narrower than expected"
                );
            }
            for row in grid.data_rows() {
                match row_fields(row) {
                    Some(fields) => rows.push(fields),
                    None => tracing::debug!(file = %document.filename, "Skipping row without a substance"),
                }
            }
        }

        if rows.is_empty() {
            tracing::warn!(file = %document.filename, "Substance use history has no substance rows");
        }
        rows
    }

    fn assembler(&self) -> &RecordAssembler {
        &self.assembler
    }
}
