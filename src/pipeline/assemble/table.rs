use std::io::Write;
use std::path::Path;

use super::record::AssessmentRecord;

/// First column of every output table.
pub const GROUP_IDENTIFIER: &str = "group_identifier";

/// Rendered output table: header plus rows of cell strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordTable {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RecordTable {
    /// Lay records out under `group_identifier` + `schema`. With
    /// `open_schema`, fields outside the schema become extra columns in
    /// first-seen order; otherwise they are left out.
    pub fn build(schema: &[String], open_schema: bool, records: &[AssessmentRecord]) -> Self {
        let mut columns = vec![GROUP_IDENTIFIER.to_string()];
        for column in schema {
            if !columns.contains(column) {
                columns.push(column.clone());
            }
        }
        if open_schema {
            for record in records {
                for field in &record.fields {
                    if !columns.contains(&field.name) {
                        columns.push(field.name.clone());
                    }
                }
            }
        }

        let rows = records
            .iter()
            .map(|record| {
                columns
                    .iter()
                    .map(|column| {
                        if column == GROUP_IDENTIFIER {
                            record.subject.group_identifier().to_string()
                        } else {
                            record.get(column).map(|v| v.render()).unwrap_or_default()
                        }
                    })
                    .collect()
            })
            .collect();

        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Header row, then one line per record.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut out = csv::Writer::from_writer(writer);
        out.write_record(&self.columns)?;
        for row in &self.rows {
            out.write_record(row)?;
        }
        out.flush()?;
        Ok(())
    }

    pub fn write_csv_file(&self, path: &Path) -> Result<(), csv::Error> {
        let file = std::fs::File::create(path)?;
        self.write_csv(std::io::BufWriter::new(file))
    }
}
