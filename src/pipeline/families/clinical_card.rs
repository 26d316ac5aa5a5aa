//! Daily clinical card: a dated page carrying three small score tables
//! (emotions, supports, coping). One record per document.

use regex::Regex;

use super::{DocumentFamily, FamilyExtractor, FieldSet};
use crate::config::{ClinicalCardConfig, ConfigError};
use crate::pipeline::assemble::RecordAssembler;
use crate::pipeline::document::SourceDocument;
use crate::pipeline::rules::{apply_rules, ExtractionRule, Field, FieldValue, RuleInput, Strategy};

pub struct ClinicalCardExtractor {
    anchor: Regex,
    tables: Vec<ExtractionRule>,
    assembler: RecordAssembler,
}

impl ClinicalCardExtractor {
    pub fn new(config: &ClinicalCardConfig) -> Result<Self, ConfigError> {
        let anchor = Regex::new(&config.anchor).map_err(ConfigError::pattern("clinical_card.anchor"))?;
        let tables = config
            .table_prefixes
            .iter()
            .enumerate()
            .map(|(table, prefix)| {
                ExtractionRule::new(
                    format!("{prefix}table"),
                    Strategy::TableCellByHeader {
                        table,
                        prefix: prefix.clone(),
                    },
                )
            })
            .collect();
        Ok(Self {
            anchor,
            tables,
            assembler: RecordAssembler::new(),
        })
    }
}

impl FamilyExtractor for ClinicalCardExtractor {
    fn family(&self) -> DocumentFamily {
        DocumentFamily::ClinicalCard
    }

    fn columns(&self) -> Vec<String> {
        vec!["assessment_date".to_string()]
    }

    fn open_schema(&self) -> bool {
        true
    }

    fn extract(&self, document: &SourceDocument) -> Vec<FieldSet> {
        let found = document.pages.iter().find_map(|page| {
            let date = self.anchor.captures(&page.text)?.get(1).map(|m| m.as_str().to_string());
            Some((page, date))
        });
        let Some((page, date)) = found else {
            tracing::warn!(file = %document.filename, "Clinical card anchor not found");
            return Vec::new();
        };

        if page.tables.len() < self.tables.len() {
            tracing::warn!(
                file = %document.filename,
                page = page.number,
                found = page.tables.len(),
                expected = self.tables.len(),
                "Fewer score tables than expected"
            );
        }

        let mut fields = vec![Field::new("assessment_date", FieldValue::from(date))];
        let input = RuleInput::with_tables(&document.filename, &page.text, &page.tables);
        fields.extend(apply_rules(&self.tables, &input));
        vec![fields]
    }

    fn assembler(&self) -> &RecordAssembler {
        &self.assembler
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::document::pdf::fixtures::make_cell_pdf;
    use crate::pipeline::document::LopdfLoader;

    fn make_extractor() -> ClinicalCardExtractor {
        ClinicalCardExtractor::new(&ClinicalCardConfig::default()).unwrap()
    }

    fn make_card() -> String {
        [
            "Daily Clinical Card 03/14/2024",
            "Emotion   Sad   Anxious",
            "Today     3     5",
            "",
            "Support   Sleep   Water",
            "Today     1       0",
            "",
            "Coping    Walk",
            "Today     2",
        ]
        .join("\n")
    }

    fn value_of<'a>(fields: &'a [Field], name: &str) -> Option<&'a FieldValue> {
        fields.iter().find(|f| f.name == name).map(|f| &f.value)
    }

    #[test]
    fn reads_date_and_prefixed_table_cells() {
        let doc = SourceDocument::from_pages("card.pdf", &["cover page", &make_card()]);
        let rows = make_extractor().extract(&doc);
        assert_eq!(rows.len(), 1);
        let fields = &rows[0];
        assert_eq!(value_of(fields, "assessment_date"), Some(&FieldValue::text("03/14/2024")));
        assert_eq!(value_of(fields, "emo_Sad"), Some(&FieldValue::Integer(3)));
        assert_eq!(value_of(fields, "emo_Anxious"), Some(&FieldValue::Integer(5)));
        assert_eq!(value_of(fields, "sup_Sleep"), Some(&FieldValue::Integer(1)));
        assert_eq!(value_of(fields, "sup_Water"), Some(&FieldValue::Integer(0)));
        assert_eq!(value_of(fields, "cop_Walk"), Some(&FieldValue::Integer(2)));
    }

    #[test]
    fn card_drawn_cell_by_cell_reads_every_table() {
        let bytes = make_cell_pdf(
            &[
                &["Daily Clinical Card 03/14/2024"],
                &[],
                &["Emotion", "Sad", "Anxious"],
                &["Today", "3", "5"],
                &[],
                &["Support", "Sleep", "Water"],
                &["Today", "1", "0"],
                &[],
                &["Coping", "Walk"],
                &["Today", "2"],
            ],
            80,
        );
        let doc = LopdfLoader.load_bytes("card.pdf", &bytes).unwrap();
        let rows = make_extractor().extract(&doc);
        assert_eq!(rows.len(), 1);
        let fields = &rows[0];
        assert_eq!(value_of(fields, "assessment_date"), Some(&FieldValue::text("03/14/2024")));
        assert_eq!(value_of(fields, "emo_Anxious"), Some(&FieldValue::Integer(5)));
        assert_eq!(value_of(fields, "sup_Sleep"), Some(&FieldValue::Integer(1)));
        assert_eq!(value_of(fields, "sup_Water"), Some(&FieldValue::Integer(0)));
        assert_eq!(value_of(fields, "cop_Walk"), Some(&FieldValue::Integer(2)));
    }

    #[test]
    fn missing_tables_still_yield_date() {
        let doc = SourceDocument::from_pages("card.pdf", &["Daily Clinical Card 03/14/2024\nno tables today"]);
        let rows = make_extractor().extract(&doc);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].len(), 1);
        assert_eq!(rows[0][0], Field::new("assessment_date", FieldValue::text("03/14/2024")));
    }

    #[test]
    fn absent_anchor_yields_no_rows() {
        let doc = SourceDocument::from_pages("other.pdf", &["Progress note", "nothing"]);
        assert!(make_extractor().extract(&doc).is_empty());
    }

    #[test]
    fn open_schema_with_date_first() {
        let extractor = make_extractor();
        assert!(extractor.open_schema());
        assert_eq!(extractor.columns(), vec!["assessment_date"]);
    }
}
