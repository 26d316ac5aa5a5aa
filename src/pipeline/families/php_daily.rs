//! PHP daily assessment: many dated, signed assessments per document.
//! One record per assessment, with emotion/skill/support keyword flags and
//! the craving rating.

use regex::Regex;

use super::{DocumentFamily, FamilyExtractor, FieldSet};
use crate::config::{ConfigError, PhpDailyConfig};
use crate::pipeline::assemble::RecordAssembler;
use crate::pipeline::document::SourceDocument;
use crate::pipeline::rules::{apply_rules, ExtractionRule, Field, FieldValue, KeywordGroup, RuleInput, Strategy};
use crate::pipeline::section::locate_all;

const EMOTION_WORDS: &str = "Matched Emotion Words";
const SKILL_WORDS: &str = "Match Skill Words";
const SUPPORT_WORDS: &str = "Match Support Words";
const CRAVING: &str = "Craving";

pub struct PhpDailyExtractor {
    header: Regex,
    terminator: Regex,
    rules: Vec<ExtractionRule>,
    columns: Vec<String>,
    assembler: RecordAssembler,
}

impl PhpDailyExtractor {
    pub fn new(config: &PhpDailyConfig) -> Result<Self, ConfigError> {
        let header = Regex::new(&config.header).map_err(ConfigError::pattern("php_daily.header"))?;
        let terminator =
            Regex::new(&config.terminator).map_err(ConfigError::pattern("php_daily.terminator"))?;
        let craving = Regex::new(&config.craving).map_err(ConfigError::pattern("php_daily.craving"))?;

        let emotions = KeywordGroup::new(&config.emotions).map_err(ConfigError::pattern("php_daily.emotions"))?;
        let skills = KeywordGroup::new(&config.skills).map_err(ConfigError::pattern("php_daily.skills"))?;
        let supports = KeywordGroup::new(&config.supports).map_err(ConfigError::pattern("php_daily.supports"))?;

        let mut columns: Vec<String> = ["assessment_date", EMOTION_WORDS, SKILL_WORDS, SUPPORT_WORDS, CRAVING]
            .iter()
            .map(|c| c.to_string())
            .collect();
        for group in [&emotions, &skills, &supports] {
            columns.extend(group.categories().iter().cloned());
        }

        let rules = vec![
            ExtractionRule::new(EMOTION_WORDS, Strategy::KeywordSet(emotions)),
            ExtractionRule::new(SKILL_WORDS, Strategy::KeywordSet(skills)),
            ExtractionRule::new(SUPPORT_WORDS, Strategy::KeywordSet(supports)),
            ExtractionRule::new(
                CRAVING,
                Strategy::BoundedCapture {
                    pattern: craving,
                    group: 1,
                    range: 0..=10,
                },
            ),
        ];

        Ok(Self {
            header,
            terminator,
            rules,
            columns,
            assembler: RecordAssembler::new(),
        })
    }
}

impl FamilyExtractor for PhpDailyExtractor {
    fn family(&self) -> DocumentFamily {
        DocumentFamily::PhpDaily
    }

    fn columns(&self) -> Vec<String> {
        self.columns.clone()
    }

    fn extract(&self, document: &SourceDocument) -> Vec<FieldSet> {
        let text = document.full_text();
        let sections = locate_all(&text, &self.header, &self.terminator);
        if sections.is_empty() {
            tracing::warn!(file = %document.filename, "No signed PHP daily assessments found");
            return Vec::new();
        }
        tracing::debug!(file = %document.filename, assessments = sections.len(), "PHP assessments located");

        sections
            .iter()
            .map(|section| {
                let date = section.header.get(1).map(|m| m.as_str().to_string());
                let mut fields = vec![Field::new("assessment_date", FieldValue::from(date))];
                fields.extend(apply_rules(&self.rules, &RuleInput::text(&document.filename, section.body)));
                fields
            })
            .collect()
    }

    fn assembler(&self) -> &RecordAssembler {
        &self.assembler
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_extractor() -> PhpDailyExtractor {
        PhpDailyExtractor::new(&PhpDailyConfig::default()).unwrap()
    }

    fn value_of<'a>(fields: &'a [Field], name: &str) -> &'a FieldValue {
        &fields.iter().find(|f| f.name == name).unwrap().value
    }

    fn make_document() -> SourceDocument {
        let first = "PHP Daily Assessment 02/05/2024 09:15 AM\n\
                     Client reports feeling anxious and sad this morning.\n\
                     Used opposite action and slept 7 hours.\n\
                     Cravings/impulse to use: 6/10\n\
                     Jane Doe, ACSW1234\n";
        let second = "PHP Daily Assessment 02/06/2024 10:00 AM\n\
                      Client was happy, went for a workout.\n\
                      Craving/impulse rating: 14/10\n\
                      Jane Doe, ACSW1234\n\
                      PHP Daily Assessment 02/07/2024 10:00 AM\n\
                      draft never signed";
        SourceDocument::from_pages("php.pdf", &[first, second])
    }

    #[test]
    fn one_row_per_signed_assessment() {
        let rows = make_extractor().extract(&make_document());
        assert_eq!(rows.len(), 2);
        assert_eq!(value_of(&rows[0], "assessment_date"), &FieldValue::text("02/05/2024"));
        assert_eq!(value_of(&rows[1], "assessment_date"), &FieldValue::text("02/06/2024"));
    }

    #[test]
    fn keyword_flags_and_matches() {
        let rows = make_extractor().extract(&make_document());
        let first = &rows[0];
        assert_eq!(value_of(first, "Anxiety"), &FieldValue::Bool(true));
        assert_eq!(value_of(first, "Sad"), &FieldValue::Bool(true));
        assert_eq!(value_of(first, "Joy"), &FieldValue::Bool(false));
        assert_eq!(value_of(first, "Opposite Action"), &FieldValue::Bool(true));
        assert_eq!(value_of(first, "Sleep"), &FieldValue::Bool(true));
        assert_eq!(value_of(first, SUPPORT_WORDS), &FieldValue::text("slept"));

        let second = &rows[1];
        assert_eq!(value_of(second, "Joy"), &FieldValue::Bool(true));
        assert_eq!(value_of(second, "Exercise"), &FieldValue::Bool(true));
        assert_eq!(value_of(second, EMOTION_WORDS), &FieldValue::text("happy"));
    }

    #[test]
    fn craving_is_bounded() {
        let rows = make_extractor().extract(&make_document());
        assert_eq!(value_of(&rows[0], CRAVING), &FieldValue::Integer(6));
        assert!(value_of(&rows[1], CRAVING).is_null());
    }

    #[test]
    fn no_assessments_no_rows() {
        let doc = SourceDocument::from_pages("php.pdf", &["Weekly summary only"]);
        assert!(make_extractor().extract(&doc).is_empty());
    }

    #[test]
    fn columns_follow_keyword_tables() {
        let columns = make_extractor().columns();
        assert_eq!(&columns[..5], ["assessment_date", EMOTION_WORDS, SKILL_WORDS, SUPPORT_WORDS, CRAVING]);
        assert_eq!(columns[5], "Pain");
        assert_eq!(columns.len(), 5 + 10 + 9 + 9);
        assert_eq!(columns.last().map(String::as_str), Some("Therapy"));
    }
}
