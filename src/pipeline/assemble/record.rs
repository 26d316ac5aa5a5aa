use std::collections::HashMap;

use super::consolidate::ConsolidationMap;
use super::identity::QuestionIdentity;
use crate::pipeline::rules::normalize::tidy_answer;
use crate::pipeline::rules::{ExtractionRule, Field, FieldValue, RuleInput};
use crate::pseudonym::SubjectId;

/// One output row: a subject plus named values.
#[derive(Debug, Clone, PartialEq)]
pub struct AssessmentRecord {
    pub subject: SubjectId,
    pub fields: Vec<Field>,
}

impl AssessmentRecord {
    pub fn new(subject: SubjectId) -> Self {
        Self {
            subject,
            fields: Vec::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|f| f.name == name).map(|f| &f.value)
    }

    /// Replace an existing field or append a new one.
    pub fn set(&mut self, name: &str, value: FieldValue) {
        match self.fields.iter_mut().find(|f| f.name == name) {
            Some(field) => field.value = value,
            None => self.fields.push(Field::new(name, value)),
        }
    }
}

/// Derive `rule.field` from the value in `source`. Rules read the values as
/// they were before any column rule ran.
#[derive(Debug, Clone)]
pub struct ColumnRule {
    pub source: String,
    pub rule: ExtractionRule,
}

impl ColumnRule {
    /// A rule that rewrites its own column.
    pub fn in_place(rule: ExtractionRule) -> Self {
        Self {
            source: rule.field.clone(),
            rule,
        }
    }

    pub fn derived(source: impl Into<String>, rule: ExtractionRule) -> Self {
        Self {
            source: source.into(),
            rule,
        }
    }
}

/// `target` = consolidation of the text in `source`.
#[derive(Debug, Clone)]
pub struct Consolidation {
    pub source: String,
    pub target: String,
    pub map: ConsolidationMap,
}

/// Whole-record passes run after the column rules.
#[derive(Debug, Clone)]
pub enum PostStep {
    /// `tidy_answer` on every text value.
    TidyText,
    /// Remove every occurrence of `pattern` from one column, then trim.
    RemoveFrom { column: String, pattern: String },
}

/// Per-family assembly: renames, consolidations, column rules, post steps.
#[derive(Debug, Clone, Default)]
pub struct RecordAssembler {
    aliases: HashMap<String, String>,
    questions: Option<QuestionIdentity>,
    consolidations: Vec<Consolidation>,
    column_rules: Vec<ColumnRule>,
    post: Vec<PostStep>,
}

impl RecordAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rename a semantic field to its output column.
    pub fn alias(mut self, field: &str, column: &str) -> Self {
        self.aliases.insert(field.to_string(), column.to_string());
        self
    }

    /// Rename survey question text to canonical columns.
    pub fn questions(mut self, identity: QuestionIdentity) -> Self {
        self.questions = Some(identity);
        self
    }

    pub fn consolidate(mut self, source: &str, target: &str, map: ConsolidationMap) -> Self {
        self.consolidations.push(Consolidation {
            source: source.to_string(),
            target: target.to_string(),
            map,
        });
        self
    }

    pub fn column_rule(mut self, rule: ColumnRule) -> Self {
        self.column_rules.push(rule);
        self
    }

    pub fn post(mut self, step: PostStep) -> Self {
        self.post.push(step);
        self
    }

    pub fn question_identity(&self) -> Option<&QuestionIdentity> {
        self.questions.as_ref()
    }

    /// Output name of an extracted field.
    pub fn column_name(&self, field: &str) -> String {
        if let Some(column) = self.aliases.get(field) {
            return column.clone();
        }
        match &self.questions {
            Some(identity) => identity.column_for(field),
            None => field.to_string(),
        }
    }

    /// One record per field set, each tagged with `subject`.
    pub fn assemble(&self, extracted: Vec<Vec<Field>>, subject: &SubjectId, source: &str) -> Vec<AssessmentRecord> {
        extracted
            .into_iter()
            .map(|fields| self.assemble_one(fields, subject, source))
            .collect()
    }

    fn assemble_one(&self, fields: Vec<Field>, subject: &SubjectId, source: &str) -> AssessmentRecord {
        let mut record = AssessmentRecord::new(subject.clone());

        for field in fields {
            let column = self.column_name(&field.name);
            let occupied = record.get(&column).is_some_and(|v| !v.is_null());
            if occupied {
                tracing::debug!(file = source, column = %column, "Duplicate column, keeping first value");
            } else {
                record.set(&column, field.value);
            }
        }

        for step in &self.consolidations {
            let value = match record.get(&step.source) {
                Some(FieldValue::Null) | None => FieldValue::Null,
                Some(value) => FieldValue::Text(step.map.lookup(&value.render())),
            };
            record.set(&step.target, value);
        }

        let snapshot = record.clone();
        for column_rule in &self.column_rules {
            let Some(value) = snapshot.get(&column_rule.source) else {
                continue;
            };
            let text = value.render();
            let input = RuleInput::text(source, &text);
            for field in column_rule.rule.apply(&input) {
                record.set(&field.name, field.value);
            }
        }

        for step in &self.post {
            match step {
                PostStep::TidyText => {
                    for field in &mut record.fields {
                        if let FieldValue::Text(text) = &mut field.value {
                            *text = tidy_answer(text);
                        }
                    }
                }
                PostStep::RemoveFrom { column, pattern } => {
                    let cleaned = match record.get(column) {
                        Some(FieldValue::Text(text)) => text.replace(pattern.as_str(), ""),
                        _ => continue,
                    };
                    record.set(column, FieldValue::text(cleaned.trim()));
                }
            }
        }

        record
    }
}

#[cfg(test)]
mod tests {
    use regex::Regex;

    use super::*;
    use crate::config::{AhcmConfig, SubstanceHistoryConfig};
    use crate::pipeline::rules::Strategy;
    use crate::pseudonym::PatientToken;

    fn make_subject() -> SubjectId {
        SubjectId::Unidentified
    }

    fn text(name: &str, value: &str) -> Field {
        Field::new(name, FieldValue::text(value))
    }

    #[test]
    fn aliases_rename_semantic_fields() {
        let assembler = RecordAssembler::new().alias("assessment_date", "assmt_dt");
        let records = assembler.assemble(
            vec![vec![text("assessment_date", "1/2/2024"), text("birthdate", "3/4/1990")]],
            &make_subject(),
            "bps.pdf",
        );
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("assmt_dt"), Some(&FieldValue::text("1/2/2024")));
        assert_eq!(records[0].get("birthdate"), Some(&FieldValue::text("3/4/1990")));
        assert!(records[0].get("assessment_date").is_none());
    }

    #[test]
    fn consolidation_adds_target_column() {
        let map = ConsolidationMap::new(&SubstanceHistoryConfig::default().pattern_of_use);
        let assembler = RecordAssembler::new().consolidate("pattern_of_use", "pattern_of_use_consolidated", map);
        let records = assembler.assemble(
            vec![
                vec![text("pattern_of_use", "socially")],
                vec![text("pattern_of_use", "weekends only")],
                vec![Field::new("pattern_of_use", FieldValue::Null)],
            ],
            &make_subject(),
            "s.pdf",
        );
        assert_eq!(records[0].get("pattern_of_use_consolidated"), Some(&FieldValue::text("Experimental")));
        assert_eq!(records[1].get("pattern_of_use_consolidated"), Some(&FieldValue::text("weekends only")));
        assert_eq!(records[2].get("pattern_of_use_consolidated"), Some(&FieldValue::Null));
    }

    #[test]
    fn survey_questions_land_in_same_column_regardless_of_order() {
        let assembler = RecordAssembler::new().questions(QuestionIdentity::new(&AhcmConfig::default().questions));
        let a = vec![
            text("What is your living situation today?", "Shelter"),
            text("Do you want help with school or training?", "No"),
        ];
        let b = vec![
            text("Do you want help with school or training?", "Yes"),
            text("What is your living situation today?", "Car"),
        ];
        let records = assembler.assemble(vec![a, b], &make_subject(), "a.pdf");
        assert_eq!(records[0].get("want_school_help"), Some(&FieldValue::text("No")));
        assert_eq!(records[1].get("want_school_help"), Some(&FieldValue::text("Yes")));
        assert_eq!(records[1].get("living_situation"), Some(&FieldValue::text("Car")));
    }

    #[test]
    fn column_rules_read_pre_rule_values() {
        let point_total = Regex::new(r"Point Total:\s*\((\d+)\)").unwrap();
        let assembler = RecordAssembler::new()
            .column_rule(ColumnRule::in_place(ExtractionRule::new(
                "depressed",
                Strategy::FrequencyLabel {
                    labels: vec!["Not at all".into()],
                },
            )))
            .column_rule(ColumnRule::derived(
                "depressed",
                ExtractionRule::new(
                    "score",
                    Strategy::BoundedCapture {
                        pattern: point_total,
                        group: 1,
                        range: 0..=99,
                    },
                ),
            ));
        let records = assembler.assemble(
            vec![vec![text("depressed", "Not at all (0) Point Total: (2)")]],
            &make_subject(),
            "a.pdf",
        );
        assert_eq!(records[0].get("depressed"), Some(&FieldValue::text("Not at all")));
        assert_eq!(records[0].get("score"), Some(&FieldValue::Integer(2)));
    }

    #[test]
    fn rules_skip_absent_columns() {
        let assembler = RecordAssembler::new().column_rule(ColumnRule::in_place(ExtractionRule::new(
            "utility_shutoff_threat",
            Strategy::YesNo,
        )));
        let records = assembler.assemble(vec![vec![text("other", "x")]], &make_subject(), "a.pdf");
        assert!(records[0].get("utility_shutoff_threat").is_none());
    }

    #[test]
    fn post_steps_tidy_text() {
        let assembler = RecordAssembler::new()
            .post(PostStep::TidyText)
            .post(PostStep::RemoveFrom {
                column: "housing_problems".into(),
                pattern: ".".into(),
            });
        let records = assembler.assemble(
            vec![vec![
                text("housing_problems", "\" Pests such as bugs. \" Mold."),
                Field::new("count", FieldValue::Integer(3)),
            ]],
            &make_subject(),
            "a.pdf",
        );
        assert_eq!(
            records[0].get("housing_problems"),
            Some(&FieldValue::text("Pests such as bugs // Mold"))
        );
        assert_eq!(records[0].get("count"), Some(&FieldValue::Integer(3)));
    }

    #[test]
    fn duplicate_columns_keep_first_value() {
        let assembler = RecordAssembler::new().alias("b", "a");
        let records = assembler.assemble(vec![vec![text("a", "first"), text("b", "second")]], &make_subject(), "a.pdf");
        assert_eq!(records[0].fields.len(), 1);
        assert_eq!(records[0].get("a"), Some(&FieldValue::text("first")));
    }

    #[test]
    fn records_carry_subject() {
        let subject = SubjectId::Pseudonym(PatientToken::for_test("abc123def456"));
        let records = RecordAssembler::new().assemble(vec![vec![], vec![]], &subject, "a.pdf");
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.subject == subject));
    }

    #[test]
    fn no_field_sets_no_records() {
        assert!(RecordAssembler::new().assemble(vec![], &make_subject(), "a.pdf").is_empty());
    }
}
