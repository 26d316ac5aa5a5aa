//! AHCM social-needs screening survey.
//!
//! The numbered questions after the tool's introduction are scanned into
//! (question, answer) pairs. Answers are keyed by question identity, so a
//! skipped or reordered question never shifts the others into the wrong
//! column. Column rules then canonicalize the answers.

use regex::Regex;

use super::{DocumentFamily, FamilyExtractor, FieldSet};
use crate::config::{AhcmConfig, ConfigError};
use crate::pipeline::assemble::{ColumnRule, PostStep, QuestionIdentity, RecordAssembler};
use crate::pipeline::document::SourceDocument;
use crate::pipeline::rules::{
    ExtractionRule, Field, FieldValue, PhraseClassifier, QuestionScanner, Strategy, TextCleaner,
};
use crate::pipeline::section::{locate_until, numbered_heading_above, Anchor};

pub struct AhcmExtractor {
    anchor: Anchor,
    first_question: String,
    max_question: u32,
    scanner: QuestionScanner,
    columns: Vec<String>,
    assembler: RecordAssembler,
}

impl AhcmExtractor {
    pub fn new(config: &AhcmConfig) -> Result<Self, ConfigError> {
        let point_total =
            Regex::new(&config.point_total).map_err(ConfigError::pattern("ahcm.point_total"))?;
        let identity = QuestionIdentity::new(&config.questions);
        let columns = identity.columns().to_vec();

        let in_place = |column: &str, strategy: Strategy| ColumnRule::in_place(ExtractionRule::new(column, strategy));
        let labels = |labels: &[String]| Strategy::FrequencyLabel {
            labels: labels.to_vec(),
        };
        let exercise = || Strategy::BoundedNumeric {
            limit: config.exercise_limit,
            over_limit: "N/A".into(),
        };
        let score = || Strategy::BoundedCapture {
            pattern: point_total.clone(),
            group: 1,
            range: 0..=99,
        };

        let mut assembler = RecordAssembler::new()
            .questions(identity)
            .column_rule(in_place("living_situation", Strategy::Classify(PhraseClassifier::living_situation())));
        for column in ["utility_shutoff_threat", "cognitive_difficulty", "errand_difficulty"] {
            assembler = assembler.column_rule(in_place(column, Strategy::YesNo));
        }
        for column in ["abuse_physical", "abuse_verbal", "abuse_threats", "abuse_yelling"] {
            assembler = assembler.column_rule(in_place(column, labels(&config.abuse_labels)));
        }
        assembler = assembler.column_rule(in_place(
            "financial_strain",
            Strategy::FreeTextCleanup {
                strip: vec![config.financial_prompt.clone()],
            },
        ));
        for column in ["binge_drinking", "tobacco_use", "prescription_misuse", "illegal_drug_use_count"] {
            assembler = assembler.column_rule(in_place(column, labels(&config.substance_labels)));
        }
        let assembler = assembler
            .column_rule(in_place("exercise_days_per_week", exercise()))
            .column_rule(in_place("exercise_minutes_per_day", exercise()))
            .column_rule(in_place("mental_health_score", score()))
            .column_rule(ColumnRule::derived(
                "mental_health_depressed",
                ExtractionRule::new("mental_health_score", score()),
            ))
            .column_rule(in_place("mental_health_interest", labels(&config.screening_labels)))
            .column_rule(in_place("mental_health_depressed", labels(&config.screening_labels)))
            .post(PostStep::TidyText)
            .post(PostStep::RemoveFrom {
                column: "housing_problems".into(),
                pattern: ".".into(),
            });

        Ok(Self {
            anchor: Anchor::literal(&config.anchor),
            first_question: config.first_question.clone(),
            max_question: config.max_question,
            scanner: QuestionScanner::new(
                config.max_question,
                config.split_question,
                TextCleaner::new(&config.boilerplate),
            ),
            columns,
            assembler,
        })
    }
}

impl FamilyExtractor for AhcmExtractor {
    fn family(&self) -> DocumentFamily {
        DocumentFamily::Ahcm
    }

    fn columns(&self) -> Vec<String> {
        self.columns.clone()
    }

    fn open_schema(&self) -> bool {
        true
    }

    fn extract(&self, document: &SourceDocument) -> Vec<FieldSet> {
        let text = document.full_text();
        let Some(section) = locate_until(&text, &self.anchor, numbered_heading_above(self.max_question)) else {
            tracing::warn!(file = %document.filename, "AHCM screening section not found");
            return Vec::new();
        };
        let section = match section.find(self.first_question.as_str()) {
            Some(at) => &section[at..],
            None => section,
        };

        let entries = self.scanner.scan(section);
        if entries.is_empty() {
            tracing::warn!(file = %document.filename, "AHCM section has no numbered questions");
            return Vec::new();
        }
        tracing::debug!(file = %document.filename, questions = entries.len(), "AHCM questions scanned");

        let fields = entries
            .into_iter()
            .map(|entry| Field::new(entry.question, FieldValue::Text(entry.answer)))
            .collect();
        vec![fields]
    }

    fn assembler(&self) -> &RecordAssembler {
        &self.assembler
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::assemble::AssessmentRecord;
    use crate::pseudonym::SubjectId;

    fn make_extractor() -> AhcmExtractor {
        AhcmExtractor::new(&AhcmConfig::default()).unwrap()
    }

    fn make_survey() -> String {
        [
            "Who should use the AHC HRSN Screening Tool?",
            "Staff instructions follow.",
            "3. Should this instruction be skipped? yes it should",
            "1. What is your living situation today?",
            "\" I have a steady place to live",
            "2. Think about the place you live. Do you have problems with any of the following?",
            "\" Pests such as bugs, ants, or mice. \" Mold.",
            "5. In the past 12 months, has lack of reliable transportation kept you from medical appointments, meetings, work or from getting things needed for daily living?",
            "No",
            "6. In the past 12 months has the electric, gas, oil, or water company threatened to shut off services in your home?",
            "Yes, a shutoff notice",
            "7. How often does anyone, including family and friends, physically hurt you?",
            "Never (1)",
            "11. How hard is it for you to pay for the very basics like food, housing, medical care, and heating? Would you say it is: Somewhat hard",
            "17. In the last 30 days, other than the activities you did for work, on average, how many days per week did you engage in moderate exercise (like walking fast, running, jogging, dancing, swimming, biking, or other similar activities)?",
            "3 days",
            "18. On average, how many minutes did you usually spend exercising at this level on one of those days?",
            "200 minutes",
            "19. How many times in the past 12 months have you had 5 or more drinks in a day (males) or 4 or more drinks in a day (females)?",
            "Once or Twice (2)",
            "23. Over the past 2 weeks, how often have you been bothered by any of the following problems?",
            "a. Little interest or pleasure in doing things? Several days (1)",
            "b. Feeling down, depressed, or hopeless? More than half the days (2) Point Total: (3)",
            "24. Favourite colour?",
            "Blue",
            "27. Is this past the end? ignored",
        ]
        .join("\n")
    }

    fn make_record(text: &str) -> AssessmentRecord {
        let extractor = make_extractor();
        let doc = SourceDocument::from_pages("ahcm.pdf", &[text]);
        let rows = extractor.extract(&doc);
        assert_eq!(rows.len(), 1);
        extractor
            .assembler()
            .assemble(rows, &SubjectId::Unidentified, "ahcm.pdf")
            .remove(0)
    }

    fn text_of<'a>(record: &'a AssessmentRecord, column: &str) -> Option<&'a str> {
        record.get(column).and_then(FieldValue::as_text)
    }

    #[test]
    fn answers_land_in_canonical_columns() {
        let record = make_record(&make_survey());
        assert_eq!(text_of(&record, "living_situation"), Some("Stable housing"));
        assert_eq!(text_of(&record, "food_insecurity_and_transport_issues"), Some("No"));
        assert_eq!(text_of(&record, "utility_shutoff_threat"), Some("Yes"));
        assert_eq!(text_of(&record, "abuse_physical"), Some("Never"));
        assert_eq!(text_of(&record, "financial_strain"), Some("Somewhat hard"));
        assert_eq!(text_of(&record, "binge_drinking"), Some("Once or Twice"));
    }

    #[test]
    fn skipped_questions_do_not_shift_columns() {
        let record = make_record(&make_survey());
        assert!(record.get("abuse_verbal").is_none());
        assert!(record.get("want_work_help").is_none());
        assert_eq!(text_of(&record, "abuse_physical"), Some("Never"));
    }

    #[test]
    fn exercise_answers_are_bounded() {
        let record = make_record(&make_survey());
        assert_eq!(record.get("exercise_days_per_week"), Some(&FieldValue::Integer(3)));
        assert_eq!(text_of(&record, "exercise_minutes_per_day"), Some("N/A"));
    }

    #[test]
    fn split_mental_health_question() {
        let record = make_record(&make_survey());
        assert_eq!(text_of(&record, "mental_health_interest"), Some("Several days"));
        assert_eq!(text_of(&record, "mental_health_depressed"), Some("More than half the days"));
        assert_eq!(record.get("mental_health_score"), Some(&FieldValue::Integer(3)));
    }

    #[test]
    fn housing_answer_tidied() {
        let record = make_record(&make_survey());
        assert_eq!(
            text_of(&record, "housing_problems"),
            Some("Pests such as bugs, ants, or mice // Mold")
        );
    }

    #[test]
    fn unknown_question_kept_and_bound_respected() {
        let record = make_record(&make_survey());
        assert_eq!(text_of(&record, "favourite colour"), Some("Blue"));
        assert!(record.fields.iter().all(|f| !f.name.contains("past the end")));
        assert!(record.fields.iter().all(|f| !f.name.contains("instruction")));
    }

    #[test]
    fn missing_anchor_yields_no_rows() {
        let doc = SourceDocument::from_pages("ahcm.pdf", &["1. What is your living situation today? Car"]);
        assert!(make_extractor().extract(&doc).is_empty());
    }

    #[test]
    fn anchor_without_questions_yields_no_rows() {
        let doc = SourceDocument::from_pages("ahcm.pdf", &["Who should use the AHC HRSN Screening Tool?\nNo answers recorded"]);
        assert!(make_extractor().extract(&doc).is_empty());
    }

    #[test]
    fn columns_lead_with_living_situation() {
        let extractor = make_extractor();
        assert!(extractor.open_schema());
        assert_eq!(extractor.columns()[0], "living_situation");
    }
}
