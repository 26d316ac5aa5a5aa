//! Biopsychosocial intake assessment. One record per document: dates and
//! age, motivation statements, treatment history, drugs of choice, craving
//! score and the eight dimension scores with their total.

use chrono::NaiveDate;
use regex::Regex;

use super::{DocumentFamily, FamilyExtractor, FieldSet};
use crate::config::{BiopsychosocialConfig, ConfigError};
use crate::pipeline::assemble::RecordAssembler;
use crate::pipeline::document::SourceDocument;
use crate::pipeline::rules::{apply_rules, ExtractionRule, Field, FieldValue, RuleInput, Strategy};
use crate::pipeline::section::{locate, Anchor};

/// Dimension score columns, in document order.
pub const SCORE_COLUMNS: [&str; 8] = [
    "bps_problems",
    "bps_medical",
    "bps_employment",
    "bps_peer_support",
    "bps_drug_alcohol",
    "bps_legal",
    "bps_family",
    "bps_mh",
];

const TOTAL: &str = "bps_total";
const DRUGS_OF_CHOICE: &str = "drugs_of_choice";

pub struct BiopsychosocialExtractor {
    assessment_date: Regex,
    birthdate: Regex,
    date_format: String,
    motivation_start: Anchor,
    motivation_end: Anchor,
    scores_start: String,
    scores_end: String,
    rules: Vec<ExtractionRule>,
    scores: ExtractionRule,
    assembler: RecordAssembler,
}

impl BiopsychosocialExtractor {
    pub fn new(config: &BiopsychosocialConfig) -> Result<Self, ConfigError> {
        let assessment_date = Regex::new(&config.assessment_date)
            .map_err(ConfigError::pattern("biopsychosocial.assessment_date"))?;
        let birthdate =
            Regex::new(&config.birthdate).map_err(ConfigError::pattern("biopsychosocial.birthdate"))?;
        let prev_treatments = Regex::new(&config.prev_treatments)
            .map_err(ConfigError::pattern("biopsychosocial.prev_treatments"))?;
        let craving_score = Regex::new(&config.craving_score)
            .map_err(ConfigError::pattern("biopsychosocial.craving_score"))?;
        let drugs_of_choice = Regex::new(&format!(
            r"{}\s*([^\n]*(?:\n[ \t][^\n]*)*)",
            regex::escape(&config.drugs_of_choice)
        ))
        .map_err(ConfigError::pattern("biopsychosocial.drugs_of_choice"))?;
        let score_value = Regex::new(r"\((\d+)\)").map_err(ConfigError::pattern("biopsychosocial.scores"))?;

        let rules = vec![
            ExtractionRule::new(
                "birthdate",
                Strategy::RegexCapture {
                    pattern: birthdate.clone(),
                    group: 1,
                },
            ),
            ExtractionRule::new(
                "num_prev_treatments",
                Strategy::BoundedCapture {
                    pattern: prev_treatments,
                    group: 1,
                    range: 0..=i64::MAX,
                },
            ),
            ExtractionRule::new(
                DRUGS_OF_CHOICE,
                Strategy::RegexCapture {
                    pattern: drugs_of_choice,
                    group: 1,
                },
            ),
            ExtractionRule::new(
                "drug_craving_score",
                Strategy::BoundedCapture {
                    pattern: craving_score,
                    group: 1,
                    range: 0..=10,
                },
            ),
        ];
        let scores = ExtractionRule::new(
            TOTAL,
            Strategy::CaptureSeries {
                pattern: score_value,
                columns: SCORE_COLUMNS.iter().map(|c| c.to_string()).collect(),
            },
        );

        Ok(Self {
            assessment_date,
            birthdate,
            date_format: config.date_format.clone(),
            motivation_start: Anchor::literal(&config.motivation_start),
            motivation_end: Anchor::literal(&config.motivation_end),
            scores_start: config.scores_start.clone(),
            scores_end: config.scores_end.clone(),
            rules,
            scores,
            assembler: RecordAssembler::new().alias("assessment_date", "assmt_dt"),
        })
    }

    /// Whole years between birth and assessment, counted as days / 365.
    fn age(&self, assessed: &str, born: &str, source: &str) -> FieldValue {
        let parse = |s: &str| NaiveDate::parse_from_str(s, &self.date_format);
        match (parse(assessed), parse(born)) {
            (Ok(assessed), Ok(born)) if born <= assessed => {
                FieldValue::Integer((assessed - born).num_days().div_euclid(365))
            }
            (Ok(_), Ok(_)) => {
                tracing::warn!(file = source, "Birthdate after assessment date, age left empty");
                FieldValue::Null
            }
            _ => {
                tracing::warn!(file = source, "Unparseable date, age left empty");
                FieldValue::Null
            }
        }
    }

    /// First two non-empty lines of the motivation section, taken from the
    /// first page that carries both of its anchors.
    fn motivations(&self, document: &SourceDocument) -> [FieldValue; 2] {
        let section = document
            .pages
            .iter()
            .filter(|page| anchors_on(&page.text, &self.motivation_start, &self.motivation_end))
            .find_map(|page| locate(&page.text, &self.motivation_start, &self.motivation_end));

        let mut lines = section
            .into_iter()
            .flat_map(str::lines)
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(FieldValue::text);
        let external = lines.next().unwrap_or(FieldValue::Null);
        let internal = lines.next().unwrap_or(FieldValue::Null);
        if internal.is_null() {
            tracing::debug!(file = %document.filename, "Motivation statements incomplete");
        }
        [external, internal]
    }

    /// Text between the score anchors; both must be present, in order.
    fn score_block<'a>(&self, text: &'a str) -> Option<&'a str> {
        let start = text.find(self.scores_start.as_str())? + self.scores_start.len();
        let end = text[start..].find(self.scores_end.as_str())?;
        Some(&text[start..start + end])
    }
}

fn anchors_on(text: &str, start: &Anchor, end: &Anchor) -> bool {
    let contains = |anchor: &Anchor| match anchor {
        Anchor::Literal(needle) => text.contains(needle.as_str()),
        Anchor::Pattern(regex) => regex.is_match(text),
    };
    contains(start) && contains(end)
}

impl FamilyExtractor for BiopsychosocialExtractor {
    fn family(&self) -> DocumentFamily {
        DocumentFamily::Biopsychosocial
    }

    fn columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = [
            "assmt_dt",
            "birthdate",
            "age",
            "ext_motivation",
            "int_motivation",
            "num_prev_treatments",
            DRUGS_OF_CHOICE,
            "drug_craving_score",
        ]
        .iter()
        .map(|c| c.to_string())
        .collect();
        columns.extend(SCORE_COLUMNS.iter().map(|c| c.to_string()));
        columns.push(TOTAL.to_string());
        columns
    }

    fn extract(&self, document: &SourceDocument) -> Vec<FieldSet> {
        let source = document.filename.as_str();
        let text = document.full_text();
        let Some(assessed) = self
            .assessment_date
            .captures(&text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
        else {
            tracing::warn!(file = source, "Biopsychosocial assessment header not found");
            return Vec::new();
        };

        let input = RuleInput::text(source, &text);
        let mut fields = vec![Field::new("assessment_date", FieldValue::text(assessed.as_str()))];

        let age = match self.birthdate.captures(&text).and_then(|caps| caps.get(1)) {
            Some(born) => self.age(&assessed, born.as_str(), source),
            None => FieldValue::Null,
        };

        for field in apply_rules(&self.rules, &input) {
            let is_birthdate = field.name == "birthdate";
            let field = if field.name == DRUGS_OF_CHOICE {
                let value = match field.value {
                    FieldValue::Text(raw) => FieldValue::Text(raw.split_whitespace().collect::<Vec<_>>().join(" ")),
                    other => other,
                };
                Field::new(DRUGS_OF_CHOICE, value)
            } else {
                field
            };
            fields.push(field);
            if is_birthdate {
                fields.push(Field::new("age", age.clone()));
            }
        }

        let [external, internal] = self.motivations(document);
        fields.push(Field::new("ext_motivation", external));
        fields.push(Field::new("int_motivation", internal));

        let block = self.score_block(&text);
        if block.is_none() {
            tracing::warn!(file = source, "Dimension score anchors missing, scores left empty");
        }
        let scores = self.scores.apply(&RuleInput::text(source, block.unwrap_or("")));
        if block.is_some() && scores.iter().all(|f| f.value.is_null()) {
            tracing::warn!(file = source, "Too few dimension scores, scores left empty");
        }
        fields.extend(scores);

        vec![fields]
    }

    fn assembler(&self) -> &RecordAssembler {
        &self.assembler
    }
}
