//! Rule table types: values, fields, strategies.

use std::ops::RangeInclusive;

use regex::Regex;
use serde::Serialize;

use super::keywords::KeywordGroup;
use super::normalize::{self, PhraseClassifier};
use crate::pipeline::document::TableGrid;

// ═══════════════════════════════════════════
// Values
// ═══════════════════════════════════════════

/// A normalized field value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Integer(i64),
    Text(String),
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Cell rendering for tabular output.
    pub fn render(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(true) => "True".into(),
            Self::Bool(false) => "False".into(),
            Self::Integer(n) => n.to_string(),
            Self::Text(s) => s.clone(),
        }
    }
}

impl From<Option<i64>> for FieldValue {
    fn from(value: Option<i64>) -> Self {
        value.map_or(Self::Null, Self::Integer)
    }
}

impl From<Option<String>> for FieldValue {
    fn from(value: Option<String>) -> Self {
        value.map_or(Self::Null, Self::Text)
    }
}

/// One named value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub value: FieldValue,
}

impl Field {
    pub fn new(name: impl Into<String>, value: FieldValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

// ═══════════════════════════════════════════
// Rule input
// ═══════════════════════════════════════════

/// What a rule is evaluated against.
#[derive(Debug, Clone, Copy)]
pub struct RuleInput<'a> {
    /// Document name, for log context only.
    pub source: &'a str,
    pub text: &'a str,
    pub tables: &'a [TableGrid],
}

impl<'a> RuleInput<'a> {
    pub fn text(source: &'a str, text: &'a str) -> Self {
        Self {
            source,
            text,
            tables: &[],
        }
    }

    pub fn with_tables(source: &'a str, text: &'a str, tables: &'a [TableGrid]) -> Self {
        Self {
            source,
            text,
            tables,
        }
    }
}

// ═══════════════════════════════════════════
// Strategies
// ═══════════════════════════════════════════

/// How a rule turns its input into fields.
#[derive(Debug, Clone)]
pub enum Strategy {
    /// Trimmed text of capture `group`.
    RegexCapture { pattern: Regex, group: usize },
    /// Capture `group` parsed as an integer, kept only inside `range`.
    BoundedCapture {
        pattern: Regex,
        group: usize,
        range: RangeInclusive<i64>,
    },
    /// Every capture of group 1 as an integer: the first `columns.len()`
    /// fill `columns`, the last one fills the rule field. Fewer than
    /// `columns.len() + 1` captures nulls them all.
    CaptureSeries { pattern: Regex, columns: Vec<String> },
    /// Header row (minus first column) names the fields, prefixed; the first
    /// data row (minus first column) holds integer values.
    TableCellByHeader { table: usize, prefix: String },
    /// One boolean per category plus the matched words in the rule field.
    KeywordSet(KeywordGroup),
    /// Largest integer in the text, `over_limit` above `limit`.
    BoundedNumeric { limit: i64, over_limit: String },
    FrequencyLabel { labels: Vec<String> },
    YesNo,
    /// Remove fixed phrases and trim.
    FreeTextCleanup { strip: Vec<String> },
    Classify(PhraseClassifier),
}

/// A field name plus its strategy.
#[derive(Debug, Clone)]
pub struct ExtractionRule {
    pub field: String,
    pub strategy: Strategy,
}

impl ExtractionRule {
    pub fn new(field: impl Into<String>, strategy: Strategy) -> Self {
        Self {
            field: field.into(),
            strategy,
        }
    }

    /// Evaluate against one input. Misses yield nulls, never errors.
    pub fn apply(&self, input: &RuleInput<'_>) -> Vec<Field> {
        match &self.strategy {
            Strategy::RegexCapture { pattern, group } => {
                let value = capture(pattern, *group, input.text).map(|s| s.trim().to_string());
                if value.is_none() {
                    tracing::debug!(file = input.source, field = %self.field, "No match");
                }
                vec![self.field_value(value.into())]
            }
            Strategy::BoundedCapture {
                pattern,
                group,
                range,
            } => {
                let value = capture(pattern, *group, input.text)
                    .and_then(|s| s.trim().parse::<i64>().ok())
                    .filter(|n| range.contains(n));
                if value.is_none() {
                    tracing::debug!(file = input.source, field = %self.field, "No in-range match");
                }
                vec![self.field_value(value.into())]
            }
            Strategy::CaptureSeries { pattern, columns } => {
                let values: Vec<i64> = pattern
                    .captures_iter(input.text)
                    .filter_map(|caps| caps.get(1)?.as_str().parse().ok())
                    .collect();
                let complete = values.len() > columns.len();
                if !complete {
                    tracing::debug!(
                        file = input.source,
                        field = %self.field,
                        found = values.len(),
                        expected = columns.len() + 1,
                        "Too few values in series"
                    );
                }
                let mut fields: Vec<Field> = columns
                    .iter()
                    .enumerate()
                    .map(|(i, column)| {
                        let value = complete.then(|| values[i]);
                        Field::new(column.clone(), value.into())
                    })
                    .collect();
                let total = if complete { values.last().copied() } else { None };
                fields.push(self.field_value(total.into()));
                fields
            }
            Strategy::TableCellByHeader { table, prefix } => {
                let Some(grid) = input.tables.get(*table) else {
                    return Vec::new();
                };
                table_cells(grid, prefix, input.source)
            }
            Strategy::KeywordSet(group) => {
                let scan = group.scan(input.text);
                let mut fields = vec![self.field_value(FieldValue::Text(scan.matched_words()))];
                fields.extend(
                    scan.flags
                        .into_iter()
                        .map(|(name, flagged)| Field::new(name, FieldValue::Bool(flagged))),
                );
                fields
            }
            Strategy::BoundedNumeric { limit, over_limit } => {
                vec![self.field_value(normalize::max_number(input.text, *limit, over_limit))]
            }
            Strategy::FrequencyLabel { labels } => {
                let label = normalize::frequency_label(input.text, labels);
                vec![self.field_value(FieldValue::Text(label))]
            }
            Strategy::YesNo => {
                vec![self.field_value(FieldValue::text(normalize::yes_no(input.text)))]
            }
            Strategy::FreeTextCleanup { strip } => {
                let cleaned = normalize::strip_phrases(input.text, strip);
                vec![self.field_value(FieldValue::Text(cleaned))]
            }
            Strategy::Classify(classifier) => {
                vec![self.field_value(FieldValue::Text(classifier.classify(input.text)))]
            }
        }
    }

    fn field_value(&self, value: FieldValue) -> Field {
        Field::new(self.field.clone(), value)
    }
}

/// Evaluate a whole rule table in order.
pub fn apply_rules(rules: &[ExtractionRule], input: &RuleInput<'_>) -> Vec<Field> {
    rules.iter().flat_map(|rule| rule.apply(input)).collect()
}

fn capture<'t>(pattern: &Regex, group: usize, text: &'t str) -> Option<&'t str> {
    pattern
        .captures(text)
        .and_then(|caps| caps.get(group))
        .map(|m| m.as_str())
}

fn table_cells(grid: &TableGrid, prefix: &str, source: &str) -> Vec<Field> {
    let Some(header) = grid.header() else {
        return Vec::new();
    };
    let values = grid.rows.get(1).map(Vec::as_slice).unwrap_or(&[]);

    header
        .iter()
        .enumerate()
        .skip(1)
        .filter_map(|(column, name)| {
            let name = name.as_deref()?.replace('\n', " ");
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            let raw = values.get(column).and_then(|c| c.as_deref()).unwrap_or("");
            let value = match raw.trim().parse::<i64>() {
                Ok(n) => FieldValue::Integer(n),
                Err(_) => {
                    tracing::warn!(
                        file = source,
                        column = %format!("{prefix}{name}"),
                        "Table cell is not an integer, leaving it empty"
                    );
                    FieldValue::Null
                }
            };
            Some(Field::new(format!("{prefix}{name}"), value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PhpDailyConfig;

    fn make_input(text: &str) -> RuleInput<'_> {
        RuleInput::text("test.pdf", text)
    }

    fn make_grid(rows: &[&[&str]]) -> TableGrid {
        TableGrid::new(
            rows.iter()
                .map(|r| r.iter().map(|c| Some(c.to_string())).collect())
                .collect(),
        )
    }

    fn value_of<'a>(fields: &'a [Field], name: &str) -> &'a FieldValue {
        &fields.iter().find(|f| f.name == name).unwrap().value
    }

    #[test]
    fn regex_capture_trims() {
        let rule = ExtractionRule::new(
            "birthdate",
            Strategy::RegexCapture {
                pattern: Regex::new(r"Birthdate:\s*(\d{1,2}/\d{1,2}/\d{4})").unwrap(),
                group: 1,
            },
        );
        let fields = rule.apply(&make_input("Name: x\nBirthdate: 4/5/1980\n"));
        assert_eq!(fields, vec![Field::new("birthdate", FieldValue::text("4/5/1980"))]);
        assert!(rule.apply(&make_input("nothing"))[0].value.is_null());
    }

    #[test]
    fn bounded_capture_rejects_out_of_range() {
        let rule = ExtractionRule::new(
            "Craving",
            Strategy::BoundedCapture {
                pattern: Regex::new(r"(?i)Cravings?/impulse.*?:\s*(\d{1,2})/10").unwrap(),
                group: 1,
                range: 0..=10,
            },
        );
        assert_eq!(
            rule.apply(&make_input("Cravings/impulse rating: 7/10"))[0].value,
            FieldValue::Integer(7)
        );
        assert!(rule.apply(&make_input("craving/impulse: 12/10"))[0].value.is_null());
        assert!(rule.apply(&make_input("no rating"))[0].value.is_null());
    }

    #[test]
    fn capture_series_maps_first_and_last() {
        let rule = ExtractionRule::new(
            "total",
            Strategy::CaptureSeries {
                pattern: Regex::new(r"\((\d+)\)").unwrap(),
                columns: vec!["a".into(), "b".into()],
            },
        );
        let fields = rule.apply(&make_input("(1) (2) (3) (9)"));
        assert_eq!(value_of(&fields, "a"), &FieldValue::Integer(1));
        assert_eq!(value_of(&fields, "b"), &FieldValue::Integer(2));
        assert_eq!(value_of(&fields, "total"), &FieldValue::Integer(9));
    }

    #[test]
    fn capture_series_too_short_is_all_null() {
        let rule = ExtractionRule::new(
            "total",
            Strategy::CaptureSeries {
                pattern: Regex::new(r"\((\d+)\)").unwrap(),
                columns: vec!["a".into(), "b".into()],
            },
        );
        let fields = rule.apply(&make_input("(1) (2)"));
        assert_eq!(fields.len(), 3);
        assert!(fields.iter().all(|f| f.value.is_null()));
    }

    #[test]
    fn table_cells_use_header_names() {
        let grid = make_grid(&[&["Emotion", "Sad", "Happy\nface"], &["Today", "3", "x"]]);
        let rule = ExtractionRule::new(
            "emotions",
            Strategy::TableCellByHeader {
                table: 0,
                prefix: "emo_".into(),
            },
        );
        let tables = [grid];
        let fields = rule.apply(&RuleInput::with_tables("t.pdf", "", &tables));
        assert_eq!(
            fields,
            vec![
                Field::new("emo_Sad", FieldValue::Integer(3)),
                Field::new("emo_Happy face", FieldValue::Null),
            ]
        );
    }

    #[test]
    fn missing_table_yields_nothing() {
        let rule = ExtractionRule::new(
            "coping",
            Strategy::TableCellByHeader {
                table: 2,
                prefix: "cop_".into(),
            },
        );
        assert!(rule.apply(&make_input("")).is_empty());
    }

    #[test]
    fn keyword_set_emits_words_then_flags() {
        let group = KeywordGroup::new(&PhpDailyConfig::default().supports).unwrap();
        let rule = ExtractionRule::new("Match Support Words", Strategy::KeywordSet(group));
        let fields = rule.apply(&make_input("Slept 8 hours, drank water."));
        assert_eq!(fields[0], Field::new("Match Support Words", FieldValue::text("slept, water")));
        assert_eq!(value_of(&fields, "Sleep"), &FieldValue::Bool(true));
        assert_eq!(value_of(&fields, "Water"), &FieldValue::Bool(true));
        assert_eq!(value_of(&fields, "Love"), &FieldValue::Bool(false));
        assert_eq!(fields.len(), 10);
    }

    #[test]
    fn value_strategies() {
        let yes_no = ExtractionRule::new("q", Strategy::YesNo);
        assert_eq!(yes_no.apply(&make_input("Yes"))[0].value, FieldValue::text("Yes"));

        let freq = ExtractionRule::new(
            "q",
            Strategy::FrequencyLabel {
                labels: vec!["Never".into()],
            },
        );
        assert_eq!(freq.apply(&make_input("Never (0)"))[0].value, FieldValue::text("Never"));

        let minutes = ExtractionRule::new(
            "q",
            Strategy::BoundedNumeric {
                limit: 150,
                over_limit: "N/A".into(),
            },
        );
        assert_eq!(minutes.apply(&make_input("90"))[0].value, FieldValue::Integer(90));

        let cleanup = ExtractionRule::new(
            "q",
            Strategy::FreeTextCleanup {
                strip: vec!["Would you say it is:".into()],
            },
        );
        assert_eq!(
            cleanup.apply(&make_input("Would you say it is: Very hard"))[0].value,
            FieldValue::text("Very hard")
        );

        let classify = ExtractionRule::new("q", Strategy::Classify(PhraseClassifier::living_situation()));
        assert_eq!(
            classify.apply(&make_input("I have a steady place to live"))[0].value,
            FieldValue::text("Stable housing")
        );
    }

    #[test]
    fn apply_rules_keeps_going_after_misses() {
        let rules = vec![
            ExtractionRule::new(
                "missing",
                Strategy::RegexCapture {
                    pattern: Regex::new(r"Absent: (\w+)").unwrap(),
                    group: 1,
                },
            ),
            ExtractionRule::new(
                "present",
                Strategy::RegexCapture {
                    pattern: Regex::new(r"Present: (\w+)").unwrap(),
                    group: 1,
                },
            ),
        ];
        let fields = apply_rules(&rules, &make_input("Present: here"));
        assert!(fields[0].value.is_null());
        assert_eq!(fields[1].value, FieldValue::text("here"));
    }

    #[test]
    fn render_values() {
        assert_eq!(FieldValue::Null.render(), "");
        assert_eq!(FieldValue::Bool(true).render(), "True");
        assert_eq!(FieldValue::Bool(false).render(), "False");
        assert_eq!(FieldValue::Integer(-4).render(), "-4");
        assert_eq!(FieldValue::text("x").render(), "x");
    }
}
