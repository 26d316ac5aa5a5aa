//! Value normalizers shared by rule strategies.
//!
//! Free-text survey answers are reduced to short canonical values here:
//! yes/no, frequency labels, bounded numbers, housing classes, and the
//! boilerplate-free text every answer passes through first.

use std::sync::LazyLock;

use regex::Regex;

use super::types::FieldValue;

static BULLETS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[•●–\-]+").expect("valid regex"));

static STRAY_MARKS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[*+»~—]").expect("valid regex"));

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

static KIPU_FOOTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Powered by Kipu Systems Page \d+ of \d+").expect("valid regex")
});

static LABEL_WITH_SCORE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z ]+)\s*\(\d+\)").expect("valid regex"));

static NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("valid regex"));

// ═══════════════════════════════════════════════════════════
// Free-text cleanup
// ═══════════════════════════════════════════════════════════

/// Character-level cleanup: bullets to spaces, stray marks dropped,
/// whitespace collapsed.
fn scrub(text: &str) -> String {
    let text = BULLETS.replace_all(text, " ");
    let text = STRAY_MARKS.replace_all(&text, "");
    WHITESPACE.replace_all(&text, " ").into_owned()
}

/// Strips bullets, page footers and known boilerplate from extracted text.
#[derive(Debug, Clone, Default)]
pub struct TextCleaner {
    /// Boilerplate phrases, scrubbed the same way as the text they are
    /// removed from so hyphenated phrases still match.
    boilerplate: Vec<String>,
}

impl TextCleaner {
    pub fn new(boilerplate: &[String]) -> Self {
        let boilerplate = boilerplate
            .iter()
            .map(|phrase| scrub(phrase).trim().to_string())
            .filter(|phrase| !phrase.is_empty())
            .collect();
        Self { boilerplate }
    }

    pub fn clean(&self, text: &str) -> String {
        let text = scrub(text);
        let mut text = KIPU_FOOTER.replace_all(&text, "").into_owned();
        for phrase in &self.boilerplate {
            text = text.replace(phrase.as_str(), "");
        }
        WHITESPACE.replace_all(text.trim(), " ").into_owned()
    }
}

/// Final tidy applied to every survey answer: leading quote/space runs
/// stripped and inline ` " ` separators turned into ` // `.
pub fn tidy_answer(text: &str) -> String {
    text.trim_start_matches([' ', '"'])
        .trim()
        .replace(" \" ", " // ")
}

/// Remove every occurrence of the given phrases, then trim.
pub fn strip_phrases(text: &str, phrases: &[String]) -> String {
    let mut out = text.to_string();
    for phrase in phrases {
        out = out.replace(phrase.as_str(), "");
    }
    out.trim().to_string()
}

// ═══════════════════════════════════════════════════════════
// Canonical values
// ═══════════════════════════════════════════════════════════

/// `"Yes"`, `"No"` or `""` by case-insensitive substring presence.
pub fn yes_no(text: &str) -> &'static str {
    let lower = text.trim().to_lowercase();
    if lower.contains("yes") {
        "Yes"
    } else if lower.contains("no") {
        "No"
    } else {
        ""
    }
}

/// First canonical label contained in the text (case-insensitive), else
/// the `<Label>` part of a leading `"<Label> (<n>)"`, else empty.
pub fn frequency_label(text: &str, labels: &[String]) -> String {
    let lower = text.to_lowercase();
    if let Some(label) = labels.iter().find(|l| lower.contains(&l.to_lowercase())) {
        return label.clone();
    }
    LABEL_WITH_SCORE
        .captures(text.trim())
        .map(|caps| caps[1].trim().to_string())
        .unwrap_or_default()
}

/// Largest integer in the text; `over_limit` text when above `limit`,
/// null when the text has no digits.
pub fn max_number(text: &str, limit: i64, over_limit: &str) -> FieldValue {
    let max = NUMBER
        .find_iter(text)
        .filter_map(|m| m.as_str().parse::<i64>().ok())
        .max();
    match max {
        Some(n) if n > limit => FieldValue::Text(over_limit.to_string()),
        Some(n) => FieldValue::Integer(n),
        None => FieldValue::Null,
    }
}

// ═══════════════════════════════════════════════════════════
// Phrase classification
// ═══════════════════════════════════════════════════════════

/// `contains` (and not `unless`) → `label`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhraseRule {
    pub contains: String,
    pub unless: Option<String>,
    pub label: String,
}

/// Ordered phrase rules; the first rule that fires wins, otherwise the
/// lower-cased input passes through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhraseClassifier {
    rules: Vec<PhraseRule>,
}

impl PhraseClassifier {
    pub fn new(rules: Vec<PhraseRule>) -> Self {
        Self { rules }
    }

    /// Housing classes for the living-situation question. The homeless
    /// phrase is tested first because it contains the stable one.
    pub fn living_situation() -> Self {
        let rule = |contains: &str, unless: Option<&str>, label: &str| PhraseRule {
            contains: contains.into(),
            unless: unless.map(Into::into),
            label: label.into(),
        };
        Self::new(vec![
            rule("do not have a steady place to live", None, "Homeless or temporary"),
            rule("worried about losing it", None, "Unstable housing"),
            rule("steady place to live", Some("worried"), "Stable housing"),
        ])
    }

    pub fn classify(&self, text: &str) -> String {
        let lower = text.trim().to_lowercase();
        self.rules
            .iter()
            .find(|r| {
                lower.contains(&r.contains)
                    && r.unless.as_ref().map_or(true, |u| !lower.contains(u.as_str()))
            })
            .map(|r| r.label.clone())
            .unwrap_or(lower)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn make_substance_labels() -> Vec<String> {
        labels(&["Daily or Almost Daily", "Weekly", "Monthly", "Once or Twice", "Never"])
    }

    #[test]
    fn frequency_label_from_known_list() {
        let l = make_substance_labels();
        assert_eq!(frequency_label("Daily or Almost Daily (3)", &l), "Daily or Almost Daily");
        assert_eq!(frequency_label("Never (0)", &l), "Never");
        assert_eq!(frequency_label("weekly (2)", &l), "Weekly");
    }

    #[test]
    fn frequency_label_falls_back_to_bracket_form() {
        assert_eq!(frequency_label("Fairly often (3)", &[]), "Fairly often");
    }

    #[test]
    fn frequency_label_without_match_is_empty() {
        assert_eq!(frequency_label("prefer not to say", &make_substance_labels()), "");
        assert_eq!(frequency_label("", &make_substance_labels()), "");
    }

    #[test]
    fn yes_no_canonicalization() {
        assert_eq!(yes_no("Yes, sometimes"), "Yes");
        assert_eq!(yes_no("no issues"), "No");
        assert_eq!(yes_no("unsure"), "");
        assert_eq!(yes_no("  NO  "), "No");
    }

    #[test]
    fn max_number_bounds() {
        assert_eq!(max_number("30 minutes or 45", 150, "N/A"), FieldValue::Integer(45));
        assert_eq!(max_number("150+", 150, "N/A"), FieldValue::Integer(150));
        assert_eq!(max_number("200", 150, "N/A"), FieldValue::Text("N/A".into()));
        assert_eq!(max_number("none", 150, "N/A"), FieldValue::Null);
    }

    #[test]
    fn cleaner_scrubs_bullets_and_footer() {
        let cleaner = TextCleaner::new(&[]);
        let text = "• Yes –  sometimes\n\nPowered by Kipu Systems Page 3 of 12 *done*";
        assert_eq!(cleaner.clean(text), "Yes sometimes done");
    }

    #[test]
    fn cleaner_removes_boilerplate() {
        let cleaner = TextCleaner::new(&labels(&[
            "Mental Health",
            "One drink is 12 ounces of beer, 5 ounces of wine, or 1.5 ounces of 80-proof spirits.",
        ]));
        let text = "Mental Health Never One drink is 12 ounces of beer, 5 ounces of wine, or 1.5 ounces of 80-proof spirits. (0)";
        assert_eq!(cleaner.clean(text), "Never (0)");
    }

    #[test]
    fn tidy_answer_strips_quotes_and_separators() {
        assert_eq!(tidy_answer(r#"" Pests " Mold"#), "Pests // Mold");
        assert_eq!(tidy_answer("  plain "), "plain");
    }

    #[test]
    fn strip_phrases_removes_prompt() {
        let out = strip_phrases("Would you say it is: Somewhat hard", &labels(&["Would you say it is:"]));
        assert_eq!(out, "Somewhat hard");
    }

    #[test]
    fn living_situation_classes() {
        let c = PhraseClassifier::living_situation();
        assert_eq!(c.classify("I have a steady place to live"), "Stable housing");
        assert_eq!(
            c.classify("I have a place to live today, but I am worried about losing it in the future"),
            "Unstable housing"
        );
        assert_eq!(
            c.classify("I do not have a steady place to live (I am temporarily staying with others)"),
            "Homeless or temporary"
        );
        assert_eq!(c.classify("  Shelter "), "shelter");
    }
}
