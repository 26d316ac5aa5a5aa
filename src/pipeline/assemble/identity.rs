//! Stable question identity for survey columns.
//!
//! Survey answers are keyed by what the question says, not by where it sits
//! in the document. A question's fingerprint is its lower-cased alphanumeric
//! words joined by single spaces, so punctuation, bullets, casing and line
//! wrapping do not split one question into several columns.

use std::collections::HashMap;

use crate::config::QuestionColumn;

pub fn fingerprint(question: &str) -> String {
    question
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Maps question text to its output column.
#[derive(Debug, Clone, Default)]
pub struct QuestionIdentity {
    exact: HashMap<String, String>,
    /// (fingerprint, column), longest fingerprint first, for suffix matches.
    by_suffix: Vec<(String, String)>,
    columns: Vec<String>,
}

impl QuestionIdentity {
    pub fn new(questions: &[QuestionColumn]) -> Self {
        let mut exact = HashMap::new();
        let mut by_suffix = Vec::new();
        let mut columns: Vec<String> = Vec::new();

        for entry in questions {
            let key = fingerprint(&entry.question);
            if key.is_empty() {
                continue;
            }
            exact.entry(key.clone()).or_insert_with(|| entry.column.clone());
            by_suffix.push((key, entry.column.clone()));
            if !columns.contains(&entry.column) {
                columns.push(entry.column.clone());
            }
        }
        by_suffix.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

        Self {
            exact,
            by_suffix,
            columns,
        }
    }

    /// Canonical columns, in declaration order, de-duplicated.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Column for a question: exact fingerprint, else the longest canonical
    /// question the text ends with (boilerplate can run into a question),
    /// else the fingerprint itself.
    pub fn column_for(&self, question: &str) -> String {
        let key = fingerprint(question);
        if let Some(column) = self.exact.get(&key) {
            return column.clone();
        }
        self.by_suffix
            .iter()
            .find(|(canonical, _)| {
                key.strip_suffix(canonical.as_str())
                    .is_some_and(|head| head.ends_with(' '))
            })
            .map(|(_, column)| column.clone())
            .unwrap_or(key)
    }
}
