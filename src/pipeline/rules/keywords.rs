//! Keyword-set membership matching.
//!
//! All synonyms of a category group are compiled into one `RegexSet`, so a
//! document is scanned once per group. Each synonym is matched as a whole
//! word, case-insensitively; categories are independent of each other.

use regex::{escape, RegexSet};

use crate::config::KeywordCategory;

/// Compiled keyword table for one category group (emotions, skills, ...).
#[derive(Debug, Clone)]
pub struct KeywordGroup {
    categories: Vec<String>,
    /// (category index, surface word), parallel to the set's patterns.
    words: Vec<(usize, String)>,
    set: RegexSet,
}

/// Result of scanning one text against a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordScan {
    /// One flag per category, in table order.
    pub flags: Vec<(String, bool)>,
    /// Matched surface words, de-duplicated, in table order.
    pub matched: Vec<String>,
}

impl KeywordScan {
    pub fn matched_words(&self) -> String {
        self.matched.join(", ")
    }

    pub fn is_flagged(&self, category: &str) -> bool {
        self.flags
            .iter()
            .any(|(name, flagged)| name == category && *flagged)
    }
}

impl KeywordGroup {
    pub fn new(table: &[KeywordCategory]) -> Result<Self, regex::Error> {
        let mut words = Vec::new();
        for (index, category) in table.iter().enumerate() {
            for synonym in &category.synonyms {
                words.push((index, synonym.clone()));
            }
        }
        let patterns: Vec<String> = words
            .iter()
            .map(|(_, word)| format!(r"(?i)\b{}\b", escape(word)))
            .collect();

        Ok(Self {
            categories: table.iter().map(|c| c.name.clone()).collect(),
            words,
            set: RegexSet::new(patterns)?,
        })
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn scan(&self, text: &str) -> KeywordScan {
        let mut flagged = vec![false; self.categories.len()];
        let mut matched: Vec<String> = Vec::new();

        for index in self.set.matches(text).iter() {
            let (category, word) = &self.words[index];
            flagged[*category] = true;
            if !matched.iter().any(|m| m.eq_ignore_ascii_case(word)) {
                matched.push(word.clone());
            }
        }

        KeywordScan {
            flags: self.categories.iter().cloned().zip(flagged).collect(),
            matched,
        }
    }
}
