//! Numbered-question scanner for survey sections.
//!
//! Scans `<n>. <question ending in ?> <answer>` items in order. An answer
//! runs until the next line that starts with `<digits>.`. Scanning stops at
//! the first item numbered above the configured bound. One designated
//! question may carry an `a.`/`b.` sub-question pair in its answer; it is
//! split into two entries.

use std::sync::LazyLock;

use regex::Regex;

use super::normalize::TextCleaner;

static ITEM_START: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)\.\s").expect("valid regex"));

static NEXT_ITEM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n\d+\.").expect("valid regex"));

static SUB_QUESTIONS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\ba\.\s*(.*?\?)\s*(.*?)\s*\bb\.\s*(.*?\?)\s*(.*)").expect("valid regex")
});

/// One cleaned (question, answer) entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionAnswer {
    pub number: u32,
    /// `Some('a')` / `Some('b')` for split sub-questions.
    pub part: Option<char>,
    pub question: String,
    pub answer: String,
}

impl QuestionAnswer {
    /// `"7"`, or `"23a"` for a sub-question.
    pub fn label(&self) -> String {
        match self.part {
            Some(part) => format!("{}{part}", self.number),
            None => self.number.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct QuestionScanner {
    max_question: u32,
    split_question: Option<u32>,
    cleaner: TextCleaner,
}

impl QuestionScanner {
    pub fn new(max_question: u32, split_question: Option<u32>, cleaner: TextCleaner) -> Self {
        Self {
            max_question,
            split_question,
            cleaner,
        }
    }

    pub fn scan(&self, text: &str) -> Vec<QuestionAnswer> {
        let mut entries = Vec::new();
        let mut from = 0;

        while let Some(caps) = ITEM_START.captures_at(text, from) {
            let (Some(whole), Some(digits)) = (caps.get(0), caps.get(1)) else {
                break;
            };
            let number = digits.as_str().parse::<u32>().unwrap_or(u32::MAX);
            let question_start = whole.end();
            let Some(mark) = text[question_start..].find('?') else {
                break;
            };
            let answer_start = question_start + mark + 1;
            let answer_end = NEXT_ITEM
                .find_at(text, answer_start)
                .map_or(text.len(), |m| m.start());

            if number > self.max_question {
                break;
            }

            let question = &text[question_start..answer_start];
            let answer = &text[answer_start..answer_end];
            if self.split_question == Some(number) {
                if let Some(parts) = self.split(number, question, answer) {
                    entries.extend(parts);
                    from = answer_end;
                    continue;
                }
            }
            entries.push(QuestionAnswer {
                number,
                part: None,
                question: self.cleaner.clean(question),
                answer: self.cleaner.clean(answer),
            });
            from = answer_end;
        }

        entries
    }

    fn split(&self, number: u32, question: &str, answer: &str) -> Option<[QuestionAnswer; 2]> {
        let caps = SUB_QUESTIONS.captures(answer)?;
        let stem = self.cleaner.clean(question);
        let entry = |part: char, sub: &str, sub_answer: &str| QuestionAnswer {
            number,
            part: Some(part),
            question: format!("{stem} {}", self.cleaner.clean(sub)),
            answer: self.cleaner.clean(sub_answer),
        };
        Some([
            entry('a', &caps[1], &caps[2]),
            entry('b', &caps[3], &caps[4]),
        ])
    }
}
