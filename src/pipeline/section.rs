//! Anchor Section Locator.
//!
//! Finds semantically meaningful sections inside extracted free text. Three
//! modes:
//! - paired: text between a start anchor and an end anchor
//! - single anchor + terminator: text after the anchor up to the first line
//!   the terminator predicate accepts
//! - repeated: every header occurrence paired with its own terminator
//!
//! Absence is reported as `None` (or an empty list), never as an error.

use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Start or end marker of a section.
#[derive(Debug, Clone)]
pub enum Anchor {
    Literal(String),
    Pattern(Regex),
}

impl Anchor {
    pub fn literal(text: impl Into<String>) -> Self {
        Self::Literal(text.into())
    }

    pub fn pattern(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self::Pattern(Regex::new(pattern)?))
    }

    /// Byte range of the first occurrence at or after `from`.
    fn find_from(&self, text: &str, from: usize) -> Option<(usize, usize)> {
        let haystack = text.get(from..)?;
        match self {
            Self::Literal(needle) => haystack
                .find(needle.as_str())
                .map(|i| (from + i, from + i + needle.len())),
            Self::Pattern(regex) => regex
                .find(haystack)
                .map(|m| (from + m.start(), from + m.end())),
        }
    }
}

/// Text after `start` and before the first `end` that follows it.
///
/// Missing `start` → `None`. Missing `end` → the remainder after `start`.
pub fn locate<'a>(text: &'a str, start: &Anchor, end: &Anchor) -> Option<&'a str> {
    let (_, body_start) = start.find_from(text, 0)?;
    match end.find_from(text, body_start) {
        Some((end_at, _)) => Some(&text[body_start..end_at]),
        None => Some(&text[body_start..]),
    }
}

/// Text after `start` up to (excluding) the first later line accepted by
/// `terminator`. The remainder of the anchor's own line is never tested.
pub fn locate_until<'a, F>(text: &'a str, start: &Anchor, terminator: F) -> Option<&'a str>
where
    F: Fn(&str) -> bool,
{
    let (_, body_start) = start.find_from(text, 0)?;
    let rest = &text[body_start..];

    let mut offset = match rest.find('\n') {
        Some(i) => i + 1,
        None => return Some(rest),
    };
    for line in rest[offset..].split_inclusive('\n') {
        if terminator(line.trim_end_matches(['\r', '\n'])) {
            return Some(&rest[..offset]);
        }
        offset += line.len();
    }
    Some(rest)
}

/// A repeated section: the header's captures and the body that follows it.
#[derive(Debug)]
pub struct HeaderedSection<'a> {
    pub header: Captures<'a>,
    pub body: &'a str,
}

/// Every `header` occurrence whose body is closed by `terminator`.
///
/// The body starts on the line after the header and stops where the
/// terminator match begins. A header with no terminator after it yields
/// nothing.
pub fn locate_all<'a>(text: &'a str, header: &Regex, terminator: &Regex) -> Vec<HeaderedSection<'a>> {
    let mut sections = Vec::new();
    let mut from = 0;

    while let Some(caps) = header.captures_at(text, from) {
        let Some(whole) = caps.get(0) else { break };
        let body_start = match text[whole.end()..].find('\n') {
            Some(i) => whole.end() + i + 1,
            None => break,
        };
        // Terminators may begin with the newline closing the last body line.
        let Some(end) = terminator.find_at(text, body_start.saturating_sub(1)) else {
            break;
        };
        let body_end = end.start().max(body_start);
        sections.push(HeaderedSection {
            header: caps,
            body: &text[body_start..body_end],
        });
        from = end.end().max(body_start);
    }

    sections
}

// ═══════════════════════════════════════════════════════════
// Terminator predicates
// ═══════════════════════════════════════════════════════════

static NUMBERED_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+)\.\s").expect("valid regex"));

static ROMAN_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[IVXLC]+\.\s+\S").expect("valid regex"));

/// Accepts a line that starts a numbered item greater than `limit`.
pub fn numbered_heading_above(limit: u32) -> impl Fn(&str) -> bool {
    move |line| {
        NUMBERED_LINE
            .captures(line)
            .and_then(|caps| caps[1].parse::<u32>().ok())
            .is_some_and(|n| n > limit)
    }
}

/// Accepts a roman-numeral section heading line, or a line matching the
/// given heading pattern when one is supplied.
pub fn roman_heading(pattern: Option<Regex>) -> impl Fn(&str) -> bool {
    move |line| match &pattern {
        Some(regex) => regex.is_match(line),
        None => ROMAN_HEADING.is_match(line),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_text() -> &'static str {
        "Header\nX. TREATMENT ACCEPTANCE\nCourt order\nWants to stay sober\n3. Relapse Potential\nTail"
    }

    #[test]
    fn paired_anchors_return_between() {
        let body = locate(
            make_text(),
            &Anchor::literal("X. TREATMENT ACCEPTANCE"),
            &Anchor::literal("3. Relapse Potential"),
        )
        .unwrap();
        assert_eq!(body.trim(), "Court order\nWants to stay sober");
    }

    #[test]
    fn missing_start_is_absent() {
        assert!(locate(make_text(), &Anchor::literal("NOPE"), &Anchor::literal("Tail")).is_none());
    }

    #[test]
    fn missing_end_returns_remainder() {
        let body = locate(make_text(), &Anchor::literal("Wants"), &Anchor::literal("NOPE")).unwrap();
        assert_eq!(body, " to stay sober\n3. Relapse Potential\nTail");
    }

    #[test]
    fn end_before_start_returns_remainder() {
        let body = locate(make_text(), &Anchor::literal("Court"), &Anchor::literal("Header")).unwrap();
        assert!(body.ends_with("Tail"));
        assert!(body.starts_with(" order"));
    }

    #[test]
    fn pattern_anchor() {
        let start = Anchor::pattern(r"X\.\s+TREATMENT").unwrap();
        let end = Anchor::pattern(r"\d\. Relapse").unwrap();
        let body = locate(make_text(), &start, &end).unwrap();
        assert!(body.contains("Court order"));
        assert!(!body.contains("Relapse"));
    }

    #[test]
    fn until_roman_heading() {
        let text = "III. HISTORY\nold\nIV. SUBSTANCE USE\nAlcohol   1998\nCannabis   2001\n V. FAMILY\nmother";
        let body = locate_until(text, &Anchor::literal("IV. SUBSTANCE USE"), roman_heading(None)).unwrap();
        assert_eq!(body, "\nAlcohol   1998\nCannabis   2001\n");
    }

    #[test]
    fn until_custom_pattern() {
        let text = "IV. SUBSTANCE USE\nrow\nVI. OTHER\nV. NEXT\nmore";
        let term = roman_heading(Some(Regex::new(r"^\s*V\.\s").unwrap()));
        let body = locate_until(text, &Anchor::literal("IV. SUBSTANCE USE"), term).unwrap();
        assert_eq!(body, "\nrow\nVI. OTHER\n");
    }

    #[test]
    fn until_without_terminator_takes_rest() {
        let text = "Anchor here\nline one\nline two";
        let body = locate_until(text, &Anchor::literal("Anchor"), roman_heading(None)).unwrap();
        assert_eq!(body, " here\nline one\nline two");
    }

    #[test]
    fn until_numbered_heading_above_bound() {
        let text = "Q\n25. Twenty five?\nyes\n26. Twenty six?\nno\n27. Boilerplate?\nignored";
        let body = locate_until(text, &Anchor::literal("Q"), numbered_heading_above(26)).unwrap();
        assert!(body.contains("26. Twenty six?"));
        assert!(!body.contains("27."));
    }

    #[test]
    fn repeated_sections_with_terminators() {
        let header = Regex::new(r"PHP Daily Assessment (\d{2}/\d{2}/\d{4}) \d{2}:\d{2} [AP]M").unwrap();
        let terminator = Regex::new(r"\n\w+ \w+, ACSW\d+").unwrap();
        let text = "PHP Daily Assessment 01/02/2024 09:30 AM\nfelt sad\nJane Doe, ACSW123\n\
                    PHP Daily Assessment 01/03/2024 10:00 PM\nfelt happy\nslept well\nJane Doe, ACSW123\n\
                    PHP Daily Assessment 01/04/2024 10:00 AM\nunsigned";
        let sections = locate_all(text, &header, &terminator);
        assert_eq!(sections.len(), 2);
        assert_eq!(&sections[0].header[1], "01/02/2024");
        assert_eq!(sections[0].body, "felt sad");
        assert_eq!(&sections[1].header[1], "01/03/2024");
        assert_eq!(sections[1].body, "felt happy\nslept well");
    }

    #[test]
    fn repeated_sections_absent_header() {
        let header = Regex::new(r"PHP Daily Assessment").unwrap();
        let terminator = Regex::new(r"\nEND").unwrap();
        assert!(locate_all("nothing here", &header, &terminator).is_empty());
    }
}
