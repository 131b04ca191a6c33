use std::fmt;

use regex::Regex;

/// A compiled rule pattern.
///
/// Patterns match at the start of the subject text only, so `/From: (.*)/`
/// does not match `"Reply-From: x"`. They are not anchored at the end unless
/// the pattern says so with `$`.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    /// Compile a pattern from its source text (without the surrounding slashes).
    ///
    /// # Errors
    ///
    /// Returns the underlying [`regex::Error`] if the pattern is malformed.
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        // Validate the text on its own first: wrapping can make unbalanced
        // input like `a)|(b` look well-formed.
        Regex::new(source)?;
        let regex = Regex::new(&format!("^(?:{source})"))?;
        Ok(Self {
            source: source.to_owned(),
            regex,
        })
    }

    /// The pattern text as written in the rules.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Number of capture groups, not counting the implicit whole-match group.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.regex.captures_len() - 1
    }

    #[must_use]
    pub fn is_match(&self, subject: &str) -> bool {
        self.regex.is_match(subject)
    }

    /// Match `subject`, returning an owned snapshot of the match.
    #[must_use]
    pub fn captures(&self, subject: &str) -> Option<Capture> {
        let caps = self.regex.captures(subject)?;
        let text = caps.get(0).map_or("", |m| m.as_str()).to_owned();
        let groups = caps
            .iter()
            .skip(1)
            .map(|group| group.map(|m| m.as_str().to_owned()))
            .collect();
        Some(Capture { text, groups })
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for Pattern {}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/", self.source)
    }
}

/// The bindings of one successful match: the matched text and its groups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capture {
    text: String,
    groups: Vec<Option<String>>,
}

impl Capture {
    /// The text matched by the whole pattern.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Number of capture groups in the pattern that produced this match.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Group `index`, numbered from 1. Index 0 is the whole match.
    ///
    /// The outer `Option` is `None` when the group does not exist; the inner
    /// one is `None` when the group exists but did not participate.
    #[must_use]
    pub fn group(&self, index: usize) -> Option<Option<&str>> {
        if index == 0 {
            return Some(Some(&self.text));
        }
        self.groups.get(index - 1).map(Option::as_deref)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_only_at_start() {
        let pattern = Pattern::new(r"From: (.*)").unwrap();
        assert!(pattern.is_match("From: alice"));
        assert!(!pattern.is_match("Reply-From: alice"));
    }

    #[test]
    fn not_anchored_at_end() {
        let pattern = Pattern::new(r"\d+").unwrap();
        let capture = pattern.captures("123abc").unwrap();
        assert_eq!(capture.text(), "123");
    }

    #[test]
    fn alternation_stays_anchored() {
        let pattern = Pattern::new("a|b").unwrap();
        assert!(!pattern.is_match("xb"));
        assert!(pattern.is_match("b"));
    }

    #[test]
    fn groups_are_numbered_from_one() {
        let pattern = Pattern::new(r"^(\w+) (\w+)$").unwrap();
        assert_eq!(pattern.group_count(), 2);
        let capture = pattern.captures("Helen Smith").unwrap();
        assert_eq!(capture.group(0), Some(Some("Helen Smith")));
        assert_eq!(capture.group(1), Some(Some("Helen")));
        assert_eq!(capture.group(2), Some(Some("Smith")));
        assert_eq!(capture.group(3), None);
    }

    #[test]
    fn optional_group_that_did_not_participate() {
        let pattern = Pattern::new(r"(a)?(b)").unwrap();
        let capture = pattern.captures("b").unwrap();
        assert_eq!(capture.group(1), Some(None));
        assert_eq!(capture.group(2), Some(Some("b")));
    }

    #[test]
    fn malformed_pattern_is_an_error() {
        assert!(Pattern::new("(unclosed").is_err());
        assert!(Pattern::new("a)|(b").is_err());
    }

    #[test]
    fn equality_is_by_source() {
        assert_eq!(Pattern::new("a+").unwrap(), Pattern::new("a+").unwrap());
        assert_ne!(Pattern::new("a+").unwrap(), Pattern::new("a*").unwrap());
    }
}
