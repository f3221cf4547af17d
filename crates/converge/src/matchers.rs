//! Outcome matchers
//!
//! Pure predicates over captured stdout. Absent stdout never matches.

use regex::Regex;

/// A regular expression anchored at the start of a line
///
/// The pattern is compiled in multi-line mode as `^(?:pattern)`, so it may
/// match starting at any line of the output, but never mid-line.
#[derive(Debug, Clone)]
pub struct LinePattern {
    source: String,
    regex: Regex,
}

impl LinePattern {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        let regex = Regex::new(&format!("(?m)^(?:{pattern})"))?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    /// The pattern as written by the caller
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

/// Stdout is present and not blank
pub fn has_content(stdout: Option<&str>) -> bool {
    stdout.is_some_and(|s| !s.trim().is_empty())
}

pub fn contains(stdout: Option<&str>, needle: &str) -> bool {
    stdout.is_some_and(|s| s.contains(needle))
}

pub fn starts_with(stdout: Option<&str>, prefix: &str) -> bool {
    stdout.is_some_and(|s| s.starts_with(prefix))
}

pub fn matches(stdout: Option<&str>, pattern: &LinePattern) -> bool {
    stdout.is_some_and(|s| pattern.is_match(s))
}
