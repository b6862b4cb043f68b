//! Pattern matching utilities for prompt and error detection.
//!
//! Both prompt and error detection use ordered pattern sets with
//! first-match-wins semantics: the first pattern in the set that matches
//! anywhere in the searched region decides the outcome.

use std::ops::Range;

use regex::bytes::Regex;

/// Trait for pattern matching over raw terminal output.
pub trait PatternMatcher: Send + Sync {
    /// Returns the byte span of the first acceptable match, if any.
    fn find_span(&self, data: &[u8]) -> Option<Range<usize>>;

    /// Check if the data matches the pattern.
    fn is_match(&self, data: &[u8]) -> bool {
        self.find_span(data).is_some()
    }
}

impl PatternMatcher for Regex {
    fn find_span(&self, data: &[u8]) -> Option<Range<usize>> {
        self.find(data).map(|m| m.range())
    }
}

/// A compiled pattern with substring exclusions.
///
/// A match whose text contains any of the `not_contains` strings is skipped
/// and the search continues with the next match.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    /// The main pattern to match.
    pattern: Regex,

    /// Substrings that disqualify a match.
    not_contains: Vec<String>,
}

impl CompiledPattern {
    /// Create a new compiled pattern from a pattern string.
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            not_contains: Vec::new(),
        })
    }

    /// Create a compiled pattern with exclusions.
    pub fn with_not_contains<I, S>(pattern: &str, not_contains: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            not_contains: not_contains.into_iter().map(Into::into).collect(),
        })
    }

    /// Get a reference to the underlying regex.
    pub fn regex(&self) -> &Regex {
        &self.pattern
    }

    /// The exclusion substrings.
    pub fn not_contains(&self) -> &[String] {
        &self.not_contains
    }

    fn is_excluded(&self, matched: &[u8]) -> bool {
        if self.not_contains.is_empty() {
            return false;
        }
        let text = String::from_utf8_lossy(matched);
        self.not_contains.iter().any(|nc| text.contains(nc.as_str()))
    }
}

impl PatternMatcher for CompiledPattern {
    fn find_span(&self, data: &[u8]) -> Option<Range<usize>> {
        self.pattern
            .find_iter(data)
            .find(|m| !self.is_excluded(m.as_bytes()))
            .map(|m| m.range())
    }
}

/// A match produced by a [`PatternSet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternMatch {
    /// Index of the pattern that matched.
    pub index: usize,

    /// Byte span of the match within the searched data.
    pub span: Range<usize>,

    /// The matched text (lossy UTF-8).
    pub text: String,
}

/// Ordered set of patterns; the first pattern that matches wins.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<CompiledPattern>,
}

impl PatternSet {
    /// Create an empty pattern set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pattern at the lowest priority.
    pub fn push(&mut self, pattern: CompiledPattern) {
        self.patterns.push(pattern);
    }

    /// Append a pattern, builder style.
    pub fn with(mut self, pattern: CompiledPattern) -> Self {
        self.push(pattern);
        self
    }

    /// Try each pattern in order and return the first match.
    pub fn first_match(&self, data: &[u8]) -> Option<PatternMatch> {
        self.patterns.iter().enumerate().find_map(|(index, p)| {
            p.find_span(data).map(|span| PatternMatch {
                index,
                text: String::from_utf8_lossy(&data[span.clone()]).into_owned(),
                span,
            })
        })
    }

    /// Number of patterns in the set.
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Whether the set holds no patterns.
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Iterate over the patterns in priority order.
    pub fn iter(&self) -> impl Iterator<Item = &CompiledPattern> {
        self.patterns.iter()
    }
}
