//! Regex pattern matcher (first cascade tier)

use logsift_core::{Category, Result};
use regex::{Regex, RegexBuilder};

/// The default pattern table.
///
/// Order matters: patterns are evaluated top to bottom and the first match
/// wins. Each pattern is anchored at the start of the message and compiled
/// case-insensitively.
const DEFAULT_PATTERNS: &[(&str, Category)] = &[
    (r"User User\d+ logged (in|out)\.", Category::UserAction),
    (r"Account with ID .* created by .*", Category::UserAction),
    (r"Backup (started|ended) at .*", Category::SystemNotification),
    (r"Backup completed successfully\.", Category::SystemNotification),
    (r"System updated to version .*", Category::SystemNotification),
    (
        r"File .* uploaded successfully by user .*",
        Category::SystemNotification,
    ),
    (r"Disk cleanup completed successfully\.", Category::SystemNotification),
    (r"System reboot initiated by user .*", Category::SystemNotification),
];

/// Ordered regex-to-category table.
///
/// A pure, total function over all string inputs: malformed or unmatched
/// messages simply yield no match, never an error.
#[derive(Debug)]
pub struct RegexMatcher {
    patterns: Vec<(Regex, Category)>,
}

impl RegexMatcher {
    /// Build a matcher from an ordered list of `(pattern, category)` pairs.
    ///
    /// Patterns are anchored at the start of the message and compiled
    /// case-insensitively. Fails only on invalid regex syntax.
    pub fn new<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Category)>,
        S: AsRef<str>,
    {
        let mut compiled = Vec::new();
        for (pattern, category) in patterns {
            let anchored = format!("^(?:{})", pattern.as_ref());
            let regex = RegexBuilder::new(&anchored)
                .case_insensitive(true)
                .build()
                .map_err(|e| {
                    logsift_core::Error::config(format!(
                        "invalid regex pattern {:?}: {}",
                        pattern.as_ref(),
                        e
                    ))
                })?;
            compiled.push((regex, category));
        }
        Ok(Self { patterns: compiled })
    }

    /// Build the matcher with the default pattern table.
    pub fn with_default_patterns() -> Self {
        // The default table is statically known to compile.
        Self::new(DEFAULT_PATTERNS.iter().copied())
            .expect("default pattern table must compile")
    }

    /// Test the message against the table in fixed order.
    ///
    /// Returns the category of the first matching pattern, or `None` when no
    /// pattern matches. No side effects.
    pub fn matches(&self, message: &str) -> Option<Category> {
        self.patterns
            .iter()
            .find(|(regex, _)| regex.is_match(message))
            .map(|(_, category)| *category)
    }

    /// Number of patterns in the table
    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }
}

impl Default for RegexMatcher {
    fn default() -> Self {
        Self::with_default_patterns()
    }
}
