//! Core data types for the classification cascade

use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The unified category label set.
///
/// The source system spread these labels across a regex pattern table, a
/// trained classifier's label space, and an LLM prompt. They are unified here
/// into one explicit enum so every component agrees on the closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "User Action")]
    UserAction,
    #[serde(rename = "System Notification")]
    SystemNotification,
    #[serde(rename = "Workflow Error")]
    WorkflowError,
    #[serde(rename = "Deprecation Warning")]
    DeprecationWarning,
    /// The LLM fallback outcome: none of the offered labels fit
    #[serde(rename = "Unclassified")]
    Unclassified,
    /// The embedding classifier's abstention: confidence below threshold
    #[serde(rename = "Unknown")]
    Unknown,
}

impl Category {
    /// All categories, in declaration order
    pub const ALL: [Category; 6] = [
        Category::UserAction,
        Category::SystemNotification,
        Category::WorkflowError,
        Category::DeprecationWarning,
        Category::Unclassified,
        Category::Unknown,
    ];

    /// Get the canonical human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            Self::UserAction => "User Action",
            Self::SystemNotification => "System Notification",
            Self::WorkflowError => "Workflow Error",
            Self::DeprecationWarning => "Deprecation Warning",
            Self::Unclassified => "Unclassified",
            Self::Unknown => "Unknown",
        }
    }

    /// Parse a label, tolerating case and surrounding whitespace.
    ///
    /// Total over all string inputs: unrecognized text yields `None`, never
    /// an error. Used to validate free-text LLM output against the closed
    /// set.
    pub fn parse(text: &str) -> Option<Self> {
        let normalized = text.trim().trim_matches(|c| c == '"' || c == '.').trim();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.label().eq_ignore_ascii_case(normalized))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which cascade leaf produced a classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Producer {
    Regex,
    Embedding,
    Llm,
}

impl Producer {
    /// Get a human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Regex => "regex",
            Self::Embedding => "embedding",
            Self::Llm => "llm",
        }
    }
}

impl fmt::Display for Producer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Immutable input unit: one log line with its originating system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Originating system identifier (e.g. "ModernCRM", "AnalyticsEngine")
    pub source: String,
    /// The raw log message text
    pub message: String,
}

impl LogRecord {
    /// Create a new log record
    pub fn new(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            message: message.into(),
        }
    }
}

/// Result of classifying one message. Ephemeral, produced per call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Assigned category
    pub category: Category,

    /// Which leaf produced the category
    pub producer: Producer,

    /// Confidence score (0.0-1.0), where the leaf has one
    pub confidence: Option<f32>,

    /// Latency in microseconds
    pub latency_us: u64,
}

impl ClassificationResult {
    /// Create a new classification result
    pub fn new(category: Category, producer: Producer) -> Self {
        Self {
            category,
            producer,
            confidence: None,
            latency_us: 0,
        }
    }

    /// Attach a confidence score
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Attach the measured latency
    pub fn with_latency_us(mut self, latency_us: u64) -> Self {
        self.latency_us = latency_us;
        self
    }
}

/// Trait for cascade leaves that classify a single message
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classify the given log message
    async fn classify(&self, message: &str) -> Result<ClassificationResult>;

    /// Get the classifier name
    fn name(&self) -> &str;

    /// Which producer tag this leaf stamps on its results
    fn producer(&self) -> Producer;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_labels_round_trip() {
        for category in Category::ALL {
            assert_eq!(Category::parse(category.label()), Some(category));
        }
    }

    #[test]
    fn test_category_parse_is_case_insensitive() {
        assert_eq!(Category::parse("workflow error"), Some(Category::WorkflowError));
        assert_eq!(Category::parse("DEPRECATION WARNING"), Some(Category::DeprecationWarning));
        assert_eq!(Category::parse("  Unclassified  "), Some(Category::Unclassified));
    }

    #[test]
    fn test_category_parse_strips_quotes_and_periods() {
        assert_eq!(Category::parse("\"Workflow Error\""), Some(Category::WorkflowError));
        assert_eq!(Category::parse("Unclassified."), Some(Category::Unclassified));
    }

    #[test]
    fn test_category_parse_rejects_free_text() {
        assert_eq!(Category::parse("this looks like a workflow problem"), None);
        assert_eq!(Category::parse(""), None);
    }

    #[test]
    fn test_category_serde_uses_canonical_labels() {
        let json = serde_json::to_string(&Category::SystemNotification).unwrap();
        assert_eq!(json, "\"System Notification\"");

        let parsed: Category = serde_json::from_str("\"User Action\"").unwrap();
        assert_eq!(parsed, Category::UserAction);
    }

    #[test]
    fn test_result_builders() {
        let result = ClassificationResult::new(Category::UserAction, Producer::Regex)
            .with_confidence(1.0)
            .with_latency_us(42);
        assert_eq!(result.category, Category::UserAction);
        assert_eq!(result.producer, Producer::Regex);
        assert_eq!(result.confidence, Some(1.0));
        assert_eq!(result.latency_us, 42);
    }
}
