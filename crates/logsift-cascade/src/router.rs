//! Cascade routing policy

use logsift_classifiers::RegexMatcher;
use logsift_core::{ClassificationResult, Classifier, Producer, Result};
use std::sync::Arc;
use std::time::Instant;

/// Routes one `(source, message)` pair through the cascade.
///
/// Fixed priority:
/// 1. If the source is in the LLM-only set, the LLM classifier's result
///    (or its typed failure) is final — no fallback, even when the message
///    would match a regex pattern.
/// 2. Otherwise the regex table runs first; a hit is final.
/// 3. On regex no-match, the embedding classifier's result is final,
///    including its deliberate `Unknown` abstention.
pub struct CascadeRouter {
    regex: RegexMatcher,
    embedding: Arc<dyn Classifier>,
    llm: Arc<dyn Classifier>,
    llm_sources: Vec<String>,
}

impl CascadeRouter {
    /// Create a router over the three leaves with the default LLM-only
    /// source set (`LegacyCRM`).
    pub fn new(
        regex: RegexMatcher,
        embedding: Arc<dyn Classifier>,
        llm: Arc<dyn Classifier>,
    ) -> Self {
        Self {
            regex,
            embedding,
            llm,
            llm_sources: vec!["LegacyCRM".to_string()],
        }
    }

    /// Override the set of sources routed exclusively to the LLM classifier
    pub fn with_llm_sources(mut self, sources: Vec<String>) -> Self {
        self.llm_sources = sources;
        self
    }

    /// Classify one message according to the routing policy
    pub async fn classify(&self, source: &str, message: &str) -> Result<ClassificationResult> {
        if self.llm_sources.iter().any(|s| s == source) {
            tracing::debug!(source, "routing to llm classifier");
            let result = self.llm.classify(message).await?;
            metrics::counter!("logsift_decisions_total", "producer" => Producer::Llm.label())
                .increment(1);
            return Ok(result);
        }

        let start = Instant::now();
        if let Some(category) = self.regex.matches(message) {
            tracing::debug!(source, category = category.label(), "regex hit");
            metrics::counter!("logsift_decisions_total", "producer" => Producer::Regex.label())
                .increment(1);
            return Ok(ClassificationResult::new(category, Producer::Regex)
                .with_confidence(1.0)
                .with_latency_us(start.elapsed().as_micros() as u64));
        }

        tracing::debug!(source, "regex no-match, falling back to embedding");
        let result = self.embedding.classify(message).await?;
        metrics::counter!("logsift_decisions_total", "producer" => Producer::Embedding.label())
            .increment(1);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FailingClassifier, FixedClassifier};
    use logsift_core::{Category, Error};

    fn router_with(
        embedding: Arc<FixedClassifier>,
        llm: Arc<FixedClassifier>,
    ) -> CascadeRouter {
        CascadeRouter::new(
            RegexMatcher::with_default_patterns(),
            embedding as Arc<dyn Classifier>,
            llm as Arc<dyn Classifier>,
        )
    }

    #[tokio::test]
    async fn test_legacy_crm_always_routes_to_llm() {
        let embedding = Arc::new(FixedClassifier::new(
            Category::SystemNotification,
            Producer::Embedding,
        ));
        let llm = Arc::new(FixedClassifier::new(
            Category::WorkflowError,
            Producer::Llm,
        ));
        let router = router_with(embedding.clone(), llm.clone());

        // The message would match a regex pattern, but the source pins the
        // LLM route.
        let result = router
            .classify("LegacyCRM", "User User123 logged in.")
            .await
            .unwrap();

        assert_eq!(result.category, Category::WorkflowError);
        assert_eq!(result.producer, Producer::Llm);
        assert_eq!(llm.call_count(), 1);
        assert_eq!(embedding.call_count(), 0);
    }

    #[tokio::test]
    async fn test_regex_hit_short_circuits_fallback() {
        let embedding = Arc::new(FixedClassifier::new(Category::Unknown, Producer::Embedding));
        let llm = Arc::new(FixedClassifier::new(Category::Unclassified, Producer::Llm));
        let router = router_with(embedding.clone(), llm.clone());

        let result = router
            .classify("AnalyticsEngine", "Backup completed successfully.")
            .await
            .unwrap();

        assert_eq!(result.category, Category::SystemNotification);
        assert_eq!(result.producer, Producer::Regex);
        assert_eq!(result.confidence, Some(1.0));
        assert_eq!(embedding.call_count(), 0);
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_no_match_falls_through_to_embedding() {
        let embedding = Arc::new(FixedClassifier::new(Category::Unknown, Producer::Embedding));
        let llm = Arc::new(FixedClassifier::new(Category::Unclassified, Producer::Llm));
        let router = router_with(embedding.clone(), llm.clone());

        let result = router.classify("ModernHR", "testing 123").await.unwrap();

        // The embedding result is returned as-is, abstention included.
        assert_eq!(result.category, Category::Unknown);
        assert_eq!(result.producer, Producer::Embedding);
        assert_eq!(embedding.call_count(), 1);
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_llm_failure_propagates_typed_error() {
        let embedding = Arc::new(FixedClassifier::new(
            Category::SystemNotification,
            Producer::Embedding,
        ));
        let router = CascadeRouter::new(
            RegexMatcher::with_default_patterns(),
            embedding as Arc<dyn Classifier>,
            Arc::new(FailingClassifier {
                producer: Producer::Llm,
            }),
        );

        let err = router
            .classify("LegacyCRM", "Case escalation for ticket ID 7012 failed")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ServiceUnavailable(_)));
    }

    #[tokio::test]
    async fn test_custom_llm_sources() {
        let embedding = Arc::new(FixedClassifier::new(Category::Unknown, Producer::Embedding));
        let llm = Arc::new(FixedClassifier::new(
            Category::DeprecationWarning,
            Producer::Llm,
        ));
        let router = router_with(embedding.clone(), llm.clone())
            .with_llm_sources(vec!["BillingSystem".to_string()]);

        let result = router
            .classify("BillingSystem", "anything at all")
            .await
            .unwrap();
        assert_eq!(result.producer, Producer::Llm);

        // LegacyCRM is no longer special once the set is overridden.
        let result = router.classify("LegacyCRM", "testing 123").await.unwrap();
        assert_eq!(result.producer, Producer::Embedding);
    }
}
