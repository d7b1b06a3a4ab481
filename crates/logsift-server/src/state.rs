//! Shared application state

use crate::config::ServerConfig;
use logsift_cascade::CascadeRouter;
use logsift_classifiers::{EmbeddingClassifier, LlmClassifier, RegexMatcher};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tracing::info;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<CascadeRouter>,
    pub metrics: PrometheusHandle,
}

impl AppState {
    /// Build the full cascade from configuration.
    ///
    /// Model weights and the LLM HTTP client are loaded here, once, before
    /// the listener is bound. A bad model path or missing API key fails
    /// startup instead of the first request.
    pub fn new(config: &ServerConfig, metrics: PrometheusHandle) -> anyhow::Result<Self> {
        let regex = RegexMatcher::with_default_patterns();

        info!("Loading embedding classifier model...");
        let embedding = EmbeddingClassifier::load(&config.model)?;
        info!("Embedding classifier ready");

        let llm = LlmClassifier::new(&config.llm)?;
        info!(model = %config.llm.model, "LLM classifier ready");

        let router = CascadeRouter::new(regex, Arc::new(embedding), Arc::new(llm))
            .with_llm_sources(config.llm_sources.clone());

        Ok(Self {
            router: Arc::new(router),
            metrics,
        })
    }

    /// Wrap an already-built router. Used by tests to substitute mock leaves.
    pub fn with_router(router: CascadeRouter, metrics: PrometheusHandle) -> Self {
        Self {
            router: Arc::new(router),
            metrics,
        }
    }
}
