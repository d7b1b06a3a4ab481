//! Server configuration

use logsift_classifiers::{LlmConfig, ModelConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Embedding classifier model
    #[serde(default = "default_model")]
    pub model: ModelConfig,

    /// LLM completion service
    #[serde(default)]
    pub llm: LlmConfig,

    /// Sources routed exclusively to the LLM classifier
    #[serde(default = "default_llm_sources")]
    pub llm_sources: Vec<String>,
}

impl ServerConfig {
    /// Load configuration from file and CLI overrides
    pub fn load(config_path: &str, cli: &CliOverrides) -> anyhow::Result<Self> {
        let mut config = if Path::new(config_path).exists() {
            let content = std::fs::read_to_string(config_path)?;
            serde_yaml::from_str(&content)?
        } else {
            Self::default()
        };

        if let Some(listen) = &cli.listen {
            config.listen = listen.clone();
        }
        if let Some(port) = cli.port {
            config.port = port;
        }

        Ok(config)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            port: default_port(),
            model: default_model(),
            llm: LlmConfig::default(),
            llm_sources: default_llm_sources(),
        }
    }
}

/// CLI values that override the configuration file
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub listen: Option<String>,
    pub port: Option<u16>,
}

fn default_listen() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_model() -> ModelConfig {
    ModelConfig::from_local("./models/log-classifier")
}

fn default_llm_sources() -> Vec<String> {
    vec!["LegacyCRM".to_string()]
}
