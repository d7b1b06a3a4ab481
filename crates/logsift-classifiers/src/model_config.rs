//! Configuration for loading the embedding classifier's model artifacts

use logsift_core::{Category, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the embedding classifier model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Where to find the model weights, config, and tokenizer
    #[serde(flatten)]
    pub source: ModelSource,

    /// Device to run inference on
    #[serde(default)]
    pub device: DeviceSpec,

    /// Maximum sequence length for tokenization
    #[serde(default = "default_max_length")]
    pub max_length: usize,

    /// Abstention threshold: a max class probability at or below this value
    /// yields `Unknown` instead of the arg-max label
    #[serde(default = "default_threshold")]
    pub threshold: f32,

    /// Ordered label space of the classification head
    #[serde(default = "default_labels")]
    pub labels: Vec<String>,
}

/// Source location for model artifacts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModelSource {
    /// Load from a local directory containing config.json,
    /// model.safetensors, and tokenizer.json
    Local { path: PathBuf },

    /// Download from Hugging Face Hub
    HuggingFace {
        repo_id: String,
        revision: Option<String>,
    },
}

/// Device specification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeviceSpec {
    #[default]
    Cpu,
    Cuda,
    Metal,
}

impl DeviceSpec {
    /// Create the candle device for this specification
    pub fn to_device(self) -> Result<candle_core::Device> {
        match self {
            Self::Cpu => Ok(candle_core::Device::Cpu),
            Self::Cuda => candle_core::Device::new_cuda(0).map_err(|e| {
                logsift_core::Error::classifier(format!("Failed to initialize CUDA: {}", e))
            }),
            Self::Metal => candle_core::Device::new_metal(0).map_err(|e| {
                logsift_core::Error::classifier(format!("Failed to initialize Metal: {}", e))
            }),
        }
    }
}

impl ModelConfig {
    /// Create a configuration for a local model directory
    pub fn from_local(path: impl Into<PathBuf>) -> Self {
        Self {
            source: ModelSource::Local { path: path.into() },
            device: DeviceSpec::Cpu,
            max_length: default_max_length(),
            threshold: default_threshold(),
            labels: default_labels(),
        }
    }

    /// Create a configuration for a Hugging Face Hub repository
    pub fn from_hf(repo_id: impl Into<String>) -> Self {
        Self {
            source: ModelSource::HuggingFace {
                repo_id: repo_id.into(),
                revision: None,
            },
            device: DeviceSpec::Cpu,
            max_length: default_max_length(),
            threshold: default_threshold(),
            labels: default_labels(),
        }
    }

    /// Override the abstention threshold
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Override the label space
    pub fn with_labels(mut self, labels: Vec<String>) -> Self {
        self.labels = labels;
        self
    }

    /// Resolve the configured label strings into categories.
    ///
    /// Head labels that fall outside the unified category set map to
    /// `Unclassified` so an arg-max hit on them can never surface free text.
    pub fn resolved_labels(&self) -> Vec<Category> {
        self.labels
            .iter()
            .map(|label| Category::parse(label).unwrap_or(Category::Unclassified))
            .collect()
    }
}

fn default_max_length() -> usize {
    512
}

fn default_threshold() -> f32 {
    0.5
}

fn default_labels() -> Vec<String> {
    vec![
        "User Action".to_string(),
        "System Notification".to_string(),
        "Workflow Error".to_string(),
        "Deprecation Warning".to_string(),
        "Unclassified".to_string(),
    ]
}
