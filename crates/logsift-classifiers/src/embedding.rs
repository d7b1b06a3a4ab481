//! Embedding classifier (second cascade tier)
//!
//! Encodes the message with a BERT-family sentence-embedding backbone and
//! feeds the CLS embedding through a linear classification head. The model
//! artifacts are loaded once via [`EmbeddingClassifier::load`] and the loaded
//! classifier is a read-only, reentrant resource safe to share behind an
//! `Arc` across concurrent calls.
//!
//! The abstention rule is deliberate: a max class probability at or below the
//! configured threshold yields `Unknown` rather than a low-confidence guess.

use crate::model_config::{ModelConfig, ModelSource};
use async_trait::async_trait;
use candle_core::{DType, Device, IndexOp, Tensor, D};
use candle_nn::{Linear, Module, VarBuilder};
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use logsift_core::{Category, ClassificationResult, Classifier, Producer, Result};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokenizers::{Tokenizer, TruncationDirection};

/// Apply the abstention rule to a probability vector.
///
/// Returns the arg-max label when its probability strictly exceeds the
/// threshold, and `Unknown` (with the same probability as confidence) when it
/// does not. A probability of exactly the threshold abstains.
pub fn resolve_probabilities(
    probabilities: &[f32],
    labels: &[Category],
    threshold: f32,
) -> (Category, f32) {
    let Some((max_idx, max_prob)) = probabilities
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
    else {
        return (Category::Unknown, 0.0);
    };

    if *max_prob <= threshold {
        return (Category::Unknown, *max_prob);
    }

    let category = labels.get(max_idx).copied().unwrap_or(Category::Unclassified);
    (category, *max_prob)
}

/// Candle-backed embedding classifier
///
/// `Debug` is implemented manually because the candle `BertModel` backbone
/// does not implement it.
pub struct EmbeddingClassifier {
    name: String,
    tokenizer: Tokenizer,
    model: BertModel,
    head: Linear,
    device: Device,
    labels: Vec<Category>,
    threshold: f32,
    max_length: usize,
}

impl std::fmt::Debug for EmbeddingClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingClassifier")
            .field("name", &self.name)
            .field("labels", &self.labels)
            .field("threshold", &self.threshold)
            .field("max_length", &self.max_length)
            .finish_non_exhaustive()
    }
}

impl EmbeddingClassifier {
    /// Load the model artifacts described by the configuration.
    ///
    /// This is the explicit initialization step for the process-wide model
    /// context: weights, tokenizer, and head are loaded exactly once here and
    /// never mutated afterwards.
    pub fn load(config: &ModelConfig) -> Result<Self> {
        let model_dir = resolve_model_dir(&config.source)?;
        let device = config.device.to_device()?;

        let tokenizer = load_tokenizer(&model_dir)?;
        let bert_config: BertConfig = parse_json_config(&model_dir.join("config.json"))?;
        let vb = load_var_builder(&model_dir, &device)?;

        let model = load_bert_backbone(&vb, &bert_config)?;
        let labels = config.resolved_labels();
        if labels.is_empty() {
            return Err(logsift_core::Error::config(
                "embedding classifier requires a non-empty label space",
            ));
        }
        let head = load_classification_head(&vb, bert_config.hidden_size, labels.len())?;

        tracing::info!(
            "Loaded embedding classifier with {} labels from {}",
            labels.len(),
            model_dir.display()
        );

        Ok(Self {
            name: "embedding".to_string(),
            tokenizer,
            model,
            head,
            device,
            labels,
            threshold: config.threshold,
            max_length: config.max_length,
        })
    }

    fn forward_probabilities(&self, message: &str) -> Result<Vec<f32>> {
        let mut encoding = self.tokenizer.encode(message, true).map_err(|e| {
            logsift_core::Error::classifier(format!("Tokenization failed: {}", e))
        })?;
        encoding.truncate(self.max_length, 0, TruncationDirection::Right);

        let input_ids = Tensor::new(encoding.get_ids(), &self.device)
            .and_then(|t| t.unsqueeze(0))
            .map_err(|e| {
                logsift_core::Error::classifier(format!("Failed to build input tensor: {}", e))
            })?;

        let token_type_ids = Tensor::new(encoding.get_type_ids(), &self.device)
            .and_then(|t| t.unsqueeze(0))
            .map_err(|e| {
                logsift_core::Error::classifier(format!("Failed to build token type tensor: {}", e))
            })?;

        let hidden_states = self
            .model
            .forward(&input_ids, &token_type_ids, None)
            .map_err(|e| {
                logsift_core::Error::classifier(format!("Model forward pass failed: {}", e))
            })?;

        let cls_embedding = hidden_states
            .i((0, 0, ..))
            .and_then(|t| t.unsqueeze(0))
            .map_err(|e| {
                logsift_core::Error::classifier(format!("Failed to pool CLS embedding: {}", e))
            })?;

        let logits = self.head.forward(&cls_embedding).map_err(|e| {
            logsift_core::Error::classifier(format!("Classification head failed: {}", e))
        })?;

        candle_nn::ops::softmax(&logits, D::Minus1)
            .and_then(|t| t.squeeze(0))
            .and_then(|t| t.to_vec1())
            .map_err(|e| logsift_core::Error::classifier(format!("Softmax failed: {}", e)))
    }
}

#[async_trait]
impl Classifier for EmbeddingClassifier {
    async fn classify(&self, message: &str) -> Result<ClassificationResult> {
        let start = Instant::now();

        let probabilities = self.forward_probabilities(message)?;
        let (category, confidence) =
            resolve_probabilities(&probabilities, &self.labels, self.threshold);

        tracing::debug!(
            category = category.label(),
            confidence,
            "embedding classification"
        );

        Ok(ClassificationResult::new(category, Producer::Embedding)
            .with_confidence(confidence)
            .with_latency_us(start.elapsed().as_micros() as u64))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn producer(&self) -> Producer {
        Producer::Embedding
    }
}

/// Resolve the model directory, downloading from Hugging Face if configured
fn resolve_model_dir(source: &ModelSource) -> Result<PathBuf> {
    match source {
        ModelSource::Local { path } => {
            if !path.exists() {
                return Err(logsift_core::Error::config(format!(
                    "model directory not found: {}",
                    path.display()
                )));
            }
            Ok(path.clone())
        }
        ModelSource::HuggingFace { repo_id, revision } => {
            download_from_huggingface(repo_id, revision.as_deref())
        }
    }
}

fn download_from_huggingface(repo_id: &str, revision: Option<&str>) -> Result<PathBuf> {
    tracing::info!("Downloading model from Hugging Face: {}", repo_id);

    let api = hf_hub::api::sync::Api::new().map_err(|e| {
        logsift_core::Error::config(format!("Failed to initialize Hugging Face API: {}", e))
    })?;

    let repo = api.repo(hf_hub::Repo::with_revision(
        repo_id.to_string(),
        hf_hub::RepoType::Model,
        revision.unwrap_or("main").to_string(),
    ));

    for filename in ["model.safetensors", "tokenizer.json"] {
        repo.get(filename).map_err(|e| {
            logsift_core::Error::config(format!("Failed to download {}: {}", filename, e))
        })?;
    }

    let config_path = repo.get("config.json").map_err(|e| {
        logsift_core::Error::config(format!("Failed to download config.json: {}", e))
    })?;

    let model_dir = config_path
        .parent()
        .ok_or_else(|| logsift_core::Error::config("invalid Hugging Face cache path"))?;

    Ok(model_dir.to_path_buf())
}

fn load_tokenizer(model_dir: &Path) -> Result<Tokenizer> {
    let tokenizer_path = model_dir.join("tokenizer.json");
    Tokenizer::from_file(&tokenizer_path).map_err(|e| {
        logsift_core::Error::classifier(format!(
            "Failed to load tokenizer {}: {}",
            tokenizer_path.display(),
            e
        ))
    })
}

fn parse_json_config<T: serde::de::DeserializeOwned>(config_path: &Path) -> Result<T> {
    let config_str = std::fs::read_to_string(config_path).map_err(|e| {
        logsift_core::Error::classifier(format!(
            "Failed to read config {}: {}",
            config_path.display(),
            e
        ))
    })?;

    serde_json::from_str(&config_str).map_err(|e| {
        logsift_core::Error::classifier(format!(
            "Failed to parse config {}: {}",
            config_path.display(),
            e
        ))
    })
}

fn load_var_builder(model_dir: &Path, device: &Device) -> Result<VarBuilder<'static>> {
    let weights_path = model_dir.join("model.safetensors");
    if !weights_path.exists() {
        return Err(logsift_core::Error::classifier(format!(
            "model.safetensors not found in {}",
            model_dir.display()
        )));
    }

    let vb = unsafe {
        VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, device).map_err(|e| {
            logsift_core::Error::classifier(format!("Failed to load weights: {}", e))
        })?
    };

    Ok(vb)
}

fn load_bert_backbone(vb: &VarBuilder, config: &BertConfig) -> Result<BertModel> {
    let mut errors = Vec::new();

    for prefix in ["bert", ""] {
        let vb_prefix = if prefix.is_empty() {
            vb.clone()
        } else {
            vb.pp(prefix)
        };

        match BertModel::load(vb_prefix, config) {
            Ok(model) => {
                tracing::debug!(
                    "Loaded BERT backbone from '{}'",
                    if prefix.is_empty() { "<root>" } else { prefix }
                );
                return Ok(model);
            }
            Err(e) => {
                errors.push(format!(
                    "{}: {}",
                    if prefix.is_empty() { "<root>" } else { prefix },
                    e
                ));
            }
        }
    }

    Err(logsift_core::Error::classifier(format!(
        "Failed to load BERT backbone, tried prefixes [{}]",
        errors.join(" | ")
    )))
}

fn load_classification_head(vb: &VarBuilder, hidden_size: usize, num_labels: usize) -> Result<Linear> {
    candle_nn::linear(hidden_size, num_labels, vb.pp("classifier")).map_err(|e| {
        logsift_core::Error::classifier(format!(
            "Failed to load classification head (hidden_size={}, num_labels={}): {}",
            hidden_size, num_labels, e
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const LABELS: [Category; 3] = [
        Category::UserAction,
        Category::SystemNotification,
        Category::WorkflowError,
    ];

    #[test]
    fn test_abstains_at_exactly_threshold() {
        let (category, confidence) = resolve_probabilities(&[0.5, 0.3, 0.2], &LABELS, 0.5);
        assert_eq!(category, Category::Unknown);
        assert_eq!(confidence, 0.5);
    }

    #[test]
    fn test_commits_just_above_threshold() {
        let (category, confidence) = resolve_probabilities(&[0.50001, 0.3, 0.19999], &LABELS, 0.5);
        assert_eq!(category, Category::UserAction);
        assert_eq!(confidence, 0.50001);
    }

    #[test]
    fn test_abstains_below_threshold() {
        let (category, _) = resolve_probabilities(&[0.4, 0.35, 0.25], &LABELS, 0.5);
        assert_eq!(category, Category::Unknown);
    }

    #[test]
    fn test_arg_max_label_selection() {
        let (category, confidence) = resolve_probabilities(&[0.1, 0.8, 0.1], &LABELS, 0.5);
        assert_eq!(category, Category::SystemNotification);
        assert_eq!(confidence, 0.8);
    }

    #[test]
    fn test_empty_probabilities_abstain() {
        let (category, confidence) = resolve_probabilities(&[], &LABELS, 0.5);
        assert_eq!(category, Category::Unknown);
        assert_eq!(confidence, 0.0);
    }

    #[test]
    fn test_out_of_range_arg_max_is_unclassified() {
        // Head wider than the configured label space must not panic.
        let (category, _) = resolve_probabilities(&[0.1, 0.1, 0.1, 0.7], &LABELS, 0.5);
        assert_eq!(category, Category::Unclassified);
    }

    #[test]
    fn test_missing_local_model_dir_is_config_error() {
        let config = crate::ModelConfig::from_local("/nonexistent/logsift-model");
        let err = EmbeddingClassifier::load(&config).unwrap_err();
        assert!(matches!(err, logsift_core::Error::Config(_)));
    }
}
