//! LogSift Classifiers
//!
//! The three cascade leaves:
//! - `RegexMatcher`: ordered anchored pattern table, pure and synchronous
//! - `EmbeddingClassifier`: candle-based sentence embedding + linear head,
//!   with a manual abstention threshold
//! - `LlmClassifier`: one chat-completions request against a hosted LLM with
//!   a closed-set prompt and validated output
//!
//! The regex matcher is infallible over all inputs. The other two leaves load
//! their external collaborators (model weights, HTTP client) exactly once via
//! explicit constructors and are reentrant afterwards.

pub mod embedding;
pub mod llm;
pub mod model_config;
pub mod regex_matcher;

pub use embedding::EmbeddingClassifier;
pub use llm::{LlmClassifier, LlmConfig};
pub use model_config::{DeviceSpec, ModelConfig, ModelSource};
pub use regex_matcher::RegexMatcher;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::embedding::EmbeddingClassifier;
    pub use crate::llm::{LlmClassifier, LlmConfig};
    pub use crate::model_config::{DeviceSpec, ModelConfig, ModelSource};
    pub use crate::regex_matcher::RegexMatcher;
}
