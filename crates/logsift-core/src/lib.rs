//! LogSift Core
//!
//! Core types, traits, and error handling shared across LogSift components.
//!
//! This crate provides:
//! - The unified `Category` label set and `Producer` provenance tag
//! - `LogRecord` and `ClassificationResult` data types
//! - The `Classifier` trait implemented by every cascade leaf
//! - Error types and result handling

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{Category, ClassificationResult, Classifier, LogRecord, Producer};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::types::{Category, ClassificationResult, Classifier, LogRecord, Producer};
}
