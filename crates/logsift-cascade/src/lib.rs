//! LogSift Cascade
//!
//! Composes the three classifier leaves into the routing policy from the
//! system design, and drives it over CSV batches:
//! - LLM-only sources (default: `LegacyCRM`) route straight to the LLM
//!   classifier with no fallback
//! - everything else tries the regex table first, then the embedding
//!   classifier
//!
//! No retries, no cross-call caching; batch classification is a sequential
//! per-row loop with per-row failure capture.

pub mod batch;
pub mod router;

pub use batch::{classify_csv, BatchOutput, BatchReport, RowFailure};
pub use router::CascadeRouter;
