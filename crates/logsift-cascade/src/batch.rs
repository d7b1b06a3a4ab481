//! CSV batch classification
//!
//! Validates the header before any row is classified, then runs a
//! sequential per-row loop. A row-level failure never aborts the batch:
//! the row's label cell is left empty (null) and the failure is recorded in
//! the report.

use crate::router::CascadeRouter;
use logsift_core::{Error, Result};
use serde::Serialize;

/// Required input column: originating system identifier
pub const SOURCE_COLUMN: &str = "source";
/// Required input column: raw log message
pub const MESSAGE_COLUMN: &str = "log_message";
/// Appended output column
pub const LABEL_COLUMN: &str = "label";

/// One captured row-level failure
#[derive(Debug, Clone, Serialize)]
pub struct RowFailure {
    /// Zero-based data-row index (header excluded)
    pub row: usize,
    /// Human-readable failure description
    pub error: String,
}

/// Partial-results summary for a batch
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    /// Total data rows processed
    pub rows: usize,
    /// Rows whose label is null
    pub failures: Vec<RowFailure>,
}

/// Annotated table plus its report
#[derive(Debug)]
pub struct BatchOutput {
    /// The input table with the `label` column appended, CSV-encoded
    pub csv: Vec<u8>,
    /// Per-row outcome summary
    pub report: BatchReport,
}

/// Classify every row of a CSV table.
///
/// The input must carry `source` and `log_message` columns; extra columns
/// pass through untouched. Missing required columns fail the whole request
/// with `InvalidInput` naming them, before any row is classified.
pub async fn classify_csv(router: &CascadeRouter, input: &[u8]) -> Result<BatchOutput> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(input);

    let headers = reader
        .headers()
        .map_err(|e| Error::invalid_input(format!("unreadable CSV header: {}", e)))?
        .clone();

    let source_idx = headers.iter().position(|h| h == SOURCE_COLUMN);
    let message_idx = headers.iter().position(|h| h == MESSAGE_COLUMN);

    let missing: Vec<&str> = [
        (SOURCE_COLUMN, source_idx),
        (MESSAGE_COLUMN, message_idx),
    ]
    .iter()
    .filter(|(_, idx)| idx.is_none())
    .map(|(name, _)| *name)
    .collect();

    let (source_idx, message_idx) = match (source_idx, message_idx) {
        (Some(source_idx), Some(message_idx)) => (source_idx, message_idx),
        _ => {
            return Err(Error::invalid_input(format!(
                "missing required columns: {}",
                missing.join(", ")
            )));
        }
    };

    let mut writer = csv::Writer::from_writer(Vec::new());
    let mut out_header = headers.clone();
    out_header.push_field(LABEL_COLUMN);
    writer
        .write_record(&out_header)
        .map_err(|e| Error::Classifier(format!("failed to write CSV header: {}", e)))?;

    let mut rows = 0usize;
    let mut failures = Vec::new();

    for (row, record) in reader.records().enumerate() {
        rows += 1;

        let record = match record {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(row, "unreadable CSV row: {}", e);
                failures.push(RowFailure {
                    row,
                    error: format!("unreadable row: {}", e),
                });
                continue;
            }
        };

        let source = record.get(source_idx).unwrap_or("");
        let message = record.get(message_idx).unwrap_or("");

        let label = match router.classify(source, message).await {
            Ok(result) => result.category.label().to_string(),
            Err(e) => {
                tracing::warn!(row, source, "row classification failed: {}", e);
                failures.push(RowFailure {
                    row,
                    error: e.to_string(),
                });
                String::new()
            }
        };

        let mut out_record = csv::StringRecord::new();
        for field in record.iter() {
            out_record.push_field(field);
        }
        out_record.push_field(&label);
        writer
            .write_record(&out_record)
            .map_err(|e| Error::Classifier(format!("failed to write CSV row: {}", e)))?;
    }

    let csv = writer
        .into_inner()
        .map_err(|e| Error::Classifier(format!("failed to flush CSV output: {}", e)))?;

    tracing::info!(
        rows,
        failed = failures.len(),
        "batch classification complete"
    );

    Ok(BatchOutput {
        csv,
        report: BatchReport { rows, failures },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FailingClassifier, FixedClassifier};
    use logsift_classifiers::RegexMatcher;
    use logsift_core::{Category, Classifier, Producer};
    use std::sync::Arc;

    fn test_router() -> CascadeRouter {
        CascadeRouter::new(
            RegexMatcher::with_default_patterns(),
            Arc::new(FixedClassifier::new(Category::Unknown, Producer::Embedding))
                as Arc<dyn Classifier>,
            Arc::new(FixedClassifier::new(
                Category::WorkflowError,
                Producer::Llm,
            )) as Arc<dyn Classifier>,
        )
    }

    fn parse_output(csv_bytes: &[u8]) -> Vec<Vec<String>> {
        let mut reader = csv::Reader::from_reader(csv_bytes);
        let mut out = vec![reader
            .headers()
            .unwrap()
            .iter()
            .map(str::to_string)
            .collect::<Vec<_>>()];
        for record in reader.records() {
            out.push(record.unwrap().iter().map(str::to_string).collect());
        }
        out
    }

    #[tokio::test]
    async fn test_missing_column_fails_before_classifying() {
        let embedding = Arc::new(FixedClassifier::new(Category::Unknown, Producer::Embedding));
        let llm = Arc::new(FixedClassifier::new(
            Category::WorkflowError,
            Producer::Llm,
        ));
        let router = CascadeRouter::new(
            RegexMatcher::with_default_patterns(),
            embedding.clone() as Arc<dyn Classifier>,
            llm.clone() as Arc<dyn Classifier>,
        );
        let input = b"source,message\nModernHR,hello\nLegacyCRM,hello\n";

        let err = classify_csv(&router, input).await.unwrap_err();
        match err {
            logsift_core::Error::InvalidInput(msg) => {
                assert!(msg.contains(MESSAGE_COLUMN), "message was: {}", msg);
            }
            other => panic!("expected InvalidInput, got {:?}", other),
        }

        // Header validation rejected the table before any row was classified.
        assert_eq!(embedding.call_count(), 0);
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_both_columns_lists_both() {
        let router = test_router();
        let input = b"a,b\n1,2\n";

        let err = classify_csv(&router, input).await.unwrap_err();
        match err {
            logsift_core::Error::InvalidInput(msg) => {
                assert!(msg.contains(SOURCE_COLUMN));
                assert!(msg.contains(MESSAGE_COLUMN));
            }
            other => panic!("expected InvalidInput, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_label_column_appended() {
        let router = test_router();
        let input = b"source,log_message\n\
            AnalyticsEngine,Backup completed successfully.\n\
            ModernHR,testing 123\n";

        let output = classify_csv(&router, input).await.unwrap();
        let table = parse_output(&output.csv);

        assert_eq!(table[0], vec!["source", "log_message", "label"]);
        assert_eq!(table[1][2], "System Notification");
        assert_eq!(table[2][2], "Unknown");
        assert_eq!(output.report.rows, 2);
        assert!(output.report.failures.is_empty());
    }

    #[tokio::test]
    async fn test_extra_columns_pass_through() {
        let router = test_router();
        let input = b"timestamp,source,log_message\n\
            2025-06-27T14:33:02Z,AnalyticsEngine,Backup completed successfully.\n";

        let output = classify_csv(&router, input).await.unwrap();
        let table = parse_output(&output.csv);

        assert_eq!(table[0], vec!["timestamp", "source", "log_message", "label"]);
        assert_eq!(table[1][0], "2025-06-27T14:33:02Z");
        assert_eq!(table[1][3], "System Notification");
    }

    #[tokio::test]
    async fn test_row_failure_yields_null_label_not_abort() {
        let router = CascadeRouter::new(
            RegexMatcher::with_default_patterns(),
            Arc::new(FixedClassifier::new(Category::Unknown, Producer::Embedding))
                as Arc<dyn Classifier>,
            Arc::new(FailingClassifier {
                producer: Producer::Llm,
            }) as Arc<dyn Classifier>,
        );

        let input = b"source,log_message\n\
            LegacyCRM,Case escalation for ticket ID 7012 failed\n\
            AnalyticsEngine,Backup completed successfully.\n";

        let output = classify_csv(&router, input).await.unwrap();
        let table = parse_output(&output.csv);

        // The LLM row has a null (empty) label; the batch continues.
        assert_eq!(table[1][2], "");
        assert_eq!(table[2][2], "System Notification");
        assert_eq!(output.report.rows, 2);
        assert_eq!(output.report.failures.len(), 1);
        assert_eq!(output.report.failures[0].row, 0);
        assert!(output.report.failures[0].error.contains("service unavailable"));
    }

    #[tokio::test]
    async fn test_empty_table_is_valid() {
        let router = test_router();
        let input = b"source,log_message\n";

        let output = classify_csv(&router, input).await.unwrap();
        assert_eq!(output.report.rows, 0);
        assert!(output.report.failures.is_empty());
    }
}
