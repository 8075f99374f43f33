//! Metrics for the data hygiene pipeline.
//!
//! Only the `metrics` facade is used here; the hosting service decides which
//! recorder/exporter to install. Metric names follow Prometheus conventions.

use std::fmt;

/// Enum representing all metric names used in the system
/// This eliminates magic strings and provides compile-time safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Analysis metrics
    AnalysisFilesAnalyzed,
    AnalysisRowsAnalyzed,
    AnalysisIssuesDetected,
    AnalysisDuration,

    // Cleaning metrics
    CleaningRowsCleaned,
    CleaningRowsUnchanged,
    CleaningRowsRejected,
    CleaningCellsModified,
    CleaningDuration,

    // Export metrics
    ExportArtifactsWritten,
}

impl MetricName {
    /// Get the metric name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::AnalysisFilesAnalyzed => "dh_analysis_files_analyzed_total",
            MetricName::AnalysisRowsAnalyzed => "dh_analysis_rows_analyzed_total",
            MetricName::AnalysisIssuesDetected => "dh_analysis_issues_detected_total",
            MetricName::AnalysisDuration => "dh_analysis_duration_seconds",

            MetricName::CleaningRowsCleaned => "dh_cleaning_rows_cleaned_total",
            MetricName::CleaningRowsUnchanged => "dh_cleaning_rows_unchanged_total",
            MetricName::CleaningRowsRejected => "dh_cleaning_rows_rejected_total",
            MetricName::CleaningCellsModified => "dh_cleaning_cells_modified_total",
            MetricName::CleaningDuration => "dh_cleaning_duration_seconds",

            MetricName::ExportArtifactsWritten => "dh_export_artifacts_written_total",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Analysis Metrics
// ============================================================================

pub mod analysis {
    use super::MetricName;

    /// Record a completed file analysis
    pub fn file_analyzed() {
        ::metrics::counter!(MetricName::AnalysisFilesAnalyzed.as_str()).increment(1);
    }

    /// Record the number of rows covered by an analysis run
    pub fn rows_analyzed(count: u64) {
        ::metrics::counter!(MetricName::AnalysisRowsAnalyzed.as_str()).increment(count);
    }

    /// Record a detected issue, labelled by type and severity
    pub fn issue_detected(issue_type: &str, severity: &str) {
        ::metrics::counter!(
            MetricName::AnalysisIssuesDetected.as_str(),
            "issue_type" => issue_type.to_string(),
            "severity" => severity.to_string()
        )
        .increment(1);
    }

    /// Record analysis duration
    pub fn duration(secs: f64) {
        ::metrics::histogram!(MetricName::AnalysisDuration.as_str()).record(secs);
    }
}

// ============================================================================
// Cleaning Metrics
// ============================================================================

pub mod cleaning {
    use super::MetricName;

    /// Record a row whose cells were modified
    pub fn row_cleaned() {
        ::metrics::counter!(MetricName::CleaningRowsCleaned.as_str()).increment(1);
    }

    /// Record a row that passed through untouched
    pub fn row_unchanged() {
        ::metrics::counter!(MetricName::CleaningRowsUnchanged.as_str()).increment(1);
    }

    /// Record a rejected row
    pub fn row_rejected() {
        ::metrics::counter!(MetricName::CleaningRowsRejected.as_str()).increment(1);
    }

    /// Record modified cells
    pub fn cells_modified(count: u64) {
        ::metrics::counter!(MetricName::CleaningCellsModified.as_str()).increment(count);
    }

    /// Record cleaning duration
    pub fn duration(secs: f64) {
        ::metrics::histogram!(MetricName::CleaningDuration.as_str()).record(secs);
    }
}

// ============================================================================
// Export Metrics
// ============================================================================

pub mod export {
    use super::MetricName;

    /// Record a written export artifact, labelled by kind
    pub fn artifact_written(kind: &str) {
        ::metrics::counter!(
            MetricName::ExportArtifactsWritten.as_str(),
            "kind" => kind.to_string()
        )
        .increment(1);
    }
}
