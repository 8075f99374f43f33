use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::observability::metrics;
use crate::pipeline::processing::analysis::{AnalysisReport, Analyzer};
use crate::pipeline::processing::validators::{FieldType, ValidationRules};

/// Use case wrapping the pure analyzer with file I/O, logging and metrics.
/// The analyzer itself stays deterministic; everything time- or
/// environment-dependent lives here.
pub struct AnalyzeUseCase {
    analyzer: Analyzer,
}

impl AnalyzeUseCase {
    pub fn new() -> Self {
        Self {
            analyzer: Analyzer::new(),
        }
    }

    pub fn with_column_types(mut self, mapping: HashMap<String, FieldType>) -> Self {
        self.analyzer = std::mem::take(&mut self.analyzer).with_column_types(mapping);
        self
    }

    pub fn with_column_rules(mut self, rules: HashMap<String, ValidationRules>) -> Self {
        self.analyzer = std::mem::take(&mut self.analyzer).with_column_rules(rules);
        self
    }

    /// Read a file and analyze its contents.
    pub fn analyze_file(&self, path: &Path) -> Result<AnalysisReport> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read input file '{}'", path.display()))?;
        self.analyze_bytes(&bytes)
    }

    /// Analyze an in-memory byte buffer, emitting metrics for the run.
    pub fn analyze_bytes(&self, bytes: &[u8]) -> Result<AnalysisReport> {
        let start_time = std::time::Instant::now();
        let report = self.analyzer.analyze_bytes(bytes)?;

        metrics::analysis::file_analyzed();
        metrics::analysis::rows_analyzed(report.file_info.row_count as u64);
        for issue in &report.issues {
            metrics::analysis::issue_detected(
                issue.issue_type.as_str(),
                issue.severity.as_str(),
            );
        }
        metrics::analysis::duration(start_time.elapsed().as_secs_f64());

        info!(
            "Analysis: rows={} columns={} issues={} errors={} encoding={}",
            report.file_info.row_count,
            report.file_info.column_count,
            report.summary.total_issues,
            report.summary.error_count,
            report.encoding.encoding
        );

        Ok(report)
    }
}

impl Default for AnalyzeUseCase {
    fn default() -> Self {
        Self::new()
    }
}
