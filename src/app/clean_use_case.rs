use std::path::Path;

use anyhow::Result;
use tracing::info;

use crate::observability::metrics;
use crate::pipeline::export::{write_artifacts, ExportArtifacts};
use crate::pipeline::processing::analysis::AnalysisReport;
use crate::pipeline::processing::cleaning::{
    Cleaner, CleaningConfig, CleaningResult, RowDecision,
};

/// Use case wrapping the pure cleaner with metrics, logging and export.
pub struct CleanUseCase {
    cleaner: Cleaner,
}

impl CleanUseCase {
    pub fn new(config: CleaningConfig) -> Self {
        Self {
            cleaner: Cleaner::new(config),
        }
    }

    /// Clean a table under its analysis report, emitting per-decision
    /// metrics for the run.
    pub fn run(
        &self,
        rows: &[Vec<String>],
        headers: &[String],
        report: &AnalysisReport,
    ) -> CleaningResult {
        let start_time = std::time::Instant::now();
        let result = self.cleaner.clean(rows, headers, report);

        for row_result in &result.row_results {
            match row_result.decision {
                RowDecision::Cleaned => metrics::cleaning::row_cleaned(),
                RowDecision::Unchanged => metrics::cleaning::row_unchanged(),
                RowDecision::Rejected => metrics::cleaning::row_rejected(),
            }
        }
        metrics::cleaning::cells_modified(result.summary.cells_modified as u64);
        metrics::cleaning::duration(start_time.elapsed().as_secs_f64());

        info!(
            "Cleaning: total={} cleaned={} unchanged={} rejected={}",
            result.summary.total_rows,
            result.summary.cleaned_count,
            result.summary.unchanged_count,
            result.summary.rejected_count
        );

        result
    }

    /// Clean and write the export artifacts in one step.
    pub fn run_and_export(
        &self,
        rows: &[Vec<String>],
        headers: &[String],
        report: &AnalysisReport,
        output_dir: &Path,
    ) -> Result<(CleaningResult, ExportArtifacts)> {
        let result = self.run(rows, headers, report);
        let artifacts = write_artifacts(output_dir, report, &result)?;

        metrics::export::artifact_written("cleaned_csv");
        metrics::export::artifact_written("rejects_csv");
        metrics::export::artifact_written("issues_json");

        Ok((result, artifacts))
    }
}

impl Default for CleanUseCase {
    fn default() -> Self {
        Self::new(CleaningConfig::default())
    }
}
