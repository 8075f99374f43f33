use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::Result;
use crate::pipeline::processing::analysis::AnalysisReport;
use crate::pipeline::processing::cleaning::CleaningResult;

/// Paths of the artifacts one export run produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportArtifacts {
    pub job_id: Uuid,
    pub cleaned_path: PathBuf,
    pub rejects_path: PathBuf,
    pub issues_path: PathBuf,
    pub manifest_path: PathBuf,
}

/// Manifest describing one export run, written next to the artifacts so
/// downstream persistence can key audit records by job id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportManifest {
    pub job_id: Uuid,
    pub exported_at: DateTime<Utc>,
    /// SHA-256 of the source bytes when the run started from a file
    pub content_digest: Option<String>,
    pub total_rows: usize,
    pub cleaned_rows: usize,
    pub rejected_rows: usize,
    pub total_issues: usize,
}

/// Write the cleaned CSV, rejects CSV, issue audit dump and manifest for a
/// completed cleaning run. The `csv` crate handles quoting, so fields with
/// embedded commas, quotes or newlines round-trip safely.
pub fn write_artifacts(
    output_dir: &Path,
    report: &AnalysisReport,
    result: &CleaningResult,
) -> Result<ExportArtifacts> {
    fs::create_dir_all(output_dir)?;
    let job_id = Uuid::new_v4();

    let cleaned_path = output_dir.join("cleaned.csv");
    write_cleaned_csv(&cleaned_path, result)?;

    let rejects_path = output_dir.join("rejects.csv");
    write_rejects_csv(&rejects_path, result)?;

    let issues_path = output_dir.join("issues.json");
    let issues_json = serde_json::to_string_pretty(&report.issues)?;
    fs::write(&issues_path, issues_json)?;

    let manifest = ExportManifest {
        job_id,
        exported_at: Utc::now(),
        content_digest: report.file_info.content_digest.clone(),
        total_rows: result.summary.total_rows,
        cleaned_rows: result.cleaned_rows.len(),
        rejected_rows: result.rejected_rows.len(),
        total_issues: report.summary.total_issues,
    };
    let manifest_path = output_dir.join("manifest.json");
    fs::write(&manifest_path, serde_json::to_string_pretty(&manifest)?)?;

    info!(
        "Export: job_id={} cleaned={} rejected={} dir={}",
        job_id,
        manifest.cleaned_rows,
        manifest.rejected_rows,
        output_dir.display()
    );

    Ok(ExportArtifacts {
        job_id,
        cleaned_path,
        rejects_path,
        issues_path,
        manifest_path,
    })
}

/// Headers plus every non-rejected row, cells already normalized.
fn write_cleaned_csv(path: &Path, result: &CleaningResult) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    if !result.headers.is_empty() {
        writer.write_record(&result.headers)?;
        for row in &result.cleaned_rows {
            writer.write_record(row)?;
        }
    }
    writer.flush()?;
    Ok(())
}

/// Rejected rows with their original position and the reasons, one column
/// appended after the source headers.
fn write_rejects_csv(path: &Path, result: &CleaningResult) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;

    let mut header_record: Vec<String> = vec!["row_index".to_string()];
    header_record.extend(result.headers.iter().cloned());
    header_record.push("reject_reasons".to_string());
    writer.write_record(&header_record)?;

    for rejected in &result.rejected_rows {
        let mut record: Vec<String> = vec![rejected.row_index.to_string()];
        record.extend(rejected.row.iter().cloned());
        record.push(rejected.reject_reasons.join("; "));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::processing::analysis::Analyzer;
    use crate::pipeline::processing::cleaning::clean;
    use crate::pipeline::processing::validators::FieldType;
    use std::collections::HashMap;

    fn run_pipeline() -> (AnalysisReport, CleaningResult) {
        let headers: Vec<String> = vec!["employee_id".to_string(), "email".to_string()];
        let rows: Vec<Vec<String>> = vec![
            vec!["E001".to_string(), "alice@example.com".to_string()],
            vec!["E002".to_string(), String::new()],
        ];
        let mut mapping = HashMap::new();
        mapping.insert("employee_id".to_string(), FieldType::EmployeeId);
        mapping.insert("email".to_string(), FieldType::Email);
        let report = Analyzer::new()
            .with_column_types(mapping)
            .analyze_table(&headers, &rows);
        let result = clean(&rows, &headers, &report, None);
        (report, result)
    }

    #[test]
    fn writes_all_four_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let (report, result) = run_pipeline();

        let artifacts = write_artifacts(dir.path(), &report, &result).unwrap();
        assert!(artifacts.cleaned_path.exists());
        assert!(artifacts.rejects_path.exists());
        assert!(artifacts.issues_path.exists());
        assert!(artifacts.manifest_path.exists());
    }

    #[test]
    fn cleaned_csv_contains_only_accepted_rows() {
        let dir = tempfile::tempdir().unwrap();
        let (report, result) = run_pipeline();
        let artifacts = write_artifacts(dir.path(), &report, &result).unwrap();

        let content = fs::read_to_string(&artifacts.cleaned_path).unwrap();
        assert!(content.contains("E001"));
        assert!(!content.contains("E002"));
    }

    #[test]
    fn rejects_csv_carries_row_index_and_reasons() {
        let dir = tempfile::tempdir().unwrap();
        let (report, result) = run_pipeline();
        let artifacts = write_artifacts(dir.path(), &report, &result).unwrap();

        let content = fs::read_to_string(&artifacts.rejects_path).unwrap();
        let mut lines = content.lines();
        assert_eq!(lines.next().unwrap(), "row_index,employee_id,email,reject_reasons");
        let reject_line = lines.next().unwrap();
        assert!(reject_line.starts_with("2,E002,"));
        assert!(reject_line.contains("email"));
    }

    #[test]
    fn manifest_counts_match_result() {
        let dir = tempfile::tempdir().unwrap();
        let (report, result) = run_pipeline();
        write_artifacts(dir.path(), &report, &result).unwrap();

        let manifest_text = fs::read_to_string(dir.path().join("manifest.json")).unwrap();
        let manifest: ExportManifest = serde_json::from_str(&manifest_text).unwrap();
        assert_eq!(manifest.total_rows, 2);
        assert_eq!(manifest.cleaned_rows, 1);
        assert_eq!(manifest.rejected_rows, 1);
    }
}
