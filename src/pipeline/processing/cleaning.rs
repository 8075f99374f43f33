use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::constants::DEFAULT_KEY_FIELDS;
use crate::pipeline::processing::analysis::{AnalysisReport, Issue, Severity};
use crate::pipeline::processing::hidden_chars::replace_hidden_characters;

fn default_true() -> bool {
    true
}

fn default_key_fields() -> Vec<String> {
    DEFAULT_KEY_FIELDS.iter().map(|s| s.to_string()).collect()
}

/// Configuration for the cleaning pass. All normalizations default to on;
/// key fields default to the identity-bearing columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleaningConfig {
    #[serde(default = "default_true")]
    pub strip_bom: bool,
    #[serde(default = "default_true")]
    pub replace_hidden_chars: bool,
    #[serde(default = "default_true")]
    pub trim_whitespace: bool,
    /// Columns whose ERROR-level analysis issues force row rejection
    #[serde(default = "default_key_fields")]
    pub key_fields: Vec<String>,
    /// Free-text columns that additionally get internal whitespace runs
    /// collapsed to a single space
    #[serde(default)]
    pub text_fields: Vec<String>,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            strip_bom: true,
            replace_hidden_chars: true,
            trim_whitespace: true,
            key_fields: default_key_fields(),
            text_fields: Vec::new(),
        }
    }
}

/// The named normalization operations a cell can go through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CleanOp {
    #[serde(rename = "stripBOM")]
    StripBom,
    #[serde(rename = "replaceHiddenChars")]
    ReplaceHiddenChars,
    #[serde(rename = "trimWhitespace")]
    TrimWhitespace,
    #[serde(rename = "collapseWhitespace")]
    CollapseWhitespace,
}

impl CleanOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            CleanOp::StripBom => "stripBOM",
            CleanOp::ReplaceHiddenChars => "replaceHiddenChars",
            CleanOp::TrimWhitespace => "trimWhitespace",
            CleanOp::CollapseWhitespace => "collapseWhitespace",
        }
    }
}

/// One recorded cell change: emitted only when the cleaned value actually
/// differs from the original. Rows here are 1-indexed data rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellDiff {
    pub row: usize,
    pub column: usize,
    pub column_name: String,
    pub original_value: String,
    pub cleaned_value: String,
    pub operations: Vec<CleanOp>,
}

/// Per-row verdict after cleaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowDecision {
    Cleaned,
    Unchanged,
    Rejected,
}

/// A fully processed row: its cleaned cells, every diff, and the reasons it
/// was rejected (empty unless rejected).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowResult {
    /// 1-indexed data row number
    pub row_index: usize,
    pub decision: RowDecision,
    pub row: Vec<String>,
    pub diffs: Vec<CellDiff>,
    pub reject_reasons: Vec<String>,
}

/// Counts accumulated over a cleaning run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CleaningSummary {
    pub total_rows: usize,
    pub cleaned_count: usize,
    pub unchanged_count: usize,
    pub rejected_count: usize,
    pub cells_modified: usize,
    /// How many times each named operation fired across the whole file
    pub operation_counts: BTreeMap<String, usize>,
}

/// Output of the cleaning pipeline: the unit persisted and exported
/// downstream. Every input row appears in exactly one of `cleaned_rows` or
/// `rejected_rows`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleaningResult {
    pub headers: Vec<String>,
    pub cleaned_rows: Vec<Vec<String>>,
    pub rejected_rows: Vec<RowResult>,
    pub row_results: Vec<RowResult>,
    pub diffs: Vec<CellDiff>,
    pub summary: CleaningSummary,
}

/// Applies normalization cell-by-cell and partitions rows using the
/// analysis report as the authority on key-field errors.
pub struct Cleaner {
    config: CleaningConfig,
}

impl Cleaner {
    pub fn new(config: CleaningConfig) -> Self {
        Self { config }
    }

    /// Clean a table under a previously produced analysis report.
    ///
    /// A row is rejected iff at least one key-field column carries an
    /// ERROR-severity issue in the report; rejection is independent of
    /// whether any cell text changed. Every cell is cleaned regardless so
    /// the rejects export also reflects normalized text.
    pub fn clean(
        &self,
        rows: &[Vec<String>],
        headers: &[String],
        report: &AnalysisReport,
    ) -> CleaningResult {
        let error_index = build_error_index(report);
        let key_columns = resolve_columns(headers, &self.config.key_fields, "key");
        let text_columns = resolve_columns(headers, &self.config.text_fields, "text");

        let mut row_results: Vec<RowResult> = Vec::with_capacity(rows.len());
        let mut all_diffs: Vec<CellDiff> = Vec::new();
        let mut cleaned_rows: Vec<Vec<String>> = Vec::new();
        let mut rejected_rows: Vec<RowResult> = Vec::new();
        let mut summary = CleaningSummary {
            total_rows: rows.len(),
            ..Default::default()
        };

        for (index, row) in rows.iter().enumerate() {
            let data_row = index + 1;
            // Analysis reports count the header as row 1
            let report_row = index + 2;

            let mut reject_reasons = Vec::new();
            for &column in &key_columns {
                if let Some(errors) = error_index.get(&(report_row, column)) {
                    for issue in errors {
                        reject_reasons.push(format!(
                            "{}: {}",
                            headers[column], issue.description
                        ));
                    }
                }
            }

            let mut cleaned_cells = Vec::with_capacity(row.len());
            let mut diffs = Vec::new();
            for (column, original) in row.iter().enumerate() {
                let (cleaned, operations) =
                    self.clean_cell(original, text_columns.contains(&column));

                if cleaned != *original {
                    for op in &operations {
                        *summary
                            .operation_counts
                            .entry(op.as_str().to_string())
                            .or_insert(0) += 1;
                    }
                    summary.cells_modified += 1;
                    diffs.push(CellDiff {
                        row: data_row,
                        column,
                        column_name: headers.get(column).cloned().unwrap_or_default(),
                        original_value: original.clone(),
                        cleaned_value: cleaned.clone(),
                        operations,
                    });
                }
                cleaned_cells.push(cleaned);
            }

            let decision = if !reject_reasons.is_empty() {
                RowDecision::Rejected
            } else if !diffs.is_empty() {
                RowDecision::Cleaned
            } else {
                RowDecision::Unchanged
            };

            let result = RowResult {
                row_index: data_row,
                decision,
                row: cleaned_cells,
                diffs: diffs.clone(),
                reject_reasons,
            };

            match decision {
                RowDecision::Rejected => {
                    summary.rejected_count += 1;
                    rejected_rows.push(result.clone());
                }
                RowDecision::Cleaned => {
                    summary.cleaned_count += 1;
                    cleaned_rows.push(result.row.clone());
                }
                RowDecision::Unchanged => {
                    summary.unchanged_count += 1;
                    cleaned_rows.push(result.row.clone());
                }
            }

            all_diffs.extend(diffs);
            row_results.push(result);
        }

        debug!(
            "Cleaner: rows={} cleaned={} unchanged={} rejected={} cells_modified={}",
            summary.total_rows,
            summary.cleaned_count,
            summary.unchanged_count,
            summary.rejected_count,
            summary.cells_modified
        );

        CleaningResult {
            headers: headers.to_vec(),
            cleaned_rows,
            rejected_rows,
            row_results,
            diffs: all_diffs,
            summary,
        }
    }

    /// Normalize one cell in the fixed operation order, recording each
    /// operation that actually altered the value.
    fn clean_cell(&self, original: &str, collapse: bool) -> (String, Vec<CleanOp>) {
        let mut value = original.to_string();
        let mut operations = Vec::new();

        if self.config.strip_bom {
            let stripped = value.trim_start_matches('\u{FEFF}');
            if stripped.len() != value.len() {
                value = stripped.to_string();
                operations.push(CleanOp::StripBom);
            }
        }

        if self.config.replace_hidden_chars {
            let replaced = replace_hidden_characters(&value);
            if replaced != value {
                value = replaced;
                operations.push(CleanOp::ReplaceHiddenChars);
            }
        }

        if self.config.trim_whitespace {
            let trimmed = value.trim();
            if trimmed.len() != value.len() {
                value = trimmed.to_string();
                operations.push(CleanOp::TrimWhitespace);
            }
        }

        if collapse {
            let collapsed = collapse_whitespace(&value);
            if collapsed != value {
                value = collapsed;
                operations.push(CleanOp::CollapseWhitespace);
            }
        }

        (value, operations)
    }
}

/// Clean with an optional configuration; the entry point the ingestion
/// service calls.
pub fn clean(
    rows: &[Vec<String>],
    headers: &[String],
    report: &AnalysisReport,
    config: Option<&CleaningConfig>,
) -> CleaningResult {
    let cleaner = match config {
        Some(config) => Cleaner::new(config.clone()),
        None => Cleaner::new(CleaningConfig::default()),
    };
    cleaner.clean(rows, headers, report)
}

/// Index ERROR-severity issues by their (report row, column) cell.
fn build_error_index(report: &AnalysisReport) -> HashMap<(usize, usize), Vec<&Issue>> {
    let mut index: HashMap<(usize, usize), Vec<&Issue>> = HashMap::new();
    for issue in &report.issues {
        if issue.severity == Severity::Error {
            index.entry((issue.row, issue.column)).or_default().push(issue);
        }
    }
    index
}

/// Resolve configured field names to column indices by case-insensitive
/// header match. Unknown names are logged and skipped, never fatal.
fn resolve_columns(headers: &[String], names: &[String], kind: &str) -> Vec<usize> {
    let mut columns = Vec::new();
    for name in names {
        let found = headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name.trim()));
        match found {
            Some(column) => {
                if !columns.contains(&column) {
                    columns.push(column);
                }
            }
            None => {
                debug!("Cleaner: {} field '{}' not present in headers", kind, name);
            }
        }
    }
    if columns.is_empty() && !names.is_empty() && kind == "key" {
        warn!("Cleaner: none of the configured key fields matched the headers");
    }
    columns
}

/// Collapse interior whitespace runs to a single space.
fn collapse_whitespace(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut in_run = false;
    for c in value.chars() {
        if c.is_whitespace() {
            if !in_run {
                out.push(' ');
                in_run = true;
            }
        } else {
            out.push(c);
            in_run = false;
        }
    }
    out
}
