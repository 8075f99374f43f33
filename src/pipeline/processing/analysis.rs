use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::constants::{INFERENCE_PASS_RATE, INFERENCE_SAMPLE_SIZE};
use crate::error::Result;
use crate::pipeline::ingestion::encoding::{sniff_encoding, decode_bytes, BomType, EncodingResult};
use crate::pipeline::ingestion::reader::{ParsedTable, TableReader};
use crate::pipeline::processing::duplicates::find_duplicates;
use crate::pipeline::processing::hidden_chars::{detect_hidden_characters, replace_hidden_characters};
use crate::pipeline::processing::validators::{
    validate_field, FieldType, ValidationErrorKind, ValidationRules, ValidationWarningKind,
};

/// Severity levels for analysis issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "ERROR",
            Severity::Warning => "WARNING",
            Severity::Info => "INFO",
        }
    }
}

/// Kinds of problems the analyzer can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueType {
    Bom,
    Nbsp,
    ZeroWidth,
    SmartQuote,
    Encoding,
    InvalidFormat,
    Duplicate,
    MissingRequired,
    OutOfRange,
    Custom,
}

impl IssueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueType::Bom => "BOM",
            IssueType::Nbsp => "NBSP",
            IssueType::ZeroWidth => "ZERO_WIDTH",
            IssueType::SmartQuote => "SMART_QUOTE",
            IssueType::Encoding => "ENCODING",
            IssueType::InvalidFormat => "INVALID_FORMAT",
            IssueType::Duplicate => "DUPLICATE",
            IssueType::MissingRequired => "MISSING_REQUIRED",
            IssueType::OutOfRange => "OUT_OF_RANGE",
            IssueType::Custom => "CUSTOM",
        }
    }
}

/// One detected problem at a specific cell.
///
/// Rows are 1-indexed with the header counted as row 1, so data row `i`
/// (0-indexed) appears as report row `i + 2`. Columns are 0-indexed.
/// File-level issues (BOM, encoding) are attached to row 1, column 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub row: usize,
    pub column: usize,
    pub issue_type: IssueType,
    pub severity: Severity,
    pub original_value: String,
    pub suggested_fix: Option<String>,
    pub description: String,
}

/// Per-column rollup produced once per analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldReport {
    pub column: usize,
    pub name: String,
    /// Declared or inferred type; `None` when the column had no usable values
    pub field_type: Option<FieldType>,
    pub total_values: usize,
    pub empty_values: usize,
    pub invalid_values: usize,
    pub issues: Vec<Issue>,
}

/// File-level facts recorded alongside the analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileInfo {
    /// Raw input size; absent when analyzing pre-parsed rows
    pub size_bytes: Option<u64>,
    pub row_count: usize,
    pub column_count: usize,
    pub headers: Vec<String>,
    /// Delimiter the table was parsed with; absent for pre-parsed rows
    pub delimiter: Option<char>,
    /// SHA-256 of the raw bytes, the audit/idempotency key for re-uploads
    pub content_digest: Option<String>,
}

/// Issue counts by severity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub total_issues: usize,
    pub error_count: usize,
    pub warning_count: usize,
    pub info_count: usize,
}

/// The full analysis artifact. Produced fresh on every call and never
/// mutated afterward; identical input bytes produce an identical report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub file_info: FileInfo,
    pub encoding: EncodingResult,
    pub issues: Vec<Issue>,
    pub summary: AnalysisSummary,
    pub field_reports: Vec<FieldReport>,
}

/// Candidate order for field-type inference; also the tie-breaker.
/// Most specific first: the employee-id pattern also matches bare numbers,
/// currency codes and ISO dates, so it must be consulted last.
const INFERENCE_CANDIDATES: &[FieldType] = &[
    FieldType::Email,
    FieldType::Currency,
    FieldType::Date,
    FieldType::Number,
    FieldType::EmployeeId,
];

/// Encoding confidence below which a file-level warning is raised.
const ENCODING_CONFIDENCE_FLOOR: f64 = 0.7;

/// Analyzes a parsed table (or raw bytes) into an `AnalysisReport`.
#[derive(Default)]
pub struct Analyzer {
    /// Explicit column type declarations keyed by header name
    column_types: HashMap<String, FieldType>,
    /// Per-column validation rule overrides keyed by header name
    column_rules: HashMap<String, ValidationRules>,
}

impl Analyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare column types explicitly; headers match case-insensitively.
    pub fn with_column_types(mut self, mapping: HashMap<String, FieldType>) -> Self {
        self.column_types = mapping;
        self
    }

    /// Supply per-column validation rules; headers match case-insensitively.
    pub fn with_column_rules(mut self, rules: HashMap<String, ValidationRules>) -> Self {
        self.column_rules = rules;
        self
    }

    /// Analyze a raw byte buffer: sniff encoding, decode, parse, analyze.
    pub fn analyze_bytes(&self, bytes: &[u8]) -> Result<AnalysisReport> {
        let encoding = sniff_encoding(bytes);
        let text = decode_bytes(bytes, &encoding);
        let table = TableReader::parse_auto(&text)?;

        let digest = hex::encode(Sha256::digest(bytes));
        let file_info = FileInfo {
            size_bytes: Some(bytes.len() as u64),
            row_count: table.rows.len(),
            column_count: table.headers.len(),
            headers: table.headers.clone(),
            delimiter: Some(table.delimiter as char),
            content_digest: Some(digest),
        };

        Ok(self.run(&table, file_info, encoding))
    }

    /// Analyze pre-parsed rows and headers (already decoded upstream).
    pub fn analyze_table(&self, headers: &[String], rows: &[Vec<String>]) -> AnalysisReport {
        let table = ParsedTable {
            headers: headers.to_vec(),
            rows: rows.to_vec(),
            delimiter: b',',
        };
        let file_info = FileInfo {
            size_bytes: None,
            row_count: rows.len(),
            column_count: headers.len(),
            headers: headers.to_vec(),
            delimiter: None,
            content_digest: None,
        };
        // Pre-parsed rows are Rust strings, hence already valid UTF-8.
        let encoding = EncodingResult {
            encoding: "UTF-8".to_string(),
            confidence: 1.0,
            has_bom: false,
            bom_type: BomType::None,
        };

        self.run(&table, file_info, encoding)
    }

    fn run(&self, table: &ParsedTable, file_info: FileInfo, encoding: EncodingResult) -> AnalysisReport {
        let mut issues = Vec::new();

        if encoding.has_bom {
            issues.push(Issue {
                row: 1,
                column: 0,
                issue_type: IssueType::Bom,
                severity: Severity::Warning,
                original_value: String::new(),
                suggested_fix: Some("Remove the byte-order mark".to_string()),
                description: format!("{} byte-order mark at start of file", encoding.bom_type),
            });
        }
        if encoding.confidence < ENCODING_CONFIDENCE_FLOOR {
            issues.push(Issue {
                row: 1,
                column: 0,
                issue_type: IssueType::Encoding,
                severity: Severity::Warning,
                original_value: String::new(),
                suggested_fix: None,
                description: format!(
                    "Encoding detected as {} with low confidence {:.2}",
                    encoding.encoding, encoding.confidence
                ),
            });
        }

        let column_types = self.resolve_column_types(table);
        debug!(
            "Analyzer: resolved column types {:?}",
            column_types
                .iter()
                .zip(&table.headers)
                .map(|(t, h)| format!("{}={:?}", h, t))
                .collect::<Vec<_>>()
        );

        let mut field_stats: Vec<(usize, usize, usize)> = vec![(0, 0, 0); table.headers.len()];

        // Cell scan in row-major order keeps the issue list deterministic.
        // Cells beyond the header width are ignored, short rows read as empty.
        for (row_index, row) in table.rows.iter().enumerate() {
            let report_row = row_index + 2;
            for (column, value) in row.iter().take(table.headers.len()).enumerate() {
                let stats = &mut field_stats[column];
                stats.0 += 1;
                if value.trim().is_empty() {
                    stats.1 += 1;
                }

                for hidden in detect_hidden_characters(value, report_row, column) {
                    issues.push(hidden_char_issue(value, report_row, column, &hidden));
                }

                if let Some(field_type) = column_types[column] {
                    let rules = self.rules_for(&table.headers[column]);
                    let result = validate_field(value, field_type, &rules);
                    if !result.valid {
                        stats.2 += 1;
                    }
                    for error in &result.errors {
                        issues.push(Issue {
                            row: report_row,
                            column,
                            issue_type: match error.kind {
                                ValidationErrorKind::MissingRequired => IssueType::MissingRequired,
                                ValidationErrorKind::InvalidFormat => IssueType::InvalidFormat,
                                ValidationErrorKind::OutOfRange => IssueType::OutOfRange,
                            },
                            severity: Severity::Error,
                            original_value: value.clone(),
                            suggested_fix: None,
                            description: error.message.clone(),
                        });
                    }
                    for warning in &result.warnings {
                        issues.push(Issue {
                            row: report_row,
                            column,
                            issue_type: IssueType::Custom,
                            severity: match warning.kind {
                                ValidationWarningKind::AmbiguousDate => Severity::Warning,
                                ValidationWarningKind::LocaleFormat => Severity::Info,
                            },
                            original_value: value.clone(),
                            suggested_fix: None,
                            description: warning.message.clone(),
                        });
                    }
                }
            }
        }

        // Duplicate detection once per column, in column order.
        for (column, header) in table.headers.iter().enumerate() {
            let values: Vec<String> = table
                .rows
                .iter()
                .map(|row| row.get(column).cloned().unwrap_or_default())
                .collect();
            let groups = find_duplicates(&values);

            let mut flagged: Vec<(usize, String, usize)> = Vec::new();
            for (normalized, indices) in &groups {
                for &index in indices {
                    flagged.push((index, normalized.clone(), indices.len()));
                }
            }
            flagged.sort_by_key(|(index, _, _)| *index);

            for (index, normalized, count) in flagged {
                issues.push(Issue {
                    row: index + 2,
                    column,
                    issue_type: IssueType::Duplicate,
                    severity: Severity::Warning,
                    original_value: values[index].clone(),
                    suggested_fix: None,
                    description: format!(
                        "Value '{}' appears {} times in column '{}'",
                        normalized, count, header
                    ),
                });
            }
        }

        let field_reports = table
            .headers
            .iter()
            .enumerate()
            .map(|(column, name)| {
                let (total, empty, invalid) = field_stats[column];
                FieldReport {
                    column,
                    name: name.clone(),
                    field_type: column_types[column],
                    total_values: total,
                    empty_values: empty,
                    invalid_values: invalid,
                    issues: issues
                        .iter()
                        .filter(|i| i.column == column && i.row > 1)
                        .cloned()
                        .collect(),
                }
            })
            .collect();

        let summary = summarize(&issues);

        AnalysisReport {
            file_info,
            encoding,
            issues,
            summary,
            field_reports,
        }
    }

    fn rules_for(&self, header: &str) -> ValidationRules {
        self.column_rules
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(header.trim()))
            .map(|(_, rules)| rules.clone())
            .unwrap_or_default()
    }

    /// Resolve each column's field type: explicit declaration first,
    /// otherwise majority-vote inference over a bounded sample.
    fn resolve_column_types(&self, table: &ParsedTable) -> Vec<Option<FieldType>> {
        table
            .headers
            .iter()
            .enumerate()
            .map(|(column, header)| {
                let declared = self
                    .column_types
                    .iter()
                    .find(|(name, _)| name.eq_ignore_ascii_case(header.trim()))
                    .map(|(_, field_type)| *field_type);
                if declared.is_some() {
                    return declared;
                }
                infer_field_type(table.rows.iter().map(|row| row[column].as_str()))
            })
            .collect()
    }
}

/// Infer a column's field type by validating a sample of its non-empty
/// values against each candidate and picking the best pass rate above the
/// configured floor. Ties go to the earlier candidate; nothing passing
/// cleanly means TEXT. An all-empty column has no type.
pub fn infer_field_type<'a>(values: impl Iterator<Item = &'a str>) -> Option<FieldType> {
    let rules = ValidationRules::default();
    let sample: Vec<&str> = values
        .filter(|v| !v.trim().is_empty())
        .take(INFERENCE_SAMPLE_SIZE)
        .collect();

    if sample.is_empty() {
        return None;
    }

    let mut best: Option<(FieldType, f64)> = None;
    for &candidate in INFERENCE_CANDIDATES {
        let passes = sample
            .iter()
            .filter(|v| validate_field(v, candidate, &rules).valid)
            .count();
        let rate = passes as f64 / sample.len() as f64;
        if rate >= INFERENCE_PASS_RATE && best.map_or(true, |(_, b)| rate > b) {
            best = Some((candidate, rate));
        }
    }

    Some(best.map_or(FieldType::Text, |(field_type, _)| field_type))
}

fn hidden_char_issue(
    value: &str,
    report_row: usize,
    column: usize,
    hidden: &crate::pipeline::processing::hidden_chars::HiddenCharIssue,
) -> Issue {
    let issue_type = match hidden.char_type.as_str() {
        "NO_BREAK_SPACE" => IssueType::Nbsp,
        "ZERO_WIDTH_SPACE" | "ZERO_WIDTH_NON_JOINER" | "ZERO_WIDTH_JOINER"
        | "ZERO_WIDTH_NO_BREAK_SPACE" => IssueType::ZeroWidth,
        "LEFT_DOUBLE_QUOTE" | "RIGHT_DOUBLE_QUOTE" | "LEFT_SINGLE_QUOTE"
        | "RIGHT_SINGLE_QUOTE" | "EN_DASH" | "EM_DASH" | "ELLIPSIS" => IssueType::SmartQuote,
        _ => IssueType::Custom,
    };

    Issue {
        row: report_row,
        column,
        issue_type,
        severity: Severity::Warning,
        original_value: value.to_string(),
        suggested_fix: Some(replace_hidden_characters(value)),
        description: format!(
            "{} (U+{:04X}) at position {}",
            hidden.char_type, hidden.code_point as u32, hidden.position
        ),
    }
}

fn summarize(issues: &[Issue]) -> AnalysisSummary {
    let mut summary = AnalysisSummary {
        total_issues: issues.len(),
        ..Default::default()
    };
    for issue in issues {
        match issue.severity {
            Severity::Error => summary.error_count += 1,
            Severity::Warning => summary.warning_count += 1,
            Severity::Info => summary.info_count += 1,
        }
    }
    summary
}

/// Analyze raw file bytes with an optional explicit column-type mapping.
/// This is the primary entry point the ingestion service calls.
pub fn analyze(
    bytes: &[u8],
    column_mapping: Option<&HashMap<String, FieldType>>,
) -> Result<AnalysisReport> {
    let analyzer = match column_mapping {
        Some(mapping) => Analyzer::new().with_column_types(mapping.clone()),
        None => Analyzer::new(),
    };
    analyzer.analyze_bytes(bytes)
}
