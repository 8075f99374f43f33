use std::collections::HashMap;

use data_hygiene::app::analyze_use_case::AnalyzeUseCase;
use data_hygiene::app::clean_use_case::CleanUseCase;
use data_hygiene::pipeline::ingestion::encoding::{decode_bytes, sniff_encoding};
use data_hygiene::pipeline::ingestion::reader::TableReader;
use data_hygiene::pipeline::processing::analysis::{analyze, IssueType, Severity};
use data_hygiene::pipeline::processing::cleaning::{clean, CleaningConfig, RowDecision};
use data_hygiene::pipeline::processing::validators::FieldType;

fn column_types() -> HashMap<String, FieldType> {
    let mut mapping = HashMap::new();
    mapping.insert("employee_id".to_string(), FieldType::EmployeeId);
    mapping.insert("email".to_string(), FieldType::Email);
    mapping.insert("notes".to_string(), FieldType::Text);
    mapping
}

/// Three-row file: row 1 fully valid, row 2 missing a required email (key
/// field), row 3 with a trailing NBSP in a non-key text field.
const SCENARIO: &str = "employee_id,email,notes\n\
    E001,alice@example.com,fine\n\
    E002,,also fine\n\
    E003,carol@example.com,ends badly\u{00A0}\n";

#[test]
fn end_to_end_scenario_rejects_and_diffs_exactly_as_expected() {
    let bytes = SCENARIO.as_bytes();
    let mapping = column_types();
    let report = analyze(bytes, Some(&mapping)).unwrap();

    // The empty email must surface as a key-field ERROR on report row 3
    assert!(report
        .issues
        .iter()
        .any(|i| i.issue_type == IssueType::MissingRequired
            && i.severity == Severity::Error
            && i.row == 3
            && i.column == 1));

    let encoding = sniff_encoding(bytes);
    let text = decode_bytes(bytes, &encoding);
    let table = TableReader::parse_auto(&text).unwrap();

    let result = clean(&table.rows, &table.headers, &report, None);

    // 2 surviving rows, 1 rejected, every input row accounted for
    assert_eq!(result.cleaned_rows.len(), 2);
    assert_eq!(result.rejected_rows.len(), 1);
    assert_eq!(
        result.cleaned_rows.len() + result.rejected_rows.len(),
        table.rows.len()
    );

    // The rejected row is row 2, citing the email field
    let rejected = &result.rejected_rows[0];
    assert_eq!(rejected.row_index, 2);
    assert!(rejected.reject_reasons.iter().any(|r| r.contains("email")));

    // Exactly one diff: the NBSP fix in row 3's notes cell
    assert_eq!(result.diffs.len(), 1);
    let diff = &result.diffs[0];
    assert_eq!(diff.row, 3);
    assert_eq!(diff.column_name, "notes");
    assert_eq!(diff.cleaned_value, "ends badly");

    // Decisions line up: unchanged, rejected, cleaned
    let decisions: Vec<RowDecision> = result.row_results.iter().map(|r| r.decision).collect();
    assert_eq!(
        decisions,
        vec![
            RowDecision::Unchanged,
            RowDecision::Rejected,
            RowDecision::Cleaned
        ]
    );
}

#[test]
fn rejection_matches_key_field_errors_exactly() {
    let bytes = SCENARIO.as_bytes();
    let mapping = column_types();
    let report = analyze(bytes, Some(&mapping)).unwrap();

    let encoding = sniff_encoding(bytes);
    let text = decode_bytes(bytes, &encoding);
    let table = TableReader::parse_auto(&text).unwrap();
    let result = clean(&table.rows, &table.headers, &report, None);

    let key_columns = [0usize, 1];
    for row_result in &result.row_results {
        let report_row = row_result.row_index + 1;
        let has_key_error = report.issues.iter().any(|i| {
            i.severity == Severity::Error
                && i.row == report_row
                && key_columns.contains(&i.column)
        });
        assert_eq!(
            row_result.decision == RowDecision::Rejected,
            has_key_error,
            "row {} decision disagrees with key-field errors",
            row_result.row_index
        );
    }
}

#[test]
fn recleaning_cleaned_output_changes_nothing() {
    let bytes = SCENARIO.as_bytes();
    let mapping = column_types();
    let report = analyze(bytes, Some(&mapping)).unwrap();

    let encoding = sniff_encoding(bytes);
    let text = decode_bytes(bytes, &encoding);
    let table = TableReader::parse_auto(&text).unwrap();
    let first = clean(&table.rows, &table.headers, &report, None);

    // Re-analyze the cleaned output and clean again
    let reanalysis = data_hygiene::pipeline::processing::analysis::Analyzer::new()
        .with_column_types(mapping)
        .analyze_table(&table.headers, &first.cleaned_rows);
    let second = clean(&first.cleaned_rows, &table.headers, &reanalysis, None);

    assert!(second.diffs.is_empty());
    assert_eq!(second.summary.rejected_count, 0);
    assert_eq!(second.cleaned_rows, first.cleaned_rows);
}

#[test]
fn bom_file_analyzed_and_cleaned_through_use_cases() {
    let mut bytes = vec![0xEF, 0xBB, 0xBF];
    bytes.extend_from_slice(b"employee_id,email\nE001,alice@example.com\n  E002  ,bob@example.com\n");

    let analyze_use_case = AnalyzeUseCase::new().with_column_types(column_types());
    let report = analyze_use_case.analyze_bytes(&bytes).unwrap();

    assert!(report.encoding.has_bom);
    assert!(report.issues.iter().any(|i| i.issue_type == IssueType::Bom));

    let encoding = sniff_encoding(&bytes);
    let text = decode_bytes(&bytes, &encoding);
    let table = TableReader::parse_auto(&text).unwrap();

    let temp = tempfile::tempdir().unwrap();
    let clean_use_case = CleanUseCase::new(CleaningConfig::default());
    let (result, artifacts) = clean_use_case
        .run_and_export(&table.rows, &table.headers, &report, temp.path())
        .unwrap();

    assert_eq!(result.summary.rejected_count, 0);
    assert_eq!(result.summary.cleaned_count, 1);

    // Exported cleaned file parses back with the whitespace gone
    let cleaned_text = std::fs::read_to_string(&artifacts.cleaned_path).unwrap();
    let reparsed = TableReader::new().parse(&cleaned_text).unwrap();
    assert_eq!(reparsed.rows.len(), 2);
    assert_eq!(reparsed.rows[1][0], "E002");

    let manifest_text = std::fs::read_to_string(&artifacts.manifest_path).unwrap();
    assert!(manifest_text.contains(&artifacts.job_id.to_string()));
}

#[test]
fn quoted_fields_with_commas_survive_export_round_trip() {
    let headers = vec!["employee_id".to_string(), "notes".to_string()];
    let rows = vec![vec![
        "E001".to_string(),
        "likes a, b and \"c\"".to_string(),
    ]];

    let report = data_hygiene::pipeline::processing::analysis::Analyzer::new()
        .with_column_types(column_types())
        .analyze_table(&headers, &rows);
    let result = clean(&rows, &headers, &report, None);

    let temp = tempfile::tempdir().unwrap();
    let artifacts =
        data_hygiene::pipeline::export::write_artifacts(temp.path(), &report, &result).unwrap();

    let cleaned_text = std::fs::read_to_string(&artifacts.cleaned_path).unwrap();
    let reparsed = TableReader::new().parse(&cleaned_text).unwrap();
    assert_eq!(reparsed.rows[0][1], "likes a, b and \"c\"");
}
