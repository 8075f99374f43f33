use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;

/// A parsed tabular file: one header row plus data rows, all cells as text.
/// Rows are padded or truncated to the header width so every downstream
/// stage can index cells by column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// The delimiter the table was parsed with
    pub delimiter: u8,
}

/// Table reader with configurable delimiter.
pub struct TableReader {
    delimiter: u8,
}

impl Default for TableReader {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

impl TableReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Parse decoded text into headers and rows.
    ///
    /// Short rows are padded with empty cells and long rows truncated to the
    /// header width; both cases are logged, never fatal. Cell text is kept
    /// verbatim (no trimming) so the analyzer sees the raw values.
    pub fn parse(&self, content: &str) -> Result<ParsedTable> {
        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .trim(csv::Trim::None)
            .flexible(true)
            .from_reader(content.as_bytes());

        let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
        let width = headers.len();

        let mut rows = Vec::new();
        for (index, result) in reader.records().enumerate() {
            let record = result?;
            let mut row: Vec<String> = record.iter().map(|f| f.to_string()).collect();
            if row.len() != width {
                debug!(
                    "TableReader: row {} has {} fields, header has {}",
                    index + 1,
                    row.len(),
                    width
                );
                row.resize(width, String::new());
            }
            rows.push(row);
        }

        debug!(
            "TableReader: parsed rows={} columns={}",
            rows.len(),
            width
        );
        Ok(ParsedTable {
            headers,
            rows,
            delimiter: self.delimiter,
        })
    }

    /// Parse with automatic delimiter detection over the leading lines.
    pub fn parse_auto(content: &str) -> Result<ParsedTable> {
        let delimiter = detect_delimiter(content);
        Self::new().with_delimiter(delimiter).parse(content)
    }
}

/// Detect the field delimiter (comma, semicolon, tab, pipe) from a content
/// sample. Candidates are scored by mean occurrences per line weighted down
/// by line-to-line inconsistency.
pub fn detect_delimiter(content: &str) -> u8 {
    let candidates = [b',', b';', b'\t', b'|'];
    let sample_lines: Vec<&str> = content.lines().take(10).collect();

    if sample_lines.is_empty() {
        warn!("detect_delimiter: empty content, defaulting to comma");
        return b',';
    }

    let mut best_delimiter = b',';
    let mut best_score = 0.0f64;

    for &delimiter in &candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| line.bytes().filter(|b| *b == delimiter).count())
            .collect();

        let avg = counts.iter().sum::<usize>() as f64 / counts.len() as f64;
        let variance = counts
            .iter()
            .map(|&c| (c as f64 - avg).powi(2))
            .sum::<f64>()
            / counts.len() as f64;

        let score = avg / (1.0 + variance.sqrt());
        if score > best_score {
            best_score = score;
            best_delimiter = delimiter;
        }
    }

    best_delimiter
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_table() {
        let content = "employee_id,email\nE001,alice@example.com\nE002,bob@example.com\n";
        let table = TableReader::new().parse(content).unwrap();

        assert_eq!(table.headers, vec!["employee_id", "email"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0][0], "E001");
        assert_eq!(table.rows[1][1], "bob@example.com");
    }

    #[test]
    fn pads_short_rows_to_header_width() {
        let content = "a,b,c\n1,2\n";
        let table = TableReader::new().parse(content).unwrap();
        assert_eq!(table.rows[0], vec!["1", "2", ""]);
    }

    #[test]
    fn keeps_cell_whitespace_verbatim() {
        let content = "name,city\n Alice ,NYC\n";
        let table = TableReader::new().parse(content).unwrap();
        assert_eq!(table.rows[0][0], " Alice ");
    }

    #[test]
    fn detects_comma_and_semicolon() {
        assert_eq!(detect_delimiter("a,b,c\nd,e,f"), b',');
        assert_eq!(detect_delimiter("a;b;c\nd;e;f"), b';');
        assert_eq!(detect_delimiter("a\tb\tc\nd\te\tf"), b'\t');
    }

    #[test]
    fn parse_auto_handles_semicolons() {
        let content = "id;name\n1;Alice\n2;Bob\n";
        let table = TableReader::parse_auto(content).unwrap();
        assert_eq!(table.delimiter, b';');
        assert_eq!(table.rows[0], vec!["1", "Alice"]);
    }

    #[test]
    fn quoted_fields_with_embedded_delimiters() {
        let content = "name,notes\nAlice,\"likes a, b and c\"\n";
        let table = TableReader::new().parse(content).unwrap();
        assert_eq!(table.rows[0][1], "likes a, b and c");
    }
}
