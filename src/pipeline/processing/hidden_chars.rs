use serde::{Deserialize, Serialize};

/// Fixed table of invisible/confusable characters and their ASCII-safe
/// replacements. Characters outside this table are never altered.
const HIDDEN_CHAR_TABLE: &[(char, &str, &str)] = &[
    ('\u{00A0}', "NO_BREAK_SPACE", " "),
    ('\u{200B}', "ZERO_WIDTH_SPACE", ""),
    ('\u{200C}', "ZERO_WIDTH_NON_JOINER", ""),
    ('\u{200D}', "ZERO_WIDTH_JOINER", ""),
    ('\u{FEFF}', "ZERO_WIDTH_NO_BREAK_SPACE", ""),
    ('\u{201C}', "LEFT_DOUBLE_QUOTE", "\""),
    ('\u{201D}', "RIGHT_DOUBLE_QUOTE", "\""),
    ('\u{2018}', "LEFT_SINGLE_QUOTE", "'"),
    ('\u{2019}', "RIGHT_SINGLE_QUOTE", "'"),
    ('\u{2013}', "EN_DASH", "-"),
    ('\u{2014}', "EM_DASH", "-"),
    ('\u{2026}', "ELLIPSIS", "..."),
];

/// One hidden or confusable character found in a cell value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HiddenCharIssue {
    /// 1-indexed data row the value came from
    pub row: usize,
    /// 0-indexed column the value came from
    pub column: usize,
    /// Character offset within the value, counted in code points
    pub position: usize,
    /// The offending code point
    pub code_point: char,
    /// Stable label for the character class (e.g. "ZERO_WIDTH_SPACE")
    pub char_type: String,
    /// ASCII-safe replacement text (may be empty for zero-width marks)
    pub replacement: String,
}

fn lookup(c: char) -> Option<(&'static str, &'static str)> {
    HIDDEN_CHAR_TABLE
        .iter()
        .find(|(ch, _, _)| *ch == c)
        .map(|(_, label, replacement)| (*label, *replacement))
}

/// Scan a value for hidden/confusable characters.
///
/// Iterates code points (not UTF-16 units), so offsets stay correct for
/// text containing astral-plane characters. A TAB is flagged anywhere except
/// the very first character of the value; leading tabs are tolerated as
/// paste artifacts at field start.
pub fn detect_hidden_characters(text: &str, row: usize, column: usize) -> Vec<HiddenCharIssue> {
    let mut issues = Vec::new();

    for (position, c) in text.chars().enumerate() {
        if let Some((char_type, replacement)) = lookup(c) {
            issues.push(HiddenCharIssue {
                row,
                column,
                position,
                code_point: c,
                char_type: char_type.to_string(),
                replacement: replacement.to_string(),
            });
        } else if c == '\t' && position > 0 {
            issues.push(HiddenCharIssue {
                row,
                column,
                position,
                code_point: c,
                char_type: "TAB".to_string(),
                replacement: " ".to_string(),
            });
        }
    }

    issues
}

/// Apply every known replacement in a single left-to-right pass.
///
/// Applies exactly the rules the scanner flags, including the positional TAB
/// rule, so scan findings and cleaning operations always agree. Idempotent:
/// every replacement is plain ASCII the scanner does not flag.
pub fn replace_hidden_characters(text: &str) -> String {
    let mut out = String::with_capacity(text.len());

    for (position, c) in text.chars().enumerate() {
        if let Some((_, replacement)) = lookup(c) {
            out.push_str(replacement);
        } else if c == '\t' && position > 0 {
            out.push(' ');
        } else {
            out.push(c);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_width_space_flagged_with_position() {
        let issues = detect_hidden_characters("abc\u{200B}def", 1, 0);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].position, 3);
        assert_eq!(issues[0].char_type, "ZERO_WIDTH_SPACE");
        assert_eq!(issues[0].replacement, "");
    }

    #[test]
    fn replacement_removes_zero_width_space() {
        let original = "abc\u{200B}def";
        let cleaned = replace_hidden_characters(original);
        assert_eq!(cleaned, "abcdef");
        assert_eq!(cleaned.chars().count(), original.chars().count() - 1);
    }

    #[test]
    fn nbsp_becomes_plain_space() {
        assert_eq!(replace_hidden_characters("a\u{00A0}b"), "a b");
    }

    #[test]
    fn smart_quotes_and_dashes_normalized() {
        let text = "\u{201C}quoted\u{201D} \u{2018}x\u{2019} a\u{2013}b c\u{2014}d e\u{2026}";
        assert_eq!(replace_hidden_characters(text), "\"quoted\" 'x' a-b c-d e...");
    }

    #[test]
    fn leading_tab_tolerated_interior_tab_flagged() {
        let issues = detect_hidden_characters("\tvalue", 1, 0);
        assert!(issues.is_empty());

        let issues = detect_hidden_characters("va\tlue", 1, 0);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].position, 2);
        assert_eq!(issues[0].char_type, "TAB");
    }

    #[test]
    fn leading_tab_preserved_by_replacement() {
        assert_eq!(replace_hidden_characters("\tvalue"), "\tvalue");
        assert_eq!(replace_hidden_characters("va\tlue"), "va lue");
    }

    #[test]
    fn positions_counted_in_code_points() {
        // The emoji is one code point even though it needs two UTF-16 units
        let issues = detect_hidden_characters("\u{1F600}x\u{200B}", 1, 0);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].position, 2);
    }

    #[test]
    fn unmapped_characters_untouched() {
        let text = "Jos\u{e9} \u{4F60}\u{597D}";
        assert_eq!(replace_hidden_characters(text), text);
    }

    #[test]
    fn replacement_is_idempotent() {
        let samples = [
            "plain",
            "a\u{00A0}b\u{200B}c",
            "\u{201C}q\u{201D}\t tail\t",
            "\u{FEFF}lead",
            "e\u{2026}",
        ];
        for s in samples {
            let once = replace_hidden_characters(s);
            let twice = replace_hidden_characters(&once);
            assert_eq!(once, twice, "not idempotent for {:?}", s);
        }
    }

    #[test]
    fn multiple_issues_reported_in_order() {
        let issues = detect_hidden_characters("\u{00A0}a\u{2019}b\u{200D}", 2, 3);
        let types: Vec<&str> = issues.iter().map(|i| i.char_type.as_str()).collect();
        assert_eq!(
            types,
            vec!["NO_BREAK_SPACE", "RIGHT_SINGLE_QUOTE", "ZERO_WIDTH_JOINER"]
        );
        assert!(issues.iter().all(|i| i.row == 2 && i.column == 3));
    }
}
