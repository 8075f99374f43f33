use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::constants::{is_iso_4217, month_from_abbreviation};

/// The closed set of field kinds the pipeline understands.
///
/// Validation dispatches over this enum exhaustively; there is no
/// unknown-type fallback that silently passes values through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldType {
    EmployeeId,
    Email,
    Currency,
    Date,
    Number,
    Text,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::EmployeeId => "EMPLOYEE_ID",
            FieldType::Email => "EMAIL",
            FieldType::Currency => "CURRENCY",
            FieldType::Date => "DATE",
            FieldType::Number => "NUMBER",
            FieldType::Text => "TEXT",
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for FieldType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "EMPLOYEE_ID" => Ok(FieldType::EmployeeId),
            "EMAIL" => Ok(FieldType::Email),
            "CURRENCY" => Ok(FieldType::Currency),
            "DATE" => Ok(FieldType::Date),
            "NUMBER" => Ok(FieldType::Number),
            "TEXT" => Ok(FieldType::Text),
            other => Err(format!("unknown field type: {}", other)),
        }
    }
}

/// Caller-supplied validation rules. Every field is optional; unset fields
/// fall back to the per-type defaults described on `validate_field`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationRules {
    /// Override the per-type required default
    pub required: Option<bool>,
    /// Inclusive lower bound for NUMBER fields
    pub min: Option<f64>,
    /// Inclusive upper bound for NUMBER fields
    pub max: Option<f64>,
    /// Minimum length in code points for TEXT fields
    pub min_length: Option<usize>,
    /// Maximum length in code points for TEXT fields
    pub max_length: Option<usize>,
    /// Regex a TEXT value must match
    pub pattern: Option<String>,
    /// Override set replacing the ISO-4217 table for CURRENCY fields
    pub allowed_currencies: Option<Vec<String>>,
}

/// Why a value failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationErrorKind {
    MissingRequired,
    InvalidFormat,
    OutOfRange,
}

/// One validation error with a human-readable message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationError {
    pub kind: ValidationErrorKind,
    pub message: String,
}

/// Non-blocking findings about a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationWarningKind {
    /// The date could be read as MM/DD or DD/MM
    AmbiguousDate,
    /// The number used European thousands/decimal separators
    LocaleFormat,
}

/// One validation warning with a human-readable message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationWarning {
    pub kind: ValidationWarningKind,
    pub message: String,
}

/// Frozen outcome of validating one value. Warnings never affect `valid`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

/// Accumulates findings across validation branches, then freezes them into
/// an immutable `ValidationResult`. Validators never mutate caller state.
#[derive(Default)]
struct ResultBuilder {
    errors: Vec<ValidationError>,
    warnings: Vec<ValidationWarning>,
}

impl ResultBuilder {
    fn error(&mut self, kind: ValidationErrorKind, message: impl Into<String>) {
        self.errors.push(ValidationError {
            kind,
            message: message.into(),
        });
    }

    fn warning(&mut self, kind: ValidationWarningKind, message: impl Into<String>) {
        self.warnings.push(ValidationWarning {
            kind,
            message: message.into(),
        });
    }

    fn finish(self) -> ValidationResult {
        ValidationResult {
            valid: self.errors.is_empty(),
            errors: self.errors,
            warnings: self.warnings,
        }
    }
}

static EMPLOYEE_ID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[A-Za-z0-9][A-Za-z0-9-]*[A-Za-z0-9]|[A-Za-z0-9])$").unwrap()
});

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$",
    )
    .unwrap()
});

static ISO_DATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})$").unwrap());

static MON_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})-([A-Za-z]{3})-(\d{2}|\d{4})$").unwrap());

static NUMERIC_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})[/.\-](\d{1,2})[/.\-](\d{4})$").unwrap());

static EUROPEAN_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?(?:\d{1,3}(?:\.\d{3})+|\d+),\d+$").unwrap());

static US_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?\d{1,3}(?:,\d{3})+(?:\.\d+)?$").unwrap());

static PLAIN_NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?\d+(?:\.\d+)?$").unwrap());

/// A successfully parsed date value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedDate {
    Unambiguous(NaiveDate),
    /// Numeric date readable as both MM/DD and DD/MM; `preferred` is the
    /// MM/DD reading.
    Ambiguous {
        preferred: NaiveDate,
        alternate: NaiveDate,
    },
}

impl ParsedDate {
    pub fn date(&self) -> NaiveDate {
        match self {
            ParsedDate::Unambiguous(d) => *d,
            ParsedDate::Ambiguous { preferred, .. } => *preferred,
        }
    }
}

/// Parse one of the accepted date formats; the Err carries the reason.
///
/// Accepted: ISO `YYYY-MM-DD`; `DD-Mon-YY(YY)` with English month
/// abbreviations (two-digit years below 50 map to the 2000s, 50 and above to
/// the 1900s); numeric `A/B/YYYY` with slash, dot or dash separators, read
/// as MM/DD first and DD/MM only when MM/DD is not calendar-valid.
pub fn parse_date(value: &str) -> Result<ParsedDate, String> {
    if let Some(caps) = ISO_DATE_RE.captures(value) {
        let year: i32 = caps[1].parse().map_err(|_| "invalid year".to_string())?;
        let month: u32 = caps[2].parse().map_err(|_| "invalid month".to_string())?;
        let day: u32 = caps[3].parse().map_err(|_| "invalid day".to_string())?;
        return match NaiveDate::from_ymd_opt(year, month, day) {
            Some(date) => Ok(ParsedDate::Unambiguous(round_trip(date, year, month, day)?)),
            None => Err(format!("'{}' is not a valid calendar date", value)),
        };
    }

    if let Some(caps) = MON_DATE_RE.captures(value) {
        let day: u32 = caps[1].parse().map_err(|_| "invalid day".to_string())?;
        let month = month_from_abbreviation(&caps[2])
            .ok_or_else(|| format!("'{}' is not a known month abbreviation", &caps[2]))?;
        let year_text = &caps[3];
        let year: i32 = match year_text.len() {
            2 => {
                let two_digit: i32 = year_text.parse().map_err(|_| "invalid year".to_string())?;
                if two_digit < 50 {
                    2000 + two_digit
                } else {
                    1900 + two_digit
                }
            }
            _ => year_text.parse().map_err(|_| "invalid year".to_string())?,
        };
        return match NaiveDate::from_ymd_opt(year, month, day) {
            Some(date) => Ok(ParsedDate::Unambiguous(round_trip(date, year, month, day)?)),
            None => Err(format!("'{}' is not a valid calendar date", value)),
        };
    }

    if let Some(caps) = NUMERIC_DATE_RE.captures(value) {
        let a: u32 = caps[1].parse().map_err(|_| "invalid date part".to_string())?;
        let b: u32 = caps[2].parse().map_err(|_| "invalid date part".to_string())?;
        let year: i32 = caps[3].parse().map_err(|_| "invalid year".to_string())?;

        // MM/DD first; DD/MM only when the MM/DD reading is not a real date.
        let month_first = NaiveDate::from_ymd_opt(year, a, b);
        let day_first = NaiveDate::from_ymd_opt(year, b, a);

        return match (month_first, day_first) {
            (Some(preferred), Some(alternate)) if a != b => Ok(ParsedDate::Ambiguous {
                preferred,
                alternate,
            }),
            (Some(date), _) => Ok(ParsedDate::Unambiguous(date)),
            (None, Some(date)) => Ok(ParsedDate::Unambiguous(date)),
            (None, None) => Err(format!("'{}' is not a valid calendar date", value)),
        };
    }

    Err(format!("'{}' is not a recognized date format", value))
}

/// Re-check the constructed date against the requested components.
fn round_trip(date: NaiveDate, year: i32, month: u32, day: u32) -> Result<NaiveDate, String> {
    if date.year() == year && date.month() == month && date.day() == day {
        Ok(date)
    } else {
        Err("date did not survive a component round-trip".to_string())
    }
}

/// Which grouping/decimal convention a number was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberNotation {
    /// `-123.45`
    Plain,
    /// `1,234.56`
    UsGrouped,
    /// `1.234,56`
    European,
}

/// A parsed numeric value and the notation it arrived in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParsedNumber {
    pub value: f64,
    pub notation: NumberNotation,
}

/// Recognize European, US-grouped and plain decimal notation.
pub fn parse_number(value: &str) -> Option<ParsedNumber> {
    if EUROPEAN_NUMBER_RE.is_match(value) {
        let normalized = value.replace('.', "").replace(',', ".");
        return normalized.parse::<f64>().ok().map(|v| ParsedNumber {
            value: v,
            notation: NumberNotation::European,
        });
    }

    if US_NUMBER_RE.is_match(value) {
        let normalized = value.replace(',', "");
        return normalized.parse::<f64>().ok().map(|v| ParsedNumber {
            value: v,
            notation: NumberNotation::UsGrouped,
        });
    }

    if PLAIN_NUMBER_RE.is_match(value) {
        return value.parse::<f64>().ok().map(|v| ParsedNumber {
            value: v,
            notation: NumberNotation::Plain,
        });
    }

    None
}

/// Validate a single cell value under a field type.
///
/// All types except TEXT are required by default; TEXT is required only when
/// the rules ask for it. An empty optional value is valid and skips every
/// other check. Malformed data never raises — it comes back as typed errors
/// and warnings on the result.
pub fn validate_field(value: &str, field_type: FieldType, rules: &ValidationRules) -> ValidationResult {
    let mut builder = ResultBuilder::default();
    let trimmed = value.trim();

    let required = match field_type {
        FieldType::Text => rules.required == Some(true),
        _ => rules.required != Some(false),
    };

    if trimmed.is_empty() {
        if required {
            builder.error(
                ValidationErrorKind::MissingRequired,
                format!("{} value is required", field_type),
            );
        }
        return builder.finish();
    }

    match field_type {
        FieldType::EmployeeId => validate_employee_id(trimmed, &mut builder),
        FieldType::Email => validate_email(trimmed, &mut builder),
        FieldType::Currency => validate_currency(trimmed, rules, &mut builder),
        FieldType::Date => validate_date(trimmed, &mut builder),
        FieldType::Number => validate_number(trimmed, rules, &mut builder),
        FieldType::Text => validate_text(trimmed, rules, &mut builder),
    }

    builder.finish()
}

fn validate_employee_id(value: &str, builder: &mut ResultBuilder) {
    if !EMPLOYEE_ID_RE.is_match(value) {
        builder.error(
            ValidationErrorKind::InvalidFormat,
            format!(
                "'{}' is not a valid employee id (alphanumeric with internal hyphens only)",
                value
            ),
        );
    }
}

fn validate_email(value: &str, builder: &mut ResultBuilder) {
    let local_ok = match value.split_once('@') {
        Some((local, _)) => {
            !local.starts_with('.') && !local.ends_with('.') && !local.contains("..")
        }
        None => false,
    };

    if !local_ok || !EMAIL_RE.is_match(value) {
        builder.error(
            ValidationErrorKind::InvalidFormat,
            format!("'{}' is not a valid email address", value),
        );
    }
}

fn validate_currency(value: &str, rules: &ValidationRules, builder: &mut ResultBuilder) {
    let upper = value.to_uppercase();
    let allowed = match &rules.allowed_currencies {
        Some(set) => set.iter().any(|c| c.to_uppercase() == upper),
        None => is_iso_4217(&upper),
    };

    if !allowed {
        builder.error(
            ValidationErrorKind::InvalidFormat,
            format!("'{}' is not a recognized currency code", value),
        );
    }
}

fn validate_date(value: &str, builder: &mut ResultBuilder) {
    match parse_date(value) {
        Ok(ParsedDate::Ambiguous { preferred, alternate }) => {
            builder.warning(
                ValidationWarningKind::AmbiguousDate,
                format!(
                    "'{}' is ambiguous (MM/DD = {}, DD/MM = {}); MM/DD reading preferred",
                    value, preferred, alternate
                ),
            );
        }
        Ok(ParsedDate::Unambiguous(_)) => {}
        Err(reason) => {
            builder.error(ValidationErrorKind::InvalidFormat, reason);
        }
    }
}

fn validate_number(value: &str, rules: &ValidationRules, builder: &mut ResultBuilder) {
    let parsed = match parse_number(value) {
        Some(parsed) => parsed,
        None => {
            builder.error(
                ValidationErrorKind::InvalidFormat,
                format!("'{}' is not a recognized number format", value),
            );
            return;
        }
    };

    if parsed.notation == NumberNotation::European {
        builder.warning(
            ValidationWarningKind::LocaleFormat,
            format!(
                "'{}' uses European number formatting (parsed as {})",
                value, parsed.value
            ),
        );
    }

    if let Some(min) = rules.min {
        if parsed.value < min {
            builder.error(
                ValidationErrorKind::OutOfRange,
                format!("{} is below the minimum of {}", parsed.value, min),
            );
        }
    }
    if let Some(max) = rules.max {
        if parsed.value > max {
            builder.error(
                ValidationErrorKind::OutOfRange,
                format!("{} is above the maximum of {}", parsed.value, max),
            );
        }
    }
}

fn validate_text(value: &str, rules: &ValidationRules, builder: &mut ResultBuilder) {
    let length = value.chars().count();

    if let Some(min_length) = rules.min_length {
        if length < min_length {
            builder.error(
                ValidationErrorKind::OutOfRange,
                format!("text length {} is below the minimum of {}", length, min_length),
            );
        }
    }
    if let Some(max_length) = rules.max_length {
        if length > max_length {
            builder.error(
                ValidationErrorKind::OutOfRange,
                format!("text length {} is above the maximum of {}", length, max_length),
            );
        }
    }

    if let Some(pattern) = &rules.pattern {
        match Regex::new(pattern) {
            Ok(re) => {
                if !re.is_match(value) {
                    builder.error(
                        ValidationErrorKind::InvalidFormat,
                        format!("'{}' does not match the required pattern", value),
                    );
                }
            }
            Err(e) => {
                // A broken caller pattern is a configuration defect, not a
                // data problem; skip the check rather than failing the cell.
                warn!("validate_field: invalid TEXT pattern '{}': {}", pattern, e);
            }
        }
    }
}
