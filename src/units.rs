//! Formatting and parsing of human-entered quantities
//!
//! Quantities are shown as whole numbers with thousands grouped by spaces
//! ("1 234 567"). Input accepts the same grouping and a decimal comma.

use std::sync::LazyLock;

use regex::Regex;

static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?(\d+([.,]\d*)?|[.,]\d+)$").expect("valid number pattern"));

/// Format a quantity rounded to an integer with space-separated thousands
pub fn format_quantity(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }

    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(ch);
    }

    if rounded < 0.0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

/// Format a day estimate with one decimal place
pub fn format_days(days: f64) -> String {
    format!("{:.1}", days)
}

/// Parse a number, tolerating space grouping and a decimal comma.
/// Returns `None` for empty or non-numeric input.
pub fn parse_number(text: &str) -> Option<f64> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() || !NUMBER_RE.is_match(&compact) {
        return None;
    }
    compact.replace(',', ".").parse::<f64>().ok()
}

/// Parse a resource quantity. Invalid or negative input is 0.
pub fn parse_quantity(text: &str) -> f64 {
    parse_number(text).map(crate::models::non_negative).unwrap_or(0.0)
}

/// Parse an integer level or count, truncating any fraction. Invalid input is 0.
pub fn parse_count(text: &str) -> i64 {
    parse_number(text).map(|v| v.trunc() as i64).unwrap_or(0)
}
