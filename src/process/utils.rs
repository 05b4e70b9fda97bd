use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

static DECIMAL_COMMA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?\d+,\d{1,2}$").expect("valid decimal-comma regex"));

/// 1) Trim whitespace + strip outer quotes if present.
pub fn clean_str(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2 {
        trimmed[1..trimmed.len() - 1].trim().to_string()
    } else {
        trimmed.to_string()
    }
}

/// 2) Parse a vendor-formatted numeric cell.
///
/// Accepts currency symbols, thousands separators, a trailing `%`, accounting
/// negatives like `(1,200.50)` and a lone decimal comma (`12,5`).
/// Returns `None` for blanks and anything that still fails to parse.
pub fn parse_number(raw: &str) -> Option<f64> {
    let cleaned = clean_str(raw);
    if cleaned.is_empty() {
        return None;
    }

    let (negative, body) = match cleaned.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        Some(inner) => (true, inner.to_string()),
        None => (false, cleaned),
    };

    let mut s: String = body
        .chars()
        .filter(|c| !matches!(c, '$' | '€' | '£' | '%' | ' ' | '\u{a0}'))
        .collect();

    if s.contains(',') {
        if s.contains('.') {
            s = s.replace(',', "");
        } else if DECIMAL_COMMA.is_match(&s) {
            s = s.replace(',', ".");
        } else {
            s = s.replace(',', "");
        }
    }

    let value: f64 = s.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(if negative { -value } else { value })
}

/// 3) Filesystem-friendly UTC timestamp used to tag backup artifacts.
/// Lexical order equals chronological order.
pub fn timestamp_tag(now: DateTime<Utc>) -> String {
    now.format("%Y%m%dT%H%M%S%3fZ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn clean_str_strips_quotes_and_whitespace() {
        assert_eq!(clean_str("  \" abc \" "), "abc");
        assert_eq!(clean_str("plain"), "plain");
        assert_eq!(clean_str("\""), "\"");
    }

    #[test]
    fn parse_number_handles_vendor_formats() {
        assert_eq!(parse_number("1,234.50"), Some(1234.5));
        assert_eq!(parse_number("$ 99"), Some(99.0));
        assert_eq!(parse_number("(200)"), Some(-200.0));
        assert_eq!(parse_number("12,5"), Some(12.5));
        assert_eq!(parse_number("1,200"), Some(1200.0));
        assert_eq!(parse_number("45%"), Some(45.0));
        assert_eq!(parse_number("-7.25"), Some(-7.25));
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("n/a"), None);
        assert_eq!(parse_number("inf"), None);
    }

    #[test]
    fn timestamp_tag_is_sortable() {
        let a = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let b = Utc.with_ymd_and_hms(2024, 11, 2, 3, 4, 5).unwrap();
        assert_eq!(timestamp_tag(a), "20240102T030405000Z");
        assert!(timestamp_tag(a) < timestamp_tag(b));
    }
}
