use chrono::{Datelike, NaiveDate};

const DAY_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%d.%m.%Y", "%d-%m-%Y"];
const MONTH_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m-%d", "%b %Y-%d", "%B %Y-%d", "%m/%Y-%d"];

/// Parse a vendor cohort / reporting date into a calendar date.
///
/// Month-only inputs (`2024-03`, `Mar 2024`, `03/2024`) resolve to the first of
/// the month. A trailing time part (`2024-03-05 00:00:00`, `2024-03-05T00:00`) is
/// ignored.
pub fn parse_report_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim().trim_matches('"').trim();
    if s.is_empty() {
        return None;
    }
    let date_part = s
        .split(|c: char| c == 'T' || c == ' ')
        .next()
        .filter(|p| p.len() >= 8 && p.chars().next().is_some_and(|c| c.is_ascii_digit()))
        .unwrap_or(s);

    for fmt in DAY_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(date_part, fmt) {
            return Some(d);
        }
    }

    // chrono needs a day to build a date, so month-only inputs borrow "-01"
    let with_day = format!("{}-01", s);
    for fmt in MONTH_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(&with_day, fmt) {
            return Some(d);
        }
    }
    None
}

/// `year * 12 + zero_based_month`, the alignment key shared by cohorts and monthly series.
pub fn absolute_month_index(date: NaiveDate) -> i32 {
    date.year() * 12 + date.month0() as i32
}

/// Inverse of [`absolute_month_index`], rendered as `YYYY-MM`.
pub fn month_label(index: i32) -> String {
    format!("{:04}-{:02}", index.div_euclid(12), index.rem_euclid(12) + 1)
}
