use crate::process::record::Record;

/// Columns that identify a row on their own, in lookup order.
pub const UNIQUE_ID_FIELDS: &[&str] = &["unique_id", "uid", "id", "transaction_id"];

/// Business fields that jointly identify a report row, in key order. Each
/// entry lists the header spellings accepted for it; the first present wins.
/// A file whose only business column is an affiliate gets one key per
/// affiliate, so all of that affiliate's rows after the first are skipped.
pub const BUSINESS_FIELDS: &[(&str, &[&str])] = &[
    ("month", &["month"]),
    ("affiliate", &["affiliate", "affiliate_id", "affiliate_name"]),
    ("country", &["country", "country_code"]),
    ("registrations", &["registrations", "regs"]),
    ("ftd", &["ftd", "ftds"]),
    ("qftd", &["qftd", "qftds", "qualified_ftd", "qualified_ftds"]),
    ("deposits", &["deposits"]),
    ("unique_impressions", &["unique_impressions"]),
    ("visitors", &["visitors", "unique_visitors"]),
    ("leads", &["leads"]),
];

/// Deterministic dedup key for one row.
///
/// 1. a non-empty unique identifier column
/// 2. the business fields present on the row, trimmed, lower-cased, `|`-joined
/// 3. the whole row serialized, as a last resort
pub fn identity_key(record: &Record) -> String {
    for field in UNIQUE_ID_FIELDS {
        if let Some(v) = record.get(field).map(str::trim).filter(|v| !v.is_empty()) {
            return format!("id:{}", v);
        }
    }

    let parts: Vec<String> = BUSINESS_FIELDS
        .iter()
        .filter_map(|(_, aliases)| aliases.iter().find_map(|a| record.get(a)))
        .map(|v| v.trim().to_lowercase())
        .collect();
    if !parts.is_empty() {
        return format!("biz:{}", parts.join("|"));
    }

    match serde_json::to_string(record) {
        Ok(json) => format!("row:{}", json),
        Err(_) => format!(
            "row:{}",
            record
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join("\u{1f}")
        ),
    }
}
