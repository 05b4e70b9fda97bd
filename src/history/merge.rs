use serde::Serialize;
use std::collections::HashSet;
use tracing::debug;

use super::key::identity_key;
use super::store::Dataset;
use crate::process::record::Record;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeStats {
    pub existing_rows: usize,
    pub incoming_rows: usize,
    pub rows_added: usize,
    pub duplicates_skipped: usize,
}

/// Append the incoming rows whose identity key is not yet in `existing`.
///
/// Keys of accepted incoming rows join the set too, so a batch never adds the
/// same row twice. The output keeps the existing column order when there is an
/// existing dataset, otherwise it takes `incoming_headers`.
///
/// Incoming rows are reshaped onto the output columns before they are keyed,
/// so a row is keyed exactly as it will read back from the written file.
pub fn merge_rows(
    existing: Option<Dataset>,
    incoming_headers: &[String],
    incoming: Vec<Record>,
) -> (Dataset, MergeStats) {
    let mut merged = existing.unwrap_or_else(|| Dataset {
        fields: incoming_headers.to_vec(),
        rows: Vec::new(),
    });
    if merged.fields.is_empty() {
        merged.fields = incoming_headers.to_vec();
    }

    let mut stats = MergeStats {
        existing_rows: merged.rows.len(),
        incoming_rows: incoming.len(),
        ..MergeStats::default()
    };

    let mut seen: HashSet<String> = merged.rows.iter().map(identity_key).collect();
    for row in incoming {
        let values: Vec<String> = row.project(&merged.fields).map(str::to_string).collect();
        let row = Record::from_positional(&merged.fields, &values);
        if seen.insert(identity_key(&row)) {
            merged.rows.push(row);
            stats.rows_added += 1;
        } else {
            stats.duplicates_skipped += 1;
        }
    }

    debug!(
        existing = stats.existing_rows,
        added = stats.rows_added,
        skipped = stats.duplicates_skipped,
        "merged rows"
    );
    (merged, stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    fn rec(pairs: &[(&str, &str)]) -> Record {
        pairs.iter().copied().collect()
    }

    #[test]
    fn first_import_takes_incoming_headers() {
        let rows = vec![
            rec(&[("month", "2024-01"), ("affiliate", "a")]),
            rec(&[("month", "2024-01"), ("affiliate", "A ")]),
        ];
        let (ds, stats) = merge_rows(None, &headers(&["month", "affiliate"]), rows);
        assert_eq!(ds.fields, headers(&["month", "affiliate"]));
        assert_eq!(ds.rows.len(), 1);
        assert_eq!(stats.rows_added, 1);
        assert_eq!(stats.duplicates_skipped, 1);
    }

    #[test]
    fn existing_column_order_is_preserved() {
        let existing = Dataset {
            fields: headers(&["affiliate", "month"]),
            rows: vec![rec(&[("affiliate", "a"), ("month", "2024-01")])],
        };
        let incoming = vec![
            rec(&[("month", "2024-01"), ("affiliate", "a")]),
            rec(&[("month", "2024-02"), ("affiliate", "a")]),
        ];
        let (ds, stats) = merge_rows(Some(existing), &headers(&["month", "affiliate"]), incoming);
        assert_eq!(ds.fields, headers(&["affiliate", "month"]));
        assert_eq!(
            stats,
            MergeStats {
                existing_rows: 1,
                incoming_rows: 2,
                rows_added: 1,
                duplicates_skipped: 1,
            }
        );
    }

    #[test]
    fn incoming_rows_are_keyed_on_existing_columns() {
        let existing = Dataset {
            fields: headers(&["month", "affiliate", "ftd"]),
            rows: Vec::new(),
        };
        let incoming = vec![rec(&[
            ("month", "2024-02"),
            ("affiliate", "acme"),
            ("country", "DE"),
            ("ftd", "5"),
        ])];
        let (first, _) = merge_rows(Some(existing), &headers(&["month", "affiliate", "country", "ftd"]), incoming.clone());
        assert_eq!(first.rows[0], rec(&[("month", "2024-02"), ("affiliate", "acme"), ("ftd", "5")]));

        let (_, stats) = merge_rows(Some(first), &headers(&["month", "affiliate", "country", "ftd"]), incoming);
        assert_eq!(stats.rows_added, 0);
        assert_eq!(stats.duplicates_skipped, 1);
    }

    #[test]
    fn merging_twice_adds_nothing() {
        let incoming = vec![rec(&[("id", "1")]), rec(&[("id", "2")])];
        let (first, _) = merge_rows(None, &headers(&["id"]), incoming.clone());
        let (second, stats) = merge_rows(Some(first.clone()), &headers(&["id"]), incoming);
        assert_eq!(stats.rows_added, 0);
        assert_eq!(second, first);
    }
}
