use serde::Serialize;

/// A data row whose field count disagrees with the header count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MalformedRow {
    /// Zero-based index among data rows (header excluded).
    pub index: usize,
    pub field_count: usize,
}

pub fn find_malformed_rows(header_count: usize, rows: &[Vec<String>]) -> Vec<MalformedRow> {
    rows.iter()
        .enumerate()
        .filter(|(_, r)| r.len() != header_count)
        .map(|(index, r)| MalformedRow {
            index,
            field_count: r.len(),
        })
        .collect()
}
