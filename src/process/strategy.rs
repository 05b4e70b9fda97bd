use serde::Serialize;
use tracing::warn;

use super::delimiter::{detect_in_text, Delimiter};
use super::headers::{dedupe_headers, normalize_header};
use super::malformed::{find_malformed_rows, MalformedRow};
use super::parser::{parse_table, ParsedTable};
use super::record::Record;
use super::repair::{preprocess_lines, rejoin_split_records};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Pre-processed text, parsed as is.
    Plain,
    /// Pre-processed text with quote-split records rejoined.
    Rejoined,
    /// Untouched original text, header row taken positionally.
    Headerless,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Plain => "plain",
            StrategyKind::Rejoined => "rejoined",
            StrategyKind::Headerless => "headerless",
        }
    }

    /// Only tried once an earlier strategy has found a usable header row.
    pub fn is_last_resort(&self) -> bool {
        matches!(self, StrategyKind::Headerless)
    }
}

/// The text variants every strategy may read from, computed once per file.
#[derive(Debug)]
pub struct ParseInput<'a> {
    pub original: &'a str,
    pub preprocessed: String,
    pub delimiter: Delimiter,
}

impl<'a> ParseInput<'a> {
    pub fn new(original: &'a str) -> Self {
        let preprocessed = preprocess_lines(original);
        let delimiter = detect_in_text(&preprocessed);
        Self {
            original,
            preprocessed,
            delimiter,
        }
    }
}

/// A usable table: unique headers plus rows reshaped onto them.
#[derive(Debug, Clone)]
pub struct ParseOutcome {
    pub strategy: StrategyKind,
    pub delimiter: Delimiter,
    /// Header names before deduplication.
    pub original_headers: Vec<String>,
    pub headers: Vec<String>,
    pub rows: Vec<Record>,
    /// Rows salvaged despite a field-count mismatch. Only the headerless
    /// strategy ever returns these.
    pub malformed: Vec<MalformedRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParseFailure {
    /// No named header cell could be found.
    NoHeader,
    /// A header was found but some rows disagree with its width.
    Malformed(Vec<MalformedRow>),
}

pub type Strategy = fn(&ParseInput<'_>) -> Result<ParseOutcome, ParseFailure>;

/// Fixed priority order; the orchestrator stops at the first success.
pub const STRATEGIES: &[(StrategyKind, Strategy)] = &[
    (StrategyKind::Plain, parse_plain),
    (StrategyKind::Rejoined, parse_rejoined),
    (StrategyKind::Headerless, parse_headerless),
];

pub fn parse_plain(input: &ParseInput<'_>) -> Result<ParseOutcome, ParseFailure> {
    let table = parse_table(&input.preprocessed, input.delimiter, true);
    strict_outcome(StrategyKind::Plain, input.delimiter, table)
}

pub fn parse_rejoined(input: &ParseInput<'_>) -> Result<ParseOutcome, ParseFailure> {
    let rejoined = rejoin_split_records(&input.preprocessed);
    let table = parse_table(&rejoined, input.delimiter, true);
    strict_outcome(StrategyKind::Rejoined, input.delimiter, table)
}

/// Last resort over the untouched text: row 0 names the columns, every later
/// row is assigned by position. Succeeds whenever there are two or more rows.
pub fn parse_headerless(input: &ParseInput<'_>) -> Result<ParseOutcome, ParseFailure> {
    let delimiter = detect_in_text(input.original);
    let table = parse_table(input.original, delimiter, false);
    if table.rows.is_empty() {
        return Err(ParseFailure::NoHeader);
    }

    let original_headers: Vec<String> = table.headers.iter().map(|h| normalize_header(h)).collect();
    let headers = dedupe_headers(&original_headers);
    let malformed = find_malformed_rows(headers.len(), &table.rows);
    let surplus = malformed.iter().filter(|m| m.field_count > headers.len()).count();
    if surplus > 0 {
        warn!(rows = surplus, "dropping surplus fields beyond the header width");
    }

    Ok(ParseOutcome {
        strategy: StrategyKind::Headerless,
        delimiter,
        rows: reshape(&headers, &table.rows),
        original_headers,
        headers,
        malformed,
    })
}

fn strict_outcome(
    strategy: StrategyKind,
    delimiter: Delimiter,
    table: ParsedTable,
) -> Result<ParseOutcome, ParseFailure> {
    if !table.has_header_fields() {
        return Err(ParseFailure::NoHeader);
    }
    let headers = dedupe_headers(&table.headers);
    let malformed = find_malformed_rows(headers.len(), &table.rows);
    if !malformed.is_empty() {
        return Err(ParseFailure::Malformed(malformed));
    }
    Ok(ParseOutcome {
        strategy,
        delimiter,
        rows: reshape(&headers, &table.rows),
        original_headers: table.headers,
        headers,
        malformed: Vec::new(),
    })
}

fn reshape(headers: &[String], rows: &[Vec<String>]) -> Vec<Record> {
    rows.iter()
        .map(|values| Record::from_positional(headers, values))
        .collect()
}
