// src/process/mod.rs
pub mod date_parser;
pub mod delimiter;
pub mod headers;
pub mod malformed;
pub mod parser;
pub mod record;
pub mod repair;
pub mod strategy;
pub mod utils;

use tracing::{debug, info, warn};

use crate::error::IngestError;
use malformed::MalformedRow;
use record::Record;
use strategy::{ParseFailure, ParseInput, StrategyKind, STRATEGIES};

/// Clean output of the orchestrator for one source file.
#[derive(Debug, Clone)]
pub struct IngestedTable {
    pub strategy: StrategyKind,
    pub headers: Vec<String>,
    pub original_headers: Vec<String>,
    pub rows: Vec<Record>,
    /// Rows still mismatched after the last strategy, salvaged by position.
    pub malformed_count: usize,
    /// First few of those rows, for the run report.
    pub malformed_sample: Vec<MalformedRow>,
}

/// Run the parse strategies in priority order until one yields a usable table.
///
/// - plain parse of the pre-processed text
/// - the same text with quote-split records rejoined
/// - header-less positional parse of the original text, tried only once an
///   earlier strategy has seen a header row
///
/// Only a file where no strategy finds a header is an error.
#[tracing::instrument(level = "info", skip(text, sample_cap), fields(source = %source_name))]
pub fn ingest_text(
    text: &str,
    source_name: &str,
    sample_cap: usize,
) -> Result<IngestedTable, IngestError> {
    let input = ParseInput::new(text);
    debug!(delimiter = ?input.delimiter, "detected delimiter");

    let mut saw_header = false;
    let mut last_malformed = 0usize;

    for (kind, strategy) in STRATEGIES {
        if kind.is_last_resort() && !saw_header {
            break;
        }
        match strategy(&input) {
            Ok(outcome) => {
                let malformed_count = outcome.malformed.len();
                if malformed_count > 0 {
                    warn!(
                        strategy = kind.as_str(),
                        malformed = malformed_count,
                        "salvaged malformed rows by position"
                    );
                }
                info!(
                    strategy = kind.as_str(),
                    rows = outcome.rows.len(),
                    columns = outcome.headers.len(),
                    "parsed source"
                );
                let mut malformed_sample = outcome.malformed;
                malformed_sample.truncate(sample_cap);
                return Ok(IngestedTable {
                    strategy: outcome.strategy,
                    headers: outcome.headers,
                    original_headers: outcome.original_headers,
                    rows: outcome.rows,
                    malformed_count,
                    malformed_sample,
                });
            }
            Err(ParseFailure::NoHeader) => {
                debug!(strategy = kind.as_str(), "no header fields");
            }
            Err(ParseFailure::Malformed(rows)) => {
                saw_header = true;
                last_malformed = rows.len();
                debug!(strategy = kind.as_str(), malformed = rows.len(), "field count mismatch");
            }
        }
    }

    let reason = if saw_header {
        format!("{} malformed rows and too few rows to salvage", last_malformed)
    } else {
        "no header fields after every repair strategy".to_string()
    };
    Err(IngestError::Structural {
        source_name: source_name.to_string(),
        reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    fn init_test_logging() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("info,reportscraper::process=debug")),
            )
            .with_test_writer()
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    #[test]
    fn well_formed_file_uses_plain_strategy() {
        init_test_logging();
        let out = ingest_text("Month;Affiliate;FTD\n2024-01;acme;3\n", "a.csv", 10).unwrap();
        assert_eq!(out.strategy, StrategyKind::Plain);
        assert_eq!(out.headers, vec!["month", "affiliate", "ftd"]);
        assert_eq!(out.rows[0].get("ftd"), Some("3"));
        assert_eq!(out.malformed_count, 0);
    }

    #[test]
    fn embedded_newline_is_recovered_by_rejoin() {
        init_test_logging();
        let text = "id,comment,amount\n1,\"multi\nline\",5\n2,ok,6\n";
        let out = ingest_text(text, "b.csv", 10).unwrap();
        assert_eq!(out.strategy, StrategyKind::Rejoined);
        assert_eq!(out.rows.len(), 2);
        assert!(out.rows.iter().all(|r| r.len() == 3));
        assert_eq!(out.rows[0].get("comment"), Some("multi line"));
    }

    #[test]
    fn short_row_is_salvaged_and_counted_once() {
        init_test_logging();
        let mut text = String::from("month,affiliate,ftd\n");
        for i in 0..10 {
            if i == 4 {
                text.push_str("2024-05,acme\n");
            } else {
                text.push_str(&format!("2024-{:02},acme,{}\n", i + 1, i));
            }
        }
        let out = ingest_text(&text, "c.csv", 10).unwrap();
        assert_eq!(out.strategy, StrategyKind::Headerless);
        assert_eq!(out.rows.len(), 10);
        assert_eq!(out.rows[4].get("ftd"), Some(""));
        assert_eq!(out.malformed_count, 1);
        assert_eq!(out.malformed_sample, vec![MalformedRow { index: 4, field_count: 2 }]);
    }

    #[test]
    fn malformed_sample_is_capped() {
        init_test_logging();
        let mut text = String::from("a,b,c\n");
        for _ in 0..5 {
            text.push_str("1,2\n");
        }
        let out = ingest_text(&text, "d.csv", 2).unwrap();
        assert_eq!(out.malformed_count, 5);
        assert_eq!(out.malformed_sample.len(), 2);
    }

    #[test]
    fn blank_file_is_a_structural_failure() {
        init_test_logging();
        let err = ingest_text("\n ,,, \n", "e.csv", 10).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn header_only_file_parses_to_no_rows() {
        init_test_logging();
        let out = ingest_text("a,b\n", "f.csv", 10).unwrap();
        assert!(out.rows.is_empty());
    }
}
