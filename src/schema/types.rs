// src/schema/types.rs

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fs, path::Path};

use super::aliases;
use crate::process::headers::normalize_header;
use crate::process::record::Record;

static MONTH_COLUMN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:month_?|m_?)?(\d{1,3})$").expect("valid month column regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Cohort,
    Financial,
    Payments,
}

/// One logical field and the header spellings accepted for it, most
/// specific first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldAliases {
    pub field: String,
    pub aliases: Vec<String>,
}

/// Declared ingestion schema for one kind of vendor report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceSchema {
    pub kind: SourceKind,
    pub fields: Vec<FieldAliases>,
}

impl SourceSchema {
    pub fn builtin(kind: SourceKind) -> Self {
        let table = match kind {
            SourceKind::Cohort => aliases::COHORT,
            SourceKind::Financial => aliases::FINANCIAL,
            SourceKind::Payments => aliases::PAYMENTS,
        };
        Self {
            kind,
            fields: table
                .iter()
                .map(|(field, names)| FieldAliases {
                    field: field.to_string(),
                    aliases: names.iter().map(|s| s.to_string()).collect(),
                })
                .collect(),
        }
    }

    /// Read a schema override from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
        serde_json::from_str(&text).with_context(|| format!("parsing {:?}", path))
    }

    /// Bind each logical field to the first alias present in `headers`.
    pub fn resolve(&self, headers: &[String]) -> ResolvedSchema {
        let normalized: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();

        let mut columns = HashMap::new();
        for entry in &self.fields {
            let hit = entry.aliases.iter().find_map(|alias| {
                let alias = normalize_header(alias);
                normalized.iter().position(|h| *h == alias)
            });
            if let Some(pos) = hit {
                columns.insert(entry.field.clone(), headers[pos].clone());
            }
        }

        let mut month_columns = Vec::new();
        if self.kind == SourceKind::Cohort {
            let bound: Vec<&String> = columns.values().collect();
            for (header, norm) in headers.iter().zip(&normalized) {
                if bound.contains(&header) {
                    continue;
                }
                if let Some(offset) = MONTH_COLUMN
                    .captures(norm)
                    .and_then(|c| c.get(1))
                    .and_then(|m| m.as_str().parse::<usize>().ok())
                {
                    month_columns.push((offset, header.clone()));
                }
            }
            month_columns.sort_by_key(|(offset, _)| *offset);
            month_columns.dedup_by_key(|(offset, _)| *offset);
        }

        ResolvedSchema {
            kind: self.kind,
            columns,
            month_columns,
        }
    }
}

/// A schema bound to one concrete header row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSchema {
    pub kind: SourceKind,
    columns: HashMap<String, String>,
    /// `(offset, header)` for cohort "month N" columns, ascending by offset.
    pub month_columns: Vec<(usize, String)>,
}

impl ResolvedSchema {
    pub fn header_for(&self, field: &str) -> Option<&str> {
        self.columns.get(field).map(String::as_str)
    }

    /// Raw value of `field` on `record`, if the field was resolved.
    pub fn value<'a>(&self, record: &'a Record, field: &str) -> Option<&'a str> {
        self.header_for(field).and_then(|h| record.get(h))
    }

    /// Trimmed, non-empty value of `field`.
    pub fn text(&self, record: &Record, field: &str) -> Option<String> {
        self.value(record, field)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }
}
