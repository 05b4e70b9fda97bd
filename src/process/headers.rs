use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static NOT_IDENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9_]").expect("valid regex"));
static NOT_FS_SAFE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_\-]").expect("valid regex"));

/// trim → lower-case → whitespace runs to `_` → drop anything outside `[a-z0-9_]`.
pub fn normalize_header(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let underscored = WHITESPACE_RUN.replace_all(&lowered, "_");
    NOT_IDENT.replace_all(&underscored, "").into_owned()
}

/// Make header names unique and filesystem-safe.
///
/// Blank names become `col_<index>` (zero-based position); repeated names get
/// `_2`, `_3`, ... appended, skipping suffixes that collide with a later header.
pub fn dedupe_headers(headers: &[String]) -> Vec<String> {
    let sanitized: Vec<String> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            let safe = NOT_FS_SAFE.replace_all(h.trim(), "_").into_owned();
            if safe.trim_matches('_').is_empty() {
                format!("col_{}", i)
            } else {
                safe
            }
        })
        .collect();

    let reserved: HashSet<&str> = sanitized.iter().map(String::as_str).collect();
    let mut taken: HashSet<String> = HashSet::with_capacity(sanitized.len());
    let mut out = Vec::with_capacity(sanitized.len());

    for name in &sanitized {
        if taken.insert(name.clone()) {
            out.push(name.clone());
            continue;
        }
        let mut n = 2;
        let unique = loop {
            let candidate = format!("{}_{}", name, n);
            if !taken.contains(&candidate) && !reserved.contains(candidate.as_str()) {
                break candidate;
            }
            n += 1;
        };
        taken.insert(unique.clone());
        out.push(unique);
    }
    out
}
