use super::delimiter::Delimiter;
use super::headers::normalize_header;

/// Header row + data rows exactly as tokenized; field counts are not reconciled here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ParsedTable {
    /// True when at least one header cell carries a name.
    pub fn has_header_fields(&self) -> bool {
        self.headers.iter().any(|h| !h.trim().is_empty())
    }
}

/// Split one physical line into fields.
///
/// A field that opens with `"` (leading blanks allowed) is quoted: `""` inside it
/// is a literal quote and the delimiter loses its meaning until the closing
/// quote. A quote that is never closed runs to the end of the line.
pub fn tokenize_line(line: &str, delimiter: Delimiter) -> Vec<String> {
    let sep = delimiter.as_char();
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(c);
            }
            continue;
        }

        match c {
            '"' if field.trim().is_empty() => {
                field.clear();
                in_quotes = true;
            }
            c if c == sep => fields.push(std::mem::take(&mut field)),
            '\r' => {}
            _ => field.push(c),
        }
    }
    fields.push(field);
    fields
}

/// Tokenize `text` one record per physical line, skipping blank lines.
/// The first record becomes the header row; `normalize` applies header-name
/// normalization to it.
pub fn parse_table(text: &str, delimiter: Delimiter, normalize: bool) -> ParsedTable {
    let mut records = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| tokenize_line(l, delimiter));

    let headers = match records.next() {
        Some(h) if normalize => h.iter().map(|s| normalize_header(s)).collect(),
        Some(h) => h,
        None => return ParsedTable::default(),
    };

    ParsedTable {
        headers,
        rows: records.collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn splits_plain_and_quoted_fields() {
        assert_eq!(
            tokenize_line(r#"a,"b,c",d"#, Delimiter::Comma),
            vec!["a", "b,c", "d"]
        );
        assert_eq!(
            tokenize_line(r#"x;"say ""hi""";z"#, Delimiter::Semicolon),
            vec!["x", r#"say "hi""#, "z"]
        );
    }

    #[test]
    fn keeps_empty_fields_and_drops_carriage_returns() {
        assert_eq!(tokenize_line("a,,c,\r", Delimiter::Comma), vec!["a", "", "c", ""]);
    }

    #[test]
    fn unterminated_quote_runs_to_line_end() {
        assert_eq!(
            tokenize_line(r#"1,"open, still open"#, Delimiter::Comma),
            vec!["1", "open, still open"]
        );
    }

    #[test]
    fn quote_inside_unquoted_field_is_literal() {
        assert_eq!(
            tokenize_line(r#"5" screen,ok"#, Delimiter::Comma),
            vec![r#"5" screen"#, "ok"]
        );
    }

    #[test]
    fn parse_table_normalizes_headers_and_skips_blank_lines() {
        let table = parse_table("Affiliate ID;Net Revenue (€)\n\n42;10,5\n", Delimiter::Semicolon, true);
        assert_eq!(table.headers, vec!["affiliate_id", "net_revenue_"]);
        assert_eq!(table.rows, vec![vec!["42".to_string(), "10,5".to_string()]]);
        assert!(table.has_header_fields());
    }

    #[test]
    fn empty_text_has_no_header_fields() {
        assert!(!parse_table("\n  \n", Delimiter::Comma, true).has_header_fields());
    }
}
