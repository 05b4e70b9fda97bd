//! Text-level repairs applied before (pass a) or between (pass b) parse attempts.

/// Pass (a): clean every line independently.
///
/// Trailing runs of `,` / `;` are dropped, and a line that is one outer-quoted
/// blob with doubled inner quotes (`"a,""b"",c"`) is unwrapped to `a,"b",c`.
pub fn preprocess_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.lines() {
        let stripped = strip_trailing_separators(line);
        let unwrapped = unwrap_quoted_blob(stripped);
        out.push_str(match &unwrapped {
            Some(inner) => strip_trailing_separators(inner),
            None => stripped,
        });
        out.push('\n');
    }
    out
}

fn strip_trailing_separators(line: &str) -> &str {
    line.trim_end_matches(|c: char| c == ',' || c == ';' || c.is_whitespace())
}

fn unwrap_quoted_blob(line: &str) -> Option<String> {
    let trimmed = line.trim();
    if trimmed.len() < 2 || !trimmed.starts_with('"') || !trimmed.ends_with('"') {
        return None;
    }
    let inner = &trimmed[1..trimmed.len() - 1];
    if !inner.contains("\"\"") || inner.replace("\"\"", "").contains('"') {
        return None;
    }
    Some(inner.replace("\"\"", "\""))
}

/// Pass (b): rejoin records split across physical lines.
///
/// While the accumulated record holds an odd number of `"` the next line is
/// appended with a single space, so each output line is one balanced record.
/// A record still unbalanced at end of input is emitted as is.
pub fn rejoin_split_records(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending = String::new();
    let mut quotes = 0usize;

    for line in text.lines() {
        if pending.is_empty() {
            pending.push_str(line);
        } else {
            pending.push(' ');
            pending.push_str(line);
        }
        quotes += line.matches('"').count();
        if quotes % 2 == 0 {
            out.push_str(&pending);
            out.push('\n');
            pending.clear();
            quotes = 0;
        }
    }
    if !pending.is_empty() {
        out.push_str(&pending);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn strips_trailing_separator_runs() {
        assert_eq!(preprocess_lines("a,b,c,,,\n1;2;;\n"), "a,b,c\n1;2\n");
    }

    #[test]
    fn unwraps_fully_quoted_lines() {
        assert_eq!(
            preprocess_lines("\"id,\"\"name, full\"\",amount\",,\n"),
            "id,\"name, full\",amount\n"
        );
    }

    #[test]
    fn leaves_regular_quoted_lines_alone() {
        let line = "\"x\",\"\",\"y\"";
        assert_eq!(preprocess_lines(line), format!("{}\n", line));
    }

    #[test]
    fn rejoins_record_with_embedded_newline() {
        let text = "id,note,amount\n1,\"first\nsecond\",10\n2,plain,20\n";
        assert_eq!(
            rejoin_split_records(text),
            "id,note,amount\n1,\"first second\",10\n2,plain,20\n"
        );
    }

    #[test]
    fn unbalanced_tail_is_kept() {
        assert_eq!(rejoin_split_records("a\n\"b\nc"), "a\n\"b c\n");
    }
}
