/// The two separators vendor exports actually use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    Comma,
    Semicolon,
}

impl Delimiter {
    pub fn as_char(self) -> char {
        match self {
            Delimiter::Comma => ',',
            Delimiter::Semicolon => ';',
        }
    }
}

/// Pick the separator from a header sample: `;` only when it strictly
/// outnumbers `,`, otherwise `,` (ties included).
pub fn detect_delimiter(sample: &str) -> Delimiter {
    let commas = sample.matches(',').count();
    let semicolons = sample.matches(';').count();
    if semicolons > commas {
        Delimiter::Semicolon
    } else {
        Delimiter::Comma
    }
}

/// Detect from the first non-blank line of `text`.
pub fn detect_in_text(text: &str) -> Delimiter {
    let sample = text.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    detect_delimiter(sample)
}
