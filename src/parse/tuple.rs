// VALUES blob tokenization. Quote handling follows the SQL convention the
// dump generators use: strings are single-quoted and a literal apostrophe
// is encoded as a doubled quote.

/// A raw field as it appears inside one tuple, before column typing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    /// The bare unquoted token `NULL`, any case.
    Null,
    /// A single-quoted string literal, unescaped.
    Text(String),
    /// An unquoted literal (number, date, or anything else), kept verbatim.
    Literal(String),
}

/// Split a VALUES blob (`(...), (...), ...`) into the inner text of each
/// top-level tuple, in source order. Parentheses and commas inside quoted
/// strings are left untouched for [`parse_fields`].
pub fn tokenize_tuples(blob: &str) -> Vec<&str> {
    let bytes = blob.as_bytes();
    let mut tuples = Vec::new();
    let mut in_quote = false;
    let mut start: Option<usize> = None;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\'' => {
                // '' inside a string is one literal quote, state unchanged
                if in_quote && bytes.get(i + 1) == Some(&b'\'') {
                    i += 2;
                    continue;
                }
                in_quote = !in_quote;
            }
            b'(' if !in_quote && start.is_none() => start = Some(i + 1),
            b')' if !in_quote => {
                if let Some(s) = start.take() {
                    tuples.push(&blob[s..i]);
                }
            }
            _ => {}
        }
        i += 1;
    }

    tuples
}

/// Split one tuple's inner text into fields on commas outside quoted
/// strings, then classify each field.
pub fn parse_fields(tuple: &str) -> Vec<Field> {
    let bytes = tuple.as_bytes();
    let mut fields = Vec::new();
    let mut in_quote = false;
    let mut field_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\'' => {
                if in_quote && bytes.get(i + 1) == Some(&b'\'') {
                    i += 2;
                    continue;
                }
                in_quote = !in_quote;
            }
            b',' if !in_quote => {
                fields.push(classify(&tuple[field_start..i]));
                field_start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    fields.push(classify(&tuple[field_start..]));

    fields
}

fn classify(raw: &str) -> Field {
    let t = raw.trim();
    if t.len() >= 2 && t.starts_with('\'') && t.ends_with('\'') {
        return Field::Text(t[1..t.len() - 1].replace("''", "'"));
    }
    if t.eq_ignore_ascii_case("NULL") {
        return Field::Null;
    }
    Field::Literal(t.to_string())
}
