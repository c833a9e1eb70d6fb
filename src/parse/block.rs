// INSERT extraction: no full SQL grammar, just the dump shape we ingest.

use once_cell::sync::Lazy;
use regex::Regex;

static INSERT_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)INSERT\s+INTO\s+[`"]?([A-Za-z0-9_.]+)[`"]?"#).unwrap());

/// One `INSERT INTO <table> (<cols>) VALUES <blob>;` statement, with the
/// VALUES blob left unparsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertBlock<'a> {
    pub columns: Vec<String>,
    pub values: &'a str,
}

/// Scan a whole dump file for INSERT statements targeting `table`.
///
/// Statements for other tables are ignored. A header missing its column list
/// or the VALUES keyword is counted and skipped. The blob is captured up to
/// the next `;`, or end of text when the terminator is missing.
pub fn extract_blocks<'a>(text: &'a str, table: &str) -> (Vec<InsertBlock<'a>>, u64) {
    let mut blocks = Vec::new();
    let mut skipped = 0u64;

    for caps in INSERT_HEADER.captures_iter(text) {
        let whole = caps.get(0).expect("match always has group 0");
        let name = caps.get(1).expect("header regex has one group").as_str();
        if !name.eq_ignore_ascii_case(table) {
            continue;
        }
        match parse_block_body(&text[whole.end()..]) {
            Some((columns, values)) => blocks.push(InsertBlock { columns, values }),
            None => skipped += 1,
        }
    }

    (blocks, skipped)
}

fn parse_block_body(rest: &str) -> Option<(Vec<String>, &str)> {
    let rest = rest.trim_start().strip_prefix('(')?;
    let close = rest.find(')')?;

    let columns: Vec<String> = rest[..close]
        .split(',')
        .map(|c| {
            c.trim()
                .trim_matches(|ch| ch == '"' || ch == '`' || ch == '\'')
                .to_string()
        })
        .filter(|c| !c.is_empty())
        .collect();
    if columns.is_empty() {
        return None;
    }

    let after = rest[close + 1..].trim_start();
    if !after.get(..6)?.eq_ignore_ascii_case("VALUES") {
        return None;
    }
    let blob = &after[6..];
    let blob = match blob.find(';') {
        Some(i) => &blob[..i],
        None => blob,
    };
    Some((columns, blob))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_multiline_statement() {
        let text = "-- dump\nINSERT INTO sales_data (id, name) VALUES\n(1, 'a'),\n(2, 'b');\n";
        let (blocks, skipped) = extract_blocks(text, "sales_data");
        assert_eq!(skipped, 0);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].columns, vec!["id", "name"]);
        assert!(blocks[0].values.contains("(2, 'b')"));
    }

    #[test]
    fn multiple_statements_in_one_file() {
        let text = "INSERT INTO sales_data (a) VALUES (1);\nINSERT INTO sales_data (a) VALUES (2);";
        let (blocks, skipped) = extract_blocks(text, "sales_data");
        assert_eq!(blocks.len(), 2);
        assert_eq!(skipped, 0);
    }

    #[test]
    fn foreign_table_ignored_silently() {
        let text = "INSERT INTO other_table (a) VALUES (1);";
        let (blocks, skipped) = extract_blocks(text, "sales_data");
        assert!(blocks.is_empty());
        assert_eq!(skipped, 0);
    }

    #[test]
    fn header_without_column_list_is_counted() {
        let text = "INSERT INTO sales_data VALUES (1, 2);";
        let (blocks, skipped) = extract_blocks(text, "sales_data");
        assert!(blocks.is_empty());
        assert_eq!(skipped, 1);
    }

    #[test]
    fn header_without_values_keyword_is_counted() {
        let text = "INSERT INTO sales_data (a, b) SELECT 1, 2;";
        let (blocks, skipped) = extract_blocks(text, "sales_data");
        assert!(blocks.is_empty());
        assert_eq!(skipped, 1);
    }

    #[test]
    fn quoted_column_names_are_stripped() {
        let text = "INSERT INTO sales_data (\"id\", `name`) VALUES (1, 'x');";
        let (blocks, _) = extract_blocks(text, "sales_data");
        assert_eq!(blocks[0].columns, vec!["id", "name"]);
    }

    #[test]
    fn table_name_match_is_case_insensitive() {
        let text = "insert into SALES_DATA (a) values (1);";
        let (blocks, _) = extract_blocks(text, "sales_data");
        assert_eq!(blocks.len(), 1);
    }

    #[test]
    fn missing_terminator_captures_to_end() {
        let text = "INSERT INTO sales_data (a) VALUES (1), (2)";
        let (blocks, _) = extract_blocks(text, "sales_data");
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].values.contains("(2)"));
    }
}
