pub mod block;
pub mod tuple;

pub use block::{extract_blocks, InsertBlock};
pub use tuple::{parse_fields, tokenize_tuples, Field};

use tracing::debug;

/// One extracted INSERT block with its tuples fully tokenized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedBlock {
    pub columns: Vec<String>,
    pub tuples: Vec<Vec<Field>>,
}

/// The blocks of one dump file, plus the malformed-header count. Extraction
/// is independent per file, so callers may fan these out across a thread
/// pool and merge in source-file order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedFile {
    pub blocks: Vec<ParsedBlock>,
    pub skipped_blocks: u64,
}

/// Run block extraction and tuple tokenization over one file's text.
pub fn parse_dump_text(text: &str, table: &str) -> ParsedFile {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let (blocks, skipped_blocks) = extract_blocks(text, table);

    let blocks: Vec<ParsedBlock> = blocks
        .into_iter()
        .map(|b| ParsedBlock {
            tuples: tokenize_tuples(b.values)
                .into_iter()
                .map(parse_fields)
                .collect(),
            columns: b.columns,
        })
        .collect();

    if skipped_blocks > 0 {
        debug!(skipped_blocks, "malformed INSERT headers skipped");
    }
    ParsedFile {
        blocks,
        skipped_blocks,
    }
}
