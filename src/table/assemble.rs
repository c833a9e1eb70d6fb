use tracing::debug;

use crate::parse::{Field, ParsedBlock};
use crate::table::ParseReport;

/// An assembled table before type coercion: the established schema plus the
/// accepted tuples, still as raw fields.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Field>>,
}

/// Accumulates tuples under the schema established by the first block.
///
/// Later blocks may declare a different column count (some dump generators
/// append extra columns); their tuples are still accepted one by one as long
/// as each tuple's field count matches the established schema. Everything
/// else is rejected and counted, never padded or shifted.
#[derive(Debug, Default)]
pub struct RowAssembler {
    columns: Option<Vec<String>>,
    rows: Vec<Vec<Field>>,
    tuples: u64,
    skipped_tuples: u64,
}

impl RowAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_block(&mut self, block: ParsedBlock) {
        let schema_len = match &self.columns {
            Some(cols) => cols.len(),
            None => {
                let len = block.columns.len();
                self.columns = Some(block.columns);
                len
            }
        };

        for tuple in block.tuples {
            if tuple.len() == schema_len {
                self.rows.push(tuple);
                self.tuples += 1;
            } else {
                debug!(
                    expected = schema_len,
                    got = tuple.len(),
                    "tuple rejected for field-count mismatch"
                );
                self.skipped_tuples += 1;
            }
        }
    }

    /// Finish assembly, folding the tuple counters into `report`.
    pub fn finish(self, report: &mut ParseReport) -> RawTable {
        report.tuples += self.tuples;
        report.skipped_tuples += self.skipped_tuples;
        RawTable {
            columns: self.columns.unwrap_or_default(),
            rows: self.rows,
        }
    }
}
