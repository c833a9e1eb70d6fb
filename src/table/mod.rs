pub mod assemble;

pub use assemble::RowAssembler;

use serde::{Deserialize, Serialize};

/// A single parsed cell. Every downstream stage matches on this exhaustively
/// instead of sniffing types at runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Text(String),
    Number(f64),
    Date(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<&str> {
        match self {
            Value::Date(s) => Some(s),
            _ => None,
        }
    }
}

/// One row of a [`Table`], values aligned positionally to the table schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Row(pub Vec<Value>);

impl Row {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&Value> {
        self.0.get(idx)
    }
}

/// An ordered column schema plus ordered rows. Immutable once built; the
/// cache hands out shared references, never something that can mutate it.
///
/// Invariant: every row's length equals `columns.len()`. The schema is fixed
/// by the first successfully parsed INSERT block of a load.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    /// Columns that were synthesized rather than read from source files.
    pub synthesized: Vec<String>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
            synthesized: Vec::new(),
        }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Cell lookup by row index and column name.
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.get(idx)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn is_synthesized(&self, column: &str) -> bool {
        self.synthesized.iter().any(|c| c == column)
    }
}

/// Skip/failure counters accumulated across one load. Data loss is part of
/// the return contract, not something swallowed in logs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseReport {
    /// Files successfully read from disk.
    pub files_read: u64,
    /// Files that could not be read and were skipped.
    pub files_failed: u64,
    /// INSERT blocks parsed for the target table.
    pub blocks: u64,
    /// INSERT headers missing a column list or VALUES keyword.
    pub skipped_blocks: u64,
    /// Tuples parsed and bound to the schema.
    pub tuples: u64,
    /// Tuples rejected for a field-count mismatch.
    pub skipped_tuples: u64,
    /// Rows in the final table.
    pub rows: u64,
}

impl ParseReport {
    pub fn absorb(&mut self, other: &ParseReport) {
        self.files_read += other.files_read;
        self.files_failed += other.files_failed;
        self.blocks += other.blocks;
        self.skipped_blocks += other.skipped_blocks;
        self.tuples += other.tuples;
        self.skipped_tuples += other.skipped_tuples;
        self.rows += other.rows;
    }
}

/// A built table together with the counters describing how it was built.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub table: Table,
    pub report: ParseReport,
}
