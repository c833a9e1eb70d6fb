use chrono::NaiveDate;
use tracing::debug;

use crate::parse::Field;
use crate::table::{assemble::RawTable, Row, Table, Value};

/// What happens to a numeric cell that fails to parse.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumericPolicy {
    /// Unparsable values become `Null` (measurements, prices).
    Continuous,
    /// Unparsable or missing values take a declared default (counts).
    Count { default: f64 },
}

/// Synthesis of a column absent from all source blocks: per-row value
/// derived from `source` times a ratio drawn uniformly from
/// `[min_ratio, max_ratio]`, rounded and clamped to at least 1.
#[derive(Debug, Clone, PartialEq)]
pub struct StockSynthesis {
    pub source: String,
    pub target: String,
    pub min_ratio: f64,
    pub max_ratio: f64,
    /// Seed for the ratio generator, so synthesis is reproducible.
    pub seed: u64,
}

/// Per-column coercion rules applied once per assembled table. The default
/// policy matches the retail sales dumps this crate ingests.
#[derive(Debug, Clone, PartialEq)]
pub struct CoercePolicy {
    /// Historical synonym → canonical column name.
    pub rename: Vec<(String, String)>,
    /// Allow-list of numeric columns (canonical names) with their policy.
    pub numeric: Vec<(String, NumericPolicy)>,
    /// Columns accepted only with a `YYYY-MM-DD` prefix.
    pub date_columns: Vec<String>,
    pub synthesize_stock: Option<StockSynthesis>,
}

impl Default for CoercePolicy {
    fn default() -> Self {
        let strings = |pairs: &[(&str, &str)]| {
            pairs
                .iter()
                .map(|(a, b)| (a.to_string(), b.to_string()))
                .collect()
        };
        Self {
            rename: strings(&[
                ("city", "City"),
                ("country", "Country"),
                ("product_name", "Product_Name"),
                ("store_name", "Store_Name"),
            ]),
            numeric: vec![
                ("price".into(), NumericPolicy::Continuous),
                ("total_sales".into(), NumericPolicy::Continuous),
                ("quantity".into(), NumericPolicy::Count { default: 0.0 }),
                (
                    "store_stock_quantity".into(),
                    NumericPolicy::Count { default: 0.0 },
                ),
            ],
            date_columns: vec!["sale_date".into(), "launch_date".into()],
            synthesize_stock: Some(StockSynthesis {
                source: "quantity".into(),
                target: "store_stock_quantity".into(),
                min_ratio: 0.95,
                max_ratio: 1.30,
                seed: 0,
            }),
        }
    }
}

impl CoercePolicy {
    fn canonical_name(&self, column: &str) -> String {
        self.rename
            .iter()
            .find(|(from, _)| from == column)
            .map(|(_, to)| to.clone())
            .unwrap_or_else(|| column.to_string())
    }

    fn class_of(&self, canonical: &str) -> ColumnClass {
        if let Some((_, policy)) = self.numeric.iter().find(|(name, _)| name == canonical) {
            return ColumnClass::Numeric(*policy);
        }
        if self.date_columns.iter().any(|d| d == canonical) {
            return ColumnClass::Date;
        }
        ColumnClass::Text
    }
}

#[derive(Debug, Clone, Copy)]
enum ColumnClass {
    Text,
    Numeric(NumericPolicy),
    Date,
}

/// Turn an assembled [`RawTable`] into a typed [`Table`]: canonical column
/// names, per-column coercion, then synthesis of any configured absent
/// column. Coercion never rejects a row; a failed cell falls back per its
/// column policy.
pub fn finalize(raw: RawTable, policy: &CoercePolicy) -> Table {
    let columns: Vec<String> = raw
        .columns
        .iter()
        .map(|c| policy.canonical_name(c))
        .collect();
    let classes: Vec<ColumnClass> = columns.iter().map(|c| policy.class_of(c)).collect();

    let rows = raw
        .rows
        .into_iter()
        .map(|tuple| {
            Row(tuple
                .into_iter()
                .zip(&classes)
                .map(|(field, class)| coerce_field(field, *class))
                .collect())
        })
        .collect();

    let mut table = Table {
        columns,
        rows,
        synthesized: Vec::new(),
    };
    if let Some(synth) = &policy.synthesize_stock {
        synthesize(&mut table, synth);
    }
    table
}

fn coerce_field(field: Field, class: ColumnClass) -> Value {
    let text = match field {
        Field::Null => {
            return match class {
                ColumnClass::Numeric(NumericPolicy::Count { default }) => Value::Number(default),
                _ => Value::Null,
            }
        }
        Field::Text(s) | Field::Literal(s) => s,
    };
    let norm = normalize_text(&text);

    match class {
        ColumnClass::Text => Value::Text(norm),
        ColumnClass::Numeric(policy) => match norm.parse::<f64>() {
            Ok(n) => Value::Number(n),
            Err(_) => match policy {
                NumericPolicy::Continuous => Value::Null,
                NumericPolicy::Count { default } => Value::Number(default),
            },
        },
        ColumnClass::Date => match date_prefix(&norm) {
            Some(d) => Value::Date(d),
            None => Value::Null,
        },
    }
}

/// Trim whitespace, strip one layer of wrapping quotes, and collapse the
/// textual no-value tokens (`""`, `none`, `nan`, any case) to empty text.
pub fn normalize_text(raw: &str) -> String {
    let t = raw.trim();
    let t = if t.len() >= 2
        && ((t.starts_with('\'') && t.ends_with('\''))
            || (t.starts_with('"') && t.ends_with('"')))
    {
        t[1..t.len() - 1].trim()
    } else {
        t
    };
    if t.eq_ignore_ascii_case("none") || t.eq_ignore_ascii_case("nan") {
        return String::new();
    }
    t.to_string()
}

fn date_prefix(s: &str) -> Option<String> {
    let prefix = s.get(..10)?;
    NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()?;
    Some(prefix.to_string())
}

fn synthesize(table: &mut Table, synth: &StockSynthesis) {
    if table.has_column(&synth.target) {
        return;
    }
    let Some(src) = table.column_index(&synth.source) else {
        return;
    };

    debug!(
        target = %synth.target,
        source = %synth.source,
        "synthesizing absent column"
    );
    let mut rng = SplitMix64::new(synth.seed);
    let span = synth.max_ratio - synth.min_ratio;
    for row in &mut table.rows {
        let q = row.0[src].as_number().unwrap_or(0.0);
        let ratio = synth.min_ratio + rng.next_f64() * span;
        row.0.push(Value::Number((q * ratio).round().max(1.0)));
    }
    table.columns.push(synth.target.clone());
    table.synthesized.push(synth.target.clone());
}

/// Small seedable generator (splitmix64) for reproducible synthesis.
struct SplitMix64 {
    state: u64,
}

impl SplitMix64 {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }
}
