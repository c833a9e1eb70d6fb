//! Ingestion pipeline for hand-maintained SQL dump files: `INSERT INTO ...
//! VALUES (...), (...);` statements are parsed into a typed in-memory table
//! without a SQL engine, behind a freshness-keyed cache. Forecasting,
//! inventory and recommendation code consume the resulting table and
//! nothing else from this crate.

pub mod cache;
pub mod coerce;
pub mod parse;
pub mod source;
pub mod table;

pub use cache::{CacheEntry, DumpCache};
pub use coerce::{CoercePolicy, NumericPolicy, StockSynthesis};
pub use source::{DataSourceInfo, SourceKind, SourceSet};
pub use table::{Dataset, ParseReport, Row, Table, Value};
