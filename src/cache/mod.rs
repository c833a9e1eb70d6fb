use chrono::{DateTime, Utc};
use rayon::prelude::*;
use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, RwLock,
    },
};
use tracing::{debug, info, instrument, warn};

use crate::coerce::{self, CoercePolicy};
use crate::parse::{parse_dump_text, ParsedFile};
use crate::source::{DataSourceInfo, SourceSet};
use crate::table::{Dataset, ParseReport, RowAssembler};

/// The cached dataset plus the freshness signature it was built against.
pub struct CacheEntry {
    pub dataset: Arc<Dataset>,
    pub signature: i64,
    pub built_at: DateTime<Utc>,
}

/// Freshness-keyed cache over the whole ingestion pipeline. Owned by
/// whatever service composes the loader; tests construct their own instead
/// of sharing process-wide state.
///
/// A rebuild is assembled off to the side and swapped in whole, so readers
/// see either the old dataset or the fully built new one.
type ReadFn = Box<dyn Fn(&Path) -> io::Result<Vec<u8>> + Send + Sync>;

pub struct DumpCache {
    sources: SourceSet,
    table: String,
    policy: CoercePolicy,
    entry: RwLock<Option<CacheEntry>>,
    files_read: AtomicU64,
    reader: ReadFn,
}

impl DumpCache {
    pub fn new(sources: SourceSet, table: impl Into<String>) -> Self {
        Self::with_policy(sources, table, CoercePolicy::default())
    }

    pub fn with_policy(
        sources: SourceSet,
        table: impl Into<String>,
        policy: CoercePolicy,
    ) -> Self {
        Self {
            sources,
            table: table.into(),
            policy,
            entry: RwLock::new(None),
            files_read: AtomicU64::new(0),
            reader: Box::new(|path| fs::read(path)),
        }
    }

    /// Replace the file reader, e.g. to simulate read failures in tests.
    pub fn with_reader(
        mut self,
        reader: impl Fn(&Path) -> io::Result<Vec<u8>> + Send + Sync + 'static,
    ) -> Self {
        self.reader = Box::new(reader);
        self
    }

    /// Load the current dataset, rebuilding only when the source signature
    /// changed or a reload is forced. `None` means no source files resolve;
    /// data-quality problems degrade the row count, never the call.
    #[instrument(level = "info", skip(self))]
    pub fn load(&self, force_reload: bool) -> Option<Arc<Dataset>> {
        let files = self.sources.resolve();
        if files.is_empty() {
            debug!("no source files resolvable");
            return None;
        }
        let signature = self.sources.signature();

        if !force_reload {
            let entry = self.entry.read().unwrap();
            if let Some(cached) = entry.as_ref() {
                if cached.signature == signature {
                    debug!(signature, "cache hit");
                    return Some(Arc::clone(&cached.dataset));
                }
            }
        }

        let dataset = Arc::new(self.build(&files));
        let mut entry = self.entry.write().unwrap();
        *entry = Some(CacheEntry {
            dataset: Arc::clone(&dataset),
            signature,
            built_at: Utc::now(),
        });
        Some(dataset)
    }

    fn build(&self, files: &[PathBuf]) -> Dataset {
        let mut report = ParseReport::default();

        let mut texts = Vec::with_capacity(files.len());
        for path in files {
            match (self.reader)(path) {
                Ok(bytes) => {
                    self.files_read.fetch_add(1, Ordering::Relaxed);
                    report.files_read += 1;
                    texts.push(String::from_utf8_lossy(&bytes).into_owned());
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable dump file");
                    report.files_failed += 1;
                }
            }
        }

        // extraction is independent per file; the merge below keeps the
        // deterministic resolved-file order
        let parsed: Vec<ParsedFile> = texts
            .par_iter()
            .map(|text| parse_dump_text(text, &self.table))
            .collect();

        let mut assembler = RowAssembler::new();
        for file in parsed {
            report.skipped_blocks += file.skipped_blocks;
            report.blocks += file.blocks.len() as u64;
            for block in file.blocks {
                assembler.push_block(block);
            }
        }

        let raw = assembler.finish(&mut report);
        let table = coerce::finalize(raw, &self.policy);
        report.rows = table.row_count() as u64;

        info!(
            rows = report.rows,
            blocks = report.blocks,
            skipped_blocks = report.skipped_blocks,
            skipped_tuples = report.skipped_tuples,
            "dataset built"
        );
        Dataset { table, report }
    }

    pub fn source_info(&self) -> DataSourceInfo {
        self.sources.info()
    }

    /// Total files read from disk since this cache was created. Warm loads
    /// perform zero reads.
    pub fn files_read(&self) -> u64 {
        self.files_read.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coerce::NumericPolicy;
    use crate::table::Value;
    use std::{fs, thread, time::Duration};
    use tempfile::tempdir;

    fn sales_cache(dir: &std::path::Path) -> DumpCache {
        DumpCache::new(SourceSet::new(dir, "*.sql"), "sales_data")
    }

    fn scenario_policy() -> CoercePolicy {
        CoercePolicy {
            rename: Vec::new(),
            numeric: vec![("amount".into(), NumericPolicy::Continuous)],
            date_columns: Vec::new(),
            synthesize_stock: None,
        }
    }

    #[test]
    fn load_returns_none_without_sources() {
        let dir = tempdir().unwrap();
        let cache = sales_cache(dir.path());
        assert!(cache.load(false).is_none());
        assert_eq!(cache.files_read(), 0);
    }

    #[test]
    fn end_to_end_scenario() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("dump_01.sql"),
            "INSERT INTO sales_data (id, name, amount) VALUES\n\
             (1, 'O''Brien', 19.99),\n\
             (2, NULL, 5),\n\
             (3, 'A, B', 'x');\n",
        )
        .unwrap();

        let cache = DumpCache::with_policy(
            SourceSet::new(dir.path(), "*.sql"),
            "sales_data",
            scenario_policy(),
        );
        let dataset = cache.load(false).unwrap();
        let t = &dataset.table;

        assert_eq!(t.row_count(), 3);
        assert_eq!(dataset.report.skipped_tuples, 0);
        assert_eq!(dataset.report.skipped_blocks, 0);

        assert_eq!(t.value(0, "id"), Some(&Value::Text("1".into())));
        assert_eq!(t.value(0, "name"), Some(&Value::Text("O'Brien".into())));
        assert_eq!(t.value(0, "amount"), Some(&Value::Number(19.99)));
        assert_eq!(t.value(1, "name"), Some(&Value::Null));
        assert_eq!(t.value(1, "amount"), Some(&Value::Number(5.0)));
        assert_eq!(t.value(2, "name"), Some(&Value::Text("A, B".into())));
        assert_eq!(t.value(2, "amount"), Some(&Value::Null));
    }

    #[test]
    fn warm_load_is_idempotent_with_zero_reads() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("dump_01.sql"),
            "INSERT INTO sales_data (id) VALUES (1), (2);",
        )
        .unwrap();
        fs::write(
            dir.path().join("dump_02.sql"),
            "INSERT INTO sales_data (id) VALUES (3);",
        )
        .unwrap();

        let cache = sales_cache(dir.path());
        let first = cache.load(false).unwrap();
        assert_eq!(cache.files_read(), 2);

        let second = cache.load(false).unwrap();
        assert_eq!(cache.files_read(), 2);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.table, second.table);
        assert_eq!(first.table.row_count(), 3);
    }

    #[test]
    fn force_reload_rebuilds() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("dump_01.sql"),
            "INSERT INTO sales_data (id) VALUES (1);",
        )
        .unwrap();

        let cache = sales_cache(dir.path());
        let first = cache.load(false).unwrap();
        let second = cache.load(true).unwrap();
        assert_eq!(cache.files_read(), 2);
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(first.table, second.table);
    }

    #[test]
    fn freshness_invalidation_on_mtime_change() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dump_01.sql");
        fs::write(&path, "INSERT INTO sales_data (id) VALUES (1);").unwrap();

        let cache = sales_cache(dir.path());
        let first = cache.load(false).unwrap();
        assert_eq!(first.table.row_count(), 1);

        // ensure the rewrite lands on a later mtime
        thread::sleep(Duration::from_millis(50));
        fs::write(&path, "INSERT INTO sales_data (id) VALUES (1), (2);").unwrap();

        let second = cache.load(false).unwrap();
        assert_eq!(second.table.row_count(), 2);
        assert_eq!(cache.files_read(), 2);
    }

    #[test]
    fn rows_keep_resolved_file_order() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("dump_02.sql"),
            "INSERT INTO sales_data (id) VALUES ('b1'), ('b2');",
        )
        .unwrap();
        fs::write(
            dir.path().join("dump_01.sql"),
            "INSERT INTO sales_data (id) VALUES ('a1');",
        )
        .unwrap();

        let cache = sales_cache(dir.path());
        let dataset = cache.load(false).unwrap();
        let ids: Vec<_> = (0..3)
            .map(|i| dataset.table.value(i, "id").unwrap().clone())
            .collect();
        assert_eq!(
            ids,
            vec![
                Value::Text("a1".into()),
                Value::Text("b1".into()),
                Value::Text("b2".into()),
            ]
        );
    }

    #[test]
    fn schema_mismatch_counted_in_report() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("dump_01.sql"),
            "INSERT INTO sales_data (a, b) VALUES (1, 2), (3), (4, 5);",
        )
        .unwrap();

        let cache = sales_cache(dir.path());
        let dataset = cache.load(false).unwrap();
        assert_eq!(dataset.table.row_count(), 2);
        assert_eq!(dataset.report.skipped_tuples, 1);
        assert_eq!(dataset.table.value(1, "a"), Some(&Value::Text("4".into())));
    }

    #[test]
    fn unreadable_file_skipped_and_counted() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("dump_01.sql"),
            "INSERT INTO sales_data (id) VALUES (1), (2);",
        )
        .unwrap();
        fs::write(
            dir.path().join("dump_02.sql"),
            "INSERT INTO sales_data (id) VALUES (3);",
        )
        .unwrap();

        let cache = DumpCache::new(SourceSet::new(dir.path(), "*.sql"), "sales_data")
            .with_reader(|path| {
                if path.ends_with("dump_02.sql") {
                    Err(std::io::Error::from(std::io::ErrorKind::PermissionDenied))
                } else {
                    fs::read(path)
                }
            });

        let dataset = cache.load(false).unwrap();
        assert_eq!(dataset.report.files_failed, 1);
        assert_eq!(dataset.report.files_read, 1);
        // the readable file still loads in full
        assert_eq!(dataset.table.row_count(), 2);
        assert_eq!(cache.files_read(), 1);
    }

    #[test]
    fn source_info_reflects_resolved_files() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("dump_01.sql"),
            "INSERT INTO sales_data (id) VALUES (1);",
        )
        .unwrap();

        let cache = sales_cache(dir.path());
        let info = cache.source_info();
        assert_eq!(info.file_count, 1);
        assert_eq!(info.directory, dir.path().to_string_lossy());
    }
}
