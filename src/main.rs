use anyhow::Result;
use retaildump::{DumpCache, SourceSet};
use std::env;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env_filter).init();
    info!("startup");

    // ─── 2) configure the source set ─────────────────────────────────
    let data_dir = env::var("RETAILDUMP_DATA_DIR").unwrap_or_else(|_| "01.data".to_string());
    let fallback_dir = env::var("RETAILDUMP_FALLBACK_DIR").unwrap_or_else(|_| "data".to_string());
    let table = env::var("RETAILDUMP_TABLE").unwrap_or_else(|_| "sales_data".to_string());

    let sources = SourceSet::new(data_dir, "*.sql").with_fallback(fallback_dir);
    let cache = DumpCache::new(sources, table);

    let source_info = cache.source_info();
    info!(info = %serde_json::to_string(&source_info)?, "data source");

    // ─── 3) load once and report ─────────────────────────────────────
    match cache.load(false) {
        Some(dataset) => {
            info!(
                rows = dataset.report.rows,
                columns = dataset.table.columns.len(),
                skipped_blocks = dataset.report.skipped_blocks,
                skipped_tuples = dataset.report.skipped_tuples,
                files_failed = dataset.report.files_failed,
                synthesized = ?dataset.table.synthesized,
                "dataset loaded"
            );
        }
        None => warn!("no data loaded"),
    }

    Ok(())
}
