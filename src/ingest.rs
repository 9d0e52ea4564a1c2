// 📥 Ingestion - document → extractor → atomic catalog reload

use anyhow::{Context, Result};
use rusqlite::Connection;
use serde::Serialize;
use std::path::Path;
use tracing::info;

use crate::db::{self, IngestRecord, ReloadSummary};
use crate::document;
use crate::extractor::{ExtractionStats, Extractor};

#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub source: String,
    pub stats: ExtractionStats,
    pub reload: ReloadSummary,
    pub content_hash: String,
}

/// Extract `lines` and replace the stored catalog with the result.
pub fn ingest_lines<S: AsRef<str>>(
    conn: &mut Connection,
    extractor: &Extractor,
    source: &str,
    lines: &[S],
) -> Result<IngestReport> {
    let catalog = extractor.extract(lines.iter().map(|l| l.as_ref()));
    let record = IngestRecord::new(source, lines, &catalog);

    let reload = db::replace_catalog(conn, &catalog, Some(&record))?;

    info!(
        source,
        categories = reload.categories,
        items = reload.items,
        "Price list ingested"
    );

    Ok(IngestReport {
        source: source.to_string(),
        stats: catalog.stats,
        reload,
        content_hash: record.content_hash,
    })
}

/// Load a document from disk and ingest it.
pub fn ingest_file(conn: &mut Connection, extractor: &Extractor, path: &Path) -> Result<IngestReport> {
    let lines = document::load_lines(path)?;
    let source = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string();
    ingest_lines(conn, extractor, &source, &lines)
        .with_context(|| format!("Failed to ingest {}", path.display()))
}
