// 🗄️ SQLite store - categories, items, FX rates, ingest log
//
// Every write that touches more than one row runs inside one transaction,
// so a reader either sees the old catalog or the new one. A failure names
// the operation and leaves the previous state in place.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::{info, warn};

use crate::entities::{Category, CategoryId, FxTable, Item, ItemEdit, ItemId, NewItem};
use crate::error::{StoreContext, StoreOperation, StoreResult};
use crate::extractor::ExtractedCatalog;

/// Open (or create) the database file with WAL and foreign keys on.
pub fn open(db_path: impl AsRef<Path>) -> Result<Connection> {
    let path = db_path.as_ref();
    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open database: {}", path.display()))?;
    configure(&conn)?;
    Ok(conn)
}

fn configure(conn: &Connection) -> Result<()> {
    // WAL lets readers keep the last committed catalog during a reload
    conn.pragma_update(None, "journal_mode", "WAL")
        .context("Failed to enable WAL mode")?;
    conn.pragma_update(None, "foreign_keys", "ON")
        .context("Failed to enable foreign keys")?;
    Ok(())
}

pub fn setup_database(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS category (
            id   INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT UNIQUE NOT NULL
        );

        CREATE TABLE IF NOT EXISTS item (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            category_id  INTEGER NOT NULL REFERENCES category(id),
            sub_category TEXT NOT NULL DEFAULT '',
            name         TEXT NOT NULL,
            pack         TEXT NOT NULL DEFAULT '',
            currency     TEXT NOT NULL,
            base_cost    REAL NOT NULL DEFAULT 0,
            margin_pct   REAL NOT NULL DEFAULT 0,
            vat          INTEGER NOT NULL DEFAULT 0
        );
        CREATE INDEX IF NOT EXISTS idx_item_category ON item(category_id);

        CREATE TABLE IF NOT EXISTS fx (
            code TEXT PRIMARY KEY,
            rate REAL NOT NULL
        );

        CREATE TABLE IF NOT EXISTS ingest_log (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            source       TEXT NOT NULL,
            content_hash TEXT NOT NULL,
            categories   INTEGER NOT NULL,
            items        INTEGER NOT NULL,
            ingested_at  TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_ingest_hash ON ingest_log(content_hash);
        ",
    )
    .during(StoreOperation::Schema)
}

// ============================================================================
// STORE PRIMITIVES
// ============================================================================
//
// These take `&Connection` so they run unchanged on a `rusqlite::Transaction`
// (which derefs to one). Callers own the transaction boundary.

pub fn clear_items(conn: &Connection) -> rusqlite::Result<usize> {
    conn.execute("DELETE FROM item", [])
}

pub fn clear_categories(conn: &Connection) -> rusqlite::Result<usize> {
    conn.execute("DELETE FROM category", [])
}

pub fn insert_category(conn: &Connection, name: &str) -> rusqlite::Result<CategoryId> {
    conn.execute("INSERT INTO category (name) VALUES (?1)", params![name])?;
    Ok(conn.last_insert_rowid())
}

pub fn find_category(conn: &Connection, name: &str) -> rusqlite::Result<Option<CategoryId>> {
    conn.query_row(
        "SELECT id FROM category WHERE name = ?1",
        params![name],
        |row| row.get(0),
    )
    .optional()
}

/// Unique-by-name lookup, inserting when absent.
pub fn find_or_insert_category(conn: &Connection, name: &str) -> rusqlite::Result<CategoryId> {
    match find_category(conn, name)? {
        Some(id) => Ok(id),
        None => insert_category(conn, name),
    }
}

pub fn insert_item(conn: &Connection, category_id: CategoryId, item: &NewItem) -> rusqlite::Result<ItemId> {
    conn.execute(
        "INSERT INTO item (
            category_id, sub_category, name, pack, currency, base_cost, margin_pct, vat
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            category_id,
            item.sub_category,
            item.name,
            item.pack,
            item.currency,
            item.base_cost,
            item.margin_pct,
            item.vat,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn update_item(conn: &Connection, id: ItemId, category_id: CategoryId, item: &NewItem) -> rusqlite::Result<bool> {
    let changed = conn.execute(
        "UPDATE item SET
            category_id = ?2, sub_category = ?3, name = ?4, pack = ?5,
            currency = ?6, base_cost = ?7, margin_pct = ?8, vat = ?9
         WHERE id = ?1",
        params![
            id,
            category_id,
            item.sub_category,
            item.name,
            item.pack,
            item.currency,
            item.base_cost,
            item.margin_pct,
            item.vat,
        ],
    )?;
    Ok(changed > 0)
}

// ============================================================================
// CATALOG RELOAD
// ============================================================================

/// One row of the ingest history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestRecord {
    pub source: String,
    pub content_hash: String,
    pub categories: usize,
    pub items: usize,
    pub ingested_at: DateTime<Utc>,
}

impl IngestRecord {
    pub fn new<S: AsRef<str>>(source: &str, lines: &[S], catalog: &ExtractedCatalog) -> Self {
        IngestRecord {
            source: source.to_string(),
            content_hash: content_hash(lines),
            categories: catalog.categories.len(),
            items: catalog.item_count(),
            ingested_at: Utc::now(),
        }
    }
}

/// SHA-256 over the line stream, one `\n` after each line.
pub fn content_hash<S: AsRef<str>>(lines: &[S]) -> String {
    let mut hasher = Sha256::new();
    for line in lines {
        hasher.update(line.as_ref().as_bytes());
        hasher.update(b"\n");
    }
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReloadSummary {
    pub removed_items: usize,
    pub removed_categories: usize,
    pub categories: usize,
    pub items: usize,
}

/// Replace the whole catalog with `catalog`: clear, then bulk insert.
///
/// All-or-nothing. If `record` is given it is logged in the same
/// transaction.
pub fn replace_catalog(
    conn: &mut Connection,
    catalog: &ExtractedCatalog,
    record: Option<&IngestRecord>,
) -> StoreResult<ReloadSummary> {
    let op = StoreOperation::CatalogReload;
    let tx = conn.transaction().during(op)?;

    let removed_items = clear_items(&tx).during(op)?;
    let removed_categories = clear_categories(&tx).during(op)?;

    let mut summary = ReloadSummary {
        removed_items,
        removed_categories,
        ..Default::default()
    };

    for category in &catalog.categories {
        let category_id = insert_category(&tx, &category.name).during(op)?;
        summary.categories += 1;
        for item in &category.items {
            insert_item(&tx, category_id, item).during(op)?;
            summary.items += 1;
        }
    }

    if let Some(record) = record {
        insert_ingest_record(&tx, record).during(StoreOperation::IngestLog)?;
    }

    tx.commit().during(op)?;

    info!(
        categories = summary.categories,
        items = summary.items,
        removed_items = summary.removed_items,
        "Catalog replaced"
    );
    Ok(summary)
}

fn insert_ingest_record(conn: &Connection, record: &IngestRecord) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO ingest_log (source, content_hash, categories, items, ingested_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            record.source,
            record.content_hash,
            record.categories as i64,
            record.items as i64,
            record.ingested_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

/// Most recent ingests first.
pub fn get_ingest_history(conn: &Connection, limit: usize) -> StoreResult<Vec<IngestRecord>> {
    let op = StoreOperation::IngestLog;
    let mut stmt = conn
        .prepare(
            "SELECT source, content_hash, categories, items, ingested_at
             FROM ingest_log
             ORDER BY id DESC
             LIMIT ?1",
        )
        .during(op)?;

    let records = stmt
        .query_map(params![limit as i64], |row| {
            let ingested_at: String = row.get(4)?;
            let categories: i64 = row.get(2)?;
            let items: i64 = row.get(3)?;
            Ok(IngestRecord {
                source: row.get(0)?,
                content_hash: row.get(1)?,
                categories: categories as usize,
                items: items as usize,
                ingested_at: DateTime::parse_from_rfc3339(&ingested_at)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_default(),
            })
        })
        .during(op)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .during(op)?;

    Ok(records)
}

// ============================================================================
// CATALOG READ
// ============================================================================

pub fn get_categories(conn: &Connection) -> StoreResult<Vec<Category>> {
    let op = StoreOperation::CatalogRead;
    let mut stmt = conn
        .prepare("SELECT id, name FROM category ORDER BY id")
        .during(op)?;
    let categories = stmt
        .query_map([], |row| Ok(Category::new(row.get(0)?, row.get::<_, String>(1)?)))
        .during(op)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .during(op)?;
    Ok(categories)
}

/// All items joined with their category, in insertion order.
pub fn get_all_items(conn: &Connection) -> StoreResult<Vec<Item>> {
    let op = StoreOperation::CatalogRead;
    let mut stmt = conn
        .prepare(
            "SELECT item.id, item.category_id, category.name, item.sub_category,
                    item.name, item.pack, item.currency, item.base_cost,
                    item.margin_pct, item.vat
             FROM item JOIN category ON item.category_id = category.id
             ORDER BY item.id",
        )
        .during(op)?;

    let items = stmt
        .query_map([], |row| {
            Ok(Item {
                id: row.get(0)?,
                category_id: row.get(1)?,
                category: row.get(2)?,
                sub_category: row.get(3)?,
                name: row.get(4)?,
                pack: row.get(5)?,
                currency: row.get(6)?,
                base_cost: row.get(7)?,
                margin_pct: row.get(8)?,
                vat: row.get(9)?,
            })
        })
        .during(op)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .during(op)?;

    Ok(items)
}

pub fn count_items(conn: &Connection) -> StoreResult<i64> {
    conn.query_row("SELECT COUNT(*) FROM item", [], |row| row.get(0))
        .during(StoreOperation::CatalogRead)
}

pub fn count_categories(conn: &Connection) -> StoreResult<i64> {
    conn.query_row("SELECT COUNT(*) FROM category", [], |row| row.get(0))
        .during(StoreOperation::CatalogRead)
}

// ============================================================================
// FX
// ============================================================================

pub fn load_fx(conn: &Connection) -> StoreResult<FxTable> {
    let op = StoreOperation::FxRead;
    let mut stmt = conn.prepare("SELECT code, rate FROM fx ORDER BY code").during(op)?;
    let pairs = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?)))
        .during(op)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .during(op)?;
    Ok(FxTable::from_pairs(pairs))
}

/// Overwrite the FX table with `table`.
pub fn replace_fx(conn: &mut Connection, table: &FxTable) -> StoreResult<usize> {
    let op = StoreOperation::FxUpdate;
    let tx = conn.transaction().during(op)?;
    tx.execute("DELETE FROM fx", []).during(op)?;
    {
        let mut stmt = tx
            .prepare("INSERT INTO fx (code, rate) VALUES (?1, ?2)")
            .during(op)?;
        for (code, rate) in table.iter() {
            stmt.execute(params![code, rate]).during(op)?;
        }
    }
    tx.commit().during(op)?;
    info!(rates = table.len(), "Exchange rates updated");
    Ok(table.len())
}

// ============================================================================
// MANUAL EDITS
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveSummary {
    pub inserted: usize,
    pub updated: usize,
    pub skipped: usize,
}

/// Save edited rows. Rows with an id update that item (or insert when the
/// id no longer exists); rows without one are appended. Categories are
/// looked up by name and created when new. Rows with no category name
/// are skipped.
pub fn save_items(
    conn: &mut Connection,
    edits: &[ItemEdit],
    default_currency: &str,
) -> StoreResult<SaveSummary> {
    let op = StoreOperation::ItemSave;
    let tx = conn.transaction().during(op)?;
    let mut summary = SaveSummary::default();

    for edit in edits {
        let category_name = edit.category_name();
        if category_name.is_empty() {
            warn!(name = %edit.name, "Item row without category, skipped");
            summary.skipped += 1;
            continue;
        }

        let category_id = find_or_insert_category(&tx, category_name).during(op)?;
        let item = edit.normalized(default_currency);

        let updated = match edit.id {
            Some(id) => update_item(&tx, id, category_id, &item).during(op)?,
            None => false,
        };
        if updated {
            summary.updated += 1;
        } else {
            insert_item(&tx, category_id, &item).during(op)?;
            summary.inserted += 1;
        }
    }

    tx.commit().during(op)?;
    info!(
        inserted = summary.inserted,
        updated = summary.updated,
        skipped = summary.skipped,
        "Products updated"
    );
    Ok(summary)
}

/// Returns false when no item had that id.
pub fn delete_item(conn: &Connection, id: ItemId) -> StoreResult<bool> {
    let removed = conn
        .execute("DELETE FROM item WHERE id = ?1", params![id])
        .during(StoreOperation::ItemDelete)?;
    Ok(removed > 0)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::{ExtractedCategory, Extractor};

    fn test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "foreign_keys", "ON").unwrap();
        setup_database(&conn).unwrap();
        conn
    }

    const DOCUMENT: [&str; 7] = [
        "SALMON (Salmo salar) Price (€/kg) Availability",
        "Salmon whole",
        "Norwegian Salmon | HOG | 2-3 kg 12,50 In Stock",
        "Norwegian Salmon | HOG | 3-4 kg 12,90 On Request",
        "SHRIMP (Penaeus vannamei) Price (€/kg) Availability",
        "Vannamei | HLSO | 16/20 9,10 During",
        "SALMON (Salmo salar) Price (€/kg) Availability",
    ];

    fn snapshot(conn: &Connection) -> (Vec<String>, Vec<(String, String, String, f64)>) {
        let names = get_categories(conn)
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        let items = get_all_items(conn)
            .unwrap()
            .into_iter()
            .map(|i| (i.category, i.sub_category, i.name, i.base_cost))
            .collect();
        (names, items)
    }

    #[test]
    fn test_reload_twice_is_idempotent() {
        let mut conn = test_db();
        let catalog = Extractor::new("EUR").unwrap().extract(DOCUMENT);

        let first = replace_catalog(&mut conn, &catalog, None).unwrap();
        let after_first = snapshot(&conn);

        let second = replace_catalog(&mut conn, &catalog, None).unwrap();
        let after_second = snapshot(&conn);

        assert_eq!(first.categories, 2);
        assert_eq!(first.items, 3);
        assert_eq!(second.removed_items, 3);
        assert_eq!(second.removed_categories, 2);
        assert_eq!(after_first, after_second);
        assert_eq!(count_categories(&conn).unwrap(), 2);
        assert_eq!(count_items(&conn).unwrap(), 3);

        println!("✅ Reload idempotency test PASSED");
    }

    #[test]
    fn test_reload_replaces_not_merges() {
        let mut conn = test_db();
        let extractor = Extractor::new("EUR").unwrap();

        replace_catalog(&mut conn, &extractor.extract(DOCUMENT), None).unwrap();
        let smaller = extractor.extract([
            "TUNA (Thunnus) Price (€/kg)",
            "Loin 14,00 In Stock",
        ]);
        replace_catalog(&mut conn, &smaller, None).unwrap();

        let (names, items) = snapshot(&conn);
        assert_eq!(names, vec!["Tuna"]);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].2, "Loin");
    }

    #[test]
    fn test_failed_reload_keeps_previous_catalog() {
        let mut conn = test_db();
        let extractor = Extractor::new("EUR").unwrap();
        replace_catalog(&mut conn, &extractor.extract(DOCUMENT), None).unwrap();
        let before = snapshot(&conn);

        // duplicate names violate the UNIQUE constraint halfway through
        let broken = ExtractedCatalog {
            categories: vec![
                ExtractedCategory {
                    name: "Cod".to_string(),
                    items: vec![NewItem::from_document("Cod loin", "", "EUR", 4.0)],
                },
                ExtractedCategory {
                    name: "Cod".to_string(),
                    items: Vec::new(),
                },
            ],
            stats: Default::default(),
        };

        let err = replace_catalog(&mut conn, &broken, None).unwrap_err();
        assert_eq!(err.operation, StoreOperation::CatalogReload);
        assert_eq!(snapshot(&conn), before);
    }

    #[test]
    fn test_ingest_record_logged_with_reload() {
        let mut conn = test_db();
        let catalog = Extractor::new("EUR").unwrap().extract(DOCUMENT);
        let record = IngestRecord::new("january.pdf", &DOCUMENT, &catalog);

        replace_catalog(&mut conn, &catalog, Some(&record)).unwrap();

        let history = get_ingest_history(&conn, 10).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].source, "january.pdf");
        assert_eq!(history[0].categories, 2);
        assert_eq!(history[0].items, 3);
        assert_eq!(history[0].content_hash.len(), 64);
    }

    #[test]
    fn test_content_hash_is_stable() {
        let a = content_hash(&DOCUMENT);
        let b = content_hash(&DOCUMENT.to_vec());
        assert_eq!(a, b);
        assert_ne!(a, content_hash(&DOCUMENT[..3]));
    }

    #[test]
    fn test_fx_overwrite() {
        let mut conn = test_db();

        replace_fx(&mut conn, &FxTable::from_pairs([("USD", 2.0), ("GBP", 3.0)])).unwrap();
        replace_fx(&mut conn, &FxTable::from_pairs([("usd", 2500.0)])).unwrap();

        let fx = load_fx(&conn).unwrap();
        assert_eq!(fx.len(), 1);
        assert_eq!(fx.rate("USD"), 2500.0);
        assert_eq!(fx.get("GBP"), None);
    }

    #[test]
    fn test_save_items_normalizes_and_upserts() {
        let mut conn = test_db();
        let catalog = Extractor::new("EUR").unwrap().extract(DOCUMENT);
        replace_catalog(&mut conn, &catalog, None).unwrap();
        let first = get_all_items(&conn).unwrap()[0].clone();

        let edits = vec![
            ItemEdit {
                id: Some(first.id),
                category: first.category.clone(),
                sub_category: first.sub_category.clone(),
                name: first.name.clone(),
                pack: "IQF 20 kg".to_string(),
                currency: "eur".to_string(),
                base_cost: "12.5".to_string(),
                margin_pct: "20".to_string(),
                vat: "Yes".to_string(),
            },
            ItemEdit {
                category: "Octopus".to_string(),
                name: "Octopus T4".to_string(),
                currency: "usd".to_string(),
                base_cost: "6,40".to_string(),
                margin_pct: "0.1".to_string(),
                ..Default::default()
            },
            ItemEdit {
                name: "nowhere".to_string(),
                ..Default::default()
            },
        ];

        let summary = save_items(&mut conn, &edits, "EUR").unwrap();
        assert_eq!(summary, SaveSummary { inserted: 1, updated: 1, skipped: 1 });

        let items = get_all_items(&conn).unwrap();
        let edited = items.iter().find(|i| i.id == first.id).unwrap();
        assert_eq!(edited.pack, "IQF 20 kg");
        assert!((edited.margin_pct - 0.2).abs() < 1e-12);
        assert!(edited.vat);

        let octopus = items.iter().find(|i| i.name == "Octopus T4").unwrap();
        assert_eq!(octopus.category, "Octopus");
        assert_eq!(octopus.currency, "USD");
        assert_eq!(octopus.base_cost, 6.4);
        assert!(!octopus.vat);

        // category created once even if more rows reference it
        assert_eq!(count_categories(&conn).unwrap(), 3);
    }

    #[test]
    fn test_save_with_stale_id_inserts() {
        let mut conn = test_db();
        let edits = vec![ItemEdit {
            id: Some(999),
            category: "Squid".to_string(),
            name: "Loligo".to_string(),
            base_cost: "3".to_string(),
            ..Default::default()
        }];

        let summary = save_items(&mut conn, &edits, "EUR").unwrap();
        assert_eq!(summary.inserted, 1);
        assert_eq!(summary.updated, 0);
        assert_eq!(count_items(&conn).unwrap(), 1);
    }

    #[test]
    fn test_delete_item() {
        let mut conn = test_db();
        replace_catalog(&mut conn, &Extractor::new("EUR").unwrap().extract(DOCUMENT), None).unwrap();
        let id = get_all_items(&conn).unwrap()[0].id;

        assert!(delete_item(&conn, id).unwrap());
        assert!(!delete_item(&conn, id).unwrap());
        assert_eq!(count_items(&conn).unwrap(), 2);
        // the category outlives its items
        assert_eq!(count_categories(&conn).unwrap(), 2);
    }

    #[test]
    fn test_open_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let conn = open(dir.path().join("prices.db")).unwrap();
        setup_database(&conn).unwrap();
        assert_eq!(count_items(&conn).unwrap(), 0);
    }
}
