use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use price_list::catalog::{self, CatalogView};
use price_list::{db, import, ingest_file, Config, Extractor, PricingEngine};

#[derive(Parser)]
#[command(name = "price-list", version, about = "Supplier price list ingestion and pricing")]
struct Cli {
    /// Config file (default: ./price-list.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Database file, overrides the config
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract a price document (text or PDF) and replace the catalog
    Ingest {
        file: PathBuf,
    },
    /// Exchange rates
    Fx {
        #[command(subcommand)]
        action: FxAction,
    },
    /// Manual product edits
    Items {
        #[command(subcommand)]
        action: ItemsAction,
    },
    /// Priced catalog grouped by category and sub-category
    Preview {
        /// Print the grouped view as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write the priced catalog as CSV (stdout when no file is given)
    Export {
        file: Option<PathBuf>,
    },
    /// Recent ingests
    History {
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,
    },
}

#[derive(Subcommand)]
enum FxAction {
    /// Show the current rates
    List,
    /// Replace all rates from a `code,rate` CSV
    Import { file: PathBuf },
}

#[derive(Subcommand)]
enum ItemsAction {
    /// Insert or update products from CSV
    Import { file: PathBuf },
    /// Delete one product by id
    Delete { id: i64 },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = Config::load_or_default(cli.config.as_deref())?;
    let db_path = cli.db.clone().unwrap_or_else(|| PathBuf::from(&cfg.db_path));

    let mut conn = db::open(&db_path)?;
    db::setup_database(&conn)?;

    match cli.command {
        Commands::Ingest { file } => run_ingest(&mut conn, &cfg, &file),
        Commands::Fx { action } => match action {
            FxAction::List => run_fx_list(&conn),
            FxAction::Import { file } => run_fx_import(&mut conn, &file),
        },
        Commands::Items { action } => match action {
            ItemsAction::Import { file } => run_items_import(&mut conn, &cfg, &file),
            ItemsAction::Delete { id } => run_items_delete(&conn, id),
        },
        Commands::Preview { json } => run_preview(&conn, &cfg, json),
        Commands::Export { file } => run_export(&conn, &cfg, file),
        Commands::History { limit } => run_history(&conn, limit),
    }
}

fn run_ingest(conn: &mut Connection, cfg: &Config, file: &Path) -> Result<()> {
    println!("📂 Ingesting {}", file.display());

    let extractor = Extractor::new(cfg.extraction.default_currency.as_str())?;
    let report = ingest_file(conn, &extractor, file)?;

    println!("✓ Lines read: {}", report.stats.lines);
    println!(
        "✓ Seeded {} categories / {} items",
        report.reload.categories, report.reload.items
    );
    if report.stats.orphan_rows > 0 {
        println!("  Dropped {} rows outside any category", report.stats.orphan_rows);
    }
    if report.stats.skipped_rows > 0 {
        println!("  Skipped {} rows with unreadable prices", report.stats.skipped_rows);
    }
    Ok(())
}

fn run_fx_list(conn: &Connection) -> Result<()> {
    let fx = db::load_fx(conn)?;
    if fx.is_empty() {
        println!("No exchange rates. Unmapped currencies are priced at rate 1.");
        return Ok(());
    }
    println!("{:<6} | {:>12}", "Code", "Rate");
    println!("{}", "-".repeat(21));
    for (code, rate) in fx.iter() {
        println!("{:<6} | {:>12.4}", code, rate);
    }
    Ok(())
}

fn run_fx_import(conn: &mut Connection, file: &Path) -> Result<()> {
    let parsed = import::read_fx_file(file)?;
    let count = db::replace_fx(conn, &parsed.table)?;
    println!("✓ Exchange rates updated: {}", count);
    if parsed.dropped > 0 {
        println!("  Dropped {} rows without code or rate", parsed.dropped);
    }
    Ok(())
}

fn run_items_import(conn: &mut Connection, cfg: &Config, file: &Path) -> Result<()> {
    let edits = import::read_items_file(file)?;
    let summary = db::save_items(conn, &edits, &cfg.extraction.default_currency)?;
    println!(
        "✓ Products updated: {} inserted, {} updated",
        summary.inserted, summary.updated
    );
    if summary.skipped > 0 {
        println!("  Skipped {} rows without a category", summary.skipped);
    }
    Ok(())
}

fn run_items_delete(conn: &Connection, id: i64) -> Result<()> {
    if db::delete_item(conn, id)? {
        println!("✓ Deleted item {}", id);
    } else {
        println!("No item with id {}", id);
    }
    Ok(())
}

fn run_preview(conn: &Connection, cfg: &Config, json: bool) -> Result<()> {
    let engine = PricingEngine::new(cfg.pricing.vat_rate);
    let view = catalog::load_catalog_view(conn, &engine)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }
    if view.categories.is_empty() {
        println!("Catalog is empty. Run 'ingest <file>' first.");
        return Ok(());
    }
    print_view(&view);
    Ok(())
}

fn print_view(view: &CatalogView) {
    for category in &view.categories {
        println!("\n{}", category.name.to_uppercase());
        for sub in &category.sub_categories {
            if !sub.name.is_empty() {
                println!("  {}", sub.name);
            }
            for row in &sub.rows {
                let fx = row
                    .fx_rate
                    .map(|r| format!("{:.4}", r))
                    .unwrap_or_else(|| "-".into());
                println!(
                    "    {:>4} | {:<40} | {:<10} | {:<4} {:>9.2} | {:>5.1}% | {:<3} | {:>10} | {:>10.2}",
                    row.id,
                    truncate(&row.name, 40),
                    truncate(&row.pack, 10),
                    row.currency,
                    row.base_cost,
                    row.margin_pct * 100.0,
                    if row.vat { "VAT" } else { "" },
                    fx,
                    row.sell_price,
                );
            }
        }
    }
    println!("\n{} items", view.row_count());
}

fn run_export(conn: &Connection, cfg: &Config, file: Option<PathBuf>) -> Result<()> {
    let engine = PricingEngine::new(cfg.pricing.vat_rate);
    let rows = catalog::load_priced_rows(conn, &engine)?;
    match file {
        Some(path) => {
            let out = File::create(&path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            catalog::write_csv(&rows, out)?;
            println!("✓ Exported {} rows to {}", rows.len(), path.display());
        }
        None => catalog::write_csv(&rows, io::stdout().lock())?,
    }
    Ok(())
}

fn run_history(conn: &Connection, limit: usize) -> Result<()> {
    let records = db::get_ingest_history(conn, limit)?;
    if records.is_empty() {
        println!("No ingests yet.");
        return Ok(());
    }
    for r in &records {
        println!(
            "{} | {:<30} | {:>4} categories | {:>5} items | {}",
            r.ingested_at.format("%Y-%m-%d %H:%M"),
            truncate(&r.source, 30),
            r.categories,
            r.items,
            &r.content_hash[..12.min(r.content_hash.len())],
        );
    }
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}
