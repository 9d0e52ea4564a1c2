// Price List - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod catalog;
pub mod config;
pub mod db;
pub mod document;
pub mod entities;
pub mod error;
pub mod extractor;
pub mod import;
pub mod ingest;
pub mod normalize;
pub mod pricing;

// Re-export commonly used types
pub use catalog::{CatalogView, CategoryGroup, PricedRow, SubCategoryGroup};
pub use config::{Config, DEFAULT_CURRENCY, DEFAULT_VAT_RATE};
pub use db::{
    get_all_items, get_categories, load_fx, replace_catalog, replace_fx, save_items,
    setup_database, IngestRecord, ReloadSummary, SaveSummary,
};
pub use entities::{Category, CategoryId, CategoryRegistry, FxTable, Item, ItemEdit, ItemId, NewItem};
pub use error::{StoreError, StoreOperation};
pub use extractor::{ExtractedCatalog, ExtractedCategory, ExtractionStats, Extractor, LineClass};
pub use ingest::{ingest_file, ingest_lines, IngestReport};
pub use normalize::{normalize_currency, normalize_margin, normalize_margin_str, normalize_vat};
pub use pricing::{sell_price, PriceBreakdown, Priceable, PricingEngine};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
