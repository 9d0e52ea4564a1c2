// 📊 Priced catalog view - category → sub-category → item → sell price
//
// Read-only. Built from the stored items and the current FX table for
// whatever renders or exports the price list.

use anyhow::{Context, Result};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::db;
use crate::entities::{FxTable, Item, ItemId};
use crate::pricing::{round2, PricingEngine};

/// One item with its computed price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricedRow {
    pub id: ItemId,
    pub category: String,
    pub sub_category: String,
    pub name: String,
    pub pack: String,
    pub currency: String,
    pub base_cost: f64,
    pub margin_pct: f64,
    pub vat: bool,
    /// `None` when the currency has no FX entry (priced at rate 1)
    pub fx_rate: Option<f64>,
    /// Rounded to 2 decimals
    pub sell_price: f64,
}

impl PricedRow {
    pub fn new(item: &Item, fx: &FxTable, engine: &PricingEngine) -> Self {
        PricedRow {
            id: item.id,
            category: item.category.clone(),
            sub_category: item.sub_category.clone(),
            name: item.name.clone(),
            pack: item.pack.clone(),
            currency: item.currency.clone(),
            base_cost: item.base_cost,
            margin_pct: item.margin_pct,
            vat: item.vat,
            fx_rate: fx.get(&item.currency),
            sell_price: round2(engine.sell_price(item, fx)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubCategoryGroup {
    /// Empty for items listed directly under the category
    pub name: String,
    pub rows: Vec<PricedRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryGroup {
    pub name: String,
    pub sub_categories: Vec<SubCategoryGroup>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogView {
    pub categories: Vec<CategoryGroup>,
}

impl CatalogView {
    /// Group rows by category, then sub-category, keeping the order in
    /// which each group first appears.
    pub fn from_rows(rows: Vec<PricedRow>) -> Self {
        let mut categories: Vec<CategoryGroup> = Vec::new();

        for row in rows {
            let cat_idx = match categories.iter().position(|c| c.name == row.category) {
                Some(i) => i,
                None => {
                    categories.push(CategoryGroup {
                        name: row.category.clone(),
                        sub_categories: Vec::new(),
                    });
                    categories.len() - 1
                }
            };
            let subs = &mut categories[cat_idx].sub_categories;
            let sub_idx = match subs.iter().position(|s| s.name == row.sub_category) {
                Some(i) => i,
                None => {
                    subs.push(SubCategoryGroup {
                        name: row.sub_category.clone(),
                        rows: Vec::new(),
                    });
                    subs.len() - 1
                }
            };
            subs[sub_idx].rows.push(row);
        }

        CatalogView { categories }
    }

    pub fn row_count(&self) -> usize {
        self.categories
            .iter()
            .flat_map(|c| c.sub_categories.iter())
            .map(|s| s.rows.len())
            .sum()
    }
}

/// Price every item against `fx`.
pub fn price_items(items: &[Item], fx: &FxTable, engine: &PricingEngine) -> Vec<PricedRow> {
    items.iter().map(|item| PricedRow::new(item, fx, engine)).collect()
}

/// Flat priced rows straight from the store.
pub fn load_priced_rows(conn: &Connection, engine: &PricingEngine) -> Result<Vec<PricedRow>> {
    let items = db::get_all_items(conn)?;
    let fx = db::load_fx(conn)?;
    Ok(price_items(&items, &fx, engine))
}

pub fn load_catalog_view(conn: &Connection, engine: &PricingEngine) -> Result<CatalogView> {
    Ok(CatalogView::from_rows(load_priced_rows(conn, engine)?))
}

#[derive(Serialize)]
struct ExportRecord<'a> {
    category: &'a str,
    sub_category: &'a str,
    name: &'a str,
    pack: &'a str,
    currency: &'a str,
    #[serde(rename = "orig px")]
    base_cost: f64,
    #[serde(rename = "margin %")]
    margin_pct: f64,
    #[serde(rename = "VAT")]
    vat: bool,
    fx_rate: Option<f64>,
    #[serde(rename = "sell px")]
    sell_price: f64,
}

/// Write the flat priced catalog as CSV with a header row.
pub fn write_csv<W: Write>(rows: &[PricedRow], writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for row in rows {
        wtr.serialize(ExportRecord {
            category: &row.category,
            sub_category: &row.sub_category,
            name: &row.name,
            pack: &row.pack,
            currency: &row.currency,
            base_cost: row.base_cost,
            margin_pct: row.margin_pct,
            vat: row.vat,
            fx_rate: row.fx_rate,
            sell_price: row.sell_price,
        })
        .context("Failed to write CSV row")?;
    }
    wtr.flush().context("Failed to flush CSV output")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: ItemId, category: &str, sub: &str, name: &str, currency: &str, cost: f64) -> Item {
        Item {
            id,
            category_id: 1,
            category: category.to_string(),
            sub_category: sub.to_string(),
            name: name.to_string(),
            pack: String::new(),
            currency: currency.to_string(),
            base_cost: cost,
            margin_pct: 0.0,
            vat: false,
        }
    }

    #[test]
    fn test_priced_row_rounds_and_reports_rate() {
        let mut it = item(1, "Salmon", "", "HOG", "USD", 10.0);
        it.margin_pct = 0.2;
        it.vat = true;
        let fx = FxTable::from_pairs([("USD", 2.0)]);

        let row = PricedRow::new(&it, &fx, &PricingEngine::default());
        assert_eq!(row.sell_price, 28.32);
        assert_eq!(row.fx_rate, Some(2.0));

        let local = PricedRow::new(&item(2, "Salmon", "", "x", "EUR", 3.0), &fx, &PricingEngine::default());
        assert_eq!(local.fx_rate, None);
        assert_eq!(local.sell_price, 3.0);
    }

    #[test]
    fn test_grouping_keeps_first_appearance_order() {
        let items = vec![
            item(1, "Salmon", "Whole", "a", "EUR", 1.0),
            item(2, "Salmon", "Fillets", "b", "EUR", 1.0),
            item(3, "Shrimp", "", "c", "EUR", 1.0),
            item(4, "Salmon", "Whole", "d", "EUR", 1.0),
        ];
        let rows = price_items(&items, &FxTable::new(), &PricingEngine::default());
        let view = CatalogView::from_rows(rows);

        let cats: Vec<&str> = view.categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(cats, vec!["Salmon", "Shrimp"]);

        let salmon = &view.categories[0];
        let subs: Vec<&str> = salmon.sub_categories.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(subs, vec!["Whole", "Fillets"]);
        let whole: Vec<&str> = salmon.sub_categories[0].rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(whole, vec!["a", "d"]);

        assert_eq!(view.categories[1].sub_categories[0].name, "");
        assert_eq!(view.row_count(), 4);
    }

    #[test]
    fn test_csv_export() {
        let rows = price_items(
            &[item(1, "Salmon", "Whole", "HOG 2-3", "EUR", 12.5)],
            &FxTable::new(),
            &PricingEngine::default(),
        );
        let mut out = Vec::new();
        write_csv(&rows, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "category,sub_category,name,pack,currency,orig px,margin %,VAT,fx_rate,sell px"
        );
        assert_eq!(lines.next().unwrap(), "Salmon,Whole,HOG 2-3,,EUR,12.5,0.0,false,,12.5");
    }

    #[test]
    fn test_load_from_store() {
        let mut conn = Connection::open_in_memory().unwrap();
        db::setup_database(&conn).unwrap();
        let extractor = crate::extractor::Extractor::new("USD").unwrap();
        let catalog = extractor.extract([
            "SALMON (Salmo salar) Price (€/kg)",
            "Whole",
            "HOG 10,00 In Stock",
        ]);
        db::replace_catalog(&mut conn, &catalog, None).unwrap();
        db::replace_fx(&mut conn, &FxTable::from_pairs([("USD", 2.0)])).unwrap();

        let view = load_catalog_view(&conn, &PricingEngine::default()).unwrap();
        assert_eq!(view.row_count(), 1);
        let row = &view.categories[0].sub_categories[0].rows[0];
        assert_eq!(row.sell_price, 20.0);
        assert_eq!(row.fx_rate, Some(2.0));
    }
}
