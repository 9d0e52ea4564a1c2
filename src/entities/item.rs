// 🐟 Item Entity - one priced line of the catalog

use serde::{Deserialize, Serialize};

use super::category::CategoryId;
use crate::normalize::{normalize_cost_str, normalize_currency, normalize_margin_str, normalize_vat};

pub type ItemId = i64;

/// Stored item, joined with its category name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub category_id: CategoryId,
    pub category: String,
    pub sub_category: String,
    pub name: String,
    pub pack: String,
    pub currency: String,
    pub base_cost: f64,
    /// Decimal fraction (0.15 = 15%)
    pub margin_pct: f64,
    pub vat: bool,
}

/// Item fields as they go into the store (no id yet, category by reference).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewItem {
    pub sub_category: String,
    pub name: String,
    pub pack: String,
    pub currency: String,
    pub base_cost: f64,
    pub margin_pct: f64,
    pub vat: bool,
}

impl NewItem {
    /// Item as read off a price document: no pack, no margin, no VAT.
    pub fn from_document(
        name: impl Into<String>,
        sub_category: impl Into<String>,
        currency: impl Into<String>,
        base_cost: f64,
    ) -> Self {
        NewItem {
            sub_category: sub_category.into(),
            name: name.into(),
            pack: String::new(),
            currency: currency.into(),
            base_cost,
            margin_pct: 0.0,
            vat: false,
        }
    }
}

/// One row of a manual edit, raw as entered.
///
/// `id` present updates that item, absent inserts a new one. All numeric
/// and flag columns are kept as text so normalization happens here, at the
/// write boundary, and nowhere else.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemEdit {
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub id: Option<ItemId>,
    pub category: String,
    #[serde(default)]
    pub sub_category: String,
    pub name: String,
    #[serde(default)]
    pub pack: String,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub base_cost: String,
    #[serde(default)]
    pub margin_pct: String,
    #[serde(default)]
    pub vat: String,
}

impl ItemEdit {
    /// Apply margin/VAT/currency/cost normalization.
    ///
    /// An empty currency falls back to `default_currency`.
    pub fn normalized(&self, default_currency: &str) -> NewItem {
        NewItem {
            sub_category: self.sub_category.trim().to_string(),
            name: self.name.trim().to_string(),
            pack: self.pack.trim().to_string(),
            currency: normalize_currency(&self.currency)
                .unwrap_or_else(|| default_currency.to_string()),
            base_cost: normalize_cost_str(&self.base_cost),
            margin_pct: normalize_margin_str(&self.margin_pct),
            vat: normalize_vat(&self.vat),
        }
    }

    pub fn category_name(&self) -> &str {
        self.category.trim()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_item_defaults() {
        let item = NewItem::from_document("Norwegian Salmon | HOG | 2-3 kg", "Salmon whole", "EUR", 12.5);
        assert_eq!(item.pack, "");
        assert_eq!(item.margin_pct, 0.0);
        assert!(!item.vat);
        assert_eq!(item.currency, "EUR");
    }

    #[test]
    fn test_edit_normalization() {
        let edit = ItemEdit {
            id: Some(3),
            category: " Salmon ".to_string(),
            sub_category: "Fillets".to_string(),
            name: " Fillet trim D ".to_string(),
            pack: "IQF 20 kg".to_string(),
            currency: " usd".to_string(),
            base_cost: "10".to_string(),
            margin_pct: "20".to_string(),
            vat: "Yes".to_string(),
        };

        let item = edit.normalized("EUR");
        assert_eq!(edit.category_name(), "Salmon");
        assert_eq!(item.name, "Fillet trim D");
        assert_eq!(item.currency, "USD");
        assert_eq!(item.base_cost, 10.0);
        assert!((item.margin_pct - 0.2).abs() < 1e-12);
        assert!(item.vat);
    }

    #[test]
    fn test_edit_fallbacks() {
        let edit = ItemEdit {
            category: "Shrimp".to_string(),
            name: "Vannamei".to_string(),
            base_cost: "??".to_string(),
            margin_pct: "abc".to_string(),
            ..Default::default()
        };

        let item = edit.normalized("EUR");
        assert_eq!(item.currency, "EUR");
        assert_eq!(item.base_cost, 0.0);
        assert_eq!(item.margin_pct, 0.0);
        assert!(!item.vat);
    }
}
