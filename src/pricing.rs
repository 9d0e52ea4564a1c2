// 💰 Pricing Engine
//
//   landed = base_cost × fx.rate(currency)
//   priced = landed × (1 + margin_pct)
//   sell   = priced × (1 + vat_rate)   if vat
//
// Pure arithmetic. No validation happens here: margins must already be
// decimal fractions, and a zero or negative cost simply yields a zero or
// negative price.

use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_VAT_RATE;
use crate::entities::{FxTable, Item, NewItem};

/// The fields the engine reads. Implemented by stored and unsaved items.
pub trait Priceable {
    fn base_cost(&self) -> f64;
    fn currency(&self) -> &str;
    fn margin_pct(&self) -> f64;
    fn vat(&self) -> bool;
}

impl Priceable for Item {
    fn base_cost(&self) -> f64 {
        self.base_cost
    }
    fn currency(&self) -> &str {
        &self.currency
    }
    fn margin_pct(&self) -> f64 {
        self.margin_pct
    }
    fn vat(&self) -> bool {
        self.vat
    }
}

impl Priceable for NewItem {
    fn base_cost(&self) -> f64 {
        self.base_cost
    }
    fn currency(&self) -> &str {
        &self.currency
    }
    fn margin_pct(&self) -> f64 {
        self.margin_pct
    }
    fn vat(&self) -> bool {
        self.vat
    }
}

/// Every intermediate of one price computation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub fx_rate: f64,
    pub landed_cost: f64,
    pub priced: f64,
    pub sell_price: f64,
}

/// Engine with the VAT multiplier fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricingEngine {
    vat_rate: f64,
}

impl Default for PricingEngine {
    fn default() -> Self {
        PricingEngine {
            vat_rate: DEFAULT_VAT_RATE,
        }
    }
}

impl PricingEngine {
    pub fn new(vat_rate: f64) -> Self {
        PricingEngine { vat_rate }
    }

    pub fn vat_rate(&self) -> f64 {
        self.vat_rate
    }

    pub fn landed_cost<P: Priceable + ?Sized>(&self, item: &P, fx: &FxTable) -> f64 {
        item.base_cost() * fx.rate(item.currency())
    }

    pub fn sell_price<P: Priceable + ?Sized>(&self, item: &P, fx: &FxTable) -> f64 {
        self.breakdown(item, fx).sell_price
    }

    pub fn breakdown<P: Priceable + ?Sized>(&self, item: &P, fx: &FxTable) -> PriceBreakdown {
        let fx_rate = fx.rate(item.currency());
        let landed_cost = self.landed_cost(item, fx);
        let priced = landed_cost * (1.0 + item.margin_pct());
        let sell_price = if item.vat() {
            priced * (1.0 + self.vat_rate)
        } else {
            priced
        };

        PriceBreakdown {
            fx_rate,
            landed_cost,
            priced,
            sell_price,
        }
    }
}

/// Sell price with the standard 18% VAT.
pub fn sell_price<P: Priceable + ?Sized>(item: &P, fx: &FxTable) -> f64 {
    PricingEngine::default().sell_price(item, fx)
}

/// Round half away from zero to 2 decimals, for display and export.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
