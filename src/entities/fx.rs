// 💱 FX Table - currency code → local-currency rate

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::normalize::normalize_currency;

/// Units of local currency per 1 unit of the foreign currency.
///
/// Codes that are not in the table are treated as local currency (rate 1).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FxTable {
    rates: BTreeMap<String, f64>,
}

impl FxTable {
    pub fn new() -> Self {
        FxTable {
            rates: BTreeMap::new(),
        }
    }

    /// Build from raw (code, rate) pairs. Empty codes are dropped; a later
    /// duplicate code overwrites an earlier one.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: AsRef<str>,
    {
        let mut table = FxTable::new();
        for (code, rate) in pairs {
            table.insert(code.as_ref(), rate);
        }
        table
    }

    /// Insert after code normalization. Returns false if the code was empty.
    pub fn insert(&mut self, code: &str, rate: f64) -> bool {
        match normalize_currency(code) {
            Some(code) => {
                self.rates.insert(code, rate);
                true
            }
            None => false,
        }
    }

    /// Rate for `code`, or 1 when unmapped.
    pub fn rate(&self, code: &str) -> f64 {
        self.get(code).unwrap_or(1.0)
    }

    /// Rate only if the code is mapped. The code is normalized like on insert.
    pub fn get(&self, code: &str) -> Option<f64> {
        let code = normalize_currency(code)?;
        self.rates.get(&code).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.rates.iter().map(|(code, rate)| (code.as_str(), *rate))
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unmapped_code_is_local() {
        let fx = FxTable::from_pairs([("USD", 2.0)]);
        assert_eq!(fx.rate("USD"), 2.0);
        assert_eq!(fx.rate("TZS"), 1.0);
        assert_eq!(fx.get("TZS"), None);
    }

    #[test]
    fn test_lookup_ignores_case_and_padding() {
        let fx = FxTable::from_pairs([("USD", 2.0)]);
        assert_eq!(fx.rate("usd"), 2.0);
        assert_eq!(fx.get(" Usd "), Some(2.0));
        assert_eq!(fx.rate(""), 1.0);
    }

    #[test]
    fn test_codes_are_normalized_and_empty_dropped() {
        let fx = FxTable::from_pairs([(" usd ", 2.5), ("", 9.0), ("  ", 9.0), ("eur", 3.0)]);
        assert_eq!(fx.len(), 2);
        assert_eq!(fx.rate("USD"), 2.5);
        assert_eq!(fx.rate("EUR"), 3.0);
    }
}
