// CSV import for the two manual-edit paths: FX rates and product rows

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

use crate::entities::{FxTable, ItemEdit};
use crate::normalize::{normalize_currency, parse_decimal};

#[derive(Debug, Deserialize)]
struct FxRow {
    #[serde(default)]
    code: String,
    #[serde(default)]
    rate: String,
}

/// Parsed FX sheet plus the number of rows that were dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct FxImport {
    pub table: FxTable,
    pub dropped: usize,
}

/// Read a `code,rate` sheet. Rows with an empty code or an unparsable rate
/// are dropped, not reported as errors.
pub fn read_fx_csv<R: Read>(reader: R) -> Result<FxImport> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut table = FxTable::new();
    let mut dropped = 0;

    for (line_num, result) in rdr.deserialize::<FxRow>().enumerate() {
        let row = result.with_context(|| format!("Failed to parse FX CSV line {}", line_num + 2))?;
        match (normalize_currency(&row.code), parse_decimal(&row.rate)) {
            (Some(code), Some(rate)) => {
                table.insert(&code, rate);
            }
            _ => {
                debug!(line = line_num + 2, code = %row.code, rate = %row.rate, "FX row dropped");
                dropped += 1;
            }
        }
    }

    Ok(FxImport { table, dropped })
}

pub fn read_fx_file(path: &Path) -> Result<FxImport> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open FX file: {}", path.display()))?;
    read_fx_csv(file)
}

/// Read product rows. Columns: id, category, sub_category, name, pack,
/// currency, base_cost, margin_pct, vat. Only `category` and `name` are
/// required; values stay raw until the store normalizes them.
pub fn read_items_csv<R: Read>(reader: R) -> Result<Vec<ItemEdit>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(reader);

    let mut edits = Vec::new();
    for (line_num, result) in rdr.deserialize::<ItemEdit>().enumerate() {
        let edit = result.with_context(|| format!("Failed to parse items CSV line {}", line_num + 2))?;
        edits.push(edit);
    }
    Ok(edits)
}

pub fn read_items_file(path: &Path) -> Result<Vec<ItemEdit>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open items file: {}", path.display()))?;
    read_items_csv(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fx_sheet_drops_bad_rows() {
        let sheet = "code,rate\nusd, 2500\n,3\nGBP,\nKES,abc\neur,2800,50\n";
        // the last row has an extra column: csv rejects it
        assert!(read_fx_csv(sheet.as_bytes()).is_err());

        let sheet = "code,rate\nusd, 2500\n,3\nGBP,\nKES,abc\neur,\"2800,50\"\n";
        let import = read_fx_csv(sheet.as_bytes()).unwrap();
        assert_eq!(import.dropped, 3);
        assert_eq!(import.table.len(), 2);
        assert_eq!(import.table.rate("USD"), 2500.0);
        assert_eq!(import.table.rate("EUR"), 2800.5);
    }

    #[test]
    fn test_items_sheet() {
        let sheet = "\
id,category,sub_category,name,pack,currency,base_cost,margin_pct,vat
1,Salmon,Whole,HOG 2-3,IQF 20 kg,EUR,12.5,20,yes
,Octopus,,T4,,usd,\"6,40\",0.1,
x,Squid,,Loligo,,,3,,0
";
        let edits = read_items_csv(sheet.as_bytes()).unwrap();
        assert_eq!(edits.len(), 3);
        assert_eq!(edits[0].id, Some(1));
        assert_eq!(edits[0].vat, "yes");
        assert_eq!(edits[1].id, None);
        assert_eq!(edits[1].base_cost, "6,40");
        // unparsable id means "new row"
        assert_eq!(edits[2].id, None);
    }

    #[test]
    fn test_items_sheet_minimal_columns() {
        let sheet = "category,name\nSalmon,HOG\n";
        let edits = read_items_csv(sheet.as_bytes()).unwrap();
        assert_eq!(edits.len(), 1);
        assert_eq!(edits[0].margin_pct, "");
        assert_eq!(edits[0].id, None);
    }
}
