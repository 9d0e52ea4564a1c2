// Write-boundary normalization
//
// Everything a user or a document hands us goes through here before it is
// stored. Nothing in this module fails: malformed input falls back to a
// documented default (0.0 margin, no VAT, zero cost).

/// Tokens accepted as "VAT applies". Compared after trim + lowercase.
const VAT_TRUE_TOKENS: [&str; 6] = ["1", "true", "yes", "y", "18", "vat"];

/// Store a margin as a decimal fraction.
///
/// Values above 1 are read as percentages (`20` → `0.20`); anything else is
/// kept as entered. Exactly `1.0` is kept as-is and means a 100% markup.
pub fn normalize_margin(m: f64) -> f64 {
    if m > 1.0 {
        m / 100.0
    } else {
        m
    }
}

/// Parse then normalize a raw margin entry. Accepts a comma as decimal
/// separator. Blank or unparsable ⇒ 0.0.
pub fn normalize_margin_str(raw: &str) -> f64 {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    match trimmed.replace(',', ".").parse::<f64>() {
        Ok(m) if m.is_finite() => normalize_margin(m),
        _ => 0.0,
    }
}

/// `"Yes"`, `"18"`, `"vat"` … ⇒ true; everything else ⇒ false.
pub fn normalize_vat(raw: &str) -> bool {
    let token = raw.trim().to_lowercase();
    VAT_TRUE_TOKENS.contains(&token.as_str())
}

/// Trim and uppercase. `None` when nothing is left.
pub fn normalize_currency(raw: &str) -> Option<String> {
    let code = raw.trim().to_uppercase();
    if code.is_empty() {
        None
    } else {
        Some(code)
    }
}

/// Parse a price token that may use a comma as decimal separator.
///
/// Returns `None` for anything that is not a finite, non-negative number.
pub fn parse_decimal(token: &str) -> Option<f64> {
    let value = token.trim().replace(',', ".").parse::<f64>().ok()?;
    if value.is_finite() && value >= 0.0 {
        Some(value)
    } else {
        None
    }
}

/// Cost entered at the write boundary. Unparsable or negative ⇒ 0.0.
pub fn normalize_cost_str(raw: &str) -> f64 {
    parse_decimal(raw).unwrap_or(0.0)
}
